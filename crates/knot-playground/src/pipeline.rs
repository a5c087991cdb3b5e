//! Analysis of the selected file: diagnostics plus an optional secondary view.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use knot_session::{FileId, SessionState};
use rustc_hash::FxHasher;
use tracing::debug;

use crate::deferred::Memo;
use crate::engine::Engine;
use crate::error::format_error_message;

/// Auxiliary view shown next to the diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecondaryTool {
    /// Syntax tree dump.
    Ast,
    /// Token stream dump.
    Tokens,
    /// The program text, handed to a runner.
    Run,
}

impl SecondaryTool {
    /// Display label.
    pub fn as_str(self) -> &'static str {
        match self {
            SecondaryTool::Ast => "AST",
            SecondaryTool::Tokens => "Tokens",
            SecondaryTool::Run => "Run",
        }
    }
}

impl fmt::Display for SecondaryTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecondaryTool {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "ast" => Ok(SecondaryTool::Ast),
            "tokens" => Ok(SecondaryTool::Tokens),
            "run" => Ok(SecondaryTool::Run),
            _ => Err(format!("unknown secondary tool '{value}'")),
        }
    }
}

/// Output of a successful secondary tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryContent {
    /// Rendered syntax tree.
    Ast(String),
    /// Rendered tokens.
    Tokens(String),
    /// The program text handed to the runner.
    Run {
        /// Text of the selected file.
        content: String,
    },
}

/// Outcome of the secondary tool. Failure here never touches diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecondaryResult {
    /// The tool produced output.
    Ok(SecondaryContent),
    /// The engine message, formatted for display.
    Error(String),
}

/// What the analysis panels show for the selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult<D> {
    /// Diagnostics for the selected file, in engine order.
    pub diagnostics: Vec<D>,
    /// Set when the engine check itself failed.
    pub error: Option<String>,
    /// `None` when no secondary tool is active.
    pub secondary: Option<SecondaryResult>,
}

impl<D> AnalysisResult<D> {
    /// Result for "nothing to analyze".
    pub fn empty() -> Self {
        Self {
            diagnostics: Vec::new(),
            error: None,
            secondary: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            diagnostics: Vec::new(),
            error: Some(message),
            secondary: None,
        }
    }
}

/// Snapshot of the analysis inputs taken when the session changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalysisInput {
    /// Selected file.
    pub file: Option<FileId>,
    /// Hash of the selected file's content.
    pub content_hash: u64,
    /// See [`crate::WorkspaceBridge::generation`].
    pub engine_generation: u64,
}

impl AnalysisInput {
    /// Captures the selected file of `state`.
    pub fn capture<H>(state: &SessionState<H>, engine_generation: u64) -> Self {
        let file = state.selected();
        let content_hash = file
            .and_then(|id| state.content(id))
            .map_or(0, hash_content);
        Self {
            file,
            content_hash,
            engine_generation,
        }
    }
}

/// Memo key: the captured inputs plus the active secondary tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnalysisKey {
    /// Session inputs.
    pub input: AnalysisInput,
    /// Active secondary tool.
    pub tool: Option<SecondaryTool>,
}

/// Runs engine queries for the selected file, reusing the previous result
/// while the inputs are unchanged.
#[derive(Debug)]
pub struct AnalysisPipeline<D> {
    memo: Memo<AnalysisKey, AnalysisResult<D>>,
}

impl<D: Clone + fmt::Debug> AnalysisPipeline<D> {
    /// Creates an empty instance.
    pub fn new() -> Self {
        Self { memo: Memo::new() }
    }

    /// Returns the result for `input` and `tool`, querying the engine only if
    /// they differ from the previous call.
    pub fn run<E>(
        &mut self,
        engine: &E,
        state: &SessionState<E::Handle>,
        input: AnalysisInput,
        tool: Option<SecondaryTool>,
    ) -> &AnalysisResult<D>
    where
        E: Engine<Diagnostic = D>,
    {
        let key = AnalysisKey { input, tool };
        if self.memo.key() == Some(&key) {
            debug!(?key, "analysis memo hit");
        }
        self.memo
            .get_or_compute(key, |key| analyze(engine, state, key.input.file, key.tool))
    }

    /// The last computed result.
    pub fn current(&self) -> Option<&AnalysisResult<D>> {
        self.memo.value()
    }

    /// Number of times the engine was queried.
    pub fn runs(&self) -> u64 {
        self.memo.misses()
    }

    /// Number of calls answered from the memo.
    pub fn reuses(&self) -> u64 {
        self.memo.hits()
    }
}

impl<D: Clone + fmt::Debug> Default for AnalysisPipeline<D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks `file` and, if that succeeds, runs the secondary tool in its own
/// failure scope.
pub fn analyze<E: Engine>(
    engine: &E,
    state: &SessionState<E::Handle>,
    file: Option<FileId>,
    tool: Option<SecondaryTool>,
) -> AnalysisResult<E::Diagnostic> {
    let Some(id) = file else {
        return AnalysisResult::empty();
    };
    let Some(handle) = state.handle(id) else {
        return AnalysisResult::empty();
    };

    let diagnostics = match engine.check_file(handle) {
        Ok(diagnostics) => diagnostics,
        Err(err) => {
            debug!("check failed for {:?}: {}", id, err);
            return AnalysisResult::failed(format_error_message(err.message()));
        }
    };
    debug!("checked {:?}: {} diagnostics", id, diagnostics.len());

    let secondary = tool.map(|tool| {
        let content = match tool {
            SecondaryTool::Ast => engine.dump_ast(handle).map(SecondaryContent::Ast),
            SecondaryTool::Tokens => engine.dump_tokens(handle).map(SecondaryContent::Tokens),
            SecondaryTool::Run => Ok(SecondaryContent::Run {
                content: state.content(id).unwrap_or_default().to_string(),
            }),
        };
        match content {
            Ok(content) => SecondaryResult::Ok(content),
            Err(err) => {
                debug!("{} failed for {:?}: {}", tool, id, err);
                SecondaryResult::Error(format_error_message(err.message()))
            }
        }
    });

    AnalysisResult {
        diagnostics,
        error: None,
        secondary,
    }
}

fn hash_content(content: &str) -> u64 {
    let mut hasher = FxHasher::default();
    content.hash(&mut hasher);
    hasher.finish()
}
