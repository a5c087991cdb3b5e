//! Shared helpers for playground tests.
#![allow(dead_code, unused_imports)]

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

pub use knot_playground::{
    Engine, EngineError, EngineResult, ErrorReporter, Settings, WorkspaceBridge,
};
pub use knot_session::{FileId, SessionState, SessionStore};

/// Engine call observed by [`StubEngine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open { name: String, content: String },
    Update { handle: u32, content: String },
    Close { handle: u32 },
    ApplySettings(Settings),
}

/// In-memory engine that records every mutating call.
///
/// `check_file` reports one diagnostic per line containing `undefined`.
#[derive(Debug, Default)]
pub struct StubEngine {
    pub calls: Vec<Call>,
    pub documents: BTreeMap<u32, (String, String)>,
    pub settings: Settings,
    next_handle: u32,
    pub checks: Cell<usize>,
    pub dumps: Cell<usize>,
    pub fail_open: Cell<bool>,
    pub fail_update: Cell<bool>,
    pub fail_close: Cell<bool>,
    pub fail_apply: Cell<bool>,
    pub fail_check: Cell<bool>,
    pub fail_ast: Cell<bool>,
    pub fail_tokens: Cell<bool>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self {
            next_handle: 1,
            ..Self::default()
        }
    }

    /// Names of the documents currently open, in handle order.
    pub fn open_names(&self) -> Vec<&str> {
        self.documents
            .values()
            .map(|(name, _)| name.as_str())
            .collect()
    }

    fn document(&self, handle: u32) -> EngineResult<&(String, String)> {
        self.documents
            .get(&handle)
            .ok_or_else(|| EngineError::new(format!("Error: unknown handle {handle}")))
    }
}

impl Engine for StubEngine {
    type Handle = u32;
    type Diagnostic = String;

    fn open_file(&mut self, name: &str, content: &str) -> EngineResult<u32> {
        if self.fail_open.get() {
            return Err(EngineError::new(format!("Error: cannot open {name}")));
        }
        self.calls.push(Call::Open {
            name: name.to_string(),
            content: content.to_string(),
        });
        let handle = self.next_handle;
        self.next_handle += 1;
        self.documents
            .insert(handle, (name.to_string(), content.to_string()));
        Ok(handle)
    }

    fn update_file(&mut self, handle: &u32, content: &str) -> EngineResult<()> {
        if self.fail_update.get() {
            return Err(EngineError::new("Error: update rejected"));
        }
        self.calls.push(Call::Update {
            handle: *handle,
            content: content.to_string(),
        });
        let document = self
            .documents
            .get_mut(handle)
            .ok_or_else(|| EngineError::new(format!("Error: unknown handle {handle}")))?;
        document.1 = content.to_string();
        Ok(())
    }

    fn close_file(&mut self, handle: u32) -> EngineResult<()> {
        if self.fail_close.get() {
            return Err(EngineError::new(format!("Error: cannot close {handle}")));
        }
        self.calls.push(Call::Close { handle });
        self.documents
            .remove(&handle)
            .map(|_| ())
            .ok_or_else(|| EngineError::new(format!("Error: unknown handle {handle}")))
    }

    fn apply_settings(&mut self, settings: &Settings) -> EngineResult<()> {
        if self.fail_apply.get() {
            return Err(EngineError::new("Error: settings rejected"));
        }
        self.calls.push(Call::ApplySettings(settings.clone()));
        self.settings = settings.clone();
        Ok(())
    }

    fn check_file(&self, handle: &u32) -> EngineResult<Vec<String>> {
        self.checks.set(self.checks.get() + 1);
        if self.fail_check.get() {
            return Err(EngineError::new("Error: check panicked"));
        }
        let (name, content) = self.document(*handle)?;
        Ok(content
            .lines()
            .enumerate()
            .filter(|(_, line)| line.contains("undefined"))
            .map(|(index, _)| format!("{name}:{}: unresolved reference", index + 1))
            .collect())
    }

    fn dump_ast(&self, handle: &u32) -> EngineResult<String> {
        self.dumps.set(self.dumps.get() + 1);
        if self.fail_ast.get() {
            return Err(EngineError::new("Error: AST unavailable"));
        }
        let (name, content) = self.document(*handle)?;
        Ok(format!("Module({name}, {} lines)", content.lines().count()))
    }

    fn dump_tokens(&self, handle: &u32) -> EngineResult<String> {
        self.dumps.set(self.dumps.get() + 1);
        if self.fail_tokens.get() {
            return Err(EngineError::new("Error: tokens unavailable"));
        }
        let (_, content) = self.document(*handle)?;
        Ok(content
            .split_whitespace()
            .map(|token| format!("Name({token})"))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

/// A bridge with an initialized [`StubEngine`], plus an empty store and
/// error reporter.
pub fn setup() -> (WorkspaceBridge<StubEngine>, SessionStore<u32>, ErrorReporter) {
    let mut bridge = WorkspaceBridge::new();
    bridge
        .initialize(|| Ok(StubEngine::new()))
        .expect("stub engine initializes");
    (bridge, SessionStore::new(), ErrorReporter::new())
}

/// The engine behind `bridge`.
pub fn engine(bridge: &WorkspaceBridge<StubEngine>) -> &StubEngine {
    bridge.engine().expect("engine initialized")
}

/// One line per file: selection marker, id, name, handle and content.
pub fn summary(state: &SessionState<u32>) -> String {
    let mut out = String::new();
    for (record, content) in state.files_with_contents() {
        let marker = if state.selected() == Some(record.id) {
            "*"
        } else {
            " "
        };
        let handle = state
            .handle(record.id)
            .map_or_else(|| "-".to_string(), |handle| handle.to_string());
        out.push_str(&format!(
            "{marker} {} {} [{handle}] {content:?}\n",
            record.id.0, record.name
        ));
    }
    out.push_str(&format!("revision {}", state.revision()));
    out
}

pub fn temp_dir(prefix: &str) -> PathBuf {
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("{prefix}-{stamp}"));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}
