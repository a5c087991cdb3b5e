//! Analysis of the selected file against the stub engine.

mod common;

use common::*;
use knot_playground::pipeline::analyze;
use knot_playground::{
    AnalysisInput, AnalysisPipeline, AnalysisResult, SecondaryContent, SecondaryResult,
    SecondaryTool,
};

const SOURCE: &str = "x = undefined\ny = 1\nz = undefined";

fn session(content: &str) -> (WorkspaceBridge<StubEngine>, SessionStore<u32>, ErrorReporter) {
    let (mut bridge, mut store, mut errors) = setup();
    bridge.add_file(&mut store, &mut errors, "knot.json", "{}");
    bridge.add_file(&mut store, &mut errors, "main.py", content);
    (bridge, store, errors)
}

fn run(
    pipeline: &mut AnalysisPipeline<String>,
    bridge: &WorkspaceBridge<StubEngine>,
    store: &SessionStore<u32>,
    tool: Option<SecondaryTool>,
) -> AnalysisResult<String> {
    let input = AnalysisInput::capture(store.state(), bridge.generation());
    pipeline
        .run(engine(bridge), store.state(), input, tool)
        .clone()
}

fn expected_diagnostics() -> Vec<String> {
    vec![
        "main.py:1: unresolved reference".to_string(),
        "main.py:3: unresolved reference".to_string(),
    ]
}

#[test]
fn secondary_failure_keeps_diagnostics() {
    let (bridge, store, _) = session(SOURCE);
    engine(&bridge).fail_ast.set(true);

    let result = run(
        &mut AnalysisPipeline::new(),
        &bridge,
        &store,
        Some(SecondaryTool::Ast),
    );

    assert_eq!(result.diagnostics, expected_diagnostics());
    assert_eq!(result.error, None);
    assert_eq!(
        result.secondary,
        Some(SecondaryResult::Error("AST unavailable".to_string()))
    );
}

#[test]
fn check_failure_blanks_everything() {
    let (bridge, store, _) = session(SOURCE);
    engine(&bridge).fail_check.set(true);

    let result = run(
        &mut AnalysisPipeline::new(),
        &bridge,
        &store,
        Some(SecondaryTool::Tokens),
    );

    assert_eq!(
        result,
        AnalysisResult {
            diagnostics: Vec::new(),
            error: Some("check panicked".to_string()),
            secondary: None,
        }
    );
    assert_eq!(engine(&bridge).dumps.get(), 0);
}

#[test]
fn secondary_views() {
    let (bridge, store, _) = session("x = 1");
    let mut pipeline = AnalysisPipeline::new();

    let ast = run(&mut pipeline, &bridge, &store, Some(SecondaryTool::Ast));
    assert_eq!(
        ast.secondary,
        Some(SecondaryResult::Ok(SecondaryContent::Ast(
            "Module(main.py, 1 lines)".to_string()
        )))
    );

    let tokens = run(&mut pipeline, &bridge, &store, Some(SecondaryTool::Tokens));
    assert_eq!(
        tokens.secondary,
        Some(SecondaryResult::Ok(SecondaryContent::Tokens(
            "Name(x)\nName(=)\nName(1)".to_string()
        )))
    );

    let none = run(&mut pipeline, &bridge, &store, None);
    assert_eq!(none.secondary, None);
}

#[test]
fn run_tool_hands_back_content_without_engine_query() {
    let (bridge, store, _) = session("print('hi')");

    let result = run(
        &mut AnalysisPipeline::new(),
        &bridge,
        &store,
        Some(SecondaryTool::Run),
    );

    assert_eq!(
        result.secondary,
        Some(SecondaryResult::Ok(SecondaryContent::Run {
            content: "print('hi')".to_string()
        }))
    );
    assert_eq!(engine(&bridge).dumps.get(), 0);
}

#[test]
fn settings_file_is_not_analyzed() {
    let (bridge, mut store, _) = session(SOURCE);
    store.dispatch(knot_session::Action::SelectFileByName {
        name: "knot.json".into(),
    });

    let result = run(
        &mut AnalysisPipeline::new(),
        &bridge,
        &store,
        Some(SecondaryTool::Ast),
    );

    assert_eq!(result, AnalysisResult::empty());
    assert_eq!(engine(&bridge).checks.get(), 0);
}

#[test]
fn nothing_selected_yields_empty_result() {
    let (bridge, store, _) = setup();
    let result = analyze(
        engine(&bridge),
        store.state(),
        store.state().selected(),
        None,
    );
    assert_eq!(result, AnalysisResult::empty());
}

#[test]
fn unchanged_inputs_reuse_previous_result() {
    let (mut bridge, mut store, mut errors) = session(SOURCE);
    let mut pipeline = AnalysisPipeline::new();

    run(&mut pipeline, &bridge, &store, None);
    run(&mut pipeline, &bridge, &store, None);
    assert_eq!(engine(&bridge).checks.get(), 1);
    assert_eq!((pipeline.runs(), pipeline.reuses()), (1, 1));

    run(&mut pipeline, &bridge, &store, Some(SecondaryTool::Ast));
    assert_eq!(engine(&bridge).checks.get(), 2);

    let main = store.state().selected().expect("main.py selected");
    bridge.change_file(&mut store, &mut errors, main, "y = 2".to_string());
    let result = run(&mut pipeline, &bridge, &store, Some(SecondaryTool::Ast));
    assert_eq!(engine(&bridge).checks.get(), 3);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn settings_change_invalidates_cached_result() {
    let (mut bridge, store, mut errors) = session(SOURCE);
    let mut pipeline = AnalysisPipeline::new();
    run(&mut pipeline, &bridge, &store, None);

    bridge.apply_settings_text(&mut errors, r#"{"environment": {"python-version": "3.8"}}"#);
    run(&mut pipeline, &bridge, &store, None);

    assert_eq!(engine(&bridge).checks.get(), 2);
    assert_eq!(pipeline.reuses(), 0);
}

#[test]
fn current_holds_last_result() {
    let (bridge, store, _) = session(SOURCE);
    let mut pipeline = AnalysisPipeline::new();
    assert!(pipeline.current().is_none());

    run(&mut pipeline, &bridge, &store, None);
    assert_eq!(
        pipeline.current().map(|result| result.diagnostics.clone()),
        Some(expected_diagnostics())
    );
}
