//! Tests for the tool registry and dispatch.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::json;

use skiff::error::{Result, SkiffError};
use skiff::tools::*;

use common::echo_tool;

#[test]
fn parameter_builder_constructs_schema() {
    let params = ToolParameters::object()
        .string("query", "Search query", true)
        .number("limit", "Max results", false)
        .integer("page", "Page number", false)
        .boolean("verbose", "Enable verbose output", false)
        .build();

    let schema = &params.schema;
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["properties"]["query"]["type"], "string");
    assert_eq!(schema["properties"]["page"]["type"], "integer");
    assert_eq!(schema["required"], json!(["query"]));
}

#[test]
fn parameter_builder_string_enum() {
    let params = ToolParameters::object()
        .string_enum("format", "Output format", &["json", "text", "csv"], true)
        .build();

    let enums = params.schema["properties"]["format"]["enum"]
        .as_array()
        .unwrap();
    assert_eq!(enums.len(), 3);
}

#[tokio::test]
async fn echo_returns_display_content_with_input() {
    let mut registry = ToolRegistry::new();
    registry.register(echo_tool()).unwrap();

    let result = registry
        .execute("echo", json!({ "text": "hi" }), ExecuteOptions::default())
        .await
        .unwrap();

    assert!(result.display_content.contains("hi"));
    assert!(!result.is_error);
}

#[tokio::test]
async fn echo_without_text_is_a_validation_error() {
    let mut registry = ToolRegistry::new();
    registry.register(echo_tool()).unwrap();

    let err = registry
        .execute("echo", json!({}), ExecuteOptions::default())
        .await
        .unwrap_err();

    match err {
        SkiffError::ToolValidation { tool, error } => {
            assert_eq!(tool, "echo");
            assert_eq!(error.field, "text");
            assert_eq!(error.expected, "string");
            assert_eq!(error.actual, "missing");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn wrong_type_reports_actual_type() {
    let mut registry = ToolRegistry::new();
    registry.register(echo_tool()).unwrap();

    let err = registry
        .execute("echo", json!({ "text": 5 }), ExecuteOptions::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("field 'text' expected string, got integer"));
}

#[tokio::test]
async fn non_object_params_report_root_field() {
    let mut registry = ToolRegistry::new();
    registry.register(echo_tool()).unwrap();

    let err = registry
        .execute("echo", json!(["hi"]), ExecuteOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SkiffError::ToolValidation { ref error, .. } if error.field == "$" && error.actual == "array"
    ));
}

#[tokio::test]
async fn registering_existing_name_replaces_tool() {
    let mut registry = ToolRegistry::new();
    registry.register(echo_tool()).unwrap();
    registry
        .register(AgentTool::new(
            "echo",
            "Shout the given text",
            ToolParameters::object().string("text", "Text", true).build(),
            |args, _ctx| async move { Ok(json!(args.get_str("text")?.to_uppercase())) },
        ))
        .unwrap();

    let result = registry
        .execute("echo", json!({ "text": "hi" }), ExecuteOptions::default())
        .await
        .unwrap();

    assert_eq!(registry.len(), 1);
    assert_eq!(result.display_content, "HI");
    assert_eq!(
        registry.list_tools().next().unwrap().description,
        "Shout the given text"
    );
}

fn counting_confirmed_tool(runs: Arc<AtomicUsize>) -> AgentTool {
    AgentTool::new(
        "delete_file",
        "Delete a file",
        ToolParameters::object().string("path", "File path", true).build(),
        move |args, _ctx| {
            let runs = runs.clone();
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(json!(format!("deleted {}", args.get_str("path")?)))
            }
        },
    )
    .with_display_name("Delete File")
    .with_confirmation()
}

#[tokio::test]
async fn confirmation_is_two_phase() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(counting_confirmed_tool(runs.clone())).unwrap();
    let params = json!({ "path": "notes.txt" });

    let pending = registry
        .execute("delete_file", params.clone(), ExecuteOptions::default())
        .await
        .unwrap();

    let details = pending.confirmation.clone().unwrap();
    assert_eq!(details.title, "Confirm Delete File");
    assert_eq!(details.params, params);
    assert_eq!(runs.load(Ordering::SeqCst), 0);

    let executed = registry
        .execute("delete_file", params, ExecuteOptions::confirmed())
        .await
        .unwrap();

    assert_eq!(executed.display_content, "deleted notes.txt");
    assert!(!executed.requires_confirmation());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_confirmation_never_runs_tool() {
    let runs = Arc::new(AtomicUsize::new(0));
    let mut registry = ToolRegistry::new();
    registry.register(counting_confirmed_tool(runs.clone())).unwrap();

    let pending = registry
        .execute("delete_file", json!({ "path": "a" }), ExecuteOptions::default())
        .await
        .unwrap();
    let rejected = ToolResult::rejected(pending.confirmation.as_ref().unwrap());

    assert!(rejected.is_error);
    assert_eq!(runs.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn progress_is_not_delivered_after_result() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    let sink: ProgressSink = Arc::new(move |msg: String| sink_seen.lock().unwrap().push(msg));

    let mut registry = ToolRegistry::new();
    registry
        .register(AgentTool::new(
            "slow",
            "Reports progress, then leaks a late update",
            ToolParameters::empty(),
            |_args, ctx: ToolExecutionContext| async move {
                ctx.progress.report("step 1");
                ctx.progress.report("step 2");
                let late = ctx.progress.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    late.report("too late");
                });
                Ok(json!("done"))
            },
        ))
        .unwrap();

    let result = registry
        .execute("slow", json!({}), ExecuteOptions::default().with_progress(sink))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert_eq!(result.display_content, "done");
    assert_eq!(*seen.lock().unwrap(), vec!["step 1".to_string(), "step 2".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_progress_never_lands_after_result() {
    let result_seen = Arc::new(AtomicBool::new(false));
    let late = Arc::new(AtomicUsize::new(0));
    let (sink_seen, sink_late) = (result_seen.clone(), late.clone());
    let sink: ProgressSink = Arc::new(move |_msg: String| {
        if sink_seen.load(Ordering::SeqCst) {
            sink_late.fetch_add(1, Ordering::SeqCst);
        }
    });

    let reporter_task: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>> =
        Arc::new(Mutex::new(None));
    let task_slot = reporter_task.clone();

    let mut registry = ToolRegistry::new();
    registry
        .register(AgentTool::new(
            "chatty",
            "Keeps reporting from a background task",
            ToolParameters::empty(),
            move |_args, ctx: ToolExecutionContext| {
                let task_slot = task_slot.clone();
                async move {
                    let progress = ctx.progress.clone();
                    let handle = tokio::spawn(async move {
                        while !progress.is_closed() {
                            progress.report("tick");
                            tokio::task::yield_now().await;
                        }
                        for _ in 0..100 {
                            progress.report("tick");
                        }
                    });
                    *task_slot.lock().unwrap() = Some(handle);
                    tokio::task::yield_now().await;
                    Ok(json!("done"))
                }
            },
        ))
        .unwrap();

    for _ in 0..20 {
        let result = registry
            .execute("chatty", json!({}), ExecuteOptions::default().with_progress(sink.clone()))
            .await
            .unwrap();
        result_seen.store(true, Ordering::SeqCst);

        let handle = reporter_task.lock().unwrap().take().unwrap();
        handle.await.unwrap();

        assert_eq!(result.display_content, "done");
        assert_eq!(late.load(Ordering::SeqCst), 0);
        result_seen.store(false, Ordering::SeqCst);
    }
}

struct PanickingTool {
    parameters: ToolParameters,
}

#[async_trait]
impl Tool for PanickingTool {
    fn name(&self) -> &str {
        "explode"
    }

    fn description(&self) -> &str {
        "Always panics"
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn execute(&self, _args: &ToolArguments, _ctx: &ToolExecutionContext) -> Result<ToolResult> {
        panic!("kaboom")
    }
}

#[tokio::test]
async fn panicking_tool_is_contained() {
    let mut registry = ToolRegistry::new();
    registry
        .register(PanickingTool {
            parameters: ToolParameters::empty(),
        })
        .unwrap();

    let result = registry
        .execute("explode", json!({}), ExecuteOptions::default())
        .await
        .unwrap();

    assert!(result.is_error);
    assert!(result.display_content.contains("kaboom"));
}

#[tokio::test]
async fn execute_receives_call_context() {
    let mut registry = ToolRegistry::new();
    registry
        .register(AgentTool::new(
            "whoami",
            "Report call context",
            ToolParameters::empty(),
            |_args, ctx: ToolExecutionContext| async move {
                Ok(json!({
                    "tool": ctx.tool_name,
                    "call": ctx.tool_call_id,
                }))
            },
        ))
        .unwrap();

    let result = registry
        .execute(
            "whoami",
            json!({}),
            ExecuteOptions::default().with_tool_call_id("call_7"),
        )
        .await
        .unwrap();

    assert_eq!(result.model_content, json!({ "tool": "whoami", "call": "call_7" }));
}

#[test]
fn tool_spec_snapshot_uses_display_name() {
    let mut registry = ToolRegistry::new();
    registry
        .register(echo_tool().with_display_name("Echo"))
        .unwrap();

    let spec = registry.list_tools().next().unwrap();

    assert_eq!(spec.name, "echo");
    assert_eq!(spec.display_name, "Echo");
    assert_eq!(spec.parameters["required"], json!(["text"]));
    assert!(!spec.is_output_markdown);
}

#[test]
fn builtin_specs_flag_markdown_output() {
    let mut registry = ToolRegistry::new();
    builtin::register_builtin_tools(&mut registry).unwrap();

    let markdown: Vec<(String, bool)> = registry
        .list_tools()
        .map(|spec| (spec.name, spec.is_output_markdown))
        .collect();

    assert_eq!(
        markdown,
        vec![
            ("math_calculator".to_string(), false),
            ("echo_tool".to_string(), true),
            ("memory_tool".to_string(), true),
        ]
    );
}
