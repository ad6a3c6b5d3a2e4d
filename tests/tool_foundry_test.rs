// tests/tool_foundry_test.rs
// Tool runner invariants: sandboxed paths, idempotent requirements edits,
// and index refresh as part of a mutating tool call.

mod common;

use serde_json::json;

use aura_backend::foundry::runner::failure_message;
use aura_backend::foundry::{Invocation, ToolRunner};
use aura_backend::session::AgentSession;

use common::*;

async fn project_fixture(
    app: &TestApp,
    user_id: i64,
    name: &str,
) -> (AgentSession, aura_backend::session::ProjectSession) {
    let session = AgentSession::build(app.state.clone(), user_id).await.unwrap();
    session.projects.new_project(name).unwrap();
    let project = session.open_project(name).unwrap();
    (session, project)
}

#[tokio::test]
async fn path_escapes_are_rejected_for_every_path_param() {
    let stub = spawn_stub_llm(vec![]).await;
    let app = spawn_app(&stub.url).await;
    let (_token, user_id) = register_and_login(&app).await;
    let (session, project) = project_fixture(&app, user_id, "sandboxed").await;

    let ctx = project.tool_context(&session, "probe");
    let runner = ToolRunner::new(app.state.foundry.clone());

    for (tool, args) in [
        ("write_file", json!({"path": "../outside.py", "content": "x = 1"})),
        ("read_file", json!({"path": "/etc/passwd"})),
        ("copy_file", json!({"source_path": "a.py", "destination_path": "../../b.py"})),
    ] {
        let result = runner
            .run(
                &ctx,
                &Invocation {
                    tool_name: tool.to_string(),
                    arguments: args,
                },
            )
            .await;
        let failure = failure_message(&result);
        assert!(failure.is_some(), "{} accepted an escaping path", tool);
        assert!(failure.unwrap().contains("escapes the project workspace"));
    }

    // Nothing leaked outside the project directory.
    assert!(!project.context.project_root.parent().unwrap().join("b.py").exists());
}

#[tokio::test]
async fn add_dependency_is_idempotent() {
    let stub = spawn_stub_llm(vec![]).await;
    let app = spawn_app(&stub.url).await;
    let (_token, user_id) = register_and_login(&app).await;
    let (session, project) = project_fixture(&app, user_id, "deps").await;

    let ctx = project.tool_context(&session, "deps");
    let runner = ToolRunner::new(app.state.foundry.clone());
    let invocation = Invocation {
        tool_name: "add_dependency_to_requirements".to_string(),
        arguments: json!({"dependencies": ["fastapi", "requests==2.32.0"]}),
    };

    let first = runner.run(&ctx, &invocation).await;
    assert!(failure_message(&first).is_none());
    let second = runner.run(&ctx, &invocation).await;
    assert!(failure_message(&second).is_none());
    assert!(second.as_str().unwrap().contains("Already existed"));

    let requirements =
        std::fs::read_to_string(project.context.project_root.join("requirements.txt")).unwrap();
    assert_eq!(requirements.matches("fastapi").count(), 1);
    assert_eq!(requirements.matches("requests==2.32.0").count(), 1);
}

#[tokio::test]
async fn structure_edit_refreshes_both_indices() {
    let stub = spawn_stub_llm(vec![]).await;
    let app = spawn_app(&stub.url).await;
    let (_token, user_id) = register_and_login(&app).await;
    let (session, project) = project_fixture(&app, user_id, "edits").await;

    let ctx = project.tool_context(&session, "edits");
    let runner = ToolRunner::new(app.state.foundry.clone());

    let result = runner
        .run(
            &ctx,
            &Invocation {
                tool_name: "add_function_to_file".to_string(),
                arguments: json!({
                    "path": "util.py",
                    "function_code": "def compute_total(items):\n    return sum(items)\n"
                }),
            },
        )
        .await;
    assert!(failure_message(&result).is_none(), "edit failed: {}", result);

    // Symbol index sees the new definition immediately.
    assert_eq!(project.symbols.read().find_definition("compute_total").len(), 1);

    // Vector index has a chunk for the new function.
    let hits = project.vector.query("compute total of items", 3).await;
    assert!(hits.iter().any(|h| h.metadata.node_name == "compute_total"));

    // And the follow-up rename keeps both in sync.
    let result = runner
        .run(
            &ctx,
            &Invocation {
                tool_name: "rename_symbol_in_file".to_string(),
                arguments: json!({"path": "util.py", "old_name": "compute_total", "new_name": "total"}),
            },
        )
        .await;
    assert!(failure_message(&result).is_none());
    assert!(project.symbols.read().find_definition("compute_total").is_empty());
    assert_eq!(project.symbols.read().find_definition("total").len(), 1);
}

#[tokio::test]
async fn unknown_tool_is_reported() {
    let stub = spawn_stub_llm(vec![]).await;
    let app = spawn_app(&stub.url).await;
    let (_token, user_id) = register_and_login(&app).await;
    let (session, project) = project_fixture(&app, user_id, "unknown").await;

    let ctx = project.tool_context(&session, "probe");
    let runner = ToolRunner::new(app.state.foundry.clone());
    let result = runner
        .run(
            &ctx,
            &Invocation {
                tool_name: "summon_demon".to_string(),
                arguments: json!({}),
            },
        )
        .await;
    let failure = failure_message(&result).unwrap();
    assert!(failure.contains("not found in the foundry"));
}
