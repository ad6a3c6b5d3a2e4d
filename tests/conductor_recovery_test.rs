// tests/conductor_recovery_test.rs
// Failure handling: per-task retry escalating to exactly one strategic
// re-plan, and the polish pass applying a verbatim snippet fix.

mod common;

use std::time::Duration;

use serde_json::json;

use common::*;

#[tokio::test]
async fn repeated_task_failure_triggers_one_replan() {
    let bad_code = "def broken(:";
    let stub = spawn_stub_llm(vec![
        // Attempt 1: tool selection, then generation that fails validation.
        json!({
            "tool_call": {"tool_name": "write_file", "arguments": {"path": "bar.py", "task_description": "Implement function foo"}}
        })
        .to_string(),
        bad_code.to_string(),
        // Attempt 2: same again.
        json!({
            "tool_call": {"tool_name": "write_file", "arguments": {"path": "bar.py", "task_description": "Implement function foo"}}
        })
        .to_string(),
        bad_code.to_string(),
        // Strategic re-plan.
        json!({"plan": ["Create bar.py implementing function foo directly"]}).to_string(),
        // The replacement task succeeds with literal content.
        json!({
            "tool_call": {"tool_name": "write_file", "arguments": {"path": "bar.py", "content": "def foo():\n    return 42\n"}}
        })
        .to_string(),
        // Polish pass and summary.
        json!({"fixes": []}).to_string(),
        "Mission accomplished!".to_string(),
    ])
    .await;
    let app = spawn_app(&stub.url).await;
    let (token, user_id) = register_and_login(&app).await;
    seed_llm_config(&app, &token).await;
    create_project(&app, &token, "p3").await;
    let ws = connect_ws(&app, &token, "command_deck").await;

    let response = app
        .client
        .post(format!("{}/missions/p3/tasks", app.address))
        .bearer_auth(&token)
        .json(&json!({"description": "Implement function foo in bar.py"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let response = app
        .client
        .post(format!("{}/projects/dispatch", app.address))
        .bearer_auth(&token)
        .json(&json!({"project_name": "p3"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    assert!(
        ws.wait_for_type("mission_success", Duration::from_secs(20)).await,
        "mission did not recover to success"
    );

    // Exactly one re-plan invocation.
    assert_eq!(stub.request_count_containing("RE-PLANNING DIRECTIVES").await, 1);

    // The failed task id is gone; the replacement suffix ran to completion.
    let log = read_mission_log(&app, user_id, "p3").unwrap();
    let tasks = log["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["id"], 2, "replacement task gets a fresh id");
    assert_eq!(tasks[0]["done"], true);

    let bar_py = std::fs::read_to_string(app.project_root(user_id, "p3").join("bar.py")).unwrap();
    assert!(bar_py.contains("def foo"));

    // The failing attempts streamed their broken code to the user.
    assert!(ws.has_type("code_stream_chunk").await);
}

#[tokio::test]
async fn polish_pass_applies_snippet_fix() {
    let stub = spawn_stub_llm(vec![
        json!({
            "tool_call": {"tool_name": "write_file", "arguments": {
                "path": "router.py",
                "content": "from database import read_contacts\n\n\ndef get_contacts():\n    return load_contacts()\n"
            }}
        })
        .to_string(),
        // The linter catches the name error.
        json!({"fixes": [{
            "file_path": "router.py",
            "original_code_snippet": "load_contacts()",
            "fixed_code_snippet": "read_contacts()",
            "reason": "NameError: the imported symbol is read_contacts"
        }]})
        .to_string(),
        "Mission accomplished!".to_string(),
    ])
    .await;
    let app = spawn_app(&stub.url).await;
    let (token, user_id) = register_and_login(&app).await;
    seed_llm_config(&app, &token).await;
    create_project(&app, &token, "p6").await;
    let ws = connect_ws(&app, &token, "command_deck").await;

    let response = app
        .client
        .post(format!("{}/missions/p6/tasks", app.address))
        .bearer_auth(&token)
        .json(&json!({"description": "Implement the contacts API in router.py"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    let response = app
        .client
        .post(format!("{}/projects/dispatch", app.address))
        .bearer_auth(&token)
        .json(&json!({"project_name": "p6"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    assert!(
        ws.wait_for_type("mission_success", Duration::from_secs(20)).await,
        "mission did not complete"
    );

    let router_py =
        std::fs::read_to_string(app.project_root(user_id, "p6").join("router.py")).unwrap();
    assert!(router_py.contains("return read_contacts()"));
    assert!(!router_py.contains("load_contacts()"));

    // The patch was narrated.
    let narrated = ws.snapshot().await.iter().any(|m| {
        m["type"] == "system_log"
            && m["content"].as_str().unwrap_or("").contains("Patched bug in `router.py`")
    });
    assert!(narrated, "polish patch was not narrated");
}
