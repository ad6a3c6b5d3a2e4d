// tests/planning_test.rs
// The planning assembly line: a passing audit persists the plan, a failing
// audit leaves the mission log untouched.

mod common;

use std::time::Duration;

use serde_json::json;

use common::*;

#[tokio::test]
async fn planner_workflow_persists_audited_plan() {
    let stub = spawn_stub_llm(vec![
        // Intent detection (in-request)
        json!({"intent": "PLAN"}).to_string(),
        // Architect
        json!({
            "draft_blueprint": {"summary": "print hello", "components": ["main.py"], "dependencies": []},
            "critique": "Simple enough.",
            "final_blueprint": {"summary": "print hello", "components": ["main.py"], "dependencies": []}
        })
        .to_string(),
        // Auditor
        json!({"audit_passed": true}).to_string(),
        // Sequencer
        json!({"final_plan": ["Create file main.py", "Write a print statement in main.py"]}).to_string(),
    ])
    .await;
    let app = spawn_app(&stub.url).await;
    let (token, user_id) = register_and_login(&app).await;
    seed_llm_config(&app, &token).await;
    create_project(&app, &token, "p1").await;
    let ws = connect_ws(&app, &token, "command_deck").await;

    let response = app
        .client
        .post(format!("{}/projects/p1/prompt", app.address))
        .bearer_auth(&token)
        .json(&json!({
            "prompt": "Create a Python script main.py that prints Hello, World.",
            "history": []
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    let planned = wait_for_sync(Duration::from_secs(10), || {
        read_mission_log(&app, user_id, "p1")
            .map(|log| log["tasks"].as_array().map(|t| t.len()).unwrap_or(0) == 2)
            .unwrap_or(false)
    })
    .await;
    assert!(planned, "plan was not persisted to mission_log.json");

    let log = read_mission_log(&app, user_id, "p1").unwrap();
    assert_eq!(log["initial_goal"], "Create a Python script main.py that prints Hello, World.");
    let tasks = log["tasks"].as_array().unwrap();
    assert_eq!(tasks[0]["id"], 1);
    assert_eq!(tasks[0]["description"], "Create file main.py");
    assert_eq!(tasks[0]["done"], false);
    assert_eq!(tasks[1]["id"], 2);

    // The UI heard about the plan and the phases along the way.
    ws.wait_for_type("mission_log_updated", Duration::from_secs(5)).await;
    assert!(ws.has_type("phase").await);
}

#[tokio::test]
async fn failed_audit_leaves_mission_log_unchanged() {
    let stub = spawn_stub_llm(vec![
        json!({"intent": "PLAN"}).to_string(),
        // Architect hallucinates a chess app for a tennis prompt.
        json!({
            "draft_blueprint": {"summary": "a chess engine", "components": ["engine.py"], "dependencies": []},
            "critique": "Fine.",
            "final_blueprint": {"summary": "a chess engine", "components": ["engine.py"], "dependencies": []}
        })
        .to_string(),
        json!({"audit_passed": false}).to_string(),
    ])
    .await;
    let app = spawn_app(&stub.url).await;
    let (token, user_id) = register_and_login(&app).await;
    seed_llm_config(&app, &token).await;
    create_project(&app, &token, "p2").await;
    let ws = connect_ws(&app, &token, "command_deck").await;

    let response = app
        .client
        .post(format!("{}/projects/p2/prompt", app.address))
        .bearer_auth(&token)
        .json(&json!({"prompt": "Tennis leaderboard app", "history": []}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 202);

    // The audit-failure narration reaches the user...
    let narrated = ws
        .wait_until(Duration::from_secs(10), |messages| {
            messages.iter().any(|m| {
                m["type"] == "system_log"
                    && m["content"].as_str().unwrap_or("").contains("Audit failed")
            })
        })
        .await;
    assert!(narrated, "audit failure was not narrated as system_log");

    // ...and no tasks were ever created.
    let log = read_mission_log(&app, user_id, "p2").unwrap();
    assert_eq!(log["tasks"].as_array().unwrap().len(), 0);
    // The sequencer was never consulted.
    assert_eq!(stub.request_count_containing("final_plan").await, 0);
}
