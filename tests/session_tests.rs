mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;

use baton::prelude::*;
use baton::types::ToolCallResult;
use common::{calls, echo_tool, text, ScriptedProvider};

fn runner(provider: &Arc<ScriptedProvider>) -> Runner {
    Runner::new(
        provider.clone(),
        AgentGraph::single(Agent::new("assistant", "m").with_tool(echo_tool())).unwrap(),
    )
}

#[tokio::test]
async fn history_is_replayed_and_new_items_are_saved() {
    let provider = ScriptedProvider::new();
    provider.push(text("first answer")).push(text("second answer"));
    let runner = runner(&provider);
    let session = Arc::new(InMemorySession::new("conv-1"));
    let options = RunOptions::new().with_session(session.clone());

    runner
        .run_with_options("assistant", "question one", &RunContext::new(), options.clone())
        .await
        .unwrap();
    runner
        .run_with_options("assistant", "question two", &RunContext::new(), options)
        .await
        .unwrap();

    assert_eq!(
        provider.requests()[1].input,
        vec![
            ConversationItem::user("question one"),
            ConversationItem::user("question two"),
        ]
    );
    assert_eq!(
        session.get_items(None).await.unwrap(),
        vec![
            ConversationItem::user("question one"),
            ConversationItem::assistant("first answer"),
            ConversationItem::user("question two"),
            ConversationItem::assistant("second answer"),
        ]
    );
}

#[tokio::test]
async fn session_limit_reads_only_recent_items() {
    let provider = ScriptedProvider::new();
    provider.push(text("ok"));
    let runner = runner(&provider);
    let session = Arc::new(InMemorySession::with_items(
        "conv-2",
        vec![
            ConversationItem::user("old"),
            ConversationItem::user("recent"),
        ],
    ));

    runner
        .run_with_options(
            "assistant",
            "now",
            &RunContext::new(),
            RunOptions::new()
                .with_session(session.clone())
                .with_session_limit(1),
        )
        .await
        .unwrap();

    assert_eq!(
        provider.requests()[0].input,
        vec![ConversationItem::user("recent"), ConversationItem::user("now")]
    );
    assert_eq!(session.len().await, 4);
}

#[tokio::test]
async fn session_limit_keeps_tool_results_with_their_requests() {
    let provider = ScriptedProvider::new();
    provider.push(text("ok"));
    let runner = runner(&provider);
    let session = Arc::new(InMemorySession::with_items(
        "conv-split",
        vec![
            ConversationItem::user("look both up"),
            ConversationItem::tool_call("a", "echo", json!({"text": "a"})),
            ConversationItem::tool_call("b", "echo", json!({"text": "b"})),
            ToolCallResult::success("a", "echo", json!("a")).into(),
            ToolCallResult::success("b", "echo", json!("b")).into(),
            ConversationItem::user("and then?"),
        ],
    ));

    runner
        .run_with_options(
            "assistant",
            "now",
            &RunContext::new(),
            RunOptions::new()
                .with_session(session.clone())
                .with_session_limit(4),
        )
        .await
        .unwrap();

    assert_eq!(
        provider.requests()[0].input,
        vec![ConversationItem::user("and then?"), ConversationItem::user("now")]
    );
    assert_eq!(session.len().await, 8);
}

#[tokio::test]
async fn failed_runs_leave_the_session_untouched() {
    let provider = ScriptedProvider::new();
    provider.push_error(BatonError::api(503, "busy"));
    let runner = runner(&provider);
    let session = Arc::new(InMemorySession::new("conv-3"));

    let err = runner
        .run_with_options(
            "assistant",
            "hi",
            &RunContext::new(),
            RunOptions::new().with_session(session.clone()),
        )
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert!(session.is_empty().await);
}

#[tokio::test]
async fn tool_items_are_persisted_in_order() {
    let provider = ScriptedProvider::new();
    provider
        .push(calls(&[("c1", "echo", json!({"text": "x"}))]))
        .push(text("done"));
    let runner = runner(&provider);
    let session = Arc::new(InMemorySession::new("conv-4"));

    runner
        .run_with_options(
            "assistant",
            "go",
            &RunContext::new(),
            RunOptions::new().with_session(session.clone()),
        )
        .await
        .unwrap();

    assert_eq!(
        session.get_items(None).await.unwrap(),
        vec![
            ConversationItem::user("go"),
            ConversationItem::tool_call("c1", "echo", json!({"text": "x"})),
            ToolCallResult::success("c1", "echo", json!("x")).into(),
            ConversationItem::assistant("done"),
        ]
    );
}
