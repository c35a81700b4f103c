mod common;

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use baton::prelude::*;
use baton::provider::{ModelResponse, RawOutput};
use baton::types::{HostedTool, OutputSchema, ToolCallResult};
use common::{calls, echo_tool, failing_tool, nap_tool, text, usage, Gauge, ScriptedProvider};

fn runner_for(provider: &std::sync::Arc<ScriptedProvider>, agent: Agent) -> Runner {
    Runner::new(provider.clone(), AgentGraph::single(agent).unwrap())
}

#[tokio::test]
async fn text_response_finishes_in_one_turn() {
    let provider = ScriptedProvider::new();
    provider.push(text("hello there"));
    let runner = runner_for(
        &provider,
        Agent::new("assistant", "m").with_instructions("Be kind"),
    );
    let ctx = RunContext::new();

    let result = runner.run("assistant", "hi", &ctx).await.unwrap();

    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(result.final_text().as_deref(), Some("hello there"));
    assert_eq!(result.turns, 1);
    assert_eq!(result.last_agent, "assistant");
    assert_eq!(result.usage, usage());
    assert_eq!(ctx.usage(), usage());
    assert_eq!(
        result.items,
        vec![
            ConversationItem::user("hi"),
            ConversationItem::assistant("hello there")
        ]
    );

    let request = &provider.requests()[0];
    assert_eq!(request.instructions.as_deref(), Some("Be kind"));
    assert_eq!(request.input, vec![ConversationItem::user("hi")]);
}

#[tokio::test]
async fn parallel_calls_append_requests_then_results_in_order() {
    let provider = ScriptedProvider::new();
    provider
        .push(calls(&[
            ("a", "echo", json!({"text": "one"})),
            ("b", "echo", json!({"text": "two"})),
        ]))
        .push(text("done"));
    let runner = runner_for(&provider, Agent::new("assistant", "m").with_tool(echo_tool()));

    let result = runner.run("assistant", "go", &RunContext::new()).await.unwrap();

    let replayed = vec![
        ConversationItem::user("go"),
        ConversationItem::tool_call("a", "echo", json!({"text": "one"})),
        ConversationItem::tool_call("b", "echo", json!({"text": "two"})),
        ToolCallResult::success("a", "echo", json!("one")).into(),
        ToolCallResult::success("b", "echo", json!("two")).into(),
    ];
    let mut expected = replayed.clone();
    expected.push(ConversationItem::assistant("done"));
    assert_eq!(result.items, expected);
    assert_eq!(result.turns, 2);
    assert_eq!(result.usage, usage() + usage());

    let requests = provider.requests();
    assert_eq!(requests[0].tool_names(), vec!["echo"]);
    assert_eq!(requests[1].input, replayed);
}

#[tokio::test(start_paused = true)]
async fn slower_call_still_lands_first() {
    let gauge = Gauge::new();
    let provider = ScriptedProvider::new();
    provider
        .push(calls(&[
            ("slow", "nap", json!({"ms": 200})),
            ("fast", "nap", json!({"ms": 20})),
        ]))
        .push(text("rested"));
    let runner = runner_for(
        &provider,
        Agent::new("assistant", "m").with_tool(nap_tool(gauge.clone())),
    );

    let result = runner.run("assistant", "go", &RunContext::new()).await.unwrap();

    assert_eq!(
        result.items,
        vec![
            ConversationItem::user("go"),
            ConversationItem::tool_call("slow", "nap", json!({"ms": 200})),
            ConversationItem::tool_call("fast", "nap", json!({"ms": 20})),
            ToolCallResult::success("slow", "nap", json!(200)).into(),
            ToolCallResult::success("fast", "nap", json!(20)).into(),
            ConversationItem::assistant("rested"),
        ]
    );
    assert_eq!(gauge.peak(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrency_limit_runs_calls_one_at_a_time() {
    let gauge = Gauge::new();
    let provider = ScriptedProvider::new();
    provider
        .push(calls(&[
            ("n1", "nap", json!({"ms": 100})),
            ("n2", "nap", json!({"ms": 100})),
        ]))
        .push(text("rested"));
    let runner = runner_for(
        &provider,
        Agent::new("assistant", "m").with_tool(nap_tool(gauge.clone())),
    )
    .with_config(RunnerConfig::default().with_max_tool_concurrency(1));

    let started = tokio::time::Instant::now();
    let result = runner.run("assistant", "go", &RunContext::new()).await.unwrap();

    assert_eq!(result.final_text().as_deref(), Some("rested"));
    assert_eq!(gauge.peak(), 1);
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn failing_tool_becomes_an_error_result() {
    let provider = ScriptedProvider::new();
    provider
        .push(calls(&[("f1", "fail", json!({}))]))
        .push(text("recovered"));
    let runner = runner_for(&provider, Agent::new("assistant", "m").with_tool(failing_tool()));

    let result = runner.run("assistant", "go", &RunContext::new()).await.unwrap();

    assert!(result
        .items
        .contains(&ToolCallResult::error("f1", "fail", "disk on fire").into()));
    assert_eq!(result.final_text().as_deref(), Some("recovered"));
}

#[tokio::test]
async fn disabled_tool_is_hidden_and_not_found() {
    let hidden = FunctionTool::new("secret", "", ToolParameters::empty(), |_, _| async {
        Ok(json!("ran"))
    })
    .with_enabled(false)
    .into_arc();
    let provider = ScriptedProvider::new();
    provider
        .push(calls(&[("s1", "secret", json!({}))]))
        .push(text("ok"));
    let runner = runner_for(&provider, Agent::new("assistant", "m").with_tool(hidden));

    let result = runner.run("assistant", "go", &RunContext::new()).await.unwrap();

    assert!(provider.requests()[0].tools.is_empty());
    assert!(result
        .items
        .contains(&ToolCallResult::error("s1", "secret", "Tool 'secret' not found").into()));
}

#[tokio::test]
async fn unparseable_arguments_fail_validation() {
    let provider = ScriptedProvider::new();
    provider
        .push(ModelResponse::new(
            vec![RawOutput::function_call("e1", "echo", json!("{not json"))],
            usage(),
        ))
        .push(text("ok"));
    let runner = runner_for(&provider, Agent::new("assistant", "m").with_tool(echo_tool()));

    let result = runner.run("assistant", "go", &RunContext::new()).await.unwrap();

    let error = result
        .items
        .iter()
        .find_map(|item| item.as_tool_result())
        .and_then(|r| r.error_message().map(str::to_string))
        .unwrap();
    assert!(error.starts_with("Argument validation failed"), "{error}");
}

#[tokio::test]
async fn turn_limit_aborts_after_exactly_max_turns() {
    let provider = ScriptedProvider::new();
    for id in ["c0", "c1", "c2"] {
        provider.push(calls(&[(id, "echo", json!({"text": "again"}))]));
    }
    let runner = runner_for(&provider, Agent::new("assistant", "m").with_tool(echo_tool()))
        .with_config(RunnerConfig::default().with_max_turns(2));

    let err = runner.run("assistant", "loop", &RunContext::new()).await.unwrap_err();

    assert!(matches!(
        err,
        BatonError::MaxTurnsExceeded {
            max_turns: 2,
            turns: 2
        }
    ));
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn per_run_turn_limit_overrides_config() {
    let provider = ScriptedProvider::new();
    provider.push(calls(&[("c1", "echo", json!({"text": "x"}))]));
    let runner = runner_for(&provider, Agent::new("assistant", "m").with_tool(echo_tool()));

    let err = runner
        .run_with_options(
            "assistant",
            "go",
            &RunContext::new(),
            RunOptions::new().with_max_turns(1),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BatonError::MaxTurnsExceeded { turns: 1, .. }));
}

#[tokio::test]
async fn empty_response_is_model_misbehavior() {
    let provider = ScriptedProvider::new();
    provider.push(ModelResponse::new(Vec::new(), usage()));
    let runner = runner_for(&provider, Agent::new("assistant", "m"));

    let err = runner.run("assistant", "hi", &RunContext::new()).await.unwrap_err();

    assert!(matches!(err, BatonError::ModelBehavior(_)));
}

#[tokio::test]
async fn provider_errors_are_fatal() {
    let provider = ScriptedProvider::new();
    provider.push_error(BatonError::api(500, "upstream down"));
    let runner = runner_for(&provider, Agent::new("assistant", "m"));

    let err = runner.run("assistant", "hi", &RunContext::new()).await.unwrap_err();

    assert!(matches!(err, BatonError::Api { status: 500, .. }));
}

#[tokio::test]
async fn unknown_agent_is_a_configuration_error() {
    let provider = ScriptedProvider::new();
    let runner = runner_for(&provider, Agent::new("assistant", "m"));

    let err = runner.run("nobody", "hi", &RunContext::new()).await.unwrap_err();

    assert!(matches!(err, BatonError::Configuration(_)));
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn structured_output_is_parsed_and_validated() {
    let schema = OutputSchema::new(
        "answer",
        json!({
            "type": "object",
            "properties": {"value": {"type": "integer"}},
            "required": ["value"]
        }),
    );
    let provider = ScriptedProvider::new();
    provider.push(text(r#"{"value": 42}"#)).push(text(r#"{"other": 1}"#));
    let runner = runner_for(
        &provider,
        Agent::new("assistant", "m").with_output_schema(schema),
    );

    let ok = runner.run("assistant", "q", &RunContext::new()).await.unwrap();
    assert_eq!(
        ok.final_output,
        Some(MessageContent::Structured(json!({"value": 42})))
    );
    assert_eq!(provider.requests()[0].output_schema.as_ref().unwrap().name, "answer");

    let err = runner.run("assistant", "q", &RunContext::new()).await.unwrap_err();
    assert!(matches!(err, BatonError::ModelBehavior(_)));
}

#[tokio::test]
async fn stop_on_first_tool_uses_the_tool_result() {
    let provider = ScriptedProvider::new();
    provider.push(calls(&[("c1", "echo", json!({"text": "from tool"}))]));
    let runner = runner_for(
        &provider,
        Agent::new("assistant", "m")
            .with_tool(echo_tool())
            .with_tool_use_behavior(ToolUseBehavior::StopOnFirstTool),
    );

    let result = runner.run("assistant", "go", &RunContext::new()).await.unwrap();

    assert_eq!(result.final_text().as_deref(), Some("from tool"));
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn hosted_call_with_vendor_output_needs_no_local_execution() {
    let provider = ScriptedProvider::new();
    provider.push(ModelResponse::new(
        vec![
            RawOutput::HostedToolCall {
                call_id: "w1".into(),
                tool: HostedTool::WebSearch,
                arguments: json!({"query": "rust"}),
                output: Some(json!(["result"])),
            },
            RawOutput::text("found it"),
        ],
        usage(),
    ));
    let runner = runner_for(&provider, Agent::new("assistant", "m"));

    let result = runner.run("assistant", "search", &RunContext::new()).await.unwrap();

    assert_eq!(result.turns, 1);
    assert_eq!(result.final_text().as_deref(), Some("found it"));
    assert!(result
        .items
        .contains(&ToolCallResult::success("w1", "web_search", json!(["result"])).into()));
}

#[tokio::test]
async fn hosted_call_without_output_is_not_implemented() {
    let provider = ScriptedProvider::new();
    provider.push(ModelResponse::new(
        vec![RawOutput::HostedToolCall {
            call_id: "x1".into(),
            tool: HostedTool::CodeInterpreter,
            arguments: json!({}),
            output: None,
        }],
        usage(),
    ));
    let runner = runner_for(&provider, Agent::new("assistant", "m"));

    let err = runner.run("assistant", "run", &RunContext::new()).await.unwrap_err();

    assert!(matches!(err, BatonError::NotImplemented(_)));
}

#[tokio::test(start_paused = true)]
async fn slow_model_call_times_out() {
    let provider = ScriptedProvider::with_delay(Duration::from_secs(60));
    provider.push(text("too late"));
    let runner = runner_for(&provider, Agent::new("assistant", "m"))
        .with_config(RunnerConfig::default().with_model_timeout(Duration::from_millis(100)));

    let err = runner.run("assistant", "hi", &RunContext::new()).await.unwrap_err();

    assert!(matches!(err, BatonError::Timeout(100)));
}

#[tokio::test]
async fn response_ids_chain_across_turns() {
    let provider = ScriptedProvider::new();
    provider
        .push(calls(&[("c1", "echo", json!({"text": "x"}))]).with_response_id("resp_1"))
        .push(text("done").with_response_id("resp_2"));
    let runner = runner_for(&provider, Agent::new("assistant", "m").with_tool(echo_tool()));

    let result = runner
        .run_with_options(
            "assistant",
            "go",
            &RunContext::new(),
            RunOptions::new().with_previous_response_id("resp_0"),
        )
        .await
        .unwrap();

    let requests = provider.requests();
    assert_eq!(requests[0].previous_response_id.as_deref(), Some("resp_0"));
    assert_eq!(requests[1].previous_response_id, None);
    assert_eq!(result.last_response_id.as_deref(), Some("resp_2"));
}

#[tokio::test]
async fn concurrent_runs_share_a_context() {
    let provider = ScriptedProvider::new();
    provider.push(text("a")).push(text("b"));
    let runner = runner_for(&provider, Agent::new("assistant", "m"));
    let ctx = RunContext::new();

    let (first, second) = tokio::join!(
        runner.run("assistant", "one", &ctx),
        runner.run("assistant", "two", &ctx)
    );

    let mut outputs = vec![
        first.unwrap().final_text().unwrap(),
        second.unwrap().final_text().unwrap(),
    ];
    outputs.sort();
    assert_eq!(outputs, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(ctx.usage(), usage() + usage());
}
