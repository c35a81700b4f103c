//! Shared test helpers and a scripted model provider.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use baton::error::BatonError;
use baton::provider::{ModelProvider, ModelRequest, ModelResponse, RawOutput};
use baton::tools::{FunctionTool, Tool, ToolParameters};
use baton::types::Usage;

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ModelResponse, BatonError>>>,
    requests: Mutex<Vec<ModelRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Self::default()
        })
    }

    pub fn push(&self, response: ModelResponse) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn push_error(&self, error: BatonError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn respond(&self, request: &ModelRequest) -> Result<ModelResponse, BatonError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.responses.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(BatonError::InvalidState("script exhausted".into())))
    }
}

pub fn usage() -> Usage {
    Usage::new(10, 5)
}

/// A response holding one text message.
pub fn text(text: &str) -> ModelResponse {
    ModelResponse::new(vec![RawOutput::text(text)], usage())
}

/// A response requesting the given function calls.
pub fn calls(calls: &[(&str, &str, serde_json::Value)]) -> ModelResponse {
    ModelResponse::new(
        calls
            .iter()
            .map(|(id, name, args)| RawOutput::function_call(*id, *name, args.clone()))
            .collect(),
        usage(),
    )
}

/// `echo` returns its `text` argument.
pub fn echo_tool() -> Arc<dyn Tool> {
    FunctionTool::new(
        "echo",
        "Echo the input",
        ToolParameters::object()
            .string("text", "text to echo", true)
            .build(),
        |args, _| async move { Ok(json!(args.get_str("text")?)) },
    )
    .into_arc()
}

/// `fail` always errors.
pub fn failing_tool() -> Arc<dyn Tool> {
    FunctionTool::new("fail", "Always fails", ToolParameters::empty(), |_, _| async {
        Err(BatonError::tool("fail", "disk on fire"))
    })
    .into_arc()
}

/// Counts how many calls are inside a tool at the same time.
#[derive(Debug, Default)]
pub struct Gauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// `nap` sleeps for `ms` milliseconds and returns `ms`.
pub fn nap_tool(gauge: Arc<Gauge>) -> Arc<dyn Tool> {
    FunctionTool::new(
        "nap",
        "Sleep for a while",
        ToolParameters::object()
            .integer("ms", "milliseconds to sleep", true)
            .build(),
        move |args, _| {
            let gauge = Arc::clone(&gauge);
            async move {
                let ms = args.get_i64("ms")?;
                gauge.enter();
                tokio::time::sleep(Duration::from_millis(ms as u64)).await;
                gauge.leave();
                Ok(json!(ms))
            }
        },
    )
    .into_arc()
}
