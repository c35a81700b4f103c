//! Streaming run handle.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;

use super::events::StreamEvent;
use super::runner::StreamSink;
use super::types::{RunOptions, RunResult};
use crate::error::BatonError;

/// Events of a run executing on a background task.
///
/// Yields every item in the order it is appended to the run's history and
/// ends exactly once, when the run completes, pauses or fails. The outcome is
/// available from [`RunStream::result`]. Dropping the handle before the run
/// finishes cancels it.
pub struct RunStream {
    events: UnboundedReceiverStream<StreamEvent>,
    handle: JoinHandle<Result<RunResult, BatonError>>,
    cancel: CancellationToken,
}

impl RunStream {
    pub(super) fn spawn<F, Fut>(options: RunOptions, start: F) -> Self
    where
        F: FnOnce(RunOptions) -> Fut,
        Fut: Future<Output = Result<RunResult, BatonError>> + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let forward = options.event_sink.clone();
        let sink: StreamSink = Arc::new(move |event: StreamEvent| {
            if let Some(forward) = &forward {
                forward(event.clone());
            }
            let _ = tx.send(event);
        });
        let cancel = options
            .cancel_token
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);
        let options = options.with_event_sink(sink).with_cancel_token(cancel.clone());
        let handle = tokio::spawn(start(options));
        Self {
            events: UnboundedReceiverStream::new(rx),
            handle,
            cancel,
        }
    }

    /// Output message text only, in order.
    pub fn text_stream(&mut self) -> impl Stream<Item = String> + '_ {
        let events = self;
        async_stream::stream! {
            while let Some(event) = events.next().await {
                if let Some(text) = event.output_text() {
                    yield text;
                }
            }
        }
    }

    /// Wait for the run to finish. Undrained events are discarded.
    pub async fn result(mut self) -> Result<RunResult, BatonError> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(join_error) if join_error.is_cancelled() => {
                Err(BatonError::InvalidState("run was cancelled".into()))
            }
            Err(join_error) => Err(BatonError::InvalidState(format!(
                "run task failed: {join_error}"
            ))),
        }
    }

    /// Abort the run and cancel its in-flight tool calls. The event stream
    /// ends and `result` reports cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

impl Drop for RunStream {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            self.cancel();
        }
    }
}

impl Stream for RunStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl std::fmt::Debug for RunStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunStream")
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}
