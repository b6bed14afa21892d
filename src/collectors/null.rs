//! Sink that drains and discards everything.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use crate::collectors::{completed_with, Collector};
use crate::context::StreamContext;
use crate::error::StreamError;
use crate::item::StreamItem;

/// Discards every item, completing when the input closes. Useful when a
/// pipeline is run for its side effects.
pub struct NullCollector {
    input: Option<mpsc::Receiver<StreamItem>>,
}

impl NullCollector {
    pub fn new() -> Self {
        Self { input: None }
    }
}

impl Default for NullCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for NullCollector {
    fn set_input(&mut self, input: mpsc::Receiver<StreamItem>) {
        self.input = Some(input);
    }

    async fn open(&mut self, ctx: StreamContext) -> oneshot::Receiver<Result<(), StreamError>> {
        let Some(input) = self.input.take() else {
            return completed_with(Err(StreamError::general(
                "null collector has no input channel",
            )));
        };
        let (done_tx, done_rx) = oneshot::channel();

        ctx.log("null collector starting");
        tracing::debug!(collector = "null", "starting");

        tokio::spawn(async move {
            let mut input = ReceiverStream::new(input);
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    item = input.next() => {
                        if item.is_none() {
                            break;
                        }
                    }
                }
            }
            ctx.log("null collector done");
            tracing::debug!(collector = "null", "closed");
            let _ = done_tx.send(Ok(()));
        });
        done_rx
    }
}
