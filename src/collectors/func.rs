//! Sink invoking a callback per item.

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use crate::collectors::{completed_with, Collector};
use crate::context::StreamContext;
use crate::error::StreamError;
use crate::item::StreamItem;

/// Hands every item to a user callback. A callback error is reported
/// through the stream error policy; the sink keeps draining unless the
/// error cancels the stream.
pub struct FuncCollector {
    f: Option<Box<dyn FnMut(StreamItem) -> Result<(), StreamError> + Send>>,
    input: Option<mpsc::Receiver<StreamItem>>,
}

impl FuncCollector {
    pub fn new<F>(f: F) -> Self
    where
        F: FnMut(StreamItem) -> Result<(), StreamError> + Send + 'static,
    {
        Self {
            f: Some(Box::new(f)),
            input: None,
        }
    }
}

#[async_trait]
impl Collector for FuncCollector {
    fn set_input(&mut self, input: mpsc::Receiver<StreamItem>) {
        self.input = Some(input);
    }

    async fn open(&mut self, ctx: StreamContext) -> oneshot::Receiver<Result<(), StreamError>> {
        let Some(input) = self.input.take() else {
            return completed_with(Err(StreamError::general(
                "func collector has no input channel",
            )));
        };
        let Some(mut f) = self.f.take() else {
            return completed_with(Err(StreamError::general("func collector already opened")));
        };
        let (done_tx, done_rx) = oneshot::channel();

        ctx.log("func collector starting");
        tracing::debug!(collector = "func", "starting");

        tokio::spawn(async move {
            let mut input = ReceiverStream::new(input);
            loop {
                let next = tokio::select! {
                    _ = ctx.cancelled() => break,
                    item = input.next() => item,
                };
                let Some(item) = next else {
                    break;
                };
                if let Err(err) = f(item) {
                    if !ctx.raise(err) {
                        break;
                    }
                }
            }
            ctx.log("func collector done");
            tracing::debug!(collector = "func", "closed");
            let _ = done_tx.send(Ok(()));
        });
        done_rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::{Arc, Mutex};
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn callback_sees_every_item() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = seen.clone();
        let mut sink = FuncCollector::new(move |item: StreamItem| {
            sink_seen.lock().unwrap().push(item.into_value());
            Ok(())
        });
        let (tx, rx) = mpsc::channel(8);
        sink.set_input(rx);
        let done = sink.open(StreamContext::new()).await;

        tx.send(StreamItem::new(1)).await.expect("send");
        tx.send(StreamItem::new(2)).await.expect("send");
        drop(tx);

        timeout(Duration::from_secs(1), done)
            .await
            .expect("done in time")
            .expect("completion delivered")
            .expect("clean completion");
        assert_eq!(*seen.lock().unwrap(), vec![Value::Int(1), Value::Int(2)]);
    }
}
