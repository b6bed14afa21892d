//! In-memory finite source.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::context::StreamContext;
use crate::emitters::Emitter;
use crate::error::StreamError;
use crate::item::StreamItem;
use crate::operators::DEFAULT_CHANNEL_CAPACITY;
use crate::value::Value;

/// Emits a fixed sequence of values, then closes its output.
pub struct SliceEmitter {
    items: Option<Vec<Value>>,
}

impl SliceEmitter {
    pub fn new<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self {
            items: Some(items.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl Emitter for SliceEmitter {
    async fn open(&mut self, ctx: &StreamContext) -> Result<mpsc::Receiver<StreamItem>, StreamError> {
        let items = self
            .items
            .take()
            .ok_or_else(|| StreamError::general("slice emitter already opened"))?;
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);

        ctx.log("slice emitter starting");
        tracing::debug!(emitter = "slice", count = items.len(), "starting");

        let ctx = ctx.clone();
        tokio::spawn(async move {
            for value in items {
                let sent = tokio::select! {
                    _ = ctx.cancelled() => false,
                    sent = tx.send(StreamItem::new(value)) => sent.is_ok(),
                };
                if !sent {
                    break;
                }
            }
            ctx.log("slice emitter done");
            tracing::debug!(emitter = "slice", "closed");
        });
        Ok(rx)
    }
}
