//! Source adopting a caller-owned channel.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::context::StreamContext;
use crate::emitters::Emitter;
use crate::error::StreamError;
use crate::item::StreamItem;
use crate::operators::DEFAULT_CHANNEL_CAPACITY;
use crate::value::Value;

/// Forwards values from a channel the caller writes to, wrapping each one
/// as a stream item. The pipeline input closes when the caller drops the
/// sending side.
pub struct ChannelEmitter {
    input: Option<mpsc::Receiver<Value>>,
}

impl ChannelEmitter {
    pub fn new(input: mpsc::Receiver<Value>) -> Self {
        Self { input: Some(input) }
    }
}

#[async_trait]
impl Emitter for ChannelEmitter {
    async fn open(&mut self, ctx: &StreamContext) -> Result<mpsc::Receiver<StreamItem>, StreamError> {
        let mut input = self
            .input
            .take()
            .ok_or_else(|| StreamError::general("channel emitter already opened"))?;
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);

        ctx.log("channel emitter starting");
        tracing::debug!(emitter = "channel", "starting");

        let ctx = ctx.clone();
        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = ctx.cancelled() => break,
                    value = input.recv() => value,
                };
                let Some(value) = next else {
                    break;
                };
                let sent = tokio::select! {
                    _ = ctx.cancelled() => false,
                    sent = tx.send(StreamItem::new(value)) => sent.is_ok(),
                };
                if !sent {
                    break;
                }
            }
            ctx.log("channel emitter done");
            tracing::debug!(emitter = "channel", "closed");
        });
        Ok(rx)
    }
}
