//! Batch operator: buffers the whole upstream and releases it as one item.

use tokio::sync::mpsc;

use async_trait::async_trait;

use crate::context::StreamContext;
use crate::error::StreamError;
use crate::item::StreamItem;
use crate::operators::{send_item, Operator, DEFAULT_CHANNEL_CAPACITY};
use crate::value::Value;

/// Accumulates every input item until the input closes, then emits a
/// single list of the collected values in arrival order. The buffer is
/// unbounded unless a cap is set; an uncapped batch over a large upstream
/// can exhaust memory.
pub struct BatchOperator {
    cap: Option<usize>,
    input: Option<mpsc::Receiver<StreamItem>>,
    output_tx: Option<mpsc::Sender<StreamItem>>,
    output_rx: Option<mpsc::Receiver<StreamItem>>,
}

impl BatchOperator {
    pub fn new() -> Self {
        let (output_tx, output_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            cap: None,
            input: None,
            output_tx: Some(output_tx),
            output_rx: Some(output_rx),
        }
    }

    /// Bound the buffer. Once `cap` items are held, further input raises
    /// one general error and is dropped.
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = Some(cap);
        self
    }
}

impl Default for BatchOperator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operator for BatchOperator {
    fn set_input(&mut self, input: mpsc::Receiver<StreamItem>) {
        self.input = Some(input);
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<StreamItem>> {
        self.output_rx.take()
    }

    async fn exec(&mut self, ctx: StreamContext) -> Result<(), StreamError> {
        let mut input = self
            .input
            .take()
            .ok_or_else(|| StreamError::general("batch operator has no input channel"))?;
        let output = self
            .output_tx
            .take()
            .ok_or_else(|| StreamError::general("batch operator already started"))?;
        let cap = self.cap;

        ctx.log("batch operator starting");
        tracing::debug!(operator = "batch", cap = ?cap, "starting");

        tokio::spawn(async move {
            let mut buffer: Vec<Value> = Vec::new();
            let mut overflowed = false;

            loop {
                let next = tokio::select! {
                    _ = ctx.cancelled() => {
                        tracing::debug!(operator = "batch", "cancelled before release");
                        return;
                    }
                    item = input.recv() => item,
                };
                let Some(item) = next else {
                    break;
                };

                if cap.is_some_and(|cap| buffer.len() >= cap) {
                    if !overflowed {
                        overflowed = true;
                        ctx.raise(StreamError::general(format!(
                            "batch capacity {} exceeded, dropping further items",
                            cap.unwrap_or_default()
                        )));
                    }
                    continue;
                }
                buffer.push(item.into_value());
            }

            tracing::debug!(operator = "batch", size = buffer.len(), "releasing batch");
            send_item(&ctx, &output, StreamItem::new(Value::List(buffer))).await;
            drop(output);
            ctx.log("batch operator done");
        });
        Ok(())
    }
}
