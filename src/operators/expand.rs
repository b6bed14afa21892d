//! Stream-expand operator: unpacks composite items element-wise.

use tokio::sync::mpsc;

use async_trait::async_trait;

use crate::context::StreamContext;
use crate::error::StreamError;
use crate::item::StreamItem;
use crate::operators::{send_item, Operator, DEFAULT_CHANNEL_CAPACITY};
use crate::value::Value;

/// Unpacks each list item into its elements in index order and each map
/// item into key/value pairs in entry order; anything else passes through
/// unchanged. Input items are processed serially and cancellation is
/// checked on every emission.
pub struct ExpandOperator {
    input: Option<mpsc::Receiver<StreamItem>>,
    output_tx: Option<mpsc::Sender<StreamItem>>,
    output_rx: Option<mpsc::Receiver<StreamItem>>,
}

impl ExpandOperator {
    pub fn new() -> Self {
        let (output_tx, output_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            input: None,
            output_tx: Some(output_tx),
            output_rx: Some(output_rx),
        }
    }
}

impl Default for ExpandOperator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Operator for ExpandOperator {
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
            .ok_or_else(|| StreamError::general("expand operator has no input channel"))?;
        let output = self
            .output_tx
            .take()
            .ok_or_else(|| StreamError::general("expand operator already started"))?;

        ctx.log("expand operator starting");
        tracing::debug!(operator = "expand", "starting");

        tokio::spawn(async move {
            'stage: loop {
                let next = tokio::select! {
                    _ = ctx.cancelled() => break 'stage,
                    item = input.recv() => item,
                };
                let Some(item) = next else {
                    break 'stage;
                };

                match item.value {
                    Value::List(elements) => {
                        for element in elements {
                            if !send_item(&ctx, &output, StreamItem::new(element)).await {
                                break 'stage;
                            }
                        }
                    }
                    Value::Map(map) => {
                        for (key, value) in map.into_entries() {
                            if !send_item(&ctx, &output, StreamItem::new(Value::pair(key, value)))
                                .await
                            {
                                break 'stage;
                            }
                        }
                    }
                    _ => {
                        if !send_item(&ctx, &output, item).await {
                            break 'stage;
                        }
                    }
                }
            }

            drop(output);
            ctx.log("expand operator done");
            tracing::debug!(operator = "expand", "closed");
        });
        Ok(())
    }
}
