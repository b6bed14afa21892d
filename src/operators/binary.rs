//! Binary operator: folds the whole input stream into one final state.

use std::panic::{self, AssertUnwindSafe};

use tokio::sync::mpsc;

use async_trait::async_trait;

use crate::context::StreamContext;
use crate::error::StreamError;
use crate::funcs::{BinFn, Emission};
use crate::item::StreamItem;
use crate::operators::{panic_message, send_item, Operator, DEFAULT_CHANNEL_CAPACITY};
use crate::value::Value;

/// Reduce/accumulate stage. Items are folded strictly in input order; the
/// final state is emitted as the single output item once the input closes.
/// Cancellation before the input drains suppresses the emission.
pub struct BinaryOperator {
    op: Option<BinFn>,
    state: Value,
    input: Option<mpsc::Receiver<StreamItem>>,
    output_tx: Option<mpsc::Sender<StreamItem>>,
    output_rx: Option<mpsc::Receiver<StreamItem>>,
}

impl BinaryOperator {
    pub fn new(initial_state: impl Into<Value>, op: BinFn) -> Self {
        let (output_tx, output_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            op: Some(op),
            state: initial_state.into(),
            input: None,
            output_tx: Some(output_tx),
            output_rx: Some(output_rx),
        }
    }
}

#[async_trait]
impl Operator for BinaryOperator {
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
            .ok_or_else(|| StreamError::general("binary operator has no input channel"))?;
        let mut op = self
            .op
            .take()
            .ok_or_else(|| StreamError::general("binary operator already started"))?;
        let output = self
            .output_tx
            .take()
            .ok_or_else(|| StreamError::general("binary operator already started"))?;
        let mut state = std::mem::take(&mut self.state);

        ctx.log("binary operator starting");
        tracing::debug!(operator = "binary", "starting");

        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = ctx.cancelled() => {
                        tracing::debug!(operator = "binary", "cancelled before drain");
                        return;
                    }
                    item = input.recv() => item,
                };
                let Some(item) = next else {
                    break;
                };

                let emission = match panic::catch_unwind(AssertUnwindSafe(|| {
                    op.apply(&ctx, state.clone(), item.into_value())
                })) {
                    Ok(emission) => emission,
                    Err(payload) => Emission::Error(StreamError::panic(panic_message(payload))),
                };

                match emission {
                    Emission::Skip => {}
                    Emission::Value(next_state) => state = next_state,
                    Emission::Item(item) => state = item.into_value(),
                    Emission::Error(err) => {
                        if !ctx.raise(err) {
                            return;
                        }
                    }
                }
            }

            send_item(&ctx, &output, StreamItem::new(state)).await;
            drop(output);
            ctx.log("binary operator done");
            tracing::debug!(operator = "binary", "closed");
        });
        Ok(())
    }
}
