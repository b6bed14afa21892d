//! Unary operator: applies a user transform to each item, with optional
//! parallel workers.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use async_trait::async_trait;

use crate::context::StreamContext;
use crate::error::StreamError;
use crate::funcs::{Emission, UnaryFn};
use crate::item::StreamItem;
use crate::operators::{panic_message, Operator, DEFAULT_CHANNEL_CAPACITY};

/// Per-item transform stage. With one worker the input order is preserved;
/// with more the workers race on the output channel and ordering is
/// undefined.
pub struct UnaryOperator {
    op: Option<UnaryFn>,
    concurrency: usize,
    input: Option<mpsc::Receiver<StreamItem>>,
    output_tx: Option<mpsc::Sender<StreamItem>>,
    output_rx: Option<mpsc::Receiver<StreamItem>>,
}

impl UnaryOperator {
    pub fn new(op: UnaryFn) -> Self {
        let (output_tx, output_rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        Self {
            op: Some(op),
            concurrency: 1,
            input: None,
            output_tx: Some(output_tx),
            output_rx: Some(output_rx),
        }
    }

    /// Set the worker count; values below one are clamped to one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

#[async_trait]
impl Operator for UnaryOperator {
    fn set_input(&mut self, input: mpsc::Receiver<StreamItem>) {
        self.input = Some(input);
    }

    fn take_output(&mut self) -> Option<mpsc::Receiver<StreamItem>> {
        self.output_rx.take()
    }

    async fn exec(&mut self, ctx: StreamContext) -> Result<(), StreamError> {
        let input = self
            .input
            .take()
            .ok_or_else(|| StreamError::general("unary operator has no input channel"))?;
        let op = self
            .op
            .take()
            .ok_or_else(|| StreamError::general("unary operator already started"))?;
        let output = self
            .output_tx
            .take()
            .ok_or_else(|| StreamError::general("unary operator already started"))?;

        ctx.log("unary operator starting");
        tracing::debug!(operator = "unary", concurrency = self.concurrency, "starting");

        // Workers share the input receiver and the transform; the stage
        // token lets one worker take the whole stage down on a panic.
        let input = Arc::new(Mutex::new(input));
        let op = Arc::new(Mutex::new(op));
        let stage = ctx.cancel_token().child_token();

        let mut workers = Vec::with_capacity(self.concurrency);
        for _ in 0..self.concurrency {
            workers.push(tokio::spawn(worker(
                ctx.clone(),
                stage.clone(),
                Arc::clone(&input),
                Arc::clone(&op),
                output.clone(),
            )));
        }

        tokio::spawn(async move {
            join_all(workers).await;
            drop(output);
            ctx.log("unary operator done");
            tracing::debug!(operator = "unary", "closed");
        });
        Ok(())
    }
}

async fn worker(
    ctx: StreamContext,
    stage: CancellationToken,
    input: Arc<Mutex<mpsc::Receiver<StreamItem>>>,
    op: Arc<Mutex<UnaryFn>>,
    output: mpsc::Sender<StreamItem>,
) {
    loop {
        let next = {
            let mut input = input.lock().await;
            tokio::select! {
                _ = stage.cancelled() => return,
                item = input.recv() => item,
            }
        };
        let Some(item) = next else {
            return;
        };

        let emission = {
            let mut op = op.lock().await;
            match panic::catch_unwind(AssertUnwindSafe(|| op.apply(&ctx, item.into_value()))) {
                Ok(emission) => emission,
                Err(payload) => Emission::Error(StreamError::panic(panic_message(payload))),
            }
        };

        match emission {
            Emission::Skip => {}
            Emission::Value(value) => {
                if !send(&stage, &output, StreamItem::new(value)).await {
                    return;
                }
            }
            Emission::Item(item) => {
                if !send(&stage, &output, item).await {
                    return;
                }
            }
            Emission::Error(err) => {
                if !ctx.raise(err) {
                    stage.cancel();
                    return;
                }
            }
        }
    }
}

async fn send(
    stage: &CancellationToken,
    output: &mpsc::Sender<StreamItem>,
    item: StreamItem,
) -> bool {
    tokio::select! {
        _ = stage.cancelled() => false,
        sent = output.send(item) => sent.is_ok(),
    }
}
