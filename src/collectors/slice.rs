//! Sink accumulating items into a shared, inspectable vector.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use crate::collectors::{completed_with, Collector};
use crate::context::StreamContext;
use crate::error::StreamError;
use crate::item::StreamItem;
use crate::value::Value;

/// Read side of a [`SliceCollector`], valid after the stream completes.
#[derive(Clone)]
pub struct SliceHandle {
    items: Arc<Mutex<Vec<StreamItem>>>,
}

impl SliceHandle {
    /// Snapshot of the collected items, metadata included.
    pub fn items(&self) -> Vec<StreamItem> {
        self.items.lock().expect("slice collector poisoned").clone()
    }

    /// Snapshot of the collected values only.
    pub fn values(&self) -> Vec<Value> {
        self.items
            .lock()
            .expect("slice collector poisoned")
            .iter()
            .map(|item| item.value.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().expect("slice collector poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collects every item the pipeline delivers. Keep the [`SliceHandle`]
/// before handing the collector to the stream.
pub struct SliceCollector {
    input: Option<mpsc::Receiver<StreamItem>>,
    items: Arc<Mutex<Vec<StreamItem>>>,
}

impl SliceCollector {
    pub fn new() -> Self {
        Self {
            input: None,
            items: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn handle(&self) -> SliceHandle {
        SliceHandle {
            items: Arc::clone(&self.items),
        }
    }
}

impl Default for SliceCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Collector for SliceCollector {
    fn set_input(&mut self, input: mpsc::Receiver<StreamItem>) {
        self.input = Some(input);
    }

    async fn open(&mut self, ctx: StreamContext) -> oneshot::Receiver<Result<(), StreamError>> {
        let Some(input) = self.input.take() else {
            return completed_with(Err(StreamError::general(
                "slice collector has no input channel",
            )));
        };
        let items = Arc::clone(&self.items);
        let (done_tx, done_rx) = oneshot::channel();

        ctx.log("slice collector starting");
        tracing::debug!(collector = "slice", "starting");

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
                items.lock().expect("slice collector poisoned").push(item);
            }
            ctx.log("slice collector done");
            tracing::debug!(collector = "slice", "closed");
            let _ = done_tx.send(Ok(()));
        });
        done_rx
    }
}
