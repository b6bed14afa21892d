//! Stage operator engines.
//!
//! Every operator consumes one input channel, owns one output channel, and
//! runs as one or more spawned tasks after `exec`. The output channel is
//! closed exactly once when the stage exits, which is how shutdown drains
//! from upstream to downstream.

mod batch;
mod binary;
mod expand;
mod unary;

pub use batch::BatchOperator;
pub use binary::BinaryOperator;
pub use expand::ExpandOperator;
pub use unary::UnaryOperator;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::context::StreamContext;
use crate::error::StreamError;
use crate::item::StreamItem;

/// Bound on every stage output channel; a slow consumer blocks its
/// producer once this many items are in flight.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Contract for a chainable stage, including third-party ones: accept an
/// input channel, hand over the output channel, and start asynchronously
/// on `exec`.
#[async_trait]
pub trait Operator: Send {
    fn set_input(&mut self, input: mpsc::Receiver<StreamItem>);

    /// Hand the output channel to the downstream stage. Yields `None` once
    /// taken.
    fn take_output(&mut self) -> Option<mpsc::Receiver<StreamItem>>;

    /// Start the stage: validate wiring, spawn its tasks, return. The
    /// stage runs until its input closes or the context is cancelled.
    async fn exec(&mut self, ctx: StreamContext) -> Result<(), StreamError>;
}

/// Render a caught unwind payload for the synthetic panic error.
pub(crate) fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "transform panicked".to_owned()
    }
}

/// Send an item downstream unless the stream is cancelled first. Returns
/// `false` when the stage should stop, either because cancellation won the
/// race or the receiving side is gone.
pub(crate) async fn send_item(
    ctx: &StreamContext,
    output: &mpsc::Sender<StreamItem>,
    item: StreamItem,
) -> bool {
    tokio::select! {
        _ = ctx.cancelled() => false,
        sent = output.send(item) => sent.is_ok(),
    }
}
