//! Source adapters that feed a pipeline.

mod channel;
mod slice;

pub use channel::ChannelEmitter;
pub use slice::SliceEmitter;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::context::StreamContext;
use crate::error::StreamError;
use crate::item::StreamItem;

/// Contract for a source: start producing and hand back the one output
/// channel, which closes when the source is exhausted or cancelled.
#[async_trait]
pub trait Emitter: Send {
    async fn open(&mut self, ctx: &StreamContext) -> Result<mpsc::Receiver<StreamItem>, StreamError>;
}
