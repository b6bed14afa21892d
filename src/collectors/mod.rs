//! Terminal sink adapters.

mod func;
mod null;
mod slice;

pub use func::FuncCollector;
pub use null::NullCollector;
pub use slice::{SliceCollector, SliceHandle};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::context::StreamContext;
use crate::error::StreamError;
use crate::item::StreamItem;

/// Contract for a sink: accept the one input channel, then start
/// draining. The returned single-shot channel yields the terminal result
/// once draining completes and is closed afterwards.
#[async_trait]
pub trait Collector: Send {
    fn set_input(&mut self, input: mpsc::Receiver<StreamItem>);

    async fn open(&mut self, ctx: StreamContext) -> oneshot::Receiver<Result<(), StreamError>>;
}

/// Completion channel primed with an immediate result, used when a sink
/// cannot start at all.
pub(crate) fn completed_with(
    result: Result<(), StreamError>,
) -> oneshot::Receiver<Result<(), StreamError>> {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(result);
    rx
}
