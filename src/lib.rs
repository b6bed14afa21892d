//! In-process data-flow stream pipelines.
//!
//! A [`Stream`] chains a source emitter, intermediate operators, and a
//! terminal collector; the chain runs as concurrent tasks over bounded
//! channels with backpressure, shared logging and error callbacks, and
//! cooperative cancellation.

pub mod collectors;
pub mod context;
pub mod emitters;
pub mod error;
pub mod funcs;
pub mod item;
pub mod operators;
pub mod stream;
pub mod value;

pub use collectors::{Collector, FuncCollector, NullCollector, SliceCollector, SliceHandle};
pub use context::{ErrorFn, LogFn, StreamContext};
pub use emitters::{ChannelEmitter, Emitter, SliceEmitter};
pub use error::{ErrorKind, StreamError};
pub use funcs::{BinFn, Emission, Emit, UnaryFn};
pub use item::{ItemContext, StreamItem};
pub use operators::{
    BatchOperator, BinaryOperator, ExpandOperator, Operator, UnaryOperator,
    DEFAULT_CHANNEL_CAPACITY,
};
pub use stream::Stream;
pub use value::{MapValue, RecordValue, Value};
