//! Adapters that turn user transform functions of varied shapes into the
//! uniform operations the operator engines execute.

pub mod batch;
mod binary;
mod unary;

pub use binary::BinFn;
pub use unary::{Emission, Emit, UnaryFn};
