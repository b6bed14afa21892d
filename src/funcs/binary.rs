//! Binary (fold) transform adapter.

use crate::context::StreamContext;
use crate::funcs::unary::{Emission, Emit};
use crate::value::Value;

/// A binary stage operation folding `(state, item)` into the next state,
/// with or without the stream context as a first parameter.
pub enum BinFn {
    Plain(Box<dyn FnMut(Value, Value) -> Emission + Send>),
    WithCtx(Box<dyn FnMut(&StreamContext, Value, Value) -> Emission + Send>),
}

impl BinFn {
    /// Adapt a `f(state, item) -> R` operation.
    pub fn of<O, F>(mut f: F) -> Self
    where
        F: FnMut(Value, Value) -> O + Send + 'static,
        O: Emit,
    {
        BinFn::Plain(Box::new(move |state, item| f(state, item).emit()))
    }

    /// Adapt a `f(ctx, state, item) -> R` operation.
    pub fn of_ctx<O, F>(mut f: F) -> Self
    where
        F: FnMut(&StreamContext, Value, Value) -> O + Send + 'static,
        O: Emit,
    {
        BinFn::WithCtx(Box::new(move |ctx, state, item| f(ctx, state, item).emit()))
    }

    pub(crate) fn apply(&mut self, ctx: &StreamContext, state: Value, item: Value) -> Emission {
        match self {
            BinFn::Plain(f) => f(state, item),
            BinFn::WithCtx(f) => f(ctx, state, item),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_shapes_apply() {
        let ctx = StreamContext::new();

        let mut plain = BinFn::of(|state: Value, item: Value| {
            Value::Int(state.as_int().unwrap_or(0) + item.as_int().unwrap_or(0))
        });
        match plain.apply(&ctx, Value::Int(1), Value::Int(2)) {
            Emission::Value(Value::Int(3)) => {}
            other => panic!("unexpected emission: {other:?}"),
        }

        let mut with_ctx = BinFn::of_ctx(|ctx: &StreamContext, state: Value, _item: Value| {
            ctx.log("folding");
            state
        });
        assert!(matches!(
            with_ctx.apply(&ctx, Value::Int(9), Value::Int(1)),
            Emission::Value(Value::Int(9))
        ));
    }
}
