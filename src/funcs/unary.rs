//! Unary transform adapter.
//!
//! User transforms come in four shapes: with or without the stream context
//! as a first parameter, and with a plain or fallible return. [`UnaryFn`]
//! erases the shape behind two callable variants chosen at build time, and
//! the [`Emit`] conversion trait normalizes every accepted return type into
//! an [`Emission`] the operator engines interpret uniformly. A shape
//! outside this set fails to compile, so invalid transforms are rejected
//! at configuration.

use crate::context::StreamContext;
use crate::error::StreamError;
use crate::item::StreamItem;
use crate::value::Value;

/// Normalized outcome of applying a transform to one item.
#[derive(Debug)]
pub enum Emission {
    /// Emit nothing; the item is consumed silently.
    Skip,
    /// Emit a bare value.
    Value(Value),
    /// Emit a wrapped item, preserving its metadata.
    Item(StreamItem),
    /// Raise a stream error; the error policy decides what happens next.
    Error(StreamError),
}

/// Conversion from a transform's return type into an [`Emission`].
pub trait Emit {
    fn emit(self) -> Emission;
}

impl Emit for Emission {
    fn emit(self) -> Emission {
        self
    }
}

impl Emit for Value {
    fn emit(self) -> Emission {
        match self {
            Value::Null => Emission::Skip,
            value => Emission::Value(value),
        }
    }
}

impl Emit for StreamItem {
    fn emit(self) -> Emission {
        Emission::Item(self)
    }
}

impl Emit for StreamError {
    fn emit(self) -> Emission {
        Emission::Error(self)
    }
}

impl Emit for () {
    fn emit(self) -> Emission {
        Emission::Skip
    }
}

impl<T: Emit> Emit for Option<T> {
    fn emit(self) -> Emission {
        match self {
            Some(value) => value.emit(),
            None => Emission::Skip,
        }
    }
}

impl<T: Emit> Emit for Result<T, StreamError> {
    fn emit(self) -> Emission {
        match self {
            Ok(value) => value.emit(),
            Err(err) => Emission::Error(err),
        }
    }
}

impl Emit for bool {
    fn emit(self) -> Emission {
        Emission::Value(Value::Bool(self))
    }
}

impl Emit for i64 {
    fn emit(self) -> Emission {
        Emission::Value(Value::Int(self))
    }
}

impl Emit for f64 {
    fn emit(self) -> Emission {
        Emission::Value(Value::Float(self))
    }
}

impl Emit for String {
    fn emit(self) -> Emission {
        Emission::Value(Value::String(self))
    }
}

impl Emit for &str {
    fn emit(self) -> Emission {
        Emission::Value(Value::String(self.to_owned()))
    }
}

impl Emit for Vec<Value> {
    fn emit(self) -> Emission {
        Emission::Value(Value::List(self))
    }
}

/// A unary stage operation, one of two callable variants.
pub enum UnaryFn {
    Plain(Box<dyn FnMut(Value) -> Emission + Send>),
    WithCtx(Box<dyn FnMut(&StreamContext, Value) -> Emission + Send>),
}

impl UnaryFn {
    /// Adapt a `f(x) -> R` transform.
    pub fn of<O, F>(mut f: F) -> Self
    where
        F: FnMut(Value) -> O + Send + 'static,
        O: Emit,
    {
        UnaryFn::Plain(Box::new(move |value| f(value).emit()))
    }

    /// Adapt a `f(ctx, x) -> R` transform.
    pub fn of_ctx<O, F>(mut f: F) -> Self
    where
        F: FnMut(&StreamContext, Value) -> O + Send + 'static,
        O: Emit,
    {
        UnaryFn::WithCtx(Box::new(move |ctx, value| f(ctx, value).emit()))
    }

    /// Adapt a predicate into a pass/drop transform.
    pub fn filtering<F>(mut predicate: F) -> Self
    where
        F: FnMut(&Value) -> bool + Send + 'static,
    {
        UnaryFn::Plain(Box::new(move |value| {
            if predicate(&value) {
                Emission::Value(value)
            } else {
                Emission::Skip
            }
        }))
    }

    /// Adapt a `f(ctx, x) -> bool` predicate.
    pub fn filtering_ctx<F>(mut predicate: F) -> Self
    where
        F: FnMut(&StreamContext, &Value) -> bool + Send + 'static,
    {
        UnaryFn::WithCtx(Box::new(move |ctx, value| {
            if predicate(ctx, &value) {
                Emission::Value(value)
            } else {
                Emission::Skip
            }
        }))
    }

    pub(crate) fn apply(&mut self, ctx: &StreamContext, value: Value) -> Emission {
        match self {
            UnaryFn::Plain(f) => f(value),
            UnaryFn::WithCtx(f) => f(ctx, value),
        }
    }
}
