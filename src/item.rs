//! Item wrapper carrying optional per-item metadata through the pipeline.

use crate::value::Value;

/// Per-item metadata attached by stages, insertion-ordered.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemContext {
    tags: Vec<(String, Value)>,
}

impl ItemContext {
    pub fn new() -> Self {
        Self { tags: Vec::new() }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.tags
            .iter()
            .find(|(tag, _)| tag == key)
            .map(|(_, value)| value)
    }

    /// Set a tag, replacing an existing one with the same key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.tags.iter_mut().find(|(tag, _)| *tag == key) {
            Some(slot) => slot.1 = value,
            None => self.tags.push((key, value)),
        }
    }

    pub fn tags(&self) -> &[(String, Value)] {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// A value travelling through the pipeline, optionally wrapped with
/// per-item context. Transforms receive the bare value; a transform that
/// returns a `StreamItem` keeps its metadata attached downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamItem {
    pub value: Value,
    pub ctx: Option<ItemContext>,
}

impl StreamItem {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            ctx: None,
        }
    }

    pub fn with_ctx(value: impl Into<Value>, ctx: ItemContext) -> Self {
        Self {
            value: value.into(),
            ctx: Some(ctx),
        }
    }

    /// Read a metadata tag, if any context is attached.
    pub fn tag(&self, key: &str) -> Option<&Value> {
        self.ctx.as_ref().and_then(|ctx| ctx.get(key))
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl From<Value> for StreamItem {
    fn from(value: Value) -> Self {
        StreamItem::new(value)
    }
}
