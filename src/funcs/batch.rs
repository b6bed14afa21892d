//! Transforms over a batched slice of items.
//!
//! These operate on the single list item a batch stage releases when its
//! upstream closes: numeric reduction, stable sorts, and grouping, each
//! keyed by a map key, a record field name, or a list position. An element
//! missing the discriminator raises a general error and is skipped; the
//! rest of the batch proceeds.

use std::cmp::Ordering;

use crate::context::StreamContext;
use crate::error::StreamError;
use crate::funcs::unary::UnaryFn;
use crate::item::StreamItem;
use crate::value::{MapValue, Value};

/// Discriminator used to pick the sort/group key out of an element.
enum Selector {
    Key(Value),
    Name(String),
    Pos(usize),
}

impl Selector {
    fn select(&self, element: &Value) -> Result<Value, StreamError> {
        match self {
            Selector::Key(key) => element
                .as_map()
                .ok_or_else(|| {
                    StreamError::general(format!("expected a map element, got {}", element.kind()))
                })?
                .get(key)
                .cloned()
                .ok_or_else(|| StreamError::general(format!("missing key {key}"))),
            Selector::Name(name) => element
                .as_record()
                .ok_or_else(|| {
                    StreamError::general(format!(
                        "expected a record element, got {}",
                        element.kind()
                    ))
                })?
                .get(name)
                .cloned()
                .ok_or_else(|| StreamError::general(format!("missing field {name}"))),
            Selector::Pos(pos) => element
                .as_list()
                .ok_or_else(|| {
                    StreamError::general(format!("expected a list element, got {}", element.kind()))
                })?
                .get(*pos)
                .cloned()
                .ok_or_else(|| StreamError::general(format!("position {pos} out of range"))),
        }
    }
}

fn as_batch(value: Value) -> Result<Vec<Value>, StreamError> {
    match value {
        Value::List(items) => Ok(items),
        other => Err(StreamError::general(format!(
            "batch transform expects a list, got {}",
            other.kind()
        ))),
    }
}

/// Pull each element's key, reporting and dropping elements the selector
/// rejects.
fn keyed_elements(
    ctx: &StreamContext,
    items: Vec<Value>,
    selector: &Selector,
) -> Vec<(Value, Value)> {
    let mut keyed = Vec::with_capacity(items.len());
    for element in items {
        match selector.select(&element) {
            Ok(key) => keyed.push((key, element)),
            Err(err) => ctx.report(&err.with_item(StreamItem::new(element))),
        }
    }
    keyed
}

fn compare(a: &Value, b: &Value) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// Numeric reduction of the whole batch. Fails with a general error when
/// any element is not numeric.
pub fn sum() -> UnaryFn {
    UnaryFn::of(|value: Value| -> Result<Value, StreamError> {
        let items = as_batch(value)?;
        let mut total = 0.0;
        for element in &items {
            total += element.numeric().ok_or_else(|| {
                StreamError::general(format!("sum requires numeric elements, got {}", element.kind()))
            })?;
        }
        Ok(Value::Float(total))
    })
}

fn sum_by(selector: Selector) -> UnaryFn {
    UnaryFn::of_ctx(move |ctx: &StreamContext, value: Value| -> Result<Value, StreamError> {
        let items = as_batch(value)?;
        let mut total = 0.0;
        for (key, element) in keyed_elements(ctx, items, &selector) {
            match key.numeric() {
                Some(figure) => total += figure,
                None => ctx.report(
                    &StreamError::general(format!("non-numeric value under selector: {key}"))
                        .with_item(StreamItem::new(element)),
                ),
            }
        }
        Ok(Value::Float(total))
    })
}

/// Sum the numeric values found under `key` across a batch of maps.
pub fn sum_by_key(key: impl Into<Value>) -> UnaryFn {
    sum_by(Selector::Key(key.into()))
}

/// Sum the numeric values of field `name` across a batch of records.
pub fn sum_by_name(name: impl Into<String>) -> UnaryFn {
    sum_by(Selector::Name(name.into()))
}

/// Sum the numeric values at index `pos` across a batch of lists.
pub fn sum_by_pos(pos: usize) -> UnaryFn {
    sum_by(Selector::Pos(pos))
}

/// Stable ascending sort of directly comparable elements.
pub fn sort() -> UnaryFn {
    UnaryFn::of(|value: Value| -> Result<Value, StreamError> {
        let mut items = as_batch(value)?;
        items.sort_by(compare);
        Ok(Value::List(items))
    })
}

fn sort_by(selector: Selector) -> UnaryFn {
    UnaryFn::of_ctx(move |ctx: &StreamContext, value: Value| -> Result<Value, StreamError> {
        let items = as_batch(value)?;
        let mut keyed = keyed_elements(ctx, items, &selector);
        keyed.sort_by(|(a, _), (b, _)| compare(a, b));
        Ok(Value::List(keyed.into_iter().map(|(_, element)| element).collect()))
    })
}

/// Stable ascending sort of a batch of maps by the value under `key`.
pub fn sort_by_key(key: impl Into<Value>) -> UnaryFn {
    sort_by(Selector::Key(key.into()))
}

/// Stable ascending sort of a batch of records by field `name`.
pub fn sort_by_name(name: impl Into<String>) -> UnaryFn {
    sort_by(Selector::Name(name.into()))
}

/// Stable ascending sort of a batch of lists by the element at `pos`.
pub fn sort_by_pos(pos: usize) -> UnaryFn {
    sort_by(Selector::Pos(pos))
}

fn group_by(selector: Selector) -> UnaryFn {
    UnaryFn::of_ctx(move |ctx: &StreamContext, value: Value| -> Result<Value, StreamError> {
        let items = as_batch(value)?;
        let mut groups: Vec<(Value, Vec<Value>)> = Vec::new();
        for (key, element) in keyed_elements(ctx, items, &selector) {
            match groups.iter_mut().find(|(group_key, _)| *group_key == key) {
                Some((_, members)) => members.push(element),
                None => groups.push((key, vec![element])),
            }
        }
        Ok(Value::Map(MapValue::from_entries(
            groups
                .into_iter()
                .map(|(key, members)| (key, Value::List(members)))
                .collect(),
        )))
    })
}

/// Partition a batch of maps by the value under `key`. Emits a map from
/// each distinct key value to the list of matching members, both in
/// arrival order.
pub fn group_by_key(key: impl Into<Value>) -> UnaryFn {
    group_by(Selector::Key(key.into()))
}

/// Partition a batch of records by field `name`.
pub fn group_by_name(name: impl Into<String>) -> UnaryFn {
    group_by(Selector::Name(name.into()))
}

/// Partition a batch of lists by the element at `pos`.
pub fn group_by_pos(pos: usize) -> UnaryFn {
    group_by(Selector::Pos(pos))
}
