//! Payload shape classification.
//!
//! Decides, purely from structure, which extraction strategy applies to a
//! payload. The heuristic is allowed to be wrong on rare shapes; the worst
//! outcome of a misclassification is that a payload contributes nothing.

use super::fields::{
    has_nested_collection, looks_like_item, JsonObject, COLLECTION_KEYS, NESTED_TRACK_KEY,
    RAW_CONTENT_KEY,
};
use serde_json::Value;
use std::borrow::Cow;

/// Wrappers deeper than this are not searched for collections.
const MAX_WALK_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Collection,
    SingleItem,
    #[default]
    Unrecognized,
}

/// Classification result, borrowing the candidate items from the payload.
#[derive(Debug, PartialEq)]
pub enum PayloadShape<'a> {
    /// One or more lists of items, flattened in document order. May be empty.
    Collection { items: Vec<&'a JsonObject> },
    /// The payload itself is one track object.
    SingleItem(&'a JsonObject),
    Unrecognized,
}

impl PayloadShape<'_> {
    pub fn kind(&self) -> ShapeKind {
        match self {
            PayloadShape::Collection { .. } => ShapeKind::Collection,
            PayloadShape::SingleItem(_) => ShapeKind::SingleItem,
            PayloadShape::Unrecognized => ShapeKind::Unrecognized,
        }
    }

    /// Candidate items in document order.
    pub fn items(&self) -> Vec<&JsonObject> {
        match self {
            PayloadShape::Collection { items } => items.clone(),
            PayloadShape::SingleItem(item) => vec![*item],
            PayloadShape::Unrecognized => Vec::new(),
        }
    }
}

/// The collector stores bodies it failed to parse as `{"raw_content": "..."}`.
/// Such text is given a second chance here; anything else passes through.
pub fn unwrap_raw_content(data: &Value) -> Cow<'_, Value> {
    let raw = data
        .as_object()
        .filter(|object| object.len() == 1)
        .and_then(|object| object.get(RAW_CONTENT_KEY))
        .and_then(Value::as_str);

    match raw.and_then(|text| serde_json::from_str::<Value>(text.trim()).ok()) {
        Some(parsed) => Cow::Owned(parsed),
        None => Cow::Borrowed(data),
    }
}

/// Classifies a payload by inspecting its structure.
///
/// A top-level track object stays a single item even when some unrelated
/// sub-object carries a list; only its own collection keys make it a
/// container.
pub fn classify(payload: &Value) -> PayloadShape<'_> {
    if let Value::Object(object) = payload {
        if looks_like_item(object) && !has_nested_collection(object) {
            return PayloadShape::SingleItem(object);
        }
    }

    let mut walker = CollectionWalker::default();
    walker.visit_container(payload, 0);
    if walker.found_collection {
        PayloadShape::Collection {
            items: walker.items,
        }
    } else {
        PayloadShape::Unrecognized
    }
}

#[derive(Default)]
struct CollectionWalker<'a> {
    items: Vec<&'a JsonObject>,
    found_collection: bool,
}

impl<'a> CollectionWalker<'a> {
    /// Looks for lists inside `value`: the value itself when it is an array,
    /// the collection keys of an object, and wrapper objects below it.
    fn visit_container(&mut self, value: &'a Value, depth: usize) {
        if depth > MAX_WALK_DEPTH {
            return;
        }

        match value {
            Value::Array(elements) => {
                self.found_collection = true;
                for element in elements {
                    self.visit_element(element, depth + 1);
                }
            }
            Value::Object(object) => {
                for key in COLLECTION_KEYS {
                    if let Some(list) = object.get(*key).filter(|v| v.is_array()) {
                        self.visit_container(list, depth + 1);
                    }
                }
                for (key, inner) in object {
                    if COLLECTION_KEYS.contains(&key.as_str()) || key == NESTED_TRACK_KEY {
                        continue;
                    }
                    if let Value::Object(wrapper) = inner {
                        if !looks_like_item(wrapper) {
                            self.visit_container(inner, depth + 1);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn visit_element(&mut self, element: &'a Value, depth: usize) {
        match element {
            Value::Object(object) => {
                if looks_like_item(object) {
                    self.items.push(object);
                }
                if has_nested_collection(object) || !looks_like_item(object) {
                    self.visit_container(element, depth);
                }
            }
            Value::Array(_) => self.visit_container(element, depth),
            _ => {}
        }
    }
}
