//! Response normalization
//!
//! Converts whatever `serde_json` produced into a canonical tree of ordered
//! records, lists and scalars. The shape of the source document is kept
//! as-is: no field renaming, no numeric widening, no string coercion, and
//! object keys keep the order the parser enumerated them in.
//!
//! Parsing, normalizing, converting back and dropping are all free of call
//! stack recursion, so nesting depth is bounded by memory only.

use std::mem;
use std::ops::Index;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

pub type Record = IndexMap<String, NormalizedValue>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<NormalizedValue>),
    Record(Record),
}

static NULL: NormalizedValue = NormalizedValue::Null;

/// Normalize a parsed JSON value.
///
/// Walks the document with an explicit stack so nesting depth is bounded by
/// memory rather than by the thread's call stack.
pub fn normalize(value: &Value) -> NormalizedValue {
    let mut stack = match Frame::open(value) {
        Ok(frame) => vec![frame],
        Err(leaf) => return leaf,
    };

    loop {
        let next = match stack.last_mut() {
            Some(frame) => frame.next_child(),
            None => return NormalizedValue::Null,
        };

        match next {
            Some(child) => match Frame::open(child) {
                Ok(frame) => stack.push(frame),
                Err(leaf) => attach(&mut stack, leaf),
            },
            None => {
                let finished = match stack.pop() {
                    Some(frame) => frame.close(),
                    None => return NormalizedValue::Null,
                };
                if stack.is_empty() {
                    return finished;
                }
                attach(&mut stack, finished);
            }
        }
    }
}

/// Parse a raw response body and normalize it. An empty body (e.g. a 204
/// answer to a delete) yields `Null`.
pub fn normalize_body(raw: &str) -> Result<NormalizedValue, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(NormalizedValue::Null);
    }
    let parsed = parse_unbounded(raw)?;
    let normalized = normalize(&parsed);
    discard_value(parsed);
    Ok(normalized)
}

/// `serde_json` parsing without the 128 level cap; the stack grows on the
/// heap while descending.
pub fn parse_unbounded(raw: &str) -> Result<Value, serde_json::Error> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    deserializer.disable_recursion_limit();
    let parsed = Value::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    deserializer.end()?;
    Ok(parsed)
}

/// Drop a `Value` container by container. Its own `Drop` recurses.
pub fn discard_value(value: Value) {
    let mut pending = vec![value];
    while let Some(value) = pending.pop() {
        match value {
            Value::Array(items) => pending.extend(items),
            Value::Object(map) => pending.extend(map.into_iter().map(|(_, v)| v)),
            _ => {}
        }
    }
}

fn attach(stack: &mut [Frame<'_>], value: NormalizedValue) {
    if let Some(parent) = stack.last_mut() {
        parent.push(value);
    }
}

/// A container being filled while its children are walked.
enum Frame<'a> {
    List {
        pending: std::slice::Iter<'a, Value>,
        done: Vec<NormalizedValue>,
    },
    Record {
        pending: serde_json::map::Iter<'a>,
        key: String,
        done: Record,
    },
}

impl<'a> Frame<'a> {
    /// Scalars come back as `Err` since they need no frame.
    fn open(value: &'a Value) -> Result<Self, NormalizedValue> {
        match value {
            Value::Null => Err(NormalizedValue::Null),
            Value::Bool(b) => Err(NormalizedValue::Bool(*b)),
            Value::Number(n) => Err(NormalizedValue::Number(n.clone())),
            Value::String(s) => Err(NormalizedValue::String(s.clone())),
            Value::Array(items) => Ok(Frame::List {
                pending: items.iter(),
                done: Vec::with_capacity(items.len()),
            }),
            Value::Object(map) => Ok(Frame::Record {
                pending: map.iter(),
                key: String::new(),
                done: IndexMap::with_capacity(map.len()),
            }),
        }
    }

    fn next_child(&mut self) -> Option<&'a Value> {
        match self {
            Frame::List { pending, .. } => pending.next(),
            Frame::Record { pending, key, .. } => pending.next().map(|(k, v)| {
                *key = k.clone();
                v
            }),
        }
    }

    fn push(&mut self, value: NormalizedValue) {
        match self {
            Frame::List { done, .. } => done.push(value),
            Frame::Record { key, done, .. } => {
                done.insert(std::mem::take(key), value);
            }
        }
    }

    fn close(self) -> NormalizedValue {
        match self {
            Frame::List { done, .. } => NormalizedValue::List(done),
            Frame::Record { done, .. } => NormalizedValue::Record(done),
        }
    }
}

impl NormalizedValue {
    pub fn get(&self, field: &str) -> Option<&NormalizedValue> {
        match self {
            NormalizedValue::Record(record) => record.get(field),
            _ => None,
        }
    }

    pub fn at(&self, index: usize) -> Option<&NormalizedValue> {
        match self {
            NormalizedValue::List(items) => items.get(index),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NormalizedValue::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[NormalizedValue]> {
        match self {
            NormalizedValue::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            NormalizedValue::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, NormalizedValue::Null)
    }

    /// Move the list stored under `field` out of a record. Absent or
    /// non-list fields give an empty list.
    pub fn take_list(&mut self, field: &str) -> Vec<NormalizedValue> {
        let NormalizedValue::Record(record) = self else {
            return Vec::new();
        };
        match record.shift_remove(field) {
            Some(mut value) => match &mut value {
                NormalizedValue::List(items) => mem::take(items),
                _ => Vec::new(),
            },
            None => Vec::new(),
        }
    }

    /// Number of nested containers on the deepest path, scalars count as 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut pending = vec![(self, 0usize)];
        while let Some((value, level)) = pending.pop() {
            match value {
                NormalizedValue::List(items) => {
                    deepest = deepest.max(level + 1);
                    pending.extend(items.iter().map(|v| (v, level + 1)));
                }
                NormalizedValue::Record(record) => {
                    deepest = deepest.max(level + 1);
                    pending.extend(record.values().map(|v| (v, level + 1)));
                }
                _ => {}
            }
        }
        deepest
    }
}

impl Index<&str> for NormalizedValue {
    type Output = NormalizedValue;

    fn index(&self, field: &str) -> &NormalizedValue {
        self.get(field).unwrap_or(&NULL)
    }
}

impl Index<usize> for NormalizedValue {
    type Output = NormalizedValue;

    fn index(&self, index: usize) -> &NormalizedValue {
        self.at(index).unwrap_or(&NULL)
    }
}

impl PartialEq<str> for NormalizedValue {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == Some(other)
    }
}

impl PartialEq<&str> for NormalizedValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

impl From<&Value> for NormalizedValue {
    fn from(value: &Value) -> Self {
        normalize(value)
    }
}

impl From<NormalizedValue> for Value {
    fn from(mut value: NormalizedValue) -> Self {
        let mut stack = match Rebuild::open(&mut value) {
            Ok(frame) => vec![frame],
            Err(leaf) => return leaf,
        };

        loop {
            let next = match stack.last_mut() {
                Some(frame) => frame.next_child(),
                None => return Value::Null,
            };

            match next {
                Some(mut child) => match Rebuild::open(&mut child) {
                    Ok(frame) => stack.push(frame),
                    Err(leaf) => {
                        if let Some(parent) = stack.last_mut() {
                            parent.push(leaf);
                        }
                    }
                },
                None => {
                    let finished = match stack.pop() {
                        Some(frame) => frame.close(),
                        None => return Value::Null,
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.push(finished),
                        None => return finished,
                    }
                }
            }
        }
    }
}

/// A `Value` container being rebuilt from a consumed normalized one.
enum Rebuild {
    List {
        pending: std::vec::IntoIter<NormalizedValue>,
        done: Vec<Value>,
    },
    Record {
        pending: indexmap::map::IntoIter<String, NormalizedValue>,
        key: String,
        done: Map<String, Value>,
    },
}

impl Rebuild {
    /// Moves the children out, leaving `value` an empty shell.
    fn open(value: &mut NormalizedValue) -> Result<Self, Value> {
        match value {
            NormalizedValue::Null => Err(Value::Null),
            NormalizedValue::Bool(b) => Err(Value::Bool(*b)),
            NormalizedValue::Number(n) => Err(Value::Number(n.clone())),
            NormalizedValue::String(s) => Err(Value::String(mem::take(s))),
            NormalizedValue::List(items) => {
                let items = mem::take(items);
                Ok(Rebuild::List { done: Vec::with_capacity(items.len()), pending: items.into_iter() })
            }
            NormalizedValue::Record(record) => {
                let record = mem::take(record);
                Ok(Rebuild::Record { done: Map::with_capacity(record.len()), key: String::new(), pending: record.into_iter() })
            }
        }
    }

    fn next_child(&mut self) -> Option<NormalizedValue> {
        match self {
            Rebuild::List { pending, .. } => pending.next(),
            Rebuild::Record { pending, key, .. } => pending.next().map(|(k, v)| {
                *key = k;
                v
            }),
        }
    }

    fn push(&mut self, value: Value) {
        match self {
            Rebuild::List { done, .. } => done.push(value),
            Rebuild::Record { key, done, .. } => {
                done.insert(mem::take(key), value);
            }
        }
    }

    fn close(self) -> Value {
        match self {
            Rebuild::List { done, .. } => Value::Array(done),
            Rebuild::Record { done, .. } => Value::Object(done),
        }
    }
}

// flattens nested containers onto a heap stack before releasing them
impl Drop for NormalizedValue {
    fn drop(&mut self) {
        let mut pending = match self {
            NormalizedValue::List(items) if !items.is_empty() => mem::take(items),
            NormalizedValue::Record(record) if !record.is_empty() => record.drain(..).map(|(_, v)| v).collect(),
            _ => return,
        };
        while let Some(mut value) = pending.pop() {
            match &mut value {
                NormalizedValue::List(items) => pending.append(items),
                NormalizedValue::Record(record) => pending.extend(record.drain(..).map(|(_, v)| v)),
                _ => {}
            }
        }
    }
}
