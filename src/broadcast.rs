//! Lifts scalar arithmetic/comparison builtins over lists, recursively
//! walking nested compound payloads the same way a size calculation
//! would walk a nested type tree — applied here to arithmetic instead.

use crate::error::{Result, VmError};
use crate::list::span;
use crate::tagged::{from_tagged, to_tagged_value, Cell, Tag, TaggedValue};

fn as_number(cell: Cell, op: &'static str) -> Result<f32> {
    match from_tagged(cell) {
        TaggedValue::Number(n) => Ok(n),
        other => Err(VmError::TypeError { op, found: other.tag() }),
    }
}

/// A list materialized as an owned vec of payload cells (deep to
/// shallow, i.e. written order) without its header — the unit
/// broadcasting helpers operate on before re-wrapping with a fresh
/// header.
#[derive(Clone, Debug)]
pub enum Value {
    Scalar(Cell),
    List(Vec<Value>),
}

impl Value {
    /// Reads a `Value` tree starting at `cells[pos]`, where `cells` is a
    /// payload slice in written (deep-to-shallow) order and `pos` is the
    /// index of the first cell of this element. Returns the value and
    /// the number of raw cells consumed.
    fn read(cells: &[Cell], pos: usize) -> (Value, usize) {
        let cell = cells[pos];
        match from_tagged(cell).tag() {
            Tag::List => {
                let slots = crate::tagged::list_slots(cell).unwrap() as usize;
                let mut items = Vec::new();
                let mut consumed = 0;
                while consumed < slots {
                    let (v, n) = Value::read(cells, pos + consumed);
                    items.push(v);
                    consumed += n;
                }
                (Value::List(items), slots + 1)
            }
            _ => (Value::Scalar(cell), 1),
        }
    }

    /// Flattens this value back into raw cells in written order, with
    /// its own header appended last if it is a list.
    fn write(&self, out: &mut Vec<Cell>) {
        match self {
            Value::Scalar(c) => out.push(*c),
            Value::List(items) => {
                let start = out.len();
                for item in items {
                    item.write(out);
                }
                let slots = out.len() - start;
                out.push(to_tagged_value(slots as u16, Tag::List, false));
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::List(items) => items.len(),
        }
    }

    fn nth(&self, i: usize) -> &Value {
        match self {
            Value::Scalar(_) => self,
            Value::List(items) => &items[i % items.len().max(1)],
        }
    }
}

/// Materializes a stack-native list (header-last payload slice, written
/// order) into a `Value` tree, or a bare scalar.
pub fn read_value(span_cells: &[Cell]) -> Value {
    let header = *span_cells.last().unwrap();
    if from_tagged(header).tag() != Tag::List {
        return Value::Scalar(header);
    }
    let slots = crate::tagged::list_slots(header).unwrap() as usize;
    let payload = &span_cells[..slots];
    let (value, consumed) = Value::read(payload, 0);
    debug_assert_eq!(consumed, slots);
    value
}

/// Flattens a `Value` back to stack-native cells (written order, header
/// last if it is a list).
pub fn write_value(value: &Value) -> Vec<Cell> {
    let mut out = Vec::new();
    value.write(&mut out);
    out
}

fn map_unary(value: &Value, op: &'static str, f: fn(f32) -> f32) -> Result<Value> {
    match value {
        Value::Scalar(c) => Ok(Value::Scalar(Cell::from_f32(f(as_number(*c, op)?)))),
        Value::List(items) => {
            let mapped: Result<Vec<Value>> =
                items.iter().map(|v| map_unary(v, op, f)).collect();
            Ok(Value::List(mapped?))
        }
    }
}

/// Unary recursive broadcast: applies `f` elementwise, recursing into
/// nested lists and leaving list structure otherwise intact.
pub fn unary(value: &Value, op: &'static str, f: fn(f32) -> f32) -> Result<Value> {
    map_unary(value, op, f)
}

/// Binary recursive broadcast:
/// - scalar×scalar: direct `f`.
/// - scalar×list / list×scalar: map `f` across the list's payload.
/// - list×list: align by logical element, result length = max(m, n),
///   indices cycle modulo the shorter; either side empty yields an empty
///   list.
pub fn binary(lhs: &Value, rhs: &Value, op: &'static str, f: fn(f32, f32) -> f32) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Scalar(a), Value::Scalar(b)) => Ok(Value::Scalar(Cell::from_f32(f(
            as_number(*a, op)?,
            as_number(*b, op)?,
        )))),
        (Value::Scalar(_), Value::List(items)) => {
            let mapped: Result<Vec<Value>> =
                items.iter().map(|b| binary(lhs, b, op, f)).collect();
            Ok(Value::List(mapped?))
        }
        (Value::List(items), Value::Scalar(_)) => {
            let mapped: Result<Vec<Value>> =
                items.iter().map(|a| binary(a, rhs, op, f)).collect();
            Ok(Value::List(mapped?))
        }
        (Value::List(a), Value::List(b)) => {
            if a.is_empty() || b.is_empty() {
                return Ok(Value::List(Vec::new()));
            }
            let len = lhs.len().max(rhs.len());
            let mut out = Vec::with_capacity(len);
            for i in 0..len {
                out.push(binary(lhs.nth(i % a.len()), rhs.nth(i % b.len()), op, f)?);
            }
            Ok(Value::List(out))
        }
    }
}
