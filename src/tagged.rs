//! NaN-boxed 32-bit cell encoding.
//!
//! A [`Cell`] is the raw 32 bits stored on the stacks, in CODE literals,
//! and in memory. Finite non-NaN bit patterns are plain `f32` numbers;
//! a reserved quiet-NaN payload range instead carries a `{tag, value,
//! meta}` triple. [`to_tagged`]/[`from_tagged`] are the only places that
//! touch the bit pattern directly.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Quiet NaN with the IEEE-754 sign bit and all exponent bits set, plus
/// one mantissa bit set so the pattern is never mistaken for infinity.
/// Bits 0..=15: value. Bit 16: meta. Bits 17..=20: tag. Remaining bits
/// are the fixed NaN prefix.
const NAN_PREFIX_MASK: u32 = 0xFFE0_0000;
const NAN_PREFIX: u32 = 0x7FC0_0000;
const TAG_SHIFT: u32 = 17;
const TAG_MASK: u32 = 0xF;
const META_SHIFT: u32 = 16;
const VALUE_MASK: u32 = 0xFFFF;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive,
)]
#[repr(u8)]
pub enum Tag {
    Number = 0,
    Integer = 1,
    Code = 2,
    Builtin = 3,
    String = 4,
    List = 5,
    Link = 6,
    RList = 7,
    Local = 8,
    Sentinel = 9,
    Address = 10,
}

/// A 32-bit VM cell: either a plain float, or a tagged non-float value.
#[derive(Clone, Copy, PartialEq)]
pub struct Cell(pub u32);

impl Cell {
    pub fn from_f32(v: f32) -> Self {
        Cell(v.to_bits())
    }

    pub fn as_f32(self) -> f32 {
        f32::from_bits(self.0)
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match from_tagged(*self) {
            TaggedValue::Number(n) => write!(f, "Number({n})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A decoded cell: the ergonomic view used everywhere above the codec.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TaggedValue {
    Number(f32),
    Integer(i16),
    Code { addr: u16, meta: bool },
    Builtin(u16),
    String(u16),
    List { slots: u16 },
    Link(u16),
    RList { slots: u16 },
    Local(u16),
    Sentinel(u16),
    Address(u16),
}

impl TaggedValue {
    pub fn tag(&self) -> Tag {
        match self {
            TaggedValue::Number(_) => Tag::Number,
            TaggedValue::Integer(_) => Tag::Integer,
            TaggedValue::Code { .. } => Tag::Code,
            TaggedValue::Builtin(_) => Tag::Builtin,
            TaggedValue::String(_) => Tag::String,
            TaggedValue::List { .. } => Tag::List,
            TaggedValue::Link(_) => Tag::Link,
            TaggedValue::RList { .. } => Tag::RList,
            TaggedValue::Local(_) => Tag::Local,
            TaggedValue::Sentinel(_) => Tag::Sentinel,
            TaggedValue::Address(_) => Tag::Address,
        }
    }
}

/// Packs `(value, tag, meta)` into a cell. `value` must fit in 16 bits;
/// callers that only ever build values through this module cannot violate
/// that (every constructor below truncates/validates its own domain).
pub fn to_tagged_value(value: u16, tag: Tag, meta: bool) -> Cell {
    let tag_bits: u8 = tag.into();
    let bits = NAN_PREFIX
        | ((tag_bits as u32 & TAG_MASK) << TAG_SHIFT)
        | ((meta as u32) << META_SHIFT)
        | (value as u32 & VALUE_MASK);
    Cell(bits)
}

/// Decodes a cell. Any bit pattern outside the reserved NaN-payload range
/// is a plain number.
pub fn from_tagged(cell: Cell) -> TaggedValue {
    if cell.0 & NAN_PREFIX_MASK != NAN_PREFIX {
        return TaggedValue::Number(cell.as_f32());
    }
    let value = (cell.0 & VALUE_MASK) as u16;
    let meta = (cell.0 >> META_SHIFT) & 1 != 0;
    let tag_bits = ((cell.0 >> TAG_SHIFT) & TAG_MASK) as u8;
    match Tag::try_from(tag_bits) {
        Ok(Tag::Number) | Err(_) => TaggedValue::Number(cell.as_f32()),
        Ok(Tag::Integer) => TaggedValue::Integer(value as i16),
        Ok(Tag::Code) => TaggedValue::Code { addr: value, meta },
        Ok(Tag::Builtin) => TaggedValue::Builtin(value),
        Ok(Tag::String) => TaggedValue::String(value),
        Ok(Tag::List) => TaggedValue::List { slots: value },
        Ok(Tag::Link) => TaggedValue::Link(value),
        Ok(Tag::RList) => TaggedValue::RList { slots: value },
        Ok(Tag::Local) => TaggedValue::Local(value),
        Ok(Tag::Sentinel) => TaggedValue::Sentinel(value),
        Ok(Tag::Address) => TaggedValue::Address(value),
    }
}

pub fn tag_of(cell: Cell) -> Tag {
    from_tagged(cell).tag()
}

/// Sentinel meaning "no result". Encoded as `Integer(0)` with `meta` set,
/// a combination number literals and real integers never produce.
pub fn nil() -> Cell {
    to_tagged_value(0, Tag::Integer, true)
}

pub fn is_nil(cell: Cell) -> bool {
    matches!(from_tagged(cell), TaggedValue::Integer(0))
        && (cell.0 >> META_SHIFT) & 1 != 0
}

pub fn is_number(cell: Cell) -> bool {
    matches!(from_tagged(cell), TaggedValue::Number(_))
}

pub fn is_list(cell: Cell) -> bool {
    matches!(
        from_tagged(cell),
        TaggedValue::List { .. } | TaggedValue::RList { .. }
    )
}

pub fn is_code(cell: Cell) -> bool {
    matches!(from_tagged(cell), TaggedValue::Code { .. })
}

pub fn is_integer(cell: Cell) -> bool {
    matches!(from_tagged(cell), TaggedValue::Integer(_))
}

/// A "ref" is any tagged value that names a location a `load`/`store`
/// can dereference: an absolute global-heap cell index.
pub fn is_ref(cell: Cell) -> bool {
    matches!(from_tagged(cell), TaggedValue::Address(_))
}

pub fn list_slots(cell: Cell) -> Option<u16> {
    match from_tagged(cell) {
        TaggedValue::List { slots } | TaggedValue::RList { slots } => {
            Some(slots)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Tag::Integer, false)]
    #[case(Tag::Code, false)]
    #[case(Tag::Code, true)]
    #[case(Tag::Builtin, false)]
    #[case(Tag::String, false)]
    #[case(Tag::List, false)]
    #[case(Tag::Local, false)]
    #[case(Tag::Sentinel, false)]
    #[case(Tag::Address, false)]
    fn round_trips_every_16_bit_value(#[case] tag: Tag, #[case] meta: bool) {
        for value in [0u16, 1, 42, 0x7FFF, 0xFFFF, 0x8000] {
            let cell = to_tagged_value(value, tag, meta);
            let decoded = from_tagged(cell);
            assert_eq!(decoded.tag(), tag);
            match (decoded, tag) {
                (TaggedValue::Integer(v), Tag::Integer) => {
                    assert_eq!(v as u16, value)
                }
                (TaggedValue::Code { addr, meta: m }, Tag::Code) => {
                    assert_eq!(addr, value);
                    assert_eq!(m, meta);
                }
                (TaggedValue::Builtin(v), Tag::Builtin) => assert_eq!(v, value),
                (TaggedValue::String(v), Tag::String) => assert_eq!(v, value),
                (TaggedValue::List { slots }, Tag::List) => {
                    assert_eq!(slots, value)
                }
                (TaggedValue::Local(v), Tag::Local) => assert_eq!(v, value),
                (TaggedValue::Sentinel(v), Tag::Sentinel) => {
                    assert_eq!(v, value)
                }
                (TaggedValue::Address(v), Tag::Address) => assert_eq!(v, value),
                other => panic!("unexpected decode {other:?}"),
            }
        }
    }

    #[test]
    fn finite_floats_round_trip_bitwise() {
        for x in [0.0f32, -0.0, 1.0, -1.0, 3.5, f32::MIN, f32::MAX, 42.125] {
            let cell = Cell::from_f32(x);
            match from_tagged(cell) {
                TaggedValue::Number(n) => assert_eq!(n.to_bits(), x.to_bits()),
                other => panic!("expected Number, got {other:?}"),
            }
        }
    }

    #[test]
    fn nil_is_nil_and_nothing_else_is() {
        assert!(is_nil(nil()));
        assert!(!is_nil(to_tagged_value(0, Tag::Integer, false)));
        assert!(!is_nil(to_tagged_value(1, Tag::Integer, true)));
        assert!(!is_nil(Cell::from_f32(0.0)));
    }
}
