//! # Field Types
//!
//! ## Storage Widths
//!
//! | Type | Bits | Encoding |
//! |------|------|----------|
//! | Bool | 1 | 0 / 1 |
//! | Int8, Int16, Int32, Int64 | 8, 16, 32, 64 | two's complement, sign-extended on read |
//! | Unsigned(n) | n (1..=63) | plain binary |
//! | Float32, Float64 | 32, 64 | IEEE-754 bit pattern |
//! | Object | 32 | 1-based slot into the storage's object table, 0 = none |
//!
//! Encoding and decoding are total over the declared width: any bit pattern
//! decodes to some value. That is what makes union reinterpretation safe.

use crate::config::{MAX_FIELD_BITS, OBJECT_SLOT_BITS};
use crate::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Unsigned(u8),
    Float32,
    Float64,
    Object,
}

#[inline]
pub(crate) fn low_mask(width_bits: u32) -> u64 {
    if width_bits >= 64 {
        u64::MAX
    } else {
        (1u64 << width_bits) - 1
    }
}

impl FieldType {
    pub fn width_bits(&self) -> u32 {
        match self {
            FieldType::Bool => 1,
            FieldType::Int8 => 8,
            FieldType::Int16 => 16,
            FieldType::Int32 | FieldType::Float32 => 32,
            FieldType::Int64 | FieldType::Float64 => 64,
            FieldType::Unsigned(bits) => *bits as u32,
            FieldType::Object => OBJECT_SLOT_BITS,
        }
    }

    pub fn is_object(&self) -> bool {
        matches!(self, FieldType::Object)
    }

    pub fn name(&self) -> String {
        match self {
            FieldType::Bool => "bool".into(),
            FieldType::Int8 => "int8".into(),
            FieldType::Int16 => "int16".into(),
            FieldType::Int32 => "int32".into(),
            FieldType::Int64 => "int64".into(),
            FieldType::Unsigned(bits) => format!("unsigned{}", bits),
            FieldType::Float32 => "float32".into(),
            FieldType::Float64 => "float64".into(),
            FieldType::Object => "object".into(),
        }
    }

    /// Checks a declared width before it reaches the compiler.
    pub(crate) fn validate(&self) -> Result<(), String> {
        match self {
            FieldType::Unsigned(bits) if *bits == 0 || *bits as u32 >= MAX_FIELD_BITS => Err(
                format!("unsigned width must be 1..={}, got {}", MAX_FIELD_BITS - 1, bits),
            ),
            _ => Ok(()),
        }
    }

    /// Value read from a region that was never written.
    pub fn default_value(&self) -> Value {
        match self {
            FieldType::Object => Value::Object(None),
            _ => self.decode(0),
        }
    }

    /// Encodes a primitive value into the low `width_bits` of a word.
    ///
    /// Objects are encoded by the storage, which owns the slot table.
    pub(crate) fn encode(&self, value: &Value) -> Result<u64, String> {
        let width = self.width_bits();
        match (self, value) {
            (FieldType::Bool, Value::Bool(b)) => Ok(*b as u64),
            (FieldType::Int8, Value::Int(v)) => signed_in_range(*v, width),
            (FieldType::Int16, Value::Int(v)) => signed_in_range(*v, width),
            (FieldType::Int32, Value::Int(v)) => signed_in_range(*v, width),
            (FieldType::Int64, Value::Int(v)) => Ok(*v as u64),
            (FieldType::Unsigned(_), Value::Int(v)) => {
                if *v < 0 || (*v as u64) > low_mask(width) {
                    Err(format!("{} (out of range for {} bits)", v, width))
                } else {
                    Ok(*v as u64)
                }
            }
            (FieldType::Float32, Value::Float(f)) => Ok(f.to_bits() as u64),
            (FieldType::Float64, Value::Double(d)) => Ok(d.to_bits()),
            (FieldType::Object, Value::Object(_)) => Ok(0),
            (_, other) => Err(other.type_name().to_string()),
        }
    }

    /// Decodes the low `width_bits` of `bits`. Objects decode to their slot
    /// number as an integer; the storage resolves it.
    pub(crate) fn decode(&self, bits: u64) -> Value {
        let width = self.width_bits();
        let bits = bits & low_mask(width);
        match self {
            FieldType::Bool => Value::Bool(bits != 0),
            FieldType::Int8 | FieldType::Int16 | FieldType::Int32 | FieldType::Int64 => {
                let shift = 64 - width;
                Value::Int(((bits << shift) as i64) >> shift)
            }
            FieldType::Unsigned(_) | FieldType::Object => Value::Int(bits as i64),
            FieldType::Float32 => Value::Float(f32::from_bits(bits as u32)),
            FieldType::Float64 => Value::Double(f64::from_bits(bits)),
        }
    }
}

fn signed_in_range(v: i64, width: u32) -> Result<u64, String> {
    let min = -(1i64 << (width - 1));
    let max = (1i64 << (width - 1)) - 1;
    if v < min || v > max {
        return Err(format!("{} (out of range for {} bits)", v, width));
    }
    Ok((v as u64) & low_mask(width))
}
