//! `Value`: the tagged int-or-float the parser folds constants into and the
//! VM accumulator holds at runtime. Same shape as a packed `OpResult`, just
//! two variants instead of three and float arithmetic instead of
//! byte/word/long-width arithmetic.

use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f32),
}

impl Value {
    pub fn as_i32(&self) -> i32 {
        match *self {
            Value::Int(i) => i,
            Value::Float(f) => f as i32,
        }
    }

    pub fn as_f32(&self) -> f32 {
        match *self {
            Value::Int(i) => i as f32,
            Value::Float(f) => f,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    pub fn is_zero(&self) -> bool {
        match *self {
            Value::Int(i) => i == 0,
            Value::Float(f) => f == 0.0,
        }
    }

    /// Flip the sign bit (bit 31) of the IEEE-754 representation, per the
    /// resolved float-negation open question (SPEC_FULL §9.1): the newer,
    /// IEEE-correct variant, not the older bit-28 one.
    pub fn negate_float_bits(&self) -> Value {
        match *self {
            Value::Float(f) => Value::Float(f32::from_bits(f.to_bits() ^ 0x8000_0000)),
            Value::Int(i) => Value::Int(-i),
        }
    }

    pub fn add(self, other: Value) -> Value {
        if self.is_float() || other.is_float() {
            Value::Float(self.as_f32() + other.as_f32())
        } else {
            Value::Int(self.as_i32().wrapping_add(other.as_i32()))
        }
    }

    pub fn sub(self, other: Value) -> Value {
        if self.is_float() || other.is_float() {
            Value::Float(self.as_f32() - other.as_f32())
        } else {
            Value::Int(self.as_i32().wrapping_sub(other.as_i32()))
        }
    }

    pub fn mul(self, other: Value) -> Value {
        if self.is_float() || other.is_float() {
            Value::Float(self.as_f32() * other.as_f32())
        } else {
            Value::Int(self.as_i32().wrapping_mul(other.as_i32()))
        }
    }

    pub fn div(self, other: Value) -> Value {
        if self.is_float() || other.is_float() {
            Value::Float(self.as_f32() / other.as_f32())
        } else {
            Value::Int(self.as_i32().wrapping_div(other.as_i32()))
        }
    }

    pub fn rem(self, other: Value) -> Value {
        Value::Int(self.as_i32().wrapping_rem(other.as_i32()))
    }

    pub fn bitwise(self, other: Value, op: impl Fn(i32, i32) -> i32) -> Value {
        Value::Int(op(self.as_i32(), other.as_i32()))
    }

    pub fn compare(self, other: Value, op: impl Fn(f32, f32) -> bool, int_op: impl Fn(i32, i32) -> bool) -> Value {
        let b = if self.is_float() || other.is_float() {
            op(self.as_f32(), other.as_f32())
        } else {
            int_op(self.as_i32(), other.as_i32())
        };
        Value::Int(b as i32)
    }

    pub fn to_bits(&self) -> i32 {
        match *self {
            Value::Int(i) => i,
            Value::Float(f) => f.to_bits() as i32,
        }
    }

    pub fn from_int_bits(bits: i32) -> Value {
        Value::Int(bits)
    }

    pub fn from_float_bits(bits: i32) -> Value {
        Value::Float(f32::from_bits(bits as u32))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
        }
    }
}
