use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::charset::Charset;
use super::lang::LangSet;
use super::object::ValueKinds;

/// A 2x2 transformation matrix.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Matrix {
    pub xx: f64,
    pub xy: f64,
    pub yx: f64,
    pub yy: f64,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        xx: 1.0,
        xy: 0.0,
        yx: 0.0,
        yy: 1.0,
    };

    /// Returns `self * other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            xx: self.xx * other.xx + self.xy * other.yx,
            xy: self.xx * other.xy + self.xy * other.yy,
            yx: self.yx * other.xx + self.yy * other.yx,
            yy: self.yx * other.xy + self.yy * other.yy,
        }
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

/// A closed interval.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub struct Range {
    pub begin: f64,
    pub end: f64,
}

impl Range {
    pub fn new(begin: f64, end: f64) -> Self {
        Range { begin, end }
    }

    #[inline]
    pub fn contains(&self, v: f64) -> bool {
        self.begin <= v && v <= self.end
    }
}

/// A typed property value.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Float(f64),
    String(String),
    Matrix(Matrix),
    Charset(Charset),
    Range(Range),
    LangSet(LangSet),
}

impl Value {
    /// The kind of this value, as a single flag.
    pub fn kind(&self) -> ValueKinds {
        match self {
            Value::Bool(_) => ValueKinds::BOOL,
            Value::Int(_) => ValueKinds::INT,
            Value::Float(_) => ValueKinds::FLOAT,
            Value::String(_) => ValueKinds::STRING,
            Value::Matrix(_) => ValueKinds::MATRIX,
            Value::Charset(_) => ValueKinds::CHARSET,
            Value::Range(_) => ValueKinds::RANGE,
            Value::LangSet(_) => ValueKinds::LANG_SET,
        }
    }

    /// Integers and floats as `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match *self {
            Value::Int(i) => Some(f64::from(i)),
            Value::Float(f) => Some(f),
            _ => None,
        }
    }

    /// False for NaN or infinite floats, including inside matrices and ranges.
    pub fn is_finite(&self) -> bool {
        match self {
            Value::Float(f) => f.is_finite(),
            Value::Matrix(m) => [m.xx, m.xy, m.yx, m.yy].iter().all(|f| f.is_finite()),
            Value::Range(r) => r.begin.is_finite() && r.end.is_finite(),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Brings two values to a common kind before comparing them.
    ///
    /// Integers widen to floats, numbers widen to degenerate ranges and
    /// strings become one-element language sets when paired with one.
    pub(crate) fn promote(self, other: &Value) -> Value {
        match (self, other) {
            (Value::Int(i), Value::Float(_)) => Value::Float(f64::from(i)),
            (Value::Int(i), Value::Range(_)) => Value::Range(Range::new(f64::from(i), f64::from(i))),
            (Value::Float(f), Value::Range(_)) => Value::Range(Range::new(f, f)),
            (Value::String(s), Value::LangSet(_)) => Value::LangSet(LangSet::from_tags([s])),
            (v, _) => v,
        }
    }

    /// Appends a stable byte encoding of the value.
    pub(crate) fn write_hash(&self, out: &mut Vec<u8>) {
        match self {
            Value::Bool(b) => {
                out.push(0);
                out.push(u8::from(*b));
            }
            Value::Int(i) => {
                out.push(1);
                out.extend_from_slice(&i.to_be_bytes());
            }
            Value::Float(f) => {
                out.push(2);
                out.extend_from_slice(&f.to_bits().to_be_bytes());
            }
            Value::String(s) => {
                out.push(3);
                out.extend_from_slice(&(s.len() as u32).to_be_bytes());
                out.extend_from_slice(s.as_bytes());
            }
            Value::Matrix(m) => {
                out.push(4);
                for v in [m.xx, m.xy, m.yx, m.yy] {
                    out.extend_from_slice(&v.to_bits().to_be_bytes());
                }
            }
            Value::Charset(cs) => {
                out.push(5);
                cs.write_hash(out);
            }
            Value::Range(r) => {
                out.push(6);
                out.extend_from_slice(&r.begin.to_bits().to_be_bytes());
                out.extend_from_slice(&r.end.to_bits().to_be_bytes());
            }
            Value::LangSet(ls) => {
                out.push(7);
                for tag in ls.iter() {
                    out.extend_from_slice(&(tag.len() as u32).to_be_bytes());
                    out.extend_from_slice(tag.as_bytes());
                }
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Matrix> for Value {
    fn from(v: Matrix) -> Self {
        Value::Matrix(v)
    }
}

impl From<Charset> for Value {
    fn from(v: Charset) -> Self {
        Value::Charset(v)
    }
}

impl From<Range> for Value {
    fn from(v: Range) -> Self {
        Value::Range(v)
    }
}

impl From<LangSet> for Value {
    fn from(v: LangSet) -> Self {
        Value::LangSet(v)
    }
}

/// How strongly a value is held.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum Binding {
    /// A fallback, only used when no strong value is present.
    Weak,
    /// Specified by the user; preferred by matching.
    #[default]
    Strong,
    /// Inherits the binding of the value it replaces. Only valid in edits.
    Same,
}

/// A value with its binding.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ValueElt {
    pub value: Value,
    pub binding: Binding,
}

impl ValueElt {
    pub fn new(value: Value, binding: Binding) -> Self {
        ValueElt { value, binding }
    }
}

/// The ordered values of one object.
pub type ValueList = SmallVec<[ValueElt; 2]>;

pub(crate) fn write_list_hash(list: &[ValueElt], out: &mut Vec<u8>) {
    for elt in list {
        out.push(match elt.binding {
            Binding::Weak => 0,
            Binding::Strong | Binding::Same => 1,
        });
        elt.value.write_hash(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_multiply() {
        let shear = Matrix {
            xx: 1.0,
            xy: 0.2,
            yx: 0.0,
            yy: 1.0,
        };
        let scale = Matrix {
            xx: 2.0,
            xy: 0.0,
            yx: 0.0,
            yy: 2.0,
        };
        assert_eq!(Matrix::IDENTITY.multiply(&shear), shear);
        let m = shear.multiply(&scale);
        assert_eq!((m.xx, m.xy, m.yx, m.yy), (2.0, 0.4, 0.0, 2.0));
    }

    #[test]
    fn promotion() {
        assert_eq!(Value::Int(3).promote(&Value::Float(1.0)), Value::Float(3.0));
        assert_eq!(
            Value::Int(3).promote(&Value::Range(Range::new(0.0, 1.0))),
            Value::Range(Range::new(3.0, 3.0))
        );
        assert_eq!(Value::Bool(true).promote(&Value::Int(1)), Value::Bool(true));
    }

    #[test]
    fn hash_distinguishes_kinds() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        Value::Int(1).write_hash(&mut a);
        Value::Bool(true).write_hash(&mut b);
        assert_ne!(a, b);
    }
}
