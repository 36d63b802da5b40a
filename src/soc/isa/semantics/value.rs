//! Runtime values flowing through compiled semantics.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::error::ExecError;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Int(i64),
    Bool(bool),
    Str(Arc<str>),
    /// Opaque host object produced by a library constructor.
    Object(Arc<dyn Any + Send + Sync>),
}

impl Value {
    pub fn int(value: i64) -> Self {
        Value::Int(value)
    }

    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Value::Object(Arc::new(value))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Int(_) => "int",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_int(&self) -> Result<i64, ExecError> {
        match self {
            Value::Int(value) => Ok(*value),
            Value::Bool(value) => Ok(i64::from(*value)),
            other => Err(ExecError::Type {
                expected: "int",
                found: other.type_name(),
            }),
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined => false,
            Value::Int(value) => *value != 0,
            Value::Bool(value) => *value,
            Value::Str(value) => !value.is_empty(),
            Value::Object(_) => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::Str(value) = self {
            Some(value)
        } else {
            None
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Value::Object(object) => object.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Equality with int/bool coercion; objects compare by identity.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Int(_) | Value::Bool(_), Value::Int(_) | Value::Bool(_)) => {
                self.as_int().ok() == other.as_int().ok()
            }
            _ => false,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Int(value) => f.debug_tuple("Int").field(value).finish(),
            Value::Bool(value) => f.debug_tuple("Bool").field(value).finish(),
            Value::Str(value) => f.debug_tuple("Str").field(value).finish(),
            Value::Object(_) => f.write_str("Object(..)"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Str(value) => f.write_str(value),
            Value::Object(_) => f.write_str("[object]"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<u8> for Value {
    fn from(value: u8) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(Arc::from(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_coercion_accepts_bools() {
        assert_eq!(Value::from(true).as_int(), Ok(1));
        assert_eq!(Value::from(0x2Fu16).as_int(), Ok(0x2F));
        assert_eq!(
            Value::from("V0").as_int(),
            Err(ExecError::Type {
                expected: "int",
                found: "string"
            })
        );
    }

    #[test]
    fn truthiness_follows_value_kind() {
        assert!(!Value::Undefined.truthy());
        assert!(!Value::int(0).truthy());
        assert!(Value::int(-3).truthy());
        assert!(!Value::from("").truthy());
        assert!(Value::object(5u8).truthy());
    }

    #[test]
    fn loose_equality_mixes_ints_and_bools() {
        assert!(Value::int(1).loose_eq(&Value::from(true)));
        assert!(!Value::int(2).loose_eq(&Value::from(true)));
        assert!(!Value::int(0).loose_eq(&Value::Undefined));
        assert_ne!(Value::int(1), Value::from(true), "strict equality keeps kinds apart");
    }

    #[test]
    fn objects_compare_by_identity() {
        let a = Value::object(vec![1u8]);
        let b = a.clone();
        assert_eq!(a, b);
        assert_ne!(a, Value::object(vec![1u8]));
        assert_eq!(a.downcast_ref::<Vec<u8>>(), Some(&vec![1u8]));
        assert!(a.downcast_ref::<u8>().is_none());
    }
}
