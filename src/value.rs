use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// An integer produced by a bit, byte or fixed-width integer parser.
///
/// The width records how many input bits the value was read from.
///
/// # Examples
///
/// ```rust
/// use bitpeg::value::Integer;
/// let i = Integer::Signed { value: -3, width: 4 };
/// assert_eq!(i.as_i128(), -3);
/// assert_eq!(i.as_u64(), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Integer {
    Signed { value: i64, width: u8 },
    Unsigned { value: u64, width: u8 },
}

impl Integer {
    /// The value widened to `i128`, losslessly for both signednesses.
    pub fn as_i128(&self) -> i128 {
        match *self {
            Integer::Signed { value, .. } => i128::from(value),
            Integer::Unsigned { value, .. } => i128::from(value),
        }
    }

    /// The value as `u64`, if it is non-negative.
    pub fn as_u64(&self) -> Option<u64> {
        u64::try_from(self.as_i128()).ok()
    }

    /// The value as `i64`, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        i64::try_from(self.as_i128()).ok()
    }

    pub fn width(&self) -> u8 {
        match *self {
            Integer::Signed { width, .. } | Integer::Unsigned { width, .. } => width,
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Integer::Signed { .. })
    }
}

/// An opaque value produced by a user action.
///
/// Equality is identity: two user values are equal only if they share the same
/// allocation.
#[derive(Clone)]
pub struct UserValue {
    inner: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl UserValue {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            inner: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Borrows the payload if it has type `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Name of the payload's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for UserValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserValue<{}>", self.type_name)
    }
}

impl PartialEq for UserValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// The semantic value attached to a successful match.
///
/// Sequences are reference-counted: cloning a value copies no subtree, so a
/// cached result and every parent built from it share the same elements.
///
/// # Examples
///
/// ```rust
/// use bitpeg::value::Value;
/// let v = Value::uint(0x41, 8);
/// assert_eq!(v.type_name(), "Integer");
/// assert_eq!(v.as_u64(), Some(0x41));
/// assert!(Value::default().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value, e.g. an `optional` that did not match.
    #[default]
    None,
    Bytes(Vec<u8>),
    Integer(Integer),
    Sequence(Arc<[Value]>),
    /// Produced by an action.
    User(UserValue),
    Bool(bool),
}

impl Value {
    pub fn uint(value: u64, width: u8) -> Self {
        Value::Integer(Integer::Unsigned { value, width })
    }

    pub fn sint(value: i64, width: u8) -> Self {
        Value::Integer(Integer::Signed { value, width })
    }

    /// Wraps an arbitrary payload as a user value.
    pub fn user<T: Any + Send + Sync>(value: T) -> Self {
        Value::User(UserValue::new(value))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "None",
            Value::Bytes(_) => "Bytes",
            Value::Integer(_) => "Integer",
            Value::Sequence(_) => "Sequence",
            Value::User(_) => "User",
            Value::Bool(_) => "Bool",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<Integer> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_integer().and_then(|i| i.as_u64())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_integer().and_then(|i| i.as_i64())
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(&**items),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrows the payload of a user value if it has type `T`.
    pub fn as_user<T: Any>(&self) -> Option<&T> {
        match self {
            Value::User(u) => u.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// The `index`th element of a sequence value.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.as_sequence().and_then(|items| items.get(index))
    }
}

impl From<Integer> for Value {
    fn from(i: Integer) -> Self {
        Value::Integer(i)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Sequence(items.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloned_sequences_share_their_elements() {
        let inner = Value::from(vec![Value::uint(1, 8), Value::uint(2, 8)]);
        let outer = Value::from(vec![inner.clone(), Value::Bool(true)]);
        let copy = outer.clone();

        let elements = |v: &Value| v.as_sequence().map(<[Value]>::as_ptr);
        assert_eq!(elements(&copy), elements(&outer));
        assert_eq!(elements(copy.get(0).unwrap()), elements(&inner));
    }
}
