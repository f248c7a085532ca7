//! Ready-made semantic actions.
//!
//! Each function returns a closure suitable for
//! [`GrammarBuilder::action`](crate::grammar::GrammarBuilder::action).
//!
//! # Examples
//!
//! ```rust
//! use bitpeg::{actions, GrammarBuilder};
//!
//! let mut g = GrammarBuilder::new();
//! let open = g.ch(b'(');
//! let digit = g.ch_range(b'0', b'9').unwrap();
//! let close = g.ch(b')');
//! let seq = g.sequence(&[open, digit, close]).unwrap();
//! let inner = g.action(seq, actions::index(1)).unwrap();
//! let grammar = g.finish().unwrap();
//!
//! let result = grammar.parse(inner, b"(7)").unwrap();
//! assert_eq!(result.value().and_then(|v| v.as_u64()), Some(u64::from(b'7')));
//! ```

use crate::errors::CallbackError;
use crate::value::Value;

/// Replaces any value with `Value::None`.
pub fn ignore() -> impl Fn(&Value) -> Result<Value, CallbackError> + Send + Sync + 'static {
    |_| Ok(Value::None)
}

/// Picks the `index`th element of a sequence value.
pub fn index(index: usize) -> impl Fn(&Value) -> Result<Value, CallbackError> + Send + Sync + 'static {
    move |value| {
        value.get(index).cloned().ok_or_else(|| {
            CallbackError::new(format!(
                "no element {} in {} value",
                index,
                value.type_name()
            ))
        })
    }
}

/// Picks the first element of a sequence value.
pub fn first() -> impl Fn(&Value) -> Result<Value, CallbackError> + Send + Sync + 'static {
    index(0)
}

/// Flattens nested sequences into a single sequence of leaves.
pub fn flatten() -> impl Fn(&Value) -> Result<Value, CallbackError> + Send + Sync + 'static {
    |value| {
        let mut out = Vec::new();
        flatten_into(value, &mut out);
        Ok(Value::from(out))
    }
}

fn flatten_into(value: &Value, out: &mut Vec<Value>) {
    match value {
        Value::Sequence(items) => items.iter().for_each(|item| flatten_into(item, out)),
        other => out.push(other.clone()),
    }
}

/// Collects byte-sized integers (and byte strings) into a single `Bytes` value.
pub fn to_bytes() -> impl Fn(&Value) -> Result<Value, CallbackError> + Send + Sync + 'static {
    |value| {
        let mut out = Vec::new();
        collect_bytes(value, &mut out)?;
        Ok(Value::Bytes(out))
    }
}

fn collect_bytes(value: &Value, out: &mut Vec<u8>) -> Result<(), CallbackError> {
    match value {
        Value::None => Ok(()),
        Value::Bytes(b) => {
            out.extend_from_slice(b);
            Ok(())
        }
        Value::Integer(i) => {
            let byte = i
                .as_u64()
                .and_then(|v| u8::try_from(v).ok())
                .ok_or_else(|| CallbackError::new(format!("{} is not a byte", i.as_i128())))?;
            out.push(byte);
            Ok(())
        }
        Value::Sequence(items) => items.iter().try_for_each(|item| collect_bytes(item, out)),
        other => Err(CallbackError::new(format!(
            "cannot convert {} value to bytes",
            other.type_name()
        ))),
    }
}
