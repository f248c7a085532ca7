//! Injected user callbacks: semantic actions and predicates.
//!
//! Callbacks are stored inside the grammar node that uses them and invoked
//! synchronously by the engine. They must be `Send + Sync` so a frozen grammar can
//! be shared across threads; stateful callbacks use interior mutability.
//!
//! A callback that panics is treated like one that returned an error: the
//! panic is caught at the call and the match fails there with a callback
//! failure. The process panic hook still runs and reports it.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::errors::CallbackError;
use crate::value::Value;

pub type ActionFn = dyn Fn(&Value) -> Result<Value, CallbackError> + Send + Sync;
pub type PredicateFn = dyn Fn(&Value) -> Result<bool, CallbackError> + Send + Sync;

/// A semantic action: maps the inner parser's value to a new value.
#[derive(Clone)]
pub struct Action(Arc<ActionFn>);

impl Action {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, CallbackError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, value: &Value) -> Result<Value, CallbackError> {
        contained(|| (self.0)(value))
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Action(..)")
    }
}

/// A semantic predicate: accepts or rejects the inner parser's value.
#[derive(Clone)]
pub struct Predicate(Arc<PredicateFn>);

impl Predicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<bool, CallbackError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, value: &Value) -> Result<bool, CallbackError> {
        contained(|| (self.0)(value))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

fn contained<T>(call: impl FnOnce() -> Result<T, CallbackError>) -> Result<T, CallbackError> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        Err(CallbackError::new(format!(
            "callback panicked: {}",
            panic_message(payload.as_ref())
        )))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panics_become_callback_errors() {
        let action = Action::new(|_| panic!("boom"));
        let err = action.call(&Value::None).unwrap_err();
        assert_eq!(err.message, "callback panicked: boom");

        let predicate = Predicate::new(|v| panic!("bad {}", v.type_name()));
        let err = predicate.call(&Value::None).unwrap_err();
        assert_eq!(err.message, "callback panicked: bad None");
    }
}
