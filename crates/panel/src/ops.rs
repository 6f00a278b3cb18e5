//! Per-operation status slots.
//!
//! Every async operation of a store owns one [`OpStatus`]. Slots are
//! independent: a failed delete never clears a successful list, and a
//! pending save does not block an unrelated load.

use std::fmt::Display;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OpStatus<T> {
    #[default]
    Idle,
    Pending,
    Success(T),
    Failure(String),
}

impl<T> OpStatus<T> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure(message) => Some(message),
            _ => None,
        }
    }

    pub fn start(&mut self) {
        *self = Self::Pending;
    }

    pub fn reset(&mut self) {
        *self = Self::Idle;
    }

    /// Record the outcome of the operation.
    pub fn settle<E: Display>(&mut self, result: &Result<T, E>)
    where
        T: Clone,
    {
        *self = match result {
            Ok(value) => Self::Success(value.clone()),
            Err(err) => Self::Failure(err.to_string()),
        };
    }
}
