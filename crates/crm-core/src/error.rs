use thiserror::Error;

use crate::task::TaskStatus;

/// Failures raised by the in-memory
/// entity stores.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
  #[error("no record with id {id}")]
  NotFound {
    id: String
  },

  #[error(
    "task {id} cannot move from {from} \
     to {to}"
  )]
  InvalidTransition {
    id:   String,
    from: TaskStatus,
    to:   TaskStatus
  },

  #[error("duplicate record id {id}")]
  DuplicateId {
    id: String
  }
}

impl StoreError {
  pub fn is_not_found(&self) -> bool {
    matches!(self, Self::NotFound { .. })
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value: {value}")]
pub struct ParseValueError {
  pub kind:  &'static str,
  pub value: String
}

impl ParseValueError {
  pub fn new(
    kind: &'static str,
    value: &str
  ) -> Self {
    Self {
      kind,
      value: value.to_string()
    }
  }
}
