//! Error taxonomy shared across the workspace.
//!
//! Every failure a client request can cause is recoverable at the device
//! level. Each layer defines its own typed errors and converts into
//! [`PropBusError`] via `#[from]`; IO-facing variants box the adapter error.

use crate::property::{PropertyKind, SwitchRule};

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type for the property bus.
#[derive(Debug, thiserror::Error)]
pub enum PropBusError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("property vector {0:?} is already registered")]
    DuplicateName(String),

    #[error("unknown property")]
    UnknownProperty(#[from] UnknownPropertyError),

    #[error("permission denied")]
    Permission(#[from] PermissionError),

    #[error("switch rule violated")]
    RuleViolation(#[from] RuleViolationError),

    #[error("malformed update request")]
    Malformed(#[from] MalformedRequestError),

    #[error("failed to read configuration")]
    ConfigRead(#[source] BoxedSource),

    #[error("failed to write configuration")]
    ConfigWrite(#[source] BoxedSource),

    #[error("transport error")]
    Transport(#[source] BoxedSource),
}

impl PropBusError {
    /// Whether the error only means "this request is not for me".
    ///
    /// Callers in a chain of handlers pass such requests on instead of
    /// reporting them.
    #[must_use]
    pub fn is_unknown_property(&self) -> bool {
        matches!(self, Self::UnknownProperty(_))
    }

    /// Whether the error must be reported to the requesting client only.
    #[must_use]
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            Self::Permission(_) | Self::Malformed(_) | Self::Validation(_)
        )
    }
}

/// Domain invariant violations raised while building the property model.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("vector {0:?} has no members")]
    NoMembers(String),

    #[error("member {member:?} is declared twice in vector {vector:?}")]
    DuplicateMember { vector: String, member: String },

    #[error("number {member:?} has an invalid range [{min}, {max}]")]
    InvertedRange { member: String, min: f64, max: f64 },

    #[error("number {member:?} initial value {value} is outside [{min}, {max}]")]
    OutOfRange {
        member: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("initial switches of {vector:?} break the {rule} rule")]
    InitialRule { vector: String, rule: SwitchRule },

    #[error("vector {0:?} is never persisted")]
    NotPersistable(String),

    #[error("device name {0:?} cannot be used as a file name")]
    InvalidDeviceName(String),
}

/// The request names a vector this device does not own.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("device {device:?} has no property vector {vector:?}")]
pub struct UnknownPropertyError {
    pub device: String,
    pub vector: String,
}

/// A client tried to write a read-only vector.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("property vector {vector:?} is read-only")]
pub struct PermissionError {
    pub vector: String,
}

/// The switch combination left by an update breaks the vector's rule.
///
/// The combination is kept as written and the vector is put in `Alert`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{vector:?} has {on} switches on, which breaks the {rule} rule")]
pub struct RuleViolationError {
    pub vector: String,
    pub rule: SwitchRule,
    pub on: usize,
}

/// The request does not fit the target vector's shape.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MalformedRequestError {
    #[error("vector {vector:?} has no member {member:?}")]
    UnknownMember { vector: String, member: String },

    #[error("member {member:?} of {vector:?} expects a {expected} value, got {got}")]
    KindMismatch {
        vector: String,
        member: String,
        expected: PropertyKind,
        got: PropertyKind,
    },

    #[error("request for {0:?} carries no values")]
    Empty(String),
}
