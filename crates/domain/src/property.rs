//! Property model: typed members grouped into named vectors.
//!
//! A [`PropertyVector`] is the unit of declaration, update and broadcast.
//! It owns an ordered list of same-kind members plus shared metadata
//! ([`VectorMeta`]): label, group, permission, state and timeout.

mod member;
mod permission;
mod state;
mod switch;
mod vector;

pub use member::{Blob, Light, Member, Number, NumberBuilder, Switch, Text};
pub use permission::Permission;
pub use state::PropertyState;
pub use switch::{SwitchRule, SwitchState};
pub use vector::{
    BlobVector, LightVector, NumberVector, PropertyVector, SwitchVector, TextVector, Vector,
    VectorMeta,
};

use serde::{Deserialize, Serialize};

/// Name of the reserved connection vector. Never persisted.
pub const CONNECTION: &str = "CONNECTION";

/// Kind tag shared by members, vectors and values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyKind {
    Number,
    Text,
    Switch,
    Light,
    Blob,
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number => f.write_str("number"),
            Self::Text => f.write_str("text"),
            Self::Switch => f.write_str("switch"),
            Self::Light => f.write_str("light"),
            Self::Blob => f.write_str("blob"),
        }
    }
}
