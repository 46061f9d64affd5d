//! Client access rights on a vector.

use serde::{Deserialize, Serialize};

/// What clients may do with a vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

impl Permission {
    /// Whether clients may send new values.
    #[must_use]
    pub fn is_writable(self) -> bool {
        !matches!(self, Self::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_only_reject_writes_on_read_only() {
        assert!(!Permission::ReadOnly.is_writable());
        assert!(Permission::WriteOnly.is_writable());
        assert!(Permission::ReadWrite.is_writable());
    }
}
