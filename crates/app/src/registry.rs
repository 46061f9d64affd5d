//! Property registry: the vectors owned by one device.
//!
//! Vectors are stored once, in registration order, with a name index.
//! Kind-filtered views are computed on demand. Visibility (defined or not)
//! is tracked separately from membership: hiding a vector never removes it.

use std::collections::{HashMap, HashSet};

use propbus_domain::error::{PropBusError, UnknownPropertyError};
use propbus_domain::property::{
    BlobVector, LightVector, NumberVector, PropertyVector, SwitchVector, TextVector,
};

/// Ordered, name-indexed collection of a device's vectors.
#[derive(Debug, Default)]
pub struct PropertyRegistry {
    device: String,
    vectors: Vec<PropertyVector>,
    index: HashMap<String, usize>,
    defined: HashSet<String>,
}

impl PropertyRegistry {
    #[must_use]
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Add a vector. It starts hidden.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::DuplicateName`] when a vector with the same
    /// name is already registered.
    pub fn register(&mut self, vector: impl Into<PropertyVector>) -> Result<(), PropBusError> {
        let vector = vector.into();
        if self.index.contains_key(vector.name()) {
            return Err(PropBusError::DuplicateName(vector.name().to_string()));
        }
        self.index
            .insert(vector.name().to_string(), self.vectors.len());
        self.vectors.push(vector);
        Ok(())
    }

    /// Find a vector by name. Absence is a normal outcome.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&PropertyVector> {
        self.index.get(name).map(|&i| &self.vectors[i])
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut PropertyVector> {
        self.index.get(name).map(|&i| &mut self.vectors[i])
    }

    /// Like [`lookup`](Self::lookup), but absence is an error.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] when `name` is not registered.
    pub fn require(&self, name: &str) -> Result<&PropertyVector, PropBusError> {
        self.lookup(name).ok_or_else(|| self.unknown(name))
    }

    /// Like [`lookup_mut`](Self::lookup_mut), but absence is an error.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] when `name` is not registered.
    pub fn require_mut(&mut self, name: &str) -> Result<&mut PropertyVector, PropBusError> {
        let err = self.unknown(name);
        self.lookup_mut(name).ok_or(err)
    }

    /// Shared access to a switch vector.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] when `name` is not a
    /// registered switch vector.
    pub fn switch(&self, name: &str) -> Result<&SwitchVector, PropBusError> {
        self.lookup(name)
            .and_then(PropertyVector::as_switch)
            .ok_or_else(|| self.unknown(name))
    }

    /// Shared access to a number vector.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] when `name` is not a
    /// registered number vector.
    pub fn number(&self, name: &str) -> Result<&NumberVector, PropBusError> {
        self.lookup(name)
            .and_then(PropertyVector::as_number)
            .ok_or_else(|| self.unknown(name))
    }

    /// Mutable access to a switch vector.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] when `name` is not a
    /// registered switch vector.
    pub fn switch_mut(&mut self, name: &str) -> Result<&mut SwitchVector, PropBusError> {
        let err = self.unknown(name);
        self.lookup_mut(name)
            .and_then(PropertyVector::as_switch_mut)
            .ok_or(err)
    }

    /// Mutable access to a number vector.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] when `name` is not a
    /// registered number vector.
    pub fn number_mut(&mut self, name: &str) -> Result<&mut NumberVector, PropBusError> {
        let err = self.unknown(name);
        self.lookup_mut(name)
            .and_then(PropertyVector::as_number_mut)
            .ok_or(err)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Make a vector visible. Returns whether visibility changed.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] when `name` is not registered.
    pub fn define(&mut self, name: &str) -> Result<bool, PropBusError> {
        if !self.contains(name) {
            return Err(self.unknown(name));
        }
        Ok(self.defined.insert(name.to_string()))
    }

    /// Hide a vector. Returns whether visibility changed; hiding an absent or
    /// hidden vector is a no-op.
    pub fn undefine(&mut self, name: &str) -> bool {
        self.defined.remove(name)
    }

    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.defined.contains(name)
    }

    /// Every vector, in registration order.
    pub fn enumerate(&self) -> impl Iterator<Item = &PropertyVector> {
        self.vectors.iter()
    }

    pub fn enumerate_mut(&mut self) -> impl Iterator<Item = &mut PropertyVector> {
        self.vectors.iter_mut()
    }

    /// Visible vectors, in registration order.
    pub fn defined(&self) -> impl Iterator<Item = &PropertyVector> {
        self.vectors
            .iter()
            .filter(|v| self.defined.contains(v.name()))
    }

    pub fn numbers(&self) -> impl Iterator<Item = &NumberVector> {
        self.vectors.iter().filter_map(PropertyVector::as_number)
    }

    pub fn switches(&self) -> impl Iterator<Item = &SwitchVector> {
        self.vectors.iter().filter_map(PropertyVector::as_switch)
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextVector> {
        self.vectors.iter().filter_map(PropertyVector::as_text)
    }

    pub fn lights(&self) -> impl Iterator<Item = &LightVector> {
        self.vectors.iter().filter_map(PropertyVector::as_light)
    }

    pub fn blobs(&self) -> impl Iterator<Item = &BlobVector> {
        self.vectors.iter().filter_map(PropertyVector::as_blob)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    fn unknown(&self, name: &str) -> PropBusError {
        UnknownPropertyError {
            device: self.device.clone(),
            vector: name.to_string(),
        }
        .into()
    }
}
