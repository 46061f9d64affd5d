//! Device driver: the update dispatcher and everything a device shares.
//!
//! [`DeviceDriver`] owns one device's [`PropertyRegistry`], its transport and
//! its persistence engine. Client requests enter through
//! [`apply_update`](DeviceDriver::apply_update):
//!
//! 1. requests for another device or an unregistered vector fail with
//!    `UnknownProperty` so the caller can pass them on
//! 2. the reserved vectors (`CONNECTION`, `DEBUG`, `SIMULATION`,
//!    `CONFIG_PROCESS`) go to their handlers
//! 3. everything else is merged, broadcast, and saved when flagged
//!    persist-on-update
//!
//! Device-specific drivers wrap a `DeviceDriver`, handle their own command
//! vectors first and delegate the rest.

use propbus_domain::config::ConfigDocument;
use propbus_domain::error::{PermissionError, PropBusError, UnknownPropertyError};
use propbus_domain::event::DriverEvent;
use propbus_domain::id::DeviceName;
use propbus_domain::property::{CONNECTION, PropertyState, PropertyVector, SwitchState};
use propbus_domain::update::UpdateRequest;

use crate::controls::aux::{
    self, CONFIG_PROCESS, ConfigAction, DEBUG, DISABLE, ENABLE, SIMULATION,
};
use crate::controls::connection::{CONNECT, ConnectionStatus, DISCONNECT, connection_vector};
use crate::ports::{ConfigSlot, ConfigStore, Transport};
use crate::registry::PropertyRegistry;
use crate::services::config_service::ConfigService;

/// Work left to the caller after an update was applied.
#[derive(Debug, Default, PartialEq)]
#[must_use]
pub struct UpdateOutcome {
    /// Stored values to re-dispatch through the caller's full handler chain.
    pub restore: Vec<UpdateRequest>,
}

/// Render an error with its source, for client-facing messages.
#[must_use]
pub fn describe_error(err: &PropBusError) -> String {
    match std::error::Error::source(err) {
        Some(source) => format!("{err}: {source}"),
        None => err.to_string(),
    }
}

/// Shared core of a device driver.
pub struct DeviceDriver<T, S> {
    registry: PropertyRegistry,
    transport: T,
    config: ConfigService<S>,
    debug: bool,
    simulation: bool,
}

impl<T, S> DeviceDriver<T, S>
where
    T: Transport,
    S: ConfigStore,
{
    /// Create a driver with its `CONNECTION` vector registered and visible.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::Validation`] if the connection vector cannot
    /// be built.
    pub fn new(
        device: &DeviceName,
        transport: T,
        config: ConfigService<S>,
    ) -> Result<Self, PropBusError> {
        let mut registry = PropertyRegistry::new(device.as_str());
        registry.register(connection_vector()?)?;
        registry.define(CONNECTION)?;
        Ok(Self {
            registry,
            transport,
            config,
            debug: false,
            simulation: false,
        })
    }

    #[must_use]
    pub fn device(&self) -> &str {
        self.registry.device()
    }

    #[must_use]
    pub fn registry(&self) -> &PropertyRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut PropertyRegistry {
        &mut self.registry
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Register a hidden vector.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::DuplicateName`] when the name is taken.
    pub fn register(&mut self, vector: impl Into<PropertyVector>) -> Result<(), PropBusError> {
        self.registry.register(vector)
    }

    /// Register `DEBUG`, or adopt an existing one and read its flag.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::DuplicateName`] when a non-switch vector
    /// already uses the name.
    pub fn add_debug_control(&mut self) -> Result<(), PropBusError> {
        if let Some(vector) = self.registry.lookup(DEBUG).and_then(PropertyVector::as_switch) {
            self.debug = aux::is_enabled(vector);
            return Ok(());
        }
        self.registry.register(aux::debug_vector()?)?;
        self.registry.define(DEBUG)?;
        Ok(())
    }

    /// Register `SIMULATION`, or adopt an existing one and read its flag.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::DuplicateName`] when a non-switch vector
    /// already uses the name.
    pub fn add_simulation_control(&mut self) -> Result<(), PropBusError> {
        if let Some(vector) = self
            .registry
            .lookup(SIMULATION)
            .and_then(PropertyVector::as_switch)
        {
            self.simulation = aux::is_enabled(vector);
            return Ok(());
        }
        self.registry.register(aux::simulation_vector()?)?;
        self.registry.define(SIMULATION)?;
        Ok(())
    }

    /// Register `CONFIG_PROCESS` unless already present.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::Validation`] if the vector cannot be built.
    pub fn add_configuration_control(&mut self) -> Result<(), PropBusError> {
        if self.registry.contains(CONFIG_PROCESS) {
            return Ok(());
        }
        self.registry.register(aux::config_process_vector()?)?;
        self.registry.define(CONFIG_PROCESS)?;
        Ok(())
    }

    /// Register the three auxiliary controls.
    ///
    /// # Errors
    ///
    /// See the individual `add_*_control` methods.
    pub fn add_aux_controls(&mut self) -> Result<(), PropBusError> {
        self.add_debug_control()?;
        self.add_simulation_control()?;
        self.add_configuration_control()
    }

    #[must_use]
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    #[must_use]
    pub fn is_simulation(&self) -> bool {
        self.simulation
    }

    /// Make a vector visible and announce it. No-op when already visible.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] for unregistered vectors, or
    /// a transport error.
    pub async fn define(&mut self, name: &str, message: Option<&str>) -> Result<(), PropBusError> {
        if !self.registry.define(name)? {
            return Ok(());
        }
        let snapshot = self.registry.require(name)?.clone();
        self.send(DriverEvent::define(
            self.device(),
            snapshot,
            message.map(str::to_string),
        ))
        .await
    }

    /// Hide a vector and announce it. No-op when already hidden or absent.
    ///
    /// # Errors
    ///
    /// Returns a transport error.
    pub async fn undefine(&mut self, name: &str, message: Option<&str>) -> Result<(), PropBusError> {
        if !self.registry.undefine(name) {
            return Ok(());
        }
        self.send(DriverEvent::delete(
            self.device(),
            name,
            message.map(str::to_string),
        ))
        .await
    }

    /// Announce every visible vector, in registration order.
    ///
    /// # Errors
    ///
    /// Returns a transport error.
    pub async fn get_properties(&self) -> Result<(), PropBusError> {
        for vector in self.registry.defined() {
            self.send(DriverEvent::define(self.device(), vector.clone(), None))
                .await?;
        }
        Ok(())
    }

    /// Broadcast the current snapshot of a vector. Hidden vectors stay quiet.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] for unregistered vectors, or
    /// a transport error.
    pub async fn publish(&self, name: &str, message: Option<&str>) -> Result<(), PropBusError> {
        let vector = self.registry.require(name)?;
        if !self.registry.is_defined(name) {
            tracing::trace!(device = self.device(), vector = name, "hidden, not broadcast");
            return Ok(());
        }
        let event = DriverEvent::update(self.device(), vector.clone(), message.map(str::to_string));
        self.send(event).await
    }

    /// Set a vector's state and broadcast it.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] for unregistered vectors, or
    /// a transport error.
    pub async fn set_state(
        &mut self,
        name: &str,
        state: PropertyState,
        message: Option<&str>,
    ) -> Result<(), PropBusError> {
        self.registry.require_mut(name)?.set_state(state);
        self.publish(name, message).await
    }

    /// Send a free-form device message.
    ///
    /// # Errors
    ///
    /// Returns a transport error.
    pub async fn message(&self, text: &str) -> Result<(), PropBusError> {
        self.send(DriverEvent::message(self.device(), text)).await
    }

    /// Log a diagnostic, and forward it to clients while debug is enabled.
    ///
    /// # Errors
    ///
    /// Returns a transport error.
    pub async fn debug_message(&self, text: &str) -> Result<(), PropBusError> {
        tracing::debug!(device = self.device(), "{text}");
        if self.debug {
            self.message(text).await?;
        }
        Ok(())
    }

    /// Put every vector back to `Idle` and re-broadcast the visible ones.
    ///
    /// # Errors
    ///
    /// Returns a transport error.
    pub async fn reset_properties(&mut self) -> Result<(), PropBusError> {
        for vector in self.registry.enumerate_mut() {
            vector.set_state(PropertyState::Idle);
        }
        for vector in self.registry.defined() {
            self.send(DriverEvent::update(self.device(), vector.clone(), None))
                .await?;
        }
        Ok(())
    }

    /// Derive the connection status from `CONNECTION`.
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.registry
            .lookup(CONNECTION)
            .and_then(PropertyVector::as_switch)
            .map_or(ConnectionStatus::Disconnected, ConnectionStatus::of)
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection_status() == ConnectionStatus::Connected
    }

    /// The only mutator of `CONNECTION`: select one member, set the state and
    /// broadcast with an optional message.
    ///
    /// # Errors
    ///
    /// Returns a transport error.
    #[tracing::instrument(skip(self), fields(device = %self.registry.device()))]
    pub async fn set_connected(
        &mut self,
        connected: bool,
        state: PropertyState,
        message: Option<&str>,
    ) -> Result<(), PropBusError> {
        let vector = self.registry.switch_mut(CONNECTION)?;
        vector.reset();
        vector.set(if connected { CONNECT } else { DISCONNECT }, SwitchState::On);
        vector.meta.state = state;
        tracing::info!(status = %ConnectionStatus::of(vector), "connection changed");
        self.publish(CONNECTION, message).await
    }

    /// Enable or disable debug. Re-setting the current value still
    /// re-confirms `Ok` and broadcasts.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] when `DEBUG` is not
    /// registered, or a transport error.
    pub async fn set_debug_state(&mut self, enabled: bool) -> Result<(), PropBusError> {
        let changed = self.debug != enabled;
        self.set_toggle(DEBUG, "Debug", enabled, changed).await?;
        self.debug = enabled;
        Ok(())
    }

    /// Enable or disable simulation, with the same idempotence as
    /// [`set_debug_state`](Self::set_debug_state).
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] when `SIMULATION` is not
    /// registered, or a transport error.
    pub async fn set_simulation_state(&mut self, enabled: bool) -> Result<(), PropBusError> {
        let changed = self.simulation != enabled;
        self.set_toggle(SIMULATION, "Simulation", enabled, changed)
            .await?;
        self.simulation = enabled;
        Ok(())
    }

    async fn set_toggle(
        &mut self,
        name: &str,
        label: &str,
        enabled: bool,
        changed: bool,
    ) -> Result<(), PropBusError> {
        let vector = self.registry.switch_mut(name)?;
        if changed {
            vector.reset();
            vector.set(if enabled { ENABLE } else { DISABLE }, SwitchState::On);
        }
        vector.meta.state = PropertyState::Ok;
        if changed {
            let verb = if enabled { "enabled" } else { "disabled" };
            self.message(&format!("{label} is {verb}.")).await?;
        }
        self.publish(name, None).await
    }

    /// Apply a request and report client faults back to the requester.
    ///
    /// # Errors
    ///
    /// - [`PropBusError::UnknownProperty`] when the request is not for this
    ///   device; pass it on
    /// - [`PropBusError::Permission`] or [`PropBusError::Malformed`] after a
    ///   `Rejected` event went to the requesting client
    /// - [`PropBusError::RuleViolation`] after the vector was broadcast in
    ///   `Alert`
    #[tracing::instrument(skip(self, request), fields(device = %request.device, vector = %request.vector))]
    pub async fn apply_update(&mut self, request: &UpdateRequest) -> Result<UpdateOutcome, PropBusError> {
        let result = self.dispatch(request).await;
        if let Err(err) = &result {
            self.report_rejection(request, err).await?;
        }
        result
    }

    /// Send a `Rejected` event to the requester when `err` is its fault.
    ///
    /// # Errors
    ///
    /// Returns a transport error.
    pub async fn report_rejection(
        &self,
        request: &UpdateRequest,
        err: &PropBusError,
    ) -> Result<(), PropBusError> {
        if !err.is_client_fault() {
            return Ok(());
        }
        let reason = describe_error(err);
        tracing::warn!(device = self.device(), vector = %request.vector, %reason, "update rejected");
        if let Some(client) = request.origin.client() {
            self.send(DriverEvent::rejected(
                self.device(),
                client,
                request.vector.as_str(),
                reason,
            ))
            .await?;
        }
        Ok(())
    }

    async fn dispatch(&mut self, request: &UpdateRequest) -> Result<UpdateOutcome, PropBusError> {
        self.accept(request)?;
        match request.vector.as_str() {
            CONNECTION => self.handle_connection(request).await,
            DEBUG => {
                self.merge_update(request).await?;
                let enabled = aux::is_enabled(self.registry.switch(DEBUG)?);
                self.set_debug_state(enabled).await?;
                Ok(UpdateOutcome::default())
            }
            SIMULATION => {
                self.merge_update(request).await?;
                let enabled = aux::is_enabled(self.registry.switch(SIMULATION)?);
                self.set_simulation_state(enabled).await?;
                Ok(UpdateOutcome::default())
            }
            CONFIG_PROCESS => self.handle_config_process(request).await,
            _ => {
                self.apply_generic(request).await?;
                Ok(UpdateOutcome::default())
            }
        }
    }

    /// Check that a request targets a registered vector of this device.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] otherwise.
    pub fn accept(&self, request: &UpdateRequest) -> Result<(), PropBusError> {
        if request.device != self.device() || !self.registry.contains(&request.vector) {
            return Err(UnknownPropertyError {
                device: request.device.clone(),
                vector: request.vector.clone(),
            }
            .into());
        }
        Ok(())
    }

    /// Check permission and merge the values without broadcasting, except
    /// when a switch rule breaks: the vector then goes out in `Alert`.
    ///
    /// Config-origin requests skip the permission check.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::Permission`], [`PropBusError::Malformed`] or
    /// [`PropBusError::RuleViolation`].
    pub async fn merge_update(&mut self, request: &UpdateRequest) -> Result<(), PropBusError> {
        match self.merge_values(request) {
            Err(PropBusError::RuleViolation(err)) => {
                let text = err.to_string();
                self.publish(&request.vector, Some(&text)).await?;
                Err(err.into())
            }
            other => other,
        }
    }

    /// Permission check and member merge, without broadcasting.
    fn merge_values(&mut self, request: &UpdateRequest) -> Result<(), PropBusError> {
        let vector = self.registry.require_mut(&request.vector)?;
        if !request.is_from_config() && !vector.permission().is_writable() {
            return Err(PermissionError {
                vector: request.vector.clone(),
            }
            .into());
        }
        vector.apply(&request.values)
    }

    /// Merge, broadcast, then save when the vector is persist-on-update.
    ///
    /// # Errors
    ///
    /// See [`merge_update`](Self::merge_update). Save failures are logged
    /// only.
    pub async fn apply_generic(&mut self, request: &UpdateRequest) -> Result<(), PropBusError> {
        self.merge_update(request).await?;
        self.publish(&request.vector, None).await?;
        self.persist_on_update(request).await;
        Ok(())
    }

    /// Save the request's vector when it is flagged persist-on-update and
    /// the request came from a client.
    pub async fn persist_on_update(&self, request: &UpdateRequest) {
        if request.is_from_config() {
            return;
        }
        let Some(vector) = self.registry.lookup(&request.vector) else {
            return;
        };
        if !vector.meta().persist_on_update {
            return;
        }
        if let Err(err) = self.config.save_one(self.device(), vector).await {
            tracing::warn!(%err, device = self.device(), vector = %request.vector, "failed to persist vector");
        }
    }

    async fn handle_connection(&mut self, request: &UpdateRequest) -> Result<UpdateOutcome, PropBusError> {
        self.merge_update(request).await?;
        let connect = self
            .registry
            .switch(CONNECTION)?
            .state_of(CONNECT)
            .is_some_and(SwitchState::is_on);
        if connect {
            self.set_connected(true, PropertyState::Ok, None).await?;
        } else {
            self.set_connected(false, PropertyState::Idle, None).await?;
        }
        Ok(UpdateOutcome::default())
    }

    async fn handle_config_process(
        &mut self,
        request: &UpdateRequest,
    ) -> Result<UpdateOutcome, PropBusError> {
        // momentary: the pressed switches are released even when the press is refused
        if let Err(err) = self.merge_values(request) {
            if let PropBusError::RuleViolation(violation) = &err {
                let text = violation.to_string();
                let vector = self.registry.switch_mut(CONFIG_PROCESS)?;
                vector.reset();
                vector.meta.state = PropertyState::Alert;
                self.publish(CONFIG_PROCESS, Some(&text)).await?;
            }
            return Err(err);
        }
        let vector = self.registry.switch_mut(CONFIG_PROCESS)?;
        let action = vector.on_index().and_then(ConfigAction::from_index);
        vector.reset();

        // restoring CONFIG_PROCESS from the store never runs a command
        let Some(action) = action.filter(|_| !request.is_from_config()) else {
            vector.meta.state = PropertyState::Idle;
            self.publish(CONFIG_PROCESS, None).await?;
            return Ok(UpdateOutcome::default());
        };

        let (state, restore) = match action {
            ConfigAction::Load => match self.load_config(None).await {
                Ok(restore) => (PropertyState::Ok, restore),
                Err(_) => (PropertyState::Alert, Vec::new()),
            },
            ConfigAction::Save => match self.save_config(None).await {
                Ok(()) => (PropertyState::Ok, Vec::new()),
                Err(_) => (PropertyState::Alert, Vec::new()),
            },
            ConfigAction::Default => match self.load_default_config().await {
                Ok(restore) => (PropertyState::Ok, restore),
                Err(_) => (PropertyState::Alert, Vec::new()),
            },
        };
        self.set_state(CONFIG_PROCESS, state, None).await?;
        Ok(UpdateOutcome { restore })
    }

    /// Save one vector (merged into the stored document) or every vector.
    ///
    /// A full save reports its outcome to clients as a device message.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`], [`PropBusError::Validation`]
    /// for vectors that are never saved, or a config store error.
    #[tracing::instrument(skip(self), fields(device = %self.registry.device()))]
    pub async fn save_config(&self, name: Option<&str>) -> Result<(), PropBusError> {
        if let Some(name) = name {
            let vector = self.registry.require(name)?;
            return self.config.save_one(self.device(), vector).await;
        }
        match self.config.save_all(&self.registry).await {
            Ok(_) => self.message("Configuration successfully saved.").await,
            Err(err) => {
                tracing::warn!(%err, "failed to save configuration");
                self.message(&format!("Error saving configuration. {}", describe_error(&err)))
                    .await?;
                Err(err)
            }
        }
    }

    /// Read stored values for one vector or all of them.
    ///
    /// Returns config-origin requests for the registered vectors found in
    /// the store, in stored order; the caller dispatches them through its
    /// own handler chain (see [`restore`](Self::restore)). Vectors absent
    /// from the store keep their values.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::ConfigRead`] when nothing is stored or the
    /// document is malformed.
    #[tracing::instrument(skip(self), fields(device = %self.registry.device()))]
    pub async fn load_config(&self, name: Option<&str>) -> Result<Vec<UpdateRequest>, PropBusError> {
        let document = match self.config.load(self.device(), ConfigSlot::Primary).await {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(%err, "failed to load configuration");
                return Err(err);
            }
        };
        let requests = self.restoration(&document, name);
        if name.is_none() {
            self.message("Configuration successfully loaded.").await?;
        }
        Ok(requests)
    }

    /// Read the fallback copy, as [`load_config`](Self::load_config) does.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::ConfigRead`] when no fallback copy exists or
    /// it is malformed.
    #[tracing::instrument(skip(self), fields(device = %self.registry.device()))]
    pub async fn load_default_config(&self) -> Result<Vec<UpdateRequest>, PropBusError> {
        match self.config.load(self.device(), ConfigSlot::Default).await {
            Ok(document) => {
                self.message("Default configuration loaded.").await?;
                Ok(self.restoration(&document, None))
            }
            Err(err) => {
                tracing::warn!(%err, "failed to load default configuration");
                self.message(&format!(
                    "Error loading default configuration. {}",
                    describe_error(&err)
                ))
                .await?;
                Err(err)
            }
        }
    }

    fn restoration(&self, document: &ConfigDocument, name: Option<&str>) -> Vec<UpdateRequest> {
        document
            .vectors
            .iter()
            .filter(|stored| name.is_none_or(|name| stored.name() == name))
            .filter(|stored| {
                let known = self.registry.contains(stored.name());
                if !known {
                    tracing::debug!(vector = stored.name(), "stored vector not registered, skipped");
                }
                known
            })
            .map(|stored| stored.to_request(self.device()))
            .collect()
    }

    /// Apply config-origin requests through this driver. Failures are
    /// logged and skipped. Returns how many were applied.
    pub async fn restore(&mut self, requests: Vec<UpdateRequest>) -> usize {
        let mut applied = 0;
        for request in requests {
            match self.apply_update(&request).await {
                Ok(_) => applied += 1,
                Err(err) => {
                    tracing::warn!(%err, vector = %request.vector, "stored values not restored");
                }
            }
        }
        applied
    }

    /// Apply a request, then any restoration it asked for.
    ///
    /// # Errors
    ///
    /// See [`apply_update`](Self::apply_update).
    pub async fn handle(&mut self, request: &UpdateRequest) -> Result<(), PropBusError> {
        let outcome = self.apply_update(request).await?;
        self.restore(outcome.restore).await;
        Ok(())
    }

    async fn send(&self, event: DriverEvent) -> Result<(), PropBusError> {
        self.transport.send(event).await
    }
}
