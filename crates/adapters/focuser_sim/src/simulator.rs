//! The focuser device driver.
//!
//! Motion is never a blocking sleep: a command records a [`PendingMotion`]
//! with a deadline and returns. [`FocuserSimulator::run`] waits on either the
//! next client command or that deadline, so an abort or a newer motion
//! command can replace the pending one before it completes.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use propbus_app::controls::connection::CONNECT;
use propbus_app::ports::{ConfigStore, Transport};
use propbus_app::services::config_service::ConfigService;
use propbus_app::services::driver::{DeviceDriver, UpdateOutcome};
use propbus_domain::error::{MalformedRequestError, PropBusError};
use propbus_domain::id::DeviceName;
use propbus_domain::property::{CONNECTION, PropertyState, SwitchState};
use propbus_domain::update::UpdateRequest;

use crate::mode::{Capabilities, Mode, mode_vector};
use crate::physics::Optics;
use crate::properties::{
    ABS_FOCUS_POSITION, CONNECTED_VECTORS, DELAY, DELAY_VALUE, FOCUS_ABORT_MOTION,
    FOCUS_ABSOLUTE_POSITION, FOCUS_INWARD, FOCUS_MOTION, FOCUS_RELATIVE_POSITION, FOCUS_SPEED,
    FOCUS_SPEED_VALUE, FOCUS_TIMER, FOCUS_TIMER_VALUE, FWHM, INITIAL_FWHM, INITIAL_SEEING, MODE,
    POSITION_MAX, POSITION_MIN, REL_FOCUS_POSITION, SEEING_SETTINGS, SIM_FWHM, SIM_SEEING,
    focuser_vectors,
};

const OUT_OF_TRAVEL: &str = "Cannot move focuser in this direction any further.";
const MAX_DELAY: Duration = Duration::from_secs(3600);

/// A request addressed to the simulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Announce every visible vector.
    GetProperties,
    /// Apply new member values.
    Update(UpdateRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MotionCommand {
    Timer,
    Relative,
    Absolute,
}

impl MotionCommand {
    fn of(vector: &str) -> Option<Self> {
        match vector {
            FOCUS_TIMER => Some(Self::Timer),
            REL_FOCUS_POSITION => Some(Self::Relative),
            ABS_FOCUS_POSITION => Some(Self::Absolute),
            _ => None,
        }
    }

    fn vector(self) -> &'static str {
        match self {
            Self::Timer => FOCUS_TIMER,
            Self::Relative => REL_FOCUS_POSITION,
            Self::Absolute => ABS_FOCUS_POSITION,
        }
    }

    fn member(self) -> &'static str {
        match self {
            Self::Timer => FOCUS_TIMER_VALUE,
            Self::Relative => FOCUS_RELATIVE_POSITION,
            Self::Absolute => FOCUS_ABSOLUTE_POSITION,
        }
    }

    fn allowed(self, capabilities: Capabilities) -> bool {
        match self {
            Self::Timer => capabilities.variable_speed,
            Self::Relative => capabilities.relative,
            Self::Absolute => capabilities.absolute,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Timer => "Timed",
            Self::Relative => "Relative",
            Self::Absolute => "Absolute",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Motion {
    Absolute { target: f64, relative: bool },
    Timer { internal: f64 },
}

impl Motion {
    /// Vectors kept `Busy` while the motion runs.
    fn vectors(self) -> &'static [&'static str] {
        match self {
            Self::Absolute {
                relative: false, ..
            } => &[ABS_FOCUS_POSITION],
            Self::Absolute { relative: true, .. } => &[REL_FOCUS_POSITION, ABS_FOCUS_POSITION],
            Self::Timer { .. } => &[FOCUS_TIMER],
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingMotion {
    deadline: Instant,
    motion: Motion,
}

fn micros(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0) / 1_000_000.0).map_or(MAX_DELAY, |d| d.min(MAX_DELAY))
}

/// Simulated focuser with absolute, relative and timed motion.
pub struct FocuserSimulator<T, S> {
    driver: DeviceDriver<T, S>,
    optics: Optics,
    capabilities: Capabilities,
    internal_ticks: f64,
    pending: Option<PendingMotion>,
}

impl<T, S> FocuserSimulator<T, S>
where
    T: Transport,
    S: ConfigStore,
{
    /// Declare every vector. Only `CONNECTION`, the auxiliary controls and
    /// `Mode` start visible.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::Validation`] or
    /// [`PropBusError::DuplicateName`] if the declarations are inconsistent.
    pub fn new(
        device: &DeviceName,
        transport: T,
        config: ConfigService<S>,
    ) -> Result<Self, PropBusError> {
        let mut driver = DeviceDriver::new(device, transport, config)?;
        driver.add_aux_controls()?;
        driver.register(mode_vector()?)?;
        driver.registry_mut().define(MODE)?;
        for vector in focuser_vectors()? {
            driver.register(vector)?;
        }
        Ok(Self {
            driver,
            optics: Optics::new(POSITION_MIN, POSITION_MAX, INITIAL_FWHM, INITIAL_SEEING),
            capabilities: Mode::All.capabilities(),
            internal_ticks: POSITION_MAX / 2.0,
            pending: None,
        })
    }

    #[must_use]
    pub fn device(&self) -> &str {
        self.driver.device()
    }

    #[must_use]
    pub fn driver(&self) -> &DeviceDriver<T, S> {
        &self.driver
    }

    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    #[must_use]
    pub fn is_moving(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending motion completes, if any.
    #[must_use]
    pub fn pending_deadline(&self) -> Option<Instant> {
        self.pending.map(|pending| pending.deadline)
    }

    /// Current absolute position.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] if the position vector is
    /// missing.
    pub fn position(&self) -> Result<f64, PropBusError> {
        self.number(ABS_FOCUS_POSITION, FOCUS_ABSOLUTE_POSITION)
    }

    /// Current simulated FWHM.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::UnknownProperty`] if the FWHM vector is
    /// missing.
    pub fn fwhm(&self) -> Result<f64, PropBusError> {
        self.number(FWHM, SIM_FWHM)
    }

    fn number(&self, vector: &str, member: &str) -> Result<f64, PropBusError> {
        let numbers = self.driver.registry().number(vector)?;
        numbers.value(member).ok_or_else(|| {
            MalformedRequestError::UnknownMember {
                vector: vector.to_string(),
                member: member.to_string(),
            }
            .into()
        })
    }

    fn set_number(&mut self, vector: &str, member: &str, value: f64) -> Result<(), PropBusError> {
        self.driver
            .registry_mut()
            .number_mut(vector)?
            .set_value(member, value);
        Ok(())
    }

    fn mode(&self) -> Result<Option<Mode>, PropBusError> {
        Ok(Mode::of(self.driver.registry().switch(MODE)?))
    }

    fn moving_inward(&self) -> Result<bool, PropBusError> {
        Ok(self
            .driver
            .registry()
            .switch(FOCUS_MOTION)?
            .state_of(FOCUS_INWARD)
            .is_some_and(SwitchState::is_on))
    }

    /// Announce the visible vectors, then restore the saved `Mode`.
    ///
    /// # Errors
    ///
    /// Returns a transport error.
    pub async fn get_properties(&mut self) -> Result<(), PropBusError> {
        self.driver.get_properties().await?;
        if let Ok(requests) = self.driver.load_config(Some(MODE)).await {
            self.restore(requests).await?;
        }
        Ok(())
    }

    /// Restore every stored vector through the focuser handlers.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::ConfigRead`] when nothing is stored, or a
    /// transport error.
    pub async fn load_config(&mut self) -> Result<usize, PropBusError> {
        let requests = self.driver.load_config(None).await?;
        self.restore(requests).await
    }

    async fn restore(&mut self, requests: Vec<UpdateRequest>) -> Result<usize, PropBusError> {
        let mut applied = 0;
        for request in requests {
            match self.dispatch(&request).await {
                Ok(_) => applied += 1,
                Err(err @ PropBusError::Transport(_)) => return Err(err),
                Err(err) => {
                    tracing::warn!(%err, vector = %request.vector, "stored values not restored");
                }
            }
        }
        Ok(applied)
    }

    /// Apply a request, then whatever restoration it triggered.
    ///
    /// # Errors
    ///
    /// See [`DeviceDriver::apply_update`].
    #[tracing::instrument(skip(self, request), fields(device = %request.device, vector = %request.vector))]
    pub async fn handle(&mut self, request: &UpdateRequest) -> Result<(), PropBusError> {
        let outcome = self.dispatch(request).await?;
        self.restore(outcome.restore).await?;
        Ok(())
    }

    async fn dispatch(&mut self, request: &UpdateRequest) -> Result<UpdateOutcome, PropBusError> {
        let result = if let Some(command) = MotionCommand::of(&request.vector) {
            self.handle_motion(command, request).await
        } else {
            match request.vector.as_str() {
                MODE => self.handle_mode(request).await,
                CONNECTION => self.handle_connection(request).await,
                FOCUS_ABORT_MOTION => self.handle_abort(request).await,
                _ => return self.driver.apply_update(request).await,
            }
        };
        if let Err(err) = &result {
            self.driver.report_rejection(request, err).await?;
        }
        result.map(|()| UpdateOutcome::default())
    }

    async fn handle_mode(&mut self, request: &UpdateRequest) -> Result<(), PropBusError> {
        self.driver.accept(request)?;
        self.driver.merge_update(request).await?;
        match self.mode()? {
            Some(mode) => {
                self.capabilities = mode.capabilities();
                tracing::info!(device = self.device(), mode = mode.member(), "mode changed");
                self.driver.set_state(MODE, PropertyState::Ok, None).await
            }
            None => {
                self.driver
                    .set_state(MODE, PropertyState::Alert, Some("Unknown mode."))
                    .await
            }
        }
    }

    async fn handle_connection(&mut self, request: &UpdateRequest) -> Result<(), PropBusError> {
        self.driver.accept(request)?;
        self.driver.merge_update(request).await?;
        let connect = self
            .driver
            .registry()
            .switch(CONNECTION)?
            .state_of(CONNECT)
            .is_some_and(SwitchState::is_on);
        if connect {
            self.connect().await
        } else {
            self.disconnect().await
        }
    }

    async fn connect(&mut self) -> Result<(), PropBusError> {
        let message = format!("{} is online.", self.device());
        self.driver
            .set_connected(true, PropertyState::Ok, Some(&message))
            .await?;
        for name in CONNECTED_VECTORS {
            self.driver.define(name, None).await?;
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), PropBusError> {
        self.cancel_motion().await?;
        let message = format!("{} is offline.", self.device());
        self.driver
            .set_connected(false, PropertyState::Idle, Some(&message))
            .await?;
        for name in CONNECTED_VECTORS.iter().rev() {
            self.driver.undefine(name, None).await?;
        }
        Ok(())
    }

    async fn handle_motion(
        &mut self,
        command: MotionCommand,
        request: &UpdateRequest,
    ) -> Result<(), PropBusError> {
        self.driver.accept(request)?;
        if request.is_from_config() {
            tracing::debug!(vector = %request.vector, "motion commands are not restored");
            return Ok(());
        }
        let vector = command.vector();
        self.driver
            .registry()
            .require(vector)?
            .check_values(&request.values)?;
        let value = request
            .number_value(command.member())
            .ok_or_else(|| MalformedRequestError::Empty(vector.to_string()))?;

        if !self.driver.is_connected() {
            return self
                .driver
                .set_state(vector, PropertyState::Alert, Some("Focuser is not connected."))
                .await;
        }
        if !command.allowed(self.capabilities) {
            let message = format!("{} motion is not available in the current mode.", command.label());
            return self
                .driver
                .set_state(vector, PropertyState::Alert, Some(&message))
                .await;
        }

        if self.cancel_motion().await? {
            tracing::debug!(device = self.device(), "pending motion superseded");
        }
        match command {
            MotionCommand::Timer => self.start_timer(request, value).await,
            MotionCommand::Relative => self.start_relative(request, value).await,
            MotionCommand::Absolute => {
                if !(POSITION_MIN..=POSITION_MAX).contains(&value) {
                    let message = format!(
                        "Requested position out of bounds. Focus range is {POSITION_MIN} to {POSITION_MAX}."
                    );
                    return self
                        .driver
                        .set_state(vector, PropertyState::Alert, Some(&message))
                        .await;
                }
                self.start_absolute(value, false).await
            }
        }
    }

    async fn start_absolute(&mut self, target: f64, relative: bool) -> Result<(), PropBusError> {
        let current = self.position()?;
        let delay = micros((target - current).abs() * self.number(DELAY, DELAY_VALUE)?);
        self.driver
            .set_state(ABS_FOCUS_POSITION, PropertyState::Busy, None)
            .await?;
        self.driver
            .debug_message(&format!("Moving to {target} in {} ms.", delay.as_millis()))
            .await?;
        self.pending = Some(PendingMotion {
            deadline: Instant::now() + delay,
            motion: Motion::Absolute { target, relative },
        });
        Ok(())
    }

    async fn start_relative(&mut self, request: &UpdateRequest, ticks: f64) -> Result<(), PropBusError> {
        self.driver.merge_update(request).await?;
        let current = self.position()?;
        let target = if self.moving_inward()? {
            current - ticks
        } else {
            current + ticks
        }
        .clamp(POSITION_MIN, POSITION_MAX);
        self.driver
            .set_state(REL_FOCUS_POSITION, PropertyState::Busy, None)
            .await?;
        self.start_absolute(target, true).await
    }

    async fn start_timer(&mut self, request: &UpdateRequest, duration_ms: f64) -> Result<(), PropBusError> {
        self.driver.merge_update(request).await?;
        let speed = self.number(FOCUS_SPEED, FOCUS_SPEED_VALUE)?;
        let step = speed * duration_ms;
        let internal = if self.moving_inward()? {
            self.internal_ticks - step
        } else {
            self.internal_ticks + step
        };
        if self.mode()? == Some(Mode::All) && !(POSITION_MIN..=POSITION_MAX).contains(&internal) {
            tracing::warn!(device = self.device(), internal, "timed motion out of travel");
            return self
                .driver
                .set_state(FOCUS_TIMER, PropertyState::Alert, Some(OUT_OF_TRAVEL))
                .await;
        }
        self.driver
            .set_state(FOCUS_TIMER, PropertyState::Busy, None)
            .await?;
        self.pending = Some(PendingMotion {
            deadline: Instant::now() + micros(duration_ms * 1000.0),
            motion: Motion::Timer { internal },
        });
        Ok(())
    }

    async fn handle_abort(&mut self, request: &UpdateRequest) -> Result<(), PropBusError> {
        self.driver.accept(request)?;
        if request.is_from_config() {
            return Ok(());
        }
        self.driver
            .registry()
            .require(FOCUS_ABORT_MOTION)?
            .check_values(&request.values)?;
        let cancelled = self.cancel_motion().await?;
        self.driver
            .registry_mut()
            .switch_mut(FOCUS_ABORT_MOTION)?
            .reset();
        let message = cancelled.then_some("Focuser aborted.");
        self.driver
            .set_state(FOCUS_ABORT_MOTION, PropertyState::Ok, message)
            .await
    }

    /// Drop the pending motion and put its vectors back to `Idle`.
    async fn cancel_motion(&mut self) -> Result<bool, PropBusError> {
        let Some(pending) = self.pending.take() else {
            return Ok(false);
        };
        for name in pending.motion.vectors() {
            self.driver
                .set_state(name, PropertyState::Idle, None)
                .await?;
        }
        Ok(true)
    }

    /// Finish the pending motion now: move, recompute the FWHM and release
    /// the motion vectors. No-op when nothing is moving.
    ///
    /// # Errors
    ///
    /// Returns a transport error.
    pub async fn complete_motion(&mut self) -> Result<(), PropBusError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        match pending.motion {
            Motion::Absolute { target, relative } => {
                self.internal_ticks = target;
                self.set_number(ABS_FOCUS_POSITION, FOCUS_ABSOLUTE_POSITION, target)?;
                self.update_fwhm().await?;
                self.driver
                    .set_state(ABS_FOCUS_POSITION, PropertyState::Ok, None)
                    .await?;
                if relative {
                    self.driver
                        .set_state(REL_FOCUS_POSITION, PropertyState::Ok, None)
                        .await?;
                }
            }
            Motion::Timer { internal } => {
                self.internal_ticks = internal;
                self.update_fwhm().await?;
                if self.mode()? == Some(Mode::All) {
                    self.set_number(ABS_FOCUS_POSITION, FOCUS_ABSOLUTE_POSITION, internal)?;
                    self.driver.publish(ABS_FOCUS_POSITION, None).await?;
                }
                self.driver
                    .set_state(FOCUS_TIMER, PropertyState::Ok, None)
                    .await?;
            }
        }
        Ok(())
    }

    async fn update_fwhm(&mut self) -> Result<(), PropBusError> {
        let seeing = self.number(SEEING_SETTINGS, SIM_SEEING)?;
        let fwhm = self.optics.fwhm(self.internal_ticks, seeing);
        self.set_number(FWHM, SIM_FWHM, fwhm)?;
        self.driver
            .debug_message(&format!(
                "Internal ticks: {} FWHM ticks: {:.3} FWHM: {fwhm:.3}",
                self.internal_ticks,
                self.optics.ticks(self.internal_ticks)
            ))
            .await?;
        self.driver.publish(FWHM, None).await
    }

    /// Run one command. Only transport failures are returned; everything
    /// else was already reported to the client and is logged here.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::Transport`].
    pub async fn execute(&mut self, command: Command) -> Result<(), PropBusError> {
        let result = match command {
            Command::GetProperties => self.get_properties().await,
            Command::Update(request) => self.handle(&request).await,
        };
        match result {
            Err(err @ PropBusError::Transport(_)) => Err(err),
            Err(err) => {
                tracing::debug!(%err, device = self.device(), "request not applied");
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Serve commands until the channel closes, completing motions as
    /// their deadlines pass.
    ///
    /// # Errors
    ///
    /// Returns [`PropBusError::Transport`] when events can no longer be
    /// delivered.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<(), PropBusError> {
        tracing::info!(device = self.device(), "focuser simulator started");
        loop {
            let deadline = self.pending_deadline();
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    self.execute(command).await?;
                }
                () = wait_until(deadline) => self.complete_motion().await?,
            }
        }
        tracing::info!(device = self.device(), "command channel closed, simulator stopped");
        Ok(())
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;
    use propbus_app::event_bus::InProcessEventBus;
    use propbus_app::ports::ConfigSlot;
    use propbus_domain::config::{ConfigDocument, StoredSwitch, StoredVector};
    use propbus_domain::event::DriverEvent;
    use propbus_domain::id::ClientId;
    use propbus_domain::update::{PropertyValue, UpdateOrigin};
    use tokio::sync::broadcast;

    const DEVICE: &str = "Focuser Simulator";

    #[derive(Default)]
    struct MemoryStore {
        documents: Mutex<HashMap<(String, bool), ConfigDocument>>,
    }

    impl MemoryStore {
        fn get(&self, slot: ConfigSlot) -> Option<ConfigDocument> {
            self.documents
                .lock()
                .unwrap()
                .get(&(DEVICE.to_string(), slot == ConfigSlot::Default))
                .cloned()
        }

        fn put(&self, document: ConfigDocument) {
            self.documents
                .lock()
                .unwrap()
                .insert((document.device.clone(), false), document);
        }
    }

    impl ConfigStore for MemoryStore {
        async fn read(
            &self,
            device: &str,
            slot: ConfigSlot,
        ) -> Result<Option<ConfigDocument>, PropBusError> {
            Ok(self
                .documents
                .lock()
                .unwrap()
                .get(&(device.to_string(), slot == ConfigSlot::Default))
                .cloned())
        }

        async fn write(
            &self,
            slot: ConfigSlot,
            document: &ConfigDocument,
        ) -> Result<(), PropBusError> {
            self.documents.lock().unwrap().insert(
                (document.device.clone(), slot == ConfigSlot::Default),
                document.clone(),
            );
            Ok(())
        }
    }

    type Simulator = FocuserSimulator<InProcessEventBus, Arc<MemoryStore>>;

    fn simulator() -> (Simulator, broadcast::Receiver<DriverEvent>, Arc<MemoryStore>) {
        let bus = InProcessEventBus::new(256);
        let rx = bus.subscribe();
        let store = Arc::new(MemoryStore::default());
        let device = DeviceName::new(DEVICE).unwrap();
        let sim = FocuserSimulator::new(&device, bus, ConfigService::new(Arc::clone(&store))).unwrap();
        (sim, rx, store)
    }

    fn request(vector: &str) -> UpdateRequest {
        UpdateRequest::new(DEVICE, vector, UpdateOrigin::Client(ClientId::new()))
    }

    fn drain(rx: &mut broadcast::Receiver<DriverEvent>) -> Vec<DriverEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn state_of(sim: &Simulator, name: &str) -> PropertyState {
        sim.driver().registry().require(name).unwrap().state()
    }

    async fn connected() -> (Simulator, broadcast::Receiver<DriverEvent>, Arc<MemoryStore>) {
        let (mut sim, mut rx, store) = simulator();
        sim.handle(&request(CONNECTION).switch(CONNECT, SwitchState::On))
            .await
            .unwrap();
        drain(&mut rx);
        (sim, rx, store)
    }

    #[tokio::test]
    async fn should_announce_only_base_vectors_before_connecting() {
        let (mut sim, mut rx, _) = simulator();

        sim.get_properties().await.unwrap();

        let names: Vec<String> = drain(&mut rx)
            .iter()
            .filter_map(|e| e.vector_name().map(str::to_string))
            .collect();
        assert_eq!(
            names,
            ["CONNECTION", "DEBUG", "SIMULATION", "CONFIG_PROCESS", MODE]
        );
    }

    #[tokio::test]
    async fn should_define_focuser_vectors_on_connect() {
        let (mut sim, mut rx, _) = simulator();

        sim.handle(&request(CONNECTION).switch(CONNECT, SwitchState::On))
            .await
            .unwrap();

        let events = drain(&mut rx);
        let defined: Vec<&str> = events
            .iter()
            .filter(|e| matches!(e, DriverEvent::Define { .. }))
            .filter_map(DriverEvent::vector_name)
            .collect();
        assert_eq!(defined, CONNECTED_VECTORS);
        assert!(sim.driver().is_connected());
        assert!(events.iter().any(|e| e.text() == Some("Focuser Simulator is online.")));
    }

    #[tokio::test]
    async fn should_delete_focuser_vectors_on_disconnect() {
        let (mut sim, mut rx, _) = connected().await;

        sim.handle(&request(CONNECTION).switch("DISCONNECT", SwitchState::On))
            .await
            .unwrap();

        let deleted = drain(&mut rx)
            .iter()
            .filter(|e| matches!(e, DriverEvent::Delete { .. }))
            .count();
        assert_eq!(deleted, CONNECTED_VECTORS.len());
        assert!(!sim.driver().registry().is_defined(FWHM));
        assert_eq!(state_of(&sim, CONNECTION), PropertyState::Idle);
    }

    #[tokio::test]
    async fn should_move_to_absolute_position_and_refocus() {
        let (mut sim, mut rx, _) = connected().await;

        sim.handle(&request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 60_000.0))
            .await
            .unwrap();
        assert!(sim.is_moving());
        assert_eq!(state_of(&sim, ABS_FOCUS_POSITION), PropertyState::Busy);
        assert!((sim.position().unwrap() - 50_000.0).abs() < f64::EPSILON);

        sim.complete_motion().await.unwrap();

        let expected = Optics::new(POSITION_MIN, POSITION_MAX, INITIAL_FWHM, INITIAL_SEEING)
            .fwhm(60_000.0, INITIAL_SEEING);
        assert!((sim.position().unwrap() - 60_000.0).abs() < f64::EPSILON);
        assert!((sim.fwhm().unwrap() - expected).abs() < 1e-9);
        assert_eq!(state_of(&sim, ABS_FOCUS_POSITION), PropertyState::Ok);
        let fwhm_updates = drain(&mut rx)
            .iter()
            .filter(|e| e.vector_name() == Some(FWHM))
            .count();
        assert_eq!(fwhm_updates, 1);
    }

    #[tokio::test]
    async fn should_scale_motion_delay_with_distance() {
        let (mut sim, _rx, _) = connected().await;
        let before = Instant::now();

        sim.handle(&request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 52_000.0))
            .await
            .unwrap();

        // 2000 ticks at 100 us per tick
        let deadline = sim.pending_deadline().unwrap();
        assert!(deadline >= before + Duration::from_millis(199));
        assert!(deadline <= Instant::now() + Duration::from_millis(200));
    }

    #[tokio::test]
    async fn should_reject_out_of_range_absolute_target() {
        let (mut sim, mut rx, _) = connected().await;

        sim.handle(&request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 150_000.0))
            .await
            .unwrap();

        assert!(!sim.is_moving());
        assert_eq!(state_of(&sim, ABS_FOCUS_POSITION), PropertyState::Alert);
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            DriverEvent::Update { message: Some(text), .. } if text.starts_with("Requested position out of bounds")
        )));
    }

    #[tokio::test]
    async fn should_clamp_relative_move_at_travel_limit() {
        let (mut sim, _rx, _) = connected().await;

        sim.handle(&request(REL_FOCUS_POSITION).number(FOCUS_RELATIVE_POSITION, 30_000.0))
            .await
            .unwrap();
        assert_eq!(state_of(&sim, REL_FOCUS_POSITION), PropertyState::Busy);
        sim.complete_motion().await.unwrap();
        assert!((sim.position().unwrap() - 20_000.0).abs() < f64::EPSILON);

        sim.handle(&request(REL_FOCUS_POSITION).number(FOCUS_RELATIVE_POSITION, 30_000.0))
            .await
            .unwrap();
        sim.complete_motion().await.unwrap();

        assert!(sim.position().unwrap().abs() < f64::EPSILON);
        assert_eq!(state_of(&sim, REL_FOCUS_POSITION), PropertyState::Ok);
    }

    #[tokio::test]
    async fn should_move_outward_when_selected() {
        let (mut sim, _rx, _) = connected().await;
        sim.handle(&request(FOCUS_MOTION).switch("FOCUS_OUTWARD", SwitchState::On))
            .await
            .unwrap();

        sim.handle(&request(REL_FOCUS_POSITION).number(FOCUS_RELATIVE_POSITION, 1_000.0))
            .await
            .unwrap();
        sim.complete_motion().await.unwrap();

        assert!((sim.position().unwrap() - 51_000.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn should_refuse_timed_motion_past_travel_in_all_mode() {
        let (mut sim, mut rx, _) = connected().await;
        sim.handle(&request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 100_000.0))
            .await
            .unwrap();
        sim.complete_motion().await.unwrap();
        sim.handle(&request(FOCUS_MOTION).switch("FOCUS_OUTWARD", SwitchState::On))
            .await
            .unwrap();
        drain(&mut rx);

        sim.handle(&request(FOCUS_TIMER).number(FOCUS_TIMER_VALUE, 1_000.0))
            .await
            .unwrap();

        assert!(!sim.is_moving());
        assert_eq!(state_of(&sim, FOCUS_TIMER), PropertyState::Alert);
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            DriverEvent::Update { message: Some(text), .. } if text == OUT_OF_TRAVEL
        )));
    }

    #[tokio::test]
    async fn should_track_position_of_timed_motion_in_all_mode() {
        let (mut sim, _rx, _) = connected().await;
        sim.handle(&request(FOCUS_SPEED).number(FOCUS_SPEED_VALUE, 2.0))
            .await
            .unwrap();

        sim.handle(&request(FOCUS_TIMER).number(FOCUS_TIMER_VALUE, 1_000.0))
            .await
            .unwrap();
        assert_eq!(state_of(&sim, FOCUS_TIMER), PropertyState::Busy);
        sim.complete_motion().await.unwrap();

        assert!((sim.position().unwrap() - 48_000.0).abs() < f64::EPSILON);
        assert_eq!(state_of(&sim, FOCUS_TIMER), PropertyState::Ok);
    }

    #[tokio::test]
    async fn should_refuse_motion_disabled_by_mode() {
        let (mut sim, mut rx, _) = connected().await;
        sim.handle(&request(MODE).switch(Mode::Timer.member(), SwitchState::On))
            .await
            .unwrap();
        assert!(!sim.capabilities().absolute);
        drain(&mut rx);

        sim.handle(&request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 60_000.0))
            .await
            .unwrap();

        assert!(!sim.is_moving());
        assert_eq!(state_of(&sim, ABS_FOCUS_POSITION), PropertyState::Alert);
        assert!(drain(&mut rx).iter().any(|e| matches!(
            e,
            DriverEvent::Update { message: Some(text), .. } if text.contains("not available")
        )));
    }

    #[tokio::test]
    async fn should_cancel_pending_motion_on_abort() {
        let (mut sim, mut rx, _) = connected().await;
        sim.handle(&request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 60_000.0))
            .await
            .unwrap();

        sim.handle(&request(FOCUS_ABORT_MOTION).switch("ABORT", SwitchState::On))
            .await
            .unwrap();

        assert!(!sim.is_moving());
        assert_eq!(state_of(&sim, ABS_FOCUS_POSITION), PropertyState::Idle);
        assert_eq!(state_of(&sim, FOCUS_ABORT_MOTION), PropertyState::Ok);
        assert!((sim.position().unwrap() - 50_000.0).abs() < f64::EPSILON);
        assert!(drain(&mut rx).iter().any(|e| e.text() == Some("Focuser aborted.")));
    }

    #[tokio::test]
    async fn should_let_newer_motion_supersede_pending_one() {
        let (mut sim, _rx, _) = connected().await;
        sim.handle(&request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 60_000.0))
            .await
            .unwrap();

        sim.handle(&request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 70_000.0))
            .await
            .unwrap();
        sim.complete_motion().await.unwrap();

        assert!((sim.position().unwrap() - 70_000.0).abs() < f64::EPSILON);
        assert!(!sim.is_moving());
    }

    #[tokio::test]
    async fn should_cancel_motion_on_disconnect() {
        let (mut sim, _rx, _) = connected().await;
        sim.handle(&request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 60_000.0))
            .await
            .unwrap();

        sim.handle(&request(CONNECTION).switch("DISCONNECT", SwitchState::On))
            .await
            .unwrap();

        assert!(!sim.is_moving());
    }

    #[tokio::test]
    async fn should_refuse_motion_while_disconnected() {
        let (mut sim, _rx, _) = simulator();

        sim.handle(&request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 60_000.0))
            .await
            .unwrap();

        assert!(!sim.is_moving());
        assert_eq!(state_of(&sim, ABS_FOCUS_POSITION), PropertyState::Alert);
    }

    #[tokio::test]
    async fn should_update_seeing_without_refocusing() {
        let (mut sim, _rx, _) = connected().await;

        sim.handle(&request(SEEING_SETTINGS).number(SIM_SEEING, 4.0))
            .await
            .unwrap();

        let seeing = sim.driver().registry().number(SEEING_SETTINGS).unwrap();
        assert_eq!(seeing.value(SIM_SEEING), Some(4.0));
        assert_eq!(state_of(&sim, SEEING_SETTINGS), PropertyState::Ok);
        assert!((sim.fwhm().unwrap() - INITIAL_FWHM).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn should_reject_fwhm_writes() {
        let (mut sim, mut rx, _) = connected().await;

        let result = sim.handle(&request(FWHM).number(SIM_FWHM, 1.0)).await;

        assert!(matches!(result, Err(PropBusError::Permission(_))));
        assert!((sim.fwhm().unwrap() - INITIAL_FWHM).abs() < f64::EPSILON);
        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(e, DriverEvent::Rejected { .. })));
    }

    #[tokio::test]
    async fn should_persist_delay_on_update() {
        let (mut sim, _rx, store) = connected().await;

        sim.handle(&request(DELAY).number(DELAY_VALUE, 200.0))
            .await
            .unwrap();

        let document = store.get(ConfigSlot::Primary).unwrap();
        assert_eq!(
            document.get(DELAY).map(StoredVector::values),
            Some(vec![(DELAY_VALUE.to_string(), PropertyValue::Number(200.0))])
        );
    }

    #[tokio::test]
    async fn should_restore_saved_mode_when_properties_are_requested() {
        let (mut sim, _rx, store) = simulator();
        let mut document = ConfigDocument::new(DEVICE);
        document.upsert(StoredVector::Switch {
            name: MODE.to_string(),
            members: ["All", "Absolute", "Relative", "Timer"]
                .into_iter()
                .map(|name| StoredSwitch {
                    name: name.to_string(),
                    state: if name == "Relative" {
                        SwitchState::On
                    } else {
                        SwitchState::Off
                    },
                })
                .collect(),
        });
        store.put(document);

        sim.get_properties().await.unwrap();

        assert!(sim.capabilities().relative);
        assert!(!sim.capabilities().absolute);
    }

    #[tokio::test]
    async fn should_not_move_when_restoring_position() {
        let (mut sim, _rx, _) = connected().await;
        sim.handle(&request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 60_000.0))
            .await
            .unwrap();
        sim.complete_motion().await.unwrap();
        sim.driver().save_config(None).await.unwrap();
        sim.handle(&request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 40_000.0))
            .await
            .unwrap();
        sim.complete_motion().await.unwrap();

        let restored = sim.load_config().await.unwrap();

        assert!(restored > 0);
        assert!(!sim.is_moving());
        assert!((sim.position().unwrap() - 40_000.0).abs() < f64::EPSILON);
    }

    #[tokio::test(start_paused = true)]
    async fn should_complete_motion_when_deadline_passes() {
        let (sim, mut rx, _) = simulator();
        let (tx, commands) = mpsc::channel(8);
        let handle = tokio::spawn(sim.run(commands));

        tx.send(Command::Update(
            request(CONNECTION).switch(CONNECT, SwitchState::On),
        ))
        .await
        .unwrap();
        tx.send(Command::Update(
            request(ABS_FOCUS_POSITION).number(FOCUS_ABSOLUTE_POSITION, 51_000.0),
        ))
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        drop(tx);
        handle.await.unwrap().unwrap();

        let position = drain(&mut rx)
            .into_iter()
            .filter_map(|e| match e {
                DriverEvent::Update { vector, .. } if vector.name() == ABS_FOCUS_POSITION => {
                    vector.as_number().and_then(|v| v.value(FOCUS_ABSOLUTE_POSITION))
                }
                _ => None,
            })
            .last();
        assert_eq!(position, Some(51_000.0));
    }
}
