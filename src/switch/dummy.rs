//! In-memory switch device.
//!
//! Stands in for real switch hardware: holds a fixed set of switches with
//! their allowed states and remembers the last state written to each one.

use super::{AvailableStates, SwitchInterface, SwitchStates};
use crate::error::{Result, SwitchError};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

/// Thread-safe in-memory switch device.
///
/// Every switch starts in its first allowed state unless an initial state is
/// given. The version is incremented each time a switch actually changes.
#[derive(Debug)]
pub struct DummySwitch {
    name: String,
    available: AvailableStates,
    states: RwLock<SwitchStates>,
    version: AtomicU32,
}

impl DummySwitch {
    /// Create a device with every switch in its first allowed state.
    ///
    /// Fails if a switch has no allowed states.
    pub fn new(name: impl Into<String>, available: AvailableStates) -> Result<Self> {
        Self::with_initial(name, available, &SwitchStates::new())
    }

    /// Create a device, overriding the starting state of some switches.
    pub fn with_initial(
        name: impl Into<String>,
        available: AvailableStates,
        initial: &SwitchStates,
    ) -> Result<Self> {
        let name = name.into();
        let mut states = SwitchStates::with_capacity(available.len());
        for (switch, allowed) in &available {
            let first = allowed.first().ok_or_else(|| {
                SwitchError::InvalidInput(format!(
                    "switch \"{switch}\" of device \"{name}\" has no states"
                ))
            })?;
            states.insert(switch.clone(), first.clone());
        }

        let device = Self {
            name,
            available,
            states: RwLock::new(states),
            version: AtomicU32::new(0),
        };
        for (switch, state) in initial {
            device.validate(switch, state)?;
            device.states.write().insert(switch.clone(), state.clone());
        }
        Ok(device)
    }

    /// Number of effective state changes since creation.
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::SeqCst)
    }

    fn validate(&self, switch: &str, state: &str) -> Result<()> {
        let allowed = self
            .available
            .get(switch)
            .ok_or_else(|| SwitchError::UnknownSwitch {
                device: self.name.clone(),
                switch: switch.to_string(),
            })?;
        if !allowed.iter().any(|s| s == state) {
            return Err(SwitchError::InvalidState {
                switch: switch.to_string(),
                state: state.to_string(),
            });
        }
        Ok(())
    }
}

impl SwitchInterface for DummySwitch {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn available_states(&self) -> AvailableStates {
        self.available.clone()
    }

    fn states(&self) -> Result<SwitchStates> {
        Ok(self.states.read().clone())
    }

    fn get_state(&self, switch: &str) -> Result<String> {
        self.states
            .read()
            .get(switch)
            .cloned()
            .ok_or_else(|| SwitchError::UnknownSwitch {
                device: self.name.clone(),
                switch: switch.to_string(),
            })
    }

    fn set_state(&self, switch: &str, state: &str) -> Result<()> {
        self.validate(switch, state)?;
        let old = self
            .states
            .write()
            .insert(switch.to_string(), state.to_string());
        if old.as_deref() != Some(state) {
            self.version.fetch_add(1, Ordering::SeqCst);
            log::debug!("[{}] switch {} -> {}", self.name, switch, state);
        }
        Ok(())
    }
}
