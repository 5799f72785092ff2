//! Smoke-test task flipping one switch per device.

use super::ModuleTask;
use crate::error::{Result, SwitchError};
use crate::switch::SwitchInterface;
use std::sync::Arc;

/// Sets the first switch of every device to that switch's last state.
pub struct DummyTask {
    switches: Vec<Arc<dyn SwitchInterface>>,
}

impl DummyTask {
    pub fn new(switches: Vec<Arc<dyn SwitchInterface>>) -> Self {
        Self { switches }
    }
}

impl ModuleTask for DummyTask {
    fn name(&self) -> &str {
        "dummy_task"
    }

    fn run_task(&self) -> Result<()> {
        for switch in &self.switches {
            let available = switch.available_states();
            let (name, states) = available.first().ok_or_else(|| {
                SwitchError::InvalidInput(format!("device \"{}\" has no switches", switch.name()))
            })?;
            let state = states.last().ok_or_else(|| {
                SwitchError::InvalidInput(format!("switch \"{name}\" has no states"))
            })?;
            log::debug!("[{}] {} -> {}", switch.name(), name, state);
            switch.set_state(name, state)?;
        }
        Ok(())
    }
}
