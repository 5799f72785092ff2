//! Composite switch combining several switch devices into one.
//!
//! The switches of every child device are merged into a single flat
//! namespace. With `extend_hardware_name` enabled each switch name is
//! prefixed with its device name (`"{device}.{switch}"`) so identically named
//! switches on different devices stay distinct.

use super::{AvailableStates, SwitchInterface, SwitchStates};
use crate::config::MultiSwitchConfig;
use crate::error::{Result, SwitchError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use strum::{Display, EnumString};

/// Separator between device name and switch name in prefixed mode.
pub const SEPARATOR: char = '.';

/// What activation does when two devices expose the same merged switch name.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CollisionPolicy {
    /// Log a warning; the later device wins on reads.
    #[default]
    Warn,
    /// Refuse to activate.
    Reject,
}

/// Switch device aggregating a list of child switch devices.
///
/// Holds no switch state of its own: every read is computed from the live
/// children and every write is forwarded to the device owning the switch.
///
/// # Example
/// ```ignore
/// let multi = MultiSwitch::new("multiswitch", vec![laser, flipper])
///     .with_extend_hardware_name(true);
/// multi.activate()?;
/// multi.set_state("laser.shutter", "open")?;
/// ```
pub struct MultiSwitch {
    switches: Vec<Arc<dyn SwitchInterface>>,
    module_name: String,
    hardware_name: Option<String>,
    extend_hardware_name: bool,
    collision_policy: CollisionPolicy,
    active: AtomicBool,
}

impl MultiSwitch {
    /// Create an aggregator named after its module until a name is configured.
    pub fn new(module_name: impl Into<String>, switches: Vec<Arc<dyn SwitchInterface>>) -> Self {
        Self {
            switches,
            module_name: module_name.into(),
            hardware_name: None,
            extend_hardware_name: false,
            collision_policy: CollisionPolicy::default(),
            active: AtomicBool::new(false),
        }
    }

    /// Create an aggregator from its configuration section.
    pub fn from_config(
        config: &MultiSwitchConfig,
        switches: Vec<Arc<dyn SwitchInterface>>,
    ) -> Self {
        let multi = Self::new(config.module_name.clone(), switches)
            .with_extend_hardware_name(config.extend_hardware_name)
            .with_collision_policy(config.collision_policy);
        match &config.name {
            Some(name) => multi.with_name(name.clone()),
            None => multi,
        }
    }

    /// Override the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.hardware_name = Some(name.into());
        self
    }

    /// Prefix every switch name with the name of its device.
    pub fn with_extend_hardware_name(mut self, extend: bool) -> Self {
        self.extend_hardware_name = extend;
        self
    }

    /// Choose how activation treats switch names exposed by several devices.
    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    /// Child devices in merge order.
    pub fn switches(&self) -> &[Arc<dyn SwitchInterface>] {
        &self.switches
    }

    /// Whether [`activate`](Self::activate) succeeded and no deactivation followed.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Check the merged namespace and mark the module active.
    ///
    /// Under [`CollisionPolicy::Reject`] fails with
    /// [`SwitchError::DuplicateSwitch`] for the first name exposed by more
    /// than one device.
    pub fn activate(&self) -> Result<()> {
        log::debug!("Activating with {} switches.", self.switches.len());

        for duplicate in self.collisions() {
            match self.collision_policy {
                CollisionPolicy::Warn => log::warn!(
                    "[{}] switch \"{}\" is provided by several devices; the last one wins",
                    self.name(),
                    duplicate
                ),
                CollisionPolicy::Reject => return Err(SwitchError::DuplicateSwitch(duplicate)),
            }
        }

        self.active.store(true, Ordering::SeqCst);
        log::info!(
            "[{}] active with {} devices, {} switches",
            self.name(),
            self.switches.len(),
            self.number_of_switches()
        );
        Ok(())
    }

    /// Mark the module inactive. Children are left untouched.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::SeqCst);
        log::info!("[{}] deactivated", self.name());
    }

    /// Merged switch names provided by more than one device, in first-seen order.
    pub fn collisions(&self) -> Vec<String> {
        let mut seen: IndexMap<String, usize> = IndexMap::new();
        for hw in &self.switches {
            let mut names = IndexMap::new();
            self.merge_into(hw.as_ref(), hw.available_states(), &mut names);
            for name in names.into_keys() {
                *seen.entry(name).or_default() += 1;
            }
        }
        seen.into_iter()
            .filter(|(_, count)| *count > 1)
            .map(|(name, _)| name)
            .collect()
    }

    /// Set several switches from a JSON object of the form `{"switch": "state"}`.
    pub fn set_states_json(&self, value: &serde_json::Value) -> Result<()> {
        let object = value.as_object().ok_or_else(|| {
            SwitchError::InvalidInput(format!("states must be a JSON object, received: {value}"))
        })?;

        let mut states = SwitchStates::with_capacity(object.len());
        for (switch, state) in object {
            let state = state.as_str().ok_or_else(|| {
                SwitchError::InvalidInput(format!(
                    "state for switch \"{switch}\" must be a string, received: {state}"
                ))
            })?;
            states.insert(switch.clone(), state.to_string());
        }
        self.set_states(&states)
    }

    /// Find the device owning a merged switch name and the device-local name.
    ///
    /// In prefixed mode device names may overlap (`A` and `A.B`). A device
    /// that actually has the stripped switch wins; otherwise the longest
    /// matching device name is used.
    fn resolve<'a, 's>(&'a self, switch: &'s str) -> Option<(&'a dyn SwitchInterface, &'s str)> {
        if !self.extend_hardware_name {
            return self.switches.iter().find_map(|hw| {
                hw.available_states()
                    .contains_key(switch)
                    .then_some((hw.as_ref(), switch))
            });
        }

        let candidates: Vec<(&'a dyn SwitchInterface, &'s str)> = self
            .switches
            .iter()
            .filter_map(|hw| {
                let name = hw.name();
                switch
                    .strip_prefix(name.as_str())
                    .and_then(|rest| rest.strip_prefix(SEPARATOR))
                    .map(|local| (hw.as_ref(), local))
            })
            .collect();

        candidates
            .iter()
            .copied()
            .find(|(hw, local)| hw.available_states().contains_key(*local))
            .or_else(|| {
                // Longest device name leaves the shortest local part.
                candidates
                    .iter()
                    .copied()
                    .min_by_key(|(_, local)| local.len())
            })
    }

    fn merge_into<T>(
        &self,
        hw: &dyn SwitchInterface,
        entries: IndexMap<String, T>,
        merged: &mut IndexMap<String, T>,
    ) {
        if self.extend_hardware_name {
            let name = hw.name();
            merged.extend(
                entries
                    .into_iter()
                    .map(|(switch, value)| (format!("{name}{SEPARATOR}{switch}"), value)),
            );
        } else {
            merged.extend(entries);
        }
    }
}

impl SwitchInterface for MultiSwitch {
    fn name(&self) -> String {
        self.hardware_name
            .clone()
            .unwrap_or_else(|| self.module_name.clone())
    }

    fn available_states(&self) -> AvailableStates {
        let mut merged = AvailableStates::new();
        for hw in &self.switches {
            self.merge_into(hw.as_ref(), hw.available_states(), &mut merged);
        }
        merged
    }

    /// Sum of the counts reported by the children.
    fn number_of_switches(&self) -> usize {
        self.switches.iter().map(|hw| hw.number_of_switches()).sum()
    }

    fn states(&self) -> Result<SwitchStates> {
        let mut merged = SwitchStates::new();
        for hw in &self.switches {
            self.merge_into(hw.as_ref(), hw.states()?, &mut merged);
        }
        Ok(merged)
    }

    fn get_state(&self, switch: &str) -> Result<String> {
        if !self.available_states().contains_key(switch) {
            return Err(SwitchError::InvalidInput(format!(
                "Invalid switch name: \"{switch}\""
            )));
        }
        let (hw, local) = self
            .resolve(switch)
            .ok_or_else(|| SwitchError::NoOwningDevice(switch.to_string()))?;
        hw.get_state(local)
    }

    fn set_state(&self, switch: &str, state: &str) -> Result<()> {
        let (hw, local) = self
            .resolve(switch)
            .ok_or_else(|| SwitchError::NoOwningDevice(switch.to_string()))?;
        log::debug!(
            "[{}] forwarding {} -> {} to device {}",
            self.name(),
            switch,
            state,
            hw.name()
        );
        hw.set_state(local, state)
    }
}
