//! Switch hardware abstraction.
//!
//! A switch device exposes one or more named switches, each with an ordered
//! list of allowed state names. Devices are shared as `Arc<dyn SwitchInterface>`
//! so every method takes `&self`; implementations keep their state behind
//! interior mutability.

pub mod dummy;
pub mod multi;

pub use dummy::DummySwitch;
pub use multi::{CollisionPolicy, MultiSwitch};

use crate::error::Result;
use indexmap::IndexMap;

/// Allowed states per switch, in the form `{"switch": ["state1", "state2"]}`.
///
/// Iteration order is insertion order.
pub type AvailableStates = IndexMap<String, Vec<String>>;

/// Current state per switch, in the form `{"switch": "state"}`.
pub type SwitchStates = IndexMap<String, String>;

/// Capability set of a switch device.
pub trait SwitchInterface: Send + Sync {
    /// Name of the hardware.
    fn name(&self) -> String;

    /// Names of the states for each switch, in order.
    fn available_states(&self) -> AvailableStates;

    /// Number of switches provided by the hardware.
    fn number_of_switches(&self) -> usize {
        self.available_states().len()
    }

    /// Names of all available switches.
    fn switch_names(&self) -> Vec<String> {
        self.available_states().into_keys().collect()
    }

    /// Current state of every switch.
    fn states(&self) -> Result<SwitchStates>;

    /// Query the state of a single switch by name.
    fn get_state(&self, switch: &str) -> Result<String>;

    /// Change the state of a single switch by name.
    fn set_state(&self, switch: &str, state: &str) -> Result<()>;

    /// Set several switches at once. Stops at the first failing entry.
    fn set_states(&self, states: &SwitchStates) -> Result<()> {
        for (switch, state) in states {
            self.set_state(switch, state)?;
        }
        Ok(())
    }
}
