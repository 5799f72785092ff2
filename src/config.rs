use crate::error::{Result, SwitchError};
use crate::switch::{
    AvailableStates, CollisionPolicy, DummySwitch, MultiSwitch, SwitchInterface, SwitchStates,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Load `KEY=value` lines from a dotenv file into the process environment.
///
/// Variables already present in the environment are left untouched.
/// Returns the number of variables set; a missing file sets none.
pub fn load_dotenv(path: impl AsRef<Path>) -> usize {
    let Ok(content) = fs::read_to_string(path.as_ref()) else {
        return 0;
    };

    let mut loaded = 0;
    for (key, value) in parse_dotenv(&content) {
        if std::env::var(key).is_err() {
            // SAFETY: called from main before anything else reads the environment
            unsafe { std::env::set_var(key, value) };
            loaded += 1;
        }
    }
    loaded
}

fn parse_dotenv(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            (key.trim(), unquoted)
        })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub multiswitch: MultiSwitchConfig,
    #[serde(default)]
    pub switches: Vec<DummySwitchConfig>,
}

/// Options of the composite switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiSwitchConfig {
    /// Identifier of the hosting module, used when `name` is not set.
    #[serde(default = "default_module_name")]
    pub module_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub extend_hardware_name: bool,
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

/// One in-memory switch device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DummySwitchConfig {
    pub name: String,
    pub switches: AvailableStates,
    #[serde(default)]
    pub initial: SwitchStates,
}

fn default_module_name() -> String {
    "multiswitch".to_string()
}

impl Default for MultiSwitchConfig {
    fn default() -> Self {
        Self {
            module_name: default_module_name(),
            name: None,
            extend_hardware_name: false,
            collision_policy: CollisionPolicy::Warn,
        }
    }
}

impl DummySwitchConfig {
    fn new(name: &str, switches: &[(&str, &[&str])]) -> Self {
        Self {
            name: name.to_string(),
            switches: switches
                .iter()
                .map(|(switch, states)| {
                    (
                        switch.to_string(),
                        states.iter().map(|s| s.to_string()).collect(),
                    )
                })
                .collect(),
            initial: SwitchStates::new(),
        }
    }

    pub fn build(&self) -> Result<DummySwitch> {
        DummySwitch::with_initial(self.name.clone(), self.switches.clone(), &self.initial)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            multiswitch: MultiSwitchConfig::default(),
            switches: vec![
                DummySwitchConfig::new(
                    "laser",
                    &[("shutter", &["closed", "open"]), ("power", &["off", "on"])],
                ),
                DummySwitchConfig::new(
                    "flipper",
                    &[("mirror", &["down", "up"]), ("filter", &["none", "nd1", "nd2"])],
                ),
            ],
        }
    }
}

impl Config {
    /// Read a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Load the file if given (defaults otherwise), apply environment
    /// overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `MULTISWITCH_*` overrides looked up through `lookup`.
    ///
    /// Unparsable values are logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(name) = lookup("MULTISWITCH_NAME") {
            self.multiswitch.name = Some(name);
        }
        if let Some(extend) = lookup("MULTISWITCH_EXTEND_HARDWARE_NAME") {
            match extend.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => self.multiswitch.extend_hardware_name = true,
                "false" | "0" => self.multiswitch.extend_hardware_name = false,
                other => log::warn!("Ignoring MULTISWITCH_EXTEND_HARDWARE_NAME={other}"),
            }
        }
        if let Some(policy) = lookup("MULTISWITCH_COLLISION_POLICY") {
            match policy.trim().parse() {
                Ok(p) => self.multiswitch.collision_policy = p,
                Err(_) => log::warn!("Ignoring MULTISWITCH_COLLISION_POLICY={policy}"),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.multiswitch.module_name.is_empty() {
            return Err(SwitchError::Config("module_name must not be empty".into()));
        }
        for device in &self.switches {
            if device.name.is_empty() {
                return Err(SwitchError::Config("switch device without a name".into()));
            }
            for (switch, states) in &device.switches {
                if states.is_empty() {
                    return Err(SwitchError::Config(format!(
                        "switch \"{}.{}\" has no states",
                        device.name, switch
                    )));
                }
            }
            for (switch, state) in &device.initial {
                let allowed = device.switches.get(switch).ok_or_else(|| {
                    SwitchError::Config(format!(
                        "initial state for unknown switch \"{}.{}\"",
                        device.name, switch
                    ))
                })?;
                if !allowed.contains(state) {
                    return Err(SwitchError::Config(format!(
                        "initial state \"{}\" not allowed for switch \"{}.{}\"",
                        state, device.name, switch
                    )));
                }
            }
        }
        Ok(())
    }

    /// Instantiate every configured switch device, in file order.
    pub fn build_switches(&self) -> Result<Vec<Arc<dyn SwitchInterface>>> {
        self.switches
            .iter()
            .map(|device| {
                device
                    .build()
                    .map(|switch| Arc::new(switch) as Arc<dyn SwitchInterface>)
            })
            .collect()
    }

    pub fn build_multiswitch(&self, switches: Vec<Arc<dyn SwitchInterface>>) -> MultiSwitch {
        MultiSwitch::from_config(&self.multiswitch, switches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.multiswitch.module_name, "multiswitch");
        assert_eq!(config.build_switches().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_minimal_json() {
        let config: Config = serde_json::from_str(
            r#"{ "switches": [ { "name": "A", "switches": { "x": ["on", "off"] } } ] }"#,
        )
        .unwrap();
        assert_eq!(config.multiswitch.module_name, "multiswitch");
        assert!(config.multiswitch.name.is_none());
        assert!(!config.multiswitch.extend_hardware_name);
        assert_eq!(config.multiswitch.collision_policy, CollisionPolicy::Warn);
        assert_eq!(config.switches[0].switches["x"], vec!["on", "off"]);
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("MULTISWITCH_NAME", "Optics"),
            ("MULTISWITCH_EXTEND_HARDWARE_NAME", "1"),
            ("MULTISWITCH_COLLISION_POLICY", "reject"),
        ]));
        assert_eq!(config.multiswitch.name.as_deref(), Some("Optics"));
        assert!(config.multiswitch.extend_hardware_name);
        assert_eq!(config.multiswitch.collision_policy, CollisionPolicy::Reject);
    }

    #[test]
    fn test_invalid_overrides_ignored() {
        let mut config = Config::default();
        config.apply_overrides(lookup(&[
            ("MULTISWITCH_EXTEND_HARDWARE_NAME", "maybe"),
            ("MULTISWITCH_COLLISION_POLICY", "panic"),
        ]));
        assert!(!config.multiswitch.extend_hardware_name);
        assert_eq!(config.multiswitch.collision_policy, CollisionPolicy::Warn);
    }

    #[test]
    fn test_validate_rejects_bad_initial_state() {
        let mut config = Config::default();
        config.switches[0]
            .initial
            .insert("shutter".into(), "ajar".into());
        assert!(matches!(config.validate(), Err(SwitchError::Config(_))));

        let mut config = Config::default();
        config.switches[0]
            .initial
            .insert("nothing".into(), "open".into());
        assert!(matches!(config.validate(), Err(SwitchError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_states() {
        let mut config = Config::default();
        config.switches[1].switches.insert("broken".into(), vec![]);
        assert!(matches!(config.validate(), Err(SwitchError::Config(_))));
    }

    #[test]
    fn test_parse_dotenv() {
        let parsed: Vec<_> = parse_dotenv(
            "# comment\n\nMULTISWITCH_NAME = \"Optics bench\"\nMULTISWITCH_COLLISION_POLICY='reject'\nnot a pair\n",
        )
        .collect();
        assert_eq!(
            parsed,
            vec![
                ("MULTISWITCH_NAME", "Optics bench"),
                ("MULTISWITCH_COLLISION_POLICY", "reject"),
            ]
        );
    }

    #[test]
    fn test_load_dotenv_missing_file() {
        assert_eq!(load_dotenv("/nonexistent/multiswitch/.env"), 0);
    }
}
