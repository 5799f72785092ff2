use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum SwitchError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No switch device owns switch \"{0}\"")]
    NoOwningDevice(String),

    #[error("Device \"{device}\" has no switch named \"{switch}\"")]
    UnknownSwitch { device: String, switch: String },

    #[error("State \"{state}\" is not allowed for switch \"{switch}\"")]
    InvalidState { switch: String, state: String },

    #[error("Switch name \"{0}\" is provided by more than one device")]
    DuplicateSwitch(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SwitchError>;
