use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadIPFormatting(String),
    NotInRange(String),
    MissingValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadIPFormatting(e) => write!(f, "IP formatting error: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
            ConfigError::MissingValue(e) => write!(f, "Missing value: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlError(err.to_string())
    }
}

/// Errors raised while acquiring frames.
///
/// `Bind` is fatal for the whole run and is only ever returned before the
/// first frame is produced. `Read` covers a single failed acquisition and is
/// skipped by the capture loop.
#[derive(Debug)]
pub enum CaptureError {
    Bind(String, std::io::Error),
    Read(std::io::Error),
    NotBound,
}

impl CaptureError {
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CaptureError::Read(_))
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::Bind(iface, e) => {
                write!(f, "Unable to bind interface '{}': {}", iface, e)
            }
            CaptureError::Read(e) => write!(f, "Frame read error: {}", e),
            CaptureError::NotBound => write!(f, "Frame source used before binding"),
        }
    }
}

impl std::error::Error for CaptureError {}

#[derive(Debug)]
pub enum ReplayError {
    Send(std::io::Error),
    Unavailable(String),
    Injected(u64),
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::Send(e) => write!(f, "Replay send failed: {}", e),
            ReplayError::Unavailable(e) => write!(f, "Replay sink unavailable: {}", e),
            ReplayError::Injected(n) => write!(f, "Injected replay fault on attempt {}", n),
        }
    }
}

impl std::error::Error for ReplayError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    CaptureError(CaptureError),
    ReplayError(ReplayError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::CaptureError(e) => write!(f, "Capture error: {}", e),
            ControllerError::ReplayError(e) => write!(f, "Replay error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<CaptureError> for ControllerError {
    fn from(err: CaptureError) -> Self {
        ControllerError::CaptureError(err)
    }
}

impl From<ReplayError> for ControllerError {
    fn from(err: ReplayError) -> Self {
        ControllerError::ReplayError(err)
    }
}
