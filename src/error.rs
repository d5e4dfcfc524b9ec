//! Application error types.

use std::collections::BTreeMap;
use std::fmt;

/// Application error carrying a kind and a small key/value payload.
#[derive(Debug)]
pub struct AppError {
    payload: BTreeMap<String, String>,
    kind: ErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Instance name has no configuration
    UnknownInstance,
    /// At least one container of the instance already exists
    InstanceAlreadyDeployed,
    /// Not all containers of the instance exist
    InstanceNotDeployed,
    /// A container disappeared while iterating over the roles
    ContainerMissing,
    /// Supplied certificate directory is incomplete
    MissingCertificates,
    /// Process does not run with root privileges
    NotRoot,
    /// Required host program, image context or template is missing
    MissingPrerequisite,
    /// Root directory does not look like a deployment checkout
    WrongDirectory,
    /// Settings or argument error
    Config,
    /// File system error
    Io,
    /// Network error
    Network,
    /// Archive extraction error
    Archive,
    /// External command could not run or exited non-zero
    Process,
    /// Container runtime reported a failure
    Runtime,
    /// Container runtime returned metadata that does not decode
    MalformedRuntimeMetadata,
    /// Command exists but has no implementation
    NotImplemented,
}

impl ErrorKind {
    pub fn code(&self) -> u32 {
        match self {
            Self::UnknownInstance => 1001,
            Self::InstanceAlreadyDeployed => 1002,
            Self::InstanceNotDeployed => 1003,
            Self::ContainerMissing => 1004,
            Self::MissingCertificates => 1005,
            Self::NotRoot => 1101,
            Self::MissingPrerequisite => 1102,
            Self::WrongDirectory => 1103,
            Self::Config => 2001,
            Self::Io => 2002,
            Self::Network => 2003,
            Self::Archive => 2004,
            Self::Process => 3001,
            Self::Runtime => 3002,
            Self::MalformedRuntimeMetadata => 3003,
            Self::NotImplemented => 9001,
        }
    }

    /// Whether the error is an operator-fixable precondition rather than a failed operation.
    pub fn is_precondition(&self) -> bool {
        self.code() < 2000
    }
}

impl AppError {
    pub fn new(kind: ErrorKind, payload: BTreeMap<String, String>) -> Self {
        Self { payload, kind }
    }

    /// Create an error with a single "detail" key from a non-empty string,
    /// or an empty payload if the string is empty.
    fn with_detail(kind: ErrorKind, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let payload = if detail.is_empty() {
            BTreeMap::new()
        } else {
            BTreeMap::from([("detail".to_string(), detail)])
        };
        Self::new(kind, payload)
    }

    fn with_instance(kind: ErrorKind, instance: &str) -> Self {
        Self::new(
            kind,
            BTreeMap::from([("instance".to_string(), instance.to_string())]),
        )
    }

    pub fn unknown_instance(name: &str) -> Self {
        Self::with_instance(ErrorKind::UnknownInstance, name)
    }

    pub fn instance_already_deployed(name: &str) -> Self {
        Self::with_instance(ErrorKind::InstanceAlreadyDeployed, name)
    }

    pub fn instance_not_deployed(name: &str) -> Self {
        Self::with_instance(ErrorKind::InstanceNotDeployed, name)
    }

    pub fn container_missing(container: &str) -> Self {
        Self::new(
            ErrorKind::ContainerMissing,
            BTreeMap::from([("container".to_string(), container.to_string())]),
        )
    }

    pub fn missing_certificates(dir: &str, missing: &[&str]) -> Self {
        Self::new(
            ErrorKind::MissingCertificates,
            BTreeMap::from([
                ("dir".to_string(), dir.to_string()),
                ("missing".to_string(), missing.join(",")),
            ]),
        )
    }

    pub fn not_root() -> Self {
        Self::new(ErrorKind::NotRoot, BTreeMap::new())
    }

    pub fn missing_prerequisite(what: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::MissingPrerequisite, what)
    }

    pub fn wrong_directory(dir: &str, expected: &str) -> Self {
        Self::new(
            ErrorKind::WrongDirectory,
            BTreeMap::from([
                ("dir".to_string(), dir.to_string()),
                ("expected".to_string(), expected.to_string()),
            ]),
        )
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Config, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Io, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Network, message)
    }

    pub fn network_with_url(url: &str, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Network,
            BTreeMap::from([
                ("url".to_string(), url.to_string()),
                ("detail".to_string(), detail.into()),
            ]),
        )
    }

    pub fn archive(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Archive, message)
    }

    pub fn process(message: impl Into<String>) -> Self {
        Self::with_detail(ErrorKind::Process, message)
    }

    pub fn runtime(action: &str, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::Runtime,
            BTreeMap::from([
                ("action".to_string(), action.to_string()),
                ("detail".to_string(), detail.into()),
            ]),
        )
    }

    pub fn malformed_metadata(object: &str, detail: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::MalformedRuntimeMetadata,
            BTreeMap::from([
                ("object".to_string(), object.to_string()),
                ("detail".to_string(), detail.into()),
            ]),
        )
    }

    pub fn not_implemented(command: &str) -> Self {
        Self::new(
            ErrorKind::NotImplemented,
            BTreeMap::from([("command".to_string(), command.to_string())]),
        )
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.payload.is_empty() {
            write!(f, "{:?}", self.kind)
        } else {
            let pairs: Vec<String> = self
                .payload
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "{:?}: {}", self.kind, pairs.join(", "))
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        Self::network(err.to_string())
    }
}

impl From<zip::result::ZipError> for AppError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::archive(err.to_string())
    }
}

/// Convenient Result type alias.
pub type Result<T> = std::result::Result<T, AppError>;
