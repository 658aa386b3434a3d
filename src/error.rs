use thiserror::Error;

/// Main error type for the shotpath library
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Sequence error: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Container header error: {0}")]
    Header(#[from] HeaderError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    #[error("Project error: {0}")]
    Project(#[from] ProjectError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Frame-sequence parsing and compaction errors
#[derive(Error, Debug)]
pub enum SequenceError {
    #[error("Malformed file name (no extension separator): {name}")]
    MalformedName { name: String },

    #[error("Duplicate frame {frame} in sequence: {base}*.{ext}")]
    DuplicateFrame { base: String, ext: String, frame: u64 },

    #[error("Not a directory: {path}")]
    NotADirectory { path: String },
}

/// Image-container header errors
#[derive(Error, Debug)]
pub enum HeaderError {
    #[error("Invalid container signature: {path}")]
    InvalidSignature { path: String },

    #[error("Unsupported container version: {version}")]
    UnsupportedVersion { version: i32 },

    #[error("Truncated header while reading {what}")]
    Truncated { what: String },

    #[error("Incomplete header: missing mandatory attribute '{attribute}'")]
    IncompleteHeader { attribute: String },

    #[error("Malformed attribute '{attribute}': {reason}")]
    MalformedAttribute { attribute: String, reason: String },

    #[error("Header exceeds maximum size of {limit} bytes")]
    HeaderTooLarge { limit: usize },
}

/// Path-template resolution errors
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Unknown template: {id}")]
    UnknownTemplate { id: String },

    #[error("Unresolved variable: {key}")]
    UnresolvedVariable { key: String },

    #[error("Value '{value}' does not fit padding width {width} for '{key}'")]
    PaddingOverflow { key: String, value: String, width: usize },

    #[error("Placeholder '{key}' requires a numeric value, got '{value}'")]
    NotNumeric { key: String, value: String },

    #[error("Invalid template syntax in '{id}': {reason}")]
    InvalidSyntax { id: String, reason: String },
}

/// Version-directory management errors
#[derive(Error, Debug)]
pub enum VersionError {
    #[error("No versions found under: {directory}")]
    NoVersionsFound { directory: String },

    #[error("Version numbers exhausted after {attempts} attempts under: {directory}")]
    VersionExhausted { directory: String, attempts: usize },
}

/// Pipeline data-model errors
#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("Project descriptor already exists: {path}")]
    AlreadyExists { path: String },

    #[error("Project descriptor not found: {path}")]
    DescriptorNotFound { path: String },

    #[error("Failed to parse project descriptor: {path}")]
    ParseFailed { path: String },

    #[error("Shot not found: {id}")]
    ShotNotFound { id: String },

    #[error("Task '{task}' not found on shot '{shot}'")]
    TaskNotFound { shot: String, task: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Unknown pipeline mode: {mode}")]
    UnknownMode { mode: String },
}

/// Convenience type alias for Results using PipelineError
pub type Result<T> = std::result::Result<T, PipelineError>;

impl PipelineError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error is deterministic for its input.
    ///
    /// Deterministic failures (parsing, resolution) fail identically on retry
    /// and are surfaced to the caller as-is. Only IO and version contention
    /// can behave differently on a second attempt.
    pub fn is_deterministic(&self) -> bool {
        !matches!(
            self,
            Self::Io(_) | Self::Version(VersionError::VersionExhausted { .. })
        )
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Header(HeaderError::InvalidSignature { path }) => {
                format!("'{}' is not a recognized image container file.", path)
            }
            Self::Version(VersionError::NoVersionsFound { directory }) => {
                format!("No published versions exist yet under '{}'.", directory)
            }
            Self::Template(TemplateError::UnresolvedVariable { key }) => {
                format!("The pipeline variable '{}' was not supplied.", key)
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}
