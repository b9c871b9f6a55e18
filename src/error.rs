//! Error handling for the installer generator.
//!
//! Fatal conditions are `GeneratorError` values and abort the build. Signing
//! problems are `SignError` values; the pipeline downgrades them to a
//! `BuildWarning` and keeps going.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::pipeline::PipelineTransitionError;

/// Main error type for a build.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// A required attribute is absent.
    #[error("Validation error: missing required attribute '{key}' ({context})")]
    MissingAttribute { key: String, context: String },

    /// An attribute is present but cannot be interpreted.
    #[error("Validation error: malformed attribute '{key}': {reason}")]
    MalformedAttribute { key: String, reason: String },

    /// A certificate or helper asset could not be staged into the workspace.
    #[error("Staging error: {file}: {reason}")]
    Staging { file: PathBuf, reason: String },

    /// A script fragment could not be written.
    #[error("Emission error: cannot write {file}: {reason}")]
    Emission { file: PathBuf, reason: String },

    /// The packaging compiler exited unsuccessfully.
    #[error("Compile error: packaging compiler failed (exit code {code})\n{log}")]
    Compile { code: i32, log: String },

    /// Packaging state machine misuse.
    #[error("Pipeline error: {0}")]
    Transition(#[from] PipelineTransitionError),

    /// Generator configuration problems (loading, validation).
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for generator operations
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Coarse error classes a caller can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Staging,
    Emission,
    Compile,
    Internal,
}

impl GeneratorError {
    pub fn missing(key: impl Into<String>, context: impl Into<String>) -> Self {
        Self::MissingAttribute {
            key: key.into(),
            context: context.into(),
        }
    }

    pub fn malformed(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedAttribute {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn staging(file: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::Staging {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    pub fn emission(file: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::Emission {
            file: file.into(),
            reason: reason.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Which class of failure this is.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::MissingAttribute { .. } | Self::MalformedAttribute { .. } => {
                ErrorClass::Validation
            }
            Self::Staging { .. } => ErrorClass::Staging,
            Self::Emission { .. } => ErrorClass::Emission,
            Self::Compile { .. } => ErrorClass::Compile,
            Self::Transition(_) | Self::Config(_) => {
                ErrorClass::Internal
            }
        }
    }
}

/// Signing failures. Never fatal for a build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignError {
    #[error("failed to start signing tool '{program}': {reason}")]
    Spawn { program: String, reason: String },

    #[error("signing tool exited with code {code}: {stderr}")]
    ToolFailed { code: i32, stderr: String },

    #[error("signing tool reported success but {path} was not produced")]
    MissingOutput { path: PathBuf },
}

/// Recoverable conditions reported alongside a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    /// The method validates the server but no CA was marked as a root.
    NoRootCertificate { method: String },
    /// Signing failed; the installer was shipped unsigned.
    SigningFailed(SignError),
    /// Logos were requested but no compositor is available.
    BrandingSkipped { reason: String },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRootCertificate { method } => write!(
                f,
                "{} validates the server but the CA list has no root certificate",
                method
            ),
            Self::SigningFailed(err) => write!(f, "installer left unsigned: {}", err),
            Self::BrandingSkipped { reason } => write!(f, "branding skipped: {}", reason),
        }
    }
}
