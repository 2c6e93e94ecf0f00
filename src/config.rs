//! Explicit run configuration. Environment selection, credential
//! paths, and the confirmation-gate options are all passed into the
//! orchestrator and copier at construction; nothing is read from
//! ambient process state.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::Deserialize;

use crate::core::{MigrateError, Result};

/// Which deployment a run touches. Staging is the default everywhere;
/// production must be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Environment {
    #[default]
    Staging,
    Production,
}

impl Environment {
    /// Fixed relative path of the service-credential file for this
    /// environment.
    pub fn credential_path(&self) -> PathBuf {
        match self {
            Self::Staging => PathBuf::from("serviceAccountKey.staging.json"),
            Self::Production => PathBuf::from("serviceAccountKey.json"),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Parsed service-credential file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub project_id: String,
    pub client_email: String,
}

impl ServiceAccountKey {
    /// Load and parse the credential file. A missing or unreadable
    /// file is fatal before any run is attempted.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|_| MigrateError::MissingCredentials(path.to_path_buf()))?;
        serde_json::from_str(&raw).map_err(|e| {
            MigrateError::Setup(format!(
                "credential file '{}' is not a valid service account key: {}",
                path.display(),
                e
            ))
        })
    }
}

/// Where and how to open a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub environment: Environment,
    pub credential_path: PathBuf,
    /// Overrides the default `data/<project_id>` root of the file
    /// store.
    pub data_dir: Option<PathBuf>,
}

impl StoreConfig {
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            credential_path: environment.credential_path(),
            data_dir: None,
        }
    }

    pub fn with_credential_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credential_path = path.into();
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }
}

/// Reference length of the abort window before a run mutates a live
/// environment.
pub const CONFIRMATION_DELAY: Duration = Duration::from_secs(5);

/// Confirmation-gate options shared by the orchestrator and copier.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub skip_confirmation: bool,
    pub confirmation_delay: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            skip_confirmation: false,
            confirmation_delay: CONFIRMATION_DELAY,
        }
    }
}

impl RunOptions {
    /// Options with the confirmation window suppressed.
    pub fn confirmed() -> Self {
        Self {
            skip_confirmation: true,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }
}
