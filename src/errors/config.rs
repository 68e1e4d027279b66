// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while validating manifold graphs and engine settings
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A circular dependency was detected between manifolds
    CyclicDependency {
        /// The cycle path, starting and ending at the same manifold
        cycle: Vec<String>,
    },
    /// A manifold lists an input that no manifold in the topology provides
    UnresolvedInput {
        /// The manifold declaring the input
        manifold: String,
        /// The input that couldn't be resolved
        input: String,
    },
    /// Two manifolds in one topology share a name
    DuplicateManifold {
        /// The duplicate manifold name
        name: String,
    },
    /// A manifold was given an empty name
    EmptyManifoldName,
    /// An engine setting is outside its allowed range
    InvalidSetting {
        /// The offending setting, as named in config files
        setting: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::CyclicDependency { cycle } => {
                write!(f, "Cyclic dependency detected: {}", cycle.join(" -> "))
            }
            ValidationError::UnresolvedInput { manifold, input } => {
                write!(
                    f,
                    "Manifold '{}' depends on '{}' which is not defined",
                    manifold, input
                )
            }
            ValidationError::DuplicateManifold { name } => {
                write!(f, "Duplicate manifold name: '{}'", name)
            }
            ValidationError::EmptyManifoldName => write!(f, "Manifold name must not be empty"),
            ValidationError::InvalidSetting { setting, reason } => {
                write!(f, "Invalid value for '{}': {}", setting, reason)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Joins a list of validation errors into one line for display.
pub fn join_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors raised while loading engine configuration or topology files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported config format for {0} (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error("configuration validation failed: {}", join_validation_errors(.0))]
    Invalid(Vec<ValidationError>),
}
