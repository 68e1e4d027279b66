// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors returned when a start function asks its context for a dependency.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The name is not one of the manifold's declared inputs. This is a
    /// programming error in the manifold, never an operational condition.
    #[error("resource '{name}' is not a declared input")]
    Missing { name: String },

    /// The input is declared but not running right now, or its output could
    /// not be narrowed to the requested type.
    #[error("resource '{name}' is unavailable")]
    Unavailable { name: String },

    /// Returned by output functions that cannot fill the requested slot type.
    #[error("output does not provide {requested}")]
    UnsupportedOutput { requested: &'static str },
}

impl ResourceError {
    pub fn missing(name: impl Into<String>) -> Self {
        ResourceError::Missing { name: name.into() }
    }

    pub fn unavailable(name: impl Into<String>) -> Self {
        ResourceError::Unavailable { name: name.into() }
    }
}
