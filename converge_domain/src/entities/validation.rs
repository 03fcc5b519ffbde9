// /////////////////////////////////////////////////////////////////////////////
// Converge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Post-Execution Validation
//!
//! A `Validation` is a probe the engine runs after a pipeline has been
//! applied: does a command resolve on PATH, does a file exist, does a file
//! contain a given text. Each validation type requires specific string keys
//! in its configuration map; the entity checks those eagerly so a bad check
//! is reported before any step runs.

use crate::error::DomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Closed set of validation type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationType {
    CommandExists,
    FileExists,
    PathContains,
}

impl ValidationType {
    /// Stable string form used in configuration files and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationType::CommandExists => "command_exists",
            ValidationType::FileExists => "file_exists",
            ValidationType::PathContains => "path_contains",
        }
    }

    /// Required configuration keys for this validation type.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            ValidationType::CommandExists => &["command"],
            ValidationType::FileExists => &["path"],
            ValidationType::PathContains => &["file", "text"],
        }
    }
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Post-execution check declared by a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    #[serde(rename = "type")]
    validation_type: ValidationType,
    #[serde(default)]
    config: HashMap<String, Value>,
}

impl Validation {
    /// Creates a validation of the given type with an empty configuration.
    pub fn new(validation_type: ValidationType) -> Self {
        Self {
            validation_type,
            config: HashMap::new(),
        }
    }

    /// Inserts a configuration entry
    pub fn with_config_entry(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Gets the type tag
    pub fn validation_type(&self) -> ValidationType {
        self.validation_type
    }

    /// Gets the configuration map
    pub fn config(&self) -> &HashMap<String, Value> {
        &self.config
    }

    /// Resolves a required string key, running the same checks as
    /// [`validate`](Validation::validate) for that single key.
    ///
    /// # Errors
    ///
    /// - `MISSING_REQUIRED` - the key is absent
    /// - `VALIDATION_ERROR` - the value is not a string, or is empty
    pub fn required_string(&self, key: &str) -> Result<&str, DomainError> {
        let value = self.config.get(key).ok_or_else(|| {
            DomainError::missing_required(format!(
                "validation '{}' requires key '{}'",
                self.validation_type, key
            ))
            .with_context("field", key)
        })?;
        let text = value.as_str().ok_or_else(|| {
            DomainError::validation(format!(
                "validation '{}' key '{}' must be a string",
                self.validation_type, key
            ))
            .with_context("field", key)
        })?;
        if text.is_empty() {
            return Err(DomainError::validation(format!(
                "validation '{}' key '{}' cannot be empty",
                self.validation_type, key
            ))
            .with_context("field", key));
        }
        Ok(text)
    }

    /// Validates that every key required by the type is present and a
    /// non-empty string.
    pub fn validate(&self) -> Result<(), DomainError> {
        for key in self.validation_type.required_keys() {
            self.required_string(key)?;
        }
        Ok(())
    }

    /// Short human-readable label for reports, e.g. `command_exists:kubectl`.
    pub fn label(&self) -> String {
        let subject = self
            .validation_type
            .required_keys()
            .first()
            .and_then(|key| self.config.get(*key))
            .and_then(Value::as_str)
            .unwrap_or("?");
        format!("{}:{}", self.validation_type, subject)
    }
}
