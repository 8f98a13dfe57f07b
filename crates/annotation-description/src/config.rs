// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Environment-driven configuration.
//!
//! Settings are read through the [`Environment`] trait so that tests can supply values with a
//! [`MapEnvironment`] instead of mutating the process environment.

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::warn;

/// Maximum nesting depth of annotation values walked by structural equality, hashing, display
/// and serialization.
pub const EXO_ANNOTATION_MAX_DEPTH: &str = "EXO_ANNOTATION_MAX_DEPTH";

pub const DEFAULT_MAX_DEPTH: usize = 64;

pub trait Environment: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn get_usize(&self, key: &str, default_value: usize) -> Result<usize, EnvError> {
        match self.get(key) {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| EnvError::InvalidNumber {
                    key: key.to_string(),
                    value,
                }),
            None => Ok(default_value),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Invalid value for {key}: {value}. Expected a non-negative integer")]
    InvalidNumber { key: String, value: String },

    #[error("Invalid value for {key}: {value}. {message}")]
    OutOfRange {
        key: &'static str,
        value: usize,
        message: &'static str,
    },
}

pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Default)]
pub struct MapEnvironment {
    values: HashMap<String, String>,
}

impl Environment for MapEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for MapEnvironment {
    fn from(values: [(&str, &str); N]) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptionConfig {
    pub max_depth: usize,
}

impl Default for DescriptionConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl DescriptionConfig {
    pub fn from_env(env: &dyn Environment) -> Result<Self, EnvError> {
        let max_depth = env.get_usize(EXO_ANNOTATION_MAX_DEPTH, DEFAULT_MAX_DEPTH)?;

        if max_depth == 0 {
            return Err(EnvError::OutOfRange {
                key: EXO_ANNOTATION_MAX_DEPTH,
                value: max_depth,
                message: "Must be at least 1",
            });
        }

        Ok(Self { max_depth })
    }

    /// The process-wide configuration, read from the system environment on first use.
    pub fn current() -> &'static DescriptionConfig {
        static CURRENT: OnceLock<DescriptionConfig> = OnceLock::new();

        CURRENT.get_or_init(|| {
            DescriptionConfig::from_env(&SystemEnvironment).unwrap_or_else(|err| {
                warn!("{err}. Falling back to the default configuration");
                DescriptionConfig::default()
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn defaults_without_env() {
        let config = DescriptionConfig::from_env(&MapEnvironment::new()).unwrap();
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }

    #[test]
    fn reads_max_depth() {
        let env = MapEnvironment::from([(EXO_ANNOTATION_MAX_DEPTH, " 8 ")]);
        let config = DescriptionConfig::from_env(&env).unwrap();
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn rejects_invalid_max_depth() {
        let mut env = MapEnvironment::new();

        env.set(EXO_ANNOTATION_MAX_DEPTH, "deep");
        assert!(matches!(
            DescriptionConfig::from_env(&env),
            Err(EnvError::InvalidNumber { .. })
        ));

        env.set(EXO_ANNOTATION_MAX_DEPTH, "0");
        assert!(matches!(
            DescriptionConfig::from_env(&env),
            Err(EnvError::OutOfRange { value: 0, .. })
        ));
    }
}
