//! Environment-driven configuration.
//!
//! Everything here has a builder equivalent; [`Config`] only gathers the
//! knobs an application may want to expose without recompiling:
//!
//! | Variable                | Values                             | Default               |
//! |-------------------------|------------------------------------|-----------------------|
//! | `STRAND_WORKER_THREADS` | positive integer                   | available parallelism |
//! | `STRAND_FAULT_POLICY`   | `propagate` / `isolate` (any case) | `propagate`           |

use crate::runtime::Runtime;
use crate::runtime::builder::RuntimeBuilder;
use crate::serializer::{FaultPolicy, SerializerBuilder};

use std::env;
use std::thread;

use thiserror::Error;

/// Name of the variable holding the worker thread count.
pub const WORKER_THREADS_VAR: &str = "STRAND_WORKER_THREADS";

/// Name of the variable holding the serializer fault policy.
pub const FAULT_POLICY_VAR: &str = "STRAND_FAULT_POLICY";

/// Invalid configuration value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid STRAND_WORKER_THREADS `{value}`: expected a positive integer")]
    InvalidWorkerThreads { value: String },

    #[error("invalid STRAND_FAULT_POLICY `{value}`: expected `propagate` or `isolate`")]
    InvalidFaultPolicy { value: String },
}

/// Runtime and serializer settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Worker threads of the bundled runtime. Always > 0.
    pub worker_threads: usize,

    /// Policy given to serializers built through [`Config::serializer_builder`].
    pub fault_policy: FaultPolicy,
}

impl Default for Config {
    fn default() -> Self {
        let worker_threads = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        Self {
            worker_threads,
            fault_policy: FaultPolicy::default(),
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    ///
    /// Unset variables keep their default; set but invalid ones are errors.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = lookup(WORKER_THREADS_VAR) {
            config.worker_threads = match value.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => return Err(ConfigError::InvalidWorkerThreads { value }),
            };
        }

        if let Some(value) = lookup(FAULT_POLICY_VAR) {
            config.fault_policy = value.parse()?;
        }

        tracing::debug!(
            worker_threads = config.worker_threads,
            fault_policy = %config.fault_policy,
            "configuration loaded"
        );

        Ok(config)
    }

    /// Reads the process environment and starts a runtime configured from it.
    pub fn runtime_from_env() -> crate::Result<Runtime> {
        Self::runtime_from_lookup(|name| env::var(name).ok())
    }

    /// Like [`runtime_from_env`](Self::runtime_from_env), reading variables
    /// through `lookup`.
    pub fn runtime_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Runtime> {
        Self::from_lookup(lookup)?.runtime_builder().try_build()
    }

    /// A runtime builder preloaded with these settings.
    pub fn runtime_builder(&self) -> RuntimeBuilder {
        RuntimeBuilder::new().worker_threads(self.worker_threads)
    }

    /// A serializer builder preloaded with these settings.
    pub fn serializer_builder(&self) -> SerializerBuilder {
        SerializerBuilder::new().fault_policy(self.fault_policy)
    }
}
