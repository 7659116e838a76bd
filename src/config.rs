//! Orchestrator configuration.
//!
//! Configuration is plain data with builder-style setters. Hosts that want to
//! drive it from the process environment use [`OrchestratorConfig::from_env`]:
//!
//! | variable | values |
//! |---|---|
//! | `MODLINK_FORCE_DEBUG` | `1`/`true`/`yes`/`on` or `0`/`false`/`no`/`off` |
//! | `MODLINK_OBSERVE` | `snapshot` or `continuous` |
//!
//! Environment configuration always starts from [`BuildPolicy::detect`], so
//! development builds force debug mode and `MODLINK_FORCE_DEBUG` can only add
//! to that. A value outside the table is a [`ConfigError`] wherever it is
//! read; [`Orchestrator::global`](crate::Orchestrator::global), which has no
//! caller to return it to, logs it and uses `detect` with default observation.
//! [`OrchestratorConfig::default`] never looks at the build or the
//! environment.

use log::warn;
use modlink_registry::ObservationPolicy;

use crate::error::ConfigError;

pub const FORCE_DEBUG_VAR: &str = "MODLINK_FORCE_DEBUG";
pub const OBSERVE_VAR: &str = "MODLINK_OBSERVE";

/// Host override of the caller's build-mode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BuildPolicy {
    /// Build every module in debug mode whatever the caller asked for.
    pub force_debug: bool,
}

impl BuildPolicy {
    /// Policy that honours the caller's flag.
    pub fn as_requested() -> Self {
        Self { force_debug: false }
    }

    /// Policy that forces debug mode.
    pub fn always_debug() -> Self {
        Self { force_debug: true }
    }

    /// Force debug in development builds (`debug_assertions`).
    pub fn detect() -> Self {
        Self {
            force_debug: cfg!(debug_assertions),
        }
    }

    /// The build mode actually used for a request.
    pub fn effective_debug(&self, requested: bool) -> bool {
        requested || self.force_debug
    }
}

/// Settings for an [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrchestratorConfig {
    pub build: BuildPolicy,
    pub observation: ObservationPolicy,
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `MODLINK_FORCE_DEBUG` and `MODLINK_OBSERVE` on top of
    /// [`BuildPolicy::detect`] and the default observation policy.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default().with_build(BuildPolicy::detect());

        if let Some(value) = lookup(FORCE_DEBUG_VAR) {
            let flag = parse_flag(&value).ok_or_else(|| ConfigError::InvalidValue {
                var: FORCE_DEBUG_VAR,
                value: value.clone(),
                expected: "a boolean flag",
            })?;
            config.build.force_debug |= flag;
        }

        if let Some(value) = lookup(OBSERVE_VAR) {
            config.observation = match value.trim().to_ascii_lowercase().as_str() {
                "snapshot" => ObservationPolicy::Snapshot,
                "continuous" => ObservationPolicy::Continuous,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: OBSERVE_VAR,
                        value,
                        expected: "`snapshot` or `continuous`",
                    });
                }
            };
        }

        Ok(config)
    }

    /// [`from_lookup`](Self::from_lookup) for callers that cannot fail: an
    /// invalid value is logged and replaced by [`BuildPolicy::detect`] with
    /// default observation.
    pub(crate) fn from_lookup_or_detect(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::from_lookup(lookup).unwrap_or_else(|err| {
            warn!("ignoring environment configuration: {err}");
            Self::default().with_build(BuildPolicy::detect())
        })
    }

    pub fn with_build(mut self, build: BuildPolicy) -> Self {
        self.build = build;
        self
    }

    pub fn with_observation(mut self, observation: ObservationPolicy) -> Self {
        self.observation = observation;
        self
    }

    pub fn force_debug(mut self, force: bool) -> Self {
        self.build.force_debug = force;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
