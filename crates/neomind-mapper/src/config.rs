//! Mapper options.
//!
//! Defaults live in [`defaults`], environment variable names in [`env_vars`].
//! [`MapperConfig::from_env`] reads the variables and falls back to the
//! defaults for anything unset.

use std::fmt;
use std::str::FromStr;

use crate::error::MapperError;

/// How a first-sight type pair is added to an initialized registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistrationMode {
    /// Insert the new rule, leave the others untouched.
    #[default]
    Additive,
    /// Snapshot every rule and re-initialize with the snapshot plus the new rule.
    Rebuild,
}

impl FromStr for RegistrationMode {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "additive" | "add" => Ok(RegistrationMode::Additive),
            "rebuild" | "reset" => Ok(RegistrationMode::Rebuild),
            other => Err(MapperError::InvalidConfiguration(format!(
                "unknown registration mode: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for RegistrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationMode::Additive => f.write_str("additive"),
            RegistrationMode::Rebuild => f.write_str("rebuild"),
        }
    }
}

/// How destination member names are matched against source member names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameMatching {
    /// Byte-for-byte equal names only.
    Exact,
    /// Exact first, then equal after lower-casing and dropping `_` and `-`.
    #[default]
    Relaxed,
}

impl NameMatching {
    /// Canonical form of a member name under this matching mode.
    pub fn normalize(&self, name: &str) -> String {
        match self {
            NameMatching::Exact => name.to_string(),
            NameMatching::Relaxed => name
                .chars()
                .filter(|c| *c != '_' && *c != '-')
                .flat_map(char::to_lowercase)
                .collect(),
        }
    }
}

impl FromStr for NameMatching {
    type Err = MapperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(NameMatching::Exact),
            "relaxed" | "case-insensitive" => Ok(NameMatching::Relaxed),
            other => Err(MapperError::InvalidConfiguration(format!(
                "unknown name matching mode: {}",
                other
            ))),
        }
    }
}

/// Default option values.
pub mod defaults {
    use super::{NameMatching, RegistrationMode};

    pub const REGISTRATION_MODE: RegistrationMode = RegistrationMode::Additive;
    pub const NAME_MATCHING: NameMatching = NameMatching::Relaxed;
    /// Lazily registered rules do not fail on unmatched destination members.
    pub const STRICT_MEMBERS: bool = false;
}

/// Environment variable names.
pub mod env_vars {
    pub const REGISTRATION_MODE: &str = "MAPPER_REGISTRATION_MODE";
    pub const NAME_MATCHING: &str = "MAPPER_NAME_MATCHING";
    pub const STRICT_MEMBERS: &str = "MAPPER_STRICT_MEMBERS";
}

/// Options applied by a [`Mapper`](crate::Mapper).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperConfig {
    pub registration: RegistrationMode,
    pub name_matching: NameMatching,
    /// Strictness given to rules the mapper registers on its own.
    pub strict_members: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            registration: defaults::REGISTRATION_MODE,
            name_matching: defaults::NAME_MATCHING,
            strict_members: defaults::STRICT_MEMBERS,
        }
    }
}

impl MapperConfig {
    /// Read options from the environment, falling back to defaults.
    ///
    /// Unset variables use the default; a set variable that does not parse is an
    /// error.
    pub fn from_env() -> Result<Self, MapperError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`MapperConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MapperError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(env_vars::REGISTRATION_MODE) {
            config.registration = value.parse()?;
        }
        if let Some(value) = lookup(env_vars::NAME_MATCHING) {
            config.name_matching = value.parse()?;
        }
        if let Some(value) = lookup(env_vars::STRICT_MEMBERS) {
            config.strict_members = parse_flag(&value).ok_or_else(|| {
                MapperError::InvalidConfiguration(format!(
                    "{} must be a boolean, got '{}'",
                    env_vars::STRICT_MEMBERS,
                    value
                ))
            })?;
        }
        Ok(config)
    }

    pub fn with_registration(mut self, registration: RegistrationMode) -> Self {
        self.registration = registration;
        self
    }

    pub fn with_name_matching(mut self, name_matching: NameMatching) -> Self {
        self.name_matching = name_matching;
        self
    }

    pub fn with_strict_members(mut self, strict: bool) -> Self {
        self.strict_members = strict;
        self
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
