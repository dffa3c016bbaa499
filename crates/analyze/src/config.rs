//! Option resolution.
//!
//! Hosts hand over a loosely typed options bag (JSON from an editor's
//! plugin settings, the `[options]` table of `trytuple.toml`). [`resolve`]
//! turns it into one immutable [`PluginConfig`]. Resolution never fails:
//! unknown keys are ignored and a malformed field falls back to its own
//! default without disturbing the others.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{DeclaredTypes, TypeShape};

/// Severity attached to reported diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Fully resolved checker options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfig {
    pub severity: Severity,
    /// A two-element pattern may leave the error slot empty: `[value, ,]`.
    pub allow_ignored_error: bool,
    /// Calls to anything other than `tryCatch` are checked by type.
    pub check_wrapped_calls: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        PluginConfig {
            severity: Severity::Error,
            allow_ignored_error: true,
            check_wrapped_calls: true,
        }
    }
}

impl PluginConfig {
    pub fn builder() -> PluginConfigBuilder {
        PluginConfigBuilder::default()
    }
}

/// Resolve an options bag. Recognized keys: `errorLevel`
/// (`"error"`/`"warning"`), `allowIgnoredError`, `checkWrappedCalls`.
pub fn resolve(bag: &serde_json::Value) -> PluginConfig {
    PluginConfigBuilder::default().merge_bag(bag).build()
}

/// Layered construction of a [`PluginConfig`]: defaults, then an options
/// bag, then explicit overrides (CLI flags).
#[derive(Debug, Clone, Copy, Default)]
pub struct PluginConfigBuilder {
    config: PluginConfig,
}

impl PluginConfigBuilder {
    /// Start from an already resolved configuration.
    pub fn from_config(config: PluginConfig) -> Self {
        PluginConfigBuilder { config }
    }

    /// Apply the recognized keys present in `bag`.
    pub fn merge_bag(mut self, bag: &serde_json::Value) -> Self {
        let Some(bag) = bag.as_object() else {
            return self;
        };
        if let Some(level) = bag.get("errorLevel") {
            // Only the exact string "warning" downgrades.
            self.config.severity = match level.as_str() {
                Some("warning") => Severity::Warning,
                _ => Severity::Error,
            };
        }
        if let Some(flag) = bag.get("allowIgnoredError").and_then(|v| v.as_bool()) {
            self.config.allow_ignored_error = flag;
        }
        if let Some(flag) = bag.get("checkWrappedCalls").and_then(|v| v.as_bool()) {
            self.config.check_wrapped_calls = flag;
        }
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.config.severity = severity;
        self
    }

    pub fn allow_ignored_error(mut self, allow: bool) -> Self {
        self.config.allow_ignored_error = allow;
        self
    }

    pub fn check_wrapped_calls(mut self, check: bool) -> Self {
        self.config.check_wrapped_calls = check;
        self
    }

    pub fn build(self) -> PluginConfig {
        self.config
    }
}

/// Failure to load `trytuple.toml`. Individual option values never fail;
/// only an unreadable or syntactically broken file does.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid type declaration for '{callee}': {message}")]
    TypeDeclaration { callee: String, message: String },
}

/// Shape declared for a callee under `[types.<callee>]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeclaredShape {
    /// Member names the call result exposes.
    pub members: Vec<String>,
    /// The call result is the branded tuple (brand, "0" and "1").
    pub tracked: bool,
    /// The call result is a promise of the described shape.
    pub promise: bool,
}

impl DeclaredShape {
    pub fn to_shape(&self) -> TypeShape {
        let mut shape = if self.tracked {
            TypeShape::tracked_result()
        } else {
            TypeShape::opaque()
        };
        for member in &self.members {
            shape = shape.with_member(member);
        }
        if self.promise {
            TypeShape::promise_of(shape)
        } else {
            shape
        }
    }
}

/// Contents of a `trytuple.toml` file.
///
/// ```toml
/// [options]
/// errorLevel = "warning"
/// allowIgnoredError = false
///
/// [types."api.fetchUser"]
/// tracked = true
/// promise = true
/// ```
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    /// Raw `[options]` table, resolved lazily so bad values default.
    pub options: serde_json::Value,
    pub types: BTreeMap<String, DeclaredShape>,
}

impl ProjectConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, &path.display().to_string())
    }

    pub fn parse(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(text).map_err(|source| ConfigError::Toml {
            path: origin.to_string(),
            source,
        })?;

        let options = match table.get("options") {
            Some(value) => serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
            None => serde_json::Value::Null,
        };

        let mut types = BTreeMap::new();
        if let Some(declared) = table.get("types").and_then(|t| t.as_table()) {
            for (callee, value) in declared {
                let shape: DeclaredShape =
                    value
                        .clone()
                        .try_into()
                        .map_err(|e: toml::de::Error| ConfigError::TypeDeclaration {
                            callee: callee.clone(),
                            message: e.message().to_string(),
                        })?;
                types.insert(callee.clone(), shape);
            }
        }

        Ok(ProjectConfig { options, types })
    }

    pub fn plugin_config(&self) -> PluginConfig {
        resolve(&self.options)
    }

    pub fn declared_types(&self) -> DeclaredTypes {
        let mut declared = DeclaredTypes::new();
        for (callee, shape) in &self.types {
            declared.declare(callee, shape.to_shape());
        }
        declared
    }
}
