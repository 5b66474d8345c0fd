//! Notebook configuration.
//!
//! Instances (credentials and namespace tables) and feed-table field maps
//! can be declared in a TOML, YAML or JSON file:
//!
//! ```toml
//! [instances.staging]
//! user = "admin"
//! password = "secret"
//!
//! [instances.staging.namespaces]
//! atom = "http://www.w3.org/2005/Atom"
//!
//! [tables.assets.id]
//! xpath = "atom:id"
//! title = "Id"
//! ```
//!
//! Environment variables prefixed with `RESTNOTE_` override file settings,
//! with `__` separating nested keys
//! (`RESTNOTE_INSTANCES__STAGING__PASSWORD=...`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use restnote_trace::Logger;
use restnote_xml::Namespaces;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::atom::FieldMap;
use crate::error::SessionResult;
use crate::registry::{Credentials, Instance, Registry};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "RESTNOTE";

/// Why a notebook configuration could not be loaded.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// No file at the given path
    #[error("no notebook configuration at {}", .0.display())]
    Missing(PathBuf),

    /// The extension names no format the loader reads
    #[error("{} is not a .toml, .yaml, .yml or .json file", .0.display())]
    UnknownFormat(PathBuf),

    /// The sources could not be read or do not describe a notebook
    #[error("invalid notebook configuration: {0}")]
    Invalid(#[from] config::ConfigError),
}

/// One configured instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// User name
    pub user: String,
    /// Password
    pub password: String,
    /// Namespace prefixes
    #[serde(default)]
    pub namespaces: Namespaces,
}

impl InstanceConfig {
    /// Credential pair of this instance.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.user, &self.password)
    }
}

/// Everything a notebook can read from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotebookConfig {
    /// Instances by name
    #[serde(default)]
    pub instances: BTreeMap<String, InstanceConfig>,
    /// Feed-table field maps by table name
    #[serde(default)]
    pub tables: BTreeMap<String, FieldMap>,
}

impl NotebookConfig {
    /// Read instances and tables from `path`.
    ///
    /// The extension picks the format. `RESTNOTE_`-prefixed environment
    /// variables are layered on top of the file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Missing`] or [`ConfigError::UnknownFormat`] for a bad
    /// path, [`ConfigError::Invalid`] when the merged sources do not
    /// deserialize into a notebook.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_with_prefix(path, ENV_PREFIX)
    }

    /// Like [`from_file`](Self::from_file), overriding from `env_prefix`
    /// variables instead.
    pub fn from_file_with_prefix(
        path: impl AsRef<Path>,
        env_prefix: &str,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }

        let config = config::Config::builder()
            .add_source(config::File::from(path).format(file_format(path)?))
            .add_source(
                config::Environment::with_prefix(env_prefix)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        debug!(
            "Loaded {} instance(s) and {} table(s) from {}",
            loaded.instances.len(),
            loaded.tables.len(),
            path.display()
        );
        Ok(loaded)
    }

    /// Register every configured instance, all sharing `logger`.
    pub fn register_all(
        &self,
        registry: &Registry,
        logger: Option<Arc<dyn Logger>>,
    ) -> SessionResult<Vec<Arc<Instance>>> {
        self.instances
            .iter()
            .map(|(name, instance)| {
                registry.register(
                    name,
                    instance.credentials(),
                    instance.namespaces.clone(),
                    logger.clone(),
                )
            })
            .collect()
    }

    /// Field map of a configured table.
    pub fn table(&self, name: &str) -> Option<&FieldMap> {
        self.tables.get(name)
    }
}

fn file_format(path: &Path) -> Result<config::FileFormat, ConfigError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("toml") => Ok(config::FileFormat::Toml),
        Some("yaml" | "yml") => Ok(config::FileFormat::Yaml),
        Some("json") => Ok(config::FileFormat::Json),
        _ => Err(ConfigError::UnknownFormat(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn write_config(extension: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{extension}"))
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const TOML: &str = r#"
[instances.staging]
user = "admin"
password = "secret"

[instances.staging.namespaces]
atom = "http://www.w3.org/2005/Atom"

[instances.prod]
user = "ops"
password = "hunter"

[tables.assets.id]
xpath = "atom:id"
title = "Id"

[tables.assets.status]
xpath = "v:status"
title = "Status"
color-map = { online = "green" }
"#;

    #[test]
    fn test_from_toml_file() {
        let file = write_config("toml", TOML);
        let config = NotebookConfig::from_file(file.path()).unwrap();

        let staging = &config.instances["staging"];
        assert_eq!(staging.user, "admin");
        assert_eq!(
            staging.namespaces.get("atom"),
            Some("http://www.w3.org/2005/Atom")
        );
        assert!(config.instances["prod"].namespaces.is_empty());

        let table = config.table("assets").unwrap();
        assert_eq!(table["id"].title, "Id");
        assert_eq!(
            table["status"].color_map.as_ref().unwrap()["online"],
            "green"
        );
    }

    #[test]
    fn test_from_json_file() {
        let file = write_config(
            "json",
            r#"{"instances": {"local": {"user": "u", "password": "p", "namespaces": {"app": "http://www.w3.org/2007/app"}}}}"#,
        );
        let config = NotebookConfig::from_file(file.path()).unwrap();
        assert_eq!(config.instances["local"].credentials(), Credentials::new("u", "p"));
        assert!(config.tables.is_empty());
    }

    #[test]
    fn test_missing_and_unsupported_files() {
        assert!(matches!(
            NotebookConfig::from_file("/definitely/not/here.toml"),
            Err(ConfigError::Missing(_))
        ));
        let file = write_config("ini", "[x]");
        assert!(matches!(
            NotebookConfig::from_file(file.path()),
            Err(ConfigError::UnknownFormat(_))
        ));
    }

    #[test]
    fn test_register_all() {
        let file = write_config("toml", TOML);
        let config = NotebookConfig::from_file(file.path()).unwrap();
        let registry = Registry::new();
        let instances = config.register_all(&registry, None).unwrap();
        assert_eq!(instances.len(), 2);
        assert_eq!(registry.names(), vec!["prod".to_string(), "staging".to_string()]);
        assert_eq!(
            registry.lookup("staging").unwrap().namespaces().get("atom"),
            Some("http://www.w3.org/2005/Atom")
        );
    }
}
