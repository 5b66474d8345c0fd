//! Named instances.
//!
//! An [`Instance`] bundles credentials, a namespace table, an HTTP client and
//! an optional logger. Instances live in a [`Registry`] and every session
//! operation looks its instance up by name, so several configured targets
//! ("staging", "prod") can be used side by side.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use restnote_trace::{LogEvent, Logger};
use restnote_xml::Namespaces;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{SessionError, SessionResult};

/// User name and password used for HTTP Basic authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// User name
    pub user: String,
    /// Password
    pub password: String,
}

impl Credentials {
    /// Create a credential pair.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A named, independently configured session target.
#[derive(Debug)]
pub struct Instance {
    name: String,
    credentials: Credentials,
    namespaces: Namespaces,
    client: reqwest::Client,
    logger: Option<Arc<dyn Logger>>,
}

impl Instance {
    /// Create an instance with its own HTTP client.
    ///
    /// No request timeout is configured; calls are bounded by the
    /// transport's own defaults.
    pub fn new(
        name: impl Into<String>,
        credentials: Credentials,
        namespaces: Namespaces,
        logger: Option<Arc<dyn Logger>>,
    ) -> SessionResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("restnote/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            name: name.into(),
            credentials,
            namespaces,
            client,
            logger,
        })
    }

    /// Registry key.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Credentials applied to every request.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Namespace table used for every path evaluation.
    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }

    /// Underlying HTTP client.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Logger, if any.
    pub fn logger(&self) -> Option<&Arc<dyn Logger>> {
        self.logger.as_ref()
    }

    /// Emit to the logger. Without a logger this does nothing.
    pub fn emit(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            logger.emit(event);
        }
    }

    /// Whether the logger renders markup.
    pub fn is_graphical(&self) -> bool {
        self.logger.as_ref().is_some_and(|l| l.is_graphical())
    }
}

/// Instances by name.
///
/// Cloning a registry yields another handle to the same instances.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    instances: Arc<RwLock<HashMap<String, Arc<Instance>>>>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register an instance. An instance already registered
    /// under `name` is replaced.
    pub fn register(
        &self,
        name: &str,
        credentials: Credentials,
        namespaces: Namespaces,
        logger: Option<Arc<dyn Logger>>,
    ) -> SessionResult<Arc<Instance>> {
        let instance = Instance::new(name, credentials, namespaces, logger)?;
        Ok(self.insert(instance))
    }

    /// Register a prepared instance under its own name, replacing any
    /// previous one.
    pub fn insert(&self, instance: Instance) -> Arc<Instance> {
        let instance = Arc::new(instance);
        let previous = self
            .instances
            .write()
            .insert(instance.name.clone(), Arc::clone(&instance));
        if previous.is_some() {
            debug!("Replaced instance '{}'", instance.name);
        } else {
            info!("Registered instance '{}'", instance.name);
        }
        instance
    }

    /// Look up an instance.
    pub fn lookup(&self, name: &str) -> SessionResult<Arc<Instance>> {
        self.instances
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SessionError::NotFound {
                name: name.to_string(),
            })
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.instances.read().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.instances.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Close the logger of every instance.
    pub fn close_loggers(&self) {
        for instance in self.instances.read().values() {
            if let Some(logger) = &instance.logger {
                logger.close();
            }
        }
    }
}
