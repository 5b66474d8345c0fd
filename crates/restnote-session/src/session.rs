//! The session facade over a [`Registry`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use restnote_trace::{LogEvent, MuteGuard};
use restnote_xml::Namespaces;
use tracing::info;

use crate::error::SessionResult;
use crate::registry::{Credentials, Instance, Registry};

/// Startup hook run by [`Session::init`] once the instance is registered.
///
/// ```rust
/// use std::future::Future;
/// use std::pin::Pin;
/// use restnote_session::{Session, SessionResult, SessionSetup};
///
/// #[derive(Debug)]
/// struct Greeting;
///
/// impl SessionSetup for Greeting {
///     fn start<'a>(
///         &'a self,
///         session: &'a Session,
///         name: &'a str,
///     ) -> Pin<Box<dyn Future<Output = SessionResult<()>> + Send + 'a>> {
///         Box::pin(async move { session.title(name, "Session started") })
///     }
/// }
/// ```
pub trait SessionSetup: Send + Sync {
    /// Run after the instance named `name` has been registered.
    fn start<'a>(
        &'a self,
        session: &'a Session,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = SessionResult<()>> + Send + 'a>>;
}

/// Entry point for every instrumented operation.
///
/// Operations take the instance `name` as their first argument and look it
/// up on each call.
#[derive(Debug, Clone, Default)]
pub struct Session {
    registry: Registry,
}

impl Session {
    /// A session over a fresh registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A session over an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    /// The registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Look up an instance.
    pub fn instance(&self, name: &str) -> SessionResult<Arc<Instance>> {
        self.registry.lookup(name)
    }

    /// Register an instance under `name` and run the startup hook.
    pub async fn init(
        &self,
        name: &str,
        credentials: Credentials,
        namespaces: Namespaces,
        logger: Option<Arc<dyn restnote_trace::Logger>>,
        setup: Option<&dyn SessionSetup>,
    ) -> SessionResult<Arc<Instance>> {
        let instance = self
            .registry
            .register(name, credentials, namespaces, logger)?;
        if let Some(setup) = setup {
            setup.start(self, name).await?;
        }
        info!("Instance '{}' started", name);
        Ok(instance)
    }

    /// Emit an event to the instance's logger.
    pub fn log(&self, name: &str, event: LogEvent) -> SessionResult<()> {
        self.instance(name)?.emit(event);
        Ok(())
    }

    /// Emit a comment.
    pub fn comment(&self, name: &str, text: impl Into<String>) -> SessionResult<()> {
        self.log(name, LogEvent::comment(text))
    }

    /// Emit a title.
    pub fn title(&self, name: &str, text: impl Into<String>) -> SessionResult<()> {
        self.log(name, LogEvent::title(text))
    }

    /// Emit a success line.
    pub fn ok(&self, name: &str, text: impl Into<String>) -> SessionResult<()> {
        self.log(name, LogEvent::ok(text))
    }

    /// Emit an error line.
    pub fn error(&self, name: &str, text: impl Into<String>) -> SessionResult<()> {
        self.log(name, LogEvent::error(text))
    }

    /// Colour `value` through the instance's logger.
    ///
    /// Without a logger, or for an unknown colour name, the value is
    /// returned unchanged.
    pub fn colorize(&self, name: &str, value: &str, color: &str) -> SessionResult<String> {
        let instance = self.instance(name)?;
        Ok(match instance.logger() {
            Some(logger) => logger.colorize_named(value, color),
            None => value.to_string(),
        })
    }

    /// Mute the instance's logger until the guard is dropped.
    ///
    /// `None` when the instance has no logger.
    pub fn suppress(&self, name: &str) -> SessionResult<Option<MuteGuard>> {
        let instance = self.instance(name)?;
        Ok(instance.logger().map(|l| l.mute_state().suppress()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use pretty_assertions::assert_eq;
    use restnote_trace::{EventKind, MemoryLogger};

    #[derive(Debug)]
    struct TitleSetup;

    impl SessionSetup for TitleSetup {
        fn start<'a>(
            &'a self,
            session: &'a Session,
            name: &'a str,
        ) -> Pin<Box<dyn Future<Output = SessionResult<()>> + Send + 'a>> {
            Box::pin(async move {
                let instance = session.instance(name)?;
                session.title(name, format!("{} as {}", name, instance.credentials().user))
            })
        }
    }

    fn session_with_logger(logger: Arc<MemoryLogger>) -> Session {
        let session = Session::new();
        session
            .registry()
            .register("nb", Credentials::new("u", "p"), Namespaces::new(), Some(logger))
            .unwrap();
        session
    }

    #[tokio::test]
    async fn test_init_runs_startup_hook_after_registering() {
        let session = Session::new();
        let logger = Arc::new(MemoryLogger::new());
        session
            .init(
                "staging",
                Credentials::new("admin", "pw"),
                Namespaces::new(),
                Some(logger.clone()),
                Some(&TitleSetup),
            )
            .await
            .unwrap();
        assert_eq!(logger.descriptions(), vec!["staging as admin"]);
        assert_eq!(logger.kinds(), vec![EventKind::Title]);
    }

    #[test]
    fn test_logging_helpers() {
        let logger = Arc::new(MemoryLogger::new());
        let session = session_with_logger(logger.clone());
        session.comment("nb", "c").unwrap();
        session.ok("nb", "o").unwrap();
        session.error("nb", "e").unwrap();
        assert_eq!(
            logger.kinds(),
            vec![EventKind::Comment, EventKind::Ok, EventKind::Error]
        );
        assert!(matches!(
            session.comment("missing", "x"),
            Err(SessionError::NotFound { .. })
        ));
    }

    #[test]
    fn test_colorize_passthrough_rules() {
        let session = session_with_logger(Arc::new(MemoryLogger::graphical()));
        assert_eq!(session.colorize("nb", "on", "green").unwrap(), "<green>on</green>");
        assert_eq!(session.colorize("nb", "on", "ultraviolet").unwrap(), "on");

        session
            .registry()
            .register("bare", Credentials::new("u", "p"), Namespaces::new(), None)
            .unwrap();
        assert_eq!(session.colorize("bare", "on", "green").unwrap(), "on");
        assert!(session.colorize("missing", "on", "green").is_err());
    }

    #[test]
    fn test_suppress_scope() {
        let logger = Arc::new(MemoryLogger::new());
        let session = session_with_logger(logger.clone());
        {
            let _quiet = session.suppress("nb").unwrap();
            session.comment("nb", "hidden").unwrap();
        }
        session.comment("nb", "shown").unwrap();
        assert_eq!(logger.descriptions(), vec!["shown"]);
    }
}
