//! Subscriptions with routing and auto-reconnect.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::callback::Binding;
use crate::connector::{AckMode, BrokerEvent, BrokerLink, Connector, Endpoint, Login};
use crate::error::{StompError, StompResult};
use crate::listener::{Listener, ListenerEvent};
use crate::tcp::StompConnector;

/// Port used when a subscription URL names none.
pub const DEFAULT_PORT: u16 = 61613;

/// Lifecycle of one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected
    Disconnected,
    /// A connection attempt is in progress
    Connecting,
    /// Connected and subscribed
    Connected,
    /// The last attempt failed
    Failed {
        /// Why it failed
        reason: String,
    },
}

/// A parsed subscription URL: `stomp://host:port/?destination=/queue/x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Broker address
    pub endpoint: Endpoint,
    /// Destination to subscribe to
    pub destination: String,
}

impl Subscription {
    /// Parse a subscription URL.
    pub fn parse(url: &str) -> StompResult<Self> {
        let invalid = |reason: &str| StompError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };
        let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
        let host = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| invalid("missing host"))?;
        let destination = parsed
            .query_pairs()
            .find(|(key, _)| key == "destination")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| invalid("missing destination query parameter"))?;
        Ok(Self {
            endpoint: Endpoint::new(host, parsed.port().unwrap_or(DEFAULT_PORT)),
            destination,
        })
    }
}

struct Connection {
    shutdown_tx: broadcast::Sender<()>,
    state: Arc<RwLock<ConnectionState>>,
    task: JoinHandle<()>,
}

/// Everything the event loop of one subscription needs.
struct Worker {
    connector: Arc<dyn Connector>,
    login: Login,
    subscription: Subscription,
    listener: Arc<Listener>,
    auto_reconnect: bool,
    state: Arc<RwLock<ConnectionState>>,
}

impl Worker {
    fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
    }

    /// Announce, connect, log in and subscribe.
    async fn establish(&self) -> StompResult<Box<dyn BrokerLink>> {
        let endpoint = &self.subscription.endpoint;
        self.set_state(ConnectionState::Connecting);
        self.listener
            .route(ListenerEvent::Connecting, endpoint.to_string());

        let attempt = async {
            let mut link = self.connector.connect(endpoint, &self.login).await?;
            link.subscribe(&self.subscription.destination, AckMode::Auto)
                .await?;
            Ok::<_, StompError>(link)
        };
        match attempt.await {
            Ok(link) => {
                self.set_state(ConnectionState::Connected);
                Ok(link)
            }
            Err(e) => {
                self.set_state(ConnectionState::Failed {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Reconnect until it works or the subscription is closed.
    async fn reconnect(
        &self,
        shutdown_rx: &mut broadcast::Receiver<()>,
    ) -> Option<Box<dyn BrokerLink>> {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            tokio::select! {
                _ = shutdown_rx.recv() => return None,
                result = self.establish() => match result {
                    Ok(link) => {
                        info!(
                            "Resubscribed to {} on {} after {} attempt(s)",
                            self.subscription.destination, self.subscription.endpoint, attempt
                        );
                        return Some(link);
                    }
                    Err(e) => warn!("Reconnect attempt {} to {} failed: {}", attempt, self.subscription.endpoint, e),
                },
            }
            tokio::task::yield_now().await;
        }
    }

    async fn run(self, mut link: Box<dyn BrokerLink>, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            let event = tokio::select! {
                _ = shutdown_rx.recv() => {
                    debug!("Subscription to {} received shutdown signal", self.subscription.destination);
                    link.disconnect().await;
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }
                event = link.next_event() => event,
            };

            match event {
                Some(BrokerEvent::Message(response)) => {
                    self.listener
                        .route(ListenerEvent::Message, Binding::Response(response));
                }
                Some(BrokerEvent::Error(response)) => {
                    self.listener
                        .route(ListenerEvent::Error, Binding::Response(response));
                }
                Some(BrokerEvent::HeartbeatTimeout) => {
                    self.listener
                        .route(ListenerEvent::HeartbeatTimeout, Binding::Null);
                }
                None => {
                    info!(
                        "Lost subscription to {} on {}",
                        self.subscription.destination, self.subscription.endpoint
                    );
                    self.set_state(ConnectionState::Disconnected);
                    self.listener
                        .route(ListenerEvent::Disconnected, Binding::Null);
                    if !self.auto_reconnect {
                        return;
                    }
                    match self.reconnect(&mut shutdown_rx).await {
                        Some(next) => link = next,
                        None => {
                            self.set_state(ConnectionState::Disconnected);
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// Subscribes to broker destinations and routes what arrives.
///
/// Each subscription URL owns at most one connection. [`listen`](Self::listen)
/// returns once the connection is subscribed; from then on a background task
/// routes messages, errors and heart-beat timeouts to the [`Listener`], and
/// with auto-reconnect re-establishes the subscription whenever the
/// connection drops, until [`close`](Self::close) is called.
pub struct Client {
    login: Login,
    connector: Arc<dyn Connector>,
    connections: DashMap<String, Connection>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("login", &self.login)
            .field("connector", &self.connector)
            .field("urls", &self.urls())
            .finish()
    }
}

impl Client {
    /// Client connecting over TCP.
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self::with_connector(user, password, Arc::new(StompConnector::new()))
    }

    /// Client using a custom connector.
    pub fn with_connector(
        user: impl Into<String>,
        password: impl Into<String>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            login: Login::new(user, password),
            connector,
            connections: DashMap::new(),
        }
    }

    /// Subscribe to the destination named by `url` and route its events to
    /// `listener`.
    ///
    /// Waits until the broker has accepted the login and the subscription
    /// was sent. Listening again on the same URL replaces the earlier
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or lacks a destination, or if
    /// the first connection attempt fails. Later failures are routed to the
    /// listener instead.
    pub async fn listen(
        &self,
        url: &str,
        listener: Arc<Listener>,
        auto_reconnect: bool,
    ) -> StompResult<()> {
        let subscription = Subscription::parse(url)?;
        self.close(url).await;

        let worker = Worker {
            connector: Arc::clone(&self.connector),
            login: self.login.clone(),
            subscription,
            listener,
            auto_reconnect,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
        };
        let link = worker.establish().await.inspect_err(|e| {
            error!("Failed to subscribe to {}: {}", url, e);
        })?;
        info!(
            "Listening on {} at {}",
            worker.subscription.destination, worker.subscription.endpoint
        );

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let state = Arc::clone(&worker.state);
        let task = tokio::spawn(worker.run(link, shutdown_rx));
        self.connections.insert(
            url.to_string(),
            Connection {
                shutdown_tx,
                state,
                task,
            },
        );
        Ok(())
    }

    /// Stop listening on `url` and disconnect. Unknown URLs are ignored.
    pub async fn close(&self, url: &str) {
        let Some((_, connection)) = self.connections.remove(url) else {
            return;
        };
        // No receiver means the task already ended.
        let _ = connection.shutdown_tx.send(());
        if let Err(e) = connection.task.await {
            warn!("Subscription task for {} ended abnormally: {}", url, e);
        }
        info!("Closed subscription {}", url);
    }

    /// Close every subscription.
    pub async fn close_all(&self) {
        for url in self.urls() {
            self.close(&url).await;
        }
    }

    /// Current state of the subscription on `url`.
    pub fn state(&self, url: &str) -> Option<ConnectionState> {
        self.connections
            .get(url)
            .map(|connection| connection.state.read().clone())
    }

    /// URLs with an open subscription, sorted.
    pub fn urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .connections
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        urls.sort();
        urls
    }
}
