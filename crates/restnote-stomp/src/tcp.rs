//! STOMP 1.2 over TCP.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};

use crate::codec::StompCodec;
use crate::connector::{AckMode, BrokerEvent, BrokerLink, Connector, Endpoint, Login};
use crate::error::{StompError, StompResult};
use crate::frame::{Command, Frame, HeartBeat, StompItem};
use crate::response::Response;

/// Heart-beat periods requested by default (milliseconds).
pub const DEFAULT_HEARTBEAT: HeartBeat = HeartBeat::new(10_000, 10_000);

/// Opens STOMP connections over TCP.
#[derive(Debug, Clone)]
pub struct StompConnector {
    heartbeat: HeartBeat,
    connect_timeout: Option<Duration>,
    max_frame_size: usize,
}

impl Default for StompConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl StompConnector {
    /// Connector with default heart-beats and no connect timeout.
    pub fn new() -> Self {
        Self {
            heartbeat: DEFAULT_HEARTBEAT,
            connect_timeout: None,
            max_frame_size: crate::codec::DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Heart-beat periods to request. `HeartBeat::default()` disables them.
    #[must_use]
    pub fn with_heartbeat(mut self, heartbeat: HeartBeat) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    /// Give up on a connection attempt after `limit`.
    #[must_use]
    pub fn with_connect_timeout(mut self, limit: Duration) -> Self {
        self.connect_timeout = Some(limit);
        self
    }

    /// Largest frame accepted from the broker.
    #[must_use]
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    async fn open(&self, endpoint: &Endpoint, login: &Login) -> StompResult<StompLink> {
        info!("Connecting to STOMP broker at {}", endpoint);
        let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
        let stream = match self.connect_timeout {
            Some(limit) => timeout(limit, connect).await.map_err(|_| {
                StompError::ConnectionFailed(format!("Timed out connecting to {endpoint}"))
            })?,
            None => connect.await,
        }
        .map_err(|e| StompError::ConnectionFailed(format!("Failed to connect to {endpoint}: {e}")))?;

        let mut framed = Framed::new(stream, StompCodec::with_max_frame_size(self.max_frame_size));
        let connect_frame = Frame::new(Command::Connect)
            .header("accept-version", "1.2")
            .header("host", endpoint.host.clone())
            .header("login", login.user.clone())
            .header("passcode", login.passcode.clone())
            .header("heart-beat", self.heartbeat.to_header());
        framed.send(StompItem::Frame(connect_frame)).await?;

        let connected = loop {
            match framed.next().await {
                Some(Ok(StompItem::Heartbeat)) => continue,
                Some(Ok(StompItem::Frame(frame))) => match frame.command {
                    Command::Connected => break frame,
                    Command::Error => {
                        let message = frame
                            .get("message")
                            .map(str::to_string)
                            .unwrap_or_else(|| String::from_utf8_lossy(&frame.body).into_owned());
                        warn!("STOMP broker at {} rejected login: {}", endpoint, message);
                        return Err(StompError::Rejected { message });
                    }
                    other => {
                        return Err(StompError::Protocol(format!(
                            "expected CONNECTED, got {other}"
                        )));
                    }
                },
                Some(Err(e)) => return Err(e),
                None => {
                    return Err(StompError::ConnectionFailed(format!(
                        "{endpoint} closed the connection during login"
                    )));
                }
            }
        };

        let server = match connected.get("heart-beat") {
            Some(value) => HeartBeat::parse(value)?,
            None => HeartBeat::default(),
        };
        let (outgoing, incoming) = self.heartbeat.negotiate(server);
        debug!(
            "STOMP session with {} established (version {:?}, send every {}ms, expect every {}ms)",
            endpoint,
            connected.get("version"),
            outgoing,
            incoming
        );

        let now = Instant::now();
        Ok(StompLink {
            framed,
            endpoint: endpoint.clone(),
            send_every: (outgoing > 0).then(|| Duration::from_millis(outgoing)),
            silence_limit: (incoming > 0).then(|| Duration::from_millis(incoming * 2)),
            last_sent: now,
            last_received: now,
            next_subscription: 0,
            timed_out: false,
            closed: false,
        })
    }
}

impl Connector for StompConnector {
    fn connect<'a>(
        &'a self,
        endpoint: &'a Endpoint,
        login: &'a Login,
    ) -> BoxFuture<'a, StompResult<Box<dyn BrokerLink>>> {
        Box::pin(async move {
            let link = self.open(endpoint, login).await?;
            Ok(Box::new(link) as Box<dyn BrokerLink>)
        })
    }
}

enum Step {
    Item(Option<StompResult<StompItem>>),
    Beat,
    Silent,
}

/// A logged-in STOMP connection.
pub struct StompLink {
    framed: Framed<TcpStream, StompCodec>,
    endpoint: Endpoint,
    send_every: Option<Duration>,
    silence_limit: Option<Duration>,
    last_sent: Instant,
    last_received: Instant,
    next_subscription: u64,
    timed_out: bool,
    closed: bool,
}

impl std::fmt::Debug for StompLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StompLink")
            .field("endpoint", &self.endpoint)
            .field("send_every", &self.send_every)
            .field("silence_limit", &self.silence_limit)
            .field("closed", &self.closed)
            .finish()
    }
}

impl StompLink {
    async fn send(&mut self, item: StompItem) -> StompResult<()> {
        self.framed.send(item).await?;
        self.last_sent = Instant::now();
        Ok(())
    }

    async fn next(&mut self) -> Option<BrokerEvent> {
        if self.closed {
            return None;
        }
        if self.timed_out {
            self.closed = true;
            return None;
        }
        loop {
            let step = {
                let silence_deadline = self.silence_limit.map(|limit| self.last_received + limit);
                let beat_deadline = self.send_every.map(|every| self.last_sent + every);
                tokio::select! {
                    item = self.framed.next() => Step::Item(item),
                    () = sleep_until(beat_deadline.unwrap_or_else(Instant::now)), if beat_deadline.is_some() => Step::Beat,
                    () = sleep_until(silence_deadline.unwrap_or_else(Instant::now)), if silence_deadline.is_some() => Step::Silent,
                }
            };

            match step {
                Step::Item(Some(Ok(item))) => {
                    self.last_received = Instant::now();
                    let StompItem::Frame(frame) = item else {
                        trace!("Heart-beat from {}", self.endpoint);
                        continue;
                    };
                    match frame.command {
                        Command::Message => return Some(BrokerEvent::Message(Response::message(frame))),
                        Command::Error => return Some(BrokerEvent::Error(Response::error(frame))),
                        other => debug!("Ignoring {} frame from {}", other, self.endpoint),
                    }
                }
                Step::Item(Some(Err(e))) => {
                    warn!("STOMP connection to {} failed: {}", self.endpoint, e);
                    self.closed = true;
                    return None;
                }
                Step::Item(None) => {
                    info!("STOMP broker at {} closed the connection", self.endpoint);
                    self.closed = true;
                    return None;
                }
                Step::Beat => {
                    if let Err(e) = self.send(StompItem::Heartbeat).await {
                        warn!("Failed to send heart-beat to {}: {}", self.endpoint, e);
                        self.closed = true;
                        return None;
                    }
                }
                Step::Silent => {
                    warn!("No heart-beat from {} within {:?}", self.endpoint, self.silence_limit);
                    self.timed_out = true;
                    return Some(BrokerEvent::HeartbeatTimeout);
                }
            }
        }
    }
}

impl BrokerLink for StompLink {
    fn subscribe<'a>(
        &'a mut self,
        destination: &'a str,
        ack: AckMode,
    ) -> BoxFuture<'a, StompResult<()>> {
        Box::pin(async move {
            let id = format!("sub-{}", self.next_subscription);
            self.next_subscription += 1;
            let frame = Frame::new(Command::Subscribe)
                .header("id", id.clone())
                .header("destination", destination)
                .header("ack", ack.as_str());
            self.send(StompItem::Frame(frame)).await?;
            info!("Subscribed to {} on {} as {}", destination, self.endpoint, id);
            Ok(())
        })
    }

    fn next_event(&mut self) -> BoxFuture<'_, Option<BrokerEvent>> {
        Box::pin(self.next())
    }

    fn disconnect(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if self.closed {
                return;
            }
            self.closed = true;
            if let Err(e) = self.send(StompItem::Frame(Frame::new(Command::Disconnect))).await {
                debug!("DISCONNECT to {} not delivered: {}", self.endpoint, e);
            }
            if let Err(e) = self.framed.close().await {
                debug!("Closing connection to {} failed: {}", self.endpoint, e);
            }
            info!("Disconnected from STOMP broker at {}", self.endpoint);
        })
    }
}
