//! # Printer Session
//!
//! A synchronous request/response state machine over a [`Transport`].
//!
//! ```text
//!                connect()
//! Disconnected ───────────▶ Idle ◀──────────────┐
//!      ▲                    │  │                 │
//!      │ transport failure  │  │ query()         │ reply / timeout /
//!      └────────────────────┤  └──▶ AwaitingResponse ─┘ malformed / cancelled
//!                           │
//!                           └──▶ Printing ──▶ Idle   (print, no reply)
//! ```
//!
//! The device handles one command at a time, so the session holds at most
//! one outstanding request. Callers sharing a printer across threads wrap the
//! session in a [`SharedSession`].
//!
//! ## Stale Replies
//!
//! A reply to an abandoned request (timed out or cancelled) can still arrive
//! later. Before every request the session discards whatever the transport
//! has already buffered, so a late reply is never read as the answer to the
//! next request.
//!
//! ## Example
//!
//! ```
//! use nelko::session::{Session, SessionConfig};
//! use nelko::transport::MockTransport;
//!
//! let mock = MockTransport::new();
//! mock.reply(b"BATTERY?", b"BATTERY \x80\x00");
//!
//! let mut session = Session::new(SessionConfig::default());
//! session.connect(mock)?;
//! let battery = session.battery()?;
//! assert_eq!(battery.percent(), Some(80));
//! # Ok::<(), nelko::error::NelkoError>(())
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::NelkoError;
use crate::job::PrintJob;
use crate::protocol::commands::{Command, Escape, Query};
use crate::protocol::response::{
    self, BatteryStatus, ConfigStatus, DeviceStatus, PauseCancelAck, ReadyStatus, ReplyKind,
    TrailerMode,
};
use crate::protocol::tspl::{self, EncodeOptions, Statement};
use crate::transport::Transport;

/// Upper bound on reads while discarding stale bytes.
const MAX_DRAIN_READS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Idle,
    AwaitingResponse,
    Printing,
}

/// Session tunables.
#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    /// How long a request waits for a complete reply
    pub response_timeout: Duration,
    /// Longest single transport read; cancellation is checked between reads
    pub poll_interval: Duration,
    pub trailer_mode: TrailerMode,
    pub encode: EncodeOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(1),
            poll_interval: Duration::from_millis(50),
            trailer_mode: TrailerMode::default(),
            encode: EncodeOptions::default(),
        }
    }
}

impl SessionConfig {
    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn trailer_mode(mut self, mode: TrailerMode) -> Self {
        self.trailer_mode = mode;
        self
    }

    pub fn encode_options(mut self, options: EncodeOptions) -> Self {
        self.encode = options;
        self
    }
}

/// Aborts the request a session is currently waiting on.
///
/// Clones share one flag. The flag is cleared when the next request starts,
/// so a cancel only affects the wait in progress.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// A session serialised behind a mutex for use from several threads.
pub type SharedSession<T> = Arc<Mutex<Session<T>>>;

pub struct Session<T: Transport> {
    transport: Option<T>,
    state: SessionState,
    config: SessionConfig,
    cancel: CancelHandle,
}

impl<T: Transport> Session<T> {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            transport: None,
            state: SessionState::Disconnected,
            config,
            cancel: CancelHandle::default(),
        }
    }

    /// Bind a transport. No handshake is performed.
    pub fn connect(&mut self, transport: T) -> Result<(), NelkoError> {
        self.expect_state(SessionState::Disconnected)?;
        self.transport = Some(transport);
        self.state = SessionState::Idle;
        info!("Session connected");
        Ok(())
    }

    /// Release the transport and return to `Disconnected`.
    pub fn disconnect(&mut self) -> Option<T> {
        self.state = SessionState::Disconnected;
        let transport = self.transport.take();
        if transport.is_some() {
            info!("Session disconnected");
        }
        transport
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state != SessionState::Disconnected
    }

    pub fn settings(&self) -> &SessionConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn shared(self) -> SharedSession<T> {
        Arc::new(Mutex::new(self))
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Send a query by name (`"BATTERY?"`, `"CONFIG?"`) and decode the reply.
    pub fn query(&mut self, name: &str) -> Result<DeviceStatus, NelkoError> {
        let query: Query = name.parse()?;
        self.request(Command::Query(query), ReplyKind::Query(query))
    }

    pub fn battery(&mut self) -> Result<BatteryStatus, NelkoError> {
        match self.request(Command::Query(Query::Battery), ReplyKind::Query(Query::Battery))? {
            DeviceStatus::Battery(battery) => Ok(battery),
            other => Err(unexpected(&other)),
        }
    }

    pub fn config(&mut self) -> Result<ConfigStatus, NelkoError> {
        match self.request(Command::Query(Query::Config), ReplyKind::Query(Query::Config))? {
            DeviceStatus::Config(config) => Ok(config),
            other => Err(unexpected(&other)),
        }
    }

    /// Send `ESC ! ?` and decode the status byte.
    pub fn ready_status(&mut self) -> Result<ReadyStatus, NelkoError> {
        match self.request(Command::ControlEscape(Escape::ReadyCheck), ReplyKind::Ready)? {
            DeviceStatus::Ready(ready) => Ok(ready),
            other => Err(unexpected(&other)),
        }
    }

    /// One ready check. Looping until ready is up to the caller.
    pub fn poll_ready(&mut self) -> Result<bool, NelkoError> {
        Ok(self.ready_status()?.ready)
    }

    /// Send `ESC ! o` to cancel a paused print.
    pub fn cancel_pause(&mut self) -> Result<PauseCancelAck, NelkoError> {
        match self.request(Command::ControlEscape(Escape::CancelPause), ReplyKind::PauseCancel)? {
            DeviceStatus::PauseCancelAck(ack) => Ok(ack),
            other => Err(unexpected(&other)),
        }
    }

    // ========================================================================
    // FIRE-AND-FORGET
    // ========================================================================

    /// Submit a print job as one contiguous write.
    ///
    /// Returns once the bytes are handed to the transport. The device sends
    /// nothing on completion; use [`poll_ready`](Self::poll_ready) to follow it.
    pub fn print(&mut self, job: PrintJob) -> Result<(), NelkoError> {
        self.expect_state(SessionState::Idle)?;
        let bytes = tspl::encode_print_job(&job, &self.config.encode)?;
        info!("Submitting print job: {} bytes, {} copies", bytes.len(), job.copies);
        self.submit(&bytes)
    }

    /// Print the device's built-in self-test label.
    pub fn self_test(&mut self) -> Result<(), NelkoError> {
        let options = self.config.encode;
        self.send_statements(&[Statement::SelfTest], &options)
    }

    /// Send a batch of statements. The whole batch is validated before any I/O.
    pub fn send_statements(
        &mut self,
        statements: &[Statement],
        options: &EncodeOptions,
    ) -> Result<(), NelkoError> {
        self.expect_state(SessionState::Idle)?;
        let bytes = tspl::encode_statements(statements, options)?;
        debug!("Sending {} statements", statements.len());
        self.submit(&bytes)
    }

    // ========================================================================
    // INTERNALS
    // ========================================================================

    fn expect_state(&self, expected: SessionState) -> Result<(), NelkoError> {
        if self.state != expected {
            return Err(NelkoError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn transport_mut(&mut self) -> Result<&mut T, NelkoError> {
        self.transport
            .as_mut()
            .ok_or_else(|| NelkoError::Transport("no transport bound".to_string()))
    }

    fn submit(&mut self, bytes: &[u8]) -> Result<(), NelkoError> {
        self.state = SessionState::Printing;
        let result = self.transport_mut().and_then(|transport| {
            drain_stale(transport)?;
            transport.send(bytes)
        });
        self.settle(result)
    }

    fn request(&mut self, command: Command, kind: ReplyKind) -> Result<DeviceStatus, NelkoError> {
        self.expect_state(SessionState::Idle)?;
        let bytes = command.encode(&self.config.encode)?;

        self.cancel.reset();
        self.state = SessionState::AwaitingResponse;
        let config = self.config;
        let cancel = self.cancel.clone();
        let result = self
            .transport_mut()
            .and_then(|transport| exchange(transport, &config, &cancel, &bytes, kind));
        self.settle(result)
    }

    /// Leave the busy state: back to Idle, or Disconnected after a transport failure.
    fn settle<R>(&mut self, result: Result<R, NelkoError>) -> Result<R, NelkoError> {
        match &result {
            Err(e) if e.is_transport() => {
                warn!("Transport failure, disconnecting: {}", e);
                self.transport = None;
                self.state = SessionState::Disconnected;
            }
            Err(e) => {
                warn!("Request failed: {}", e);
                self.state = SessionState::Idle;
            }
            Ok(_) => self.state = SessionState::Idle,
        }
        result
    }
}

impl<T: Transport> Default for Session<T> {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

fn unexpected(status: &DeviceStatus) -> NelkoError {
    NelkoError::MalformedResponse(format!("unexpected {} reply", status.kind()))
}

/// Discard bytes the transport already holds.
fn drain_stale<T: Transport>(transport: &mut T) -> Result<(), NelkoError> {
    for _ in 0..MAX_DRAIN_READS {
        match transport.receive(Duration::ZERO)? {
            Some(stale) => debug!("Discarding stale bytes: {}", hex::encode(&stale)),
            None => return Ok(()),
        }
    }
    Ok(())
}

/// Send one request and read until the reply decodes, the deadline passes,
/// or the request is cancelled.
fn exchange<T: Transport>(
    transport: &mut T,
    config: &SessionConfig,
    cancel: &CancelHandle,
    bytes: &[u8],
    kind: ReplyKind,
) -> Result<DeviceStatus, NelkoError> {
    drain_stale(transport)?;
    debug!("-> {}", hex::encode(bytes));
    transport.send(bytes)?;

    let deadline = Instant::now() + config.response_timeout;
    let mut received = Vec::new();
    loop {
        if cancel.is_cancelled() {
            return Err(NelkoError::Cancelled);
        }
        let now = Instant::now();
        if now >= deadline {
            if !received.is_empty() {
                debug!("Partial reply at timeout: {}", hex::encode(&received));
            }
            return Err(NelkoError::Timeout(config.response_timeout));
        }

        let slice = (deadline - now).min(config.poll_interval);
        let Some(chunk) = transport.receive(slice)? else {
            continue;
        };
        received.extend_from_slice(&chunk);
        debug!("<- {}", hex::encode(&received));

        match response::decode_reply(kind, &received, config.trailer_mode) {
            Ok(status) => return Ok(status),
            Err(e) if e.is_retryable() => continue,
            Err(e) => return Err(e),
        }
    }
}
