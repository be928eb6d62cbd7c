//! Session metrics
//!
//! Atomic counters describing the traffic and failures seen by one session.
//! A session owns its `Metrics` behind an `Arc` so callers can keep a handle
//! and read snapshots while the session is in use.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

use crate::error::Error;

#[derive(Debug)]
pub struct Metrics {
    /// Sessions that reached `Ready`
    pub sessions_opened: AtomicU64,
    /// Sessions closed after reaching `Ready`, so it pairs with
    /// `sessions_opened`. Sessions lost during the handshake are counted in
    /// `handshakes_failed` instead.
    pub sessions_closed: AtomicU64,
    /// Handshake attempts
    pub handshakes_total: AtomicU64,
    /// Failed handshakes
    pub handshakes_failed: AtomicU64,
    /// Request/response round trips started
    pub exchanges_total: AtomicU64,
    pub frames_sent: AtomicU64,
    pub frames_received: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub bytes_received: AtomicU64,
    /// `ERROR` replies from the server
    pub server_errors: AtomicU64,
    /// Unknown tags, malformed payloads and framing violations
    pub protocol_errors: AtomicU64,
    /// Broken, truncated or timed out streams
    pub transport_errors: AtomicU64,
    /// Replies outside the expected tag set
    pub unexpected_responses: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sessions_opened: AtomicU64::new(0),
            sessions_closed: AtomicU64::new(0),
            handshakes_total: AtomicU64::new(0),
            handshakes_failed: AtomicU64::new(0),
            exchanges_total: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            server_errors: AtomicU64::new(0),
            protocol_errors: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            unexpected_responses: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn session_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn session_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handshake_attempt(&self) {
        self.handshakes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handshake_failed(&self) {
        self.handshakes_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn exchange_started(&self) {
        self.exchanges_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a frame sent, header included in `byte_count`
    pub fn frame_sent(&self, byte_count: u64) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a frame received, header included in `byte_count`
    pub fn frame_received(&self, byte_count: u64) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Count an error under its class.
    pub fn record_error(&self, err: &Error) {
        let counter = match err {
            Error::Server(_) => &self.server_errors,
            Error::Protocol(_) => &self.protocol_errors,
            Error::Transport(_) => &self.transport_errors,
            Error::UnexpectedResponse { .. } => &self.unexpected_responses,
            _ => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            handshakes_total: self.handshakes_total.load(Ordering::Relaxed),
            handshakes_failed: self.handshakes_failed.load(Ordering::Relaxed),
            exchanges_total: self.exchanges_total.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            unexpected_responses: self.unexpected_responses.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            sessions_opened = snapshot.sessions_opened,
            sessions_closed = snapshot.sessions_closed,
            handshakes_total = snapshot.handshakes_total,
            handshakes_failed = snapshot.handshakes_failed,
            exchanges_total = snapshot.exchanges_total,
            frames_sent = snapshot.frames_sent,
            frames_received = snapshot.frames_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            server_errors = snapshot.server_errors,
            protocol_errors = snapshot.protocol_errors,
            transport_errors = snapshot.transport_errors,
            unexpected_responses = snapshot.unexpected_responses,
            uptime_seconds = snapshot.uptime_seconds,
            "session metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub handshakes_total: u64,
    pub handshakes_failed: u64,
    pub exchanges_total: u64,
    pub frames_sent: u64,
    pub frames_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub server_errors: u64,
    pub protocol_errors: u64,
    pub transport_errors: u64,
    pub unexpected_responses: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!(
            operation = self.operation,
            duration_ms = self.start.elapsed().as_millis() as u64,
            "operation completed"
        );
    }
}
