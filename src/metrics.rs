//! Metric helpers for `pulseframe`.
//!
//! This module defines metric names and helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. With the `metrics` feature
//! disabled every helper compiles to a no-op.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the counter tracking encoded and decoded messages.
pub const MESSAGES_PROCESSED: &str = "pulseframe_messages_processed_total";
/// Name of the counter tracking headers with unbound opcodes.
pub const UNKNOWN_OPCODES: &str = "pulseframe_unknown_opcodes_total";
/// Name of the counter tracking `OpenOnly` sends dropped before `Open`.
pub const DROPPED_SENDS: &str = "pulseframe_dropped_sends_total";
/// Name of the counter tracking errors, labelled by category.
pub const ERRORS_TOTAL: &str = "pulseframe_errors_total";
/// Name of the gauge tracking live connections.
pub const CONNECTIONS_ACTIVE: &str = "pulseframe_connections_active";

/// Direction of message processing.
#[derive(Clone, Copy, Debug)]
pub enum Direction {
    /// Messages decoded from the peer.
    Inbound,
    /// Messages encoded for the peer.
    Outbound,
}

impl Direction {
    /// Label value for this direction.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

/// Record a processed message for the given direction.
pub fn inc_messages(direction: Direction) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_PROCESSED, "direction" => direction.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = direction;
}

/// Record a header naming an unbound opcode.
pub fn inc_unknown_opcodes() {
    #[cfg(feature = "metrics")]
    counter!(UNKNOWN_OPCODES).increment(1);
}

/// Record an `OpenOnly` send dropped because the session was not open.
pub fn inc_dropped_sends() {
    #[cfg(feature = "metrics")]
    counter!(DROPPED_SENDS).increment(1);
}

/// Record an error occurrence under its category.
pub fn inc_errors(error_type: &'static str) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "error_type" => error_type).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = error_type;
}

/// Increment the live connections gauge.
pub fn inc_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).increment(1.0);
}

/// Decrement the live connections gauge.
pub fn dec_connections() {
    #[cfg(feature = "metrics")]
    gauge!(CONNECTIONS_ACTIVE).decrement(1.0);
}
