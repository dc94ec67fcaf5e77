//! Connection and session configuration.
//!
//! Both types are builder-style and implement [`Default`].

use crate::session::State;

/// Smallest accepted inbound buffer limit in bytes.
pub const MIN_BUFFER_LIMIT: usize = 64;

/// Largest accepted inbound buffer limit in bytes (16 MiB).
///
/// Requested limits are clamped to at most this value to prevent unbounded
/// memory growth on a stalled frame.
pub const MAX_BUFFER_LIMIT: usize = 16 * 1024 * 1024;

const DEFAULT_READ_BUFFER_CAPACITY: usize = 4 * 1024;
const DEFAULT_MAX_BUFFERED_BYTES: usize = 1024 * 1024;

pub(crate) fn clamp_buffer_limit(value: usize) -> usize {
    value.clamp(MIN_BUFFER_LIMIT, MAX_BUFFER_LIMIT)
}

/// Settings for the connection read and write loops.
///
/// # Examples
///
/// ```
/// use pulseframe::config::{ConnectionConfig, MAX_BUFFER_LIMIT};
///
/// let config = ConnectionConfig::default()
///     .read_buffer_capacity(8 * 1024)
///     .max_buffered_bytes(usize::MAX);
/// assert_eq!(config.buffer_limit(), MAX_BUFFER_LIMIT);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ConnectionConfig {
    read_buffer_capacity: usize,
    max_buffered_bytes: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            read_buffer_capacity: DEFAULT_READ_BUFFER_CAPACITY,
            max_buffered_bytes: DEFAULT_MAX_BUFFERED_BYTES,
        }
    }
}

impl ConnectionConfig {
    /// Initial capacity of the inbound buffer.
    #[must_use]
    pub fn read_buffer_capacity(mut self, capacity: usize) -> Self {
        self.read_buffer_capacity = capacity.max(1);
        self
    }

    /// Maximum bytes buffered while no complete message is available.
    ///
    /// Clamped to [`MIN_BUFFER_LIMIT`]..=[`MAX_BUFFER_LIMIT`].
    #[must_use]
    pub fn max_buffered_bytes(mut self, limit: usize) -> Self {
        self.max_buffered_bytes = clamp_buffer_limit(limit);
        self
    }

    /// Configured initial capacity of the inbound buffer.
    #[must_use]
    pub fn buffer_capacity(&self) -> usize { self.read_buffer_capacity }

    /// Configured limit on undecoded inbound bytes.
    #[must_use]
    pub fn buffer_limit(&self) -> usize { self.max_buffered_bytes }
}

/// Settings for a [`PulsingSession`](crate::session::PulsingSession).
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionConfig {
    initial_state: State,
}

impl SessionConfig {
    /// State the session starts in.
    #[must_use]
    pub fn initial_state(mut self, state: State) -> Self {
        self.initial_state = state;
        self
    }

    /// Configured starting state.
    #[must_use]
    pub fn state(&self) -> State { self.initial_state }
}
