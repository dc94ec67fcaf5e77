//! Connection fate after a framing or send error.

/// How the connection driver responds to an error.
///
/// [`NetworkError::recovery_policy`](crate::error::NetworkError::recovery_policy)
/// returns the default for each error. Owners override it through
/// [`ConnectionHooks::recovery_policy`](crate::connection::ConnectionHooks::recovery_policy).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryPolicy {
    /// Report the error and keep processing the stream.
    ///
    /// Only sound when the stream is still in sync, for example after the
    /// payload of an unknown opcode was skipped.
    Drop,

    /// Close the connection.
    ///
    /// Required whenever the read position no longer lines up with a frame
    /// boundary or the transport has failed.
    Disconnect,
}

impl RecoveryPolicy {
    /// Returns the policy name as a static string for metrics and logging.
    ///
    /// # Examples
    ///
    /// ```
    /// use pulseframe::recovery::RecoveryPolicy;
    ///
    /// assert_eq!(RecoveryPolicy::Drop.as_str(), "drop");
    /// assert_eq!(RecoveryPolicy::Disconnect.as_str(), "disconnect");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Drop => "drop",
            Self::Disconnect => "disconnect",
        }
    }

    /// Returns true if the connection survives the error.
    #[must_use]
    pub const fn keeps_connection(self) -> bool { matches!(self, Self::Drop) }
}
