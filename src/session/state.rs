//! Session state labels and send policies.

use std::fmt;

/// Handshake progress of a [`PulsingSession`](super::PulsingSession).
///
/// The variants are declared in their usual order of progression, but no
/// transition is enforced: any state may be set from any other. Only
/// [`State::Open`] changes dispatch behaviour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum State {
    /// Exchanging the initial protocol handshake.
    #[default]
    ExchangeHandshake = 0,
    /// Exchanging identities.
    ExchangeIdentification = 1,
    /// Negotiating encryption.
    ExchangeEncryption = 2,
    /// Handshake done, waiting for the peer to open the session.
    Waiting = 3,
    /// Fully open; queued sends flush and default sends go straight out.
    Open = 4,
}

impl State {
    /// Returns true for [`State::Open`].
    #[must_use]
    pub const fn is_open(self) -> bool { matches!(self, Self::Open) }

    /// Returns the state name as a static string for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExchangeHandshake => "exchange_handshake",
            Self::ExchangeIdentification => "exchange_identification",
            Self::ExchangeEncryption => "exchange_encryption",
            Self::Waiting => "waiting",
            Self::Open => "open",
        }
    }

    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::ExchangeHandshake,
            1 => Self::ExchangeIdentification,
            2 => Self::ExchangeEncryption,
            3 => Self::Waiting,
            _ => Self::Open,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Policy attached to a single send call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SendType {
    /// Write if the session is open, otherwise drop the message silently.
    OpenOnly,
    /// Write if the session is open, otherwise hold it until a pulse in the
    /// open state flushes it.
    #[default]
    Queue,
    /// Write immediately whatever the state.
    Force,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(State::ExchangeHandshake)]
    #[case(State::ExchangeIdentification)]
    #[case(State::ExchangeEncryption)]
    #[case(State::Waiting)]
    #[case(State::Open)]
    fn state_survives_u8_conversion(#[case] state: State) {
        assert_eq!(State::from_u8(state as u8), state);
    }

    #[test]
    fn only_open_is_open() {
        assert!(State::Open.is_open());
        assert!(!State::Waiting.is_open());
    }
}
