use core::fmt::{self, Display};

/// the lifecycle of one connection. every attempt starts and ends in `Disconnected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    #[default]
    Disconnected,
    /// the transport is up and registration (NICK/USER) has been sent
    Connecting,
    /// the server accepted the registration with RPL_WELCOME
    Connected,
}

impl Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Connected => "connected",
        };
        f.write_str(s)
    }
}
