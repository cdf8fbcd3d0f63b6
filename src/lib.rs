//! An IRC client session engine.
//!
//! A [`Client`] owns any number of [`Session`]s, one per server connection. Raw protocol lines are
//! fed in with [`Client::handle_line`], each session classifies them into typed [`SessionEvent`]s,
//! and the client routes those events to [`ConversationContext`]s (one per channel or query, plus
//! a primary status context per session) before publishing them on the [`EventBus`].
//!
//! Everything happens on one thread. Transports live on their own threads and talk to the loop
//! through `std::sync::mpsc` channels, see [`net`].

pub mod bus;
pub mod client;
pub mod command;
pub mod constants;
pub mod ctcp;
pub mod ext;
pub mod irc;
pub mod logging;
pub mod net;
pub mod router;
pub mod session;

pub use bus::{EventBus, Subscription};
pub use client::{Client, ClientError};
pub use ctcp::{responder::ClientInfo, CtcpCommand};
pub use irc::{ChannelName, Nickname, Origin, Target};
pub use router::{ConversationContext, TargetRouter};
pub use session::{
    EventKind, MessageKind, Session, SessionConfig, SessionError, SessionEvent, SessionId,
    SessionState,
};
