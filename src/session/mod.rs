use core::fmt::{self, Display};
use std::{collections::VecDeque, sync::mpsc::Sender};

use chrono::{DateTime, Local};
use log::*;
use thiserror::Error;

use crate::{
    constants::{
        names::CHANNEL_MEMBERSHIP_PREFIXES,
        numerics::{
            ERR_ERRONEUSNICKNAME, ERR_NICKNAMEINUSE, ERR_PASSWDMISMATCH, ERR_YOUREBANNEDCREEP,
            RPL_NAMREPLY, RPL_WELCOME,
        },
    },
    ctcp::{self, CtcpCommand},
    irc::{
        client::{ClientIrcCommand, ClientMessage, ClientMessageToStringErr},
        ChannelName, IrcCommand, IrcMessage, Nickname, Origin, Param, Target,
    },
};

mod event;
mod state;

pub use event::{EventKind, MessageKind, SessionEvent};
pub use state::SessionState;

// how often registration retries with a longer nickname before giving up
const MAX_NICK_RETRIES: u8 = 3;

/// identifies a session within a `Client`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(pub(crate) u64);

impl Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session#{}", self.0)
    }
}

/// how to register with the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub nickname: String,
    pub username: String,
    pub realname: String,
    pub password: Option<String>,
}

impl SessionConfig {
    /// uses the nickname as the username and real name
    pub fn new(nickname: impl Into<String>) -> Self {
        let nickname: String = nickname.into();
        Self {
            username: nickname.clone(),
            realname: nickname.clone(),
            nickname,
            password: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is already {0}")]
    AlreadyConnected(SessionState),
    #[error("session is not connected")]
    NotConnected,
    #[error("the transport for this session is gone")]
    TransportClosed,
    #[error(transparent)]
    InvalidMessage(#[from] ClientMessageToStringErr),
}

/// one connection to one server.
///
/// a session never touches the network itself. each `connect` hands it the sending half of a
/// fresh transport, which it drops again once disconnected. incoming lines are given to it with
/// `handle_message`. anything that happens is queued as an `EventKind` and taken out with
/// `poll_event`.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    config: SessionConfig,
    state: SessionState,
    /// the nickname the server registered us with. only set while connected.
    nickname: Option<Nickname>,
    /// the nickname requested during registration, which changes if the server rejects it
    requested_nick: String,
    nick_retries: u8,
    connected_since: Option<DateTime<Local>>,
    outgoing: Option<Sender<ClientMessage>>,
    // each event with the state the session was in when it was raised
    events: VecDeque<(EventKind, SessionState)>,
}

impl Session {
    pub fn new(id: SessionId, config: SessionConfig) -> Self {
        Self {
            id,
            requested_nick: config.nickname.clone(),
            nick_retries: 0,
            config,
            state: SessionState::Disconnected,
            nickname: None,
            connected_since: None,
            outgoing: None,
            events: VecDeque::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn nickname(&self) -> Option<&Nickname> {
        self.nickname.as_ref()
    }

    pub fn connected_since(&self) -> Option<DateTime<Local>> {
        self.connected_since
    }

    /// whether `nick` is the nickname this session is registered with
    pub fn is_self(&self, nick: &str) -> bool {
        self.nickname.as_ref().is_some_and(|own| own.matches(nick))
    }

    /// takes the oldest event that has not been handled yet, along with the state the session was
    /// in right after it happened. for `StateChanged` that is the state it changed to.
    pub fn poll_event(&mut self) -> Option<(EventKind, SessionState)> {
        self.events.pop_front()
    }

    // =====================
    // COMMANDS
    // =====================

    /// starts registering on a fresh transport. `outgoing` is where the session hands messages to
    /// it. nothing changes if the configuration can't be sent.
    pub fn connect(&mut self, outgoing: Sender<ClientMessage>) -> Result<(), SessionError> {
        if self.state != SessionState::Disconnected {
            return Err(SessionError::AlreadyConnected(self.state));
        }

        let mut registration = Vec::with_capacity(3);
        if let Some(password) = &self.config.password {
            registration.push(ClientIrcCommand::Pass(password.clone()));
        }
        registration.push(ClientIrcCommand::Nick(self.config.nickname.clone()));
        registration.push(ClientIrcCommand::User(
            self.config.username.clone(),
            self.config.realname.clone(),
        ));
        for cmd in &registration {
            cmd.irc_str()?;
        }

        self.requested_nick = self.config.nickname.clone();
        self.nick_retries = 0;
        self.outgoing = Some(outgoing);
        self.transition(SessionState::Connecting);

        for cmd in registration {
            self.send(cmd)?;
        }
        Ok(())
    }

    /// tells the server we are leaving and disconnects
    pub fn quit(&mut self, message: impl Into<String>) -> Result<(), SessionError> {
        if self.state == SessionState::Disconnected {
            return Err(SessionError::NotConnected);
        }

        let res = self.send(ClientIrcCommand::Quit(Some(message.into())));
        self.transition(SessionState::Disconnected);
        res
    }

    /// the transport closed or failed
    pub fn transport_closed(&mut self) {
        self.transition(SessionState::Disconnected);
    }

    pub fn send_ctcp(
        &mut self,
        target: Target,
        command: CtcpCommand,
        as_reply: bool,
    ) -> Result<(), SessionError> {
        self.require_connected()?;
        debug!("{}: CTCP {} to {} (reply: {})", self.id, command, target, as_reply);
        self.send_msg(command.into_message(target, as_reply))
    }

    pub fn join(&mut self, channel: ChannelName) -> Result<(), SessionError> {
        self.require_connected()?;
        self.send(ClientIrcCommand::Join(vec![channel]))
    }

    pub fn part(&mut self, channel: ChannelName, reason: Option<String>) -> Result<(), SessionError> {
        self.require_connected()?;
        self.send(ClientIrcCommand::Part(vec![channel], reason))
    }

    pub fn send_message(&mut self, target: Target, text: impl Into<String>) -> Result<(), SessionError> {
        self.require_connected()?;
        self.send(ClientIrcCommand::Privmsg {
            targets: vec![target],
            msg: text.into(),
        })
    }

    pub fn send_raw(&mut self, line: impl Into<String>) -> Result<(), SessionError> {
        self.require_connected()?;
        self.send(ClientIrcCommand::Raw(line.into()))
    }

    fn require_connected(&self) -> Result<(), SessionError> {
        if self.state == SessionState::Connected {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    fn send(&mut self, cmd: ClientIrcCommand) -> Result<(), SessionError> {
        self.send_msg(ClientMessage::from_command(cmd))
    }

    fn send_msg(&mut self, msg: ClientMessage) -> Result<(), SessionError> {
        // catch anything unsendable here instead of on the transport thread
        msg.irc_str()?;

        let Some(outgoing) = &self.outgoing else {
            return Err(SessionError::TransportClosed);
        };
        if outgoing.send(msg).is_err() {
            warn!("{}: transport is gone, disconnecting", self.id);
            self.transition(SessionState::Disconnected);
            return Err(SessionError::TransportClosed);
        }
        Ok(())
    }

    fn transition(&mut self, state: SessionState) {
        if self.state == state {
            return;
        }

        debug!("{}: {} -> {}", self.id, self.state, state);
        self.state = state;
        if state == SessionState::Disconnected {
            self.nickname = None;
            self.connected_since = None;
            // lets the transport finish writing and close
            self.outgoing = None;
        }
        self.push_event(EventKind::StateChanged);
    }

    fn push_event(&mut self, kind: EventKind) {
        self.events.push_back((kind, self.state));
    }

    // =====================
    // INCOMING MESSAGES
    // =====================

    /// classifies a message from the server, answering PINGs and queueing events.
    pub fn handle_message(&mut self, msg: &IrcMessage) -> Result<(), SessionError> {
        let source = msg.source.as_ref();
        match &msg.message {
            IrcCommand::Ping(token) => {
                if self.state == SessionState::Disconnected {
                    trace!("{}: not answering PING while disconnected", self.id);
                } else {
                    self.send(ClientIrcCommand::Pong(token.to_string()))?;
                }
            }
            IrcCommand::Error(reason) => {
                warn!("{}: server error: {}", self.id, reason);
                self.transition(SessionState::Disconnected);
            }

            // =====================
            // REGISTRATION
            // =====================
            IrcCommand::Numeric {
                num: RPL_WELCOME,
                args,
            } => self.on_welcome(args),
            IrcCommand::Numeric {
                num: ERR_NICKNAMEINUSE,
                ..
            } => self.on_nick_in_use()?,
            IrcCommand::Numeric {
                num: num @ (ERR_ERRONEUSNICKNAME | ERR_PASSWDMISMATCH | ERR_YOUREBANNEDCREEP),
                args,
            } => self.on_registration_rejected(*num, args),
            IrcCommand::Nick(new) => self.on_nick(source, new),

            // =====================
            // CHANNEL STATE
            // =====================
            IrcCommand::Join(channels) => {
                let Some(nick) = source_nick(source, "JOIN") else {
                    return Ok(());
                };
                let is_self = self.is_self(nick.as_str());
                for channel in channels.iter().filter_map(|c| channel_name(c, "JOIN")) {
                    self.push_event(EventKind::Joined {
                        channel,
                        nick: nick.clone(),
                        is_self,
                    });
                }
            }
            IrcCommand::Part(channels, reason) => {
                let Some(nick) = source_nick(source, "PART") else {
                    return Ok(());
                };
                let is_self = self.is_self(nick.as_str());
                for channel in channels.iter().filter_map(|c| channel_name(c, "PART")) {
                    self.push_event(EventKind::Parted {
                        channel,
                        nick: nick.clone(),
                        is_self,
                        reason: reason.clone(),
                    });
                }
            }
            IrcCommand::Kick {
                channel,
                users,
                comment,
            } => {
                let Some(channel) = channel_name(channel, "KICK") else {
                    return Ok(());
                };
                let by = source.map(|s| s.name().to_string());
                for kicked in users.iter().filter_map(Nickname::new) {
                    let is_self_kicked = self.is_self(kicked.as_str());
                    self.push_event(EventKind::Kicked {
                        channel: channel.clone(),
                        kicked,
                        by: by.clone(),
                        is_self_kicked,
                        reason: comment.clone(),
                    });
                }
            }
            IrcCommand::Quit(reason) => {
                let Some(nick) = source_nick(source, "QUIT") else {
                    return Ok(());
                };
                self.push_event(EventKind::UserQuit {
                    nick,
                    reason: reason.clone(),
                });
            }
            IrcCommand::Numeric {
                num: RPL_NAMREPLY,
                args,
            } => self.on_names(args),

            // =====================
            // MESSAGES
            // =====================
            IrcCommand::Privmsg { targets, msg } => {
                for target in targets {
                    self.on_message(source, target, msg, MessageKind::Privmsg);
                }
            }
            IrcCommand::Notice { targets, msg } => {
                for target in targets {
                    self.on_message(source, target, msg, MessageKind::Notice);
                }
            }

            other @ (IrcCommand::Pong(_)
            | IrcCommand::Numeric { .. }
            | IrcCommand::Unknown(..)) => {
                trace!("{}: unhandled {:?}", self.id, other);
            }
        }

        Ok(())
    }

    fn on_welcome(&mut self, args: &[Param]) {
        if self.state != SessionState::Connecting {
            warn!("{}: RPL_WELCOME when not registering", self.id);
            return;
        }

        let nick = args
            .first()
            .and_then(Param::as_str)
            .and_then(Nickname::new)
            .or_else(|| Nickname::new(self.requested_nick.as_str()));
        if let Some(nick) = &nick {
            if !nick.matches(&self.requested_nick) {
                warn!(
                    "{}: requested nick {}, but got nick {}",
                    self.id, self.requested_nick, nick
                );
            }
        }

        self.nickname = nick;
        self.connected_since = Some(Local::now());
        self.transition(SessionState::Connected);
    }

    fn on_nick_in_use(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Connecting {
            warn!("{}: nickname change rejected, nickname in use", self.id);
            return Ok(());
        }
        if self.nick_retries >= MAX_NICK_RETRIES {
            warn!(
                "{}: nickname {} in use, giving up after {} retries",
                self.id, self.requested_nick, self.nick_retries
            );
            self.transition(SessionState::Disconnected);
            return Ok(());
        }

        self.nick_retries += 1;
        self.requested_nick.push('_');
        info!("{}: nickname in use, trying {}", self.id, self.requested_nick);
        self.send(ClientIrcCommand::Nick(self.requested_nick.clone()))
    }

    fn on_registration_rejected(&mut self, num: u16, args: &[Param]) {
        let reason = args.last().and_then(Param::as_str).unwrap_or_default();
        if self.state != SessionState::Connecting {
            warn!("{}: server sent {:03}: {}", self.id, num, reason);
            return;
        }

        warn!("{}: registration rejected with {:03}: {}", self.id, num, reason);
        self.transition(SessionState::Disconnected);
    }

    fn on_nick(&mut self, source: Option<&Origin>, new: &str) {
        let (Some(old), Some(new)) = (source_nick(source, "NICK"), Nickname::new(new)) else {
            return;
        };

        let is_self = self.is_self(old.as_str());
        if is_self {
            self.nickname = Some(new.clone());
        }
        self.push_event(EventKind::NickChanged { old, new, is_self });
    }

    fn on_names(&mut self, args: &[Param]) {
        // <client> [<symbol>] <channel> :<names>
        let [.., channel, names] = args else {
            warn!("{}: RPL_NAMREPLY missing channel and names", self.id);
            return;
        };
        let (Some(channel), Some(names)) = (
            channel.as_str().and_then(|c| channel_name(c, "RPL_NAMREPLY")),
            names.as_str(),
        ) else {
            return;
        };

        let names = names
            .split(' ')
            .map(|name| name.trim_start_matches(CHANNEL_MEMBERSHIP_PREFIXES))
            .filter_map(Nickname::new)
            .collect();
        self.push_event(EventKind::Names { channel, names });
    }

    fn on_message(&mut self, source: Option<&Origin>, target: &Target, msg: &str, kind: MessageKind) {
        if ctcp::is_ctcp(msg) {
            let Some(command) = CtcpCommand::decode(msg) else {
                debug!("{}: ignoring malformed CTCP payload {:?}", self.id, msg);
                return;
            };
            let Some(from) = source else {
                warn!("{}: CTCP {} without a source", self.id, command);
                return;
            };
            self.push_event(EventKind::CtcpCommandReceived {
                from: from.clone(),
                target: target.clone(),
                command,
                is_reply: kind == MessageKind::Notice,
            });
            return;
        }

        // messages sent directly to us belong to the conversation with the sender
        let conversation = match (target, source.and_then(|s| Nickname::new(s.name()))) {
            (Target::Nick(nick), Some(sender)) if self.is_self(nick.as_str()) => Target::Nick(sender),
            _ => target.clone(),
        };
        self.push_event(EventKind::MessageReceived {
            from: source.cloned(),
            target: target.clone(),
            conversation,
            text: msg.to_string(),
            kind,
        });
    }
}

fn source_nick(source: Option<&Origin>, what: &str) -> Option<Nickname> {
    let nick = source.and_then(|s| Nickname::new(s.name()));
    if nick.is_none() {
        warn!("{} msg without a source", what);
    }
    nick
}

fn channel_name(name: &str, what: &str) -> Option<ChannelName> {
    let channel = ChannelName::new(name);
    if channel.is_none() {
        warn!("{} for invalid channel {:?}", what, name);
    }
    channel
}
