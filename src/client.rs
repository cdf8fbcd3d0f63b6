use std::sync::mpsc::Sender;

use indexmap::IndexMap;
use log::*;
use thiserror::Error;

use crate::{
    bus::EventBus,
    ctcp::{
        responder::{ClientInfo, CtcpResponder},
        CtcpCommand,
    },
    irc::{client::ClientMessage, ChannelName, IrcMessage, Nickname, Target},
    router::{ConversationContext, TargetRouter},
    session::{
        EventKind, Session, SessionConfig, SessionError, SessionEvent, SessionId, SessionState,
    },
};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no session with id {0}")]
    UnknownSession(SessionId),
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// owns every session along with the router and the event bus.
///
/// all methods are meant to be called from one event loop. every command drains the events it
/// caused before returning: first the router is updated, then the built-in CTCP replies are sent,
/// then the event is published on the bus. subscribers therefore always see the contexts already
/// opened or closed.
#[derive(Debug)]
pub struct Client {
    sessions: IndexMap<SessionId, Session>,
    router: TargetRouter,
    bus: EventBus,
    responder: CtcpResponder,
    next_id: u64,
}

impl Client {
    pub fn new(info: ClientInfo) -> Self {
        Self {
            sessions: IndexMap::new(),
            router: TargetRouter::new(),
            bus: EventBus::new(),
            responder: CtcpResponder::new(info),
            next_id: 0,
        }
    }

    /// adds a disconnected session along with its primary context
    pub fn add_session(&mut self, config: SessionConfig) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;

        info!("{}: added for {}", id, config.nickname);
        self.sessions.insert(id, Session::new(id, config));
        self.router.add_context(ConversationContext::primary(id));
        id
    }

    /// drops a session and all of its contexts
    pub fn remove_session(&mut self, id: SessionId) -> Option<Session> {
        self.router.remove_session(id);
        self.sessions.shift_remove(&id)
    }

    // =====================
    // QUERIES
    // =====================

    pub fn session(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn state(&self, id: SessionId) -> Option<SessionState> {
        self.session(id).map(Session::state)
    }

    pub fn find_context(&self, id: SessionId, target: Option<&Target>) -> Option<&ConversationContext> {
        self.router.find_context(id, target)
    }

    pub fn router(&self) -> &TargetRouter {
        &self.router
    }

    /// a handle to the bus, for subscribing
    pub fn bus(&self) -> EventBus {
        self.bus.clone()
    }

    pub fn info(&self) -> &ClientInfo {
        self.responder.info()
    }

    // =====================
    // TRANSPORT INPUT
    // =====================

    /// handles one line from the server, without its CRLF. lines that can't be parsed are logged
    /// and dropped.
    pub fn handle_line(&mut self, id: SessionId, line: &str) -> Result<(), ClientError> {
        trace!("{}: -> {:?}", id, line);
        match IrcMessage::parse(line) {
            Ok(msg) => self.handle_message(id, &msg),
            Err(e) => {
                self.session_mut(id)?;
                warn!("{}: dropping unparseable line {:?}: {}", id, line, e);
                Ok(())
            }
        }
    }

    pub fn handle_message(&mut self, id: SessionId, msg: &IrcMessage) -> Result<(), ClientError> {
        self.run(id, |session| session.handle_message(msg))
    }

    pub fn transport_closed(&mut self, id: SessionId) -> Result<(), ClientError> {
        self.run(id, |session| {
            session.transport_closed();
            Ok(())
        })
    }

    // =====================
    // COMMANDS
    // =====================

    /// registers the session on a fresh transport. `outgoing` is where the session hands messages
    /// to it. every channel and query context of the session is closed.
    pub fn connect(
        &mut self,
        id: SessionId,
        outgoing: Sender<ClientMessage>,
    ) -> Result<(), ClientError> {
        self.run(id, |session| session.connect(outgoing))
    }

    pub fn quit(&mut self, id: SessionId, message: impl Into<String>) -> Result<(), ClientError> {
        self.run(id, |session| session.quit(message))
    }

    pub fn send_ctcp(
        &mut self,
        id: SessionId,
        target: Target,
        command: CtcpCommand,
        as_reply: bool,
    ) -> Result<(), ClientError> {
        self.run(id, |session| session.send_ctcp(target, command, as_reply))
    }

    pub fn join(&mut self, id: SessionId, channel: ChannelName) -> Result<(), ClientError> {
        self.run(id, |session| session.join(channel))
    }

    pub fn part(
        &mut self,
        id: SessionId,
        channel: ChannelName,
        reason: Option<String>,
    ) -> Result<(), ClientError> {
        self.run(id, |session| session.part(channel, reason))
    }

    pub fn send_message(
        &mut self,
        id: SessionId,
        target: Target,
        text: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.run(id, |session| session.send_message(target, text))
    }

    pub fn send_raw(&mut self, id: SessionId, line: impl Into<String>) -> Result<(), ClientError> {
        self.run(id, |session| session.send_raw(line))
    }

    /// opens a private conversation with a user, if there isn't one already
    pub fn open_query(&mut self, id: SessionId, nick: Nickname) -> Result<(), ClientError> {
        self.session_mut(id)?;
        let target = Target::Nick(nick);
        if self.router.find_context(id, Some(&target)).is_none() {
            self.router.add_context(ConversationContext::new(id, target));
        }
        Ok(())
    }

    pub fn close_query(&mut self, id: SessionId, nick: Nickname) -> Result<(), ClientError> {
        self.session_mut(id)?;
        self.router.remove_context(id, Some(&Target::Nick(nick)));
        Ok(())
    }

    fn session_mut(&mut self, id: SessionId) -> Result<&mut Session, ClientError> {
        self.sessions
            .get_mut(&id)
            .ok_or(ClientError::UnknownSession(id))
    }

    // runs a command on a session, then dispatches whatever it queued, even if it failed partway
    fn run<T>(
        &mut self,
        id: SessionId,
        f: impl FnOnce(&mut Session) -> Result<T, SessionError>,
    ) -> Result<T, ClientError> {
        let res = f(self.session_mut(id)?);
        self.dispatch(id);
        Ok(res?)
    }

    // =====================
    // DISPATCH
    // =====================

    fn dispatch(&mut self, id: SessionId) {
        loop {
            let Some(session) = self.sessions.get_mut(&id) else {
                return;
            };
            let Some((kind, state)) = session.poll_event() else {
                return;
            };
            let event = SessionEvent { session: id, kind };
            debug!("{}: {:?}", id, event.kind);

            self.route(&event, state);
            self.respond(&event);
            self.bus.publish(&event);
        }
    }

    // `state` is the state the session was in when the event was raised, which may already be
    // outdated by later events in the queue
    fn route(&mut self, event: &SessionEvent, state: SessionState) {
        let id = event.session;
        match &event.kind {
            EventKind::StateChanged => {
                // a fresh connection starts without any of the old channels or queries
                if state == SessionState::Connecting {
                    let closed = self.router.remove_targets(id);
                    if !closed.is_empty() {
                        debug!("{}: reconnecting, closed {} context(s)", id, closed.len());
                    }
                }
            }
            EventKind::Joined {
                channel,
                nick,
                is_self,
            } => {
                let target = Target::Channel(channel.clone());
                match self.router.find_context_mut(id, Some(&target)) {
                    Some(context) => {
                        if *is_self {
                            warn!("{}: joined {} twice", id, channel);
                        }
                        context.add_member(nick.clone());
                    }
                    None if *is_self => {
                        let mut context = ConversationContext::new(id, target);
                        context.add_member(nick.clone());
                        self.router.add_context(context);
                    }
                    None => trace!("{}: {} joined {}, which we are not in", id, nick, channel),
                }
            }
            EventKind::Parted {
                channel,
                nick,
                is_self,
                ..
            } => self.leave(id, channel, nick, *is_self),
            EventKind::Kicked {
                channel,
                kicked,
                is_self_kicked,
                ..
            } => self.leave(id, channel, kicked, *is_self_kicked),
            EventKind::NickChanged { old, new, is_self } => {
                for context in self.router.contexts_for_mut(id) {
                    context.rename_member(old, new.clone());
                }
                // a query follows the peer to their new nickname
                if !is_self {
                    let old = Target::Nick(old.clone());
                    self.router.rename_target(id, &old, Target::Nick(new.clone()));
                }
            }
            EventKind::UserQuit { nick, .. } => {
                for context in self.router.contexts_for_mut(id) {
                    context.remove_member(nick);
                }
            }
            EventKind::Names { channel, names } => {
                let target = Target::Channel(channel.clone());
                if let Some(context) = self.router.find_context_mut(id, Some(&target)) {
                    for name in names {
                        context.add_member(name.clone());
                    }
                }
            }
            EventKind::CtcpCommandReceived { .. } | EventKind::MessageReceived { .. } => {}
        }
    }

    fn leave(&mut self, id: SessionId, channel: &ChannelName, nick: &Nickname, is_self: bool) {
        let target = Target::Channel(channel.clone());
        if is_self {
            self.router.remove_context(id, Some(&target));
        } else if let Some(context) = self.router.find_context_mut(id, Some(&target)) {
            context.remove_member(nick);
        }
    }

    fn respond(&mut self, event: &SessionEvent) {
        let EventKind::CtcpCommandReceived {
            from,
            command,
            is_reply: false,
            ..
        } = &event.kind
        else {
            return;
        };
        let Some((target, reply)) = self.responder.respond(from, command) else {
            return;
        };
        let Some(session) = self.sessions.get_mut(&event.session) else {
            return;
        };
        if let Err(e) = session.send_ctcp(target, reply, true) {
            warn!("{}: could not answer CTCP {} from {}: {}", event.session, command, from, e);
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientInfo::default())
    }
}
