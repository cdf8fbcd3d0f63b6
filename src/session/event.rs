use crate::{
    ctcp::CtcpCommand,
    irc::{ChannelName, Nickname, Origin, Target},
    session::SessionId,
};

/// something that happened on a session, tagged with the session it happened on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEvent {
    pub session: SessionId,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Privmsg,
    Notice,
}

/// the `is_self` flags compare the subject of the event with the session's registered nickname
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// the session moved to a new state. query `Session::state` for it.
    StateChanged,
    Joined {
        channel: ChannelName,
        nick: Nickname,
        is_self: bool,
    },
    Parted {
        channel: ChannelName,
        nick: Nickname,
        is_self: bool,
        reason: Option<String>,
    },
    Kicked {
        channel: ChannelName,
        kicked: Nickname,
        by: Option<String>,
        is_self_kicked: bool,
        reason: Option<String>,
    },
    /// a CTCP payload arrived. `is_reply` is set when it came in a NOTICE, which must never be
    /// answered.
    CtcpCommandReceived {
        from: Origin,
        target: Target,
        command: CtcpCommand,
        is_reply: bool,
    },
    NickChanged {
        old: Nickname,
        new: Nickname,
        is_self: bool,
    },
    UserQuit {
        nick: Nickname,
        reason: Option<String>,
    },
    /// a plain PRIVMSG or NOTICE. `target` is where it was sent, `conversation` is where it
    /// belongs: the channel, or the sender for messages sent directly to us.
    MessageReceived {
        from: Option<Origin>,
        target: Target,
        conversation: Target,
        text: String,
        kind: MessageKind,
    },
    /// one RPL_NAMREPLY line, with membership prefixes stripped
    Names {
        channel: ChannelName,
        names: Vec<Nickname>,
    },
}
