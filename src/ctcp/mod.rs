//! the Client-To-Client Protocol, carried inside PRIVMSG (requests) and NOTICE (replies) text
//! between two `0x01` delimiters.

use core::fmt::{self, Display};

use log::*;

use crate::irc::{
    client::{ClientIrcCommand, ClientMessage},
    Target,
};

pub mod responder;

pub const CTCP_DELIM: u8 = 0x01;

const CTCP_DELIM_CHAR: char = '\u{0001}';

/// whether a message body is a CTCP payload
pub fn is_ctcp(msg: &str) -> bool {
    msg.as_bytes().first() == Some(&CTCP_DELIM)
}

/// a CTCP command and its space separated arguments. the command name is not checked against
/// any known set, deciding what to do with it is up to the receiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtcpCommand {
    command: String,
    arguments: Vec<String>,
}

impl CtcpCommand {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            arguments: Vec::new(),
        }
    }

    pub fn with_args<I, S>(command: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn arg(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn command(&self) -> &str {
        self.command.as_str()
    }

    pub fn arguments(&self) -> &[String] {
        self.arguments.as_slice()
    }

    /// decodes a CTCP payload. the closing delimiter is optional since some clients leave it
    /// off. anything after an interior delimiter is ignored.
    ///
    /// returns `None` if the text is not a CTCP payload or has no command.
    pub fn decode(msg: &str) -> Option<Self> {
        let inner = msg.strip_prefix(CTCP_DELIM_CHAR)?;
        let inner = inner.split(CTCP_DELIM_CHAR).next().unwrap_or_default();

        let mut tokens = inner.split(' ').filter(|t| !t.is_empty());
        let Some(command) = tokens.next() else {
            debug!("empty CTCP payload {:?}", msg);
            return None;
        };

        Some(Self {
            command: command.to_string(),
            arguments: tokens.map(str::to_string).collect(),
        })
    }

    /// the delimited payload, ready to be used as PRIVMSG or NOTICE text
    pub fn encode(&self) -> String {
        let mut s = String::new();
        s.push(CTCP_DELIM_CHAR);
        s.push_str(&self.command);
        for arg in &self.arguments {
            s.push(' ');
            s.push_str(arg);
        }
        s.push(CTCP_DELIM_CHAR);
        s
    }

    /// wraps the payload in a message to `target`. replies go out as NOTICE so that the other
    /// side never answers them, requests as PRIVMSG.
    pub fn into_message(self, target: Target, as_reply: bool) -> ClientMessage {
        let targets = vec![target];
        let msg = self.encode();
        let cmd = if as_reply {
            ClientIrcCommand::Notice { targets, msg }
        } else {
            ClientIrcCommand::Privmsg { targets, msg }
        };
        ClientMessage::from_command(cmd)
    }
}

impl Display for CtcpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command)?;
        for arg in &self.arguments {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
