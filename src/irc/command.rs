use thiserror::Error;

use crate::irc::{
    param::{self, Param},
    Target,
};

// expects a parameter to be a string parameter, and extracts it, otherwise returns an invalid param
// err.
macro_rules! expect_string_param {
    ($expr:expr) => {{
        let param = $expr;
        match param.as_str() {
            Some(s) => s.to_string(),
            None => return Err(IrcCommandParseErr::InvalidParams),
        }
    }};
}

/// the commands a server sends to a client that the session engine understands. everything else
/// is kept as `Unknown` so it can still be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrcCommand {
    Ping(String),
    // NOTE: server -> client PONG has a server param that must be ignored by the client.
    Pong(String),
    Nick(String),
    Quit(Option<String>),
    Error(String),

    // channel management
    Join(Vec<String>),
    Part(Vec<String>, Option<String>),
    Kick {
        channel: String,
        users: Vec<String>,
        comment: Option<String>,
    },

    // messages
    Privmsg {
        targets: Vec<Target>,
        msg: String,
    },
    Notice {
        targets: Vec<Target>,
        msg: String,
    },

    Numeric {
        num: u16,
        args: Vec<Param>,
    },

    // an unknown message
    Unknown(String, Vec<Param>),
}

impl IrcCommand {
    /// parses a command from a string. the string must not contain leading spaces and must not
    /// contain a CRLF.
    /// only parses messages that can be sent from a server to a client!
    pub(super) fn parse(s: &str) -> Result<Self, IrcCommandParseErr> {
        let (command, args) = match s.split_once(' ') {
            Some(parts) => parts,
            // there was no space after the text, this is all one command
            None => (s, ""),
        };
        let args = param::parse_params(args);
        let missing = || IrcCommandParseErr::MissingParams(s.to_string());

        match command.to_ascii_uppercase().as_str() {
            "PING" => {
                let token = expect_string_param!(args.first().ok_or_else(missing)?);
                Ok(IrcCommand::Ping(token))
            }
            "PONG" => {
                // clients must ignore the server param
                let token = match args.as_slice() {
                    [] => return Err(missing()),
                    [token] | [_, token, ..] => expect_string_param!(token),
                };
                Ok(IrcCommand::Pong(token))
            }
            "NICK" => {
                let nick = expect_string_param!(args.first().ok_or_else(missing)?);
                Ok(IrcCommand::Nick(nick))
            }
            "QUIT" => {
                // reason is optional, can be a QUIT with no args
                let reason = match args.first() {
                    Some(p) => Some(expect_string_param!(p)),
                    None => None,
                };
                Ok(IrcCommand::Quit(reason))
            }
            "ERROR" => {
                let reason = expect_string_param!(args.first().ok_or_else(missing)?);
                Ok(IrcCommand::Error(reason))
            }
            "JOIN" => {
                // a server never sends keys back, so only the channel list matters
                let channels = args.first().ok_or_else(missing)?.optional_list();
                Ok(IrcCommand::Join(channels))
            }
            "PART" => {
                let [channels, rest @ ..] = args.as_slice() else {
                    return Err(missing());
                };
                let channels = channels.optional_list();
                let reason = match rest.first() {
                    Some(param) => Some(expect_string_param!(param)),
                    None => None,
                };
                Ok(IrcCommand::Part(channels, reason))
            }
            "KICK" => {
                let [channel, users, rest @ ..] = args.as_slice() else {
                    return Err(missing());
                };
                let channel = expect_string_param!(channel);
                let users = users.optional_list();
                let comment = match rest.first() {
                    Some(param) => Some(expect_string_param!(param)),
                    None => None,
                };
                Ok(IrcCommand::Kick {
                    channel,
                    users,
                    comment,
                })
            }
            "PRIVMSG" => {
                let [targets, msg, ..] = args.as_slice() else {
                    return Err(missing());
                };
                let targets = targets
                    .optional_list()
                    .into_iter()
                    .filter_map(Target::new)
                    .collect();
                let msg = expect_string_param!(msg);
                Ok(IrcCommand::Privmsg { targets, msg })
            }
            "NOTICE" => {
                let [targets, msg, ..] = args.as_slice() else {
                    return Err(missing());
                };
                let targets = targets
                    .optional_list()
                    .into_iter()
                    .filter_map(Target::new)
                    .collect();
                let msg = expect_string_param!(msg);
                Ok(IrcCommand::Notice { targets, msg })
            }
            other => {
                // numerics are always exactly 3 digits
                if other.len() == 3 && other.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(num) = other.parse::<u16>() {
                        return Ok(IrcCommand::Numeric { num, args });
                    }
                }
                Ok(IrcCommand::Unknown(other.to_string(), args))
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum IrcCommandParseErr {
    #[error("message {} missing params", .0)]
    MissingParams(String),
    #[error("message had invalid params")]
    InvalidParams,
}
