use log::*;
use thiserror::Error;

use crate::{
    ext::StrExt as _,
    irc::{IrcCommand, IrcCommandParseErr, Origin},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub source: Option<Origin>,
    pub message: IrcCommand,
}

impl IrcMessage {
    /// parses a message from a string. the string must contain only a single message, without its
    /// trailing CRLF.
    pub fn parse(s: &str) -> Result<Self, IrcParseErr> {
        if s.contains(['\r', '\n']) {
            return Err(IrcParseErr::InteriorCRLF);
        }

        // not sure if this is valid, but just in case, trim leading whitespace.
        let mut s = s.trim_start_matches(' ');

        // optional tags section, which nothing reads
        if let Some((_, rest)) = s.split_prefix('@') {
            let Some((_, rest)) = rest.split_once(' ') else {
                // if there's not a space after the tags, the command is missing
                return Err(IrcParseErr::MissingCommand);
            };
            s = rest.trim_start_matches(' ');
        }

        // optional source section
        let source = if let Some((_, rest)) = s.split_prefix(':') {
            let Some((source, rest)) = rest.split_once(' ') else {
                // if there's not a space after the source, the command is missing
                return Err(IrcParseErr::MissingCommand);
            };

            s = rest;
            let source = Origin::parse(source);
            trace!("parsed source: {:?}", source);
            source
        } else {
            None
        };

        s = s.trim_start_matches(' ');
        if s.is_empty() {
            return Err(IrcParseErr::MissingCommand);
        }

        Ok(IrcMessage {
            source,
            message: IrcCommand::parse(s)?,
        })
    }
}

#[derive(Debug, Error)]
pub enum IrcParseErr {
    #[error("message contains interior CRLF")]
    InteriorCRLF,
    #[error("message is missing a command")]
    MissingCommand,
    #[error(transparent)]
    MessageParseErr(#[from] IrcCommandParseErr),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::irc::{Param, Target};

    #[test]
    fn parses_source_and_privmsg() {
        let msg = IrcMessage::parse(":alice!a@host PRIVMSG #rust :hello there").unwrap();
        assert_eq!(msg.source.as_ref().map(Origin::name), Some("alice"));
        assert_eq!(
            msg.message,
            IrcCommand::Privmsg {
                targets: vec![Target::new("#rust").unwrap()],
                msg: String::from("hello there"),
            }
        );
    }

    #[test]
    fn skips_tags_before_source() {
        let msg = IrcMessage::parse("@time=now;msgid=a\\sb :srv.example NOTICE * :hi").unwrap();
        assert!(!msg.source.as_ref().unwrap().is_peer());
        assert_eq!(msg.source.as_ref().map(Origin::name), Some("srv.example"));
        assert!(matches!(msg.message, IrcCommand::Notice { ref msg, .. } if msg.as_str() == "hi"));
    }

    #[test]
    fn numerics_are_three_digits() {
        let msg = IrcMessage::parse(":srv 001 alice :Welcome").unwrap();
        assert_eq!(
            msg.message,
            IrcCommand::Numeric {
                num: 1,
                args: vec![
                    Param::String(String::from("alice")),
                    Param::String(String::from("Welcome")),
                ],
            }
        );

        let msg = IrcMessage::parse("1234 x").unwrap();
        assert!(matches!(msg.message, IrcCommand::Unknown(ref name, _) if name == "1234"));
    }

    #[test]
    fn commands_are_case_insensitive() {
        let msg = IrcMessage::parse("ping :token").unwrap();
        assert_eq!(msg.message, IrcCommand::Ping(String::from("token")));
    }

    #[test]
    fn kick_splits_user_list() {
        let msg = IrcMessage::parse(":op!o@h KICK #a bob,carol :bye").unwrap();
        assert_eq!(
            msg.message,
            IrcCommand::Kick {
                channel: String::from("#a"),
                users: vec![String::from("bob"), String::from("carol")],
                comment: Some(String::from("bye")),
            }
        );
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(matches!(
            IrcMessage::parse(":only-a-source"),
            Err(IrcParseErr::MissingCommand)
        ));
        assert!(matches!(
            IrcMessage::parse("@tags-only"),
            Err(IrcParseErr::MissingCommand)
        ));
        assert!(matches!(
            IrcMessage::parse("PING :a\r\nPING :b"),
            Err(IrcParseErr::InteriorCRLF)
        ));
        assert!(matches!(
            IrcMessage::parse("JOIN"),
            Err(IrcParseErr::MessageParseErr(IrcCommandParseErr::MissingParams(_)))
        ));
    }
}
