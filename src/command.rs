use thiserror::Error;

use crate::{
    ctcp::CtcpCommand,
    ext::StrExt,
    irc::{ChannelName, Nickname, Target},
};

/// a line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),
    /// text for the current conversation
    Text(String),
}

/// a `/command` typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join(ChannelName),
    Part(ChannelName, Option<String>),
    Msg(Target, String),
    Ctcp(Target, CtcpCommand),
    Query(Nickname),
    Quit(Option<String>),
    Raw(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseErr {
    #[error("missing a command")]
    MissingCommand,
    #[error("unknown command /{0}")]
    UnknownCommand(String),
    #[error("/{command} needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    #[error("{0:?} is not a channel")]
    InvalidChannel(String),
    #[error("{0:?} is not a nickname")]
    InvalidNickname(String),
}

impl Input {
    /// lines starting with `/` are commands. a doubled `//` sends the rest as text.
    pub fn parse(line: &str) -> Result<Self, CommandParseErr> {
        match line.split_prefix('/') {
            Some((_, rest)) if rest.starts_with('/') => Ok(Self::Text(rest.to_string())),
            Some((_, rest)) => Command::parse(rest).map(Self::Command),
            None => Ok(Self::Text(line.to_string())),
        }
    }
}

impl Command {
    /// parses a command without its leading `/`
    pub fn parse(s: &str) -> Result<Self, CommandParseErr> {
        let (cmd, rest) = next_word(s);
        if cmd.is_empty() {
            return Err(CommandParseErr::MissingCommand);
        }

        let cmd = match cmd.to_ascii_lowercase().as_str() {
            "join" | "j" => {
                let (channel, _) = next_word(rest);
                Command::Join(channel_arg("join", channel)?)
            }
            "part" | "leave" => {
                let (channel, reason) = next_word(rest);
                Command::Part(channel_arg("part", channel)?, optional(reason))
            }
            "msg" | "privmsg" => {
                let (target, text) = next_word(rest);
                let target = target_arg("msg", target)?;
                if text.is_empty() {
                    return Err(CommandParseErr::MissingArgument {
                        command: "msg",
                        argument: "a message",
                    });
                }
                Command::Msg(target, text.to_string())
            }
            "ctcp" => {
                let (target, rest) = next_word(rest);
                let target = target_arg("ctcp", target)?;
                let mut words = rest.split(' ').filter(|w| !w.is_empty());
                let Some(command) = words.next() else {
                    return Err(CommandParseErr::MissingArgument {
                        command: "ctcp",
                        argument: "a CTCP command",
                    });
                };
                let command = CtcpCommand::with_args(command.to_ascii_uppercase(), words);
                Command::Ctcp(target, command)
            }
            "query" | "q" => {
                let (nick, _) = next_word(rest);
                match Target::new(nick) {
                    Some(Target::Nick(nick)) => Command::Query(nick),
                    Some(Target::Channel(_)) => {
                        return Err(CommandParseErr::InvalidNickname(nick.to_string()));
                    }
                    None => {
                        return Err(CommandParseErr::MissingArgument {
                            command: "query",
                            argument: "a nickname",
                        });
                    }
                }
            }
            "quit" | "exit" => Command::Quit(optional(rest)),
            "raw" | "quote" => {
                if rest.is_empty() {
                    return Err(CommandParseErr::MissingArgument {
                        command: "raw",
                        argument: "a line to send",
                    });
                }
                Command::Raw(rest.to_string())
            }
            _ => return Err(CommandParseErr::UnknownCommand(cmd.to_string())),
        };

        Ok(cmd)
    }
}

// splits off the first space separated word, skipping leading spaces of both parts
fn next_word(s: &str) -> (&str, &str) {
    let s = s.trim_start_matches(' ');
    match s.split_once(' ') {
        Some((word, rest)) => (word, rest.trim_start_matches(' ')),
        None => (s, ""),
    }
}

fn optional(s: &str) -> Option<String> {
    let s = s.trim_end();
    (!s.is_empty()).then(|| s.to_string())
}

fn channel_arg(command: &'static str, s: &str) -> Result<ChannelName, CommandParseErr> {
    if s.is_empty() {
        return Err(CommandParseErr::MissingArgument {
            command,
            argument: "a channel",
        });
    }
    ChannelName::new(s).ok_or_else(|| CommandParseErr::InvalidChannel(s.to_string()))
}

fn target_arg(command: &'static str, s: &str) -> Result<Target, CommandParseErr> {
    Target::new(s).ok_or(CommandParseErr::MissingArgument {
        command,
        argument: "a target",
    })
}
