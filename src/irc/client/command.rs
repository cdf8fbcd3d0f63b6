use crate::irc::{client::message::ClientMessageToStringErr, ChannelName, Target};

/// a command sent from the client to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientIrcCommand {
    Pass(String),
    Nick(String),
    User(String, String),
    Pong(String),
    Quit(Option<String>),
    Join(Vec<ChannelName>),
    Part(Vec<ChannelName>, Option<String>),

    // messages
    Privmsg {
        targets: Vec<Target>,
        msg: String,
    },
    Notice {
        targets: Vec<Target>,
        msg: String,
    },

    /// the client wants to send the following text directly to the server. this is typically used
    /// because there does not yet exist a nice interface for the IRC command in question.
    Raw(String),
}

impl ClientIrcCommand {
    pub fn irc_str(&self) -> Result<String, ClientMessageToStringErr> {
        let msg = match self {
            ClientIrcCommand::Pass(pass) => format!("PASS :{}", pass),
            ClientIrcCommand::Nick(nick) => format!("NICK :{}", nick),
            ClientIrcCommand::User(username, realname) => {
                format!("USER {} 0 * :{}", username, realname)
            }
            ClientIrcCommand::Pong(token) => format!("PONG :{}", token),
            ClientIrcCommand::Quit(reason) => match reason {
                Some(r) => format!("QUIT :{}", r),
                None => String::from("QUIT"),
            },
            ClientIrcCommand::Join(channels) => {
                if channels.is_empty() {
                    return Err(ClientMessageToStringErr::InvalidParams);
                }
                format!("JOIN {}", join_list(channels.iter().map(ChannelName::as_str)))
            }
            ClientIrcCommand::Part(channels, reason) => {
                if channels.is_empty() {
                    return Err(ClientMessageToStringErr::InvalidParams);
                }
                let channels = join_list(channels.iter().map(ChannelName::as_str));
                match reason {
                    Some(r) => format!("PART {} :{}", channels, r),
                    None => format!("PART {}", channels),
                }
            }
            ClientIrcCommand::Privmsg { targets, msg } => {
                if targets.is_empty() {
                    return Err(ClientMessageToStringErr::InvalidParams);
                }
                format!("PRIVMSG {} :{}", join_list(targets.iter().map(Target::as_str)), msg)
            }
            ClientIrcCommand::Notice { targets, msg } => {
                if targets.is_empty() {
                    return Err(ClientMessageToStringErr::InvalidParams);
                }
                format!("NOTICE {} :{}", join_list(targets.iter().map(Target::as_str)), msg)
            }

            ClientIrcCommand::Raw(text) => text.to_string(),
        };

        // a line break would let the rest of the text be read as another command
        if msg.contains(['\r', '\n', '\0']) {
            return Err(ClientMessageToStringErr::InteriorLineBreak);
        }

        Ok(msg)
    }
}

fn join_list<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_registration() {
        assert_eq!(
            ClientIrcCommand::User(String::from("al"), String::from("Alice A")).irc_str().unwrap(),
            "USER al 0 * :Alice A"
        );
        assert_eq!(
            ClientIrcCommand::Nick(String::from("alice")).irc_str().unwrap(),
            "NICK :alice"
        );
    }

    #[test]
    fn formats_lists() {
        let channels = vec![
            ChannelName::new("#a").unwrap(),
            ChannelName::new("#b").unwrap(),
        ];
        assert_eq!(
            ClientIrcCommand::Join(channels.clone()).irc_str().unwrap(),
            "JOIN #a,#b"
        );
        assert_eq!(
            ClientIrcCommand::Part(channels, Some(String::from("later")))
                .irc_str()
                .unwrap(),
            "PART #a,#b :later"
        );
    }

    #[test]
    fn rejects_empty_targets() {
        let cmd = ClientIrcCommand::Privmsg {
            targets: vec![],
            msg: String::from("hi"),
        };
        assert!(matches!(
            cmd.irc_str(),
            Err(ClientMessageToStringErr::InvalidParams)
        ));
    }

    #[test]
    fn rejects_line_breaks() {
        let cmd = ClientIrcCommand::Privmsg {
            targets: vec![Target::new("#a").unwrap()],
            msg: String::from("hi\r\nQUIT"),
        };
        assert!(matches!(
            cmd.irc_str(),
            Err(ClientMessageToStringErr::InteriorLineBreak)
        ));
    }
}
