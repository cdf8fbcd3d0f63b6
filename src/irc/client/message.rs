use thiserror::Error;

use crate::irc::client::command::ClientIrcCommand;

#[derive(Debug, Clone, PartialEq, Eq)]
/// an IRC message sent by the client. does not have a source.
pub struct ClientMessage {
    cmd: ClientIrcCommand,
}

impl ClientMessage {
    pub fn from_command(cmd: ClientIrcCommand) -> Self {
        Self { cmd }
    }

    pub fn command(&self) -> &ClientIrcCommand {
        &self.cmd
    }

    /// the message as it is written to the connection, including the trailing CRLF
    pub fn irc_str(&self) -> Result<String, ClientMessageToStringErr> {
        let mut s = self.cmd.irc_str()?;
        s.push_str("\r\n");
        Ok(s)
    }
}

impl From<ClientIrcCommand> for ClientMessage {
    fn from(cmd: ClientIrcCommand) -> Self {
        Self::from_command(cmd)
    }
}

#[derive(Debug, Error)]
pub enum ClientMessageToStringErr {
    #[error("message had invalid params")]
    InvalidParams,
    #[error("message contains a line break or NUL")]
    InteriorLineBreak,
}
