use log::*;

use crate::{
    ctcp::CtcpCommand,
    irc::{Nickname, Origin, Target},
};

// KEEP THIS IN SYNC WITH `CtcpResponder::reply_to`
pub const IMPLEMENTED_CTCP: &[&str] = ["VERSION", "PING", "CLIENTINFO", "ACTION"].as_slice();

/// how the client identifies itself in CTCP VERSION replies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub product: String,
    pub version: String,
}

impl ClientInfo {
    pub fn new(product: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            product: product.into(),
            version: version.into(),
        }
    }
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }
}

/// answers the CTCP queries every client is expected to handle on its own
#[derive(Debug, Clone, Default)]
pub struct CtcpResponder {
    info: ClientInfo,
}

impl CtcpResponder {
    pub fn new(info: ClientInfo) -> Self {
        Self { info }
    }

    pub fn info(&self) -> &ClientInfo {
        &self.info
    }

    /// the reply to a CTCP request, if there is an automatic one
    pub fn reply_to(&self, request: &CtcpCommand) -> Option<CtcpCommand> {
        match request.command() {
            "VERSION" => Some(CtcpCommand::with_args(
                "VERSION",
                [self.info.product.as_str(), self.info.version.as_str()],
            )),
            "PING" => {
                let reply = CtcpCommand::new("PONG");
                Some(match request.arguments().first() {
                    Some(token) => reply.arg(token.as_str()),
                    None => reply,
                })
            }
            "CLIENTINFO" => Some(CtcpCommand::with_args(
                "CLIENTINFO",
                IMPLEMENTED_CTCP.iter().copied(),
            )),
            _ => None,
        }
    }

    /// the reply to a request along with who to send it to. requests that didn't come from a
    /// peer have nobody to answer.
    pub fn respond(&self, from: &Origin, request: &CtcpCommand) -> Option<(Target, CtcpCommand)> {
        let reply = self.reply_to(request)?;
        let Some(nick) = from.nickname().and_then(Nickname::new) else {
            warn!("CTCP {} from non-peer origin {}", request.command(), from);
            return None;
        };
        Some((Target::Nick(nick), reply))
    }
}
