pub mod client;
mod command;
mod message;
mod origin;
mod param;
mod target;

pub use command::{IrcCommand, IrcCommandParseErr};
pub use message::{IrcMessage, IrcParseErr};
pub use origin::{Origin, Peer, Server};
pub use param::Param;
pub use target::{ChannelName, Nickname, Target};
