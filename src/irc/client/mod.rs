mod command;
mod message;

pub use command::ClientIrcCommand;
pub use message::{ClientMessage, ClientMessageToStringErr};
