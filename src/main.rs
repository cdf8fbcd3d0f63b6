use std::{
    cell::RefCell,
    io::{self, BufRead},
    rc::Rc,
    sync::mpsc::{self, Sender},
    thread,
};

use clap::Parser;
use color_eyre::eyre::{self, eyre, WrapErr};
use crossterm::style::Stylize;
use irc_session::{
    command::{Command, Input},
    logging,
    net::{self, TransportEvent},
    ChannelName, Client, EventKind, MessageKind, Origin, SessionConfig, SessionEvent, SessionId,
    SessionState, Target,
};
use log::*;

/// connects to an IRC server and reads commands from stdin
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// the server to connect to, as `host:port`
    addr: String,
    #[arg(short, long)]
    nick: String,
    /// defaults to the nickname
    #[arg(long)]
    username: Option<String>,
    /// defaults to the nickname
    #[arg(long)]
    realname: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long)]
    tls: bool,
    /// channels to join once registered
    #[arg(short, long = "join", value_name = "CHANNEL")]
    join: Vec<String>,
    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

enum LoopEvent {
    Transport(TransportEvent),
    Input(String),
    InputClosed,
}

impl From<TransportEvent> for LoopEvent {
    fn from(event: TransportEvent) -> Self {
        LoopEvent::Transport(event)
    }
}

const DEFAULT_QUIT_MESSAGE: &str = "Leaving";

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    let mut autojoin = args
        .join
        .iter()
        .map(|name| {
            ChannelName::new(name.as_str()).ok_or_else(|| eyre!("{:?} is not a channel", name))
        })
        .collect::<eyre::Result<Vec<_>>>()?;

    let host = net::host_name(&args.addr).unwrap_or(&args.addr);
    logging::init(host, args.log_level).wrap_err("could not start logging")?;

    let io = net::connect(&args.addr, args.tls)
        .wrap_err_with(|| format!("could not connect to {}", args.addr))?;

    // send to this channel to have a message written to the server
    let (write_sender, write_receiver) = mpsc::channel();
    // everything the event loop reacts to arrives on this channel
    let (event_sender, event_receiver) = mpsc::channel::<LoopEvent>();
    let _transport = net::spawn(io, write_receiver, event_sender.clone());
    spawn_input(event_sender);

    let mut config = SessionConfig::new(args.nick.as_str());
    if let Some(username) = args.username {
        config.username = username;
    }
    if let Some(realname) = args.realname {
        config.realname = realname;
    }
    config.password = args.password;

    let mut client = Client::default();
    let id = client.add_session(config);
    let current = Rc::new(RefCell::new(None));
    let _printer = client.bus().subscribe(id, printer(Rc::clone(&current)));

    client.connect(id, write_sender)?;
    let mut shown_state = SessionState::Disconnected;
    for event in event_receiver {
        match event {
            LoopEvent::Transport(TransportEvent::Line(line)) => client.handle_line(id, &line)?,
            LoopEvent::Transport(TransportEvent::Closed(reason)) => {
                if let Some(reason) = reason {
                    println!("{} {}", "connection lost:".red(), reason);
                }
                client.transport_closed(id)?;
                break;
            }
            LoopEvent::Input(line) => {
                if let Err(report) = handle_input(&mut client, id, &current, line.trim_end()) {
                    println!("{} {}", "error:".red(), report);
                }
            }
            LoopEvent::InputClosed => {
                if client.state(id) != Some(SessionState::Disconnected) {
                    client.quit(id, DEFAULT_QUIT_MESSAGE)?;
                }
            }
        }

        let state = client.state(id).unwrap_or_default();
        if state != shown_state {
            println!("{}", format!("-- {}", state).dark_grey());
            shown_state = state;
        }
        if state == SessionState::Connected {
            for channel in autojoin.drain(..) {
                client.join(id, channel)?;
            }
        }
    }

    info!("exiting");
    println!("exiting");
    Ok(())
}

// stdin is read on its own thread so that the loop only ever waits on one channel
fn spawn_input(sender: Sender<LoopEvent>) {
    let _ = thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if sender.send(LoopEvent::Input(line)).is_err() {
                return;
            }
        }
        let _ = sender.send(LoopEvent::InputClosed);
    });
}

fn handle_input(
    client: &mut Client,
    id: SessionId,
    current: &RefCell<Option<Target>>,
    line: &str,
) -> eyre::Result<()> {
    if line.is_empty() {
        return Ok(());
    }

    let command = match Input::parse(line)? {
        Input::Command(command) => command,
        Input::Text(text) => {
            let Some(target) = current.borrow().clone() else {
                return Err(eyre!("not in a channel, use /join or /query"));
            };
            println!("{} {}", format!("<{}>", own_nick(client, id)).cyan(), text);
            client.send_message(id, target, text)?;
            return Ok(());
        }
    };

    match command {
        Command::Join(channel) => client.join(id, channel)?,
        Command::Part(channel, reason) => client.part(id, channel, reason)?,
        Command::Msg(target, text) => {
            println!("{} {}", format!("-> <{}>", target).cyan(), text);
            client.send_message(id, target, text)?;
        }
        Command::Ctcp(target, ctcp) => {
            println!("{} {} {}", "-> CTCP".dark_yellow(), target, ctcp);
            client.send_ctcp(id, target, ctcp, false)?;
        }
        Command::Query(nick) => {
            client.open_query(id, nick.clone())?;
            println!("{} {}", "talking to".green(), nick.as_str().magenta());
            *current.borrow_mut() = Some(Target::Nick(nick));
        }
        Command::Quit(message) => client.quit(
            id,
            message.unwrap_or_else(|| DEFAULT_QUIT_MESSAGE.to_string()),
        )?,
        Command::Raw(line) => client.send_raw(id, line)?,
    }
    Ok(())
}

fn own_nick(client: &Client, id: SessionId) -> String {
    client
        .session(id)
        .and_then(|session| session.nickname())
        .map_or_else(|| String::from("?"), |nick| nick.to_string())
}

/// prints events as they happen and keeps track of where plain text should go
fn printer(current: Rc<RefCell<Option<Target>>>) -> impl FnMut(&SessionEvent) + 'static {
    move |event| match &event.kind {
        // printed by the loop, which can see the new state
        EventKind::StateChanged => {}
        EventKind::Joined {
            channel,
            nick,
            is_self,
        } => {
            if *is_self {
                println!("{} {}", "joined".green(), channel.as_str().dark_blue());
                *current.borrow_mut() = Some(Target::Channel(channel.clone()));
            } else {
                println!(
                    "{} {} {}",
                    nick.as_str().magenta(),
                    "joined".green(),
                    channel.as_str().dark_blue()
                );
            }
        }
        EventKind::Parted {
            channel,
            nick,
            is_self,
            reason,
        } => {
            println!(
                "{} {} {}{}",
                nick.as_str().magenta(),
                "left".yellow(),
                channel.as_str().dark_blue(),
                reason.as_deref().map(|r| format!(" ({})", clean(r))).unwrap_or_default()
            );
            if *is_self {
                forget(&current, channel);
            }
        }
        EventKind::Kicked {
            channel,
            kicked,
            by,
            is_self_kicked,
            reason,
        } => {
            println!(
                "{} {} {}{}{}",
                kicked.as_str().magenta(),
                "was kicked from".red(),
                channel.as_str().dark_blue(),
                by.as_deref().map(|by| format!(" by {}", by)).unwrap_or_default(),
                reason.as_deref().map(|r| format!(" ({})", clean(r))).unwrap_or_default()
            );
            if *is_self_kicked {
                forget(&current, channel);
            }
        }
        EventKind::NickChanged { old, new, .. } => {
            println!(
                "{} {} {}",
                old.as_str().magenta(),
                "is now".green(),
                new.as_str().magenta()
            );
            let mut current = current.borrow_mut();
            if matches!(current.as_ref(), Some(Target::Nick(nick)) if nick == old) {
                *current = Some(Target::Nick(new.clone()));
            }
        }
        EventKind::UserQuit { nick, reason } => println!(
            "{} {}{}",
            nick.as_str().magenta(),
            "quit".yellow(),
            reason.as_deref().map(|r| format!(" ({})", clean(r))).unwrap_or_default()
        ),
        EventKind::CtcpCommandReceived {
            from,
            command,
            is_reply,
            ..
        } => {
            let sender = from.name().magenta();
            if command.command() == "ACTION" {
                println!("* {} {}", sender, clean(&command.arguments().join(" ")));
            } else if *is_reply {
                println!("{} {}: {}", "CTCP reply from".dark_yellow(), sender, clean(&command.to_string()));
            } else {
                println!("{} {} {}", "CTCP request from".dark_yellow(), sender, clean(&command.to_string()));
            }
        }
        EventKind::MessageReceived {
            from,
            conversation,
            text,
            kind,
            ..
        } => {
            let sender = from.as_ref().map_or("*", Origin::name);
            let text = clean(text);
            match kind {
                MessageKind::Privmsg if conversation.is_channel() => println!(
                    "{} {} {}",
                    conversation.as_str().dark_blue(),
                    format!("<{}>", sender).magenta(),
                    text
                ),
                MessageKind::Privmsg => println!("{} {}", format!("<{}>", sender).magenta(), text),
                MessageKind::Notice => println!("{} {}", format!("-{}-", sender).dark_yellow(), text),
            }
        }
        EventKind::Names { channel, names } => println!(
            "{} {}",
            format!("{}:", channel).dark_blue(),
            names.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(" ")
        ),
    }
}

fn forget(current: &RefCell<Option<Target>>, channel: &ChannelName) {
    let mut current = current.borrow_mut();
    if matches!(current.as_ref(), Some(Target::Channel(c)) if c == channel) {
        *current = None;
    }
}

// server text may carry escape sequences that would mess with the terminal
fn clean(text: &str) -> String {
    strip_ansi_escapes::strip_str(text)
}
