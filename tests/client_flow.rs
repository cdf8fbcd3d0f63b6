use std::{
    cell::RefCell,
    rc::Rc,
    sync::mpsc::{self, Receiver},
};

use irc_session::{
    irc::client::ClientMessage, ChannelName, Client, ClientError, ClientInfo, CtcpCommand,
    EventKind, Nickname, SessionConfig, SessionError, SessionId, SessionState, Target,
};

struct Harness {
    client: Client,
    id: SessionId,
    outgoing: Receiver<ClientMessage>,
}

impl Harness {
    fn new() -> Self {
        let mut client = Client::new(ClientInfo::new("floe", "0.9"));
        let id = client.add_session(SessionConfig::new("alice"));
        // replaced on connect
        let (_, outgoing) = mpsc::channel();
        Self {
            client,
            id,
            outgoing,
        }
    }

    fn registered() -> Self {
        let mut harness = Self::new();
        harness.connect();
        harness.feed(":irc.example.org 001 alice :Welcome to the network");
        harness.sent();
        harness
    }

    /// connects on a fresh transport, like after a reconnect
    fn connect(&mut self) {
        let (sender, outgoing) = mpsc::channel();
        self.outgoing = outgoing;
        self.client.connect(self.id, sender).unwrap();
    }

    fn feed(&mut self, line: &str) {
        self.client.handle_line(self.id, line).unwrap();
    }

    fn sent(&self) -> Vec<String> {
        self.outgoing
            .try_iter()
            .map(|msg| msg.irc_str().unwrap())
            .collect()
    }

    fn has_context(&self, name: &str) -> bool {
        let target = Target::new(name).unwrap();
        self.client.find_context(self.id, Some(&target)).is_some()
    }
}

#[test]
fn reconnecting_closes_everything_but_the_primary_context() {
    let mut h = Harness::registered();
    h.feed(":alice!a@host JOIN #a");
    h.feed(":alice!a@host JOIN #b");
    assert!(h.has_context("#a"));
    assert!(h.has_context("#b"));

    h.client.transport_closed(h.id).unwrap();
    // contexts survive the disconnect itself, so their history can still be read
    assert_eq!(h.client.router().contexts_for(h.id).count(), 3);

    h.connect();
    let remaining = h.client.router().contexts_for(h.id).collect::<Vec<_>>();
    assert_eq!(remaining.len(), 1);
    assert!(remaining[0].is_primary());
}

#[test]
fn self_join_opens_context_and_others_only_update_members() {
    let mut h = Harness::registered();
    h.feed(":bob!b@host JOIN #rust");
    assert!(!h.has_context("#rust"));

    h.feed(":alice!a@host JOIN #rust");
    h.feed(":bob!b@host JOIN #rust");
    h.feed(":irc.example.org 353 alice = #rust :alice @carol");

    let target = Target::new("#RUST").unwrap();
    let context = h.client.find_context(h.id, Some(&target)).unwrap();
    let members = context.members().map(Nickname::as_str).collect::<Vec<_>>();
    assert_eq!(members, ["alice", "bob", "carol"]);

    h.feed(":bob!b@host PART #rust");
    h.feed(":carol!c@host QUIT :gone");
    let context = h.client.find_context(h.id, Some(&target)).unwrap();
    assert_eq!(context.member_count(), 1);
}

#[test]
fn self_part_closes_context() {
    let mut h = Harness::registered();
    h.feed(":alice!a@host JOIN #rust");
    h.feed(":alice!a@host PART #rust :later");
    assert!(!h.has_context("#rust"));
    // parting again is harmless
    h.feed(":alice!a@host PART #rust");
    assert!(h.client.find_context(h.id, None).is_some());
}

#[test]
fn kick_closes_context_only_when_we_are_kicked() {
    let mut h = Harness::registered();
    h.feed(":alice!a@host JOIN #rust");
    h.feed(":bob!b@host JOIN #rust");

    h.feed(":op!o@host KICK #rust bob :spam");
    assert!(h.has_context("#rust"));

    h.feed(":op!o@host KICK #rust alice :bye");
    assert!(!h.has_context("#rust"));
}

#[test]
fn ctcp_version_gets_one_reply_to_the_sender() {
    let mut h = Harness::registered();
    h.feed(":alice!a@b PRIVMSG alice :\u{1}VERSION\u{1}");
    assert_eq!(h.sent(), ["NOTICE alice :\u{1}VERSION floe 0.9\u{1}\r\n"]);
}

#[test]
fn ctcp_ping_echoes_its_token() {
    let mut h = Harness::registered();
    h.feed(":bob!b@host PRIVMSG alice :\u{1}PING 12345\u{1}");
    assert_eq!(h.sent(), ["NOTICE bob :\u{1}PONG 12345\u{1}\r\n"]);

    h.feed(":bob!b@host PRIVMSG alice :\u{1}PING\u{1}");
    assert_eq!(h.sent(), ["NOTICE bob :\u{1}PONG\u{1}\r\n"]);
}

#[test]
fn ctcp_clientinfo_lists_supported_commands() {
    let mut h = Harness::registered();
    h.feed(":bob!b@host PRIVMSG #rust :\u{1}CLIENTINFO\u{1}");
    assert_eq!(
        h.sent(),
        ["NOTICE bob :\u{1}CLIENTINFO VERSION PING CLIENTINFO ACTION\u{1}\r\n"]
    );
}

#[test]
fn unknown_ctcp_and_replies_are_not_answered() {
    let mut h = Harness::registered();
    h.feed(":bob!b@host PRIVMSG alice :\u{1}FOO bar\u{1}");
    h.feed(":bob!b@host NOTICE alice :\u{1}VERSION other 1.0\u{1}");
    h.feed(":bob!b@host PRIVMSG alice :\u{1}\u{1}");
    assert!(h.sent().is_empty());
}

#[test]
fn subscribers_see_events_after_routing() {
    let mut h = Harness::registered();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let _sub = h.client.bus().subscribe(h.id, {
        let seen = Rc::clone(&seen);
        move |event| seen.borrow_mut().push(event.kind.clone())
    });

    h.feed(":alice!a@host JOIN #rust");
    h.feed(":bob!b@host PRIVMSG alice :\u{1}PING 1\u{1}");
    h.client.quit(h.id, "Leaving").unwrap();

    let seen = seen.borrow();
    assert!(matches!(
        &seen[0],
        EventKind::Joined { channel, is_self: true, .. } if channel.as_str() == "#rust"
    ));
    assert!(matches!(
        &seen[1],
        EventKind::CtcpCommandReceived { command, .. } if *command == CtcpCommand::new("PING").arg("1")
    ));
    assert_eq!(seen[2], EventKind::StateChanged);
    assert_eq!(h.client.state(h.id), Some(SessionState::Disconnected));
    assert_eq!(
        h.sent(),
        ["NOTICE bob :\u{1}PONG 1\u{1}\r\n", "QUIT :Leaving\r\n"]
    );
}

#[test]
fn events_carry_their_session() {
    let mut h = Harness::registered();
    let last = Rc::new(RefCell::new(None));
    let _sub = h.client.bus().subscribe_all({
        let last = Rc::clone(&last);
        move |event| *last.borrow_mut() = Some(event.clone())
    });

    h.feed(":alice!a@host JOIN #rust");
    let event = last.borrow_mut().take().unwrap();
    assert_eq!(event.session, h.id);
}

#[test]
fn sessions_are_routed_independently() {
    let mut h = Harness::registered();
    let other = h.client.add_session(SessionConfig::new("alice"));

    h.feed(":alice!a@host JOIN #rust");
    let target = Target::new("#rust").unwrap();
    assert!(h.client.find_context(h.id, Some(&target)).is_some());
    assert!(h.client.find_context(other, Some(&target)).is_none());

    h.client.remove_session(other);
    let (sender, _outgoing) = mpsc::channel();
    assert!(matches!(
        h.client.connect(other, sender),
        Err(ClientError::UnknownSession(_))
    ));
}

#[test]
fn queries_are_opened_on_request() {
    let mut h = Harness::registered();
    let bob = Nickname::new("bob").unwrap();
    h.client.open_query(h.id, bob.clone()).unwrap();
    h.client.open_query(h.id, Nickname::new("BOB").unwrap()).unwrap();
    assert_eq!(h.client.router().contexts_for(h.id).count(), 2);

    h.client.close_query(h.id, bob).unwrap();
    assert!(!h.has_context("bob"));
}

#[test]
fn commands_need_a_connection() {
    let mut h = Harness::new();
    let channel = ChannelName::new("#rust").unwrap();
    assert!(matches!(
        h.client.join(h.id, channel),
        Err(ClientError::Session(SessionError::NotConnected))
    ));
    assert!(matches!(
        h.client.quit(h.id, "bye"),
        Err(ClientError::Session(SessionError::NotConnected))
    ));
}

#[test]
fn garbage_lines_are_dropped() {
    let mut h = Harness::registered();
    h.feed(":nothing-else");
    h.feed("");
    h.feed(":!@ PRIVMSG alice :hello");
    assert_eq!(h.client.state(h.id), Some(SessionState::Connected));
}

#[test]
fn losing_the_transport_mid_reply_disconnects() {
    let Harness {
        mut client,
        id,
        outgoing,
    } = Harness::registered();
    drop(outgoing);

    client
        .handle_line(id, ":bob!b@host PRIVMSG alice :\u{1}VERSION\u{1}")
        .unwrap();
    assert_eq!(client.state(id), Some(SessionState::Disconnected));
}

#[test]
fn reconnecting_after_the_transport_died() {
    let mut h = Harness::registered();
    h.feed(":alice!a@host JOIN #a");
    h.feed(":bob!b@host PRIVMSG alice :hi");
    h.client.open_query(h.id, Nickname::new("bob").unwrap()).unwrap();

    // the transport thread is gone along with its receiver
    let (_, dead) = mpsc::channel();
    drop(std::mem::replace(&mut h.outgoing, dead));
    h.client.transport_closed(h.id).unwrap();

    let states = Rc::new(RefCell::new(Vec::new()));
    let _sub = h.client.bus().subscribe(h.id, {
        let states = Rc::clone(&states);
        move |event| states.borrow_mut().push(event.kind.clone())
    });
    h.connect();

    assert_eq!(h.client.state(h.id), Some(SessionState::Connecting));
    assert_eq!(*states.borrow(), [EventKind::StateChanged]);
    assert!(!h.has_context("#a"));
    assert!(!h.has_context("bob"));
    assert_eq!(h.sent(), ["NICK :alice\r\n", "USER alice 0 * :alice\r\n"]);
}

#[test]
fn failed_reconnect_still_closes_old_contexts() {
    let mut h = Harness::registered();
    h.feed(":alice!a@host JOIN #a");
    h.client.transport_closed(h.id).unwrap();

    // the new transport dies before registration goes out
    let (sender, receiver) = mpsc::channel();
    drop(receiver);
    assert!(matches!(
        h.client.connect(h.id, sender),
        Err(ClientError::Session(SessionError::TransportClosed))
    ));
    assert_eq!(h.client.state(h.id), Some(SessionState::Disconnected));
    assert!(!h.has_context("#a"));
}

#[test]
fn rejected_registration_ends_the_connection() {
    let mut h = Harness::new();
    h.connect();
    h.feed(":irc.example.org 465 * :You are banned from this server");
    assert_eq!(h.client.state(h.id), Some(SessionState::Disconnected));
}

#[test]
fn query_follows_a_renamed_peer() {
    let mut h = Harness::registered();
    h.client.open_query(h.id, Nickname::new("bob").unwrap()).unwrap();
    h.feed(":bob!b@host NICK :robert");

    assert!(!h.has_context("bob"));
    let context = h
        .client
        .find_context(h.id, Some(&Target::new("robert").unwrap()))
        .unwrap();
    assert_eq!(context.target().map(Target::as_str), Some("robert"));
}
