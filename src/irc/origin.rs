use core::fmt::{self, Display};

/// where a message came from, parsed from the prefix of an IRC message.
///
/// the prefix is only a peer when it has the full `nick!user@host` shape with a non-empty nick
/// and user. everything else is treated as a server name, so that a prefix that can't be
/// understood never prevents the message itself from being handled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
    Peer(Peer),
    Server(Server),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Peer {
    raw: String,
    nickname: String,
    username: Option<String>,
    hostname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Server {
    raw: String,
}

impl Origin {
    /// parses a message prefix (without the leading `:`). returns `None` only for the empty
    /// string.
    pub fn parse(raw: &str) -> Option<Origin> {
        if raw.is_empty() {
            return None;
        }

        let origin = match (raw.find('!'), raw.find('@')) {
            (Some(bang), Some(at)) if bang > 0 && at > bang + 1 => Origin::Peer(Peer::split(raw)),
            _ => Origin::Server(Server {
                raw: raw.to_string(),
            }),
        };
        Some(origin)
    }

    /// the prefix exactly as it was received
    pub fn raw(&self) -> &str {
        match self {
            Origin::Peer(peer) => peer.raw.as_str(),
            Origin::Server(server) => server.raw.as_str(),
        }
    }

    /// the nickname, if the origin is a peer
    pub fn nickname(&self) -> Option<&str> {
        match self {
            Origin::Peer(peer) => Some(peer.nickname()),
            Origin::Server(_) => None,
        }
    }

    /// the nickname of a peer, or the whole prefix for a server. some servers and bouncers send a
    /// bare nickname as the prefix, which classifies as a server, so this is the name to use when
    /// the message could have come from either.
    pub fn name(&self) -> &str {
        match self {
            Origin::Peer(peer) => peer.nickname(),
            Origin::Server(server) => server.name(),
        }
    }

    pub fn is_peer(&self) -> bool {
        matches!(self, Origin::Peer(_))
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw())
    }
}

impl Peer {
    // callers have already checked that both delimiters are present, but a missing or empty
    // segment still only results in a `None` field
    fn split(raw: &str) -> Self {
        let (nick_user, host) = match raw.split_once('@') {
            Some((nick_user, host)) => (nick_user, Some(host)),
            None => (raw, None),
        };
        let (nick, user) = match nick_user.split_once('!') {
            Some((nick, user)) => (nick, Some(user)),
            None => (nick_user, None),
        };

        Self {
            raw: raw.to_string(),
            nickname: nick.to_string(),
            username: non_empty(user),
            hostname: non_empty(host),
        }
    }

    pub fn raw(&self) -> &str {
        self.raw.as_str()
    }

    pub fn nickname(&self) -> &str {
        self.nickname.as_str()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }
}

impl Server {
    /// the server name, which is always the entire prefix
    pub fn name(&self) -> &str {
        self.raw.as_str()
    }
}

fn non_empty(s: Option<&str>) -> Option<String> {
    s.filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(raw: &str) -> Peer {
        match Origin::parse(raw) {
            Some(Origin::Peer(peer)) => peer,
            other => panic!("{:?} did not parse as a peer: {:?}", raw, other),
        }
    }

    fn assert_server(raw: &str) {
        match Origin::parse(raw) {
            Some(Origin::Server(server)) => assert_eq!(server.name(), raw),
            other => panic!("{:?} did not parse as a server: {:?}", raw, other),
        }
    }

    #[test]
    fn full_prefix_is_a_peer() {
        let peer = peer("alice!a@example.org");
        assert_eq!(peer.nickname(), "alice");
        assert_eq!(peer.username(), Some("a"));
        assert_eq!(peer.hostname(), Some("example.org"));
        assert_eq!(peer.raw(), "alice!a@example.org");
    }

    #[test]
    fn plain_names_are_servers() {
        for raw in ["irc.example.org", "alice", "a", "*.libera.chat", "x y z"] {
            assert_server(raw);
        }
    }

    #[test]
    fn misordered_or_touching_delimiters_are_servers() {
        for raw in [
            "alice@host!user",
            "alice!@host",
            "!user@host",
            "@host",
            "alice!user",
            "alice@host",
            "!@",
            "a@!b",
        ] {
            assert_server(raw);
        }
    }

    #[test]
    fn empty_prefix_is_absent() {
        assert_eq!(Origin::parse(""), None);
        assert_eq!(None.and_then(Origin::parse), None);
    }

    #[test]
    fn missing_host_is_absent_not_a_panic() {
        let peer = peer("alice!a@");
        assert_eq!(peer.nickname(), "alice");
        assert_eq!(peer.username(), Some("a"));
        assert_eq!(peer.hostname(), None);
    }

    #[test]
    fn only_first_delimiters_split() {
        let peer = peer("alice!a!b@host@more");
        assert_eq!(peer.nickname(), "alice");
        assert_eq!(peer.username(), Some("a!b"));
        assert_eq!(peer.hostname(), Some("host@more"));
    }

    #[test]
    fn display_is_raw() {
        let origin = Origin::parse("bob!b@h").unwrap();
        assert_eq!(origin.to_string(), "bob!b@h");
        assert_eq!(origin.name(), "bob");
        assert_eq!(origin.nickname(), Some("bob"));

        let origin = Origin::parse("irc.example.org").unwrap();
        assert_eq!(origin.name(), "irc.example.org");
        assert_eq!(origin.nickname(), None);
        assert!(!origin.is_peer());
    }
}
