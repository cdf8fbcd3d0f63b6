use core::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

use crate::constants::names::CHANNEL_TYPES;

// channel names and nicknames compare with ASCII casemapping: `#Rust` and `#rust` are the same
// channel. the spelling that was first seen is kept for display.
macro_rules! casefolded_name {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(String);

        impl $name {
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// compares against a raw name using the casemapping
            pub fn matches(&self, other: &str) -> bool {
                self.0.eq_ignore_ascii_case(other)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.matches(other.as_str())
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                for b in self.0.bytes() {
                    state.write_u8(b.to_ascii_lowercase());
                }
                // terminator so that adjacent names in a tuple key can't run together
                state.write_u8(0xFF);
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

casefolded_name!(
    /// the name of a channel, including the channel type character (typically `#`)
    ChannelName
);

casefolded_name!(
    /// the nickname of a user. no character set is enforced, servers disagree on it.
    Nickname
);

impl ChannelName {
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name: String = name.into();
        let first = name.chars().next()?;
        if CHANNEL_TYPES.contains(&first) {
            Some(Self(name))
        } else {
            None
        }
    }
}

impl Nickname {
    pub fn new(nick: impl Into<String>) -> Option<Self> {
        let nick: String = nick.into();
        if nick.is_empty() { None } else { Some(Self(nick)) }
    }
}

/// the other side of a conversation, a channel or a user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Channel(ChannelName),
    Nick(Nickname),
}

impl Target {
    /// everything that starts with a channel type is a channel, everything else is a nick.
    /// returns `None` for the empty string.
    pub fn new(s: impl Into<String>) -> Option<Self> {
        let s: String = s.into();
        let first = s.chars().next()?;
        if CHANNEL_TYPES.contains(&first) {
            ChannelName::new(s).map(Target::Channel)
        } else {
            Nickname::new(s).map(Target::Nick)
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Target::Channel(channel) => channel.as_str(),
            Target::Nick(nick) => nick.as_str(),
        }
    }

    pub fn is_channel(&self) -> bool {
        matches!(self, Target::Channel(_))
    }
}

impl From<ChannelName> for Target {
    fn from(channel: ChannelName) -> Self {
        Target::Channel(channel)
    }
}

impl From<Nickname> for Target {
    fn from(nick: Nickname) -> Self {
        Target::Nick(nick)
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn classifies_by_first_char() {
        assert!(matches!(Target::new("#rust"), Some(Target::Channel(_))));
        assert!(matches!(Target::new("&local"), Some(Target::Channel(_))));
        assert!(matches!(Target::new("alice"), Some(Target::Nick(_))));
        assert_eq!(Target::new(""), None);
    }

    #[test]
    fn comparison_ignores_ascii_case() {
        assert_eq!(Target::new("#Rust"), Target::new("#rust"));
        assert_eq!(Nickname::new("ALICE"), Nickname::new("alice"));
        assert_ne!(Target::new("#rust"), Target::new("rust"));

        let set = ["#Rust", "#rust", "#RUST"]
            .into_iter()
            .filter_map(Target::new)
            .collect::<HashSet<_>>();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn keeps_original_spelling() {
        let target = Target::new("#Rust").unwrap();
        assert_eq!(target.as_str(), "#Rust");
        assert_eq!(target.to_string(), "#Rust");
    }

    #[test]
    fn channel_name_requires_channel_type() {
        assert!(ChannelName::new("rust").is_none());
        assert!(ChannelName::new("").is_none());
        assert!(Nickname::new("").is_none());
    }
}
