use chrono::{DateTime, Local};
use indexmap::IndexSet;

use crate::{
    irc::{Nickname, Target},
    session::SessionId,
};

/// the state of one conversation on a session: a channel, a private query, or the session's
/// primary status context when there is no target.
///
/// the context only refers to its session by id and never keeps it alive.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    session: SessionId,
    target: Option<Target>,
    // nicknames in the order they were first seen
    members: IndexSet<Nickname>,
    opened_at: DateTime<Local>,
}

impl ConversationContext {
    /// the status context of a session
    pub fn primary(session: SessionId) -> Self {
        Self::with_target(session, None)
    }

    pub fn new(session: SessionId, target: Target) -> Self {
        Self::with_target(session, Some(target))
    }

    fn with_target(session: SessionId, target: Option<Target>) -> Self {
        Self {
            session,
            target,
            members: IndexSet::new(),
            opened_at: Local::now(),
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub(super) fn set_target(&mut self, target: Target) {
        self.target = Some(target);
    }

    pub fn is_primary(&self) -> bool {
        self.target.is_none()
    }

    pub fn opened_at(&self) -> DateTime<Local> {
        self.opened_at
    }

    pub fn members(&self) -> impl Iterator<Item = &Nickname> {
        self.members.iter()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn has_member(&self, nick: &Nickname) -> bool {
        self.members.contains(nick)
    }

    /// returns false if the nick was already a member
    pub fn add_member(&mut self, nick: Nickname) -> bool {
        self.members.insert(nick)
    }

    pub fn remove_member(&mut self, nick: &Nickname) -> bool {
        self.members.shift_remove(nick)
    }

    /// renames a member in place. does nothing if `old` is not a member.
    pub fn rename_member(&mut self, old: &Nickname, new: Nickname) -> bool {
        let Some(idx) = self.members.get_index_of(old) else {
            return false;
        };
        self.members.shift_remove_index(idx);
        if !self.members.contains(&new) {
            let (end, _) = self.members.insert_full(new);
            self.members.move_index(end, idx);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nick(s: &str) -> Nickname {
        Nickname::new(s).unwrap()
    }

    #[test]
    fn membership_is_case_insensitive_and_ordered() {
        let mut context = ConversationContext::new(SessionId(0), Target::new("#a").unwrap());
        assert!(context.add_member(nick("alice")));
        assert!(context.add_member(nick("bob")));
        assert!(!context.add_member(nick("ALICE")));
        assert_eq!(context.member_count(), 2);

        assert!(context.rename_member(&nick("Alice"), nick("carol")));
        assert_eq!(
            context.members().map(Nickname::as_str).collect::<Vec<_>>(),
            ["carol", "bob"]
        );

        assert!(context.remove_member(&nick("BOB")));
        assert!(!context.remove_member(&nick("bob")));
        assert!(!context.rename_member(&nick("bob"), nick("dave")));
    }

    #[test]
    fn primary_has_no_target() {
        let context = ConversationContext::primary(SessionId(3));
        assert!(context.is_primary());
        assert_eq!(context.target(), None);
        assert_eq!(context.session(), SessionId(3));
    }
}
