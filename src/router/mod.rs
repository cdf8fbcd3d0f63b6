use indexmap::IndexMap;
use log::*;

use crate::{irc::Target, session::SessionId};

mod context;

pub use context::ConversationContext;

type ContextKey = (SessionId, Option<Target>);

/// keeps exactly one conversation context per (session, target) pair.
///
/// iteration order groups contexts by session: each session's contexts are contiguous, its
/// primary context first, then the others in the order they were opened.
#[derive(Debug, Default)]
pub struct TargetRouter {
    contexts: IndexMap<ContextKey, ConversationContext>,
}

impl TargetRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// adds a context next to the other contexts of its session.
    ///
    /// # Panics
    /// if the session already has a context for the same target. callers check with
    /// `find_context` first, so a duplicate means the routing logic is broken.
    pub fn add_context(&mut self, context: ConversationContext) {
        let key = (context.session(), context.target().cloned());
        assert!(
            !self.contexts.contains_key(&key),
            "duplicate conversation context for {} {:?}",
            key.0,
            key.1
        );

        let idx = match (self.group(context.session()), context.is_primary()) {
            (None, _) => self.contexts.len(),
            (Some((first, _)), true) => first,
            (Some((_, last)), false) => last + 1,
        };
        debug!("opening context {} {:?} at {}", key.0, key.1, idx);
        self.contexts.shift_insert(idx, key, context);
    }

    /// removes a context. removing one that is not there does nothing.
    pub fn remove_context(
        &mut self,
        session: SessionId,
        target: Option<&Target>,
    ) -> Option<ConversationContext> {
        let removed = self.contexts.shift_remove(&(session, target.cloned()));
        if removed.is_some() {
            debug!("closed context {} {:?}", session, target);
        }
        removed
    }

    pub fn find_context(
        &self,
        session: SessionId,
        target: Option<&Target>,
    ) -> Option<&ConversationContext> {
        self.contexts.get(&(session, target.cloned()))
    }

    pub fn find_context_mut(
        &mut self,
        session: SessionId,
        target: Option<&Target>,
    ) -> Option<&mut ConversationContext> {
        self.contexts.get_mut(&(session, target.cloned()))
    }

    /// moves a context to a new target, keeping its place and its state. does nothing and returns
    /// false if there is no context for `old` or another context already has `new`.
    pub fn rename_target(&mut self, session: SessionId, old: &Target, new: Target) -> bool {
        let old_key = (session, Some(old.clone()));
        let new_key = (session, Some(new.clone()));
        // targets differing only in case share a key, so that is a respelling
        if new_key != old_key && self.contexts.contains_key(&new_key) {
            warn!("not moving context {} {} to {}, which is already open", session, old, new);
            return false;
        }
        let Some((idx, _, mut context)) = self.contexts.shift_remove_full(&old_key) else {
            return false;
        };

        debug!("moving context {} {} to {}", session, old, new);
        context.set_target(new);
        self.contexts.shift_insert(idx, new_key, context);
        true
    }

    /// removes every context of the session except the primary one
    pub fn remove_targets(&mut self, session: SessionId) -> Vec<ConversationContext> {
        self.remove_where(|(s, target)| *s == session && target.is_some())
    }

    /// removes every context of the session, the primary one included
    pub fn remove_session(&mut self, session: SessionId) -> Vec<ConversationContext> {
        self.remove_where(|(s, _)| *s == session)
    }

    pub fn contexts_for(&self, session: SessionId) -> impl Iterator<Item = &ConversationContext> {
        self.contexts.values().filter(move |c| c.session() == session)
    }

    pub fn contexts_for_mut(
        &mut self,
        session: SessionId,
    ) -> impl Iterator<Item = &mut ConversationContext> {
        self.contexts
            .values_mut()
            .filter(move |c| c.session() == session)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationContext> {
        self.contexts.values()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    // first and last index of the session's contexts
    fn group(&self, session: SessionId) -> Option<(usize, usize)> {
        let mut indices = self
            .contexts
            .keys()
            .enumerate()
            .filter(|(_, (s, _))| *s == session)
            .map(|(idx, _)| idx);
        let first = indices.next()?;
        let last = indices.last().unwrap_or(first);
        Some((first, last))
    }

    fn remove_where(&mut self, pred: impl Fn(&ContextKey) -> bool) -> Vec<ConversationContext> {
        let keys = self
            .contexts
            .keys()
            .filter(|key| pred(key))
            .cloned()
            .collect::<Vec<_>>();
        keys.iter()
            .filter_map(|key| self.contexts.shift_remove(key))
            .collect()
    }
}
