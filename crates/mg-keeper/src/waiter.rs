//! Pending requests awaiting a specific engine event

use mg_core::{unique, ActionKind, EventBody};
use std::fmt;
use tokio::sync::oneshot;

/// Predicate deciding whether an event body answers this request
pub type MatchFn = Box<dyn Fn(&EventBody) -> bool + Send + Sync>;

/// Registered half of a pending request, owned by the [`Keeper`](crate::Keeper)
pub struct Waiter {
    pub(crate) id: String,
    pub(crate) kind: ActionKind,
    pub(crate) predicate: MatchFn,
    pub(crate) sink: oneshot::Sender<EventBody>,
}

/// Caller half of a pending request; consumed by [`Keeper::wait`](crate::Keeper::wait)
pub struct Pending {
    pub(crate) id: String,
    pub(crate) kind: ActionKind,
    pub(crate) done: oneshot::Receiver<EventBody>,
}

impl Waiter {
    /// Create a waiter for `kind` events satisfying `predicate`
    pub fn new<F>(kind: ActionKind, predicate: F) -> (Waiter, Pending)
    where
        F: Fn(&EventBody) -> bool + Send + Sync + 'static,
    {
        let id = unique::generate_with_prefix("waiter");
        let (sink, done) = oneshot::channel();
        let waiter = Waiter {
            id: id.clone(),
            kind,
            predicate: Box::new(predicate),
            sink,
        };
        (waiter, Pending { id, kind, done })
    }

    /// Match the event whose body carries `unique`
    pub fn for_unique(kind: ActionKind, unique: impl Into<String>) -> (Waiter, Pending) {
        let unique = unique.into();
        Self::new(kind, move |body| body.unique() == Some(unique.as_str()))
    }

    /// Match the next event of `kind`, whatever its body
    pub fn any(kind: ActionKind) -> (Waiter, Pending) {
        Self::new(kind, |_| true)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub(crate) fn matches(&self, kind: ActionKind, body: &EventBody) -> bool {
        self.kind == kind && !self.sink.is_closed() && (self.predicate)(body)
    }
}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Pending {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mg_core::{OutputEvent, PlayEvent};

    fn output(unique: &str) -> EventBody {
        EventBody::Output(OutputEvent {
            path: "rtmp://h/live".into(),
            unique: unique.into(),
            error: String::new(),
        })
    }

    #[test]
    fn test_for_unique_checks_kind_and_key() {
        let (waiter, pending) = Waiter::for_unique(ActionKind::OutputAdd, "o1");
        assert_eq!(waiter.id(), pending.id());

        assert!(waiter.matches(ActionKind::OutputAdd, &output("o1")));
        assert!(!waiter.matches(ActionKind::OutputAdd, &output("o2")));
        assert!(!waiter.matches(ActionKind::OutputRemove, &output("o1")));
    }

    #[test]
    fn test_abandoned_waiter_never_matches() {
        let (waiter, pending) = Waiter::any(ActionKind::PlayStop);
        drop(pending);
        assert!(!waiter.matches(ActionKind::PlayStop, &EventBody::Play(PlayEvent::default())));
    }
}
