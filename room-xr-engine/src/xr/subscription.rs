use bevy::prelude::*;

use super::input_source::InputSourceId;

/// Host-side hit-test stream, identified by the request that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HitTestRequestId(pub u64);

/// Who receives select gestures while a listener is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerScope {
    /// Session-wide listener for screen taps (shared AR reticle).
    Session,
    /// Listener bound to one controller.
    Source(InputSourceId),
}

/// One reversible registration made on behalf of placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    SelectListener(ListenerScope),
    HitTestStream(HitTestRequestId),
    /// Per-frame pose following for a source's proxies.
    FrameFollow(InputSourceId),
    ProxyEntity(Entity),
}

/// Owned list of cancelable registrations.
///
/// Cancelling removes the entry, so cancelling twice (or draining twice)
/// simply yields nothing the second time.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
    entries: Vec<Registration>,
}

impl SubscriptionSet {
    pub fn register(&mut self, registration: Registration) {
        self.entries.push(registration);
    }

    /// Cancel every registration matching `predicate`, oldest first.
    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&Registration) -> bool) -> Vec<Registration> {
        let mut cancelled = Vec::new();
        self.entries.retain(|registration| {
            if predicate(registration) {
                cancelled.push(*registration);
                false
            } else {
                true
            }
        });
        cancelled
    }

    /// Cancel everything, most recent first.
    pub fn drain(&mut self) -> Vec<Registration> {
        self.entries.drain(..).rev().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_is_idempotent() {
        let mut set = SubscriptionSet::default();
        set.register(Registration::SelectListener(ListenerScope::Session));
        let session = |r: &Registration| matches!(r, Registration::SelectListener(_));
        assert_eq!(
            set.cancel_where(session),
            vec![Registration::SelectListener(ListenerScope::Session)]
        );
        assert!(set.cancel_where(session).is_empty());
        assert!(set.is_empty());
    }

    #[test]
    fn drain_releases_in_reverse_registration_order() {
        let mut set = SubscriptionSet::default();
        set.register(Registration::HitTestStream(HitTestRequestId(1)));
        set.register(Registration::FrameFollow(InputSourceId(3)));
        assert_eq!(
            set.drain(),
            vec![
                Registration::FrameFollow(InputSourceId(3)),
                Registration::HitTestStream(HitTestRequestId(1)),
            ]
        );
        assert!(set.drain().is_empty());
    }

    #[test]
    fn cancel_where_keeps_unmatched_entries() {
        let mut set = SubscriptionSet::default();
        set.register(Registration::HitTestStream(HitTestRequestId(1)));
        set.register(Registration::SelectListener(ListenerScope::Session));
        let cancelled = set.cancel_where(|r| matches!(r, Registration::HitTestStream(_)));
        assert_eq!(cancelled, vec![Registration::HitTestStream(HitTestRequestId(1))]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.drain(), vec![Registration::SelectListener(ListenerScope::Session)]);
    }
}
