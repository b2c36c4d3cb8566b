//! Copy-on-write event aggregators and the executed-event payloads

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock,
    },
};

use crate::{
    context::InteractionContext,
    error::ExecuteResult,
    info::{
        AutocompleteInfo, ComponentCommandInfo, ContextCommandInfo, ModalCommandInfo,
        SlashCommandInfo,
    },
};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Entry<T> {
    id: u64,
    callback: Callback<T>,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: Arc::clone(&self.callback),
        }
    }
}

/// Token returned by [`Event::subscribe`], used to unsubscribe later
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

/// A multicast event with a copy-on-write subscriber list
///
/// Subscribers added or removed while a dispatch is in flight do not affect
/// that dispatch; `publish` snapshots the list and never holds a lock while
/// invoking callbacks.
pub struct Event<T> {
    subscribers: RwLock<Arc<Vec<Entry<T>>>>,
    next_id: AtomicU64,
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self {
            subscribers: RwLock::new(Arc::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T> fmt::Debug for Event<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl<T> Event<T> {
    /// Register a subscriber, returning a token that removes it again
    pub fn subscribe(&self, f: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        let mut next = Vec::clone(&subs);
        next.push(Entry {
            id,
            callback: Arc::new(f),
        });
        *subs = Arc::new(next);
        Subscription(id)
    }

    /// Remove a previously registered subscriber
    ///
    /// Returns `false` if the token was already removed.
    pub fn unsubscribe(&self, token: Subscription) -> bool {
        let mut subs = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        let before = subs.len();
        let next: Vec<_> = subs.iter().filter(|e| e.id != token.0).cloned().collect();
        let removed = next.len() != before;
        *subs = Arc::new(next);
        removed
    }

    /// Number of live subscribers
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// True if no subscribers are registered
    #[must_use]
    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// Invoke every subscriber registered at the time of the call
    pub fn publish(&self, payload: &T) {
        let snapshot = Arc::clone(&self.subscribers.read().unwrap_or_else(|e| e.into_inner()));
        for entry in snapshot.iter() {
            (entry.callback)(payload);
        }
    }
}

macro_rules! executed_event {
    ($(#[doc = $doc:literal] $name:ident => $info:ty),* $(,)?) => {
        $(
            #[doc = $doc]
            #[derive(Debug, Clone)]
            pub struct $name {
                /// The resolved command, absent when lookup missed
                pub command: Option<Arc<$info>>,
                /// Context of the invocation
                pub ctx: InteractionContext,
                /// Outcome of the pipeline run
                pub result: ExecuteResult,
            }
        )*
    };
}

executed_event! {
    ///Published once per slash-command pipeline run
    SlashExecuted => SlashCommandInfo,
    ///Published once per context-command pipeline run
    ContextExecuted => ContextCommandInfo,
    ///Published once per component pipeline run
    ComponentExecuted => ComponentCommandInfo,
    ///Published once per modal-submit pipeline run
    ModalExecuted => ModalCommandInfo,
    ///Published once per autocomplete pipeline run
    AutocompleteExecuted => AutocompleteInfo,
}

/// The full set of executed events exposed by the framework facade
#[derive(Debug, Default)]
pub struct FrameworkEvents {
    /// Slash-command outcomes
    pub slash_executed: Event<SlashExecuted>,
    /// Context-command outcomes
    pub context_executed: Event<ContextExecuted>,
    /// Component outcomes
    pub component_executed: Event<ComponentExecuted>,
    /// Modal-submit outcomes
    pub modal_executed: Event<ModalExecuted>,
    /// Autocomplete outcomes
    pub autocomplete_executed: Event<AutocompleteExecuted>,
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::Event;

    #[test]
    fn publish_reaches_every_subscriber() {
        let event = Event::<u32>::default();
        let hits = Arc::new(AtomicUsize::new(0));

        let (a, b) = (Arc::clone(&hits), Arc::clone(&hits));
        event.subscribe(move |v| {
            a.fetch_add(*v as usize, Ordering::SeqCst);
        });
        let token = event.subscribe(move |v| {
            b.fetch_add(*v as usize, Ordering::SeqCst);
        });

        event.publish(&2);
        assert_eq!(hits.load(Ordering::SeqCst), 4);

        assert!(event.unsubscribe(token));
        assert!(!event.unsubscribe(token));
        event.publish(&2);
        assert_eq!(hits.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn subscribers_added_mid_dispatch_miss_the_in_flight_publish() {
        let event = Arc::new(Event::<()>::default());
        let late_hits = Arc::new(AtomicUsize::new(0));

        let ev = Arc::clone(&event);
        let hits = Arc::clone(&late_hits);
        event.subscribe(move |()| {
            let hits = Arc::clone(&hits);
            ev.subscribe(move |()| {
                hits.fetch_add(1, Ordering::SeqCst);
            });
        });

        event.publish(&());
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);
        event.publish(&());
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }
}
