//! Mutation events: observers of a live tree react to each applied mutation
//! instead of re-scanning the whole tree.

use crate::mutation::Mutation;
use aerial_common::Uid;
use tracing::trace;

/// Fired on the mutation's target after it was applied
#[derive(Debug, Clone, PartialEq)]
pub struct MutationEvent {
    pub target: Uid,
    pub mutation: Mutation,
}

impl MutationEvent {
    pub fn new(mutation: Mutation) -> Self {
        Self {
            target: mutation.target().clone(),
            mutation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&MutationEvent) + Send>;

/// Fan-out of mutation events to subscribed listeners, in subscription order
#[derive(Default)]
pub struct MutationDispatcher {
    listeners: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl MutationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&MutationEvent) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns `false` if the listener was not subscribed
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    pub fn dispatch(&mut self, event: &MutationEvent) {
        trace!(target_id = %event.target, kind = event.mutation.kind_name(), listeners = self.listeners.len(), "dispatching");
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl std::fmt::Debug for MutationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationDispatcher")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
