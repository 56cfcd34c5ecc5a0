//! Typed publish/subscribe.
//!
//! Each component defines an event enum plus a fieldless kind enum. Listeners
//! register for one kind and receive every event of that kind by reference.

use std::fmt;

/// An event that can be routed by kind.
pub trait Event {
    type Kind: Copy + Eq + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

/// Handle returned by [`Emitter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Listener<E: Event> {
    id: SubscriptionId,
    kind: E::Kind,
    handler: Box<dyn FnMut(&E)>,
}

/// Registry of listeners for one event type.
pub struct Emitter<E: Event> {
    next_id: u64,
    listeners: Vec<Listener<E>>,
}

impl<E: Event> Emitter<E> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    /// Register `handler` for events of `kind`.
    pub fn subscribe<F>(&mut self, kind: E::Kind, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            kind,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|listener| listener.id != id);
        self.listeners.len() != before
    }

    /// Deliver `event` to every listener of its kind, in subscription order.
    /// Returns the number of listeners invoked.
    pub fn emit(&mut self, event: &E) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for listener in self.listeners.iter_mut().filter(|l| l.kind == kind) {
            (listener.handler)(event);
            delivered += 1;
        }
        delivered
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.listeners.iter().filter(|l| l.kind == kind).count()
    }
}

impl<E: Event> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug)]
    enum Ping {
        Ping(u32),
        Pong,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum PingKind {
        Ping,
        Pong,
    }

    impl Event for Ping {
        type Kind = PingKind;

        fn kind(&self) -> PingKind {
            match self {
                Ping::Ping(_) => PingKind::Ping,
                Ping::Pong => PingKind::Pong,
            }
        }
    }

    #[test]
    fn test_emit_routes_by_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut emitter = Emitter::new();

        let sink = seen.clone();
        emitter.subscribe(PingKind::Ping, move |event: &Ping| {
            if let Ping::Ping(n) = event {
                sink.borrow_mut().push(*n);
            }
        });

        assert_eq!(emitter.emit(&Ping::Ping(1)), 1);
        assert_eq!(emitter.emit(&Ping::Pong), 0);
        assert_eq!(emitter.emit(&Ping::Ping(2)), 1);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut emitter = Emitter::new();

        let sink = count.clone();
        let id = emitter.subscribe(PingKind::Pong, move |_: &Ping| *sink.borrow_mut() += 1);
        assert_eq!(emitter.listener_count(PingKind::Pong), 1);

        emitter.emit(&Ping::Pong);
        assert!(emitter.unsubscribe(id));
        assert!(!emitter.unsubscribe(id));
        emitter.emit(&Ping::Pong);

        assert_eq!(*count.borrow(), 1);
        assert_eq!(emitter.listener_count(PingKind::Pong), 0);
    }
}
