use core::fmt;
use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;

/// Handle returned by [`Emitter::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Callback<S> = Rc<dyn Fn(&S)>;

struct Subscriber<K, S> {
    id: SubscriptionId,
    kind: K,
    callback: Callback<S>,
}

/// Named-event publisher owned by a menu or item.
///
/// Subscribers run synchronously in subscription order and receive the
/// emitting source. An emission works on a snapshot, so subscribing or
/// unsubscribing from inside a callback only affects later emissions.
pub struct Emitter<K, S> {
    subscribers: RefCell<Vec<Subscriber<K, S>>>,
    next_id: Cell<u64>,
}

impl<K, S> Default for Emitter<K, S> {
    fn default() -> Self {
        Self {
            subscribers: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }
}

impl<K: Copy + PartialEq, S> Emitter<K, S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, kind: K, callback: impl Fn(&S) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.get());
        self.next_id.set(self.next_id.get().saturating_add(1));
        self.subscribers.borrow_mut().push(Subscriber {
            id,
            kind,
            callback: Rc::new(callback),
        });
        id
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        match subscribers.iter().position(|subscriber| subscriber.id == id) {
            Some(position) => {
                subscribers.remove(position);
                true
            }
            None => false,
        }
    }

    /// Runs every subscriber of `kind`; returns how many ran.
    pub fn emit(&self, kind: K, source: &S) -> usize {
        let callbacks: Vec<Callback<S>> = self
            .subscribers
            .borrow()
            .iter()
            .filter(|subscriber| subscriber.kind == kind)
            .map(|subscriber| Rc::clone(&subscriber.callback))
            .collect();

        for callback in &callbacks {
            callback(source);
        }

        callbacks.len()
    }

    pub fn subscriber_count(&self, kind: K) -> usize {
        self.subscribers
            .borrow()
            .iter()
            .filter(|subscriber| subscriber.kind == kind)
            .count()
    }
}

impl<K, S> fmt::Debug for Emitter<K, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}
