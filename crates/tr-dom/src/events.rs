use crate::NodeId;
use core::fmt;
use std::rc::Rc;

/// Handle returned by `Document::add_event_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

pub(crate) type EventHandler = Rc<dyn Fn(&mut Event)>;

/// Event state threaded through every listener of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    event_type: String,
    target: NodeId,
    current_target: NodeId,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl Event {
    pub(crate) fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_owned(),
            target,
            current_target: target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// The node the event was dispatched to.
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// The node whose listeners are currently running.
    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub(crate) fn set_current_target(&mut self, node: NodeId) {
        self.current_target = node;
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Stops bubbling after the listeners of the current node have run.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }
}

struct RegisteredListener {
    id: ListenerId,
    node: NodeId,
    event_type: String,
    handler: EventHandler,
}

/// Listeners in registration order.
#[derive(Default)]
pub(crate) struct ListenerStore {
    listeners: Vec<RegisteredListener>,
    next_id: u64,
}

impl ListenerStore {
    pub(crate) fn add(&mut self, node: NodeId, event_type: &str, handler: EventHandler) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        self.listeners.push(RegisteredListener {
            id,
            node,
            event_type: event_type.to_owned(),
            handler,
        });
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        match self.listeners.iter().position(|listener| listener.id == id) {
            Some(position) => {
                self.listeners.remove(position);
                true
            }
            None => false,
        }
    }

    pub(crate) fn is_live(&self, id: ListenerId) -> bool {
        self.listeners.iter().any(|listener| listener.id == id)
    }

    /// First id that will be handed out; listeners at or above it were
    /// registered after this call.
    pub(crate) fn horizon(&self) -> ListenerId {
        ListenerId(self.next_id)
    }

    pub(crate) fn get(&self, node: NodeId, event_type: &str) -> Vec<(ListenerId, EventHandler)> {
        self.listeners
            .iter()
            .filter(|listener| listener.node == node && listener.event_type == event_type)
            .map(|listener| (listener.id, Rc::clone(&listener.handler)))
            .collect()
    }

    pub(crate) fn count(&self, node: NodeId, event_type: &str) -> usize {
        self.listeners
            .iter()
            .filter(|listener| listener.node == node && listener.event_type == event_type)
            .count()
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl fmt::Debug for ListenerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerStore")
            .field("listeners", &self.listeners.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}
