//! DOM tree data structures, event dispatch and the task queue.
//!
//! [`Document`] is a cheap cloneable handle over a single-threaded arena.
//! Handlers registered with [`Document::add_event_listener`] and tasks queued
//! with [`Document::queue_task`] run while no internal borrow is held, so
//! they may call back into the document freely.

mod events;
mod tasks;
mod tree;

pub use events::Event;
pub use events::ListenerId;
pub use tasks::TaskId;
pub use tree::NodeId;
pub use tree::VOID_ELEMENTS;
pub use tree::is_void_element;

use core::fmt;
use events::ListenerStore;
use std::cell::RefCell;
use std::rc::Rc;
use tasks::TaskQueue;
use tr_core::TrellisResult;
use tr_css::SelectorList;
use tracing::trace;
use tree::Tree;
use tree::not_found;

/// Shared handle to a document.
#[derive(Clone, Default)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

struct DocumentInner {
    tree: RefCell<Tree>,
    listeners: RefCell<ListenerStore>,
    tasks: RefCell<TaskQueue>,
}

impl Default for DocumentInner {
    fn default() -> Self {
        Self {
            tree: RefCell::new(Tree::new()),
            listeners: RefCell::new(ListenerStore::default()),
            tasks: RefCell::new(TaskQueue::default()),
        }
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.node_count())
            .field("listeners", &self.inner.listeners.borrow().len())
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// The document node; top-level elements are its children.
    pub fn root(&self) -> NodeId {
        Tree::ROOT
    }

    pub fn node_count(&self) -> usize {
        self.inner.tree.borrow().len()
    }

    /// Whether both handles point at the same document.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.inner.tree.borrow().is_element(node)
    }

    pub fn create_element(&self, parent: NodeId, tag_name: &str) -> TrellisResult<NodeId> {
        self.inner
            .tree
            .borrow_mut()
            .append_element(parent, tag_name, Vec::new())
    }

    pub fn create_element_with_attributes<I, K, V>(
        &self,
        parent: NodeId,
        tag_name: &str,
        attributes: I,
    ) -> TrellisResult<NodeId>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let attributes = attributes
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        self.inner
            .tree
            .borrow_mut()
            .append_element(parent, tag_name, attributes)
    }

    pub fn append_text(&self, parent: NodeId, text: impl Into<String>) -> TrellisResult<NodeId> {
        self.inner.tree.borrow_mut().append_text(parent, text.into())
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.tree.borrow().parent(node)
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.tree.borrow().children(node).to_vec()
    }

    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        let tree = self.inner.tree.borrow();
        tree.children(node)
            .iter()
            .copied()
            .filter(|child| tree.is_element(*child))
            .collect()
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.inner.tree.borrow().tag_name(node).map(str::to_owned)
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.inner
            .tree
            .borrow()
            .attribute(node, name)
            .map(str::to_owned)
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: impl Into<String>) -> TrellisResult<()> {
        self.inner
            .tree
            .borrow_mut()
            .set_attribute(node, name, value.into())
    }

    pub fn text_content(&self, node: NodeId) -> String {
        self.inner.tree.borrow().text_content(node)
    }

    pub fn has_class(&self, node: NodeId, class_name: &str) -> bool {
        self.inner.tree.borrow().has_class(node, class_name)
    }

    pub fn class_names(&self, node: NodeId) -> Vec<String> {
        self.inner.tree.borrow().class_names(node)
    }

    /// Adds `class_name` unless already present. Returns true when the class
    /// list changed.
    pub fn add_class(&self, node: NodeId, class_name: &str) -> TrellisResult<bool> {
        self.inner.tree.borrow_mut().add_class(node, class_name)
    }

    /// Removes every occurrence of `class_name`. Returns true when the class
    /// list changed.
    pub fn remove_class(&self, node: NodeId, class_name: &str) -> TrellisResult<bool> {
        self.inner.tree.borrow_mut().remove_class(node, class_name)
    }

    /// Flips `class_name` and returns whether it is now present.
    pub fn toggle_class(&self, node: NodeId, class_name: &str) -> TrellisResult<bool> {
        let mut tree = self.inner.tree.borrow_mut();
        if tree.has_class(node, class_name) {
            tree.remove_class(node, class_name)?;
            Ok(false)
        } else {
            tree.add_class(node, class_name)?;
            Ok(true)
        }
    }

    /// Inclusive: a node contains itself.
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.inner.tree.borrow().contains(ancestor, node)
    }

    pub fn matches(&self, node: NodeId, selector: &SelectorList) -> bool {
        let tree = self.inner.tree.borrow();
        selector.matches(&*tree, node)
    }

    /// Descendants of `scope` (excluding `scope`) matching `selector`, in
    /// document order.
    pub fn query_selector_all(&self, scope: NodeId, selector: &SelectorList) -> Vec<NodeId> {
        let tree = self.inner.tree.borrow();
        tree.descendant_elements(scope)
            .into_iter()
            .filter(|node| selector.matches(&*tree, *node))
            .collect()
    }

    pub fn query_selector(&self, scope: NodeId, selector: &SelectorList) -> Option<NodeId> {
        let tree = self.inner.tree.borrow();
        tree.descendant_elements(scope)
            .into_iter()
            .find(|node| selector.matches(&*tree, *node))
    }

    pub fn select_all(&self, scope: NodeId, selector: &str) -> TrellisResult<Vec<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        Ok(self.query_selector_all(scope, &selector))
    }

    pub fn select(&self, scope: NodeId, selector: &str) -> TrellisResult<Option<NodeId>> {
        let selector = SelectorList::parse(selector)?;
        Ok(self.query_selector(scope, &selector))
    }

    pub fn outer_html(&self, node: NodeId) -> String {
        self.inner.tree.borrow().outer_html(node)
    }

    pub fn add_event_listener(
        &self,
        node: NodeId,
        event_type: &str,
        handler: impl Fn(&mut Event) + 'static,
    ) -> TrellisResult<ListenerId> {
        if !self.inner.tree.borrow().contains_node(node) {
            return Err(not_found(node));
        }

        let id = self
            .inner
            .listeners
            .borrow_mut()
            .add(node, event_type, Rc::new(handler));
        trace!(%node, event_type, listener = ?id, "listener added");
        Ok(id)
    }

    /// Returns false when the listener was already removed.
    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        let removed = self.inner.listeners.borrow_mut().remove(id);
        if removed {
            trace!(listener = ?id, "listener removed");
        }
        removed
    }

    pub fn listener_count(&self, node: NodeId, event_type: &str) -> usize {
        self.inner.listeners.borrow().count(node, event_type)
    }

    /// Runs the listeners of `target`, then bubbles through every ancestor
    /// up to the document node.
    ///
    /// Listeners run in registration order. A listener removed before its
    /// turn is skipped, and listeners registered during the dispatch wait for
    /// the next one.
    pub fn dispatch_event(&self, target: NodeId, event_type: &str) -> TrellisResult<Event> {
        let path = {
            let tree = self.inner.tree.borrow();
            if !tree.contains_node(target) {
                return Err(not_found(target));
            }

            let mut path = Vec::new();
            let mut cursor = Some(target);
            while let Some(node) = cursor {
                path.push(node);
                cursor = tree.parent(node);
            }
            path
        };

        let horizon = self.inner.listeners.borrow().horizon();
        let mut event = Event::new(event_type, target);
        trace!(event_type, %target, depth = path.len(), "dispatching event");

        for node in path {
            event.set_current_target(node);
            let listeners = self.inner.listeners.borrow().get(node, event_type);
            for (id, handler) in listeners {
                if id >= horizon || !self.inner.listeners.borrow().is_live(id) {
                    continue;
                }
                handler(&mut event);
            }

            if event.propagation_stopped() {
                break;
            }
        }

        trace!(
            event_type,
            %target,
            default_prevented = event.default_prevented(),
            "event dispatched"
        );
        Ok(event)
    }

    pub fn click(&self, target: NodeId) -> TrellisResult<Event> {
        self.dispatch_event(target, "click")
    }

    /// Defers `task` to the next turn of the event loop.
    pub fn queue_task(&self, task: impl FnOnce() + 'static) -> TaskId {
        let id = self.inner.tasks.borrow_mut().push(Box::new(task));
        trace!(task = ?id, "task queued");
        id
    }

    /// Returns false when the task already ran or was cancelled.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        self.inner.tasks.borrow_mut().cancel(id)
    }

    pub fn pending_tasks(&self) -> usize {
        self.inner.tasks.borrow().len()
    }

    /// Runs one turn: every task queued before this call. Tasks queued while
    /// the turn runs are left for the next turn.
    pub fn run_pending_tasks(&self) -> usize {
        let horizon = self.inner.tasks.borrow().horizon();
        let mut ran = 0_usize;

        loop {
            let Some((id, task)) = self.inner.tasks.borrow_mut().pop_due(horizon) else {
                break;
            };
            trace!(task = ?id, "running task");
            task();
            ran = ran.saturating_add(1);
        }

        ran
    }

    /// Runs turns until the queue drains or `max_turns` is reached. Returns
    /// the number of tasks run.
    pub fn run_until_idle(&self, max_turns: usize) -> usize {
        let mut ran = 0_usize;
        for _ in 0..max_turns {
            if self.pending_tasks() == 0 {
                break;
            }
            ran = ran.saturating_add(self.run_pending_tasks());
        }
        ran
    }
}
