use crate::MenuConfig;
use crate::MenuItem;
use crate::MenuOptions;
use crate::emitter::Emitter;
use crate::emitter::SubscriptionId;
use crate::siblings::SiblingGroup;
use crate::siblings::coordinate_siblings;
use core::fmt;
use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;
use std::rc::Weak;
use tr_core::TrellisError;
use tr_core::TrellisResult;
use tr_dom::Document;
use tr_dom::ListenerId;
use tr_dom::NodeId;
use tr_dom::TaskId;
use tracing::debug;
use tracing::trace;
use tracing::warn;

/// Lifecycle notifications published by a [`Menu`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MenuEvent {
    Opened,
    Closed,
}

impl MenuEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Opened => "opened",
            Self::Closed => "closed",
        }
    }
}

/// Where the document-wide dismissal listener stands for one open menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutsideClick {
    Idle,
    Pending(TaskId),
    Attached(ListenerId),
}

/// One collapsible container and the items directly inside it.
///
/// `Menu` is a cheap handle; clones refer to the same node. The open state
/// lives in the document as the configured open class, so a class added or
/// removed by other code is observed by [`Menu::is_open`].
#[derive(Clone)]
pub struct Menu {
    inner: Rc<MenuInner>,
}

#[derive(Debug, Clone)]
pub(crate) struct WeakMenu(Weak<MenuInner>);

impl WeakMenu {
    pub(crate) fn upgrade(&self) -> Option<Menu> {
        self.0.upgrade().map(|inner| Menu { inner })
    }
}

struct MenuInner {
    document: Document,
    element: NodeId,
    trigger: Option<NodeId>,
    root: NodeId,
    config: Rc<MenuConfig>,
    items: Vec<MenuItem>,
    trigger_listener: Cell<Option<ListenerId>>,
    outside_click: Cell<OutsideClick>,
    exclusive_group: RefCell<Option<SiblingGroup>>,
    emitter: Emitter<MenuEvent, Menu>,
}

impl Menu {
    /// Builds the menu tree rooted at `options.element`.
    ///
    /// With a trigger, clicks on it toggle the root (subject to the toggle
    /// guard) and the root is dismissed by clicks outside it.
    pub fn build(document: &Document, options: MenuOptions) -> TrellisResult<Self> {
        let MenuOptions {
            element,
            trigger,
            config,
        } = options;

        config.validate()?;
        if !document.is_element(element) {
            return Err(TrellisError::new(
                "menu.invalid_element",
                format!("menu container {element} is not an element"),
            ));
        }
        if let Some(trigger) = trigger.filter(|trigger| !document.is_element(*trigger)) {
            return Err(TrellisError::new(
                "menu.invalid_trigger",
                format!("menu trigger {trigger} is not an element"),
            ));
        }

        let menu = Self::construct(document, element, trigger, Rc::new(config), element)?;
        if let Some(trigger) = trigger {
            menu.wire_trigger(trigger)?;
        }

        debug!(
            element = %element,
            items = menu.item_count(),
            submenus = menu.submenus().count(),
            "built menu"
        );
        Ok(menu)
    }

    pub(crate) fn construct(
        document: &Document,
        element: NodeId,
        trigger: Option<NodeId>,
        config: Rc<MenuConfig>,
        root: NodeId,
    ) -> TrellisResult<Self> {
        let items = document
            .query_selector_all(element, config.selectors().item())
            .into_iter()
            .filter(|item| document.parent(*item) == Some(element))
            .map(|item| MenuItem::construct(document, item, &config, root))
            .collect::<TrellisResult<Vec<_>>>()?;

        trace!(element = %element, items = items.len(), "discovered menu items");

        let menu = Self {
            inner: Rc::new(MenuInner {
                document: document.clone(),
                element,
                trigger,
                root,
                config,
                items,
                trigger_listener: Cell::new(None),
                outside_click: Cell::new(OutsideClick::Idle),
                exclusive_group: RefCell::new(None),
                emitter: Emitter::new(),
            }),
        };

        if let Some(trigger) = trigger {
            menu.project_open_class(trigger);
        }
        if menu.inner.config.exclusive_siblings() {
            let group = menu.coordinate_children();
            menu.inner.exclusive_group.replace(Some(group));
        }

        Ok(menu)
    }

    pub fn element(&self) -> NodeId {
        self.inner.element
    }

    pub fn trigger(&self) -> Option<NodeId> {
        self.inner.trigger
    }

    /// Zero for the root, one more for each level of nesting. Counted from
    /// the item elements between this container and the root container.
    pub fn depth(&self) -> usize {
        let document = &self.inner.document;
        let items = self.inner.config.selectors().item();
        let mut depth = 0_usize;
        if self.inner.element == self.inner.root {
            return depth;
        }

        let mut cursor = document.parent(self.inner.element);
        while let Some(node) = cursor {
            if node == self.inner.root {
                break;
            }
            if document.matches(node, items) {
                depth = depth.saturating_add(1);
            }
            cursor = document.parent(node);
        }
        depth
    }

    pub fn document(&self) -> &Document {
        &self.inner.document
    }

    pub fn config(&self) -> &MenuConfig {
        &self.inner.config
    }

    /// Every direct item in document order, with or without a submenu.
    pub fn children(&self) -> &[MenuItem] {
        &self.inner.items
    }

    pub fn item_count(&self) -> usize {
        self.inner.items.len()
    }

    pub fn submenus(&self) -> impl Iterator<Item = &Menu> + '_ {
        self.inner.items.iter().filter_map(MenuItem::submenu)
    }

    pub fn is_open(&self) -> bool {
        self.inner
            .document
            .has_class(self.inner.element, self.inner.config.open_class())
    }

    /// Opens the menu. Does nothing when it is already open.
    pub fn open(&self) -> &Self {
        if self.is_open() {
            return self;
        }

        self.set_open_class(true);
        debug!(element = %self.inner.element, depth = self.depth(), "menu opened");
        self.inner.emitter.emit(MenuEvent::Opened, self);

        // A subscriber may have closed the menu again.
        if self.is_open() && self.dismisses_on_outside_click() {
            self.schedule_outside_click();
        }
        self
    }

    /// Closes the menu. Always publishes `Closed`, even when already closed.
    pub fn close(&self) -> &Self {
        self.release_outside_click();
        self.set_open_class(false);
        debug!(element = %self.inner.element, depth = self.depth(), "menu closed");
        self.inner.emitter.emit(MenuEvent::Closed, self);
        self
    }

    pub fn toggle(&self) -> &Self {
        if self.is_open() {
            self.close()
        } else {
            self.open()
        }
    }

    pub fn on(&self, event: MenuEvent, callback: impl Fn(&Menu) + 'static) -> SubscriptionId {
        self.inner.emitter.on(event, callback)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.inner.emitter.off(id)
    }

    pub fn subscriber_count(&self, event: MenuEvent) -> usize {
        self.inner.emitter.subscriber_count(event)
    }

    /// Whether the document-wide dismissal listener is currently attached.
    pub fn has_outside_click_listener(&self) -> bool {
        matches!(self.inner.outside_click.get(), OutsideClick::Attached(_))
    }

    /// Whether the dismissal listener is queued for the next task turn.
    pub fn has_pending_outside_click(&self) -> bool {
        matches!(self.inner.outside_click.get(), OutsideClick::Pending(_))
    }

    /// Makes the submenus of this node's items mutually exclusive.
    pub fn coordinate_children(&self) -> SiblingGroup {
        let submenus: Vec<Menu> = self.submenus().cloned().collect();
        coordinate_siblings(&submenus)
    }

    /// Undoes the coordination installed by `exclusive_siblings` for this
    /// node's submenus. Returns false when there was none.
    pub fn dissolve_exclusive_siblings(&self) -> bool {
        match self.inner.exclusive_group.take() {
            Some(group) => {
                group.dissolve();
                true
            }
            None => false,
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakMenu {
        WeakMenu(Rc::downgrade(&self.inner))
    }

    pub(crate) fn allows_toggle(&self) -> bool {
        self.inner.config.allows_menu_toggle(self)
    }

    fn wire_trigger(&self, trigger: NodeId) -> TrellisResult<()> {
        let weak = self.downgrade();
        let listener = self
            .inner
            .document
            .add_event_listener(trigger, "click", move |event| {
                let Some(menu) = weak.upgrade() else {
                    return;
                };
                if menu.allows_toggle() {
                    event.prevent_default();
                    menu.toggle();
                } else {
                    trace!(element = %menu.element(), "toggle guard rejected trigger click");
                }
            })?;
        self.inner.trigger_listener.set(Some(listener));
        Ok(())
    }

    fn project_open_class(&self, trigger: NodeId) {
        for (event, open) in [(MenuEvent::Opened, true), (MenuEvent::Closed, false)] {
            let document = self.inner.document.clone();
            let class_name = self.inner.config.open_class().to_owned();
            self.on(event, move |_| {
                let result = if open {
                    document.add_class(trigger, &class_name)
                } else {
                    document.remove_class(trigger, &class_name)
                };
                if let Err(error) = result {
                    warn!(trigger = %trigger, %error, "failed to update trigger class");
                }
            });
        }
    }

    fn set_open_class(&self, open: bool) {
        let document = &self.inner.document;
        let class_name = self.inner.config.open_class();
        let result = if open {
            document.add_class(self.inner.element, class_name)
        } else {
            document.remove_class(self.inner.element, class_name)
        };
        if let Err(error) = result {
            warn!(element = %self.inner.element, %error, "failed to update menu class");
        }
    }

    fn dismisses_on_outside_click(&self) -> bool {
        self.inner.trigger.is_some() && self.inner.config.close_on_outside_click()
    }

    /// Defers attaching the dismissal listener to the next task turn so the
    /// click that opened the menu cannot reach it.
    fn schedule_outside_click(&self) {
        if self.inner.outside_click.get() != OutsideClick::Idle {
            return;
        }

        let weak = self.downgrade();
        let task = self.inner.document.queue_task(move || {
            if let Some(menu) = weak.upgrade() {
                menu.attach_outside_click();
            }
        });
        self.inner.outside_click.set(OutsideClick::Pending(task));
    }

    fn attach_outside_click(&self) {
        if !self.has_pending_outside_click() {
            return;
        }
        if !self.is_open() {
            self.inner.outside_click.set(OutsideClick::Idle);
            return;
        }

        let weak = self.downgrade();
        let root = self.inner.document.root();
        let attached = self
            .inner
            .document
            .add_event_listener(root, "click", move |event| {
                if let Some(menu) = weak.upgrade() {
                    menu.handle_outside_click(event.target());
                }
            });

        match attached {
            Ok(listener) => {
                trace!(element = %self.inner.element, "attached outside-click listener");
                self.inner.outside_click.set(OutsideClick::Attached(listener));
            }
            Err(error) => {
                warn!(element = %self.inner.element, %error, "failed to attach outside-click listener");
                self.inner.outside_click.set(OutsideClick::Idle);
            }
        }
    }

    fn handle_outside_click(&self, target: NodeId) {
        // Closed by other code removing the open class.
        if !self.is_open() {
            self.release_outside_click();
            return;
        }

        let document = &self.inner.document;
        if document.contains(self.inner.element, target) {
            return;
        }
        // Trigger clicks belong to the trigger handler and its guard.
        if self
            .inner
            .trigger
            .is_some_and(|trigger| document.contains(trigger, target))
        {
            return;
        }
        debug!(element = %self.inner.element, target = %target, "closing menu on outside click");
        self.close();
    }

    fn release_outside_click(&self) {
        match self.inner.outside_click.replace(OutsideClick::Idle) {
            OutsideClick::Idle => {}
            OutsideClick::Pending(task) => {
                self.inner.document.cancel_task(task);
            }
            OutsideClick::Attached(listener) => {
                self.inner.document.remove_event_listener(listener);
                trace!(element = %self.inner.element, "detached outside-click listener");
            }
        }
    }
}

impl Drop for MenuInner {
    fn drop(&mut self) {
        if let Some(listener) = self.trigger_listener.take() {
            self.document.remove_event_listener(listener);
        }
        match self.outside_click.replace(OutsideClick::Idle) {
            OutsideClick::Idle => {}
            OutsideClick::Pending(task) => {
                self.document.cancel_task(task);
            }
            OutsideClick::Attached(listener) => {
                self.document.remove_event_listener(listener);
            }
        }
    }
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu")
            .field("element", &self.inner.element)
            .field("trigger", &self.inner.trigger)
            .field("depth", &self.depth())
            .field("open", &self.is_open())
            .field("items", &self.inner.items.len())
            .field("outside_click", &self.inner.outside_click.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Menu;
    use super::MenuEvent;
    use crate::MenuConfig;
    use crate::MenuOptions;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tr_core::TrellisResult;
    use tr_dom::Document;
    use tr_dom::NodeId;

    fn bare_menu(document: &Document) -> TrellisResult<(NodeId, NodeId)> {
        let trigger = document.create_element_with_attributes(document.root(), "button", [("class", "js-trigger")])?;
        let element = document.create_element_with_attributes(document.root(), "ul", [("class", "js-menu")])?;
        Ok((trigger, element))
    }

    #[test]
    fn open_is_idempotent_and_close_always_publishes() -> TrellisResult<()> {
        let document = Document::new();
        let (_, element) = bare_menu(&document)?;
        let menu = Menu::build(&document, MenuOptions::new(element))?;
        let log = Rc::new(RefCell::new(Vec::new()));
        for event in [MenuEvent::Opened, MenuEvent::Closed] {
            let log = Rc::clone(&log);
            menu.on(event, move |_| log.borrow_mut().push(event.as_str()));
        }

        menu.open().open();
        menu.close().close();

        assert_eq!(*log.borrow(), vec!["opened", "closed", "closed"]);
        assert!(!menu.is_open());
        assert_eq!(document.class_names(element), vec!["js-menu"]);
        Ok(())
    }

    #[test]
    fn rootless_menu_never_schedules_dismissal() -> TrellisResult<()> {
        let document = Document::new();
        let (_, element) = bare_menu(&document)?;
        let menu = Menu::build(&document, MenuOptions::new(element))?;

        menu.open();
        assert!(!menu.has_pending_outside_click());
        assert_eq!(document.pending_tasks(), 0);
        Ok(())
    }

    #[test]
    fn trigger_mirrors_open_class() -> TrellisResult<()> {
        let document = Document::new();
        let (trigger, element) = bare_menu(&document)?;
        let menu = Menu::build(&document, MenuOptions::new(element).with_trigger(trigger))?;

        menu.open();
        assert!(document.has_class(trigger, "is-open"));
        menu.close();
        assert!(!document.has_class(trigger, "is-open"));
        Ok(())
    }

    #[test]
    fn subscriber_closing_during_open_skips_dismissal() -> TrellisResult<()> {
        let document = Document::new();
        let (trigger, element) = bare_menu(&document)?;
        let menu = Menu::build(&document, MenuOptions::new(element).with_trigger(trigger))?;
        menu.on(MenuEvent::Opened, |menu| {
            menu.close();
        });

        menu.open();
        assert!(!menu.is_open());
        assert!(!menu.has_pending_outside_click());
        assert_eq!(document.pending_tasks(), 0);
        Ok(())
    }

    #[test]
    fn rejects_non_element_nodes() -> TrellisResult<()> {
        let document = Document::new();
        let text = document.append_text(document.root(), "menu")?;
        let (_, element) = bare_menu(&document)?;

        let Err(error) = Menu::build(&document, MenuOptions::new(text)) else {
            panic!("text nodes cannot host a menu");
        };
        assert_eq!(error.code, "menu.invalid_element");

        let Err(error) = Menu::build(&document, MenuOptions::new(element).with_trigger(text)) else {
            panic!("text nodes cannot trigger a menu");
        };
        assert_eq!(error.code, "menu.invalid_trigger");

        let config = MenuConfig::default().with_open_class("open now");
        let Err(error) = Menu::build(&document, MenuOptions::new(element).with_config(config)) else {
            panic!("class names with whitespace are rejected");
        };
        assert_eq!(error.code, "menu.invalid_config");
        Ok(())
    }
}
