use crate::Menu;
use crate::MenuConfig;
use crate::MenuEvent;
use crate::emitter::Emitter;
use crate::emitter::SubscriptionId;
use core::fmt;
use std::cell::Cell;
use std::rc::Rc;
use tr_core::TrellisResult;
use tr_css::SelectorList;
use tr_dom::Document;
use tr_dom::Event;
use tr_dom::ListenerId;
use tr_dom::NodeId;
use tracing::debug;
use tracing::trace;
use tracing::warn;

/// Notifications published by a [`MenuItem`] as its submenu opens and closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemEvent {
    Active,
    Inactive,
}

impl ItemEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

/// One entry of a menu, optionally owning a nested submenu.
///
/// The item's link toggles the submenu. The item is marked with the active
/// class for as long as the submenu is open.
#[derive(Clone)]
pub struct MenuItem {
    inner: Rc<MenuItemInner>,
}

struct MenuItemInner {
    document: Document,
    element: NodeId,
    link: Option<NodeId>,
    submenu: Option<Menu>,
    config: Rc<MenuConfig>,
    link_listener: Cell<Option<ListenerId>>,
    emitter: Emitter<ItemEvent, MenuItem>,
}

impl MenuItem {
    pub(crate) fn construct(
        document: &Document,
        element: NodeId,
        config: &Rc<MenuConfig>,
        root: NodeId,
    ) -> TrellisResult<Self> {
        let selectors = config.selectors();
        let link = direct_child_match(document, element, selectors.trigger());
        let submenu = match direct_child_match(document, element, selectors.submenu()) {
            Some(submenu) => Some(Menu::construct(
                document,
                submenu,
                link,
                Rc::clone(config),
                root,
            )?),
            None => None,
        };

        let item = Self {
            inner: Rc::new(MenuItemInner {
                document: document.clone(),
                element,
                link,
                submenu,
                config: Rc::clone(config),
                link_listener: Cell::new(None),
                emitter: Emitter::new(),
            }),
        };

        if let Some(submenu) = item.submenu() {
            item.follow_submenu(submenu);
            match link {
                Some(link) => item.wire_link(link)?,
                None => debug!(item = %element, "submenu has no direct link; only programmatic toggling"),
            }
        }

        Ok(item)
    }

    pub fn element(&self) -> NodeId {
        self.inner.element
    }

    /// The first direct child matching the trigger selector.
    pub fn link(&self) -> Option<NodeId> {
        self.inner.link
    }

    pub fn has_submenu(&self) -> bool {
        self.inner.submenu.is_some()
    }

    pub fn submenu(&self) -> Option<&Menu> {
        self.inner.submenu.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .document
            .has_class(self.inner.element, self.inner.config.active_class())
    }

    pub fn on(&self, event: ItemEvent, callback: impl Fn(&MenuItem) + 'static) -> SubscriptionId {
        self.inner.emitter.on(event, callback)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.inner.emitter.off(id)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn wire_link(&self, link: NodeId) -> TrellisResult<()> {
        let weak = Rc::downgrade(&self.inner);
        let listener = self
            .inner
            .document
            .add_event_listener(link, "click", move |event| {
                if let Some(inner) = weak.upgrade() {
                    MenuItem { inner }.handle_link_click(event);
                }
            })?;
        self.inner.link_listener.set(Some(listener));
        Ok(())
    }

    fn handle_link_click(&self, event: &mut Event) {
        let Some(submenu) = self.submenu() else {
            return;
        };
        if !self.inner.config.allows_item_toggle(self) {
            trace!(item = %self.inner.element, "item guard rejected link click");
            return;
        }
        if !submenu.allows_toggle() {
            trace!(item = %self.inner.element, "toggle guard rejected link click");
            return;
        }

        event.prevent_default();
        submenu.toggle();
    }

    /// Mirrors the submenu's open state onto this item.
    fn follow_submenu(&self, submenu: &Menu) {
        for (event, active) in [(MenuEvent::Opened, true), (MenuEvent::Closed, false)] {
            let weak = Rc::downgrade(&self.inner);
            submenu.on(event, move |_| {
                if let Some(inner) = weak.upgrade() {
                    MenuItem { inner }.set_active(active);
                }
            });
        }
    }

    fn set_active(&self, active: bool) {
        let document = &self.inner.document;
        let class_name = self.inner.config.active_class();
        let result = if active {
            document.add_class(self.inner.element, class_name)
        } else {
            document.remove_class(self.inner.element, class_name)
        };
        if let Err(error) = result {
            warn!(item = %self.inner.element, %error, "failed to update item class");
        }

        let event = if active {
            ItemEvent::Active
        } else {
            ItemEvent::Inactive
        };
        trace!(item = %self.inner.element, event = event.as_str(), "item state changed");
        self.inner.emitter.emit(event, self);
    }
}

impl Drop for MenuItemInner {
    fn drop(&mut self) {
        if let Some(listener) = self.link_listener.take() {
            self.document.remove_event_listener(listener);
        }
    }
}

impl fmt::Debug for MenuItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuItem")
            .field("element", &self.inner.element)
            .field("link", &self.inner.link)
            .field("submenu", &self.inner.submenu)
            .field("active", &self.is_active())
            .finish()
    }
}

fn direct_child_match(document: &Document, parent: NodeId, selector: &SelectorList) -> Option<NodeId> {
    document
        .query_selector_all(parent, selector)
        .into_iter()
        .find(|node| document.parent(*node) == Some(parent))
}
