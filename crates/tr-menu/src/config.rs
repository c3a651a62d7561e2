use crate::Menu;
use crate::MenuItem;
use core::fmt;
use std::rc::Rc;
use tr_core::TrellisError;
use tr_core::TrellisResult;
use tr_css::SelectorList;
use tr_dom::NodeId;

pub const ITEM_SELECTOR: &str = ".js-item";
pub const TRIGGER_SELECTOR: &str = ".js-trigger";
pub const MENU_SELECTOR: &str = ".js-menu";

/// Marker class carried by open menus and their triggers.
pub const OPEN_CLASS: &str = "is-open";
/// Marker class carried by items whose submenu is open.
pub const ACTIVE_CLASS: &str = "is-active";

/// Decides whether a trigger click may toggle the given menu.
pub type MenuGuard = Rc<dyn Fn(&Menu) -> bool>;
/// Decides whether a link click may toggle the item's submenu.
pub type ItemGuard = Rc<dyn Fn(&MenuItem) -> bool>;

/// Selectors identifying items, triggers and submenu containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selectors {
    item: SelectorList,
    trigger: SelectorList,
    submenu: SelectorList,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            item: SelectorList::class("js-item"),
            trigger: SelectorList::class("js-trigger"),
            submenu: SelectorList::class("js-menu"),
        }
    }
}

impl Selectors {
    pub fn new(item: &str, trigger: &str, submenu: &str) -> TrellisResult<Self> {
        Ok(Self {
            item: SelectorList::parse(item)?,
            trigger: SelectorList::parse(trigger)?,
            submenu: SelectorList::parse(submenu)?,
        })
    }

    pub fn item(&self) -> &SelectorList {
        &self.item
    }

    pub fn trigger(&self) -> &SelectorList {
        &self.trigger
    }

    pub fn submenu(&self) -> &SelectorList {
        &self.submenu
    }
}

/// Behavior shared by every node of one menu tree.
#[derive(Clone)]
pub struct MenuConfig {
    selectors: Selectors,
    toggle_guard: Option<MenuGuard>,
    item_guard: Option<ItemGuard>,
    close_on_outside_click: bool,
    exclusive_siblings: bool,
    open_class: String,
    active_class: String,
}

impl Default for MenuConfig {
    fn default() -> Self {
        Self {
            selectors: Selectors::default(),
            toggle_guard: None,
            item_guard: None,
            close_on_outside_click: true,
            exclusive_siblings: false,
            open_class: OPEN_CLASS.to_owned(),
            active_class: ACTIVE_CLASS.to_owned(),
        }
    }
}

impl fmt::Debug for MenuConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuConfig")
            .field("selectors", &self.selectors)
            .field("toggle_guard", &self.toggle_guard.is_some())
            .field("item_guard", &self.item_guard.is_some())
            .field("close_on_outside_click", &self.close_on_outside_click)
            .field("exclusive_siblings", &self.exclusive_siblings)
            .field("open_class", &self.open_class)
            .field("active_class", &self.active_class)
            .finish()
    }
}

impl MenuConfig {
    pub fn with_selectors(mut self, selectors: Selectors) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn with_toggle_guard(mut self, guard: impl Fn(&Menu) -> bool + 'static) -> Self {
        self.toggle_guard = Some(Rc::new(guard));
        self
    }

    pub fn with_item_guard(mut self, guard: impl Fn(&MenuItem) -> bool + 'static) -> Self {
        self.item_guard = Some(Rc::new(guard));
        self
    }

    pub fn with_close_on_outside_click(mut self, enabled: bool) -> Self {
        self.close_on_outside_click = enabled;
        self
    }

    /// Coordinates the submenus of every level so only one stays open.
    /// A level can opt out later with [`Menu::dissolve_exclusive_siblings`].
    pub fn with_exclusive_siblings(mut self, enabled: bool) -> Self {
        self.exclusive_siblings = enabled;
        self
    }

    pub fn with_open_class(mut self, class_name: impl Into<String>) -> Self {
        self.open_class = class_name.into();
        self
    }

    pub fn with_active_class(mut self, class_name: impl Into<String>) -> Self {
        self.active_class = class_name.into();
        self
    }

    pub fn selectors(&self) -> &Selectors {
        &self.selectors
    }

    pub fn close_on_outside_click(&self) -> bool {
        self.close_on_outside_click
    }

    pub fn exclusive_siblings(&self) -> bool {
        self.exclusive_siblings
    }

    pub fn open_class(&self) -> &str {
        &self.open_class
    }

    pub fn active_class(&self) -> &str {
        &self.active_class
    }

    pub fn allows_menu_toggle(&self, menu: &Menu) -> bool {
        self.toggle_guard.as_ref().is_none_or(|guard| guard(menu))
    }

    pub fn allows_item_toggle(&self, item: &MenuItem) -> bool {
        self.item_guard.as_ref().is_none_or(|guard| guard(item))
    }

    pub fn validate(&self) -> TrellisResult<()> {
        for (role, class_name) in [("open", &self.open_class), ("active", &self.active_class)] {
            if class_name.is_empty() || class_name.chars().any(char::is_whitespace) {
                return Err(TrellisError::new(
                    "menu.invalid_config",
                    format!("{role} class `{class_name}` must be a single non-empty class name"),
                ));
            }
        }

        Ok(())
    }
}

/// Construction input for [`Menu::build`].
#[derive(Debug, Clone)]
pub struct MenuOptions {
    pub element: NodeId,
    pub trigger: Option<NodeId>,
    pub config: MenuConfig,
}

impl MenuOptions {
    pub fn new(element: NodeId) -> Self {
        Self {
            element,
            trigger: None,
            config: MenuConfig::default(),
        }
    }

    pub fn with_trigger(mut self, trigger: NodeId) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_config(mut self, config: MenuConfig) -> Self {
        self.config = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::MenuConfig;
    use super::Selectors;
    use tr_core::TrellisResult;
    use tr_css::SelectorList;

    #[test]
    fn default_selectors_match_marker_constants() -> TrellisResult<()> {
        let selectors = Selectors::default();
        assert_eq!(selectors.item(), &SelectorList::parse(super::ITEM_SELECTOR)?);
        assert_eq!(selectors.trigger(), &SelectorList::parse(super::TRIGGER_SELECTOR)?);
        assert_eq!(selectors.submenu(), &SelectorList::parse(super::MENU_SELECTOR)?);
        assert_eq!(Selectors::new(".js-item", ".js-trigger", ".js-menu")?, selectors);
        Ok(())
    }

    #[test]
    fn rejects_unparseable_selectors() {
        let Err(error) = Selectors::new(".js-item", "a:hover", ".js-menu") else {
            panic!("pseudo-classes are unsupported");
        };
        assert!(error.is_in("css"));
    }

    #[test]
    fn validates_marker_class_names() {
        assert!(MenuConfig::default().validate().is_ok());
        assert!(MenuConfig::default().with_open_class("").validate().is_err());
        let Err(error) = MenuConfig::default().with_active_class("is active").validate() else {
            panic!("class names with spaces are rejected");
        };
        assert_eq!(error.code, "menu.invalid_config");
    }

    #[test]
    fn debug_output_hides_guard_closures() {
        let config = MenuConfig::default().with_toggle_guard(|_| false);
        let rendered = format!("{config:?}");
        assert!(rendered.contains("toggle_guard: true"));
        assert!(rendered.contains("item_guard: false"));
    }
}
