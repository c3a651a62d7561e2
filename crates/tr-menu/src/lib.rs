//! Hierarchical dropdown menus over a [`tr_dom::Document`].
//!
//! [`Menu::build`] scans a container for its direct items, recursively builds
//! a submenu for every item that has one, and wires the click handling:
//! triggers toggle their menu, outside clicks dismiss it, and items follow
//! their submenu's open state.

mod config;
mod emitter;
mod item;
mod menu;
mod siblings;


pub use config::ACTIVE_CLASS;
pub use config::ITEM_SELECTOR;
pub use config::ItemGuard;
pub use config::MENU_SELECTOR;
pub use config::MenuConfig;
pub use config::MenuGuard;
pub use config::MenuOptions;
pub use config::OPEN_CLASS;
pub use config::Selectors;
pub use config::TRIGGER_SELECTOR;
pub use emitter::Emitter;
pub use emitter::SubscriptionId;
pub use item::ItemEvent;
pub use item::MenuItem;
pub use menu::Menu;
pub use menu::MenuEvent;
pub use siblings::SiblingGroup;
pub use siblings::coordinate_siblings;
