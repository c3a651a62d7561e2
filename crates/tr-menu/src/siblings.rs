use crate::Menu;
use crate::MenuEvent;
use crate::emitter::SubscriptionId;
use crate::menu::WeakMenu;
use std::rc::Rc;
use tracing::debug;

/// Subscriptions that keep a set of menus mutually exclusive.
///
/// Dropping the group leaves the coordination in place; [`SiblingGroup::dissolve`]
/// removes it.
#[derive(Debug)]
pub struct SiblingGroup {
    subscriptions: Vec<(WeakMenu, SubscriptionId)>,
}

impl SiblingGroup {
    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    pub fn dissolve(self) {
        for (menu, subscription) in self.subscriptions {
            if let Some(menu) = menu.upgrade() {
                menu.off(subscription);
            }
        }
    }
}

/// Closes every other menu of `menus` whenever one of them opens.
pub fn coordinate_siblings(menus: &[Menu]) -> SiblingGroup {
    let members: Rc<[WeakMenu]> = menus.iter().map(Menu::downgrade).collect();
    let subscriptions = menus
        .iter()
        .map(|menu| {
            let members = Rc::clone(&members);
            let subscription = menu.on(MenuEvent::Opened, move |opened| {
                for sibling in members.iter().filter_map(WeakMenu::upgrade) {
                    if !sibling.ptr_eq(opened) {
                        sibling.close();
                    }
                }
            });
            (menu.downgrade(), subscription)
        })
        .collect();

    if !menus.is_empty() {
        debug!(members = menus.len(), "coordinating sibling menus");
    }
    SiblingGroup { subscriptions }
}

#[cfg(test)]
mod tests {
    use super::coordinate_siblings;
    use crate::Menu;
    use crate::MenuOptions;
    use tr_core::TrellisResult;
    use tr_dom::Document;

    fn standalone(document: &Document) -> TrellisResult<Menu> {
        let element = document.create_element(document.root(), "ul")?;
        Menu::build(document, MenuOptions::new(element))
    }

    #[test]
    fn opening_one_closes_the_others() -> TrellisResult<()> {
        let document = Document::new();
        let menus = [standalone(&document)?, standalone(&document)?, standalone(&document)?];
        let group = coordinate_siblings(&menus);
        assert_eq!(group.len(), 3);

        menus[0].open();
        menus[1].open();
        assert!(!menus[0].is_open());
        assert!(menus[1].is_open());
        assert!(!menus[2].is_open());

        menus[2].open();
        assert!(menus[2].is_open());
        assert!(!menus[1].is_open());
        Ok(())
    }

    #[test]
    fn dissolved_group_stops_coordinating() -> TrellisResult<()> {
        let document = Document::new();
        let menus = [standalone(&document)?, standalone(&document)?];
        coordinate_siblings(&menus).dissolve();

        menus[0].open();
        menus[1].open();
        assert!(menus[0].is_open());
        assert!(menus[1].is_open());
        Ok(())
    }

    #[test]
    fn empty_group_is_inert() {
        let group = coordinate_siblings(&[]);
        assert!(group.is_empty());
        group.dissolve();
    }
}
