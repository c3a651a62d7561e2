use tr_core::TrellisError;
use tr_core::TrellisResult;
use tr_dom::Document;
use tr_dom::NodeId;
use tr_html::HtmlParser;
use tr_menu::ItemEvent;
use tr_menu::Menu;
use tr_menu::MenuConfig;
use tr_menu::MenuEvent;
use tr_menu::MenuOptions;
use tracing::debug;
use tracing::info;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub root: String,
    pub trigger: Option<String>,
    pub config: MenuConfig,
}

/// A parsed document with one menu tree built over it.
#[derive(Debug)]
pub struct Session {
    document: Document,
    menu: Menu,
}

impl Session {
    pub fn open(markup: &str, options: SessionOptions) -> TrellisResult<Self> {
        let document = HtmlParser.parse(markup);
        let root = document.select(document.root(), &options.root)?.ok_or_else(|| {
            TrellisError::new("demo.root_not_found", format!("no element matches `{}`", options.root))
        })?;
        let trigger = match &options.trigger {
            Some(selector) => Some(document.select(document.root(), selector)?.ok_or_else(|| {
                TrellisError::new("demo.trigger_not_found", format!("no element matches `{selector}`"))
            })?),
            None => None,
        };

        let mut menu_options = MenuOptions::new(root).with_config(options.config);
        if let Some(trigger) = trigger {
            menu_options = menu_options.with_trigger(trigger);
        }
        let menu = Menu::build(&document, menu_options)?;
        log_events(&menu);

        Ok(Self { document, menu })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn menu(&self) -> &Menu {
        &self.menu
    }

    /// Clicks the first element matching `selector`, then runs one turn of
    /// deferred tasks. Returns whether a handler prevented the default action.
    pub fn click(&self, selector: &str) -> TrellisResult<bool> {
        let target = self.document.select(self.document.root(), selector)?.ok_or_else(|| {
            TrellisError::new("demo.click_target_not_found", format!("no element matches `{selector}`"))
        })?;
        self.click_node(target)
    }

    pub fn click_node(&self, target: NodeId) -> TrellisResult<bool> {
        let event = self.document.click(target)?;
        let ran = self.document.run_pending_tasks();
        debug!(
            target = %target,
            default_prevented = event.default_prevented(),
            tasks = ran,
            "replayed click"
        );
        Ok(event.default_prevented())
    }
}

fn log_events(menu: &Menu) {
    for event in [MenuEvent::Opened, MenuEvent::Closed] {
        menu.on(event, move |menu| {
            info!(menu = %menu.element(), depth = menu.depth(), "{}", event.as_str());
        });
    }

    for item in menu.children() {
        for event in [ItemEvent::Active, ItemEvent::Inactive] {
            item.on(event, move |item| {
                info!(item = %item.element(), "{}", event.as_str());
            });
        }
        if let Some(submenu) = item.submenu() {
            log_events(submenu);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use super::SessionOptions;
    use tr_core::TrellisResult;
    use tr_menu::MenuConfig;

    const MARKUP: &str = r##"
        <button id="open">Menu</button>
        <ul class="js-menu" id="root">
          <li class="js-item"><a class="js-trigger" id="a-link">A</a></li>
          <li class="js-item"><a class="js-trigger" id="b-link" href="#">B</a>
            <ul class="js-menu"><li class="js-item">C</li></ul>
          </li>
        </ul>
        <p id="outside">elsewhere</p>
    "##;

    fn options(trigger: Option<&str>) -> SessionOptions {
        SessionOptions {
            root: ".js-menu".to_owned(),
            trigger: trigger.map(str::to_owned),
            config: MenuConfig::default(),
        }
    }

    #[test]
    fn replays_clicks_with_a_turn_between_them() -> TrellisResult<()> {
        let session = Session::open(MARKUP, options(Some("#open")))?;
        let menu = session.menu();

        assert!(session.click("#open")?);
        assert!(menu.is_open());
        assert!(menu.has_outside_click_listener());

        assert!(session.click("#b-link")?);
        assert!(menu.children()[1].is_active());

        assert!(!session.click("#outside")?);
        assert!(!menu.is_open());
        assert!(!menu.children()[1].is_active());
        Ok(())
    }

    #[test]
    fn reports_missing_elements() {
        let Err(error) = Session::open(MARKUP, SessionOptions {
            root: "nav".to_owned(),
            ..options(None)
        }) else {
            panic!("there is no nav element");
        };
        assert_eq!(error.code, "demo.root_not_found");

        let Err(error) = Session::open(MARKUP, options(Some("#missing"))) else {
            panic!("there is no #missing element");
        };
        assert_eq!(error.code, "demo.trigger_not_found");

        let Ok(session) = Session::open(MARKUP, options(None)) else {
            panic!("markup builds");
        };
        let Err(error) = session.click("#missing") else {
            panic!("there is no #missing element");
        };
        assert_eq!(error.code, "demo.click_target_not_found");
    }
}
