use crate::session::SessionOptions;
use clap::Parser;
use std::path::PathBuf;
use tr_core::TrellisResult;
use tr_menu::ITEM_SELECTOR;
use tr_menu::MENU_SELECTOR;
use tr_menu::MenuConfig;
use tr_menu::Selectors;
use tr_menu::TRIGGER_SELECTOR;

/// Trellis - build a dropdown menu from markup and drive it with clicks
#[derive(Parser, Debug)]
#[command(name = "trellis-demo")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Markup file containing the menu
    pub file: PathBuf,

    /// Selector of the root menu container (first match)
    #[arg(long, default_value = MENU_SELECTOR)]
    pub root: String,

    /// Selector of the element that toggles the root menu
    #[arg(long)]
    pub trigger: Option<String>,

    /// Selector identifying menu items
    #[arg(long, default_value = ITEM_SELECTOR)]
    pub item_selector: String,

    /// Selector identifying item links
    #[arg(long, default_value = TRIGGER_SELECTOR)]
    pub trigger_selector: String,

    /// Selector identifying nested menus
    #[arg(long, default_value = MENU_SELECTOR)]
    pub submenu_selector: String,

    /// Keep at most one submenu open per level
    #[arg(long)]
    pub exclusive: bool,

    /// Keep menus open when clicking elsewhere
    #[arg(long)]
    pub no_outside_click: bool,

    /// Click the first element matching SELECTOR (repeatable, in order)
    #[arg(long = "click", value_name = "SELECTOR")]
    pub clicks: Vec<String>,

    /// Open an interactive window instead of printing the tree
    #[arg(long)]
    pub gui: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    pub fn session_options(&self) -> TrellisResult<SessionOptions> {
        let selectors = Selectors::new(&self.item_selector, &self.trigger_selector, &self.submenu_selector)?;
        let config = MenuConfig::default()
            .with_selectors(selectors)
            .with_exclusive_siblings(self.exclusive)
            .with_close_on_outside_click(!self.no_outside_click);

        Ok(SessionOptions {
            root: self.root.clone(),
            trigger: self.trigger.clone(),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::CommandFactory;
    use clap::Parser;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_defaults() {
        let Ok(cli) = Cli::try_parse_from(["trellis-demo", "menu.html"]) else {
            panic!("a file argument is enough");
        };
        assert_eq!(cli.root, ".js-menu");
        assert_eq!(cli.item_selector, ".js-item");
        assert!(cli.trigger.is_none());
        assert!(cli.clicks.is_empty());
        assert!(!cli.exclusive);
        assert!(!cli.gui);
        assert_eq!(cli.log_level, "info");
    }

    #[test]
    fn collects_clicks_in_order_and_policies() {
        let Ok(cli) = Cli::try_parse_from([
            "trellis-demo",
            "menu.html",
            "--click",
            "#b-link",
            "--click",
            "#outside",
            "--exclusive",
            "--no-outside-click",
            "--trigger",
            "#open",
        ]) else {
            panic!("valid arguments");
        };
        assert_eq!(cli.clicks, vec!["#b-link", "#outside"]);

        let Ok(options) = cli.session_options() else {
            panic!("default selectors parse");
        };
        assert_eq!(options.trigger.as_deref(), Some("#open"));
        assert!(options.config.exclusive_siblings());
        assert!(!options.config.close_on_outside_click());
    }

    #[test]
    fn rejects_unsupported_selectors() {
        let Ok(cli) = Cli::try_parse_from(["trellis-demo", "menu.html", "--item-selector", "li:first-child"]) else {
            panic!("clap accepts any string");
        };
        let Err(error) = cli.session_options() else {
            panic!("pseudo-classes are unsupported");
        };
        assert!(error.is_in("css"));
    }

    #[test]
    fn requires_a_file() {
        assert!(Cli::try_parse_from(["trellis-demo"]).is_err());
    }
}
