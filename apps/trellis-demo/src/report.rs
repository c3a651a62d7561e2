use tr_dom::Document;
use tr_dom::NodeId;
use tr_menu::Menu;
use tr_menu::MenuItem;

/// Renders the menu tree one node per line, indented by nesting level.
pub fn render_tree(menu: &Menu) -> String {
    let mut out = String::new();
    render_menu(&mut out, menu, 0);
    out
}

fn render_menu(out: &mut String, menu: &Menu, level: usize) {
    let document = menu.document();
    let marker = if menu.is_open() { " [open]" } else { "" };
    out.push_str(&format!(
        "{}menu {}{marker}\n",
        indent(level),
        describe(document, menu.element())
    ));

    for item in menu.children() {
        let marker = if item.is_active() { " [active]" } else { "" };
        out.push_str(&format!(
            "{}item {} \"{}\"{marker}\n",
            indent(level + 1),
            describe(document, item.element()),
            item_label(document, item)
        ));
        if let Some(submenu) = item.submenu() {
            render_menu(out, submenu, level + 2);
        }
    }
}

/// Short element description such as `<ul#main>` or `<li.js-item>`.
pub fn describe(document: &Document, node: NodeId) -> String {
    let Some(tag) = document.tag_name(node) else {
        return "document".to_owned();
    };
    if let Some(id) = document.attribute(node, "id").filter(|id| !id.is_empty()) {
        return format!("<{tag}#{id}>");
    }
    match document.class_names(node).first() {
        Some(class_name) => format!("<{tag}.{class_name}>"),
        None => format!("<{tag}>"),
    }
}

/// The link text when the item has a link, otherwise the item's own text.
pub fn item_label(document: &Document, item: &MenuItem) -> String {
    let text = match item.link() {
        Some(link) => document.text_content(link),
        None => document.text_content(item.element()),
    };
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn indent(level: usize) -> String {
    "  ".repeat(level)
}

#[cfg(test)]
mod tests {
    use super::render_tree;
    use crate::session::Session;
    use crate::session::SessionOptions;
    use tr_core::TrellisResult;
    use tr_menu::MenuConfig;

    const MARKUP: &str = r#"
        <ul class="js-menu" id="root">
          <li class="js-item" id="a"><a class="js-trigger">A</a></li>
          <li class="js-item" id="b"><a class="js-trigger" id="b-link">B</a>
            <ul class="js-menu" id="b-menu"><li class="js-item">C   and
              D</li></ul>
          </li>
        </ul>
    "#;

    fn session() -> TrellisResult<Session> {
        Session::open(MARKUP, SessionOptions {
            root: ".js-menu".to_owned(),
            trigger: None,
            config: MenuConfig::default(),
        })
    }

    #[test]
    fn renders_closed_tree() -> TrellisResult<()> {
        let session = session()?;
        assert_eq!(
            render_tree(session.menu()),
            concat!(
                "menu <ul#root>\n",
                "  item <li#a> \"A\"\n",
                "  item <li#b> \"B\"\n",
                "    menu <ul#b-menu>\n",
                "      item <li.js-item> \"C and D\"\n",
            )
        );
        Ok(())
    }

    #[test]
    fn marks_open_menus_and_active_items() -> TrellisResult<()> {
        let session = session()?;
        session.click("#b-link")?;

        let rendered = render_tree(session.menu());
        assert!(rendered.contains("  item <li#b> \"B\" [active]\n"));
        assert!(rendered.contains("    menu <ul#b-menu> [open]\n"));
        assert!(rendered.starts_with("menu <ul#root>\n"));
        Ok(())
    }
}
