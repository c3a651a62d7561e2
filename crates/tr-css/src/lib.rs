//! CSS selector parsing and matching.
//!
//! Only the subset needed to address widget markup is supported: type,
//! universal, id, class and attribute-presence/equality selectors, joined by
//! the descendant and child combinators, in comma separated lists.

use core::fmt;
use tr_core::TrellisError;
use tr_core::TrellisResult;

/// Tree access required to match a selector against a host node.
pub trait SelectorContext {
    type Node: Copy;

    /// Lowercase tag name, `None` when the node is not an element.
    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    fn has_class(&self, node: Self::Node, class_name: &str) -> bool;

    /// Parent node, `None` once the parent is no longer an element.
    fn parent_element(&self, node: Self::Node) -> Option<Self::Node>;
}

/// Parsed, comma separated selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    pub fn parse(input: &str) -> TrellisResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(TrellisError::new(
                "css.selector_empty",
                "selector text is empty",
            ));
        }

        let mut selectors = Vec::new();
        for group in split_top_level(trimmed, b',') {
            let group = group.trim();
            if group.is_empty() {
                return Err(unsupported(input, "empty selector in list"));
            }
            selectors.push(parse_complex(group, input)?);
        }

        Ok(Self { selectors })
    }

    /// Single class selector (`.name`), built without parsing.
    pub fn class(name: &str) -> Self {
        let compound = CompoundSelector {
            classes: vec![name.to_owned()],
            ..CompoundSelector::default()
        };

        Self {
            selectors: vec![ComplexSelector {
                compounds: vec![compound],
                combinators: Vec::new(),
            }],
        }
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    pub fn matches<C: SelectorContext>(&self, cx: &C, node: C::Node) -> bool {
        self.selectors
            .iter()
            .any(|selector| selector.matches(cx, node))
    }
}

impl fmt::Display for SelectorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, selector) in self.selectors.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{selector}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

/// Compounds are stored left to right; `combinators[i]` joins
/// `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ComplexSelector {
    compounds: Vec<CompoundSelector>,
    combinators: Vec<Combinator>,
}

impl ComplexSelector {
    fn matches<C: SelectorContext>(&self, cx: &C, node: C::Node) -> bool {
        match self.compounds.len().checked_sub(1) {
            Some(last) => self.matches_from(cx, node, last),
            None => false,
        }
    }

    fn matches_from<C: SelectorContext>(&self, cx: &C, node: C::Node, index: usize) -> bool {
        if !self.compounds[index].matches(cx, node) {
            return false;
        }
        if index == 0 {
            return true;
        }

        match self.combinators[index - 1] {
            Combinator::Child => cx
                .parent_element(node)
                .is_some_and(|parent| self.matches_from(cx, parent, index - 1)),
            Combinator::Descendant => {
                let mut cursor = cx.parent_element(node);
                while let Some(ancestor) = cursor {
                    if self.matches_from(cx, ancestor, index - 1) {
                        return true;
                    }
                    cursor = cx.parent_element(ancestor);
                }
                false
            }
        }
    }
}

impl fmt::Display for ComplexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, compound) in self.compounds.iter().enumerate() {
            if index > 0 {
                match self.combinators[index - 1] {
                    Combinator::Descendant => f.write_str(" ")?,
                    Combinator::Child => f.write_str(" > ")?,
                }
            }
            write!(f, "{compound}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CompoundSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttributeSelector>,
}

impl CompoundSelector {
    fn matches<C: SelectorContext>(&self, cx: &C, node: C::Node) -> bool {
        let Some(tag) = cx.tag_name(node) else {
            return false;
        };

        if let Some(expected) = &self.tag {
            if !tag.eq_ignore_ascii_case(expected) {
                return false;
            }
        }

        if let Some(id) = &self.id {
            if cx.attribute(node, "id") != Some(id.as_str()) {
                return false;
            }
        }

        if !self
            .classes
            .iter()
            .all(|class_name| cx.has_class(node, class_name))
        {
            return false;
        }

        self.attributes
            .iter()
            .all(|attribute| match (&attribute.value, cx.attribute(node, &attribute.name)) {
                (_, None) => false,
                (None, Some(_)) => true,
                (Some(expected), Some(actual)) => expected == actual,
            })
    }

    fn is_universal(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attributes.is_empty()
    }
}

impl fmt::Display for CompoundSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_universal() {
            return f.write_str("*");
        }
        if let Some(tag) = &self.tag {
            f.write_str(tag)?;
        }
        if let Some(id) = &self.id {
            write!(f, "#{id}")?;
        }
        for class_name in &self.classes {
            write!(f, ".{class_name}")?;
        }
        for attribute in &self.attributes {
            match &attribute.value {
                Some(value) => write!(f, "[{}=\"{value}\"]", attribute.name)?,
                None => write!(f, "[{}]", attribute.name)?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeSelector {
    name: String,
    value: Option<String>,
}

fn parse_complex(text: &str, whole: &str) -> TrellisResult<ComplexSelector> {
    let bytes = text.as_bytes();
    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut idx = skip_spaces(bytes, 0);

    loop {
        let (compound, next) = parse_compound(text, idx, whole)?;
        compounds.push(compound);
        idx = next;

        let after_spaces = skip_spaces(bytes, idx);
        let Some(byte) = bytes.get(after_spaces).copied() else {
            break;
        };

        match byte {
            b'>' => {
                combinators.push(Combinator::Child);
                idx = skip_spaces(bytes, after_spaces.saturating_add(1));
                if idx >= bytes.len() {
                    return Err(unsupported(whole, "combinator without a right-hand selector"));
                }
            }
            b'+' | b'~' => {
                return Err(unsupported(
                    whole,
                    format!("sibling combinator `{}` is not supported", byte as char),
                ));
            }
            _ if after_spaces > idx => {
                combinators.push(Combinator::Descendant);
                idx = after_spaces;
            }
            _ => {
                return Err(unsupported(
                    whole,
                    format!("unexpected character at byte {after_spaces}"),
                ));
            }
        }
    }

    Ok(ComplexSelector {
        compounds,
        combinators,
    })
}

fn parse_compound(text: &str, start: usize, whole: &str) -> TrellisResult<(CompoundSelector, usize)> {
    let bytes = text.as_bytes();
    let mut compound = CompoundSelector::default();
    let mut idx = start;
    let mut parts = 0_usize;

    match bytes.get(idx).copied() {
        Some(b'*') => {
            idx = idx.saturating_add(1);
            parts += 1;
        }
        Some(byte) if is_ident_char(byte) => {
            let end = scan_ident(bytes, idx);
            compound.tag = Some(text[idx..end].to_ascii_lowercase());
            idx = end;
            parts += 1;
        }
        _ => {}
    }

    while let Some(byte) = bytes.get(idx).copied() {
        match byte {
            b'#' => {
                let end = scan_ident(bytes, idx.saturating_add(1));
                if end == idx.saturating_add(1) {
                    return Err(unsupported(whole, "expected an identifier after `#`"));
                }
                compound.id = Some(text[idx + 1..end].to_owned());
                idx = end;
            }
            b'.' => {
                let end = scan_ident(bytes, idx.saturating_add(1));
                if end == idx.saturating_add(1) {
                    return Err(unsupported(whole, "expected an identifier after `.`"));
                }
                compound.classes.push(text[idx + 1..end].to_owned());
                idx = end;
            }
            b'[' => {
                let (attribute, next) = parse_attribute(text, idx, whole)?;
                compound.attributes.push(attribute);
                idx = next;
            }
            b':' => {
                return Err(unsupported(
                    whole,
                    "pseudo-classes and pseudo-elements are not supported",
                ));
            }
            _ => break,
        }
        parts += 1;
    }

    if parts == 0 {
        return Err(unsupported(
            whole,
            format!("expected a selector at byte {start}"),
        ));
    }

    Ok((compound, idx))
}

fn parse_attribute(text: &str, open: usize, whole: &str) -> TrellisResult<(AttributeSelector, usize)> {
    let bytes = text.as_bytes();
    let mut idx = skip_spaces(bytes, open.saturating_add(1));
    let name_end = scan_ident(bytes, idx);
    if name_end == idx {
        return Err(unsupported(whole, "expected an attribute name after `[`"));
    }

    let name = text[idx..name_end].to_ascii_lowercase();
    idx = skip_spaces(bytes, name_end);

    match bytes.get(idx).copied() {
        Some(b']') => Ok((AttributeSelector { name, value: None }, idx + 1)),
        Some(b'=') => {
            idx = skip_spaces(bytes, idx + 1);
            let (value, next) = match bytes.get(idx).copied() {
                Some(quote @ (b'"' | b'\'')) => {
                    let close = find_byte(bytes, idx + 1, quote).ok_or_else(|| {
                        unsupported(whole, "unterminated quoted attribute value")
                    })?;
                    (text[idx + 1..close].to_owned(), close + 1)
                }
                _ => {
                    let end = scan_ident(bytes, idx);
                    if end == idx {
                        return Err(unsupported(whole, "expected an attribute value after `=`"));
                    }
                    (text[idx..end].to_owned(), end)
                }
            };

            idx = skip_spaces(bytes, next);
            if bytes.get(idx).copied() != Some(b']') {
                return Err(unsupported(whole, "expected `]` after attribute value"));
            }

            Ok((
                AttributeSelector {
                    name,
                    value: Some(value),
                },
                idx + 1,
            ))
        }
        Some(b'~' | b'|' | b'^' | b'$' | b'*') => Err(unsupported(
            whole,
            "only `[attr]` and `[attr=value]` attribute selectors are supported",
        )),
        _ => Err(unsupported(whole, "unterminated attribute selector")),
    }
}

fn split_top_level(input: &str, separator: u8) -> Vec<&str> {
    let bytes = input.as_bytes();
    let mut parts = Vec::new();
    let mut start = 0_usize;
    let mut in_single = false;
    let mut in_double = false;
    let mut bracket_depth = 0_u32;

    for (idx, byte) in bytes.iter().copied().enumerate() {
        if in_single {
            in_single = byte != b'\'';
            continue;
        }
        if in_double {
            in_double = byte != b'"';
            continue;
        }

        match byte {
            b'\'' => in_single = true,
            b'"' => in_double = true,
            b'[' => bracket_depth = bracket_depth.saturating_add(1),
            b']' => bracket_depth = bracket_depth.saturating_sub(1),
            _ if byte == separator && bracket_depth == 0 => {
                parts.push(&input[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }

    parts.push(&input[start..]);
    parts
}

fn unsupported(selector: &str, detail: impl fmt::Display) -> TrellisError {
    TrellisError::new(
        "css.selector_unsupported",
        format!("`{}`: {detail}", selector.trim()),
    )
}

fn scan_ident(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && is_ident_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }
    idx
}

fn is_ident_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') || byte >= 0x80
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx = idx.saturating_add(1);
    }
    idx
}

fn find_byte(bytes: &[u8], from: usize, byte: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|candidate| *candidate == byte)
        .map(|offset| from + offset)
}

#[cfg(test)]
mod tests {
    use super::SelectorContext;
    use super::SelectorList;

    struct FakeNode {
        tag: &'static str,
        parent: Option<usize>,
        attributes: Vec<(&'static str, &'static str)>,
    }

    /// Flat tree used to exercise matching without a DOM.
    struct FakeTree {
        nodes: Vec<FakeNode>,
    }

    impl FakeTree {
        fn push(
            &mut self,
            tag: &'static str,
            parent: Option<usize>,
            attributes: Vec<(&'static str, &'static str)>,
        ) -> usize {
            self.nodes.push(FakeNode {
                tag,
                parent,
                attributes,
            });
            self.nodes.len() - 1
        }
    }

    impl SelectorContext for FakeTree {
        type Node = usize;

        fn tag_name(&self, node: usize) -> Option<&str> {
            self.nodes.get(node).map(|node| node.tag)
        }

        fn attribute(&self, node: usize, name: &str) -> Option<&str> {
            self.nodes.get(node).and_then(|node| {
                node.attributes
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| *value)
            })
        }

        fn has_class(&self, node: usize, class_name: &str) -> bool {
            self.attribute(node, "class")
                .is_some_and(|classes| classes.split_whitespace().any(|name| name == class_name))
        }

        fn parent_element(&self, node: usize) -> Option<usize> {
            self.nodes.get(node).and_then(|node| node.parent)
        }
    }

    /// ul.js-menu > li.js-item#first > a.js-trigger[href="#"]
    fn menu_tree() -> (FakeTree, usize, usize, usize) {
        let mut tree = FakeTree { nodes: Vec::new() };
        let menu = tree.push("ul", None, vec![("class", "js-menu root")]);
        let item = tree.push("li", Some(menu), vec![("class", "js-item"), ("id", "first")]);
        let link = tree.push(
            "a",
            Some(item),
            vec![("class", "js-trigger"), ("href", "#")],
        );
        (tree, menu, item, link)
    }

    #[test]
    fn parses_and_normalizes_compound_selectors() -> tr_core::TrellisResult<()> {
        let list = SelectorList::parse("  LI.js-item#first[data-depth='1'] ,a[href]  ")?;
        assert_eq!(list.len(), 2);
        assert_eq!(
            list.to_string(),
            "li#first.js-item[data-depth=\"1\"], a[href]"
        );
        Ok(())
    }

    #[test]
    fn class_constructor_matches_parsed_class_selector() -> tr_core::TrellisResult<()> {
        assert_eq!(SelectorList::class("js-item"), SelectorList::parse(".js-item")?);
        Ok(())
    }

    #[test]
    fn rejects_unsupported_syntax() {
        for input in ["", "   ", "a:hover", "a + b", "a ~ b", "[href", "ul >", ".a,,.b", "[x^=y]"] {
            let Err(error) = SelectorList::parse(input) else {
                panic!("`{input}` should not parse");
            };
            assert!(error.is_in("css"), "unexpected error code for `{input}`: {error}");
        }
    }

    #[test]
    fn reports_empty_selector_code() {
        let Err(error) = SelectorList::parse(" ") else {
            panic!("blank selector should not parse");
        };
        assert_eq!(error.code, "css.selector_empty");
    }

    #[test]
    fn matches_classes_ids_and_attributes() -> tr_core::TrellisResult<()> {
        let (tree, menu, item, link) = menu_tree();

        assert!(SelectorList::parse(".js-menu")?.matches(&tree, menu));
        assert!(SelectorList::parse("ul.root.js-menu")?.matches(&tree, menu));
        assert!(SelectorList::parse("#first")?.matches(&tree, item));
        assert!(SelectorList::parse("a[href='#']")?.matches(&tree, link));
        assert!(SelectorList::parse("*")?.matches(&tree, link));
        assert!(!SelectorList::parse("a[href='/home']")?.matches(&tree, link));
        assert!(!SelectorList::parse(".js-item")?.matches(&tree, link));
        Ok(())
    }

    #[test]
    fn distinguishes_child_and_descendant_combinators() -> tr_core::TrellisResult<()> {
        let (tree, _, _, link) = menu_tree();

        assert!(SelectorList::parse(".js-menu .js-trigger")?.matches(&tree, link));
        assert!(SelectorList::parse(".js-item > .js-trigger")?.matches(&tree, link));
        assert!(!SelectorList::parse(".js-menu > .js-trigger")?.matches(&tree, link));
        assert!(SelectorList::parse("ul > li > a")?.matches(&tree, link));
        Ok(())
    }

    #[test]
    fn list_matches_any_member() -> tr_core::TrellisResult<()> {
        let (tree, menu, _, link) = menu_tree();
        let list = SelectorList::parse(".js-trigger, .js-menu")?;
        assert!(list.matches(&tree, menu));
        assert!(list.matches(&tree, link));
        Ok(())
    }
}
