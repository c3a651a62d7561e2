//! HTML tokenization and tree building.
//!
//! The parser is deliberately forgiving: it never fails on malformed markup
//! and instead produces the closest reasonable tree.

use tr_core::TrellisError;
use tr_core::TrellisResult;
use tr_dom::Document;
use tr_dom::NodeId;
use tr_dom::is_void_element;
use tracing::debug;
use tracing::warn;

/// Parses raw HTML into a DOM document.
#[derive(Debug, Default)]
pub struct HtmlParser;

impl HtmlParser {
    /// Builds a fresh document whose root holds the top-level nodes.
    pub fn parse(&self, input: &str) -> Document {
        let document = Document::new();
        let root = document.root();
        match build_tree(&document, root, input) {
            Ok(created) => debug!(nodes = created, bytes = input.len(), "parsed document"),
            Err(error) => warn!(%error, "document parsing stopped early"),
        }
        document
    }

    /// Appends the nodes parsed from `input` under `parent`. Returns the
    /// number of nodes created.
    pub fn parse_fragment(
        &self,
        document: &Document,
        parent: NodeId,
        input: &str,
    ) -> TrellisResult<usize> {
        if parent != document.root() && !document.is_element(parent) {
            return Err(TrellisError::new(
                "html.invalid_fragment_parent",
                format!("node {parent} cannot receive parsed markup"),
            ));
        }

        build_tree(document, parent, input)
    }
}

fn build_tree(document: &Document, parent: NodeId, input: &str) -> TrellisResult<usize> {
    let bytes = input.as_bytes();
    let mut idx = 0_usize;
    let mut created = 0_usize;
    let mut open: Vec<(String, NodeId)> = Vec::new();

    while idx < bytes.len() {
        let current = open.last().map_or(parent, |(_, node)| *node);

        if bytes[idx] != b'<' {
            let next = find_byte(bytes, idx, b'<').unwrap_or(bytes.len());
            created += append_text(document, current, &input[idx..next])?;
            idx = next;
            continue;
        }

        if starts_with(bytes, idx, b"<!--") {
            idx = skip_comment(bytes, idx);
            continue;
        }

        if starts_with(bytes, idx, b"<!") {
            idx = skip_to_gt(bytes, idx.saturating_add(2));
            continue;
        }

        if starts_with(bytes, idx, b"<?") {
            idx = skip_processing_instruction(bytes, idx);
            continue;
        }

        let Some((tag, next_idx)) = parse_tag(input, idx) else {
            // A `<` that does not open a tag is plain text.
            let next = find_byte(bytes, idx.saturating_add(1), b'<').unwrap_or(bytes.len());
            created += append_text(document, current, &input[idx..next])?;
            idx = next;
            continue;
        };
        idx = next_idx;

        if tag.is_end {
            if let Some(position) = open.iter().rposition(|(name, _)| *name == tag.name) {
                open.truncate(position);
            }
            continue;
        }

        let node = document.create_element_with_attributes(current, &tag.name, tag.attributes)?;
        created += 1;

        if tag.self_closing || is_void_element(&tag.name) {
            continue;
        }

        if tag.name == "script" || tag.name == "style" {
            let (raw, after_raw) = read_raw_text_until_end_tag(input, idx, &tag.name);
            if !raw.is_empty() {
                document.append_text(node, raw)?;
                created += 1;
            }
            idx = after_raw;
            continue;
        }

        open.push((tag.name, node));
    }

    Ok(created)
}

fn append_text(document: &Document, parent: NodeId, raw: &str) -> TrellisResult<usize> {
    if raw.trim().is_empty() {
        return Ok(0);
    }

    document.append_text(parent, decode_entities(raw))?;
    Ok(1)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedTag {
    name: String,
    attributes: Vec<(String, String)>,
    is_end: bool,
    self_closing: bool,
}

fn parse_tag(input: &str, start: usize) -> Option<(ParsedTag, usize)> {
    let bytes = input.as_bytes();
    if bytes.get(start).copied() != Some(b'<') {
        return None;
    }

    let mut idx = start.saturating_add(1);
    let mut is_end = false;
    if bytes.get(idx).copied() == Some(b'/') {
        is_end = true;
        idx = idx.saturating_add(1);
    }

    let name_start = idx;
    while idx < bytes.len() && is_tag_name_char(bytes[idx]) {
        idx = idx.saturating_add(1);
    }

    if idx == name_start || !bytes[name_start].is_ascii_alphabetic() {
        return None;
    }

    let name = input[name_start..idx].to_ascii_lowercase();
    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;

    loop {
        idx = skip_spaces(bytes, idx);
        let byte = bytes.get(idx).copied()?;

        match byte {
            b'>' => {
                return Some((
                    ParsedTag {
                        name,
                        attributes,
                        is_end,
                        self_closing,
                    },
                    idx.saturating_add(1),
                ));
            }
            b'/' => {
                self_closing = bytes.get(idx.saturating_add(1)).copied() == Some(b'>');
                idx = idx.saturating_add(1);
            }
            _ => {
                self_closing = false;
                let attr_start = idx;
                while idx < bytes.len() && !is_attribute_name_end(bytes[idx]) {
                    idx = idx.saturating_add(1);
                }
                let attr_name = input[attr_start..idx].to_ascii_lowercase();

                idx = skip_spaces(bytes, idx);
                let mut value = String::new();
                if bytes.get(idx).copied() == Some(b'=') {
                    idx = skip_spaces(bytes, idx.saturating_add(1));
                    match bytes.get(idx).copied()? {
                        quote @ (b'"' | b'\'') => {
                            let close = find_byte(bytes, idx.saturating_add(1), quote)?;
                            value = decode_entities(&input[idx + 1..close]);
                            idx = close.saturating_add(1);
                        }
                        _ => {
                            let value_start = idx;
                            while idx < bytes.len()
                                && !bytes[idx].is_ascii_whitespace()
                                && bytes[idx] != b'>'
                            {
                                idx = idx.saturating_add(1);
                            }
                            value = decode_entities(&input[value_start..idx]);
                        }
                    }
                }

                // First occurrence wins, as in browsers.
                if !is_end
                    && !attr_name.is_empty()
                    && !attributes.iter().any(|(existing, _)| *existing == attr_name)
                {
                    attributes.push((attr_name, value));
                }
            }
        }
    }
}

fn is_attribute_name_end(byte: u8) -> bool {
    byte.is_ascii_whitespace() || matches!(byte, b'=' | b'>' | b'/')
}

fn read_raw_text_until_end_tag<'a>(
    input: &'a str,
    start: usize,
    tag_name: &str,
) -> (&'a str, usize) {
    let bytes = input.as_bytes();
    let tag_bytes = tag_name.as_bytes();
    let mut idx = start;

    while idx < bytes.len() {
        if bytes[idx] == b'<'
            && bytes.get(idx.saturating_add(1)).copied() == Some(b'/')
            && starts_with_ignore_ascii_case(bytes, idx.saturating_add(2), tag_bytes)
            && tag_name_boundary(bytes, idx.saturating_add(2 + tag_bytes.len()))
        {
            if let Some((_, end_idx)) = parse_tag(input, idx) {
                return (&input[start..idx], end_idx);
            }
        }

        idx = idx.saturating_add(1);
    }

    (&input[start..], bytes.len())
}

fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .get(1..tail.len().min(12))
            .and_then(|window| window.find(';'))
            .and_then(|semi| decode_entity(&tail[1..semi + 1]).map(|ch| (ch, semi + 2)));

        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &tail[consumed..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let numeric = name.strip_prefix('#')?;
            let code = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

fn skip_comment(bytes: &[u8], start: usize) -> usize {
    find_subslice(bytes, start.saturating_add(4), b"-->")
        .map(|end| end.saturating_add(3))
        .unwrap_or(bytes.len())
}

fn skip_processing_instruction(bytes: &[u8], start: usize) -> usize {
    if let Some(end) = find_subslice(bytes, start.saturating_add(2), b"?>") {
        return end.saturating_add(2);
    }

    skip_to_gt(bytes, start.saturating_add(2))
}

fn skip_to_gt(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() {
        if bytes[idx] == b'>' {
            return idx.saturating_add(1);
        }
        idx = idx.saturating_add(1);
    }

    bytes.len()
}

fn tag_name_boundary(bytes: &[u8], idx: usize) -> bool {
    match bytes.get(idx).copied() {
        None => true,
        Some(byte) => byte.is_ascii_whitespace() || byte == b'>' || byte == b'/',
    }
}

fn skip_spaces(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx = idx.saturating_add(1);
    }
    idx
}

fn is_tag_name_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b':')
}

fn starts_with(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    end <= bytes.len() && bytes[idx..end] == *pattern
}

fn starts_with_ignore_ascii_case(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    let end = idx.saturating_add(pattern.len());
    if end > bytes.len() {
        return false;
    }

    bytes[idx..end]
        .iter()
        .zip(pattern.iter())
        .all(|(left, right)| left.eq_ignore_ascii_case(right))
}

fn find_subslice(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    if from >= bytes.len() {
        return None;
    }

    bytes[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|offset| from + offset)
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
    use super::HtmlParser;
    use tr_core::TrellisResult;

    #[test]
    fn builds_nested_menu_markup() -> TrellisResult<()> {
        let doc = HtmlParser.parse(
            r##"<ul class="js-menu">
                 <li class="js-item"><a class="js-trigger" href="#">Products</a>
                   <ul class="js-menu"><li class="js-item"><a href="/a">A</a></li></ul>
                 </li>
               </ul>"##,
        );

        let menus = doc.select_all(doc.root(), ".js-menu")?;
        assert_eq!(menus.len(), 2);
        assert_eq!(doc.parent(menus[0]), Some(doc.root()));
        assert_eq!(doc.select_all(menus[0], ".js-item")?.len(), 2);
        assert_eq!(doc.element_children(menus[0]).len(), 1);

        let Some(trigger) = doc.select(doc.root(), ".js-trigger")? else {
            panic!("trigger should be parsed");
        };
        assert_eq!(doc.attribute(trigger, "href").as_deref(), Some("#"));
        assert_eq!(doc.text_content(trigger), "Products");
        Ok(())
    }

    #[test]
    fn handles_attribute_quoting_styles() -> TrellisResult<()> {
        let doc = HtmlParser.parse(
            "<DIV Class='a b' data-x=plain hidden id=\"main\" class=\"ignored\" title=\"x &amp; y\"></div>",
        );
        let Some(div) = doc.select(doc.root(), "div")? else {
            panic!("div should be parsed");
        };
        assert_eq!(doc.class_names(div), vec!["a", "b"]);
        assert_eq!(doc.attribute(div, "data-x").as_deref(), Some("plain"));
        assert_eq!(doc.attribute(div, "hidden").as_deref(), Some(""));
        assert_eq!(doc.attribute(div, "id").as_deref(), Some("main"));
        assert_eq!(doc.attribute(div, "title").as_deref(), Some("x & y"));
        Ok(())
    }

    #[test]
    fn void_and_self_closing_elements_take_no_children() -> TrellisResult<()> {
        let doc = HtmlParser.parse("<p>one<br>two<img src=x><span/>three</p>");
        let Some(p) = doc.select(doc.root(), "p")? else {
            panic!("paragraph should be parsed");
        };
        assert_eq!(doc.element_children(p).len(), 3);
        assert_eq!(doc.text_content(p), "onetwothree");
        Ok(())
    }

    #[test]
    fn recovers_from_mismatched_end_tags() -> TrellisResult<()> {
        let doc = HtmlParser.parse("<ul><li><a>x</li><li>y</span></li></ul><p>after");
        let Some(ul) = doc.select(doc.root(), "ul")? else {
            panic!("list should be parsed");
        };
        assert_eq!(doc.select_all(ul, "ul > li")?.len(), 2);
        let Some(p) = doc.select(doc.root(), "p")? else {
            panic!("trailing paragraph should be parsed");
        };
        assert_eq!(doc.parent(p), Some(doc.root()));
        assert_eq!(doc.text_content(p), "after");
        Ok(())
    }

    #[test]
    fn skips_comments_doctype_and_keeps_raw_text() -> TrellisResult<()> {
        let doc = HtmlParser.parse(
            "<!DOCTYPE html><!-- <li class=\"js-item\"> --><?xml x?><script>if (a < b) {}</script><b>ok</b>",
        );
        assert!(doc.select(doc.root(), ".js-item")?.is_none());
        let Some(script) = doc.select(doc.root(), "script")? else {
            panic!("script should be parsed");
        };
        assert_eq!(doc.text_content(script), "if (a < b) {}");
        assert_eq!(doc.element_children(doc.root()).len(), 2);
        Ok(())
    }

    #[test]
    fn stray_angle_brackets_and_entities_are_text() -> TrellisResult<()> {
        let doc = HtmlParser.parse("<p>1 < 2 &lt; 3 &#x41;&#66; &bogus; &amp</p>");
        let Some(p) = doc.select(doc.root(), "p")? else {
            panic!("paragraph should be parsed");
        };
        assert_eq!(doc.text_content(p), "1 < 2 < 3 AB &bogus; &amp");
        Ok(())
    }

    #[test]
    fn parses_fragments_into_existing_elements() -> TrellisResult<()> {
        let doc = HtmlParser.parse("<nav id=\"site\"></nav>");
        let Some(nav) = doc.select(doc.root(), "#site")? else {
            panic!("nav should be parsed");
        };
        let created = HtmlParser.parse_fragment(&doc, nav, "<ul><li>a</li></ul>")?;
        assert_eq!(created, 3);
        assert_eq!(doc.outer_html(nav), "<nav id=\"site\"><ul><li>a</li></ul></nav>");

        let Some(text) = doc.children(doc.select_all(nav, "li")?[0]).first().copied() else {
            panic!("list item should hold text");
        };
        assert!(HtmlParser.parse_fragment(&doc, text, "<b></b>").is_err());
        Ok(())
    }

    #[test]
    fn handles_documents_without_markup() {
        let doc = HtmlParser.parse("plain text only");
        assert_eq!(doc.element_children(doc.root()).len(), 0);
        assert_eq!(doc.text_content(doc.root()), "plain text only");
    }
}
