use core::fmt;
use tr_core::TrellisError;
use tr_core::TrellisResult;
use tr_css::SelectorContext;

/// Elements that never carry children or an end tag.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

pub fn is_void_element(tag_name: &str) -> bool {
    VOID_ELEMENTS
        .iter()
        .any(|candidate| candidate.eq_ignore_ascii_case(tag_name))
}

/// ID used to address nodes in the DOM arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct ElementData {
    tag_name: String,
    attributes: Vec<(String, String)>,
}

impl ElementData {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn set_attribute(&mut self, name: &str, value: String) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_owned(), value)),
        }
    }

    fn class_tokens(&self) -> Vec<String> {
        self.attribute("class")
            .map(|classes| classes.split_ascii_whitespace().map(str::to_owned).collect())
            .unwrap_or_default()
    }

    fn has_class(&self, class_name: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|name| name == class_name))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// Arena of nodes; index 0 is always the document node.
#[derive(Debug, Clone)]
pub(crate) struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub(crate) const ROOT: NodeId = NodeId(0);

    pub(crate) fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn contains_node(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    fn node(&self, node: NodeId) -> Option<&Node> {
        self.nodes.get(node.0)
    }

    fn element(&self, node: NodeId) -> Option<&ElementData> {
        match &self.node(node)?.kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, node: NodeId) -> TrellisResult<&mut ElementData> {
        let entry = self.nodes.get_mut(node.0).ok_or_else(|| not_found(node))?;
        match &mut entry.kind {
            NodeKind::Element(element) => Ok(element),
            _ => Err(TrellisError::new(
                "dom.not_an_element",
                format!("node {node} is not an element"),
            )),
        }
    }

    pub(crate) fn is_element(&self, node: NodeId) -> bool {
        self.element(node).is_some()
    }

    pub(crate) fn append_element(
        &mut self,
        parent: NodeId,
        tag_name: &str,
        attributes: Vec<(String, String)>,
    ) -> TrellisResult<NodeId> {
        let mut element = ElementData {
            tag_name: tag_name.to_ascii_lowercase(),
            attributes: Vec::with_capacity(attributes.len()),
        };
        for (name, value) in attributes {
            element.set_attribute(&name.to_ascii_lowercase(), value);
        }
        self.append(parent, NodeKind::Element(element))
    }

    pub(crate) fn append_text(&mut self, parent: NodeId, text: String) -> TrellisResult<NodeId> {
        self.append(parent, NodeKind::Text(text))
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> TrellisResult<NodeId> {
        let parent_node = self.node(parent).ok_or_else(|| not_found(parent))?;
        if matches!(parent_node.kind, NodeKind::Text(_)) {
            return Err(TrellisError::new(
                "dom.invalid_parent",
                format!("text node {parent} cannot have children"),
            ));
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub(crate) fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    pub(crate) fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.element(node).map(|element| element.tag_name.as_str())
    }

    pub(crate) fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attribute(name)
    }

    pub(crate) fn set_attribute(&mut self, node: NodeId, name: &str, value: String) -> TrellisResult<()> {
        self.element_mut(node)?
            .set_attribute(&name.to_ascii_lowercase(), value);
        Ok(())
    }

    pub(crate) fn has_class(&self, node: NodeId, class_name: &str) -> bool {
        self.element(node)
            .is_some_and(|element| element.has_class(class_name))
    }

    pub(crate) fn class_names(&self, node: NodeId) -> Vec<String> {
        self.element(node)
            .map(ElementData::class_tokens)
            .unwrap_or_default()
    }

    /// Returns true when the class list changed.
    pub(crate) fn add_class(&mut self, node: NodeId, class_name: &str) -> TrellisResult<bool> {
        let element = self.element_mut(node)?;
        let mut classes = element.class_tokens();
        if classes.iter().any(|name| name == class_name) {
            return Ok(false);
        }
        classes.push(class_name.to_owned());
        element.set_attribute("class", classes.join(" "));
        Ok(true)
    }

    /// Returns true when the class list changed.
    pub(crate) fn remove_class(&mut self, node: NodeId, class_name: &str) -> TrellisResult<bool> {
        let element = self.element_mut(node)?;
        let mut classes = element.class_tokens();
        let before = classes.len();
        classes.retain(|name| name != class_name);
        if classes.len() == before {
            return Ok(false);
        }
        element.set_attribute("class", classes.join(" "));
        Ok(true)
    }

    /// Inclusive ancestry test, like `Node.contains`.
    pub(crate) fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// Element descendants of `scope` (excluding `scope`) in document order.
    pub(crate) fn descendant_elements(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.is_element(node) {
                out.push(node);
            }
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub(crate) fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(node, &mut out);
        out
    }

    fn collect_text(&self, node: NodeId, out: &mut String) {
        let Some(entry) = self.node(node) else {
            return;
        };
        if let NodeKind::Text(text) = &entry.kind {
            out.push_str(text);
        }
        for child in &entry.children {
            self.collect_text(*child, out);
        }
    }

    pub(crate) fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.serialize(node, &mut out);
        out
    }

    fn serialize(&self, node: NodeId, out: &mut String) {
        let Some(entry) = self.node(node) else {
            return;
        };

        match &entry.kind {
            NodeKind::Document => {
                for child in &entry.children {
                    self.serialize(*child, out);
                }
            }
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.tag_name);
                for (name, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');

                if is_void_element(&element.tag_name) {
                    return;
                }

                for child in &entry.children {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(&element.tag_name);
                out.push('>');
            }
        }
    }
}

impl SelectorContext for Tree {
    type Node = NodeId;

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        Tree::tag_name(self, node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        Tree::attribute(self, node, name)
    }

    fn has_class(&self, node: NodeId, class_name: &str) -> bool {
        Tree::has_class(self, node, class_name)
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node).filter(|parent| self.is_element(*parent))
    }
}

pub(crate) fn not_found(node: NodeId) -> TrellisError {
    TrellisError::new(
        "dom.node_not_found",
        format!("node {node} is not part of this document"),
    )
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}
