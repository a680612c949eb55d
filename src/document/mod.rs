//! In-memory XML document.
//!
//! The tree is stored in an arena: nodes refer to each other through
//! [`NodeId`] indices, which stay valid for the lifetime of the document even
//! when nodes are detached. Detached nodes are unreachable from the root and
//! are skipped by serialization, queries and equality.

mod parse;
mod write;


use crate::error::{Result, StoreError};
use crate::query::{Match, XPath};
use std::fmt;
use std::path::Path;

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with its attributes in document order.
    Element {
        name: String,
        attributes: Vec<(String, String)>,
    },
    /// Character data.
    Text(String),
    /// A CDATA section.
    CData(String),
    /// A comment.
    Comment(String),
}

/// A single node of the tree.
#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// What kind of node this is.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Element name, or `None` for non-element nodes.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Whether this node is an element.
    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element { .. })
    }

    /// Attributes of an element; empty for other nodes.
    pub fn attributes(&self) -> &[(String, String)] {
        match &self.kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Value of the named attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Parent node, `None` for the root and for detached nodes.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Child nodes in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A mutable XML tree with exactly one root element.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    /// Create a document holding only an empty root element.
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element {
                    name: root_name.to_string(),
                    attributes: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    /// Parse a document from XML text.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DocumentError`] if the text is not well-formed or has
    ///   no single root element
    pub fn parse(xml: &str) -> Result<Self> {
        parse::parse(xml)
    }

    /// Load a document from a file, or create an empty one with the given
    /// root element if the file does not exist.
    pub fn load(path: &Path, root_name: &str) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(xml) => Self::parse(&xml).map_err(|e| match e {
                StoreError::DocumentError(msg) => {
                    StoreError::DocumentError(format!("{}: {}", path.display(), msg))
                }
                other => other,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new(root_name)),
            Err(e) => Err(StoreError::DocumentError(format!(
                "failed to read '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    /// Serialize to XML text, optionally preceded by an XML declaration.
    pub fn to_xml(&self, declaration: bool) -> Result<String> {
        write::write(self, declaration)
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Access a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not produced by this document (or a clone of it).
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Child nodes of `id`.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Child elements of `id`.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.node(*child).is_element())
    }

    /// Parent of `id`.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Element name of `id`.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.node(id).name()
    }

    /// String value of `id`: the concatenated text of an element and its
    /// descendants, or the content of a text, CDATA or comment node.
    pub fn text(&self, id: NodeId) -> String {
        if let NodeKind::Comment(text) = &self.node(id).kind {
            return text.clone();
        }
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text(text) | NodeKind::CData(text) => out.push_str(text),
            NodeKind::Comment(_) => {}
            NodeKind::Element { .. } => {
                for child in self.children(id) {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Nodes reachable from the root, in document order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Append a new element under `parent` and return it.
    pub fn append_element(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.append(
            parent,
            NodeKind::Element {
                name: name.to_string(),
                attributes: Vec::new(),
            },
        )
    }

    /// Append a node under `parent` and return it.
    ///
    /// Text appended right after a text node is merged into it, and the
    /// existing node is returned.
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        if let NodeKind::Text(text) = &kind
            && let Some(&last) = self.nodes[parent.0].children.last()
            && let NodeKind::Text(existing) = &mut self.nodes[last.0].kind
        {
            existing.push_str(text);
            return last;
        }


        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Replace the content of `id` with a single text node.
    ///
    /// An empty `text` leaves the element empty.
    pub fn set_text(&mut self, id: NodeId, text: &str) {
        for child in std::mem::take(&mut self.nodes[id.0].children) {
            self.nodes[child.0].parent = None;
        }
        if !text.is_empty() {
            self.append(id, NodeKind::Text(text.to_string()));
        }
    }

    /// Set (or overwrite) an attribute on an element.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DocumentError`] if `id` is not an element
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<()> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element { attributes, .. } => {
                match attributes.iter_mut().find(|(key, _)| key == name) {
                    Some((_, existing)) => *existing = value.to_string(),
                    None => attributes.push((name.to_string(), value.to_string())),
                }
                Ok(())
            }
            _ => Err(StoreError::DocumentError(format!(
                "cannot set attribute '{}' on a non-element node",
                name
            ))),
        }
    }

    /// Detach `id` from its parent.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DocumentError`] if `id` is the root element
    pub fn detach(&mut self, id: NodeId) -> Result<()> {
        if id == self.root {
            return Err(StoreError::DocumentError(
                "cannot remove the root element".to_string(),
            ));
        }
        let Some(parent) = self.nodes[id.0].parent.take() else {
            return Ok(());
        };
        let siblings = &mut self.nodes[parent.0].children;
        let Some(index) = siblings.iter().position(|child| *child == id) else {
            return Ok(());
        };
        siblings.remove(index);

        // Text on both sides of the gap would be read back as one node.
        if index > 0 && index < siblings.len() {
            let (before, after) = (siblings[index - 1], siblings[index]);
            self.merge_text(parent, before, after);
        }
        Ok(())
    }

    /// Fold the text node `after` into the text node `before`, both children
    /// of `parent`. Does nothing unless both are plain text.
    fn merge_text(&mut self, parent: NodeId, before: NodeId, after: NodeId) {
        let NodeKind::Text(tail) = &self.nodes[after.0].kind else {
            return;
        };
        let tail = tail.clone();
        let NodeKind::Text(head) = &mut self.nodes[before.0].kind else {
            return;
        };
        head.push_str(&tail);
        self.nodes[after.0].parent = None;
        self.nodes[parent.0].children.retain(|child| *child != after);
    }

    /// Evaluate a path expression and return the string value of each match.
    ///
    /// # Example
    ///
    /// ```
    /// use docstore::document::Document;
    ///
    /// let doc = Document::parse("<github><test>hello, world</test></github>")?;
    /// assert_eq!(doc.xpath("/github/test/text()")?, vec!["hello, world"]);
    /// # Ok::<(), docstore::error::StoreError>(())
    /// ```
    pub fn xpath(&self, expr: &str) -> Result<Vec<String>> {
        let path = XPath::parse(expr)?;
        Ok(path
            .evaluate(self)
            .iter()
            .map(|m| m.string_value(self))
            .collect())
    }

    /// Evaluate a path expression and return the matching items.
    pub fn select(&self, expr: &str) -> Result<Vec<Match>> {
        Ok(XPath::parse(expr)?.evaluate(self))
    }

    /// Whether two subtrees have the same structure and content.
    fn same_subtree(&self, id: NodeId, other: &Document, other_id: NodeId) -> bool {
        let (a, b) = (self.node(id), other.node(other_id));
        a.kind == b.kind
            && a.children.len() == b.children.len()
            && a
                .children
                .iter()
                .zip(&b.children)
                .all(|(x, y)| self.same_subtree(*x, other, *y))
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.same_subtree(self.root, other, other.root)
    }
}

impl Eq for Document {}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let xml = self.to_xml(false).map_err(|_| fmt::Error)?;
        f.write_str(&xml)
    }
}
