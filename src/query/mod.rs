//! Path queries over a [`Document`].
//!
//! A small XPath 1.0 subset covering location paths with abbreviated syntax:
//!
//! - absolute (`/a/b`) and relative (`a/b`) paths, `//` anywhere
//! - steps: `name`, `*`, `.`, `..`, `text()`, `node()`, `comment()`, `@name`, `@*`
//! - predicates: `[2]`, `[last()]`, `[@id]`, `[@id='x']`, `[@id!='x']`,
//!   `[child]`, `[child='x']`, `[text()='x']`, `[.='x']`
//!
//! Results come back in document order without duplicates.

mod parser;


pub(crate) use parser::is_valid_name;

use crate::document::{Document, NodeId, NodeKind};
use crate::error::{Result, StoreError};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// One item selected by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Match {
    /// The document itself (selected by `/`).
    Document,
    /// An element, text, CDATA or comment node.
    Node(NodeId),
    /// The attribute at the given index of an element.
    Attribute(NodeId, usize),
}

impl Match {
    /// XPath string value of the item.
    pub fn string_value(&self, doc: &Document) -> String {
        match *self {
            Match::Document => doc.text(doc.root()),
            Match::Node(id) => doc.text(id),
            Match::Attribute(id, index) => doc
                .node(id)
                .attributes()
                .get(index)
                .map(|(_, value)| value.clone())
                .unwrap_or_default(),
        }
    }

    /// The selected node, if this is a node match.
    pub fn node(&self) -> Option<NodeId> {
        match *self {
            Match::Node(id) => Some(id),
            _ => None,
        }
    }
}

/// A compiled path expression.
#[derive(Debug, Clone)]
pub struct XPath {
    source: String,
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    DescendantOrSelf,
    Attribute,
    Parent,
    SelfNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    /// `*`: any element, or any attribute on the attribute axis.
    Wildcard,
    Text,
    Comment,
    AnyNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    Last,
    Exists(Operand),
    Compare(Operand, Comparison, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Operand {
    Attribute(String),
    Child(String),
    Text,
    Context,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Equal,
    NotEqual,
}

impl XPath {
    /// Compile a path expression.
    ///
    /// # Errors
    ///
    /// - [`StoreError::QueryError`] if the expression is malformed
    pub fn parse(expr: &str) -> Result<Self> {
        parser::parse(expr)
    }

    /// Whether the expression starts at the document.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// Evaluate from the document.
    pub fn evaluate(&self, doc: &Document) -> Vec<Match> {
        self.evaluate_from(doc, &[Match::Document])
    }

    /// Evaluate relative to the given context items. Absolute expressions
    /// ignore the context.
    pub fn evaluate_from(&self, doc: &Document, context: &[Match]) -> Vec<Match> {
        let order = DocumentOrder::new(doc);
        let mut current = if self.absolute {
            vec![Match::Document]
        } else {
            context.to_vec()
        };

        for step in &self.steps {
            let mut next = Vec::new();
            for item in &current {
                let mut selected = step.candidates(doc, *item);
                for predicate in &step.predicates {
                    selected = predicate.filter(doc, selected);
                }
                next.extend(selected);
            }
            current = order.sorted(next);
        }
        current
    }
}

impl FromStr for XPath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for XPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl Step {
    fn candidates(&self, doc: &Document, item: Match) -> Vec<Match> {
        match self.axis {
            Axis::Child => children(doc, item)
                .into_iter()
                .filter(|m| self.test.matches(doc, *m))
                .collect(),
            Axis::DescendantOrSelf => {
                let start = match item {
                    Match::Document => {
                        let mut all = vec![Match::Document];
                        all.extend(doc.descendants(doc.root()).into_iter().map(Match::Node));
                        all
                    }
                    Match::Node(id) => doc.descendants(id).into_iter().map(Match::Node).collect(),
                    Match::Attribute(..) => vec![item],
                };
                start
                    .into_iter()
                    .filter(|m| self.test.matches(doc, *m))
                    .collect()
            }
            Axis::Attribute => match item {
                Match::Node(id) => doc
                    .node(id)
                    .attributes()
                    .iter()
                    .enumerate()
                    .filter(|(_, (key, _))| match &self.test {
                        NodeTest::Name(name) => key == name,
                        NodeTest::Wildcard | NodeTest::AnyNode => true,
                        NodeTest::Text | NodeTest::Comment => false,
                    })
                    .map(|(index, _)| Match::Attribute(id, index))
                    .collect(),
                _ => Vec::new(),
            },
            Axis::Parent => {
                let parent = match item {
                    Match::Document => None,
                    Match::Node(id) if id == doc.root() => Some(Match::Document),
                    Match::Node(id) => doc.parent(id).map(Match::Node),
                    Match::Attribute(id, _) => Some(Match::Node(id)),
                };
                parent
                    .into_iter()
                    .filter(|m| self.test.matches(doc, *m))
                    .collect()
            }
            Axis::SelfNode => {
                if self.test.matches(doc, item) {
                    vec![item]
                } else {
                    Vec::new()
                }
            }
        }
    }
}

fn children(doc: &Document, item: Match) -> Vec<Match> {
    match item {
        Match::Document => vec![Match::Node(doc.root())],
        Match::Node(id) => doc.children(id).iter().copied().map(Match::Node).collect(),
        Match::Attribute(..) => Vec::new(),
    }
}

impl NodeTest {
    fn matches(&self, doc: &Document, item: Match) -> bool {
        match (self, item) {
            (NodeTest::AnyNode, _) => true,
            (_, Match::Document) => false,
            (NodeTest::Name(name), Match::Attribute(id, index)) => doc
                .node(id)
                .attributes()
                .get(index)
                .is_some_and(|(key, _)| key == name),
            (NodeTest::Wildcard, Match::Attribute(..)) => true,
            (_, Match::Attribute(..)) => false,
            (test, Match::Node(id)) => match (test, doc.node(id).kind()) {
                (NodeTest::Name(wanted), NodeKind::Element { name, .. }) => wanted == name,
                (NodeTest::Wildcard, NodeKind::Element { .. }) => true,
                (NodeTest::Text, NodeKind::Text(_) | NodeKind::CData(_)) => true,
                (NodeTest::Comment, NodeKind::Comment(_)) => true,
                _ => false,
            },
        }
    }
}

impl Predicate {
    fn filter(&self, doc: &Document, selected: Vec<Match>) -> Vec<Match> {
        match self {
            Predicate::Position(position) => selected
                .get(position - 1)
                .copied()
                .into_iter()
                .collect(),
            Predicate::Last => selected.last().copied().into_iter().collect(),
            Predicate::Exists(operand) => selected
                .into_iter()
                .filter(|m| !operand.values(doc, *m).is_empty())
                .collect(),
            Predicate::Compare(operand, comparison, literal) => selected
                .into_iter()
                .filter(|m| {
                    operand.values(doc, *m).iter().any(|value| match comparison {
                        Comparison::Equal => value == literal,
                        Comparison::NotEqual => value != literal,
                    })
                })
                .collect(),
        }
    }
}

impl Operand {
    fn values(&self, doc: &Document, item: Match) -> Vec<String> {
        match (self, item) {
            (Operand::Context, _) => vec![item.string_value(doc)],
            (Operand::Attribute(name), Match::Node(id)) => doc
                .node(id)
                .attribute(name)
                .map(str::to_string)
                .into_iter()
                .collect(),
            (Operand::Child(name), Match::Node(id)) => doc
                .child_elements(id)
                .filter(|child| doc.name(*child) == Some(name.as_str()))
                .map(|child| doc.text(child))
                .collect(),
            (Operand::Text, Match::Node(id)) => doc
                .children(id)
                .iter()
                .filter(|child| {
                    matches!(
                        doc.node(**child).kind(),
                        NodeKind::Text(_) | NodeKind::CData(_)
                    )
                })
                .map(|child| doc.text(*child))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Preorder ranks of every reachable node.
struct DocumentOrder {
    ranks: HashMap<NodeId, usize>,
}

impl DocumentOrder {
    fn new(doc: &Document) -> Self {
        let ranks = doc
            .descendants(doc.root())
            .into_iter()
            .enumerate()
            .map(|(rank, id)| (id, rank))
            .collect();
        Self { ranks }
    }

    fn key(&self, item: &Match) -> (usize, usize) {
        match *item {
            Match::Document => (0, 0),
            Match::Node(id) => (self.rank(id), 0),
            Match::Attribute(id, index) => (self.rank(id), index + 1),
        }
    }

    fn rank(&self, id: NodeId) -> usize {
        self.ranks.get(&id).map_or(usize::MAX, |rank| rank + 1)
    }

    fn sorted(&self, mut items: Vec<Match>) -> Vec<Match> {
        items.sort_by_key(|item| self.key(item));
        items.dedup();
        items
    }
}
