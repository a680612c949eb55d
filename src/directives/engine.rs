//! Directive interpreter.

use super::{Directive, Directives};
use crate::document::{Document, NodeId};
use crate::error::{Result, StoreError};
use crate::query::{Match, XPath, is_valid_name};

/// Apply `directives` to `doc` in order.
///
/// Stops at the first failing directive. The document may be partially
/// modified when an error is returned, so callers that need all-or-nothing
/// semantics should apply to a clone.
///
/// # Errors
///
/// - [`StoreError::DirectiveError`] naming the failing directive and its
///   position (1-based)
pub fn apply(doc: &mut Document, directives: &Directives) -> Result<()> {
    let mut machine = Machine {
        cursor: vec![doc.root()],
        stack: Vec::new(),
    };

    for (index, directive) in directives.iter().enumerate() {
        machine.step(doc, directive).map_err(|e| {
            let reason = match e {
                StoreError::DirectiveError(msg) | StoreError::QueryError(msg) => msg,
                other => other.to_string(),
            };
            StoreError::DirectiveError(format!(
                "#{} ({}): {}",
                index + 1,
                directive,
                reason
            ))
        })?;
    }
    Ok(())
}

struct Machine {
    cursor: Vec<NodeId>,
    stack: Vec<Vec<NodeId>>,
}

impl Machine {
    fn step(&mut self, doc: &mut Document, directive: &Directive) -> Result<()> {
        match directive {
            Directive::XPath(expr) => {
                let path = XPath::parse(expr)?;
                let context: Vec<Match> = self.cursor.iter().copied().map(Match::Node).collect();
                let selected = path.evaluate_from(doc, &context);
                self.cursor = selected
                    .into_iter()
                    .map(|item| match item {
                        Match::Node(id) if doc.node(id).is_element() => Ok(id),
                        _ => Err(failed("path selects something other than elements")),
                    })
                    .collect::<Result<_>>()?;
            }
            Directive::Add(name) => {
                check_name(name)?;
                self.cursor = self
                    .cursor
                    .iter()
                    .map(|parent| doc.append_element(*parent, name))
                    .collect();
            }
            Directive::AddIf(name) => {
                check_name(name)?;
                let mut next = Vec::with_capacity(self.cursor.len());
                for parent in &self.cursor {
                    let existing = doc
                        .child_elements(*parent)
                        .filter(|child| doc.name(*child) == Some(name.as_str()))
                        .last();
                    next.push(match existing {
                        Some(child) => child,
                        None => doc.append_element(*parent, name),
                    });
                }
                self.cursor = next;
            }
            Directive::Set(text) => {
                for id in &self.cursor {
                    doc.set_text(*id, text);
                }
            }
            Directive::Attr { name, value } => {
                check_name(name)?;
                for id in &self.cursor {
                    doc.set_attribute(*id, name, value)?;
                }
            }
            Directive::Up => {
                self.cursor = parents(doc, &self.cursor)?;
            }
            Directive::Remove => {
                let parents = parents(doc, &self.cursor)?;
                for id in &self.cursor {
                    doc.detach(*id)?;
                }
                self.cursor = parents;
            }
            Directive::Strict(expected) => {
                if self.cursor.len() != *expected {
                    return Err(failed(&format!(
                        "expected {} node(s), cursor holds {}",
                        expected,
                        self.cursor.len()
                    )));
                }
            }
            Directive::Push => self.stack.push(self.cursor.clone()),
            Directive::Pop => {
                self.cursor = self
                    .stack
                    .pop()
                    .ok_or_else(|| failed("nothing to pop"))?;
            }
        }
        Ok(())
    }
}

/// Distinct parents of `nodes`, in first-seen order.
fn parents(doc: &Document, nodes: &[NodeId]) -> Result<Vec<NodeId>> {
    let mut out: Vec<NodeId> = Vec::new();
    for id in nodes {
        let parent = doc
            .parent(*id)
            .ok_or_else(|| failed("the root element has no parent"))?;
        if !out.contains(&parent) {
            out.push(parent);
        }
    }
    Ok(out)
}

fn check_name(name: &str) -> Result<()> {
    if is_valid_name(name) {
        Ok(())
    } else {
        Err(failed(&format!("'{}' is not a valid XML name", name)))
    }
}

fn failed(message: &str) -> StoreError {
    StoreError::DirectiveError(message.to_string())
}
