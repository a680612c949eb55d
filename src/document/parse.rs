//! XML text to [`Document`].

use super::{Document, NodeId, NodeKind};
use crate::error::{Result, StoreError};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

pub(super) fn parse(xml: &str) -> Result<Document> {
    let mut reader = Reader::from_str(xml);
    let mut doc: Option<Document> = None;
    let mut open: Vec<NodeId> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            StoreError::DocumentError(format!("{} at byte {}", e, reader.buffer_position()))
        })?;

        match event {
            Event::Start(start) => {
                let id = open_element(&mut doc, &open, &start)?;
                open.push(id);
            }
            Event::Empty(start) => {
                open_element(&mut doc, &open, &start)?;
            }
            Event::End(_) => {
                open.pop();
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(malformed)?;
                match (open.last(), doc.as_mut()) {
                    (Some(parent), Some(doc)) => {
                        if !text.is_empty() {
                            doc.append(*parent, NodeKind::Text(text.into_owned()));
                        }
                    }
                    _ if text.trim().is_empty() => {}
                    _ => {
                        return Err(StoreError::DocumentError(
                            "text outside the root element".to_string(),
                        ));
                    }
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8(data.into_inner().into_owned()).map_err(malformed)?;
                match (open.last(), doc.as_mut()) {
                    (Some(parent), Some(doc)) => {
                        doc.append(*parent, NodeKind::CData(text));
                    }
                    _ => {
                        return Err(StoreError::DocumentError(
                            "CDATA outside the root element".to_string(),
                        ));
                    }
                }
            }
            Event::Comment(comment) => {
                // Comments around the root element are dropped.
                if let (Some(parent), Some(doc)) = (open.last(), doc.as_mut()) {
                    let text =
                        String::from_utf8(comment.into_inner().into_owned()).map_err(malformed)?;
                    doc.append(*parent, NodeKind::Comment(text));
                }
            }
            Event::Eof => break,
            // Declaration, processing instructions, doctype.
            _ => {}
        }
    }

    if let Some(unclosed) = open.last()
        && let Some(doc) = &doc
    {
        return Err(StoreError::DocumentError(format!(
            "element <{}> is never closed",
            doc.name(*unclosed).unwrap_or_default()
        )));
    }

    doc.ok_or_else(|| StoreError::DocumentError("document has no root element".to_string()))
}

/// Create the element described by `start` under the innermost open element,
/// or as the root if nothing is open yet.
fn open_element(
    doc: &mut Option<Document>,
    open: &[NodeId],
    start: &BytesStart<'_>,
) -> Result<NodeId> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(malformed)?
        .to_string();

    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(malformed)?
            .to_string();
        let value = attr.unescape_value().map_err(malformed)?.into_owned();
        attributes.push((key, value));
    }

    let id = match (open.last(), doc.as_mut()) {
        (Some(parent), Some(doc)) => doc.append(*parent, NodeKind::Element { name, attributes }),
        (None, Some(_)) => {
            return Err(StoreError::DocumentError(format!(
                "second root element <{}>",
                name
            )));
        }
        (_, None) => {
            let mut root = Document::new(&name);
            let id = root.root();
            for (key, value) in &attributes {
                root.set_attribute(id, key, value)?;
            }
            *doc = Some(root);
            id
        }
    };
    Ok(id)
}

fn malformed(err: impl std::fmt::Display) -> StoreError {
    StoreError::DocumentError(err.to_string())
}
