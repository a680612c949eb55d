//! [`Document`] to XML text.
//!
//! Output is compact: no indentation is added, so parsing the output yields
//! the same tree again.

use super::{Document, NodeId, NodeKind};
use crate::error::{Result, StoreError};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

pub(super) fn write(doc: &Document, declaration: bool) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    if declaration {
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(failed)?;
    }
    write_node(&mut writer, doc, doc.root())?;
    String::from_utf8(writer.into_inner()).map_err(failed)
}

fn write_node(writer: &mut Writer<Vec<u8>>, doc: &Document, id: NodeId) -> Result<()> {
    match doc.node(id).kind() {
        NodeKind::Element { name, attributes } => {
            let mut start = BytesStart::new(name.as_str());
            for (key, value) in attributes {
                start.push_attribute((key.as_str(), value.as_str()));
            }

            let children = doc.children(id);
            if children.is_empty() {
                return writer.write_event(Event::Empty(start)).map_err(failed);
            }

            writer.write_event(Event::Start(start)).map_err(failed)?;
            for child in children {
                write_node(writer, doc, *child)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new(name.as_str())))
                .map_err(failed)
        }
        NodeKind::Text(text) => writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(failed),
        // A terminator inside the data cannot be expressed as one section.
        NodeKind::CData(text) if text.contains("]]>") => writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(failed),
        NodeKind::CData(text) => writer
            .write_event(Event::CData(BytesCData::new(text.as_str())))
            .map_err(failed),
        NodeKind::Comment(text) => writer
            .write_event(Event::Comment(BytesText::from_escaped(text.as_str())))
            .map_err(failed),
    }
}

fn failed(err: impl std::fmt::Display) -> StoreError {
    StoreError::DocumentError(format!("failed to serialize document: {}", err))
}
