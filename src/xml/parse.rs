//! Streaming parse of a part payload into an [`XmlNode`] tree.

use super::{Result, XmlElement, XmlError, XmlNode, resolve_entity, unescape_xml};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// Parse a complete XML payload into its single root node.
///
/// Text, CDATA, and entity-reference events are merged into single text
/// segments. Whitespace-only segments between elements are dropped; all
/// other text is kept verbatim (no trimming), so `xml:space="preserve"`
/// content survives intact.
pub(crate) fn parse_node(bytes: &[u8]) -> Result<XmlNode> {
    let mut reader = Reader::from_reader(bytes);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut pending = String::new();
    let mut buf = Vec::with_capacity(1024);

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                flush_text(&mut pending, &mut stack, &mut root)?;
                stack.push(element_from(e)?);
            },
            Ok(Event::Empty(ref e)) => {
                flush_text(&mut pending, &mut stack, &mut root)?;
                let el = element_from(e)?;
                attach(XmlNode::Element(el), &mut stack, &mut root)?;
            },
            Ok(Event::End(_)) => {
                flush_text(&mut pending, &mut stack, &mut root)?;
                let el = stack
                    .pop()
                    .ok_or_else(|| XmlError::Parse("unbalanced end tag".to_string()))?;
                attach(XmlNode::Element(el), &mut stack, &mut root)?;
            },
            Ok(Event::Text(ref e)) => {
                let raw = std::str::from_utf8(e.as_ref())
                    .map_err(|e| XmlError::Parse(e.to_string()))?;
                pending.push_str(&unescape_xml(raw));
            },
            Ok(Event::CData(ref e)) => {
                let raw = std::str::from_utf8(e.as_ref())
                    .map_err(|e| XmlError::Parse(e.to_string()))?;
                pending.push_str(raw);
            },
            Ok(Event::GeneralRef(ref e)) => {
                let raw = std::str::from_utf8(e.as_ref())
                    .map_err(|e| XmlError::Parse(e.to_string()))?;
                let trimmed = raw.strip_prefix('&').unwrap_or(raw);
                let entity = trimmed.strip_suffix(';').unwrap_or(trimmed);
                match resolve_entity(entity) {
                    Some(c) => pending.push(c),
                    None => {
                        pending.push('&');
                        pending.push_str(entity);
                        pending.push(';');
                    },
                }
            },
            Ok(Event::Eof) => {
                flush_text(&mut pending, &mut stack, &mut root)?;
                break;
            },
            Ok(_) => {},
            Err(e) => return Err(XmlError::Parse(e.to_string())),
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(XmlError::Parse("unclosed element at end of input".to_string()));
    }
    root.map(XmlNode::Element)
        .ok_or_else(|| XmlError::Parse("no root element".to_string()))
}

fn element_from(e: &BytesStart<'_>) -> Result<XmlElement> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|e| XmlError::Parse(e.to_string()))?
        .to_string();
    let mut el = XmlElement::new(name);

    for attr in e.attributes() {
        let attr = attr.map_err(|e| XmlError::Parse(e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| XmlError::Parse(e.to_string()))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::Parse(e.to_string()))?
            .to_string();
        el.attrs.push((key, value));
    }

    Ok(el)
}

fn flush_text(
    pending: &mut String,
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
) -> Result<()> {
    if pending.is_empty() {
        return Ok(());
    }
    let text = std::mem::take(pending);
    if text.trim().is_empty() {
        return Ok(());
    }
    attach(XmlNode::Text(text), stack, root)
}

fn attach(
    node: XmlNode,
    stack: &mut Vec<XmlElement>,
    root: &mut Option<XmlElement>,
) -> Result<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
        return Ok(());
    }
    match node {
        XmlNode::Element(el) if root.is_none() => {
            *root = Some(el);
            Ok(())
        },
        XmlNode::Element(_) => Err(XmlError::Parse("multiple root elements".to_string())),
        XmlNode::Text(_) => Err(XmlError::Parse("text outside the root element".to_string())),
    }
}
