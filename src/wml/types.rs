//! The built-in WordprocessingML node set.
//!
//! This is the minimal concrete type set that exercises the registry
//! contract: the document/body/paragraph/run containers, the run break
//! leaf, and the tracked insertion and deletion wrappers. Additional leaf
//! types (tables, images, headers) plug into the same contract.
//!
//! Context-dependent encoding happens through the ancestry chain: a run
//! nested under a tracked deletion writes its text as `w:delText`, and the
//! body attaches trailing section properties from its own prop bag.

use crate::model::{
    ChangeInformation, ModelError, NodeType, PropBag, PropValue, Registry, Result,
};
use crate::opc::constants::namespace;
use crate::xml::{Bindings, XmlElement, XmlError, XmlNode};
use std::collections::BTreeMap;

/// Register the base WordprocessingML node types.
///
/// Call once at startup, before the registry's first encode or decode.
pub fn register_base_types(registry: &mut Registry) -> Result<()> {
    registry.register(document_type())?;
    registry.register(body_type())?;
    registry.register(paragraph_type())?;
    registry.register(run_type())?;
    registry.register(break_type())?;
    registry.register(tracked_change_type("ins", "w:ins"))?;
    registry.register(tracked_change_type("del", "w:del"))?;
    Ok(())
}

fn document_type() -> NodeType {
    NodeType::new("document")
        .accepts(["body"])
        .encode(|_cx, _props, children| {
            let mut el = XmlElement::new("w:document");
            el.set_attr("xmlns:w", namespace::WML_MAIN);
            el.set_attr("xmlns:r", namespace::OFC_RELATIONSHIPS);
            el.children = children;
            Ok(XmlNode::Element(el))
        })
        .decode(|_cx, el| Ok((PropBag::new(), el.children.clone())))
}

fn body_type() -> NodeType {
    NodeType::new("body")
        .accepts(["paragraph"])
        .encode(|_cx, props, children| {
            let mut el = XmlElement::new("w:body");
            el.children = children;
            if let Some(section) = props.get("section").and_then(PropValue::as_map) {
                el.push(section_properties(section));
            }
            Ok(XmlNode::Element(el))
        })
        .decode(|_cx, el| {
            let mut props = PropBag::new();
            let mut children = Vec::new();
            for child in &el.children {
                match child.as_element() {
                    Some(cel) if cel.local_name() == "sectPr" => {
                        props.insert("section", PropValue::Map(section_props_from(cel)));
                    },
                    _ => children.push(child.clone()),
                }
            }
            Ok((props, children))
        })
}

/// Trailing `w:sectPr` built from the body's section prop map.
fn section_properties(section: &BTreeMap<String, PropValue>) -> XmlElement {
    let mut el = XmlElement::new("w:sectPr");
    if let (Some(w), Some(h)) = (
        section.get("page_width").and_then(PropValue::as_int),
        section.get("page_height").and_then(PropValue::as_int),
    ) {
        let mut pgsz = XmlElement::new("w:pgSz");
        pgsz.set_attr("w:w", w.to_string());
        pgsz.set_attr("w:h", h.to_string());
        el.push(pgsz);
    }
    el
}

fn section_props_from(el: &XmlElement) -> BTreeMap<String, PropValue> {
    let mut section = BTreeMap::new();
    if let Some(pgsz) = el.element("pgSz") {
        if let Some(w) = pgsz.attr_local("w").and_then(|v| v.parse::<i64>().ok()) {
            section.insert("page_width".to_string(), PropValue::Int(w));
        }
        if let Some(h) = pgsz.attr_local("h").and_then(|v| v.parse::<i64>().ok()) {
            section.insert("page_height".to_string(), PropValue::Int(h));
        }
    }
    section
}

fn paragraph_type() -> NodeType {
    NodeType::new("paragraph")
        .accepts(["run", "ins", "del"])
        .matches(|el| el.local_name() == "p")
        .encode(|_cx, props, children| {
            let mut el = XmlElement::new("w:p");
            if let Some(style) = props.get_str("style") {
                let mut ppr = XmlElement::new("w:pPr");
                let mut pstyle = XmlElement::new("w:pStyle");
                pstyle.set_attr("w:val", style);
                ppr.push(pstyle);
                el.push(ppr);
            }
            el.children.extend(children);
            Ok(XmlNode::Element(el))
        })
        .decode(|_cx, el| {
            let mut props = PropBag::new();
            let mut children = Vec::new();
            for child in &el.children {
                match child.as_element() {
                    Some(cel) if cel.local_name() == "pPr" => {
                        if let Some(style) = cel
                            .element("pStyle")
                            .and_then(|s| s.attr_local("val"))
                        {
                            props.insert("style", style);
                        }
                    },
                    _ => children.push(child.clone()),
                }
            }
            Ok((props, children))
        })
}

fn run_type() -> NodeType {
    NodeType::new("run")
        .accepts(["break"])
        .mixed(true)
        .matches(|el| el.local_name() == "r")
        .encode(|cx, props, children| {
            let mut el = XmlElement::new("w:r");

            let mut rpr = XmlElement::new("w:rPr");
            if props.get_flag("bold") {
                rpr.push(XmlElement::new("w:b"));
            }
            if props.get_flag("italic") {
                rpr.push(XmlElement::new("w:i"));
            }
            if !rpr.children.is_empty() {
                el.push(rpr);
            }

            // Text inside a tracked deletion is deleted text.
            let text_tag = if cx.ancestry.within("del") { "w:delText" } else { "w:t" };
            for child in children {
                match child {
                    XmlNode::Text(t) => {
                        let mut tel = XmlElement::new(text_tag);
                        tel.set_attr("xml:space", "preserve");
                        tel.push(XmlNode::Text(t));
                        el.children.push(XmlNode::Element(tel));
                    },
                    other => el.children.push(other),
                }
            }
            Ok(XmlNode::Element(el))
        })
        .decode(|_cx, el| {
            let mut props = PropBag::new();
            let mut children = Vec::new();
            for child in &el.children {
                match child.as_element() {
                    Some(cel) if cel.local_name() == "rPr" => {
                        if cel.element("b").is_some() {
                            props.insert("bold", true);
                        }
                        if cel.element("i").is_some() {
                            props.insert("italic", true);
                        }
                    },
                    Some(cel) if cel.local_name() == "t" || cel.local_name() == "delText" => {
                        children.push(XmlNode::Text(cel.text()));
                    },
                    _ => children.push(child.clone()),
                }
            }
            Ok((props, children))
        })
}

fn break_type() -> NodeType {
    NodeType::new("break")
        .matches(|el| el.local_name() == "br")
        .encode(|_cx, props, _children| {
            let mut el = XmlElement::new("w:br");
            if let Some(kind) = props.get_str("type") {
                el.set_attr("w:type", kind);
            }
            Ok(XmlNode::Element(el))
        })
        .decode(|_cx, el| {
            let mut props = PropBag::new();
            if let Some(kind) = el.attr_local("type") {
                props.insert("type", kind);
            }
            Ok((props, Vec::new()))
        })
}

/// A tracked-change wrapper (`w:ins` or `w:del`) carrying change metadata.
fn tracked_change_type(name: &str, tag: &'static str) -> NodeType {
    let template = format!(r#"<{tag} w:id="{{id}}" w:author="{{author}}" w:date="{{date}}"/>"#);
    let local = tag.trim_start_matches("w:").to_string();

    NodeType::new(name)
        .accepts(["run"])
        .matches(move |el| el.local_name() == local)
        .encode(move |cx, props, children| {
            let change = ChangeInformation::from_props(props)?;
            let mut bindings = Bindings::new();
            bindings.insert("id".to_string(), change.id.clone());
            bindings.insert("author".to_string(), change.author.clone());
            bindings.insert("date".to_string(), change.date_string());

            let node = cx.engine.render(&template, &bindings)?;
            let mut el = node.into_element().ok_or_else(|| {
                ModelError::Xml(XmlError::Render(format!(
                    "tracked-change template for <{tag}> produced no element"
                )))
            })?;
            el.children = children;
            Ok(XmlNode::Element(el))
        })
        .decode(|_cx, el| {
            let change = ChangeInformation::from_xml(el)?;
            Ok((change.to_props(), el.children.clone()))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Node, NodeChild};
    use chrono::{TimeZone, Utc};

    fn base_registry() -> Registry {
        let mut reg = Registry::new();
        register_base_types(&mut reg).unwrap();
        reg
    }

    fn change(id: &str, author: &str) -> ChangeInformation {
        ChangeInformation::new(id, author, Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
    }

    fn sample_tree() -> Node {
        let section: BTreeMap<String, PropValue> = [
            ("page_width".to_string(), PropValue::Int(12240)),
            ("page_height".to_string(), PropValue::Int(15840)),
        ]
        .into_iter()
        .collect();

        Node::new("document").child(
            Node::new("body")
                .prop("section", PropValue::Map(section))
                .child(
                    Node::new("paragraph")
                        .prop("style", "Normal")
                        .child(Node::new("run").prop("bold", true).child("Hello "))
                        .child(
                            Node::with_props("ins", change("1", "A").to_props())
                                .child(Node::new("run").child("new text")),
                        )
                        .child(
                            Node::with_props("del", change("2", "B").to_props())
                                .child(Node::new("run").child("old text")),
                        ),
                ),
        )
    }

    #[test]
    fn test_encode_shape() {
        let reg = base_registry();
        let xml = reg.encode_tree(sample_tree()).unwrap().to_xml_string();

        assert!(xml.starts_with(r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main""#));
        assert!(xml.contains(r#"<w:ins w:id="1" w:author="A" w:date="2020-01-01T00:00:00.000Z">"#));
        assert!(xml.contains(r#"<w:pStyle w:val="Normal"/>"#));
        assert!(xml.contains(r#"<w:pgSz w:w="12240" w:h="15840"/>"#));
        // Deleted text is written as w:delText, inserted text as w:t.
        assert!(xml.contains(r#"<w:delText xml:space="preserve">old text</w:delText>"#));
        assert!(xml.contains(r#"<w:t xml:space="preserve">new text</w:t>"#));
    }

    #[test]
    fn test_document_round_trip() {
        let reg = base_registry();
        let tree = sample_tree();

        let xml = reg.encode_tree(tree.clone()).unwrap();
        let back = reg.decode_tree(&xml, &["document"]).unwrap();

        assert_eq!(back, tree);
    }

    #[test]
    fn test_tracked_insertion_scenario() {
        let reg = base_registry();
        let xml = XmlNode::parse(
            br#"<w:ins w:id="1" w:author="A" w:date="2020-01-01T00:00:00.000Z"/>"#,
        )
        .unwrap();

        let node = reg.decode_tree(&xml, &["ins"]).unwrap();
        assert_eq!(node.props().get_str("author"), Some("A"));

        let reencoded = reg.encode_node(&node, &[]).unwrap().to_xml_string();
        assert_eq!(
            reencoded,
            r#"<w:ins w:id="1" w:author="A" w:date="2020-01-01T00:00:00.000Z"/>"#
        );
    }

    #[test]
    fn test_run_break_round_trip() {
        let reg = base_registry();
        let tree = Node::new("run")
            .child("before")
            .child(Node::new("break").prop("type", "page"))
            .child("after");

        let xml = reg.encode_tree(tree.clone()).unwrap();
        assert!(xml.to_xml_string().contains(r#"<w:br w:type="page"/>"#));

        let back = reg.decode_tree(&xml, &["run"]).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_paragraph_split_produces_flanking_paragraphs() {
        let reg = base_registry();
        // A paragraph illegally nested inside a paragraph.
        let tree = Node::new("body").child(
            Node::new("paragraph")
                .child(Node::new("run").child("left"))
                .child(Node::new("paragraph").child(Node::new("run").child("middle")))
                .child(Node::new("run").child("right")),
        );
        let leaves = tree.leaf_text();

        let xml = reg.encode_tree(tree).unwrap();
        let back = reg.decode_tree(&xml, &["document", "body"]).unwrap();

        assert_eq!(back.children().len(), 3);
        for child in back.children() {
            match child {
                NodeChild::Node(n) => assert_eq!(n.type_name(), "paragraph"),
                NodeChild::Text(_) => panic!("unexpected text at body level"),
            }
        }
        assert_eq!(back.leaf_text(), leaves);
    }

    #[test]
    fn test_malformed_change_date_fails_decode() {
        let reg = base_registry();
        let xml = XmlNode::parse(
            br#"<w:ins w:id="1" w:author="A" w:date="not-a-date"/>"#,
        )
        .unwrap();

        assert!(matches!(
            reg.decode_tree(&xml, &["ins"]),
            Err(ModelError::MalformedChangeMetadata(_))
        ));
    }

    #[test]
    fn test_unknown_element_is_no_matching_type() {
        let reg = base_registry();
        let xml = XmlNode::parse(b"<w:p><w:fancyNewThing/></w:p>").unwrap();

        assert!(matches!(
            reg.decode_tree(&xml, &["paragraph"]),
            Err(ModelError::NoMatchingType { .. })
        ));
    }
}
