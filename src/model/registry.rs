//! Node-type registry and the encode/decode dispatch built on it.
//!
//! The registry is an explicit object constructed at startup: node types are
//! registered once, and the first encode or decode call seals the table, so
//! the acceptance contract cannot shift under a live document. Type matching
//! goes through each definition's predicate rather than a 1:1 tag lookup,
//! which lets one type name cover several structurally distinct XML shapes.

use super::error::{ModelError, Result};
use super::node::{Ancestry, Node, NodeChild};
use super::props::PropBag;
use super::repair;
use crate::xml::{TemplateEngine, Transform, XmlElement, XmlNode};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Context handed to every encode closure.
pub struct EncodeContext<'a> {
    /// The injected XML transform capability
    pub engine: &'a dyn Transform,

    /// Read-only ancestor chain of the node being encoded
    pub ancestry: Ancestry<'a>,
}

/// Context handed to every decode closure.
pub struct DecodeContext<'a> {
    /// The injected XML transform capability
    pub engine: &'a dyn Transform,
}

type MatchFn = Box<dyn Fn(&XmlElement) -> bool + Send + Sync>;
type EncodeFn =
    Box<dyn Fn(&EncodeContext<'_>, &PropBag, Vec<XmlNode>) -> Result<XmlNode> + Send + Sync>;
type DecodeFn =
    Box<dyn Fn(&DecodeContext<'_>, &XmlElement) -> Result<(PropBag, Vec<XmlNode>)> + Send + Sync>;

/// A registered node type: its acceptance contract and codec.
///
/// Constructed builder-style. The defaults are serviceable for simple
/// container types: match on local tag name equal to the type name, encode
/// to an element of that name, decode props-free with children passed
/// through.
pub struct NodeType {
    name: String,
    accepts: Vec<String>,
    allows_mixed: bool,
    match_fn: MatchFn,
    encode_fn: EncodeFn,
    decode_fn: DecodeFn,
}

impl NodeType {
    /// Create a definition with default predicate and codec for `name`.
    pub fn new<S: Into<String>>(name: S) -> Self {
        let name = name.into();
        let match_tag = name.clone();
        let encode_tag = name.clone();
        Self {
            name,
            accepts: Vec::new(),
            allows_mixed: false,
            match_fn: Box::new(move |el| el.local_name() == match_tag),
            encode_fn: Box::new(move |_cx, _props, children| {
                let mut el = XmlElement::new(encode_tag.clone());
                el.children = children;
                Ok(XmlNode::Element(el))
            }),
            decode_fn: Box::new(|_cx, el| Ok((PropBag::new(), el.children.clone()))),
        }
    }

    /// Set the ordered accepted-children type names.
    pub fn accepts<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepts = names.into_iter().map(Into::into).collect();
        self
    }

    /// Allow raw text segments interleaved with typed children.
    pub fn mixed(mut self, allowed: bool) -> Self {
        self.allows_mixed = allowed;
        self
    }

    /// Set the node-match predicate used during decode dispatch.
    pub fn matches<F>(mut self, f: F) -> Self
    where
        F: Fn(&XmlElement) -> bool + Send + Sync + 'static,
    {
        self.match_fn = Box::new(f);
        self
    }

    /// Set the encode operation.
    pub fn encode<F>(mut self, f: F) -> Self
    where
        F: Fn(&EncodeContext<'_>, &PropBag, Vec<XmlNode>) -> Result<XmlNode>
            + Send
            + Sync
            + 'static,
    {
        self.encode_fn = Box::new(f);
        self
    }

    /// Set the decode operation.
    pub fn decode<F>(mut self, f: F) -> Self
    where
        F: Fn(&DecodeContext<'_>, &XmlElement) -> Result<(PropBag, Vec<XmlNode>)>
            + Send
            + Sync
            + 'static,
    {
        self.decode_fn = Box::new(f);
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn accepted(&self) -> &[String] {
        &self.accepts
    }

    #[inline]
    pub fn allows_mixed(&self) -> bool {
        self.allows_mixed
    }

    /// Whether a repaired child may stay under a node of this type.
    pub(crate) fn accepts_child(&self, child: &NodeChild) -> bool {
        match child {
            NodeChild::Text(_) => self.allows_mixed,
            NodeChild::Node(n) => self.accepts.iter().any(|a| a == n.type_name()),
        }
    }
}

impl std::fmt::Debug for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeType")
            .field("name", &self.name)
            .field("accepts", &self.accepts)
            .field("allows_mixed", &self.allows_mixed)
            .finish_non_exhaustive()
    }
}

/// Append-only table of node types plus the injected transform engine.
pub struct Registry {
    types: HashMap<String, NodeType>,
    engine: Box<dyn Transform>,
    sealed: AtomicBool,
}

impl Registry {
    /// Create a registry backed by the built-in [`TemplateEngine`].
    pub fn new() -> Self {
        Self::with_engine(Box::new(TemplateEngine))
    }

    /// Create a registry with an injected transform engine.
    pub fn with_engine(engine: Box<dyn Transform>) -> Self {
        Self {
            types: HashMap::new(),
            engine,
            sealed: AtomicBool::new(false),
        }
    }

    /// The injected transform engine.
    #[inline]
    pub fn engine(&self) -> &dyn Transform {
        self.engine.as_ref()
    }

    /// Register a node type.
    ///
    /// Fails with [`ModelError::DuplicateType`] if the name is taken, and
    /// with [`ModelError::SealedRegistry`] once encode/decode has started.
    pub fn register(&mut self, ty: NodeType) -> Result<()> {
        if self.is_sealed() {
            return Err(ModelError::SealedRegistry);
        }
        if self.types.contains_key(ty.name()) {
            return Err(ModelError::DuplicateType(ty.name().to_string()));
        }
        self.types.insert(ty.name().to_string(), ty);
        Ok(())
    }

    /// Look up a definition by type name.
    pub fn get(&self, name: &str) -> Result<&NodeType> {
        self.types
            .get(name)
            .ok_or_else(|| ModelError::UnknownType(name.to_string()))
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    #[inline]
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::SeqCst)
    }

    fn seal(&self) {
        self.sealed.store(true, Ordering::SeqCst);
    }

    /// Construct a tree node, checking that every type in it is registered
    /// and every prop bag holds only finite numbers.
    ///
    /// Acceptance violations are not checked here; [`Self::encode_tree`]
    /// legalizes them through structural repair.
    pub fn build_tree(
        &self,
        type_name: &str,
        props: PropBag,
        children: Vec<NodeChild>,
    ) -> Result<Node> {
        self.get(type_name)?;
        props.validate()?;
        for child in &children {
            if let NodeChild::Node(n) = child {
                self.check_buildable(n)?;
            }
        }
        let mut node = Node::with_props(type_name, props);
        *node.children_mut() = children;
        Ok(node)
    }

    fn check_buildable(&self, node: &Node) -> Result<()> {
        self.get(node.type_name())?;
        node.props().validate()?;
        for child in node.children() {
            if let NodeChild::Node(n) = child {
                self.check_buildable(n)?;
            }
        }
        Ok(())
    }

    /// Legalize a tree through structural repair, then encode it bottom-up
    /// into an XML node. Seals the registry.
    pub fn encode_tree(&self, node: Node) -> Result<XmlNode> {
        self.seal();
        let repaired = repair::repair_tree(self, node)?;
        let mut stack = Vec::new();
        self.encode_in(&repaired, &mut stack)
    }

    /// Encode a single node with an explicit ancestor chain, without running
    /// repair first. The tree must already satisfy the acceptance contract.
    pub fn encode_node<'t>(&self, node: &'t Node, ancestry: &[&'t Node]) -> Result<XmlNode> {
        self.seal();
        let mut stack: Vec<&Node> = ancestry.to_vec();
        self.encode_in(node, &mut stack)
    }

    fn encode_in<'t>(&self, node: &'t Node, stack: &mut Vec<&'t Node>) -> Result<XmlNode> {
        let def = self.get(node.type_name())?;

        stack.push(node);
        let mut encoded = Vec::with_capacity(node.children().len());
        for child in node.children() {
            match child {
                NodeChild::Text(t) => encoded.push(XmlNode::Text(t.clone())),
                NodeChild::Node(n) => encoded.push(self.encode_in(n, stack)?),
            }
        }
        stack.pop();

        let cx = EncodeContext {
            engine: self.engine(),
            ancestry: Ancestry::new(stack.as_slice()),
        };
        (def.encode_fn)(&cx, node.props(), encoded)
    }

    /// Decode an XML node into a tree, dispatching the root against the
    /// given accepted type names. Seals the registry.
    pub fn decode_tree(&self, xml: &XmlNode, accepted_roots: &[&str]) -> Result<Node> {
        self.seal();
        self.dispatch_in(accepted_roots, xml, "root")
    }

    /// Dispatch an XML node against an ordered candidate list: the first
    /// definition whose predicate matches decodes it.
    pub fn dispatch_decode(&self, accepted: &[&str], xml: &XmlNode) -> Result<Node> {
        self.seal();
        self.dispatch_in(accepted, xml, "root")
    }

    fn dispatch_in(&self, accepted: &[&str], xml: &XmlNode, context: &str) -> Result<Node> {
        let el = match xml {
            XmlNode::Element(el) => el,
            XmlNode::Text(_) => {
                return Err(ModelError::NoMatchingType {
                    element: "#text".to_string(),
                    context: context.to_string(),
                });
            },
        };

        for name in accepted {
            let def = self.get(name)?;
            if !(def.match_fn)(el) {
                continue;
            }

            let cx = DecodeContext { engine: self.engine() };
            let (props, child_xmls) = (def.decode_fn)(&cx, el)?;

            let child_accepts: Vec<&str> = def.accepted().iter().map(String::as_str).collect();
            let mut node = Node::with_props(def.name(), props);
            for child_xml in child_xmls {
                match child_xml {
                    XmlNode::Text(t) if def.allows_mixed() => node.push_text(t),
                    XmlNode::Text(_) => {
                        return Err(ModelError::NoMatchingType {
                            element: "#text".to_string(),
                            context: def.name().to_string(),
                        });
                    },
                    XmlNode::Element(child_el) => {
                        let child = XmlNode::Element(child_el);
                        match self.dispatch_in(&child_accepts, &child, def.name()) {
                            Ok(n) => node.push_child(n),
                            // Fatal for that node only; siblings keep decoding.
                            Err(e @ ModelError::MalformedChangeMetadata(_)) => {
                                tracing::warn!("dropping undecodable tracked change: {e}");
                            },
                            Err(e) => return Err(e),
                        }
                    },
                }
            }
            return Ok(node);
        }

        Err(ModelError::NoMatchingType {
            element: el.name.clone(),
            context: context.to_string(),
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.types.len())
            .field("sealed", &self.is_sealed())
            .finish_non_exhaustive()
    }
}
