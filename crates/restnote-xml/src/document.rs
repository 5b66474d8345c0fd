//! Arena-backed XML document model.
//!
//! A [`Document`] owns every node it contains. Nodes are addressed by
//! [`NodeId`]; the document node (id 0) is the parent of the root element
//! and of any top-level comments.

use std::fmt;

use quick_xml::Reader;
use quick_xml::encoding::{Decoder, decode, detect_encoding};
use quick_xml::events::{BytesStart, Event};

use crate::error::{XmlError, XmlResult};
use crate::item::Item;
use crate::namespaces::{Namespaces, XML_NAMESPACE};
use crate::xpath::XPath;

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A namespace-resolved name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Prefix as written in the source, if any
    pub prefix: Option<String>,
    /// Local part of the name
    pub local: String,
    /// Resolved namespace URI
    pub namespace: Option<String>,
}

impl QName {
    /// The name as written: `prefix:local` or `local`.
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// An attribute on an element. Namespace declarations are not attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name
    pub name: QName,
    /// Unescaped value
    pub value: String,
}

/// Element payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub(crate) name: QName,
    pub(crate) attributes: Vec<Attribute>,
    /// `(prefix, uri)`; `None` prefix is the default namespace
    pub(crate) declarations: Vec<(Option<String>, String)>,
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node
    Document,
    /// An element
    Element(ElementData),
    /// Character data (CDATA sections are folded into text)
    Text(String),
    /// A comment
    Comment(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

/// An XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub(crate) nodes: Vec<Node>,
}

impl Document {
    /// Parse a document from raw bytes, such as an HTTP response body.
    ///
    /// A byte order mark wins; otherwise the `encoding` of the XML
    /// declaration is honoured. Without either the input must be UTF-8.
    pub fn parse_bytes(bytes: &[u8]) -> XmlResult<Self> {
        let (detected, bom) = match detect_encoding(bytes) {
            Some((encoding, bom)) => (Some(encoding), bom),
            None => (None, 0),
        };
        let body = &bytes[bom..];
        let encoding = match detected {
            Some(encoding) if bom > 0 || encoding.name().starts_with("UTF-16") => Some(encoding),
            _ => match Reader::from_reader(body).read_event() {
                Ok(Event::Decl(decl)) => decl.encoder(),
                _ => None,
            },
        };
        match encoding {
            Some(encoding) if encoding.name() != "UTF-8" => Self::parse(&decode(body, encoding)?),
            _ => Self::parse(std::str::from_utf8(body)?),
        }
    }

    /// Parse a document from text.
    pub fn parse(text: &str) -> XmlResult<Self> {
        let mut doc = Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        };

        let mut reader = Reader::from_str(text);
        let mut stack = vec![doc.document_node()];

        loop {
            let parent = *stack.last().unwrap_or(&NodeId(0));
            match reader.read_event() {
                Ok(Event::Start(start)) => {
                    let id = doc.open_element(parent, &start, reader.decoder())?;
                    stack.push(id);
                }
                Ok(Event::Empty(start)) => {
                    doc.open_element(parent, &start, reader.decoder())?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Text(t)) => {
                    let value = t.unescape()?.into_owned();
                    doc.push_text(parent, value);
                }
                Ok(Event::CData(c)) => {
                    let value = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    doc.push_text(parent, value);
                }
                Ok(Event::Comment(c)) => {
                    let value = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    doc.push(parent, NodeKind::Comment(value));
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(XmlError::Parse(format!(
                        "at position {}: {e}",
                        reader.buffer_position()
                    )));
                }
            }
        }

        if stack.len() > 1 {
            return Err(XmlError::Parse("unexpected end of input".to_string()));
        }
        if doc.root_element().is_none() {
            return Err(XmlError::NoRootElement);
        }
        Ok(doc)
    }

    fn open_element(
        &mut self,
        parent: NodeId,
        start: &BytesStart<'_>,
        decoder: Decoder,
    ) -> XmlResult<NodeId> {
        let raw_name = std::str::from_utf8(start.name().as_ref())?.to_string();

        let mut declarations = Vec::new();
        let mut raw_attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
            let value = attr.decode_and_unescape_value(decoder)?.into_owned();
            if key == "xmlns" {
                declarations.push((None, value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations.push((Some(prefix.to_string()), value));
            } else {
                raw_attributes.push((key, value));
            }
        }

        let id = self.push(
            parent,
            NodeKind::Element(ElementData {
                name: QName {
                    prefix: None,
                    local: String::new(),
                    namespace: None,
                },
                attributes: Vec::new(),
                declarations,
            }),
        );

        // Declarations on the element itself are in scope for its own name.
        let name = self.resolve_name(id, &raw_name, true)?;
        let mut attributes = Vec::with_capacity(raw_attributes.len());
        for (key, value) in raw_attributes {
            attributes.push(Attribute {
                name: self.resolve_name(id, &key, false)?,
                value,
            });
        }

        if let NodeKind::Element(data) = &mut self.nodes[id.0].kind {
            data.name = name;
            data.attributes = attributes;
        }
        Ok(id)
    }

    fn resolve_name(&self, scope: NodeId, raw: &str, use_default: bool) -> XmlResult<QName> {
        match raw.split_once(':') {
            Some((prefix, local)) => {
                let namespace = self.lookup_namespace(scope, Some(prefix)).ok_or_else(|| {
                    XmlError::Parse(format!("undeclared namespace prefix '{prefix}'"))
                })?;
                Ok(QName {
                    prefix: Some(prefix.to_string()),
                    local: local.to_string(),
                    namespace: Some(namespace.to_string()),
                })
            }
            None => Ok(QName {
                prefix: None,
                local: raw.to_string(),
                namespace: if use_default {
                    self.lookup_namespace(scope, None)
                        .filter(|uri| !uri.is_empty())
                        .map(str::to_string)
                } else {
                    None
                },
            }),
        }
    }

    fn push_text(&mut self, parent: NodeId, value: String) {
        // Whitespace between top-level constructs carries no information.
        if parent == self.document_node() && value.trim().is_empty() {
            return;
        }
        if let Some(&last) = self.nodes[parent.0].children.last()
            && let NodeKind::Text(existing) = &mut self.nodes[last.0].kind
        {
            existing.push_str(&value);
            return;
        }
        self.push(parent, NodeKind::Text(value));
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// The document node.
    pub fn document_node(&self) -> NodeId {
        NodeId(0)
    }

    /// The root element.
    pub fn root_element(&self) -> Option<NodeId> {
        self.nodes[0]
            .children
            .iter()
            .copied()
            .find(|&id| self.is_element(id))
    }

    /// Whether `id` belongs to this document.
    ///
    /// A [`NodeId`] is an index into one document; ids taken from another
    /// document are out of range here, or point at an unrelated node.
    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// The kind of `id`, `None` if it is not a node of this document.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|node| &node.kind)
    }

    /// Whether `id` is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Element(_)))
    }

    /// Whether `id` can be used as an XPath context (element or document node).
    pub fn is_container(&self, id: NodeId) -> bool {
        matches!(
            self.kind(id),
            Some(NodeKind::Element(_) | NodeKind::Document)
        )
    }

    /// Name of an element.
    pub fn name(&self, id: NodeId) -> Option<&QName> {
        match self.kind(id)? {
            NodeKind::Element(data) => Some(&data.name),
            _ => None,
        }
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent
    }

    /// Child nodes in document order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    /// Child elements in document order.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
    }

    /// Attributes of an element (empty for other nodes).
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.kind(id) {
            Some(NodeKind::Element(data)) => &data.attributes,
            _ => &[],
        }
    }

    /// Value of the attribute written as `name` (`prefix:local` or `local`).
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name.qualified() == name)
            .map(|a| a.value.as_str())
    }

    /// Leading text of an element, before its first child element.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        let first = *self.children(id).first()?;
        match self.kind(first)? {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// XPath string-value: concatenated descendant text for elements.
    ///
    /// Empty for ids outside this document.
    pub fn string_value(&self, id: NodeId) -> String {
        match self.kind(id) {
            Some(NodeKind::Text(text) | NodeKind::Comment(text)) => text.clone(),
            Some(NodeKind::Element(_) | NodeKind::Document) => {
                let mut out = String::new();
                self.collect_text(id, &mut out);
                out
            }
            None => String::new(),
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        for &child in self.children(id) {
            match self.kind(child) {
                Some(NodeKind::Text(text)) => out.push_str(text),
                Some(NodeKind::Element(_)) => self.collect_text(child, out),
                _ => {}
            }
        }
    }

    /// Find the namespace bound to `prefix` (or the default namespace) at `id`.
    pub fn lookup_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NAMESPACE);
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(NodeKind::Element(data)) = self.kind(node)
                && let Some((_, uri)) = data
                    .declarations
                    .iter()
                    .find(|(p, _)| p.as_deref() == prefix)
            {
                return Some(uri.as_str());
            }
            current = self.parent(node);
        }
        None
    }

    /// Replace the leading text of an element.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> XmlResult<()> {
        self.require_element(id)?;
        let text = text.into();
        if let Some(&first) = self.nodes[id.0].children.first()
            && let NodeKind::Text(existing) = &mut self.nodes[first.0].kind
        {
            *existing = text;
            return Ok(());
        }
        let text_id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind: NodeKind::Text(text),
            parent: Some(id),
            children: Vec::new(),
        });
        self.nodes[id.0].children.insert(0, text_id);
        Ok(())
    }

    /// Set (or add) an attribute. A prefixed name must be declared in scope.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> XmlResult<()> {
        self.require_element(id)?;
        let qname = self.resolve_name(id, name, false)?;
        let value = value.into();
        if let NodeKind::Element(data) = &mut self.nodes[id.0].kind {
            match data.attributes.iter_mut().find(|a| a.name == qname) {
                Some(existing) => existing.value = value,
                None => data.attributes.push(Attribute { name: qname, value }),
            }
        }
        Ok(())
    }

    /// Append a child element named `tag` (`prefix:local` or `local`).
    ///
    /// The prefix is resolved through `namespaces`; if the resulting URI is not
    /// already bound to that prefix in scope, the new element declares it.
    pub fn append_element(
        &mut self,
        parent: NodeId,
        tag: &str,
        namespaces: &Namespaces,
    ) -> XmlResult<NodeId> {
        if !self.is_container(parent) {
            return Err(XmlError::InvalidContext(format!("node {parent}")));
        }
        let (prefix, local) = match tag.split_once(':') {
            Some((p, l)) => (Some(p.to_string()), l.to_string()),
            None => (None, tag.to_string()),
        };
        let namespace = match &prefix {
            Some(p) => Some(
                namespaces
                    .get(p)
                    .ok_or_else(|| XmlError::UnknownPrefix(p.clone()))?
                    .to_string(),
            ),
            None => self
                .lookup_namespace(parent, None)
                .filter(|uri| !uri.is_empty())
                .map(str::to_string),
        };

        let mut declarations = Vec::new();
        if let Some(uri) = &namespace
            && self.lookup_namespace(parent, prefix.as_deref()) != Some(uri.as_str())
        {
            declarations.push((prefix.clone(), uri.clone()));
        }

        Ok(self.push(
            parent,
            NodeKind::Element(ElementData {
                name: QName {
                    prefix,
                    local,
                    namespace,
                },
                attributes: Vec::new(),
                declarations,
            }),
        ))
    }

    fn require_element(&self, id: NodeId) -> XmlResult<()> {
        if self.is_element(id) {
            Ok(())
        } else {
            Err(XmlError::InvalidContext(format!("node {id}")))
        }
    }

    /// Evaluate an XPath expression with `context` as the context node.
    pub fn select(
        &self,
        context: NodeId,
        expression: &str,
        namespaces: &Namespaces,
    ) -> XmlResult<Vec<Item>> {
        XPath::compile(expression, namespaces)?.evaluate(self, context)
    }

    /// Preorder position of every reachable node, indexed by arena id.
    pub(crate) fn document_order(&self) -> Vec<usize> {
        let mut order = vec![usize::MAX; self.nodes.len()];
        let mut counter = 0;
        let mut stack = vec![NodeId(0)];
        while let Some(id) = stack.pop() {
            order[id.0] = counter;
            counter += 1;
            for &child in self.nodes[id.0].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:mam="http://www.vizrt.com/2010/mam">
  <entry><id>1</id><mam:mediastatus>online</mam:mediastatus></entry>
  <entry><id>22</id><mam:mediastatus>offline</mam:mediastatus></entry>
</feed>"#;

    #[test]
    fn test_parse_resolves_namespaces() {
        let doc = Document::parse(FEED).unwrap();
        let root = doc.root_element().unwrap();
        let name = doc.name(root).unwrap();
        assert_eq!(name.local, "feed");
        assert_eq!(name.namespace.as_deref(), Some("http://www.w3.org/2005/Atom"));

        let entry = doc.child_elements(root).next().unwrap();
        let status = doc.child_elements(entry).nth(1).unwrap();
        let status_name = doc.name(status).unwrap();
        assert_eq!(status_name.prefix.as_deref(), Some("mam"));
        assert_eq!(
            status_name.namespace.as_deref(),
            Some("http://www.vizrt.com/2010/mam")
        );
        assert_eq!(doc.text(status), Some("online"));
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(matches!(
            Document::parse("<a><b></a>"),
            Err(XmlError::Parse(_))
        ));
        assert!(matches!(
            Document::parse("just text"),
            Err(XmlError::NoRootElement)
        ));
        assert!(matches!(
            Document::parse("<p:a/>"),
            Err(XmlError::Parse(_))
        ));
    }

    #[test]
    fn test_entities_and_cdata_become_text() {
        let doc = Document::parse("<a>x &amp; <![CDATA[<y>]]></a>").unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.string_value(root), "x & <y>");
    }

    #[test]
    fn test_set_text_replaces_leading_text_only() {
        let mut doc = Document::parse("<a>old<b>keep</b></a>").unwrap();
        let root = doc.root_element().unwrap();
        doc.set_text(root, "new").unwrap();
        assert_eq!(doc.text(root), Some("new"));
        assert_eq!(doc.string_value(root), "newkeep");

        let b = doc.child_elements(root).next().unwrap();
        let mut empty = Document::parse("<a><b/></a>").unwrap();
        let empty_root = empty.root_element().unwrap();
        empty.set_text(empty_root, "first").unwrap();
        assert_eq!(empty.text(empty_root), Some("first"));
        assert!(doc.set_text(doc.children(b)[0], "nope").is_err());
    }

    #[test]
    fn test_set_attribute_adds_and_replaces() {
        let mut doc = Document::parse(r#"<a x="1"/>"#).unwrap();
        let root = doc.root_element().unwrap();
        doc.set_attribute(root, "x", "2").unwrap();
        doc.set_attribute(root, "y", "3").unwrap();
        assert_eq!(doc.attribute(root, "x"), Some("2"));
        assert_eq!(doc.attribute(root, "y"), Some("3"));
    }

    #[test]
    fn test_append_element_declares_namespace_when_needed() {
        let mut doc = Document::parse(r#"<feed xmlns="http://www.w3.org/2005/Atom"/>"#).unwrap();
        let root = doc.root_element().unwrap();
        let ns = Namespaces::from_pairs([
            ("atom", "http://www.w3.org/2005/Atom"),
            ("mam", "http://www.vizrt.com/2010/mam"),
        ]);
        let entry = doc.append_element(root, "atom:entry", &ns).unwrap();
        let status = doc.append_element(entry, "mam:status", &ns).unwrap();
        assert_eq!(
            doc.name(entry).unwrap().namespace.as_deref(),
            Some("http://www.w3.org/2005/Atom")
        );
        assert_eq!(doc.lookup_namespace(status, Some("mam")), Some("http://www.vizrt.com/2010/mam"));
        assert!(matches!(
            doc.append_element(root, "nope:thing", &ns),
            Err(XmlError::UnknownPrefix(_))
        ));
    }

    #[test]
    fn test_ids_from_another_document_are_rejected() {
        let big = Document::parse("<a><b/><c/><d/><e/></a>").unwrap();
        let e = big.select(big.document_node(), "//e", &Namespaces::new()).unwrap()[0]
            .as_element()
            .unwrap();
        let mut small = Document::parse("<x/>").unwrap();

        assert!(!small.contains(e));
        assert!(small.kind(e).is_none());
        assert!(!small.is_element(e));
        assert!(small.children(e).is_empty());
        assert_eq!(small.parent(e), None);
        assert_eq!(small.text(e), None);
        assert_eq!(small.string_value(e), "");
        assert!(matches!(
            small.select(e, "y", &Namespaces::new()),
            Err(XmlError::InvalidContext(_))
        ));
        assert!(matches!(small.set_text(e, "z"), Err(XmlError::InvalidContext(_))));
        assert!(matches!(
            small.append_element(e, "y", &Namespaces::new()),
            Err(XmlError::InvalidContext(_))
        ));
    }

    #[test]
    fn test_parse_bytes_follows_bom_and_declaration() {
        let mut utf16 = vec![0xFF, 0xFE];
        for unit in "<a>\u{e9}t\u{e9}</a>".encode_utf16() {
            utf16.extend_from_slice(&unit.to_le_bytes());
        }
        let doc = Document::parse_bytes(&utf16).unwrap();
        assert_eq!(doc.text(doc.root_element().unwrap()), Some("\u{e9}t\u{e9}"));

        let mut latin1 = b"<?xml version='1.0' encoding='iso-8859-1'?><a>".to_vec();
        latin1.push(0xE9);
        latin1.extend_from_slice(b"</a>");
        let doc = Document::parse_bytes(&latin1).unwrap();
        assert_eq!(doc.text(doc.root_element().unwrap()), Some("\u{e9}"));

        let doc = Document::parse_bytes("\u{feff}<a>\u{e9}</a>".as_bytes()).unwrap();
        assert_eq!(doc.text(doc.root_element().unwrap()), Some("\u{e9}"));

        assert!(matches!(
            Document::parse_bytes(b"<a>\xE9</a>"),
            Err(XmlError::Parse(_))
        ));
    }
}
