//! Deterministic serialization.

use quick_xml::escape::{escape, partial_escape};

use crate::document::{Document, NodeId, NodeKind};

impl Document {
    /// Serialize the whole document (without an XML declaration).
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        for &child in self.children(self.document_node()) {
            self.write_node(child, &mut out);
        }
        out
    }

    /// Serialize a single node and its descendants.
    ///
    /// Namespace declarations made by ancestors are not repeated, so the
    /// fragment of a nested node may not be self-contained.
    pub fn node_to_string(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let Some(kind) = self.kind(id) else {
            return;
        };
        match kind {
            NodeKind::Document => {
                for &child in self.children(id) {
                    self.write_node(child, out);
                }
            }
            NodeKind::Text(text) => out.push_str(&partial_escape(text.as_str())),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Element(data) => {
                let name = data.name.qualified();
                out.push('<');
                out.push_str(&name);
                for (prefix, uri) in &data.declarations {
                    match prefix {
                        Some(prefix) => {
                            out.push_str(" xmlns:");
                            out.push_str(prefix);
                        }
                        None => out.push_str(" xmlns"),
                    }
                    out.push_str("=\"");
                    out.push_str(&escape(uri.as_str()));
                    out.push('"');
                }
                for attr in &data.attributes {
                    out.push(' ');
                    out.push_str(&attr.name.qualified());
                    out.push_str("=\"");
                    out.push_str(&escape(attr.value.as_str()));
                    out.push('"');
                }
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                    return;
                }
                out.push('>');
                for &child in children {
                    self.write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&name);
                out.push('>');
            }
        }
    }
}
