//! # restnote XML
//!
//! In-memory XML documents and a namespace-aware XPath 1.0 evaluator.
//!
//! Documents are stored in an arena: every node is addressed by a [`NodeId`]
//! and mutation happens through `&mut Document`. XPath results are returned
//! as [`Item`]s which either reference element nodes or carry a materialized
//! string/number/boolean value.
//!
//! ```rust
//! use restnote_xml::{Document, Namespaces};
//!
//! let doc = Document::parse(
//!     r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><id>1</id></entry></feed>"#,
//! ).unwrap();
//! let ns = Namespaces::from_pairs([("atom", "http://www.w3.org/2005/Atom")]);
//! let ids = doc.select(doc.document_node(), "/atom:feed/atom:entry/atom:id/text()", &ns).unwrap();
//! assert_eq!(ids[0].string_value(&doc), "1");
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

mod document;
mod error;
mod item;
mod namespaces;
mod writer;
pub mod xpath;

pub use document::{Attribute, Document, NodeId, NodeKind, QName};
pub use error::{XmlError, XmlResult};
pub use item::Item;
pub use namespaces::{Namespaces, XML_NAMESPACE};
pub use xpath::XPath;
