//! Path resolution and document mutation through an instance's namespaces.
//!
//! Every resolution is traced as `("Resolve xpath", [path, result])`. Code
//! that resolves many values in a row and only wants the outcome traced
//! should hold a [`Session::suppress`] guard around the loop.

use restnote_trace::{LogEvent, Payload};
use restnote_xml::{Document, Item, NodeId};
use serde_json::Value;

use crate::error::{SessionError, SessionResult};
use crate::registry::Instance;
use crate::session::Session;

impl Session {
    /// First match of `path` evaluated at `context`, or `None`.
    pub fn resolve(
        &self,
        name: &str,
        doc: &Document,
        context: NodeId,
        path: &str,
    ) -> SessionResult<Option<Item>> {
        let instance = self.instance(name)?;
        let first = select(&instance, doc, context, path)?.into_iter().next();
        let traced = first
            .as_ref()
            .map(|item| item.to_json(doc))
            .unwrap_or(Value::Null);
        trace_resolution(&instance, path, traced);
        Ok(first)
    }

    /// Every match of `path` evaluated at `context`, in document order.
    pub fn resolve_all(
        &self,
        name: &str,
        doc: &Document,
        context: NodeId,
        path: &str,
    ) -> SessionResult<Vec<Item>> {
        let instance = self.instance(name)?;
        let items = select(&instance, doc, context, path)?;
        let traced = Value::Array(items.iter().map(|item| item.to_json(doc)).collect());
        trace_resolution(&instance, path, traced);
        Ok(items)
    }

    /// String value of the first match, or `None`.
    pub fn resolve_text(
        &self,
        name: &str,
        doc: &Document,
        context: NodeId,
        path: &str,
    ) -> SessionResult<Option<String>> {
        Ok(self
            .resolve(name, doc, context, path)?
            .map(|item| item.string_value(doc)))
    }

    /// Replace the text of the element at `path`.
    ///
    /// A `path` of `.` or `None` targets `context` itself. When nothing
    /// matches, nothing changes and `None` is returned.
    pub fn set_text(
        &self,
        name: &str,
        doc: &mut Document,
        context: NodeId,
        path: Option<&str>,
        value: &str,
    ) -> SessionResult<Option<NodeId>> {
        let target = match path {
            None | Some(".") | Some("") => Some(context),
            Some(path) => self.resolve_element(name, doc, context, path)?,
        };
        let Some(element) = target else {
            return Ok(None);
        };
        doc.set_text(element, value)?;
        self.log(name, LogEvent::pretty("New value", value))?;
        Ok(Some(element))
    }

    /// Set attribute `attr` on the element at `path`.
    pub fn set_attribute(
        &self,
        name: &str,
        doc: &mut Document,
        context: NodeId,
        path: &str,
        attr: &str,
        value: &str,
    ) -> SessionResult<Option<NodeId>> {
        let Some(element) = self.resolve_element(name, doc, context, path)? else {
            return Ok(None);
        };
        doc.set_attribute(element, attr, value)?;
        self.log(
            name,
            LogEvent::pretty("New attribute value", format!("{attr} = \"{value}\"")),
        )?;
        Ok(Some(element))
    }

    /// Append a `prefix:local` child to the element at `path`.
    ///
    /// The prefix is looked up in the instance's namespace table.
    pub fn add_element(
        &self,
        name: &str,
        doc: &mut Document,
        context: NodeId,
        path: &str,
        tag: &str,
    ) -> SessionResult<Option<NodeId>> {
        let Some(parent) = self.resolve_element(name, doc, context, path)? else {
            return Ok(None);
        };
        let instance = self.instance(name)?;
        Ok(Some(doc.append_element(parent, tag, instance.namespaces())?))
    }

    fn resolve_element(
        &self,
        name: &str,
        doc: &Document,
        context: NodeId,
        path: &str,
    ) -> SessionResult<Option<NodeId>> {
        match self.resolve(name, doc, context, path)? {
            None => Ok(None),
            Some(Item::Element(id)) if doc.is_element(id) => Ok(Some(id)),
            Some(other) => Err(SessionError::InvalidElement(other.describe(doc))),
        }
    }
}

fn select(
    instance: &Instance,
    doc: &Document,
    context: NodeId,
    path: &str,
) -> SessionResult<Vec<Item>> {
    Ok(doc.select(context, path, instance.namespaces())?)
}

fn trace_resolution(instance: &Instance, path: &str, result: Value) {
    instance.emit(LogEvent::pretty(
        "Resolve xpath",
        Payload::Value(Value::Array(vec![Value::String(path.to_string()), result])),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Credentials;
    use pretty_assertions::assert_eq;
    use restnote_trace::{EventKind, MemoryLogger};
    use restnote_xml::Namespaces;
    use serde_json::json;
    use std::sync::Arc;

    const ENTRY: &str = r#"<entry xmlns="http://www.w3.org/2005/Atom"><id>urn:1</id><title>Old</title><link rel="edit" href="http://h/1"/></entry>"#;

    fn setup() -> (Session, Arc<MemoryLogger>, Document) {
        let session = Session::new();
        let logger = Arc::new(MemoryLogger::new());
        session
            .registry()
            .register(
                "nb",
                Credentials::new("u", "p"),
                Namespaces::from_pairs([
                    ("atom", "http://www.w3.org/2005/Atom"),
                    ("m", "urn:meta"),
                ]),
                Some(logger.clone()),
            )
            .unwrap();
        (session, logger, Document::parse(ENTRY).unwrap())
    }

    #[test]
    fn test_resolve_first_or_none() {
        let (session, logger, doc) = setup();
        let root = doc.document_node();
        let id = session.resolve_text("nb", &doc, root, "/atom:entry/atom:id").unwrap();
        assert_eq!(id.as_deref(), Some("urn:1"));
        let missing = session.resolve("nb", &doc, root, "/atom:entry/atom:nope").unwrap();
        assert_eq!(missing, None);

        let events = logger.events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.kind == EventKind::Pretty));
        assert_eq!(
            events[1].payload,
            Some(Payload::Value(json!(["/atom:entry/atom:nope", null])))
        );
    }

    #[test]
    fn test_resolve_all_empty_is_empty_list() {
        let (session, logger, doc) = setup();
        let items = session
            .resolve_all("nb", &doc, doc.document_node(), "//atom:category")
            .unwrap();
        assert!(items.is_empty());
        assert_eq!(
            logger.events()[0].payload,
            Some(Payload::Value(json!(["//atom:category", []])))
        );
    }

    #[test]
    fn test_invalid_context_is_invalid_element() {
        let (session, _, doc) = setup();
        let root = doc.root_element().unwrap();
        let text = doc.children(doc.children(root)[0])[0];
        assert!(matches!(
            session.resolve("nb", &doc, text, "atom:id"),
            Err(SessionError::InvalidElement(_))
        ));
    }

    #[test]
    fn test_node_of_another_document_is_invalid_element() {
        let (session, _, _) = setup();
        let other = Document::parse("<a><b/><c/><d/><e/></a>").unwrap();
        let foreign = other
            .select(other.document_node(), "//e", &Namespaces::new())
            .unwrap()[0]
            .as_element()
            .unwrap();
        let mut small = Document::parse("<x/>").unwrap();
        assert!(!small.contains(foreign));

        assert!(matches!(
            session.resolve("nb", &small, foreign, "y"),
            Err(SessionError::InvalidElement(_))
        ));
        assert!(matches!(
            session.resolve_all("nb", &small, foreign, "y"),
            Err(SessionError::InvalidElement(_))
        ));
        assert!(matches!(
            session.set_text("nb", &mut small, foreign, None, "z"),
            Err(SessionError::InvalidElement(_))
        ));
        assert!(matches!(
            session.set_attribute("nb", &mut small, foreign, ".", "k", "v"),
            Err(SessionError::InvalidElement(_))
        ));
        assert!(matches!(
            session.add_element("nb", &mut small, foreign, ".", "atom:y"),
            Err(SessionError::InvalidElement(_))
        ));
        assert_eq!(small.to_xml_string(), "<x/>");
    }

    #[test]
    fn test_set_text_and_attribute() {
        let (session, logger, mut doc) = setup();
        let root = doc.root_element().unwrap();
        let changed = session
            .set_text("nb", &mut doc, root, Some("atom:title"), "New")
            .unwrap();
        assert!(changed.is_some());
        session
            .set_attribute("nb", &mut doc, root, "atom:link", "rel", "alternate")
            .unwrap();
        assert_eq!(
            doc.to_xml_string(),
            r#"<entry xmlns="http://www.w3.org/2005/Atom"><id>urn:1</id><title>New</title><link rel="alternate" href="http://h/1"/></entry>"#
        );

        let pretty: Vec<_> = logger
            .events()
            .into_iter()
            .filter(|e| e.description_text().starts_with("New"))
            .map(|e| e.payload.map(|p| p.to_text()).unwrap_or_default())
            .collect();
        assert_eq!(pretty, vec!["New".to_string(), "rel = \"alternate\"".to_string()]);
    }

    #[test]
    fn test_set_text_on_context_and_no_match() {
        let (session, _, mut doc) = setup();
        let root = doc.root_element().unwrap();
        let title = session
            .resolve("nb", &doc, root, "atom:title")
            .unwrap()
            .and_then(|i| i.as_element())
            .unwrap();
        session.set_text("nb", &mut doc, title, Some("."), "Here").unwrap();
        assert_eq!(doc.text(title), Some("Here"));

        let none = session
            .set_text("nb", &mut doc, root, Some("atom:summary"), "x")
            .unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_mutating_an_attribute_match_fails() {
        let (session, _, mut doc) = setup();
        let root = doc.root_element().unwrap();
        let err = session
            .set_text("nb", &mut doc, root, Some("atom:link/@href"), "x")
            .unwrap_err();
        assert!(matches!(err, SessionError::InvalidElement(ref what) if what == "href=\"http://h/1\""));
    }

    #[test]
    fn test_add_element_uses_instance_namespaces() {
        let (session, _, mut doc) = setup();
        let root = doc.document_node();
        let added = session
            .add_element("nb", &mut doc, root, "/atom:entry", "m:status")
            .unwrap()
            .unwrap();
        doc.set_text(added, "online").unwrap();
        assert!(doc.to_xml_string().ends_with(
            r#"<m:status xmlns:m="urn:meta">online</m:status></entry>"#
        ));
        let again = session
            .resolve_text("nb", &doc, root, "/atom:entry/m:status")
            .unwrap();
        assert_eq!(again.as_deref(), Some("online"));
    }
}
