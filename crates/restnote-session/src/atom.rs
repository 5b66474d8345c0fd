//! Atom feeds as tables.
//!
//! A [`FieldSpec`] says where a column's value lives inside an entry and how
//! to style it. [`Session::feed_table`] resolves every field of every entry
//! with the logger muted and then emits one table event.

use std::collections::HashMap;

use restnote_trace::LogEvent;
use restnote_xml::{Document, NodeId};
use serde::{Deserialize, Serialize};

use crate::error::{SessionResult, die};
use crate::session::Session;

/// Path to the entries of an Atom feed, using the `atom` prefix.
pub const FEED_ENTRIES: &str = "/atom:feed/atom:entry";

/// Colour used for values missing from a colour map.
const UNMAPPED_COLOR: &str = "black";

/// One column of a feed table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Path of the value, relative to the entry
    pub xpath: String,
    /// Column heading
    pub title: String,
    /// Colour applied to every value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Colour per value
    #[serde(
        default,
        alias = "color-map",
        skip_serializing_if = "Option::is_none"
    )]
    pub color_map: Option<HashMap<String, String>>,
    /// Markup template for graphical renderers; `%s` is the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
}

impl FieldSpec {
    /// A plain column.
    pub fn new(xpath: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            xpath: xpath.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Colour every value.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Colour by value.
    pub fn with_color_map<I, K, V>(mut self, map: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.color_map = Some(map.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Wrap values in markup for graphical renderers.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }
}

/// Columns by key.
pub type FieldMap = HashMap<String, FieldSpec>;

fn field<'a>(fields_map: &'a FieldMap, key: &str) -> SessionResult<&'a FieldSpec> {
    fields_map
        .get(key)
        .ok_or_else(|| die(format!("field mapping for '{key}'")))
}

impl Session {
    /// Cells of one entry, in the order of `fields`.
    ///
    /// A colour map colours the value (unmapped values get black). A fixed
    /// colour is applied next; without one, graphical output applies the
    /// field's template. Missing values are empty strings.
    pub fn entry_row(
        &self,
        name: &str,
        doc: &Document,
        entry: NodeId,
        fields_map: &FieldMap,
        fields: &[&str],
        graphical: bool,
    ) -> SessionResult<Vec<String>> {
        let mut row = Vec::with_capacity(fields.len());
        for key in fields {
            let spec = field(fields_map, key)?;
            let mut value = self
                .resolve_text(name, doc, entry, &spec.xpath)?
                .unwrap_or_default();
            if let Some(color_map) = &spec.color_map {
                let color = color_map
                    .get(&value)
                    .map(String::as_str)
                    .unwrap_or(UNMAPPED_COLOR);
                value = self.colorize(name, &value, color)?;
            }
            if let Some(color) = &spec.color {
                value = self.colorize(name, &value, color)?;
            } else if graphical && let Some(template) = &spec.template {
                value = template.replace("%s", &value);
            }
            row.push(value);
        }
        Ok(row)
    }

    /// Emit the entries of an Atom feed as one table event.
    ///
    /// The logger is muted while values are resolved and its previous mute
    /// state is restored before the table goes out, on every exit path.
    pub fn feed_table(
        &self,
        name: &str,
        doc: &Document,
        fields_map: &FieldMap,
        fields: &[&str],
        graphical: bool,
    ) -> SessionResult<()> {
        let guard = self.suppress(name)?;
        let headings = fields
            .iter()
            .map(|key| field(fields_map, key).map(|spec| spec.title.clone()))
            .collect::<SessionResult<Vec<_>>>()?;
        let mut rows = Vec::new();
        for entry in self.resolve_all(name, doc, doc.document_node(), FEED_ENTRIES)? {
            if let Some(entry) = entry.as_element() {
                rows.push(self.entry_row(name, doc, entry, fields_map, fields, graphical)?);
            }
        }
        drop(guard);
        self.log(name, LogEvent::table(headings, rows))
    }

    /// [`feed_table`](Self::feed_table), graphical when the logger is.
    pub fn feed_table_auto(
        &self,
        name: &str,
        doc: &Document,
        fields_map: &FieldMap,
        fields: &[&str],
    ) -> SessionResult<()> {
        let graphical = self.instance(name)?.is_graphical();
        self.feed_table(name, doc, fields_map, fields, graphical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use crate::registry::Credentials;
    use pretty_assertions::assert_eq;
    use restnote_trace::{Description, EventKind, LogEvent, Logger, MemoryLogger, Payload};
    use restnote_xml::Namespaces;
    use std::sync::Arc;

    const FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom" xmlns:v="urn:v">
  <entry><id>1</id><v:status>online</v:status><title>Intro</title></entry>
  <entry><id>22</id><v:status>off</v:status></entry>
  <entry><id>3</id><v:status>broken</v:status><title>Outro</title></entry>
</feed>"#;

    fn fields() -> FieldMap {
        let mut map = FieldMap::new();
        map.insert("id".into(), FieldSpec::new("atom:id", "Id"));
        map.insert(
            "status".into(),
            FieldSpec::new("v:status", "Status")
                .with_color_map([("online", "green"), ("off", "red")]),
        );
        map.insert(
            "title".into(),
            FieldSpec::new("atom:title", "Title").with_template("<b>%s</b>"),
        );
        map.insert(
            "id-blue".into(),
            FieldSpec::new("atom:id", "Id").with_color("blue"),
        );
        map
    }

    fn session(logger: Arc<MemoryLogger>) -> Session {
        let session = Session::new();
        session
            .registry()
            .register(
                "nb",
                Credentials::new("u", "p"),
                Namespaces::from_pairs([
                    ("atom", "http://www.w3.org/2005/Atom"),
                    ("v", "urn:v"),
                ]),
                Some(logger),
            )
            .unwrap();
        session
    }

    fn rows_of(event: &LogEvent) -> Vec<Vec<String>> {
        match &event.payload {
            Some(Payload::Rows(rows)) => rows.clone(),
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn test_feed_table_emits_only_the_table() {
        let logger = Arc::new(MemoryLogger::new());
        let session = session(logger.clone());
        let doc = Document::parse(FEED).unwrap();

        session.comment("nb", "before").unwrap();
        session
            .feed_table("nb", &doc, &fields(), &["id", "status", "title"], false)
            .unwrap();
        session.comment("nb", "after").unwrap();

        let events = logger.events();
        assert_eq!(
            logger.kinds(),
            vec![EventKind::Comment, EventKind::Table, EventKind::Comment]
        );
        assert_eq!(
            events[1].description,
            Some(Description::Headings(vec![
                "Id".into(),
                "Status".into(),
                "Title".into()
            ]))
        );
        assert_eq!(
            rows_of(&events[1]),
            vec![
                vec!["1".to_string(), "online".into(), "Intro".into()],
                vec!["22".to_string(), "off".into(), String::new()],
                vec!["3".to_string(), "broken".into(), "Outro".into()],
            ]
        );
        assert!(!logger.mute_state().is_muted());
    }

    #[test]
    fn test_graphical_rows_are_styled() {
        let logger = Arc::new(MemoryLogger::graphical());
        let session = session(logger.clone());
        let doc = Document::parse(FEED).unwrap();

        session
            .feed_table_auto("nb", &doc, &fields(), &["id-blue", "status", "title"])
            .unwrap();
        let events = logger.events();
        assert_eq!(events.len(), 1);
        assert_eq!(
            rows_of(&events[0])[0],
            vec![
                "<blue>1</blue>".to_string(),
                "<green>online</green>".into(),
                "<b>Intro</b>".into()
            ]
        );
        assert_eq!(rows_of(&events[0])[2][1], "<black>broken</black>");
    }

    #[test]
    fn test_mute_restored_to_prior_value() {
        let logger = Arc::new(MemoryLogger::new());
        let session = session(logger.clone());
        let doc = Document::parse(FEED).unwrap();

        logger.mute_state().set_muted(true);
        session
            .feed_table("nb", &doc, &fields(), &["id"], false)
            .unwrap();
        assert!(logger.mute_state().is_muted());
        assert!(logger.is_empty());
    }

    #[test]
    fn test_unknown_field_fails_and_unmutes() {
        let logger = Arc::new(MemoryLogger::new());
        let session = session(logger.clone());
        let doc = Document::parse(FEED).unwrap();

        let err = session
            .feed_table("nb", &doc, &fields(), &["id", "nope"], false)
            .unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert!(!logger.mute_state().is_muted());
    }

    #[test]
    fn test_field_spec_from_json() {
        let spec: FieldSpec = serde_json::from_str(
            r#"{"xpath": "v:status", "title": "Status", "color-map": {"online": "green"}}"#,
        )
        .unwrap();
        assert_eq!(
            spec,
            FieldSpec::new("v:status", "Status").with_color_map([("online", "green")])
        );
    }
}
