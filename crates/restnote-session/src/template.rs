//! URL templates and text filling.

use std::collections::BTreeMap;
use std::fmt::Display;

use restnote_trace::{LogEvent, Payload};
use url::Url;

use crate::error::{SessionError, SessionResult};
use crate::session::Session;

/// Name of the placeholder in a query value such as `{searchTerms?}`.
fn placeholder(value: &str) -> Option<String> {
    value
        .starts_with('{')
        .then(|| value.replace(['{', '}', '?'], ""))
}

impl Session {
    /// Fill the query placeholders of `template` from `substitutions`.
    ///
    /// A query value starting with `{` is a placeholder. It is replaced by
    /// the substitution of the same name; without one, the whole parameter
    /// is dropped. Other parameters keep their value and order.
    ///
    /// ```rust
    /// # use std::collections::BTreeMap;
    /// # use restnote_session::{Credentials, Session};
    /// # use restnote_xml::Namespaces;
    /// let session = Session::new();
    /// session.registry().register("nb", Credentials::new("u", "p"), Namespaces::new(), None)?;
    /// let subs = BTreeMap::from([("x".to_string(), "9".to_string())]);
    /// assert_eq!(
    ///     session.substitute("nb", "http://h/svc?a=1&b={x}&c=2", &subs)?,
    ///     "http://h/svc?a=1&b=9&c=2"
    /// );
    /// assert_eq!(
    ///     session.substitute("nb", "http://h/svc?a=1&b={x}", &BTreeMap::new())?,
    ///     "http://h/svc?a=1"
    /// );
    /// # Ok::<(), restnote_session::SessionError>(())
    /// ```
    pub fn substitute(
        &self,
        name: &str,
        template: &str,
        substitutions: &BTreeMap<String, String>,
    ) -> SessionResult<String> {
        let instance = self.instance(name)?;
        instance.emit(LogEvent::pretty(
            "substituting",
            Payload::Map(substitutions.clone()),
        ));

        let mut url = Url::parse(template).map_err(|source| SessionError::InvalidUrl {
            url: template.to_string(),
            source,
        })?;

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter_map(|(key, value)| match placeholder(&value) {
                Some(name) => substitutions
                    .get(&name)
                    .map(|sub| (key.into_owned(), sub.clone())),
                None => Some((key.into_owned(), value.into_owned())),
            })
            .collect();

        if pairs.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(&pairs);
        }

        let result = url.to_string();
        instance.emit(LogEvent::plain(
            Some("resulting url".to_string()),
            result.as_str(),
        ));
        Ok(result)
    }
}

/// Replace every `(key)` token in `text` with the value for `key`.
///
/// Replacements run in iteration order on the evolving text, so a value
/// that itself contains a `(key)` token may be rewritten by a later entry.
pub fn fill<K, V, I>(text: &str, variables: I) -> String
where
    K: Display,
    V: Display,
    I: IntoIterator<Item = (K, V)>,
{
    variables
        .into_iter()
        .fold(text.to_string(), |text, (key, value)| {
            text.replace(&format!("({key})"), &value.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Credentials;
    use pretty_assertions::assert_eq;
    use restnote_trace::{EventKind, MemoryLogger};
    use restnote_xml::Namespaces;
    use std::sync::Arc;

    fn session() -> (Session, Arc<MemoryLogger>) {
        let session = Session::new();
        let logger = Arc::new(MemoryLogger::new());
        session
            .registry()
            .register("nb", Credentials::new("u", "p"), Namespaces::new(), Some(logger.clone()))
            .unwrap();
        (session, logger)
    }

    fn subs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_substitute_replaces_and_drops() {
        let (session, _) = session();
        assert_eq!(
            session
                .substitute("nb", "http://h/svc?a=1&b={x}&c=2", &subs(&[("x", "9")]))
                .unwrap(),
            "http://h/svc?a=1&b=9&c=2"
        );
        assert_eq!(
            session
                .substitute("nb", "http://h/svc?a=1&b={x}", &subs(&[]))
                .unwrap(),
            "http://h/svc?a=1"
        );
    }

    #[test]
    fn test_optional_placeholders_and_empty_query() {
        let (session, _) = session();
        let template = "http://h/search?q={searchTerms}&start={startIndex?}&num={count?}";
        assert_eq!(
            session
                .substitute("nb", template, &subs(&[("searchTerms", "news at 9"), ("count", "5")]))
                .unwrap(),
            "http://h/search?q=news+at+9&num=5"
        );
        assert_eq!(
            session.substitute("nb", template, &subs(&[])).unwrap(),
            "http://h/search"
        );
    }

    #[test]
    fn test_fixed_parameters_untouched_without_substitutions() {
        let (session, _) = session();
        assert_eq!(
            session
                .substitute("nb", "http://h/p?z=1&a=2&m=3", &subs(&[("z", "x")]))
                .unwrap(),
            "http://h/p?z=1&a=2&m=3"
        );
    }

    #[test]
    fn test_substitute_traces_map_and_result() {
        let (session, logger) = session();
        session
            .substitute("nb", "http://h/?b={x}", &subs(&[("x", "1")]))
            .unwrap();
        assert_eq!(logger.kinds(), vec![EventKind::Pretty, EventKind::Plain]);
        let events = logger.events();
        assert_eq!(events[0].description_text(), "substituting");
        assert_eq!(events[1].description_text(), "resulting url");
        assert_eq!(
            events[1].payload,
            Some(Payload::Text("http://h/?b=1".to_string()))
        );
    }

    #[test]
    fn test_invalid_template() {
        let (session, _) = session();
        assert!(matches!(
            session.substitute("nb", "not a url", &subs(&[])),
            Err(SessionError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_fill_sequential() {
        assert_eq!(
            fill("<id>(id)</id><t>(title)</t>", [("id", "7"), ("title", "News")]),
            "<id>7</id><t>News</t>"
        );
        assert_eq!(fill("(a)", [("a", "(b)"), ("b", "x")]), "x");
        assert_eq!(fill("(n) items", [("n", 3)]), "3 items");
        assert_eq!(fill("untouched", Vec::<(&str, &str)>::new()), "untouched");
    }
}
