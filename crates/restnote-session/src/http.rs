//! Instrumented HTTP verbs.
//!
//! Every call produces the same trace sequence:
//!
//! 1. `"{METHOD} >>> {url}"` with the request headers, pretty-printed
//! 2. PUT/POST only: the request body in wire form, as XML
//! 3. `"{METHOD} <<< [{status}]"` with the response headers, pretty-printed
//! 4. the response body, as XML when the content type mentions `xml`,
//!    untyped otherwise
//!
//! The response is materialized before it is traced, so tracing the body
//! never takes anything away from the caller.

use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use reqwest::{Method, StatusCode};
use restnote_trace::{LogEvent, Payload};
use restnote_xml::Document;
use tracing::debug;

use crate::error::SessionResult;
use crate::session::Session;

/// Request headers.
pub type Headers = BTreeMap<String, String>;

/// Request data for PUT and POST.
#[derive(Debug, Clone)]
pub enum Body {
    /// Text, sent as UTF-8
    Text(String),
    /// Raw bytes
    Bytes(Bytes),
    /// An XML document, serialized before it is traced and sent
    Xml(Document),
}

impl Body {
    /// The bytes that go on the wire.
    pub fn into_wire(self) -> Bytes {
        match self {
            Self::Text(text) => Bytes::from(text),
            Self::Bytes(bytes) => bytes,
            Self::Xml(doc) => Bytes::from(doc.to_xml_string()),
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Document> for Body {
    fn from(doc: Document) -> Self {
        Self::Xml(doc)
    }
}

impl From<&Document> for Body {
    fn from(doc: &Document) -> Self {
        Self::Xml(doc.clone())
    }
}

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body
    pub body: Bytes,
    /// Final URL after redirects
    pub url: String,
}

impl HttpResponse {
    /// Declared content type, empty when absent.
    pub fn content_type(&self) -> &str {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    /// Whether the declared content type mentions XML.
    pub fn is_xml(&self) -> bool {
        self.content_type().contains("xml")
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as an XML document, in the encoding it declares.
    pub fn xml(&self) -> SessionResult<Document> {
        Ok(Document::parse_bytes(&self.body)?)
    }

    /// Headers as a sorted string map; repeated headers are joined.
    pub fn header_map(&self) -> Headers {
        header_map(&self.headers)
    }
}

fn header_map(headers: &HeaderMap) -> Headers {
    let mut map = Headers::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        map.entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    map
}

impl Session {
    /// GET `url`, optionally with an `accept` header.
    pub async fn get(
        &self,
        name: &str,
        url: &str,
        accept: Option<&str>,
        headers: &Headers,
    ) -> SessionResult<HttpResponse> {
        let mut headers = headers.clone();
        if let Some(accept) = accept {
            headers.insert("accept".to_string(), accept.to_string());
        }
        self.send(name, Method::GET, url, headers, None).await
    }

    /// PUT `data` to `url`.
    pub async fn put(
        &self,
        name: &str,
        url: &str,
        data: impl Into<Body>,
        content_type: &str,
        headers: &Headers,
    ) -> SessionResult<HttpResponse> {
        let mut headers = headers.clone();
        headers.insert("content-type".to_string(), content_type.to_string());
        self.send(name, Method::PUT, url, headers, Some(data.into()))
            .await
    }

    /// POST `data` to `url`.
    pub async fn post(
        &self,
        name: &str,
        url: &str,
        data: impl Into<Body>,
        content_type: &str,
        headers: &Headers,
    ) -> SessionResult<HttpResponse> {
        let mut headers = headers.clone();
        headers.insert("content-type".to_string(), content_type.to_string());
        self.send(name, Method::POST, url, headers, Some(data.into()))
            .await
    }

    /// DELETE `url`.
    pub async fn delete(
        &self,
        name: &str,
        url: &str,
        headers: &Headers,
    ) -> SessionResult<HttpResponse> {
        self.send(name, Method::DELETE, url, headers.clone(), None)
            .await
    }

    async fn send(
        &self,
        name: &str,
        method: Method,
        url: &str,
        headers: Headers,
        body: Option<Body>,
    ) -> SessionResult<HttpResponse> {
        let instance = self.instance(name)?;

        instance.emit(LogEvent::pretty(
            format!("{method} >>> {url}"),
            Payload::Map(headers.clone()),
        ));

        let credentials = instance.credentials();
        let mut request = instance
            .client()
            .request(method.clone(), url)
            .basic_auth(&credentials.user, Some(&credentials.password));
        for (key, value) in &headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(body) = body {
            let wire = body.into_wire();
            instance.emit(LogEvent::xml(None, Payload::Bytes(wire.clone())));
            request = request.body(wire);
        }

        debug!(instance = %name, %method, %url, "Sending request");
        let response = request.send().await?;
        let status = response.status();
        let response_headers = response.headers().clone();
        let final_url = response.url().to_string();
        let body = response.bytes().await?;
        debug!(instance = %name, %method, %url, status = status.as_u16(), bytes = body.len(), "Received response");

        let response = HttpResponse {
            status,
            headers: response_headers,
            body,
            url: final_url,
        };

        instance.emit(LogEvent::pretty(
            format!("{method} <<< [{}]", status.as_u16()),
            Payload::Map(response.header_map()),
        ));
        let body = Payload::Bytes(response.body.clone());
        instance.emit(if response.is_xml() {
            LogEvent::xml(None, body)
        } else {
            LogEvent::plain(None, body)
        });

        Ok(response)
    }
}
