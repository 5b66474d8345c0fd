//! Instrumented HTTP against a mock REST+XML service.

use std::sync::Arc;

use bytes::Bytes;
use pretty_assertions::assert_eq;
use restnote_session::{Credentials, Headers, Session, SessionError};
use restnote_trace::{EventKind, MemoryLogger, Payload};
use restnote_xml::{Document, Namespaces};
use wiremock::matchers::{basic_auth, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FEED: &str = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><id>1</id><title>Intro</title></entry></feed>"#;

fn session(logger: Option<Arc<MemoryLogger>>) -> Session {
    let session = Session::new();
    session
        .registry()
        .register(
            "nb",
            Credentials::new("admin", "secret"),
            Namespaces::from_pairs([("atom", "http://www.w3.org/2005/Atom")]),
            logger.map(|l| l as Arc<dyn restnote_trace::Logger>),
        )
        .unwrap();
    session
}

fn payload_text(payload: &Option<Payload>) -> String {
    payload.as_ref().map(Payload::to_text).unwrap_or_default()
}

#[tokio::test]
async fn get_traces_request_response_and_xml_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/assets"))
        .and(basic_auth("admin", "secret"))
        .and(header("accept", "application/atom+xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(FEED, "application/atom+xml;type=feed")
                .insert_header("x-request-id", "r1"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let logger = Arc::new(MemoryLogger::new());
    let session = session(Some(logger.clone()));
    let url = format!("{}/assets", server.uri());
    let response = session
        .get("nb", &url, Some("application/atom+xml"), &Headers::new())
        .await
        .unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.text(), FEED);

    let events = logger.events();
    assert_eq!(
        logger.kinds(),
        vec![EventKind::Pretty, EventKind::Pretty, EventKind::Xml]
    );
    assert_eq!(events[0].description_text(), format!("GET >>> {url}"));
    assert_eq!(
        events[0].payload,
        Some(Payload::Map(Headers::from([(
            "accept".to_string(),
            "application/atom+xml".to_string()
        )])))
    );
    assert_eq!(events[1].description_text(), "GET <<< [200]");
    match &events[1].payload {
        Some(Payload::Map(headers)) => assert_eq!(headers["x-request-id"], "r1"),
        other => panic!("unexpected payload {other:?}"),
    }
    assert_eq!(events[2].description, None);
    assert_eq!(payload_text(&events[2].payload), FEED);

    let doc = response.xml().unwrap();
    let id = session
        .resolve_text("nb", &doc, doc.document_node(), "/atom:feed/atom:entry/atom:id")
        .unwrap();
    assert_eq!(id.as_deref(), Some("1"));
}

#[tokio::test]
async fn non_xml_body_is_traced_untyped_and_errors_are_returned() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/assets/9"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such asset"))
        .mount(&server)
        .await;

    let logger = Arc::new(MemoryLogger::new());
    let session = session(Some(logger.clone()));
    let url = format!("{}/assets/9", server.uri());
    let response = session.delete("nb", &url, &Headers::new()).await.unwrap();

    assert_eq!(response.status.as_u16(), 404);
    let events = logger.events();
    assert_eq!(events[0].description_text(), format!("DELETE >>> {url}"));
    assert_eq!(events[1].description_text(), "DELETE <<< [404]");
    assert_eq!(events[2].kind, EventKind::Plain);
    assert_eq!(payload_text(&events[2].payload), "no such asset");
}

#[tokio::test]
async fn put_sends_exactly_what_it_traces() {
    let server = MockServer::start().await;
    let doc = Document::parse(r#"<entry xmlns="http://www.w3.org/2005/Atom"><title>New &amp; shiny</title></entry>"#).unwrap();
    let wire = doc.to_xml_string();

    Mock::given(method("PUT"))
        .and(path("/assets/1"))
        .and(header("content-type", "application/atom+xml"))
        .and(header("if-match", "*"))
        .and(body_string(wire.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_raw(wire.clone(), "application/atom+xml"))
        .expect(1)
        .mount(&server)
        .await;

    let logger = Arc::new(MemoryLogger::new());
    let session = session(Some(logger.clone()));
    let url = format!("{}/assets/1", server.uri());
    let headers = Headers::from([("if-match".to_string(), "*".to_string())]);
    session
        .put("nb", &url, &doc, "application/atom+xml", &headers)
        .await
        .unwrap();

    let events = logger.events();
    assert_eq!(
        logger.kinds(),
        vec![
            EventKind::Pretty,
            EventKind::Xml,
            EventKind::Pretty,
            EventKind::Xml
        ]
    );
    match &events[0].payload {
        Some(Payload::Map(sent)) => {
            assert_eq!(sent["content-type"], "application/atom+xml");
            assert_eq!(sent["if-match"], "*");
        }
        other => panic!("unexpected payload {other:?}"),
    }
    assert_eq!(events[1].payload, Some(Payload::Bytes(Bytes::from(wire))));
}

#[tokio::test]
async fn post_text_body_without_logger() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/jobs"))
        .and(body_string("start"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let session = session(None);
    let response = session
        .post(
            "nb",
            &format!("{}/jobs", server.uri()),
            "start",
            "text/plain",
            &Headers::new(),
        )
        .await
        .unwrap();
    assert_eq!(response.status.as_u16(), 201);
    assert!(response.body.is_empty());
}

#[tokio::test]
async fn unknown_instance_and_transport_failures_surface() {
    let session = session(None);
    assert!(matches!(
        session.get("prod", "http://127.0.0.1:1/", None, &Headers::new()).await,
        Err(SessionError::NotFound { .. })
    ));
    assert!(matches!(
        session.get("nb", "http://127.0.0.1:1/", None, &Headers::new()).await,
        Err(SessionError::Http(_))
    ));
}
