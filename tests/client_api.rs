#![cfg(feature = "upload")]
//! Integration tests for the Presentator client against a local fixture server.

use pagestitch::client::PresentatorClient;
use pagestitch::Error;
use std::io::Read;
use tiny_http::{Header, Response, Server};

/// Start a minimal fake Presentator server and return its base URL.
fn start_fixture() -> String {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr();

    std::thread::spawn(move || {
        let json = |body: &str| {
            Response::from_string(body).with_header(
                "Content-Type: application/json"
                    .parse::<Header>()
                    .unwrap(),
            )
        };

        for mut request in server.incoming_requests() {
            let url = request.url().to_string();
            let response = if url == "/api/collections/users/auth-with-password" {
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                if body.contains("\"password\":\"secret\"") {
                    json(r#"{"token":"tok123","record":{"id":"u1","email":"designer@example.com"}}"#)
                } else {
                    json(r#"{"message":"Failed to authenticate."}"#).with_status_code(400)
                }
            } else if url == "/api/collections/projects/records" {
                if bearer_token(&request) == Some("tok123".to_string()) {
                    json(r#"{"items":[{"id":"p1","title":"Site"},{"id":"p2","title":"App"}]}"#)
                } else {
                    json(r#"{"message":"Missing or invalid token."}"#).with_status_code(401)
                }
            } else if url.starts_with("/api/collections/prototypes/records") {
                // The filter must arrive URL-encoded: (project="p1")
                if url.contains("filter=%28project%3D%22p1%22%29") {
                    json(r#"{"items":[{"id":"pr1","title":"Desktop"}]}"#)
                } else {
                    json(r#"{"items":[]}"#)
                }
            } else if url == "/api/collections/screens/records" {
                let multipart = request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Content-Type"))
                    .map(|h| h.value.as_str().starts_with("multipart/form-data"))
                    .unwrap_or(false);
                if multipart {
                    json(r#"{"id":"s1","title":"Screenshot-1"}"#)
                } else {
                    json(r#"{"message":"Expected multipart form data."}"#).with_status_code(400)
                }
            } else {
                Response::from_string("Not Found").with_status_code(404)
            };
            let _ = request.respond(response);
        }
    });

    format!("http://{}", addr)
}

fn bearer_token(request: &tiny_http::Request) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv("Authorization"))
        .and_then(|h| h.value.as_str().strip_prefix("Bearer ").map(str::to_string))
}

#[test]
fn authenticates_and_lists_projects() {
    let base = start_fixture();
    let client = PresentatorClient::new(&base).unwrap();

    let session = client.authenticate("designer@example.com", "secret").unwrap();
    assert_eq!(session.token, "tok123");
    assert_eq!(session.user.email, "designer@example.com");

    let projects = client.list_projects(&session).unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].id, "p1");
    assert_eq!(projects[1].title, "App");
}

#[test]
fn surfaces_the_server_error_message_on_bad_credentials() {
    let base = start_fixture();
    let client = PresentatorClient::new(&base).unwrap();

    let err = client
        .authenticate("designer@example.com", "wrong")
        .unwrap_err();
    match err {
        Error::AuthFailed(msg) => assert!(msg.contains("Failed to authenticate")),
        other => panic!("expected AuthFailed, got {:?}", other),
    }
}

#[test]
fn prototype_listing_sends_an_encoded_filter() {
    let base = start_fixture();
    let client = PresentatorClient::new(&base).unwrap();
    let session = client.authenticate("designer@example.com", "secret").unwrap();

    let prototypes = client.list_prototypes(&session, "p1").unwrap();
    assert_eq!(prototypes.len(), 1);
    assert_eq!(prototypes[0].title, "Desktop");

    // A different project id misses the fixture's filter and comes back empty.
    assert!(client.list_prototypes(&session, "p9").unwrap().is_empty());
}

#[test]
fn uploads_a_screen_as_multipart() {
    let base = start_fixture();
    let client = PresentatorClient::new(&base).unwrap();
    let session = client.authenticate("designer@example.com", "secret").unwrap();

    let png = vec![0x89, b'P', b'N', b'G', 0, 0, 0, 0];
    let screen = client
        .upload_screen(&session, "pr1", "Screenshot-1", png)
        .unwrap();
    assert_eq!(screen.id, "s1");
}
