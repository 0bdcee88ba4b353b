use std::time::Duration;

use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;
use crate::config::ClientTimeouts;

fn transport(server: &MockServer) -> HttpTransport {
    let config = ClientConfig::with_base_url(&server.uri()).unwrap();
    HttpTransport::new(&config).unwrap()
}

#[tokio::test]
async fn sends_json_body_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(header("Authorization", "Bearer abc"))
        .and(body_json(serde_json::json!({"username": "alice", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "jwt"})))
        .expect(1)
        .mount(&server)
        .await;

    let request = ApiRequest::post("/auth/login")
        .header("Authorization", "Bearer abc")
        .json(&serde_json::json!({"username": "alice", "password": "pw"}))
        .unwrap();
    let response = transport(&server).send(request).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.json::<serde_json::Value>().unwrap()["token"], "jwt");
}

#[tokio::test]
async fn error_statuses_are_responses_not_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({"message": "expired"})))
        .mount(&server)
        .await;

    let response = transport(&server).send(ApiRequest::get("/users/me")).await.unwrap();

    assert_eq!(response.status, 401);
}

#[tokio::test]
async fn query_pairs_are_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/notes/search"))
        .and(query_param("query", "rust & go"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let request = ApiRequest::get("/notes/search").query("query", "rust & go");
    let response = transport(&server).send(request).await.unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn multipart_body_reaches_server() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/notes"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let request = ApiRequest::post("/notes").multipart(vec![
        FormPart::Text { name: "title".to_owned(), value: "Lecture".to_owned() },
        FormPart::File {
            name: "images".to_owned(),
            file_name: "a.png".to_owned(),
            content_type: "image/png".to_owned(),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        },
    ]);
    let response = transport(&server).send(request).await.unwrap();

    assert_eq!(response.status, 201);
    let received = server.received_requests().await.unwrap();
    let content_type = received[0].headers.get("content-type").unwrap().to_str().unwrap().to_owned();
    assert!(content_type.starts_with("multipart/form-data"));
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.contains("name=\"title\""));
    assert!(body.contains("filename=\"a.png\""));
}

#[tokio::test]
async fn invalid_content_type_is_invalid_request() {
    let server = MockServer::start().await;
    let request = ApiRequest::post("/notes").multipart(vec![FormPart::File {
        name: "images".to_owned(),
        file_name: "a.png".to_owned(),
        content_type: "not a mime".to_owned(),
        bytes: vec![],
    }]);

    let err = transport(&server).send(request).await.unwrap_err();

    assert!(matches!(err, TransportError::InvalidRequest(_)));
}

#[tokio::test]
async fn slow_response_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let request = ApiRequest::get("/health").timeout(Duration::from_millis(100));
    let err = transport(&server).send(request).await.unwrap_err();

    assert_eq!(err, TransportError::TimedOut);
}

#[tokio::test]
async fn refused_connection_is_unreachable() {
    let mut config = ClientConfig::with_base_url("http://127.0.0.1:9").unwrap();
    config.timeouts = ClientTimeouts { request_secs: 2, connect_secs: 1 };
    let transport = HttpTransport::new(&config).unwrap();

    let err = transport.send(ApiRequest::get("/health")).await.unwrap_err();

    assert!(matches!(err, TransportError::Unreachable(_) | TransportError::TimedOut));
}

#[tokio::test]
async fn session_login_end_to_end() {
    use crate::{Gateway, NotexApi, SessionStore, TokenHolder};

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"token": "jwt"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("Authorization", "Bearer jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(crate::net::testing::identity_json("alice")))
        .mount(&server)
        .await;

    let session = SessionStore::new(NotexApi::new(Gateway::new(transport(&server), TokenHolder::in_memory())));
    let identity = session.login("alice", "pw").await.unwrap();

    assert_eq!(identity.username, "alice");
    assert!(session.is_authenticated());
}
