//! Tests for response decoding

use super::*;
use serde::Deserialize;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct User {
    id: u64,
    name: String,
}

async fn respond(body: ResponseTemplate) -> (MockServer, Response) {
    let server = MockServer::start().await;
    Mock::given(path("/body"))
        .respond_with(body)
        .mount(&server)
        .await;
    let response = reqwest::get(format!("{}/body", server.uri())).await.unwrap();
    (server, response)
}

#[tokio::test]
async fn test_decode_bytes() {
    let (_server, response) = respond(ResponseTemplate::new(200).set_body_string("hello")).await;
    let body = decode_bytes(response).await.unwrap();
    assert_eq!(&body[..], b"hello");
}

#[tokio::test]
async fn test_decode_json() {
    let (_server, response) = respond(
        ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1, "name": "Alice"})),
    )
    .await;
    let user: User = decode_json(response).await.unwrap();
    assert_eq!(
        user,
        User {
            id: 1,
            name: "Alice".to_string()
        }
    );
}

#[tokio::test]
async fn test_decode_json_ignores_status() {
    let (_server, response) = respond(
        ResponseTemplate::new(404).set_body_json(serde_json::json!({"id": 7, "name": "missing"})),
    )
    .await;
    let user: User = decode_json(response).await.unwrap();
    assert_eq!(user.id, 7);
}

#[tokio::test]
async fn test_decode_json_invalid_body() {
    let (_server, response) = respond(ResponseTemplate::new(200).set_body_string("not json")).await;
    let err = decode_json::<User>(response).await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert!(err.to_string().contains("error deserializing response body"));
}

#[tokio::test]
async fn test_decode_bytes_limited() {
    let (_server, response) = respond(ResponseTemplate::new(200).set_body_string("0123456789")).await;
    assert_eq!(&decode_bytes_limited(response, 10).await.unwrap()[..], b"0123456789");

    let (_server, response) = respond(ResponseTemplate::new(200).set_body_string("0123456789")).await;
    let err = decode_bytes_limited(response, 4).await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
}
