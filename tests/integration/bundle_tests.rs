//! Bundle endpoint integration tests.
//!
//! Tests verify:
//! - Archive contents for JSON and form bodies
//! - 204 for empty or fully invalid tile lists
//! - Failed renders are left out of the archive

use std::io::{Cursor, Read};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use bytes::Bytes;

use super::test_utils::{body_bytes, image_dimensions, is_valid_png, TestServer};
use map_render_server::geo::encode_tiles;

fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn entry_names(data: &Bytes) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(data.to_vec())).unwrap();
    archive.file_names().map(String::from).collect()
}

#[tokio::test]
async fn test_bundle_two_tiles() {
    let server = TestServer::start().await;
    let encoded = encode_tiles(&[(5, 10, 12), (5, 11, 12)]);

    let response = server
        .send(json_request(
            "/demo/bundle?format=png",
            serde_json::json!({ "encoded": encoded }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/zip");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"demo.zip\""
    );

    let data = body_bytes(response).await;
    let mut names = entry_names(&data);
    names.sort();
    assert_eq!(names, vec!["z5x10y12.png", "z5x11y12.png"]);

    let mut archive = zip::ZipArchive::new(Cursor::new(data.to_vec())).unwrap();
    let mut tile = Vec::new();
    archive
        .by_name("z5x10y12.png")
        .unwrap()
        .read_to_end(&mut tile)
        .unwrap();
    assert!(is_valid_png(&tile));
    assert_eq!(image_dimensions(&tile), (256, 256));
    assert_eq!(server.stats.renders(), 2);
}

#[tokio::test]
async fn test_bundle_size_and_scale() {
    let server = TestServer::start().await;
    let encoded = encode_tiles(&[(3, 1, 1)]);

    let response = server
        .send(json_request(
            "/demo/bundle?width=128&height=64&scale=2&format=jpg",
            serde_json::json!({ "encoded": [encoded] }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let data = body_bytes(response).await;
    let mut archive = zip::ZipArchive::new(Cursor::new(data.to_vec())).unwrap();
    let mut tile = Vec::new();
    archive
        .by_name("z3x1y1.jpg")
        .unwrap()
        .read_to_end(&mut tile)
        .unwrap();
    assert_eq!(image_dimensions(&tile), (256, 128));
}

#[tokio::test]
async fn test_bundle_form_body() {
    let server = TestServer::start().await;
    let first = encode_tiles(&[(1, 0, 0)]);
    let second = encode_tiles(&[(1, 1, 1)]);
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("encoded", &first)
        .append_pair("encoded", &second)
        .finish();

    let request = Request::builder()
        .method("POST")
        .uri("/demo/bundle")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap();
    let response = server.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let mut names = entry_names(&body_bytes(response).await);
    names.sort();
    assert_eq!(names, vec!["z1x0y0.jpeg", "z1x1y1.jpeg"]);
}

#[tokio::test]
async fn test_bundle_empty() {
    let server = TestServer::start().await;

    let response = server
        .send(json_request("/demo/bundle", serde_json::json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let request = Request::builder()
        .method("POST")
        .uri("/demo/bundle")
        .body(Body::empty())
        .unwrap();
    assert_eq!(server.send(request).await.status(), StatusCode::NO_CONTENT);

    assert_eq!(server.stats.renders(), 0);
}

#[tokio::test]
async fn test_bundle_only_invalid_tiles() {
    let server = TestServer::start().await;
    let encoded = encode_tiles(&[(2, 4, 0), (21, 0, 0)]);

    let response = server
        .send(json_request(
            "/demo/bundle",
            serde_json::json!({ "encoded": [encoded, "!"] }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(server.stats.renders(), 0);
}

#[tokio::test]
async fn test_bundle_failed_renders_are_dropped() {
    let server = TestServer::start().await;
    server.stats.set_failing(true);
    let encoded = encode_tiles(&[(4, 1, 1), (4, 2, 2)]);

    let response = server
        .send(json_request(
            "/demo/bundle?format=png",
            serde_json::json!({ "encoded": encoded }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(entry_names(&body_bytes(response).await).is_empty());
}

#[tokio::test]
async fn test_bundle_unknown_style() {
    let server = TestServer::start().await;
    let response = server
        .send(json_request(
            "/nope/bundle",
            serde_json::json!({ "encoded": encode_tiles(&[(0, 0, 0)]) }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bundle_malformed_json() {
    let server = TestServer::start().await;
    let request = Request::builder()
        .method("POST")
        .uri("/demo/bundle")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ nope"))
        .unwrap();
    assert_eq!(server.send(request).await.status(), StatusCode::BAD_REQUEST);
}
