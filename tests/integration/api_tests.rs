//! API integration tests for tiles, TileJSON and error handling.
//!
//! Tests verify:
//! - Tile retrieval at 256/512 px and scale factors
//! - Conditional requests and cache headers
//! - Error cases (unknown style, out-of-grid tiles, bad format or scale)

use axum::body::Body;
use axum::http::{header, Request, StatusCode};

use super::test_utils::{
    body_bytes, body_json, image_dimensions, is_valid_jpeg, is_valid_png, TestServer,
};
use map_render_server::server::http_date;
use map_render_server::style::ServeOptions;

use super::test_utils::TestOptions;

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let server = TestServer::start().await;
    let response = server.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["styles"], 1);
}

// =============================================================================
// Tiles
// =============================================================================

#[tokio::test]
async fn test_tile_png() {
    let server = TestServer::start().await;
    let response = server.get("/demo/5/10/12.png").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    let style = server.app.styles().get("demo").await.unwrap();
    assert_eq!(
        response.headers()[header::LAST_MODIFIED],
        http_date(style.last_modified()).as_str()
    );
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=3600"
    );

    let body = body_bytes(response).await;
    assert!(is_valid_png(&body));
    assert_eq!(image_dimensions(&body), (256, 256));
    assert_eq!(server.stats.renders(), 1);
}

#[tokio::test]
async fn test_tile_scale_factor() {
    let server = TestServer::start().await;
    let response = server.get("/demo/5/10/12@2x.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (512, 512));
}

#[tokio::test]
async fn test_tile_512() {
    let server = TestServer::start().await;
    let response = server.get("/demo/512/3/2/1.jpg").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");

    let body = body_bytes(response).await;
    assert!(is_valid_jpeg(&body));
    assert_eq!(image_dimensions(&body), (512, 512));
}

#[tokio::test]
async fn test_tile_webp() {
    let server = TestServer::start().await;
    let response = server.get("/demo/0/0/0.webp").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/webp");
}

#[tokio::test]
async fn test_renderers_are_reused() {
    let server = TestServer::start().await;
    for uri in ["/demo/1/0/0.png", "/demo/1/1/0.png", "/demo/1/0/1.png"] {
        assert_eq!(server.get(uri).await.status(), StatusCode::OK);
    }
    assert_eq!(server.stats.renders(), 3);
    assert_eq!(server.stats.created(), 1);
}

#[tokio::test]
async fn test_tile_not_modified() {
    let server = TestServer::start().await;
    let style = server.app.styles().get("demo").await.unwrap();

    let request = Request::builder()
        .uri("/demo/5/10/12.png")
        .header(header::IF_MODIFIED_SINCE, http_date(style.last_modified()))
        .body(Body::empty())
        .unwrap();
    let response = server.send(request).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(server.stats.renders(), 0);

    let request = Request::builder()
        .uri("/demo/5/10/12.png")
        .header(header::IF_MODIFIED_SINCE, http_date(style.last_modified()))
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::empty())
        .unwrap();
    let response = server.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_tile_out_of_bounds() {
    let server = TestServer::start().await;

    for uri in ["/demo/2/4/0.png", "/demo/2/0/4.png", "/demo/23/0/0.png", "/demo/1/-1/0.png"] {
        let response = server.get(uri).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }

    assert_eq!(server.stats.renders(), 0);
    let style = server.app.styles().get("demo").await.unwrap();
    assert!(style.pools().pools().all(|p| p.in_use() == 0));
}

#[tokio::test]
async fn test_unknown_style() {
    let server = TestServer::start().await;
    let response = server.get("/nope/0/0/0.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["error"], "not_found");
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_invalid_format() {
    let server = TestServer::start().await;
    let response = server.get("/demo/0/0/0.gif").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_format");
    assert_eq!(server.stats.renders(), 0);
}

#[tokio::test]
async fn test_unserved_scale() {
    let server = TestServer::start().await;
    let response = server.get("/demo/0/0/0@3x.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_scale");
}

#[tokio::test]
async fn test_malformed_tile_name() {
    let server = TestServer::start().await;
    assert_eq!(
        server.get("/demo/0/0/zero.png").await.status(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        server.get("/demo/0/0/0").await.status(),
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn test_engine_failure_is_server_error() {
    let server = TestServer::start().await;
    server.stats.set_failing(true);

    let response = server.get("/demo/1/0/0.png").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "render_error");

    server.stats.set_failing(false);
    assert_eq!(server.get("/demo/1/0/0.png").await.status(), StatusCode::OK);
}

// =============================================================================
// TileJSON
// =============================================================================

#[tokio::test]
async fn test_tilejson_uses_host() {
    let server = TestServer::start().await;
    let request = Request::builder()
        .uri("/demo.json")
        .header(header::HOST, "maps.test")
        .body(Body::empty())
        .unwrap();
    let response = server.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["tiles"][0], "http://maps.test/demo/{z}/{x}/{y}.png");
    assert_eq!(json["name"], "Demo");
}

#[tokio::test]
async fn test_tilejson_public_url() {
    let server = TestServer::start_with(TestOptions {
        serve: ServeOptions {
            public_url: Some("https://cdn.test/maps/".to_string()),
            ..ServeOptions::default()
        },
        ..TestOptions::default()
    })
    .await;

    let json = body_json(server.get("/demo.json").await).await;
    assert_eq!(json["tiles"][0], "https://cdn.test/maps/demo/{z}/{x}/{y}.png");
}

#[tokio::test]
async fn test_tilejson_unknown() {
    let server = TestServer::start().await;
    assert_eq!(server.get("/nope.json").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.get("/demo").await.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn test_cors_headers() {
    let server = TestServer::start().await;
    let request = Request::builder()
        .uri("/demo/0/0/0.png")
        .header(header::ORIGIN, "https://example.com")
        .body(Body::empty())
        .unwrap();
    let response = server.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
