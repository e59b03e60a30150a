//! Static map integration tests.
//!
//! Tests verify:
//! - Center, bounding-box, auto and projected positioning
//! - Overlay compositing with markers and paths
//! - Validation errors before any renderer is used
//! - The legacy `staticmap` redirect

use axum::http::{header, StatusCode};

use super::test_utils::{body_bytes, body_json, image_dimensions, TestOptions, TestServer};
use map_render_server::style::ServeOptions;

#[tokio::test]
async fn test_static_center() {
    let server = TestServer::start().await;
    let response = server.get("/demo/static/8.5,47.3,10/300x200.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(image_dimensions(&body_bytes(response).await), (300, 200));
}

#[tokio::test]
async fn test_static_center_with_camera_and_scale() {
    let server = TestServer::start().await;
    let response = server
        .get("/demo/static/8.5,47.3,10@30,20/300x200@2x.jpg")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (600, 400));
}

#[tokio::test]
async fn test_static_bounds() {
    let server = TestServer::start().await;
    let response = server.get("/demo/static/5,45,10,48/400x300.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (400, 300));
}

#[tokio::test]
async fn test_static_auto_without_coordinates() {
    let server = TestServer::start().await;
    let response = server.get("/demo/static/auto/300x200.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "no_coordinates");
    assert_eq!(server.stats.renders(), 0);
}

#[tokio::test]
async fn test_static_auto_with_path() {
    let server = TestServer::start().await;
    let response = server
        .get("/demo/static/auto/300x200.png?path=8.5,47.3%7C8.6,47.4&stroke=red&width=3")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let image = image::load_from_memory(&body_bytes(response).await)
        .unwrap()
        .to_rgba8();
    assert_eq!(image.dimensions(), (300, 200));

    // The path runs through the center of the fitted view
    let center = image.get_pixel(150, 100);
    assert!(center[0] > 200, "expected a red stroke, got {:?}", center);
}

#[tokio::test]
async fn test_static_marker_from_icons_dir() {
    let server = TestServer::start().await;
    let response = server
        .get("/demo/static/8.5,47.3,10/100x100.png?marker=8.5,47.3%7Cpin.png%7Canchor:center")
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let image = image::load_from_memory(&body_bytes(response).await)
        .unwrap()
        .to_rgba8();
    assert_eq!(image.get_pixel(50, 50).0, [255, 0, 0, 255]);
    assert_eq!(image.get_pixel(5, 5).0, [0, 128, 255, 255]);
}

#[tokio::test]
async fn test_static_raw_mercator() {
    let server = TestServer::start().await;
    let response = server
        .get("/demo/static/raw/946000,5988000,10/200x200.png")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_static_query_bbox() {
    let server = TestServer::start().await;
    let response = server
        .get("/demo/static?bbox=556597,5621521,1113194,6106854&width=512&height=256&scale=2&format=image/jpeg")
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
    assert_eq!(image_dimensions(&body_bytes(response).await), (512, 256));
}

#[tokio::test]
async fn test_static_query_requires_bbox() {
    let server = TestServer::start().await;
    let response = server.get("/demo/static?width=256").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_static_validation() {
    let server = TestServer::start().await;

    // Latitude beyond the mercator limit
    let response = server.get("/demo/static/0,89,3/100x100.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_center");

    // Larger than maxSize
    let response = server.get("/demo/static/0,0,3/2000x100@2x.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "invalid_size");

    let response = server.get("/demo/static/0,0,3/0x100.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server.get("/demo/static/0,0,-1/100x100.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = server.get("/demo/static/0,0/100x100.png").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(server.stats.renders(), 0);
}

#[tokio::test]
async fn test_static_unknown_style() {
    let server = TestServer::start().await;
    let response = server.get("/nope/static/0,0,3/100x100.png").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_maps_disabled() {
    let server = TestServer::start_with(TestOptions {
        serve: ServeOptions {
            serve_static_maps: false,
            ..ServeOptions::default()
        },
        ..TestOptions::default()
    })
    .await;

    let response = server.get("/demo/static/8.5,47.3,10/300x200.png").await;
    assert_ne!(response.status(), StatusCode::OK);
    assert_eq!(server.stats.renders(), 0);

    // Tiles are unaffected
    assert_eq!(server.get("/demo/0/0/0.png").await.status(), StatusCode::OK);
}

// =============================================================================
// Legacy staticmap
// =============================================================================

#[tokio::test]
async fn test_staticmap_redirect() {
    let server = TestServer::start().await;
    let response = server
        .get("/demo/staticmap?size=300x200&center=47.3,8.5&zoom=10&markers=icon:pin.png%7C47.3,8.5")
        .await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.starts_with("/demo/static/8.5,47.3,10/300x200.png?"));
    assert!(location.contains("latlng=1"));

    // The target is servable
    let response = server.get(location).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (300, 200));
}

#[tokio::test]
async fn test_staticmap_unknown_style() {
    let server = TestServer::start().await;
    let response = server.get("/nope/staticmap?size=100x100").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
