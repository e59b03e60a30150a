//! Renderer pool behavior under HTTP load.
//!
//! Tests verify:
//! - Concurrent renders never exceed a pool's maximum
//! - Removing a style waits for in-flight renders, then rejects new ones
//! - Tile margins route tiles through the static pool

use std::time::Duration;

use axum::http::StatusCode;
use futures::future::join_all;

use super::test_utils::{body_bytes, image_dimensions, CountingFactory, TestOptions, TestServer};
use map_render_server::engine::RenderMode;
use map_render_server::pool::PoolSizes;
use map_render_server::render::RenderService;

#[tokio::test]
async fn test_concurrency_bounded_by_pool_max() {
    let server = TestServer::start_with(TestOptions {
        factory: CountingFactory::new().with_delay(Duration::from_millis(20)),
        pool_sizes: PoolSizes::new(vec![0], vec![2]),
        ..TestOptions::default()
    })
    .await;

    let uris: Vec<String> = (0..8).map(|x| format!("/demo/3/{}/0.png", x)).collect();
    let responses = join_all(uris.iter().map(|uri| server.get(uri))).await;
    assert!(responses.iter().all(|r| r.status() == StatusCode::OK));

    assert_eq!(server.stats.renders(), 8);
    assert!(server.stats.peak_active() <= 2);
    assert!(server.stats.created() <= 2);

    let style = server.app.styles().get("demo").await.unwrap();
    let pool = style.pools().get(RenderMode::Tile, 1).unwrap();
    assert_eq!(pool.in_use(), 0);
}

#[tokio::test]
async fn test_warm_pools_on_register() {
    let server = TestServer::start_with(TestOptions {
        pool_sizes: PoolSizes::new(vec![1], vec![2]),
        max_scale: 2,
        ..TestOptions::default()
    })
    .await;

    // One warm renderer per mode and scale factor
    assert_eq!(server.stats.created(), 4);

    assert_eq!(server.get("/demo/0/0/0.png").await.status(), StatusCode::OK);
    assert_eq!(server.stats.created(), 4);
}

#[tokio::test]
async fn test_remove_style_drains_in_flight() {
    let server = TestServer::start_with(TestOptions {
        factory: CountingFactory::new().with_delay(Duration::from_millis(50)),
        ..TestOptions::default()
    })
    .await;

    let style = server.app.styles().get("demo").await.unwrap();
    let in_flight = server.get("/demo/2/1/1.png");
    let remove = async {
        // Let the render acquire its renderer first
        tokio::time::sleep(Duration::from_millis(10)).await;
        server.app.styles().remove("demo").await
    };

    let (response, removed) = tokio::join!(in_flight, remove);
    assert!(removed);
    assert_eq!(response.status(), StatusCode::OK);
    assert!(style.pools().pools().all(|p| p.is_closed() && p.in_use() == 0));

    assert_eq!(
        server.get("/demo/2/1/1.png").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_shutdown_closes_every_pool() {
    let server = TestServer::start().await;
    let style = server.app.styles().get("demo").await.unwrap();

    server.app.shutdown().await;
    assert!(server.app.styles().is_empty().await);
    assert!(style.pools().pools().all(|p| p.is_closed()));
}

#[tokio::test]
async fn test_tile_margin_uses_static_pool() {
    let server = TestServer::start_with(TestOptions {
        renderer: RenderService::new().with_tile_margin(16),
        ..TestOptions::default()
    })
    .await;

    let response = server.get("/demo/5/10/12.png").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(image_dimensions(&body_bytes(response).await), (256, 256));

    let style = server.app.styles().get("demo").await.unwrap();
    assert_eq!(style.pools().get(RenderMode::Tile, 1).unwrap().idle_count(), 0);
    assert_eq!(style.pools().get(RenderMode::Static, 1).unwrap().idle_count(), 1);
}
