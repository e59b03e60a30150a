//! HTTP server layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │   GET /{style}/{z}/{x}/{y}.png    GET /{style}/static/...       │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────────┐  │
//! │  │  handlers   │  │   query /   │  │        routes           │  │
//! │  │ (requests)  │  │   legacy    │  │  (router config)        │  │
//! │  └─────────────┘  └─────────────┘  └─────────────────────────┘  │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              ▼
//!              AppContext: StyleRegistry + RenderService
//! ```

pub mod handlers;
pub mod legacy;
pub mod query;
pub mod routes;

pub use handlers::{
    bundle_handler, health_handler, http_date, is_not_modified, static_handler,
    static_query_handler, static_raw_handler, staticmap_handler, tile_512_handler, tile_handler,
    tilejson_handler, AppState, ErrorResponse, HandlerError, HealthResponse, MAX_TILE_ZOOM,
};
pub use legacy::translate_staticmap;
pub use routes::{create_router, RouterConfig};
