//! Bounded pool of renderers for one style, mode and scale factor.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::engine::{RawImage, RenderParams, Renderer, RendererContext, RendererFactory};
use crate::error::{EngineError, PoolError};

// =============================================================================
// Renderer Pool
// =============================================================================

/// A bounded set of renderers that hands each one to a single owner at a time.
///
/// A semaphore with `max` permits bounds the number of renderers in use.
/// Idle renderers sit in a mutex-guarded list; the lock is only held to push
/// or pop, never across an await. A renderer is created outside the lock when
/// a permit is obtained and the idle list is empty.
///
/// # Thread Safety
///
/// The pool is cheap to clone and can be shared across tasks.
#[derive(Clone)]
pub struct RendererPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    /// Label used in logs, e.g. `basic/tile@2x`
    name: String,

    factory: Arc<dyn RendererFactory>,
    ctx: RendererContext,

    /// Bounds concurrently outstanding renderers
    permits: Arc<Semaphore>,

    /// Renderers not currently leased
    idle: Mutex<Vec<Box<dyn Renderer>>>,

    /// Number of live leases
    outstanding: AtomicUsize,

    /// Signalled whenever the last lease is returned
    returned: Notify,

    closed: AtomicBool,
    min: usize,
    max: usize,
}

impl PoolInner {
    fn idle(&self) -> MutexGuard<'_, Vec<Box<dyn Renderer>>> {
        // A panic while holding the lock cannot leave the Vec inconsistent
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RendererPool {
    /// Create an empty pool. Call [`RendererPool::warm`] to pre-create renderers.
    pub fn new(
        factory: Arc<dyn RendererFactory>,
        ctx: RendererContext,
        min: usize,
        max: usize,
    ) -> Self {
        let max = max.max(min).max(1);
        let name = format!("{}/{}@{}x", ctx.style_id, ctx.mode.as_str(), ctx.ratio);
        Self {
            inner: Arc::new(PoolInner {
                name,
                factory,
                ctx,
                permits: Arc::new(Semaphore::new(max)),
                idle: Mutex::new(Vec::with_capacity(max)),
                outstanding: AtomicUsize::new(0),
                returned: Notify::new(),
                closed: AtomicBool::new(false),
                min,
                max,
            }),
        }
    }

    /// Pre-create `min` renderers.
    ///
    /// Creation failures are logged; the pool then grows on demand instead.
    pub async fn warm(&self) {
        let missing = self.inner.min.saturating_sub(self.idle_count());
        if missing == 0 {
            return;
        }

        let results = join_all(
            (0..missing).map(|_| self.inner.factory.create(self.inner.ctx.clone())),
        )
        .await;

        let mut created = 0;
        let mut idle = self.inner.idle();
        for result in results {
            match result {
                Ok(renderer) if idle.len() < self.inner.max => {
                    idle.push(renderer);
                    created += 1;
                }
                Ok(_) => {}
                Err(e) => warn!(pool = %self.inner.name, error = %e, "Failed to pre-create renderer"),
            }
        }
        debug!(pool = %self.inner.name, created, "Warmed renderer pool");
    }

    /// Lease a renderer, waiting while `max` renderers are in use.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Closed`] if the pool is drained before a renderer frees up
    /// - [`PoolError::Create`] if a new renderer had to be created and creation
    ///   failed; the slot is returned so other waiters are unaffected
    pub async fn acquire(&self) -> Result<PooledRenderer, PoolError> {
        let permit = self
            .inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        // Counted as outstanding before the closed check, so a drain either
        // waits for this lease or is seen here
        let mut lease = PooledRenderer::new(self.inner.clone(), permit);
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }

        let idle = self.inner.idle().pop();
        let renderer = match idle {
            Some(renderer) => renderer,
            None => {
                debug!(pool = %self.inner.name, "Creating renderer");
                self.inner
                    .factory
                    .create(self.inner.ctx.clone())
                    .await
                    .map_err(PoolError::Create)?
            }
        };

        lease.renderer = Some(renderer);
        Ok(lease)
    }

    /// Close the pool and destroy every renderer.
    ///
    /// Waiting and future acquires fail with [`PoolError::Closed`]. Returns
    /// once every leased renderer has come back.
    pub async fn drain_and_close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.permits.close();

        loop {
            // Created before the check so a concurrent return is not missed
            let returned = self.inner.returned.notified();
            if self.inner.outstanding.load(Ordering::SeqCst) == 0 {
                break;
            }
            returned.await;
        }

        let destroyed = std::mem::take(&mut *self.inner.idle());
        info!(pool = %self.inner.name, destroyed = destroyed.len(), "Closed renderer pool");
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn min(&self) -> usize {
        self.inner.min
    }

    pub fn max(&self) -> usize {
        self.inner.max
    }

    pub fn idle_count(&self) -> usize {
        self.inner.idle().len()
    }

    /// Renderers currently leased.
    pub fn in_use(&self) -> usize {
        self.inner.outstanding.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }
}

// =============================================================================
// Lease
// =============================================================================

/// Exclusive lease on a pooled renderer.
///
/// Dropping the lease returns the renderer to the pool exactly once,
/// whatever path the owner leaves by (success, error, panic or cancellation).
pub struct PooledRenderer {
    renderer: Option<Box<dyn Renderer>>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl PooledRenderer {
    fn new(pool: Arc<PoolInner>, permit: OwnedSemaphorePermit) -> Self {
        pool.outstanding.fetch_add(1, Ordering::SeqCst);
        Self {
            renderer: None,
            pool,
            _permit: permit,
        }
    }

    /// Render with the leased renderer.
    pub async fn render(&mut self, params: &RenderParams) -> Result<RawImage, EngineError> {
        match self.renderer.as_mut() {
            Some(renderer) => renderer.render(params).await,
            None => Err(EngineError::Render {
                message: "renderer lease is empty".to_string(),
            }),
        }
    }
}

impl Drop for PooledRenderer {
    fn drop(&mut self) {
        if let Some(renderer) = self.renderer.take() {
            if !self.pool.closed.load(Ordering::Acquire) {
                self.pool.idle().push(renderer);
            }
        }
        if self.pool.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.pool.returned.notify_waiters();
        }
        // The permit is released after this, once the renderer is back in the idle list
    }
}
