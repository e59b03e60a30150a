//! Style registration and removal.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SubsecRound, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::loader::{
    append_attribution, base_tilejson, relative_path, rewrite_style, source_reference,
    SourceReference,
};
use super::{DataConfig, StyleConfig, StyleContext};
use crate::engine::RendererFactory;
use crate::error::StyleError;
use crate::geo::ProjectionTransform;
use crate::pool::{PoolSet, PoolSizes};
use crate::protocol::{
    DataDecorator, EmptyResponseCache, FailurePolicies, FontRegistry, PackagedSource,
    ResourceRouter,
};
use crate::source::{MbtilesSource, TileSource};

/// Shared settings and services every style is built from.
#[derive(Clone)]
pub struct StyleEnv {
    pub styles_dir: PathBuf,
    pub sprites_dir: PathBuf,
    pub mbtiles_dir: PathBuf,

    /// `data` section of the config: id → archive
    pub data: HashMap<String, DataConfig>,

    pub pool_sizes: PoolSizes,
    pub max_scale: u8,
    pub policies: FailurePolicies,

    /// Watermark used by styles that do not set their own
    pub watermark: Option<String>,

    pub factory: Arc<dyn RendererFactory>,
    pub fonts: Arc<FontRegistry>,
    pub empty: Arc<EmptyResponseCache>,
    pub http: reqwest::Client,
    pub decorator: Option<Arc<dyn DataDecorator>>,
}

/// Registered styles by id.
///
/// # Example
///
/// ```ignore
/// let registry = StyleRegistry::new(env);
/// registry.register("basic", &StyleConfig { style: "basic.json".into(), ..Default::default() }).await?;
/// let style = registry.get("basic").await.unwrap();
/// registry.remove("basic").await;
/// ```
pub struct StyleRegistry {
    env: StyleEnv,
    styles: RwLock<HashMap<String, Arc<StyleContext>>>,
}

impl StyleRegistry {
    pub fn new(env: StyleEnv) -> Self {
        Self {
            env,
            styles: RwLock::new(HashMap::new()),
        }
    }

    pub fn env(&self) -> &StyleEnv {
        &self.env
    }

    pub async fn get(&self, id: &str) -> Option<Arc<StyleContext>> {
        self.styles.read().await.get(id).cloned()
    }

    /// Registered style ids, sorted.
    pub async fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.styles.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.styles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.styles.read().await.is_empty()
    }

    /// Load, prepare and start serving a style.
    ///
    /// Pools are warmed before the style becomes visible. Registering an id
    /// that already exists replaces the old context, whose pools are drained.
    pub async fn register(
        &self,
        id: &str,
        config: &StyleConfig,
    ) -> Result<Arc<StyleContext>, StyleError> {
        let context = Arc::new(self.build(id, config).await?);
        context.pools().warm().await;

        let previous = self
            .styles
            .write()
            .await
            .insert(id.to_string(), context.clone());
        if let Some(previous) = previous {
            debug!(style = id, "Replacing registered style");
            previous.pools().drain_and_close().await;
        }

        info!(
            style = id,
            max_scale = self.env.max_scale,
            "Registered style"
        );
        Ok(context)
    }

    /// Stop serving a style.
    ///
    /// Returns once every pool of the style has been drained and closed, or
    /// `false` immediately if the id is unknown.
    pub async fn remove(&self, id: &str) -> bool {
        let Some(context) = self.styles.write().await.remove(id) else {
            return false;
        };
        context.pools().drain_and_close().await;
        info!(style = id, "Removed style");
        true
    }

    /// Remove every style.
    pub async fn clear(&self) {
        for id in self.ids().await {
            self.remove(&id).await;
        }
    }

    async fn build(&self, id: &str, config: &StyleConfig) -> Result<StyleContext, StyleError> {
        let env = &self.env;
        let style_path = env.styles_dir.join(&config.style);
        let mut doc = read_style(&style_path).await?;

        let style_name = Path::new(&config.style)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let style_dir = style_path.parent().unwrap_or(Path::new(""));
        let style_folder = relative_path(&env.sprites_dir, style_dir);
        rewrite_style(&mut doc, &style_name, &style_folder.to_string_lossy());

        let mut tilejson = base_tilejson(&doc, config.tilejson.as_ref());
        let attribution_override = config
            .tilejson
            .as_ref()
            .map(|t| t.contains_key("attribution"))
            .unwrap_or(false);
        let mut attribution = String::new();

        let mut transformer: Option<ProjectionTransform> = None;
        let mut projection_declared = false;
        let mut packaged = HashMap::new();

        let references: Vec<(String, SourceReference)> = doc
            .get("sources")
            .and_then(Value::as_object)
            .map(|sources| {
                sources
                    .iter()
                    .filter_map(|(name, source)| {
                        let url = source.get("url")?.as_str()?;
                        Some((name.clone(), source_reference(url)?))
                    })
                    .collect()
            })
            .unwrap_or_default();

        for (name, reference) in references {
            let file = match reference {
                SourceReference::Data(data_id) => {
                    let data_id = config.mapping.get(&data_id).unwrap_or(&data_id);
                    env.data
                        .get(data_id)
                        .map(|d| d.mbtiles.clone())
                        .ok_or_else(|| StyleError::DataNotFound(data_id.clone()))?
                }
                SourceReference::File(file) => file,
            };

            let source = MbtilesSource::open(env.mbtiles_dir.join(&file)).await?;
            let info = source.info().clone();

            if !projection_declared {
                if let Some(proj4) = info.proj4.as_deref() {
                    projection_declared = true;
                    transformer = ProjectionTransform::from_proj4(proj4);
                    debug!(style = id, source = %name, proj4, "Using source projection");
                }
            }

            let format = info.format.clone().unwrap_or_else(|| "pbf".to_string());
            let color = info
                .extra
                .get("color")
                .and_then(Value::as_str)
                .map(String::from);

            if let Some(entry) = doc
                .get_mut("sources")
                .and_then(|s| s.get_mut(&name))
                .and_then(Value::as_object_mut)
            {
                let kind = entry.get("type").cloned();
                entry.remove("url");
                info.merge_into(entry);
                if let Some(kind) = kind {
                    entry.insert("type".to_string(), kind);
                }
                entry.insert(
                    "tiles".to_string(),
                    Value::from(vec![format!("mbtiles://{}/{{z}}/{{x}}/{{y}}.{}", name, format)]),
                );
            }

            if !attribution_override {
                if let Some(text) = info.attribution.as_deref() {
                    append_attribution(&mut attribution, text);
                }
            }

            debug!(style = id, source = %name, file = %file, format = %format, "Opened tile source");
            packaged.insert(
                name,
                PackagedSource {
                    source: Arc::new(source) as Arc<dyn TileSource>,
                    color,
                },
            );
        }

        if !attribution_override {
            tilejson.insert("attribution".to_string(), Value::String(attribution));
        }

        let mut router = ResourceRouter::new(
            id,
            env.sprites_dir.clone(),
            env.fonts.clone(),
            env.empty.clone(),
            env.http.clone(),
        )
        .with_sources(packaged)
        .with_policies(env.policies);
        if let Some(decorator) = &env.decorator {
            router = router.with_decorator(decorator.clone());
        }
        let router = Arc::new(router);

        let style = Arc::new(doc);
        let pools = PoolSet::new(
            env.factory.clone(),
            id,
            style.clone(),
            router.clone(),
            &env.pool_sizes,
            env.max_scale,
        );

        let watermark = config
            .watermark
            .clone()
            .or_else(|| env.watermark.clone())
            .filter(|w| !w.is_empty());
        if watermark.is_some() && config.watermark.is_some() {
            debug!(style = id, "Using style watermark");
        }
        if transformer.is_none() && projection_declared {
            warn!(style = id, "Source projection is not supported, coordinates are used as WGS84");
        }

        Ok(StyleContext::new(
            id,
            style,
            tilejson,
            transformer,
            router,
            pools,
            Utc::now().trunc_subsecs(0),
            watermark,
        ))
    }
}

async fn read_style(path: &Path) -> Result<Value, StyleError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StyleError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
    serde_json::from_str(&text).map_err(|e| StyleError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
