use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde_json::json;

use crate::assets::{layer_sources, FsImageSizeLoader, SizeProbe};
use crate::error_codes::CodedError;
use crate::scene::ParallaxScene;
use crate::schema::SceneManifest;
use crate::viewport::{NaturalSize, Viewport, FALLBACK_VIEWPORT};

/// A validated manifest plus where its assets live.
#[derive(Debug, Clone)]
pub struct LoadedScene {
    pub manifest: SceneManifest,
    pub path: Option<PathBuf>,
    pub asset_root: PathBuf,
}

impl LoadedScene {
    /// The title stack with no manifest file; sources resolve against the
    /// working directory.
    pub fn builtin() -> Self {
        Self {
            manifest: SceneManifest::default(),
            path: None,
            asset_root: PathBuf::from("."),
        }
    }

    pub fn loader(&self) -> FsImageSizeLoader {
        FsImageSizeLoader::new(&self.asset_root)
    }

    /// Sources whose file does not exist under the asset root.
    pub fn missing_assets(&self) -> Vec<String> {
        let loader = self.loader();
        layer_sources(&self.manifest.layers)
            .into_iter()
            .filter(|source| !loader.resolve(source).is_file())
            .collect()
    }

    /// Builds the live scene: probes natural sizes on a worker thread, then
    /// applies manifest size overrides and the caller's overrides on top.
    /// Unreadable assets are logged and skipped.
    pub fn build_scene(&self, overrides: &SceneOverrides) -> Result<ParallaxScene> {
        let mut scene = ParallaxScene::new(
            self.manifest.layers.clone(),
            self.manifest.reference_layer.as_deref(),
        )?;

        let manifest_sizes = self.manifest.sizes_by_source();
        if overrides.probe_assets {
            let sources = layer_sources(&self.manifest.layers)
                .into_iter()
                .filter(|source| !manifest_sizes.contains_key(source))
                .collect::<Vec<_>>();
            let probe = SizeProbe::spawn(self.loader(), sources)?;
            while let Some(event) = probe.recv() {
                scene.apply_size_event(event);
            }
            probe.finish()?;
        }

        for (source, size) in manifest_sizes {
            scene.set_size(&source, size);
        }
        if let Some(size) = overrides.reference_size {
            let source = scene.reference_layer().source.clone();
            scene.set_size(&source, size);
        }

        let zoom = overrides.zoom.or(self.manifest.zoom).unwrap_or(1.0);
        scene.set_zoom(zoom);
        let viewport = overrides
            .viewport
            .or(self.manifest.viewport)
            .unwrap_or(FALLBACK_VIEWPORT);
        scene.set_viewport(viewport);

        Ok(scene)
    }
}

/// Command-line inputs that take precedence over the manifest.
#[derive(Debug, Clone, Default)]
pub struct SceneOverrides {
    pub viewport: Option<Viewport>,
    pub zoom: Option<f64>,
    pub reference_size: Option<NaturalSize>,
    pub probe_assets: bool,
}

pub fn load_and_validate_scene(path: &Path) -> Result<LoadedScene> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read manifest {}", path.display()))?;
    let manifest: SceneManifest = serde_yaml::from_str(&contents).map_err(|error| {
        let location = error.location();
        let position = location
            .as_ref()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        anyhow!(CodedError::manifest(
            "MANIFEST_PARSE",
            format!(
                "failed to parse yaml in {} at {}: {}",
                path.display(),
                position,
                error
            ),
        )
        .with_details(json!({
            "path": path.display().to_string(),
            "line": location.as_ref().map(|location| location.line()),
            "column": location.as_ref().map(|location| location.column()),
        })))
    })?;

    manifest
        .validate()
        .with_context(|| format!("invalid manifest {}", path.display()))?;

    let manifest_dir = path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let asset_root = match &manifest.asset_root {
        Some(root) if root.is_absolute() => root.clone(),
        Some(root) => manifest_dir.join(root),
        None => manifest_dir,
    };

    let loaded = LoadedScene {
        manifest,
        path: Some(path.to_path_buf()),
        asset_root,
    };
    for source in loaded.missing_assets() {
        tracing::warn!(
            source = %source,
            asset_root = %loaded.asset_root.display(),
            "layer asset not found"
        );
    }
    Ok(loaded)
}
