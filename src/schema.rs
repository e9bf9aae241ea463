use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error_codes::CodedError;
use crate::parallax::{default_title_layers, LayerSpec};
use crate::viewport::{NaturalSize, Viewport};

pub const MANIFEST_VERSION: u32 = 1;

/// YAML scene description. Every field except `version` is optional; an
/// empty manifest describes the title stack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SceneManifest {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub viewport: Option<Viewport>,
    #[serde(default)]
    pub zoom: Option<f64>,
    /// Directory layer sources resolve against, relative to the manifest.
    #[serde(default)]
    pub asset_root: Option<PathBuf>,
    #[serde(default)]
    pub reference_layer: Option<String>,
    #[serde(default = "default_title_layers")]
    pub layers: Vec<LayerSpec>,
    /// Natural-size overrides keyed by layer id.
    #[serde(default)]
    pub sizes: BTreeMap<String, NaturalSize>,
}

impl Default for SceneManifest {
    fn default() -> Self {
        Self {
            version: MANIFEST_VERSION,
            viewport: None,
            zoom: None,
            asset_root: None,
            reference_layer: None,
            layers: default_title_layers(),
            sizes: BTreeMap::new(),
        }
    }
}

fn default_version() -> u32 {
    MANIFEST_VERSION
}

impl SceneManifest {
    pub fn reference_layer_id(&self) -> Option<&str> {
        self.reference_layer
            .as_deref()
            .or_else(|| self.layers.first().map(|layer| layer.id.as_str()))
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|layer| layer.id == id)
    }

    /// Size overrides re-keyed by image source.
    pub fn sizes_by_source(&self) -> BTreeMap<String, NaturalSize> {
        self.sizes
            .iter()
            .filter_map(|(id, size)| self.layer(id).map(|layer| (layer.source.clone(), *size)))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != MANIFEST_VERSION {
            return Err(manifest_error(
                "UNSUPPORTED_VERSION",
                format!(
                    "unsupported manifest version {}, expected {MANIFEST_VERSION}",
                    self.version
                ),
                json!({ "version": self.version, "supported": [MANIFEST_VERSION] }),
            ));
        }

        if let Some(viewport) = self.viewport {
            if !viewport.is_measured() {
                return Err(manifest_error(
                    "INVALID_VIEWPORT",
                    format!("viewport must be positive, got {viewport}"),
                    json!({ "width": viewport.width, "height": viewport.height }),
                ));
            }
        }

        if let Some(zoom) = self.zoom {
            if !zoom.is_finite() || zoom <= 0.0 {
                return Err(manifest_error(
                    "INVALID_ZOOM",
                    format!("zoom must be a finite number > 0, got {zoom}"),
                    json!({ "zoom": zoom }),
                ));
            }
        }

        if self.layers.is_empty() {
            return Err(manifest_error(
                "EMPTY_LAYERS",
                "manifest must define at least one layer",
                json!({}),
            ));
        }

        let mut seen_ids = HashSet::with_capacity(self.layers.len());
        for layer in &self.layers {
            layer.validate().map_err(|error| {
                manifest_error(
                    "INVALID_LAYER",
                    error.to_string(),
                    json!({ "id": layer.id }),
                )
            })?;
            if !seen_ids.insert(layer.id.as_str()) {
                return Err(manifest_error(
                    "DUPLICATE_LAYER",
                    format!("duplicate layer id '{}'", layer.id),
                    json!({ "id": layer.id }),
                ));
            }
        }

        if let Some(reference) = self.reference_layer.as_deref() {
            if !seen_ids.contains(reference) {
                return Err(manifest_error(
                    "UNKNOWN_REFERENCE_LAYER",
                    format!("reference_layer '{reference}' is not a defined layer"),
                    json!({ "reference_layer": reference, "layers": sorted(&seen_ids) }),
                ));
            }
        }

        for (id, size) in &self.sizes {
            if !seen_ids.contains(id.as_str()) {
                return Err(manifest_error(
                    "UNKNOWN_SIZE_LAYER",
                    format!("sizes entry '{id}' does not name a defined layer"),
                    json!({ "id": id, "layers": sorted(&seen_ids) }),
                ));
            }
            if !size.is_positive() {
                return Err(manifest_error(
                    "INVALID_SIZE",
                    format!("sizes entry '{id}' must be positive, got {size}"),
                    json!({ "id": id, "width": size.width, "height": size.height }),
                ));
            }
        }

        Ok(())
    }
}

fn sorted(ids: &HashSet<&str>) -> Vec<String> {
    let mut ids = ids.iter().map(|id| (*id).to_owned()).collect::<Vec<_>>();
    ids.sort();
    ids
}

fn manifest_error(
    code: &'static str,
    message: impl Into<String>,
    details: serde_json::Value,
) -> anyhow::Error {
    anyhow!(CodedError::manifest(code, message).with_details(details))
}
