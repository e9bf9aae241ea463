//! Natural-size probing for layer images.
//!
//! Probes can run on a worker thread; results come back as [`SizeEvent`]s
//! over a channel and are applied to the scene one at a time.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context, Result};

use crate::parallax::LayerSpec;
use crate::viewport::NaturalSize;

/// Resolves an image source to its intrinsic pixel size.
pub trait ImageSizeLoader {
    fn natural_size(&self, source: &str) -> Result<NaturalSize>;
}

/// Reads image headers from disk, relative to an asset root.
#[derive(Debug, Clone)]
pub struct FsImageSizeLoader {
    root: PathBuf,
}

impl FsImageSizeLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, source: &str) -> PathBuf {
        let path = Path::new(source);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl ImageSizeLoader for FsImageSizeLoader {
    fn natural_size(&self, source: &str) -> Result<NaturalSize> {
        let path = self.resolve(source);
        let (width, height) = image::image_dimensions(&path)
            .with_context(|| format!("failed to read image size of {}", path.display()))?;
        let size = NaturalSize::new(width, height);
        if !size.is_positive() {
            return Err(anyhow!("image {} has zero size", path.display()));
        }
        Ok(size)
    }
}

/// Fixed sizes, e.g. from manifest overrides or `--reference-size`.
#[derive(Debug, Clone, Default)]
pub struct StaticSizes {
    sizes: BTreeMap<String, NaturalSize>,
}

impl StaticSizes {
    pub fn new(sizes: BTreeMap<String, NaturalSize>) -> Self {
        Self { sizes }
    }
}

impl ImageSizeLoader for StaticSizes {
    fn natural_size(&self, source: &str) -> Result<NaturalSize> {
        self.sizes
            .get(source)
            .copied()
            .ok_or_else(|| anyhow!("no size registered for '{source}'"))
    }
}

/// Outcome of one probe. `size` is `None` when the image could not be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SizeEvent {
    pub source: String,
    pub size: Option<NaturalSize>,
}

impl SizeEvent {
    pub fn probe(loader: &impl ImageSizeLoader, source: &str) -> Self {
        let size = match loader.natural_size(source) {
            Ok(size) => Some(size),
            Err(error) => {
                tracing::warn!(source, error = %format!("{error:#}"), "image size probe failed");
                None
            }
        };
        Self {
            source: source.to_owned(),
            size,
        }
    }
}

/// Distinct image sources of a layer stack, in sorted order.
pub fn layer_sources(layers: &[LayerSpec]) -> Vec<String> {
    layers
        .iter()
        .map(|layer| layer.source.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Background prober: one worker thread walks the sources and sends an
/// event per source.
pub struct SizeProbe {
    receiver: mpsc::Receiver<SizeEvent>,
    worker: Option<JoinHandle<()>>,
}

impl SizeProbe {
    pub fn spawn<L>(loader: L, sources: Vec<String>) -> Result<Self>
    where
        L: ImageSizeLoader + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel::<SizeEvent>();
        let worker = thread::Builder::new()
            .name("titlescroll-size-probe".to_owned())
            .spawn(move || {
                for source in &sources {
                    if sender.send(SizeEvent::probe(&loader, source)).is_err() {
                        break;
                    }
                }
            })
            .context("failed to spawn size probe thread")?;
        Ok(Self {
            receiver,
            worker: Some(worker),
        })
    }

    /// Blocks for the next event; `None` once every source was probed.
    pub fn recv(&self) -> Option<SizeEvent> {
        self.receiver.recv().ok()
    }

    pub fn finish(mut self) -> Result<()> {
        match self.worker.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| anyhow!("size probe thread panicked")),
            None => Ok(()),
        }
    }
}

impl Iterator for SizeProbe {
    type Item = SizeEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}
