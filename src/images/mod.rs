//! On-demand WebP derivatives of the original recipe images.
//!
//! Derivatives live at `{base}/{size}/{stem}.webp` next to `{base}/original/`.
//! Resolved paths are memoized for the life of the [`ImageCache`]; originals
//! never change, so nothing is ever invalidated.

mod encode;

pub use encode::WEBP_QUALITY;

use dashmap::DashMap;
use log::{debug, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::ImageError;

/// Raster formats accepted as originals.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeClass {
    Thumbnail,
    Small,
    Medium,
    Large,
    Original,
}

impl SizeClass {
    pub const ALL: [SizeClass; 5] = [
        SizeClass::Thumbnail,
        SizeClass::Small,
        SizeClass::Medium,
        SizeClass::Large,
        SizeClass::Original,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeClass::Thumbnail => "thumbnail",
            SizeClass::Small => "small",
            SizeClass::Medium => "medium",
            SizeClass::Large => "large",
            SizeClass::Original => "original",
        }
    }

    /// Bounding box of the class; `None` for the unscaled class.
    pub fn bounds(&self) -> Option<(u32, u32)> {
        match self {
            SizeClass::Thumbnail => Some((200, 200)),
            SizeClass::Small => Some((400, 400)),
            SizeClass::Medium => Some((800, 800)),
            SizeClass::Large => Some((1200, 1200)),
            SizeClass::Original => None,
        }
    }
}

impl FromStr for SizeClass {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SizeClass::ALL
            .into_iter()
            .find(|class| class.as_str() == s)
            .ok_or_else(|| ImageError::InvalidSize(s.to_string()))
    }
}

impl fmt::Display for SizeClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type CacheKey = (PathBuf, SizeClass);

pub struct ImageCache {
    base_dir: PathBuf,
    resolved: DashMap<CacheKey, PathBuf>,
    in_flight: DashMap<CacheKey, Arc<Mutex<()>>>,
    encodes: AtomicUsize,
}

impl ImageCache {
    /// `base_dir` is the `images` directory holding `original/` and one
    /// directory per size class.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            resolved: DashMap::new(),
            in_flight: DashMap::new(),
            encodes: AtomicUsize::new(0),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn originals_dir(&self) -> PathBuf {
        self.base_dir.join(SizeClass::Original.as_str())
    }

    /// Creates `original/` and every derivative directory.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for class in SizeClass::ALL {
            std::fs::create_dir_all(self.base_dir.join(class.as_str()))?;
        }
        Ok(())
    }

    /// Number of derivatives encoded by this instance.
    pub fn encode_count(&self) -> usize {
        self.encodes.load(Ordering::Relaxed)
    }

    pub fn derivative_path(&self, original: &Path, size: SizeClass) -> PathBuf {
        let stem = original
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.base_dir.join(size.as_str()).join(format!("{stem}.webp"))
    }

    /// Finds an original by file name, falling back to the same stem under
    /// every accepted extension (`cake.jpg` may be stored as `cake.png`).
    pub async fn locate_original(&self, file_name: &str) -> Result<PathBuf, ImageError> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(ImageError::NotFound(file_name.to_string()));
        }
        let originals = self.originals_dir();
        let exact = originals.join(file_name);
        if is_file(&exact).await {
            return Ok(exact);
        }

        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        for ext in ACCEPTED_EXTENSIONS {
            let candidate = originals.join(format!("{stem}.{ext}"));
            if is_file(&candidate).await {
                return Ok(candidate);
            }
        }
        Err(ImageError::NotFound(file_name.to_string()))
    }

    /// Returns the derivative of `original` for the named size class,
    /// generating it on first request.
    pub async fn resolve(&self, original: &Path, size: &str) -> Result<PathBuf, ImageError> {
        let size: SizeClass = size.parse()?;
        self.resolve_class(original, size).await
    }

    pub async fn resolve_class(&self, original: &Path, size: SizeClass) -> Result<PathBuf, ImageError> {
        if !has_accepted_extension(original) {
            return Err(ImageError::UnsupportedFormat(original.display().to_string()));
        }

        let key: CacheKey = (original.to_path_buf(), size);
        if let Some(hit) = self.resolved.get(&key) {
            return Ok(hit.value().clone());
        }

        let gate = self.in_flight.entry(key.clone()).or_default().clone();
        let outcome = {
            let _guard = gate.lock().await;
            self.resolve_exclusive(&key, original, size).await
        };
        self.in_flight.remove(&key);
        outcome
    }

    /// Runs with the per-key gate held.
    async fn resolve_exclusive(&self, key: &CacheKey, original: &Path, size: SizeClass) -> Result<PathBuf, ImageError> {
        // Another request may have finished while we waited.
        if let Some(hit) = self.resolved.get(key) {
            return Ok(hit.value().clone());
        }

        let target = self.derivative_path(original, size);
        if is_file(&target).await {
            debug!("Derivative already on disk: {}", target.display());
            self.resolved.insert(key.clone(), target.clone());
            return Ok(target);
        }

        self.generate(original, &target, size).await?;
        self.resolved.insert(key.clone(), target.clone());
        Ok(target)
    }

    async fn generate(&self, original: &Path, target: &Path, size: SizeClass) -> Result<(), ImageError> {
        let source = original.to_path_buf();
        let destination = target.to_path_buf();
        let bounds = size.bounds();

        let outcome = tokio::task::spawn_blocking(move || encode::render(&source, &destination, bounds))
            .await
            .map_err(|e| e.to_string())
            .and_then(|rendered| rendered);

        match outcome {
            Ok((width, height)) => {
                self.encodes.fetch_add(1, Ordering::Relaxed);
                info!(
                    "Generated {} derivative {} ({}x{})",
                    size,
                    target.display(),
                    width,
                    height
                );
                Ok(())
            }
            Err(message) => {
                warn!("Failed to generate {} derivative of {}: {}", size, original.display(), message);
                Err(ImageError::Processing {
                    path: original.to_path_buf(),
                    message,
                })
            }
        }
    }
}

fn has_accepted_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| ACCEPTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
