//! Integration tests for full optimization cycles.
//!
//! Sources are real PNG files so introspection goes through the `image`
//! header probe. Encoding is replaced by a backend that writes placeholder
//! bytes and counts calls, since the external tools are not assumed present.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;
use vr_optimizer::core::config::OptimizerConfig;
use vr_optimizer::core::encoder::{
    CommandBackend, EncodeRequest, ImageBackend, ImageInfo, ThumbnailRequest, ToolPaths,
};
use vr_optimizer::core::janitor::CacheJanitor;
use vr_optimizer::core::metadata::read_sidecar;
use vr_optimizer::core::pipeline::Optimizer;
use vr_optimizer::core::status::collect_status;
use vr_optimizer::core::variants::VariantKey;
use vr_optimizer::core::ProjectionType;
use vr_optimizer::error::{EncodeError, IntrospectError};
use vr_optimizer::events::null_sender;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Real header probing, fake encoders
struct PlaceholderBackend {
    probe: CommandBackend,
    encodes: AtomicUsize,
    thumbnails: AtomicUsize,
}

impl PlaceholderBackend {
    fn new() -> Self {
        Self {
            probe: CommandBackend::new(ToolPaths {
                identify: PathBuf::from("/nonexistent/identify"),
                ..ToolPaths::default()
            }),
            encodes: AtomicUsize::new(0),
            thumbnails: AtomicUsize::new(0),
        }
    }

    fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }
}

impl ImageBackend for PlaceholderBackend {
    fn introspect(&self, path: &Path) -> Result<ImageInfo, IntrospectError> {
        self.probe.introspect(path)
    }

    fn encode(&self, request: &EncodeRequest) -> Result<(), EncodeError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        fs::write(&request.target, vec![0u8; 2048]).map_err(|source| EncodeError::Io {
            path: request.target.clone(),
            source,
        })
    }

    fn thumbnail(&self, request: &ThumbnailRequest) -> Result<(), EncodeError> {
        self.thumbnails.fetch_add(1, Ordering::SeqCst);
        fs::write(&request.target, vec![0u8; 512]).map_err(|source| EncodeError::Io {
            path: request.target.clone(),
            source,
        })
    }
}

fn create_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_pixel(width, height, image::Rgb([40, 90, 160]))
        .save(&path)
        .unwrap();
    set_mtime(&path, SystemTime::now() - Duration::from_secs(60));
    path
}

fn set_mtime(path: &Path, time: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

struct Fixture {
    temp_dir: TempDir,
    backend: Arc<PlaceholderBackend>,
    optimizer: Optimizer,
}

impl Fixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("vr")).unwrap();
        let backend = Arc::new(PlaceholderBackend::new());
        let config = OptimizerConfig {
            source_root: temp_dir.path().join("vr"),
            cache_root: temp_dir.path().join("cache"),
            ..Default::default()
        };
        let optimizer = Optimizer::builder(config)
            .backend(backend.clone())
            .build()
            .unwrap();

        Self {
            temp_dir,
            backend,
            optimizer,
        }
    }

    fn source_dir(&self) -> PathBuf {
        self.temp_dir.path().join("vr")
    }
}

#[test]
fn clean_cycle_builds_complete_cache_for_panoramas_only() {
    let fx = Fixture::new();
    let tours = fx.source_dir().join("tours");
    fs::create_dir(&tours).unwrap();
    create_png(&fx.source_dir(), "lobby.png", 2048, 1024);
    create_png(&tours, "atrium.png", 1920, 1000);
    create_png(&fx.source_dir(), "poster.png", 1920, 1200);
    create_png(&fx.source_dir(), "small.png", 800, 400);

    let report = fx.optimizer.run_cycle().unwrap();

    assert_eq!(report.summary.total_assets, 4);
    assert_eq!(report.summary.processed, 2);
    assert_eq!(report.summary.skipped, 2);
    assert_eq!(report.summary.variants_encoded, 18);

    let layout = fx.optimizer.layout();
    for stem in ["lobby", "atrium"] {
        for key in VariantKey::ALL {
            assert!(layout.variant_path(stem, key).exists(), "{} {}", stem, key);
        }
        assert!(layout.thumbnail_path(stem).exists());
        assert!(layout.metadata_path(stem).exists());
    }
    for stem in ["poster", "small"] {
        assert!(!layout.metadata_path(stem).exists());
        assert!(!layout.thumbnail_path(stem).exists());
    }
}

#[test]
fn sidecar_describes_the_source() {
    let fx = Fixture::new();
    let source = create_png(&fx.source_dir(), "lobby.png", 2048, 1024);

    fx.optimizer.run_cycle().unwrap();
    let record = read_sidecar(&fx.optimizer.layout().metadata_path("lobby")).unwrap();

    assert_eq!(record.width, Some(2048));
    assert_eq!(record.height, Some(1024));
    assert_eq!(record.format.as_deref(), Some("PNG"));
    assert_eq!(record.colorspace.as_deref(), Some("sRGB"));
    assert_eq!(record.size, fs::metadata(&source).unwrap().len());
    assert!(record.is_vr_content);
    assert_eq!(record.aspect_ratio, Some(2.0));
    assert_eq!(record.projection_type, Some(ProjectionType::Equirectangular));
    assert_eq!(record.file_hash.len(), 32);
}

#[test]
fn second_cycle_performs_no_encodes() {
    let fx = Fixture::new();
    create_png(&fx.source_dir(), "lobby.png", 2048, 1024);

    fx.optimizer.run_cycle().unwrap();
    let second = fx.optimizer.run_cycle().unwrap();

    assert_eq!(fx.backend.encodes(), 9);
    assert_eq!(fx.backend.thumbnails.load(Ordering::SeqCst), 1);
    assert_eq!(second.summary.variants_encoded, 0);
    assert_eq!(second.summary.variants_fresh, 9);
}

#[test]
fn edited_source_is_re_encoded() {
    let fx = Fixture::new();
    let source = create_png(&fx.source_dir(), "lobby.png", 2048, 1024);
    fx.optimizer.run_cycle().unwrap();

    set_mtime(&source, SystemTime::now() + Duration::from_secs(60));
    let second = fx.optimizer.run_cycle().unwrap();

    assert_eq!(second.summary.variants_encoded, 9);
    assert_eq!(fx.backend.encodes(), 18);
}

#[test]
fn corrupt_source_is_skipped_without_failing_the_cycle() {
    let fx = Fixture::new();
    create_png(&fx.source_dir(), "lobby.png", 2048, 1024);
    fs::write(fx.source_dir().join("broken.jpg"), b"this is not a valid image file").unwrap();

    let report = fx.optimizer.run_cycle().unwrap();

    assert_eq!(report.summary.total_assets, 2);
    assert_eq!(report.summary.processed, 1);
    assert_eq!(report.summary.skipped, 1);
}

#[test]
fn status_reflects_completed_cycle() {
    let fx = Fixture::new();
    create_png(&fx.source_dir(), "lobby.png", 2048, 1024);
    create_png(&fx.source_dir(), "poster.png", 1920, 1200);

    fx.optimizer.run_cycle().unwrap();
    let status = collect_status(&fx.source_dir(), fx.optimizer.layout()).unwrap();

    assert_eq!(status.total_sources, 2);
    assert_eq!(status.fully_optimized, 1);
    assert_eq!(status.total_cached_files, 10);
}

#[test]
fn janitor_expires_aged_cache_but_keeps_sidecars() {
    let fx = Fixture::new();
    create_png(&fx.source_dir(), "lobby.png", 2048, 1024);
    fx.optimizer.run_cycle().unwrap();
    let layout = fx.optimizer.layout().clone();

    let janitor = CacheJanitor::new(layout.clone(), 30 * DAY);
    let report = janitor.sweep_at(SystemTime::now() + 31 * DAY, &null_sender());

    assert_eq!(report.removed, 10);
    assert_eq!(report.failed, 0);
    assert!(layout.metadata_path("lobby").exists());
    for key in VariantKey::ALL {
        assert!(!layout.variant_path("lobby", key).exists());
    }

    // Expired variants come back on the next cycle
    let rebuilt = fx.optimizer.run_cycle().unwrap();
    assert_eq!(rebuilt.summary.variants_encoded, 9);
}
