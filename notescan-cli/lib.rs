//! High-level banknote scanning: configuration, template library manifests,
//! image loading, annotation and reports on top of the notescan crates.

pub mod annotate;
pub mod config;
pub mod error;
pub mod library;
pub mod report;

use std::path::Path;

use notescan_brief::{BriefExtractor, HammingMatcher};
use notescan_core::GrayImage;
use notescan_detect::{ScanObserver, ScanReport, Scanner, TemplateLibrary};
use notescan_fast::FastDetector;
use notescan_homography::RansacEstimator;

pub use config::AppConfig;
pub use error::{CliError, CliResult};
pub use library::{LibraryManifest, ManifestEntry};
pub use notescan_detect;

/// Initialize the global Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new().num_threads(n_threads).build_global()
}

/// Scanner wired with the default FAST / BRIEF / Hamming / RANSAC primitives
pub fn build_scanner(cfg: &AppConfig) -> CliResult<Scanner> {
    cfg.validate()?;
    let detector = FastDetector::new(cfg.fast.clone()).map_err(notescan_core::Error::from)?;
    Ok(Scanner::builder()
        .detector(detector)
        .extractor(BriefExtractor::new(cfg.brief.clone())?)
        .matcher(HammingMatcher::new())
        .estimator(RansacEstimator::new(cfg.ransac.clone())?)
        .config(cfg.scan.clone())
        .build()?)
}

/// Decode any supported image format to 8-bit grayscale
pub fn load_gray(path: &Path) -> CliResult<GrayImage> {
    let img = image::open(path).map_err(|source| CliError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_luma8())
}

/// Scanner plus the template library it scans for
pub struct NoteScanner {
    scanner: Scanner,
    library: TemplateLibrary,
}

impl NoteScanner {
    pub fn new(cfg: &AppConfig, manifest: &LibraryManifest) -> CliResult<Self> {
        let scanner = build_scanner(cfg)?;
        let library = manifest.build(&scanner)?;
        log::info!("template library ready: {} templates", library.len());
        Ok(Self { scanner, library })
    }

    pub fn from_parts(scanner: Scanner, library: TemplateLibrary) -> Self {
        Self { scanner, library }
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub fn library(&self) -> &TemplateLibrary {
        &self.library
    }

    pub fn scan<O>(&self, image: &GrayImage, observer: &mut O) -> CliResult<ScanReport>
    where
        O: ScanObserver + ?Sized,
    {
        Ok(self.scanner.scan_scene(image, &self.library, observer)?)
    }

    /// Load `path` and scan it, returning the decoded image with the report
    pub fn scan_file<O>(&self, path: &Path, observer: &mut O) -> CliResult<(GrayImage, ScanReport)>
    where
        O: ScanObserver + ?Sized,
    {
        let image = load_gray(path)?;
        let report = self.scan(&image, observer)?;
        Ok((image, report))
    }
}
