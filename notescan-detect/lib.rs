//! Banknote detection core.
//!
//! A [`TemplateLibrary`] holds one [`Template`] per note face, each built
//! from a reference image restricted to its regions of interest. Scanning a
//! scene repeatedly matches every template against the scene's live
//! keypoints, verifies the correspondences geometrically and, on success,
//! removes the keypoints covered by the detected note so the next iteration
//! can find another copy of the same face.
//!
//! All vision primitives are injected through the capability traits of
//! [`notescan_core`]; diagnostics leave through a [`ScanObserver`].

pub mod events;
pub mod match_filter;
pub mod scan;
pub mod scene;
pub mod template;
pub mod verifier;

pub use events::{Deadline, LogObserver, NoopObserver, RecordingObserver, ScanEvent, ScanObserver};
pub use match_filter::{filter_matches, retain_below, FilteredMatches};
pub use scan::{total_value, FoundInstance, Iteration, ScanReport, Scanner, ScannerBuilder, TemplateScan};
pub use scene::Scene;
pub use template::{Template, TemplateLibrary, TemplateRecipe};
pub use verifier::{correspondences, verify, Rejection, Verified};
