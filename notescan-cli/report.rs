use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use notescan_detect::{FoundInstance, ScanReport};
use serde::Serialize;

use crate::error::{CliError, CliResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceRecord {
    pub tag: String,
    pub value: u32,
    pub corners: [[f32; 2]; 4],
    pub inliers: usize,
    pub consumed: usize,
}

impl From<&FoundInstance> for InstanceRecord {
    fn from(found: &FoundInstance) -> Self {
        Self {
            tag: found.tag.clone(),
            value: found.value,
            corners: found.corners.0.map(|p| [p.x, p.y]),
            inliers: found.inlier_count(),
            consumed: found.consumed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneRecord {
    pub image: String,
    pub instances: Vec<InstanceRecord>,
    pub total: u64,
    pub scene_keypoints: usize,
    pub elapsed_ms: f64,
    pub aborted: bool,
}

impl SceneRecord {
    pub fn new(image: &Path, report: &ScanReport) -> Self {
        Self {
            image: image.display().to_string(),
            instances: report.instances.iter().map(InstanceRecord::from).collect(),
            total: report.total_value(),
            scene_keypoints: report.scene_keypoints,
            elapsed_ms: report.elapsed.as_secs_f64() * 1000.0,
            aborted: report.aborted,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    pub image: String,
    pub error: String,
}

/// Results of one `notescan scan` run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub scenes: Vec<SceneRecord>,
    pub failures: Vec<FailureRecord>,
}

impl RunReport {
    pub fn push_scene(&mut self, image: &Path, report: &ScanReport) {
        self.scenes.push(SceneRecord::new(image, report));
    }

    pub fn push_failure(&mut self, image: &Path, error: &CliError) {
        self.failures.push(FailureRecord {
            image: image.display().to_string(),
            error: error.to_string(),
        });
    }

    pub fn grand_total(&self) -> u64 {
        self.scenes.iter().map(|s| s.total).sum()
    }

    pub fn write_json(&self, path: &Path) -> CliResult<()> {
        let file = File::create(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}
