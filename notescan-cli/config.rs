use std::fs;
use std::path::Path;

use notescan_brief::BriefConfig;
use notescan_core::ScanConfig;
use notescan_fast::FastConfig;
use notescan_homography::RansacConfig;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// Everything the `notescan` binary can be tuned with.
///
/// Every section falls back to its defaults, so a config file only needs
/// the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Worker threads for detection and for scanning several images at once
    pub n_threads: usize,
    pub scan: ScanConfig,
    pub fast: FastConfig,
    pub brief: BriefConfig,
    pub ransac: RansacConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get().max(1),
            scan: ScanConfig::default(),
            fast: FastConfig::default(),
            brief: BriefConfig::default(),
            ransac: RansacConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = toml::from_str(&text).map_err(|source| CliError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.n_threads == 0 {
            return Err(CliError::Config("n_threads must be at least 1".to_string()));
        }
        self.fast.validate().map_err(notescan_core::Error::from)?;
        self.brief.validate()?;
        self.ransac.validate()?;
        self.scan.validate()?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> CliResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// One-line description for logs
    pub fn summary(&self) -> String {
        format!(
            "{} | ratio={} min_corr={} | ransac={}px | threads={}",
            self.fast.summary(),
            self.scan.match_ratio,
            self.scan.min_correspondences,
            self.ransac.reprojection_threshold,
            self.n_threads
        )
    }
}
