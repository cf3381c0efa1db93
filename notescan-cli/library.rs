//! Template library manifests.
//!
//! ```toml
//! [[template]]
//! tag = "5-front"
//! value = 5
//! image = "5eu_r.jpg"
//! regions = [[10, 10, 120, 80]]
//! ```
//!
//! Image paths are relative to the manifest's directory. A template without
//! regions uses its whole reference image.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use notescan_core::Quad;
use notescan_detect::{Scanner, Template, TemplateLibrary, TemplateRecipe};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};
use crate::load_gray;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub tag: String,
    pub value: u32,
    pub image: PathBuf,
    /// `[x0, y0, x1, y1]` rectangles on the reference image
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<[f32; 4]>,
}

impl ManifestEntry {
    pub fn recipe(&self) -> TemplateRecipe {
        let regions = self
            .regions
            .iter()
            .map(|&[x0, y0, x1, y1]| Quad::from_rect(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)))
            .collect();
        TemplateRecipe {
            tag: self.tag.clone(),
            value: self.value,
            regions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LibraryManifest {
    #[serde(rename = "template", default)]
    pub templates: Vec<ManifestEntry>,
    #[serde(skip)]
    base_dir: PathBuf,
}

impl LibraryManifest {
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut manifest: Self = toml::from_str(&text).map_err(|source| CliError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn from_toml_str(text: &str, base_dir: impl Into<PathBuf>) -> CliResult<Self> {
        let mut manifest: Self = toml::from_str(text).map_err(|source| CliError::Toml {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        manifest.base_dir = base_dir.into();
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.templates.is_empty() {
            return Err(CliError::Manifest("no [[template]] entries".to_string()));
        }
        let mut seen = HashSet::new();
        for entry in &self.templates {
            if !seen.insert(entry.tag.as_str()) {
                return Err(CliError::Manifest(format!("duplicate tag {:?}", entry.tag)));
            }
            if entry.regions.iter().flatten().any(|v| !v.is_finite()) {
                return Err(CliError::Manifest(format!("{}: non-finite region coordinate", entry.tag)));
            }
        }
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn image_path(&self, entry: &ManifestEntry) -> PathBuf {
        self.base_dir.join(&entry.image)
    }

    /// Load every reference image and build the templates in parallel,
    /// keeping manifest order.
    pub fn build(&self, scanner: &Scanner) -> CliResult<TemplateLibrary> {
        let templates = self
            .templates
            .par_iter()
            .map(|entry| -> CliResult<Template> {
                let image = load_gray(&self.image_path(entry))?;
                Ok(scanner.build_template(entry.recipe(), image)?)
            })
            .collect::<CliResult<Vec<_>>>()?;
        Ok(TemplateLibrary::new(templates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
[[template]]
tag = "5-front"
value = 5
image = "5eu_r.jpg"

[[template]]
tag = "5-back"
value = 5
image = "5eu_v.jpg"
regions = [[10, 10, 120, 80], [200, 90, 150, 20]]
"#;

    #[test]
    fn test_parse_manifest() {
        let m = LibraryManifest::from_toml_str(MANIFEST, "notes").unwrap();

        assert_eq!(m.templates.len(), 2);
        assert!(m.templates[0].regions.is_empty());
        assert_eq!(m.image_path(&m.templates[1]), Path::new("notes").join("5eu_v.jpg"));

        let recipe = m.templates[1].recipe();
        assert_eq!(recipe.tag, "5-back");
        assert_eq!(recipe.regions[0], Quad::from_rect(10.0, 10.0, 120.0, 80.0));
        // Reversed coordinates are normalised
        assert_eq!(recipe.regions[1], Quad::from_rect(150.0, 20.0, 200.0, 90.0));
    }

    #[test]
    fn test_rejects_duplicate_tags() {
        let text = "[[template]]\ntag = \"a\"\nvalue = 5\nimage = \"a.png\"\n\n[[template]]\ntag = \"a\"\nvalue = 10\nimage = \"b.png\"\n";
        assert!(matches!(
            LibraryManifest::from_toml_str(text, "."),
            Err(CliError::Manifest(_))
        ));
    }

    #[test]
    fn test_rejects_empty_library() {
        assert!(matches!(LibraryManifest::from_toml_str("", "."), Err(CliError::Manifest(_))));
    }

    #[test]
    fn test_missing_field_is_a_parse_error() {
        let text = "[[template]]\ntag = \"a\"\nimage = \"a.png\"\n";
        assert!(matches!(LibraryManifest::from_toml_str(text, "."), Err(CliError::Toml { .. })));
    }
}
