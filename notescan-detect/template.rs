use notescan_core::{
    DescriptorExtractor, Error, FeatureSet, GrayImage, KeypointDetector, Quad, Result,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Identity of a note face plus the regions of its reference image that
/// carry reliable features.
///
/// An empty region list means the whole image is the template.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TemplateRecipe {
    pub tag: String,
    pub value: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub regions: Vec<Quad>,
}

impl TemplateRecipe {
    pub fn new(tag: impl Into<String>, value: u32) -> Self {
        Self {
            tag: tag.into(),
            value,
            regions: Vec::new(),
        }
    }

    pub fn with_region(mut self, region: Quad) -> Self {
        self.regions.push(region);
        self
    }
}

/// Reference features of one note face.
///
/// Immutable once built, except through [`Template::recompute`].
#[derive(Debug, Clone)]
pub struct Template {
    recipe: TemplateRecipe,
    image: GrayImage,
    features: FeatureSet,
    corners: Quad,
}

impl Template {
    pub fn build<D, E>(recipe: TemplateRecipe, image: GrayImage, detector: &D, extractor: &E) -> Result<Self>
    where
        D: KeypointDetector + ?Sized,
        E: DescriptorExtractor + ?Sized,
    {
        let features = restricted_features(&image, &recipe.regions, detector, extractor)?;
        let corners = Quad::image_bounds(image.width(), image.height());
        log::debug!(
            "template {}: {} keypoints from {} region(s)",
            recipe.tag,
            features.len(),
            recipe.regions.len()
        );
        Ok(Self {
            recipe,
            image,
            features,
            corners,
        })
    }

    /// Re-derive the reference features from the stored image.
    pub fn recompute<D, E>(&mut self, detector: &D, extractor: &E) -> Result<()>
    where
        D: KeypointDetector + ?Sized,
        E: DescriptorExtractor + ?Sized,
    {
        self.features = restricted_features(&self.image, &self.recipe.regions, detector, extractor)?;
        Ok(())
    }

    pub fn recipe(&self) -> &TemplateRecipe {
        &self.recipe
    }

    pub fn tag(&self) -> &str {
        &self.recipe.tag
    }

    pub fn value(&self) -> u32 {
        self.recipe.value
    }

    pub fn regions(&self) -> &[Quad] {
        &self.recipe.regions
    }

    pub fn image(&self) -> &GrayImage {
        &self.image
    }

    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Outline of the reference image: `(0,0)`, `(w,0)`, `(w,h)`, `(0,h)`
    pub fn corners(&self) -> &Quad {
        &self.corners
    }
}

fn restricted_features<D, E>(image: &GrayImage, regions: &[Quad], detector: &D, extractor: &E) -> Result<FeatureSet>
where
    D: KeypointDetector + ?Sized,
    E: DescriptorExtractor + ?Sized,
{
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::EmptyImage {
            width: image.width(),
            height: image.height(),
        });
    }

    let mut keypoints = detector.detect(image)?;
    if !regions.is_empty() {
        keypoints.retain(|kp| regions.iter().any(|r| r.contains(kp.point())));
    }
    extractor.extract(image, &keypoints)
}

/// Ordered, read-only collection of templates scanned against each scene.
#[derive(Debug, Clone, Default)]
pub struct TemplateLibrary {
    templates: Vec<Template>,
}

impl TemplateLibrary {
    pub fn new(templates: Vec<Template>) -> Self {
        Self { templates }
    }

    pub fn push(&mut self, template: Template) {
        self.templates.push(template);
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Template> {
        self.templates.iter()
    }

    pub fn get(&self, tag: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.tag() == tag)
    }
}

impl FromIterator<Template> for TemplateLibrary {
    fn from_iter<I: IntoIterator<Item = Template>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a TemplateLibrary {
    type Item = &'a Template;
    type IntoIter = std::slice::Iter<'a, Template>;

    fn into_iter(self) -> Self::IntoIter {
        self.templates.iter()
    }
}
