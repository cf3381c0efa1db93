use std::time::{Duration, Instant};

use notescan_core::{
    DescriptorExtractor, DescriptorMatcher, Error, GrayImage, HomographyEstimator, KeypointDetector, PointPair, Quad,
    Result, ScanConfig,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::events::{ScanEvent, ScanObserver};
use crate::match_filter::filter_matches;
use crate::scene::Scene;
use crate::template::{Template, TemplateLibrary, TemplateRecipe};
use crate::verifier::{correspondences, verify, Rejection};

/// One detected note
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FoundInstance {
    pub tag: String,
    pub value: u32,
    /// Template outline projected into the scene
    pub corners: Quad,
    /// Correspondences that supported the detection
    pub inliers: Vec<PointPair>,
    /// Live scene keypoints removed by this detection
    pub consumed: usize,
}

impl FoundInstance {
    pub fn inlier_count(&self) -> usize {
        self.inliers.len()
    }
}

/// Sum of face values
pub fn total_value(instances: &[FoundInstance]) -> u64 {
    instances.iter().map(|i| u64::from(i.value)).sum()
}

/// Outcome of one match-and-verify step
#[derive(Debug, Clone, PartialEq)]
pub enum Iteration {
    Found(FoundInstance),
    Done(Rejection),
}

/// All instances of one template in a scene
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateScan {
    pub instances: Vec<FoundInstance>,
    /// `None` when the observer cancelled the scan
    pub rejection: Option<Rejection>,
}

impl TemplateScan {
    pub fn aborted(&self) -> bool {
        self.rejection.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScanReport {
    pub instances: Vec<FoundInstance>,
    pub scene_keypoints: usize,
    pub elapsed: Duration,
    pub aborted: bool,
}

impl ScanReport {
    pub fn total_value(&self) -> u64 {
        total_value(&self.instances)
    }
}

/// Assembles a [`Scanner`] from its four capabilities.
#[derive(Default)]
pub struct ScannerBuilder {
    detector: Option<Box<dyn KeypointDetector>>,
    extractor: Option<Box<dyn DescriptorExtractor>>,
    matcher: Option<Box<dyn DescriptorMatcher>>,
    estimator: Option<Box<dyn HomographyEstimator>>,
    config: ScanConfig,
}

impl ScannerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detector(mut self, detector: impl KeypointDetector + 'static) -> Self {
        self.detector = Some(Box::new(detector));
        self
    }

    pub fn extractor(mut self, extractor: impl DescriptorExtractor + 'static) -> Self {
        self.extractor = Some(Box::new(extractor));
        self
    }

    pub fn matcher(mut self, matcher: impl DescriptorMatcher + 'static) -> Self {
        self.matcher = Some(Box::new(matcher));
        self
    }

    pub fn estimator(mut self, estimator: impl HomographyEstimator + 'static) -> Self {
        self.estimator = Some(Box::new(estimator));
        self
    }

    pub fn config(mut self, config: ScanConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Scanner> {
        self.config.validate()?;
        Ok(Scanner {
            detector: self.detector.ok_or(Error::MissingCapability("detector"))?,
            extractor: self.extractor.ok_or(Error::MissingCapability("extractor"))?,
            matcher: self.matcher.ok_or(Error::MissingCapability("matcher"))?,
            estimator: self.estimator.ok_or(Error::MissingCapability("estimator"))?,
            config: self.config,
        })
    }
}

/// Template construction and multi-instance detection.
///
/// A scanner holds no per-scan state, so one instance can serve many scenes
/// concurrently; each scan owns its own [`Scene`].
pub struct Scanner {
    detector: Box<dyn KeypointDetector>,
    extractor: Box<dyn DescriptorExtractor>,
    matcher: Box<dyn DescriptorMatcher>,
    estimator: Box<dyn HomographyEstimator>,
    config: ScanConfig,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner").field("config", &self.config).finish_non_exhaustive()
    }
}

impl Scanner {
    pub fn builder() -> ScannerBuilder {
        ScannerBuilder::new()
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn build_template(&self, recipe: TemplateRecipe, image: GrayImage) -> Result<Template> {
        Template::build(recipe, image, self.detector.as_ref(), self.extractor.as_ref())
    }

    pub fn recompute_template(&self, template: &mut Template) -> Result<()> {
        template.recompute(self.detector.as_ref(), self.extractor.as_ref())
    }

    pub fn prepare_scene<'img>(&self, image: &'img GrayImage) -> Result<Scene<'img>> {
        Scene::compute_full(image, self.detector.as_ref(), self.extractor.as_ref())
    }

    /// Match `template` against the live scene once and, on acceptance,
    /// remove the keypoints covered by the detected outline.
    pub fn iterate<O>(&self, template: &Template, scene: &mut Scene<'_>, observer: &mut O) -> Iteration
    where
        O: ScanObserver + ?Sized,
    {
        if scene.live().is_empty() {
            return Iteration::Done(Rejection::NoLiveFeatures);
        }

        let matches = self
            .matcher
            .best_matches(template.features().descriptors(), scene.live().descriptors());
        let filtered = filter_matches(&matches, &self.config);
        observer.on_event(&ScanEvent::Filtered {
            tag: template.tag().to_string(),
            correspondences: matches.len(),
            good: filtered.good.len(),
            min_distance: filtered.min_distance,
            threshold: filtered.threshold,
        });

        let pairs = correspondences(template.features(), scene.live(), &filtered.good);
        match verify(&pairs, template.corners(), self.estimator.as_ref(), &self.config) {
            Ok(verified) => {
                let consumed = scene.remove_inside_region(&verified.quad);
                Iteration::Found(FoundInstance {
                    tag: template.tag().to_string(),
                    value: template.value(),
                    corners: verified.quad,
                    inliers: verified.inliers,
                    consumed,
                })
            }
            Err(rejection) => Iteration::Done(rejection),
        }
    }

    /// Find every instance of `template`, then restore the scene's live set.
    pub fn scan_template<O>(&self, template: &Template, scene: &mut Scene<'_>, observer: &mut O) -> TemplateScan
    where
        O: ScanObserver + ?Sized,
    {
        let tag = template.tag().to_string();
        observer.on_event(&ScanEvent::TemplateStarted {
            tag: tag.clone(),
            template_keypoints: template.features().len(),
            live_keypoints: scene.live().len(),
        });

        let mut instances = Vec::new();
        let rejection = loop {
            if !observer.should_continue() {
                observer.on_event(&ScanEvent::Aborted { tag: tag.clone() });
                break None;
            }
            if instances.len() >= self.config.max_instances_per_template {
                break Some(Rejection::InstanceLimit {
                    limit: self.config.max_instances_per_template,
                });
            }

            match self.iterate(template, scene, observer) {
                Iteration::Found(instance) => {
                    observer.on_event(&ScanEvent::Accepted {
                        tag: tag.clone(),
                        value: instance.value,
                        corners: instance.corners,
                        inliers: instance.inlier_count(),
                        consumed: instance.consumed,
                    });
                    let consumed = instance.consumed;
                    instances.push(instance);
                    if consumed == 0 {
                        break Some(Rejection::NothingConsumed);
                    }
                }
                Iteration::Done(rejection) => break Some(rejection),
            }
        };

        if let Some(reason) = &rejection {
            observer.on_event(&ScanEvent::Rejected {
                tag,
                reason: reason.clone(),
            });
        }
        scene.reset();

        TemplateScan { instances, rejection }
    }

    /// Detect every note of `library` in `image`, templates in library order.
    pub fn scan_scene<O>(&self, image: &GrayImage, library: &TemplateLibrary, observer: &mut O) -> Result<ScanReport>
    where
        O: ScanObserver + ?Sized,
    {
        let start = Instant::now();
        let mut scene = self.prepare_scene(image)?;
        let scene_keypoints = scene.original().len();
        observer.on_event(&ScanEvent::SceneReady {
            keypoints: scene_keypoints,
        });

        let mut instances = Vec::new();
        let mut aborted = false;
        for template in library {
            let scan = self.scan_template(template, &mut scene, observer);
            aborted = scan.aborted();
            instances.extend(scan.instances);
            if aborted {
                break;
            }
        }

        let elapsed = start.elapsed();
        observer.on_event(&ScanEvent::Finished {
            instances: instances.len(),
            total_value: total_value(&instances),
            elapsed,
        });

        Ok(ScanReport {
            instances,
            scene_keypoints,
            elapsed,
            aborted,
        })
    }
}
