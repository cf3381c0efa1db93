use notescan_core::{DescriptorExtractor, Error, FeatureSet, GrayImage, KeypointDetector, Quad, Result};

/// Per-scan feature state of one scene image.
///
/// `original` is fixed after detection; `live` shrinks as detected notes
/// claim their keypoints and is restored between templates.
#[derive(Debug, Clone)]
pub struct Scene<'img> {
    image: &'img GrayImage,
    original: FeatureSet,
    live: FeatureSet,
}

impl<'img> Scene<'img> {
    /// Detect and describe the whole image; original and live start equal.
    pub fn compute_full<D, E>(image: &'img GrayImage, detector: &D, extractor: &E) -> Result<Self>
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
        let keypoints = detector.detect(image)?;
        let features = extractor.extract(image, &keypoints)?;
        Ok(Self::with_features(image, features))
    }

    pub fn with_features(image: &'img GrayImage, features: FeatureSet) -> Self {
        Self {
            image,
            live: features.clone(),
            original: features,
        }
    }

    pub fn image(&self) -> &'img GrayImage {
        self.image
    }

    pub fn original(&self) -> &FeatureSet {
        &self.original
    }

    pub fn live(&self) -> &FeatureSet {
        &self.live
    }

    /// Drop every live keypoint on or inside `region`, returning how many went.
    pub fn remove_inside_region(&mut self, region: &Quad) -> usize {
        self.live.retain(|kp| !region.contains(kp.point()))
    }

    pub fn reset(&mut self) {
        self.live.clone_from(&self.original);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;
    use notescan_core::{Descriptor, Homography, Keypoint};
    use proptest::prelude::*;

    fn features(points: &[(f32, f32)]) -> FeatureSet {
        let kps: Vec<Keypoint> = points.iter().map(|&(x, y)| Keypoint::new(x, y)).collect();
        let descs: Vec<Descriptor> = (0..kps.len()).map(|i| [i as u8; 32]).collect();
        FeatureSet::new(kps, descs).unwrap()
    }

    #[test]
    fn test_remove_counts_boundary_points() {
        let img = GrayImage::new(50, 50);
        let mut scene = Scene::with_features(&img, features(&[(5.0, 5.0), (10.0, 10.0), (10.0, 5.0), (30.0, 30.0)]));

        let removed = scene.remove_inside_region(&Quad::from_rect(0.0, 0.0, 10.0, 10.0));

        assert_eq!(removed, 3);
        assert_eq!(scene.live().keypoints(), &[Keypoint::new(30.0, 30.0)]);
        assert_eq!(scene.live().descriptors(), &[[3u8; 32]]);
        assert_eq!(scene.original().len(), 4);
    }

    #[test]
    fn test_reset_restores_original() {
        let img = GrayImage::new(50, 50);
        let mut scene = Scene::with_features(&img, features(&[(1.0, 1.0), (20.0, 20.0)]));
        scene.remove_inside_region(&Quad::from_rect(0.0, 0.0, 50.0, 50.0));
        assert!(scene.live().is_empty());

        scene.reset();
        assert_eq!(scene.live(), scene.original());
    }

    #[test]
    fn test_zero_sized_scene() {
        struct Never;
        impl KeypointDetector for Never {
            fn detect(&self, _: &GrayImage) -> Result<Vec<Keypoint>> {
                unreachable!("detector must not run on an empty image")
            }
        }
        impl DescriptorExtractor for Never {
            fn extract(&self, _: &GrayImage, _: &[Keypoint]) -> Result<FeatureSet> {
                unreachable!("extractor must not run on an empty image")
            }
        }

        let img = GrayImage::new(0, 0);
        assert!(matches!(
            Scene::compute_full(&img, &Never, &Never),
            Err(Error::EmptyImage { .. })
        ));
    }

    fn point() -> impl Strategy<Value = (f32, f32)> {
        (0.0f32..100.0, 0.0f32..100.0)
    }

    fn rect() -> impl Strategy<Value = Quad> {
        (0.0f32..100.0, 0.0f32..100.0, 0.0f32..60.0, 0.0f32..60.0)
            .prop_map(|(x, y, w, h)| Quad::from_rect(x, y, x + w, y + h))
    }

    /// A 60x40 outline rotated, scaled, tilted and moved into the scene
    fn projected_quad() -> impl Strategy<Value = Quad> {
        (
            0.0f64..std::f64::consts::TAU,
            0.3f64..1.5,
            0.0f64..100.0,
            0.0f64..100.0,
            -0.002f64..0.002,
            -0.002f64..0.002,
        )
            .prop_filter_map("outline maps to infinity", |(angle, scale, tx, ty, g, h)| {
                let (s, c) = angle.sin_cos();
                let m = Matrix3::new(scale * c, -scale * s, tx, scale * s, scale * c, ty, g, h, 1.0);
                Homography::new(m).project_quad(&Quad::from_rect(0.0, 0.0, 60.0, 40.0))
            })
    }

    proptest! {
        #[test]
        fn prop_remove_inside_projected_outline(
            points in prop::collection::vec(point(), 0..60),
            region in projected_quad(),
        ) {
            let img = GrayImage::new(100, 100);
            let mut all = points.clone();
            all.push((region.centroid().x, region.centroid().y));
            let set = features(&all);
            let expected = set.keypoints().iter().filter(|k| region.contains(k.point())).count();
            let mut scene = Scene::with_features(&img, set);

            let removed = scene.remove_inside_region(&region);

            prop_assert!(removed >= 1, "centroid of a convex outline must be removed");
            prop_assert_eq!(removed, expected);
            prop_assert_eq!(scene.live().descriptors().len(), scene.live().keypoints().len());
            prop_assert!(scene.live().keypoints().iter().all(|k| !region.contains(k.point())));
            for (kp, d) in scene.live().iter() {
                let i = d[0] as usize;
                prop_assert_eq!(*kp, Keypoint::new(all[i].0, all[i].1));
            }
        }

        #[test]
        fn prop_remove_exactly_contained(points in prop::collection::vec(point(), 0..60), region in rect()) {
            let img = GrayImage::new(100, 100);
            let set = features(&points);
            let expected = set.keypoints().iter().filter(|k| region.contains(k.point())).count();
            let mut scene = Scene::with_features(&img, set);

            let removed = scene.remove_inside_region(&region);

            prop_assert_eq!(removed, expected);
            prop_assert_eq!(scene.live().len(), points.len() - expected);
            prop_assert_eq!(scene.live().descriptors().len(), scene.live().keypoints().len());
            prop_assert!(scene.live().keypoints().iter().all(|k| !region.contains(k.point())));
            // Descriptor i was built for keypoint i; survivors keep their own row
            for (kp, d) in scene.live().iter() {
                let i = d[0] as usize;
                prop_assert_eq!(*kp, Keypoint::new(points[i].0, points[i].1));
            }
        }

        #[test]
        fn prop_reset_is_history_independent(
            points in prop::collection::vec(point(), 0..60),
            removals in prop::collection::vec(prop_oneof![rect(), projected_quad()], 0..6),
        ) {
            let img = GrayImage::new(100, 100);
            let mut scene = Scene::with_features(&img, features(&points));
            let original = scene.original().clone();

            for region in &removals {
                scene.remove_inside_region(region);
            }
            scene.reset();
            prop_assert_eq!(scene.live(), &original);

            scene.reset();
            prop_assert_eq!(scene.live(), &original);
            prop_assert_eq!(scene.original(), &original);
        }
    }
}
