use std::sync::{Arc, RwLock};

use image::{DynamicImage, GrayImage, RgbImage};
use indicatif::ParallelProgressIterator;
use log::info;
use rayon::prelude::*;

use crate::config::TemplateSpec;
use crate::error::{Result, TrackerError};
use crate::features::FeatureEngine;
use crate::io::load_rgb_image;
use crate::types::{DescriptorSet, Rect};

/// A labelled reference image. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Template {
    pub label: String,
    pub image: RgbImage,
}

impl Template {
    pub fn new(label: &str, image: RgbImage) -> Template {
        Template {
            label: label.to_string(),
            image,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.image.width(), self.image.height())
    }

    pub fn gray(&self) -> GrayImage {
        DynamicImage::ImageRgb8(self.image.clone()).to_luma8()
    }
}

/// Descriptor sets of every template, index aligned with the bank.
pub type FeatureSnapshot = Arc<Vec<DescriptorSet>>;

/// Ordered templates plus their cached descriptor sets.
///
/// Descriptors are replaced as a whole snapshot, so readers holding a
/// snapshot never see a partially recomputed bank.
#[derive(Debug)]
pub struct TemplateBank {
    templates: Arc<[Template]>,
    features: RwLock<Option<FeatureSnapshot>>,
}

impl TemplateBank {
    pub fn new(templates: Vec<Template>) -> Result<TemplateBank> {
        if templates.is_empty() {
            return Err(TrackerError::EmptyTemplateBank);
        }
        Ok(TemplateBank {
            templates: templates.into(),
            features: RwLock::new(None),
        })
    }

    /// Reads every reference image. Any missing or unreadable image is an error.
    pub fn load(specs: &[TemplateSpec]) -> Result<TemplateBank> {
        let templates = specs
            .iter()
            .map(|spec| {
                let image = load_rgb_image(&spec.path)?;
                info!(
                    "loaded template {} ({}x{}) from {}",
                    spec.label,
                    image.width(),
                    image.height(),
                    spec.path.display()
                );
                Ok(Template::new(&spec.label, image))
            })
            .collect::<Result<Vec<_>>>()?;
        TemplateBank::new(templates)
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Recomputes the descriptor set of every template and swaps them in at once.
    /// Calling it again simply replaces the previous snapshot.
    pub fn compute_features(&self, engine: &dyn FeatureEngine) -> Result<FeatureSnapshot> {
        let sets = self
            .templates
            .par_iter()
            .progress_count(self.templates.len() as u64)
            .map(|t| engine.find_features(&t.gray()))
            .collect::<Result<Vec<_>>>()?;
        for (t, s) in self.templates.iter().zip(&sets) {
            info!("template {}: {} keypoints", t.label, s.len());
        }
        let snapshot: FeatureSnapshot = Arc::new(sets);
        let mut guard = self.features.write().unwrap_or_else(|e| e.into_inner());
        *guard = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Current descriptor snapshot, `None` until features were computed.
    pub fn snapshot(&self) -> Option<FeatureSnapshot> {
        self.features
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
