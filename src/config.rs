use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One entry of the template bank: a label and the reference image it is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub label: String,
    pub path: PathBuf,
}

impl TemplateSpec {
    pub fn new(label: &str, path: &str) -> TemplateSpec {
        TemplateSpec {
            label: label.to_string(),
            path: PathBuf::from(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub fast_threshold: u8,
    pub max_keypoints: usize,
    pub descriptor_bits: usize,
    pub edge_margin: u32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 20,
            max_keypoints: 1000,
            descriptor_bits: 256,
            edge_margin: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// nearest / second nearest distance ratio
    pub ratio: f32,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { ratio: 0.8 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// squared single image transfer error in px^2
    pub inlier_threshold: f64,
    pub max_iterations: usize,
    pub inlier_percentage: f64,
    /// upper bound on the condition number of a sampled model in normalised coordinates
    pub max_sample_condition: f64,
    pub min_inliers: usize,
    pub seed: u64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            inlier_threshold: 0.5,
            max_iterations: 1500,
            inlier_percentage: 0.6,
            max_sample_condition: 1e4,
            min_inliers: 8,
            seed: 0,
        }
    }
}

/// Which accepted template wins when several would pass the acceptance predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Stop at the first accepted template in bank order.
    #[default]
    FirstMatch,
    /// Evaluate every template and keep the accepted one with the lowest condition number.
    BestConditioned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub program: String,
    pub args: Vec<String>,
    pub repeat_interval_ms: u64,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            program: "espeak".to_string(),
            args: Vec::new(),
            repeat_interval_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub camera_width: u32,
    pub camera_height: u32,
    pub templates: Vec<TemplateSpec>,
    pub overlay_image: PathBuf,
    pub overlay_video: PathBuf,
    pub features: FeatureConfig,
    pub matcher: MatcherConfig,
    pub estimator: EstimatorConfig,
    pub max_condition: f64,
    pub selection: SelectionPolicy,
    pub speech: SpeechConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            camera_width: 224,
            camera_height: 224,
            templates: default_templates(),
            overlay_image: PathBuf::from("assets/overlay.png"),
            overlay_video: PathBuf::from("assets/overlay_video"),
            features: FeatureConfig::default(),
            matcher: MatcherConfig::default(),
            estimator: EstimatorConfig::default(),
            max_condition: 1e6,
            selection: SelectionPolicy::default(),
            speech: SpeechConfig::default(),
        }
    }
}

pub fn default_templates() -> Vec<TemplateSpec> {
    vec![
        TemplateSpec::new("100", "assets/image/100.png"),
        TemplateSpec::new("200", "assets/image/200.png"),
        TemplateSpec::new("500", "assets/image/500.png"),
        TemplateSpec::new("1000", "assets/image/1000.png"),
        TemplateSpec::new("2000", "assets/image/2000.png"),
        TemplateSpec::new("5000", "assets/image/5000.png"),
    ]
}
