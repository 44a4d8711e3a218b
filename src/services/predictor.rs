//! Preferred-category prediction service
//!
//! Serves a decision tree trained offline over customer demographics. The
//! artifact is JSON: the tree nodes, the exact training-time feature column
//! order, and the class label set. The serving-side encoder reproduces that
//! column order and the artifact is rejected at load time if the two drift —
//! the encoding is an implicit contract between training and serving, and a
//! silent mismatch would produce silently wrong predictions.
//!
//! The loaded model is shared, read-only, process-wide state: one explicit
//! load at startup, an explicit `reload()`, nothing ambient.

use crate::error::{Result, StoreError};
use crate::types::{Education, EmploymentStatus, Gender, Occupation, UserProfile};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// One-hot column blocks, alphabetical within each block to match the
/// training pipeline's dummy encoding. `Other`/`Unemployed` style values
/// carry no column and encode as all zeros.
const GENDER_COLUMNS: [Gender; 2] = [Gender::Female, Gender::Male];
const EMPLOYMENT_COLUMNS: [EmploymentStatus; 5] = [
    EmploymentStatus::FullTime,
    EmploymentStatus::PartTime,
    EmploymentStatus::Retired,
    EmploymentStatus::SelfEmployed,
    EmploymentStatus::Student,
];
const OCCUPATION_COLUMNS: [Occupation; 6] = [
    Occupation::Admin,
    Occupation::Education,
    Occupation::Sales,
    Occupation::Service,
    Occupation::SkilledTrades,
    Occupation::Tech,
];
const EDUCATION_COLUMNS: [Education; 5] = [
    Education::Bachelor,
    Education::Diploma,
    Education::Doctorate,
    Education::Master,
    Education::Secondary,
];

/// The canonical feature column order the serving encoder produces.
/// Artifacts must declare exactly this list.
pub fn expected_feature_names() -> Vec<String> {
    let mut names = vec![
        "age".to_string(),
        "household_size".to_string(),
        "has_children".to_string(),
        "monthly_income_sgd".to_string(),
    ];
    names.extend(GENDER_COLUMNS.iter().map(|g| format!("gender_{}", g.as_str())));
    names.extend(
        EMPLOYMENT_COLUMNS
            .iter()
            .map(|e| format!("employment_status_{}", e.as_str())),
    );
    names.extend(
        OCCUPATION_COLUMNS
            .iter()
            .map(|o| format!("occupation_{}", o.as_str())),
    );
    names.extend(
        EDUCATION_COLUMNS
            .iter()
            .map(|e| format!("education_{}", e.as_str())),
    );
    names
}

/// A node of the serialized decision tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Internal split: `value[feature] <= threshold` goes left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Leaf: index into `classes` plus the training-set purity as confidence
    Leaf { class: usize, confidence: f64 },
}

/// The persisted model artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeArtifact {
    pub version: String,
    pub feature_names: Vec<String>,
    pub classes: Vec<String>,
    pub default_class: String,
    pub default_confidence: f64,
    pub nodes: Vec<TreeNode>,
}

impl TreeArtifact {
    /// Validate internal consistency and the encoding contract
    fn validate(&self) -> Result<()> {
        let expected = expected_feature_names();
        if self.feature_names != expected {
            return Err(StoreError::Model(format!(
                "feature columns do not match serving encoder (artifact {}, expected {})",
                self.feature_names.len(),
                expected.len()
            )));
        }
        if self.classes.is_empty() {
            return Err(StoreError::Model("artifact has no classes".into()));
        }
        if !self.classes.contains(&self.default_class) {
            return Err(StoreError::Model(format!(
                "default class '{}' is not in the class set",
                self.default_class
            )));
        }
        if self.nodes.is_empty() {
            return Err(StoreError::Model("artifact has no tree nodes".into()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= self.feature_names.len() {
                        return Err(StoreError::Model(format!(
                            "node {} splits on unknown feature {}",
                            i, feature
                        )));
                    }
                    // Children must point forward, which also rules out cycles
                    if *left <= i || *right <= i || *left >= self.nodes.len() || *right >= self.nodes.len()
                    {
                        return Err(StoreError::Model(format!(
                            "node {} has invalid children ({}, {})",
                            i, left, right
                        )));
                    }
                }
                TreeNode::Leaf { class, .. } => {
                    if *class >= self.classes.len() {
                        return Err(StoreError::Model(format!(
                            "node {} references unknown class {}",
                            i, class
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk the tree for an encoded feature vector
    fn traverse(&self, features: &[f64]) -> (usize, f64) {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { class, confidence } => return (*class, *confidence),
            }
        }
    }
}

/// Encode a profile into the canonical feature vector.
/// Returns None when a required field is missing.
pub fn encode_profile(profile: &UserProfile) -> Option<Vec<f64>> {
    let (Some(age), Some(gender), Some(occupation), Some(education)) = (
        profile.age,
        profile.gender,
        profile.occupation,
        profile.education,
    ) else {
        return None;
    };

    let mut features = Vec::with_capacity(22);
    features.push(age as f64);
    features.push(profile.household_size as f64);
    features.push(if profile.has_children { 1.0 } else { 0.0 });
    features.push(profile.monthly_income_cents.unwrap_or(0) as f64 / 100.0);

    for column in GENDER_COLUMNS {
        features.push(if gender == column { 1.0 } else { 0.0 });
    }
    for column in EMPLOYMENT_COLUMNS {
        features.push(if profile.employment_status == Some(column) {
            1.0
        } else {
            0.0
        });
    }
    for column in OCCUPATION_COLUMNS {
        features.push(if occupation == column { 1.0 } else { 0.0 });
    }
    for column in EDUCATION_COLUMNS {
        features.push(if education == column { 1.0 } else { 0.0 });
    }

    Some(features)
}

/// The outcome of a prediction request
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub category_name: String,
    pub confidence: f64,
    /// True when the population-level default was served because the profile
    /// was missing required demographics
    pub fallback: bool,
    pub model_version: String,
}

/// Model status for the admin surface
#[derive(Debug, Clone, Serialize)]
pub struct ModelStatus {
    pub version: String,
    pub classes: Vec<String>,
    pub node_count: usize,
    pub feature_count: usize,
}

/// Serves category predictions from a decision tree loaded once per process
pub struct PredictorService {
    path: PathBuf,
    model: RwLock<Arc<TreeArtifact>>,
}

impl PredictorService {
    /// Load the artifact from disk, validating the encoding contract
    pub fn load(path: &Path) -> Result<Self> {
        let artifact = Self::read_artifact(path)?;
        info!(
            "prediction model '{}' loaded: {} nodes, {} classes",
            artifact.version,
            artifact.nodes.len(),
            artifact.classes.len()
        );
        Ok(Self {
            path: path.to_path_buf(),
            model: RwLock::new(Arc::new(artifact)),
        })
    }

    fn read_artifact(path: &Path) -> Result<TreeArtifact> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Model(format!("cannot read model artifact {}: {}", path.display(), e))
        })?;
        let artifact: TreeArtifact = serde_json::from_str(&raw)
            .map_err(|e| StoreError::Model(format!("malformed model artifact: {}", e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Swap in a freshly read artifact. On failure the old model stays.
    pub fn reload(&self) -> Result<ModelStatus> {
        let artifact = Self::read_artifact(&self.path)?;
        info!("prediction model reloaded: version '{}'", artifact.version);
        let status = ModelStatus {
            version: artifact.version.clone(),
            classes: artifact.classes.clone(),
            node_count: artifact.nodes.len(),
            feature_count: artifact.feature_names.len(),
        };
        match self.model.write() {
            Ok(mut guard) => *guard = Arc::new(artifact),
            Err(poisoned) => *poisoned.into_inner() = Arc::new(artifact),
        }
        Ok(status)
    }

    fn current(&self) -> Arc<TreeArtifact> {
        match self.model.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Predict the preferred category for a profile.
    ///
    /// Incomplete demographics degrade to the artifact's population-level
    /// default rather than failing the caller.
    pub fn predict(&self, profile: &UserProfile) -> Prediction {
        let model = self.current();

        let Some(features) = encode_profile(profile) else {
            warn!(
                "profile for user {} missing required demographics, serving default category",
                profile.user_id
            );
            return Prediction {
                category_name: model.default_class.clone(),
                confidence: model.default_confidence,
                fallback: true,
                model_version: model.version.clone(),
            };
        };

        let (class, confidence) = model.traverse(&features);
        Prediction {
            category_name: model.classes[class].clone(),
            confidence,
            fallback: false,
            model_version: model.version.clone(),
        }
    }

    pub fn status(&self) -> ModelStatus {
        let model = self.current();
        ModelStatus {
            version: model.version.clone(),
            classes: model.classes.clone(),
            node_count: model.nodes.len(),
            feature_count: model.feature_names.len(),
        }
    }
}
