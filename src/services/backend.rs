use crate::services::resources::ResourceError;
use serde::{Deserialize, Serialize};

/// Supported scoring backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    CollaborativeFiltering,
    GradientBoosting,
    TransformerPipeline,
}

impl ResourceKind {
    /// Parse an untrusted kind string from a resource config
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "collaborative_filtering" => Some(Self::CollaborativeFiltering),
            "gradient_boosting" => Some(Self::GradientBoosting),
            "transformer_pipeline" | "transformer" => Some(Self::TransformerPipeline),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CollaborativeFiltering => "collaborative_filtering",
            Self::GradientBoosting => "gradient_boosting",
            Self::TransformerPipeline => "transformer_pipeline",
        }
    }
}

/// Declarative configuration for a scoring resource. Retained verbatim by
/// the manager so `reload` can reconstruct the backend from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub kind: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(rename = "modelName", alias = "model_name", default)]
    pub model_name: Option<String>,
    #[serde(rename = "maxLength", alias = "max_length", default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub target: Option<String>,
}

impl ResourceConfig {
    pub fn collaborative_filtering(features: &[&str]) -> Self {
        Self {
            kind: "collaborative_filtering".to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
            model_name: None,
            max_length: None,
            target: None,
        }
    }

    pub fn gradient_boosting(features: &[&str], target: &str) -> Self {
        Self {
            kind: "gradient_boosting".to_string(),
            features: features.iter().map(|f| f.to_string()).collect(),
            model_name: None,
            max_length: None,
            target: Some(target.to_string()),
        }
    }

    pub fn transformer_pipeline(model_name: &str, max_length: usize) -> Self {
        Self {
            kind: "transformer_pipeline".to_string(),
            features: vec![],
            model_name: Some(model_name.to_string()),
            max_length: Some(max_length),
            target: None,
        }
    }
}

/// A constructed scoring backend, dispatched by kind.
/// Each variant carries only the fields relevant to that kind.
#[derive(Debug, Clone)]
pub enum ScoringBackend {
    CollaborativeFiltering(CollaborativeFilteringBackend),
    GradientBoosting(GradientBoostingBackend),
    TransformerPipeline(TransformerPipelineBackend),
}

#[derive(Debug, Clone)]
pub struct CollaborativeFilteringBackend {
    pub features: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct GradientBoostingBackend {
    pub features: Vec<String>,
    pub target: Option<String>,
    pub n_estimators: u32,
    pub learning_rate: f64,
    pub max_depth: u32,
    /// Pre-trained weights would flip this; the stub backend never trains
    pub trained: bool,
}

#[derive(Debug, Clone)]
pub struct TransformerPipelineBackend {
    pub model_name: String,
    pub max_length: usize,
}

impl ScoringBackend {
    /// Construct a backend for the given kind.
    ///
    /// Construction may be long-running for real backends; the manager
    /// wraps this call in a timeout.
    pub async fn construct(
        kind: ResourceKind,
        config: &ResourceConfig,
    ) -> Result<Self, ResourceError> {
        match kind {
            ResourceKind::CollaborativeFiltering => {
                Ok(Self::CollaborativeFiltering(CollaborativeFilteringBackend {
                    features: config.features.clone(),
                }))
            }
            ResourceKind::GradientBoosting => {
                Ok(Self::GradientBoosting(GradientBoostingBackend {
                    features: config.features.clone(),
                    target: config.target.clone(),
                    n_estimators: 100,
                    learning_rate: 0.1,
                    max_depth: 3,
                    trained: false,
                }))
            }
            ResourceKind::TransformerPipeline => {
                let model_name = config
                    .model_name
                    .clone()
                    .unwrap_or_else(|| "bert-base-uncased".to_string());

                if model_name.is_empty() {
                    return Err(ResourceError::ConstructionFailed {
                        reason: "transformer model name must not be empty".to_string(),
                    });
                }

                Ok(Self::TransformerPipeline(TransformerPipelineBackend {
                    model_name,
                    max_length: config.max_length.unwrap_or(512),
                }))
            }
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::CollaborativeFiltering(_) => ResourceKind::CollaborativeFiltering,
            Self::GradientBoosting(_) => ResourceKind::GradientBoosting,
            Self::TransformerPipeline(_) => ResourceKind::TransformerPipeline,
        }
    }

    /// Rough per-kind resident footprint used for usage reporting
    pub fn estimated_memory_mb(&self) -> u64 {
        match self {
            Self::CollaborativeFiltering(_) => 256,
            Self::GradientBoosting(_) => 128,
            Self::TransformerPipeline(_) => 1024,
        }
    }
}
