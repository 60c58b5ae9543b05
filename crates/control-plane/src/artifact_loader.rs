//! Concrete `ArtifactLoader`: reads a small JSON manifest from disk and
//! turns it into a `Predictor` computed with a linear score + softmax.
//!
//! The registry only requires `predict_proba` and `feature_names` (spec
//! §9's capability-trait note: "the core never inspects the concrete model,
//! only calls the capability methods") — it has no opinion on what backs
//! them. Rather than bind a specific boosted-tree or tensor runtime (no such
//! crate appears anywhere in the corpus this was grounded on), artifacts are
//! a flat `{feature_names, weights: [[f64; n]; 3], bias: [f64; 3]}` manifest,
//! one row of weights per class (`sell`, `hold`, `buy`), scored the way
//! `original_source/app/ai/models/linear.py` evaluates its fallback model
//! before handing off to a heavier framework.

use std::fs;
use std::sync::Arc;

use analysis_core::{CoreError, Predictor};
use model_registry::ArtifactLoader;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
struct Manifest {
    feature_names: Vec<String>,
    weights: [Vec<f64>; 3],
    bias: [f64; 3],
}

struct LinearPredictor {
    feature_names: Vec<String>,
    weights: [Vec<f64>; 3],
    bias: [f64; 3],
}

fn softmax(logits: [f64; 3]) -> [f64; 3] {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        return [1.0 / 3.0; 3];
    }
    [exp[0] / sum, exp[1] / sum, exp[2] / sum]
}

impl Predictor for LinearPredictor {
    fn predict_proba(&self, features: &[f64]) -> [f64; 3] {
        let mut logits = [0.0; 3];
        for (class, (weights, bias)) in self.weights.iter().zip(self.bias.iter()).enumerate() {
            let dot: f64 = weights.iter().zip(features.iter()).map(|(w, f)| w * f).sum();
            logits[class] = dot + bias;
        }
        softmax(logits)
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

pub struct JsonArtifactLoader;

impl ArtifactLoader for JsonArtifactLoader {
    fn load(&self, artifact_path: &str) -> Result<Arc<dyn Predictor + Send + Sync>, CoreError> {
        let raw = fs::read_to_string(artifact_path)
            .map_err(|e| CoreError::InvalidData(format!("reading {artifact_path}: {e}")))?;
        let manifest: Manifest = serde_json::from_str(&raw)
            .map_err(|e| CoreError::InvalidData(format!("parsing manifest {artifact_path}: {e}")))?;

        if manifest.weights.iter().any(|row| row.len() != manifest.feature_names.len()) {
            return Err(CoreError::InvalidData(format!(
                "manifest {artifact_path}: weight row length must match feature_names length"
            )));
        }

        Ok(Arc::new(LinearPredictor {
            feature_names: manifest.feature_names,
            weights: manifest.weights,
            bias: manifest.bias,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softmax_rows_sum_to_one() {
        let probs = softmax([1.0, 0.0, -1.0]);
        let total: f64 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn predict_proba_matches_feature_row_length() {
        let predictor = LinearPredictor {
            feature_names: vec!["a".to_string(), "b".to_string()],
            weights: [vec![1.0, 0.0], vec![0.0, 0.0], vec![0.0, 1.0]],
            bias: [0.0, 0.0, 0.0],
        };
        let probs = predictor.predict_proba(&[2.0, 0.5]);
        assert!(probs[0] > probs[1]);
    }
}
