use serde::{Deserialize, Serialize};

use crate::remedies::RemedyRecord;

/// Output of a single forward pass: the arg-max label, its probability
/// scaled to a percentage (two decimals), and the full probability vector
/// in label-list order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
    pub probabilities: Vec<f32>,
}

/// The result of one upload, held in the session cookie and overwritten by
/// the next prediction. Carries the label list alongside the probability
/// vector so the result and chart pages can re-render without touching the
/// classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub username: String,
    pub filename: String,
    pub disease: String,
    pub confidence: f64,
    pub remedy: RemedyRecord,
    pub labels: Vec<String>,
    pub values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    pub username: String,
    pub password: String,
}
