use derive_getters::Getters;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Getters, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiCoach {
    advice: String,
    rating: Option<f32>,
    grade: Option<String>,
    provider: String,
    model: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl AiCoach {
    pub fn new(
        advice: String,
        rating: Option<f32>,
        grade: Option<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        return Self {
            advice,
            rating,
            grade,
            provider: provider.into(),
            model: model.into(),
            created_at: chrono::Utc::now(),
        };
    }
}
