use serde_json::Value;

use crate::entities::crop_analyses;

/// A persisted analysis attempt. `result` stays `None` until the predictor
/// has produced a diagnosis for the stored image.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    pub id: i32,
    pub user_id: i32,
    pub image: String,
    pub result: Option<Value>,
    pub created_at: String,
}

impl From<crop_analyses::Model> for AnalysisRecord {
    fn from(model: crop_analyses::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            image: model.image,
            result: model.result,
            created_at: model.created_at,
        }
    }
}
