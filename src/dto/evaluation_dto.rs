use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateQuizResponse {
    pub message: String,
    pub quiz_id: i32,
    pub students_evaluated: usize,
    pub evaluated_at: DateTime<Utc>,
}
