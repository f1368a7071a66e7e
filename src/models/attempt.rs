use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Raw fact row: one student's recorded answer to one question of a quiz.
/// Read-only input to evaluation except for `marks_awarded`, which the
/// engine back-fills on every run.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizAttempt {
    pub id: i32,
    pub quiz_id: i32,
    pub student_id: i32,
    pub question_id: i32,
    pub selected_option: Option<i32>,
    pub marks_awarded: i32,
}
