use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-student tallies for one topic of one quiz. Owned and fully
/// rewritten by the evaluation engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentTopicPerformance {
    pub id: i32,
    pub student_id: i32,
    pub course_id: i32,
    pub topic_id: i32,
    pub quiz_id: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub score: i32,
    pub evaluated_at: DateTime<Utc>,
}

/// Per-student tallies for one question type of one quiz.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct StudentTypePerformance {
    pub id: i32,
    pub student_id: i32,
    pub course_id: i32,
    pub type_id: i32,
    pub quiz_id: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub score: i32,
    pub evaluated_at: DateTime<Utc>,
}

/// Class-wide averages for one topic of one quiz, derived from the
/// student rows of the same run.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassTopicPerformance {
    pub id: i32,
    pub course_id: i32,
    pub topic_id: i32,
    pub quiz_id: i32,
    pub avg_score: f64,
    pub avg_accuracy: f64,
    pub evaluated_at: DateTime<Utc>,
}

/// Class-wide averages for one question type of one quiz.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ClassTypePerformance {
    pub id: i32,
    pub course_id: i32,
    pub type_id: i32,
    pub quiz_id: i32,
    pub avg_score: f64,
    pub avg_accuracy: f64,
    pub evaluated_at: DateTime<Utc>,
}

/// Projection shared by the two student performance tables when they are
/// read back for the class-level pass; topic_id or type_id is aliased to
/// tag_id by the query.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PerformanceFact {
    pub tag_id: i32,
    pub score: i32,
    pub correct_answers: i32,
    pub total_questions: i32,
}

/// Total points a student scored on a quiz, unique per (student, quiz).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizResult {
    pub id: i32,
    pub student_id: i32,
    pub quiz_id: i32,
    pub score: i32,
}
