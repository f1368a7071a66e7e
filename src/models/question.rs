use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Marks available for one question, joined in during grading.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionScore {
    pub id: i32,
    pub score: i32,
}

/// One entry of a quiz answer key: the option marked correct for a question.
/// Questions without a marked-correct option never produce a row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnswerKeyRow {
    pub question_id: i32,
    pub option_id: i32,
}

/// Link from a question to one topic or type tag. The same shape serves
/// both dimensions; which one depends on the join table queried.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionTagRow {
    pub question_id: i32,
    pub tag_id: i32,
}
