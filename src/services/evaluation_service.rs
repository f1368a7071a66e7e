use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{Error, Result};
use crate::models::attempt::QuizAttempt;
use crate::models::performance::PerformanceFact;
use crate::models::question::{AnswerKeyRow, QuestionScore, QuestionTagRow};
use crate::models::quiz::Quiz;
use crate::services::grading_service::GradingService;
use crate::utils::time;

#[derive(Clone)]
pub struct EvaluationService {
    pool: PgPool,
    timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct EvaluationOutcome {
    pub quiz_id: i32,
    pub course_id: i32,
    pub students_evaluated: usize,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationService {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    /// Grades every attempt of a quiz and rebuilds all derived performance
    /// rows in one transaction. Safe to re-run: each run is a pure function
    /// of the current attempt set and fully replaces the previous output.
    pub async fn evaluate_quiz(&self, quiz_id: i32) -> Result<EvaluationOutcome> {
        let result = match tokio::time::timeout(self.timeout, self.run(quiz_id)).await {
            Ok(result) => result,
            // Dropping the future drops the open transaction, so a timed
            // out run rolls back like any other failure.
            Err(_) => Err(Error::Evaluation(format!(
                "quiz {}: run exceeded {}s",
                quiz_id,
                self.timeout.as_secs()
            ))),
        };

        result.map_err(|e| match e {
            e @ Error::NotFound(_) => e,
            e @ Error::Evaluation(_) => e,
            other => Error::Evaluation(other.to_string()),
        })
    }

    async fn run(&self, quiz_id: i32) -> Result<EvaluationOutcome> {
        let mut tx = self.pool.begin().await?;

        // Locking the quiz row serializes concurrent evaluations of the
        // same quiz; other quizzes proceed in parallel.
        let quiz = sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = $1 FOR UPDATE")
            .bind(quiz_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Quiz {} not found", quiz_id)))?;

        if quiz.is_evaluated {
            tracing::info!(
                "Quiz {} was already evaluated; re-running against the current attempt set",
                quiz_id
            );
        }

        let evaluated_at = time::now();

        let key_rows = sqlx::query_as::<_, AnswerKeyRow>(
            r#"
            SELECT qo.question_id, qo.id AS option_id
            FROM question_option qo
            JOIN questions q ON q.id = qo.question_id
            WHERE q.quiz_id = $1 AND qo.is_correct = TRUE
            ORDER BY qo.question_id, qo.id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&mut *tx)
        .await?;

        let question_scores = sqlx::query_as::<_, QuestionScore>(
            "SELECT id, score FROM questions WHERE quiz_id = $1 ORDER BY id",
        )
        .bind(quiz_id)
        .fetch_all(&mut *tx)
        .await?;

        // Topic and type memberships load separately so one dimension can
        // never inflate the other's tallies.
        let topic_links = sqlx::query_as::<_, QuestionTagRow>(
            r#"
            SELECT qt.question_id, qt.topic_id AS tag_id
            FROM question_topic qt
            JOIN questions q ON q.id = qt.question_id
            WHERE q.quiz_id = $1
            ORDER BY qt.question_id, qt.topic_id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&mut *tx)
        .await?;

        let type_links = sqlx::query_as::<_, QuestionTagRow>(
            r#"
            SELECT qt.question_id, qt.type_id AS tag_id
            FROM question_type qt
            JOIN questions q ON q.id = qt.question_id
            WHERE q.quiz_id = $1
            ORDER BY qt.question_id, qt.type_id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&mut *tx)
        .await?;

        let attempts = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT id, quiz_id, student_id, question_id, selected_option, marks_awarded
            FROM quiz_attempts
            WHERE quiz_id = $1
            ORDER BY student_id, question_id, id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&mut *tx)
        .await?;

        // Everything student-level is computed in memory before the first
        // write.
        let answer_key = GradingService::build_answer_key(&key_rows);
        let classified = GradingService::classify(&attempts, &answer_key);
        let topics = GradingService::tag_index(&topic_links);
        let types = GradingService::tag_index(&type_links);
        let by_topic = GradingService::aggregate_by_tag(&classified, &topics);
        let by_type = GradingService::aggregate_by_tag(&classified, &types);
        let scores = GradingService::score_index(&question_scores);
        let awarded = GradingService::marks_awarded(&classified, &scores);
        let totals = GradingService::total_scores(&awarded);

        tracing::info!(
            "Evaluating quiz {}: {} attempts from {} students",
            quiz_id,
            attempts.len(),
            totals.len()
        );

        // Previous derived rows for this quiz are dropped wholesale, so a
        // re-run replaces instead of accumulating.
        for table in [
            "student_topic_performance",
            "student_type_performance",
            "class_topic_performance",
            "class_type_performance",
        ] {
            sqlx::query(&format!("DELETE FROM {} WHERE quiz_id = $1", table))
                .bind(quiz_id)
                .execute(&mut *tx)
                .await?;
        }

        for entry in &awarded {
            sqlx::query("UPDATE quiz_attempts SET marks_awarded = $1 WHERE id = $2")
                .bind(entry.marks)
                .bind(entry.attempt_id)
                .execute(&mut *tx)
                .await?;
        }

        for (&(student_id, topic_id), tally) in &by_topic {
            sqlx::query(
                r#"
                INSERT INTO student_topic_performance
                    (student_id, course_id, topic_id, quiz_id, total_questions, correct_answers, score, evaluated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(student_id)
            .bind(quiz.course_id)
            .bind(topic_id)
            .bind(quiz_id)
            .bind(tally.total)
            .bind(tally.correct)
            .bind(tally.score_percent())
            .bind(evaluated_at)
            .execute(&mut *tx)
            .await?;
        }

        for (&(student_id, type_id), tally) in &by_type {
            sqlx::query(
                r#"
                INSERT INTO student_type_performance
                    (student_id, course_id, type_id, quiz_id, total_questions, correct_answers, score, evaluated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(student_id)
            .bind(quiz.course_id)
            .bind(type_id)
            .bind(quiz_id)
            .bind(tally.total)
            .bind(tally.correct)
            .bind(tally.score_percent())
            .bind(evaluated_at)
            .execute(&mut *tx)
            .await?;
        }

        for (&student_id, &total) in &totals {
            sqlx::query(
                r#"
                INSERT INTO quiz_results (student_id, quiz_id, score)
                VALUES ($1, $2, $3)
                ON CONFLICT (student_id, quiz_id) DO UPDATE SET score = EXCLUDED.score
                "#,
            )
            .bind(student_id)
            .bind(quiz_id)
            .bind(total)
            .execute(&mut *tx)
            .await?;
        }

        // Class pass: read the student rows just written back through the
        // same transaction and average across students.
        self.write_class_rows(
            &mut tx,
            quiz_id,
            quiz.course_id,
            evaluated_at,
            "student_topic_performance",
            "topic_id",
            "class_topic_performance",
        )
        .await?;
        self.write_class_rows(
            &mut tx,
            quiz_id,
            quiz.course_id,
            evaluated_at,
            "student_type_performance",
            "type_id",
            "class_type_performance",
        )
        .await?;

        sqlx::query("UPDATE quizzes SET is_evaluated = TRUE WHERE id = $1")
            .bind(quiz_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Quiz {} evaluated at {}",
            quiz_id,
            time::to_rfc3339(evaluated_at)
        );

        Ok(EvaluationOutcome {
            quiz_id,
            course_id: quiz.course_id,
            students_evaluated: totals.len(),
            evaluated_at,
        })
    }

    async fn write_class_rows(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        quiz_id: i32,
        course_id: i32,
        evaluated_at: DateTime<Utc>,
        student_table: &str,
        tag_column: &str,
        class_table: &str,
    ) -> Result<()> {
        let facts = sqlx::query_as::<_, PerformanceFact>(&format!(
            r#"
            SELECT {tag} AS tag_id, score, correct_answers, total_questions
            FROM {student_table}
            WHERE quiz_id = $1
            ORDER BY {tag}, student_id
            "#,
            tag = tag_column,
            student_table = student_table,
        ))
        .bind(quiz_id)
        .fetch_all(&mut **tx)
        .await?;

        for (tag_id, stat) in GradingService::class_stats(&facts) {
            sqlx::query(&format!(
                r#"
                INSERT INTO {class_table}
                    (course_id, {tag}, quiz_id, avg_score, avg_accuracy, evaluated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
                class_table = class_table,
                tag = tag_column,
            ))
            .bind(course_id)
            .bind(tag_id)
            .bind(quiz_id)
            .bind(stat.avg_score)
            .bind(stat.avg_accuracy)
            .bind(evaluated_at)
            .execute(&mut **tx)
            .await?;
        }

        Ok(())
    }
}
