use std::collections::{BTreeMap, HashMap};

use crate::models::attempt::QuizAttempt;
use crate::models::performance::PerformanceFact;
use crate::models::question::{AnswerKeyRow, QuestionScore, QuestionTagRow};

/// question_id -> id of its correct option. Questions with no option
/// marked correct have no entry and can never be answered correctly.
pub type AnswerKeyIndex = HashMap<i32, i32>;

/// One attempt after correctness determination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedAttempt {
    pub attempt_id: i32,
    pub student_id: i32,
    pub question_id: i32,
    pub is_correct: bool,
}

/// Running tally for one (student, tag) group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total: i32,
    pub correct: i32,
}

impl Tally {
    /// Percentage of correct answers, rounded to the nearest integer.
    /// An empty group scores 0 rather than dividing by zero.
    pub fn score_percent(&self) -> i32 {
        if self.total > 0 {
            (100.0 * self.correct as f64 / self.total as f64).round() as i32
        } else {
            0
        }
    }
}

/// Marks granted to a single attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardedMarks {
    pub attempt_id: i32,
    pub student_id: i32,
    pub marks: i32,
}

/// Class-wide averages for one tag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassStat {
    pub avg_score: f64,
    pub avg_accuracy: f64,
}

pub struct GradingService;

impl GradingService {
    pub fn build_answer_key(rows: &[AnswerKeyRow]) -> AnswerKeyIndex {
        let mut key = AnswerKeyIndex::new();
        for row in rows {
            // First marked option wins if the data violates the
            // single-correct-option assumption.
            key.entry(row.question_id).or_insert(row.option_id);
        }
        key
    }

    /// Determines correctness for every raw attempt. A blank selection or
    /// a question absent from the key classifies as incorrect; a malformed
    /// question degrades to unanswerable instead of failing the run.
    pub fn classify(attempts: &[QuizAttempt], key: &AnswerKeyIndex) -> Vec<ClassifiedAttempt> {
        attempts
            .iter()
            .map(|attempt| {
                let is_correct = match (attempt.selected_option, key.get(&attempt.question_id)) {
                    (Some(selected), Some(&correct)) => selected == correct,
                    _ => false,
                };
                ClassifiedAttempt {
                    attempt_id: attempt.id,
                    student_id: attempt.student_id,
                    question_id: attempt.question_id,
                    is_correct,
                }
            })
            .collect()
    }

    /// question_id -> tags it carries, for one dimension (topic or type).
    pub fn tag_index(rows: &[QuestionTagRow]) -> HashMap<i32, Vec<i32>> {
        let mut index: HashMap<i32, Vec<i32>> = HashMap::new();
        for row in rows {
            index.entry(row.question_id).or_default().push(row.tag_id);
        }
        index
    }

    /// Folds classified attempts into (student, tag) tallies. An attempt on
    /// a question carrying several tags counts once under each of them; the
    /// topic and type dimensions go through separate indexes, so neither
    /// inflates the other. The BTreeMap keeps output ordering deterministic.
    pub fn aggregate_by_tag(
        classified: &[ClassifiedAttempt],
        tags: &HashMap<i32, Vec<i32>>,
    ) -> BTreeMap<(i32, i32), Tally> {
        let mut groups: BTreeMap<(i32, i32), Tally> = BTreeMap::new();
        for record in classified {
            let tag_ids = match tags.get(&record.question_id) {
                Some(tag_ids) => tag_ids,
                None => continue,
            };
            for &tag_id in tag_ids {
                let tally = groups.entry((record.student_id, tag_id)).or_default();
                tally.total += 1;
                if record.is_correct {
                    tally.correct += 1;
                }
            }
        }
        groups
    }

    pub fn score_index(scores: &[QuestionScore]) -> HashMap<i32, i32> {
        scores.iter().map(|q| (q.id, q.score)).collect()
    }

    /// Awards the question's full marks for a correct attempt, 0 otherwise.
    /// An attempt on a question missing from the score index (deleted
    /// upstream) earns 0.
    pub fn marks_awarded(
        classified: &[ClassifiedAttempt],
        scores: &HashMap<i32, i32>,
    ) -> Vec<AwardedMarks> {
        classified
            .iter()
            .map(|record| {
                let marks = if record.is_correct {
                    scores.get(&record.question_id).copied().unwrap_or(0)
                } else {
                    0
                };
                AwardedMarks {
                    attempt_id: record.attempt_id,
                    student_id: record.student_id,
                    marks,
                }
            })
            .collect()
    }

    /// Sums awarded marks per student. Every student with at least one
    /// attempt gets an entry, including all-wrong students with total 0.
    pub fn total_scores(awarded: &[AwardedMarks]) -> BTreeMap<i32, i32> {
        let mut totals = BTreeMap::new();
        for entry in awarded {
            *totals.entry(entry.student_id).or_insert(0) += entry.marks;
        }
        totals
    }

    /// Averages the per-student rows of one dimension into class statistics:
    /// mean score percentage and mean accuracy across students, per tag.
    pub fn class_stats(facts: &[PerformanceFact]) -> BTreeMap<i32, ClassStat> {
        let mut sums: BTreeMap<i32, (f64, f64, u32)> = BTreeMap::new();
        for fact in facts {
            let accuracy = if fact.total_questions > 0 {
                fact.correct_answers as f64 / fact.total_questions as f64
            } else {
                0.0
            };
            let entry = sums.entry(fact.tag_id).or_insert((0.0, 0.0, 0));
            entry.0 += fact.score as f64;
            entry.1 += accuracy;
            entry.2 += 1;
        }
        sums.into_iter()
            .map(|(tag_id, (score_sum, accuracy_sum, count))| {
                let count = count as f64;
                (
                    tag_id,
                    ClassStat {
                        avg_score: score_sum / count,
                        avg_accuracy: accuracy_sum / count,
                    },
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(id: i32, student_id: i32, question_id: i32, selected: Option<i32>) -> QuizAttempt {
        QuizAttempt {
            id,
            quiz_id: 1,
            student_id,
            question_id,
            selected_option: selected,
            marks_awarded: 0,
        }
    }

    fn key_row(question_id: i32, option_id: i32) -> AnswerKeyRow {
        AnswerKeyRow {
            question_id,
            option_id,
        }
    }

    fn tag_row(question_id: i32, tag_id: i32) -> QuestionTagRow {
        QuestionTagRow {
            question_id,
            tag_id,
        }
    }

    #[test]
    fn answer_key_maps_question_to_correct_option() {
        let key = GradingService::build_answer_key(&[key_row(1, 10), key_row(2, 21)]);
        assert_eq!(key.get(&1), Some(&10));
        assert_eq!(key.get(&2), Some(&21));
        assert_eq!(key.get(&3), None);
    }

    #[test]
    fn answer_key_keeps_first_option_on_duplicate_marks() {
        let key = GradingService::build_answer_key(&[key_row(1, 10), key_row(1, 11)]);
        assert_eq!(key.get(&1), Some(&10));
    }

    #[test]
    fn classify_matches_selection_against_key() {
        let key = GradingService::build_answer_key(&[key_row(1, 10)]);
        let classified = GradingService::classify(
            &[attempt(100, 7, 1, Some(10)), attempt(101, 8, 1, Some(11))],
            &key,
        );
        assert!(classified[0].is_correct);
        assert!(!classified[1].is_correct);
    }

    #[test]
    fn classify_treats_blank_selection_as_incorrect() {
        let key = GradingService::build_answer_key(&[key_row(1, 10)]);
        let classified = GradingService::classify(&[attempt(100, 7, 1, None)], &key);
        assert!(!classified[0].is_correct);
    }

    #[test]
    fn question_without_correct_option_is_never_right() {
        // Question 2 has no key entry; whatever the student picked loses.
        let key = GradingService::build_answer_key(&[key_row(1, 10)]);
        let classified = GradingService::classify(&[attempt(100, 7, 2, Some(20))], &key);
        assert!(!classified[0].is_correct);
    }

    #[test]
    fn multi_tag_question_counts_once_per_tag() {
        let key = GradingService::build_answer_key(&[key_row(1, 10)]);
        let classified = GradingService::classify(&[attempt(100, 7, 1, Some(10))], &key);
        let tags = GradingService::tag_index(&[tag_row(1, 50), tag_row(1, 51)]);

        let groups = GradingService::aggregate_by_tag(&classified, &tags);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&(7, 50)], Tally { total: 1, correct: 1 });
        assert_eq!(groups[&(7, 51)], Tally { total: 1, correct: 1 });
    }

    #[test]
    fn untagged_question_contributes_to_no_group() {
        let key = GradingService::build_answer_key(&[key_row(1, 10)]);
        let classified = GradingService::classify(&[attempt(100, 7, 1, Some(10))], &key);
        let tags = GradingService::tag_index(&[]);
        assert!(GradingService::aggregate_by_tag(&classified, &tags).is_empty());
    }

    #[test]
    fn correct_answers_conserve_within_a_dimension() {
        // Student 7: q1 correct, q2 wrong, q3 correct. q1 and q3 share a
        // topic, q2 has its own. Per-topic corrects must sum back to the
        // student's correct attempts on tagged questions.
        let key =
            GradingService::build_answer_key(&[key_row(1, 10), key_row(2, 20), key_row(3, 30)]);
        let classified = GradingService::classify(
            &[
                attempt(100, 7, 1, Some(10)),
                attempt(101, 7, 2, Some(99)),
                attempt(102, 7, 3, Some(30)),
            ],
            &key,
        );
        let tags = GradingService::tag_index(&[tag_row(1, 50), tag_row(2, 51), tag_row(3, 50)]);

        let groups = GradingService::aggregate_by_tag(&classified, &tags);
        let correct_sum: i32 = groups.values().map(|t| t.correct).sum();
        let total_sum: i32 = groups.values().map(|t| t.total).sum();
        assert_eq!(correct_sum, 2);
        assert_eq!(total_sum, 3);
        assert_eq!(groups[&(7, 50)], Tally { total: 2, correct: 2 });
        assert_eq!(groups[&(7, 51)], Tally { total: 1, correct: 0 });
    }

    #[test]
    fn score_percent_rounds_and_guards_zero() {
        assert_eq!(Tally { total: 3, correct: 2 }.score_percent(), 67);
        assert_eq!(Tally { total: 3, correct: 1 }.score_percent(), 33);
        assert_eq!(Tally { total: 1, correct: 1 }.score_percent(), 100);
        assert_eq!(Tally { total: 0, correct: 0 }.score_percent(), 0);
    }

    #[test]
    fn marks_follow_question_score() {
        let key = GradingService::build_answer_key(&[key_row(1, 10), key_row(2, 20)]);
        let classified = GradingService::classify(
            &[
                attempt(100, 7, 1, Some(10)),
                attempt(101, 7, 2, Some(99)),
                attempt(102, 8, 1, Some(10)),
            ],
            &key,
        );
        let scores = GradingService::score_index(&[
            QuestionScore { id: 1, score: 5 },
            QuestionScore { id: 2, score: 3 },
        ]);

        let awarded = GradingService::marks_awarded(&classified, &scores);
        assert_eq!(awarded[0].marks, 5);
        assert_eq!(awarded[1].marks, 0);
        assert_eq!(awarded[2].marks, 5);

        let totals = GradingService::total_scores(&awarded);
        assert_eq!(totals[&7], 5);
        assert_eq!(totals[&8], 5);
    }

    #[test]
    fn all_wrong_student_still_gets_a_zero_total() {
        let key = GradingService::build_answer_key(&[key_row(1, 10)]);
        let classified = GradingService::classify(&[attempt(100, 7, 1, Some(11))], &key);
        let scores = GradingService::score_index(&[QuestionScore { id: 1, score: 5 }]);

        let totals = GradingService::total_scores(&GradingService::marks_awarded(
            &classified,
            &scores,
        ));
        assert_eq!(totals[&7], 0);
    }

    #[test]
    fn deleted_question_awards_no_marks() {
        let key = GradingService::build_answer_key(&[key_row(1, 10)]);
        let classified = GradingService::classify(&[attempt(100, 7, 1, Some(10))], &key);
        // Question 1 vanished from the score index.
        let awarded = GradingService::marks_awarded(&classified, &HashMap::new());
        assert_eq!(awarded[0].marks, 0);
    }

    #[test]
    fn class_stats_average_across_students() {
        // One student aced the topic, one missed it: avg_score 50,
        // avg_accuracy 0.5.
        let facts = vec![
            PerformanceFact {
                tag_id: 50,
                score: 100,
                correct_answers: 1,
                total_questions: 1,
            },
            PerformanceFact {
                tag_id: 50,
                score: 0,
                correct_answers: 0,
                total_questions: 1,
            },
        ];
        let stats = GradingService::class_stats(&facts);
        assert_eq!(stats[&50].avg_score, 50.0);
        assert_eq!(stats[&50].avg_accuracy, 0.5);
    }

    #[test]
    fn class_stats_keep_tags_separate() {
        let facts = vec![
            PerformanceFact {
                tag_id: 50,
                score: 67,
                correct_answers: 2,
                total_questions: 3,
            },
            PerformanceFact {
                tag_id: 51,
                score: 100,
                correct_answers: 2,
                total_questions: 2,
            },
        ];
        let stats = GradingService::class_stats(&facts);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[&50].avg_score, 67.0);
        assert!((stats[&50].avg_accuracy - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(stats[&51].avg_score, 100.0);
        assert_eq!(stats[&51].avg_accuracy, 1.0);
    }
}
