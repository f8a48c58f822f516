// src/scoring.rs

use std::collections::{HashMap, HashSet};

use sqlx::{FromRow, SqliteConnection};

use crate::error::AppError;

/// One answer as seen by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerKey {
    pub id: i64,
    pub correct: bool,
}

/// One question with its weight and answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionKey {
    pub points: i64,
    pub answers: Vec<AnswerKey>,
}

/// Read-only snapshot of a quiz's scoring structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizKey {
    pub points: i64,
    pub questions: Vec<QuestionKey>,
}

impl QuizKey {
    /// Sum of all question weights, accumulated as a real number.
    pub fn max_points(&self) -> f64 {
        self.questions.iter().map(|q| q.points as f64).sum()
    }
}

impl QuestionKey {
    /// Credit earned on this question for the checked answer set.
    ///
    /// Zero when nothing was checked. Full weight when the question defines no
    /// correct answer. Otherwise `points * user_correct / (correct * checked)`.
    pub fn contribution(&self, checked: &HashSet<i64>) -> f64 {
        let mut user_checked_total = 0u32;
        let mut user_correct = 0u32;
        let mut question_correct_total = 0u32;

        for answer in &self.answers {
            if checked.contains(&answer.id) {
                user_checked_total += 1;
                if answer.correct {
                    user_correct += 1;
                }
            }
            if answer.correct {
                question_correct_total += 1;
            }
        }

        if user_checked_total == 0 {
            0.0
        } else if question_correct_total == 0 {
            self.points as f64
        } else {
            (self.points as f64 * f64::from(user_correct))
                / (f64::from(question_correct_total) * f64::from(user_checked_total))
        }
    }
}

/// Point total for one attempt: `quiz.points - max_points + sum(contributions)`.
///
/// Perfect play yields exactly `quiz.points`; checking nothing yields
/// `quiz.points - max_points`. Ids not belonging to the quiz are ignored.
pub fn score(quiz: &QuizKey, checked: &HashSet<i64>) -> f64 {
    let earned: f64 = quiz
        .questions
        .iter()
        .map(|question| question.contribution(checked))
        .sum();

    quiz.points as f64 + earned - quiz.max_points()
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    points: i64,
}

#[derive(FromRow)]
struct AnswerRow {
    question_id: i64,
    id: i64,
    correct: bool,
}

/// Loads the questions and answers of a quiz, questions in id order.
/// Run it inside the caller's transaction to read one consistent snapshot.
pub async fn load_question_keys(
    conn: &mut SqliteConnection,
    quiz_id: i64,
) -> Result<Vec<QuestionKey>, AppError> {
    let questions: Vec<QuestionRow> =
        sqlx::query_as("SELECT id, points FROM questions WHERE quiz_id = ? ORDER BY id")
            .bind(quiz_id)
            .fetch_all(&mut *conn)
            .await?;

    let answers: Vec<AnswerRow> = sqlx::query_as(
        r#"
        SELECT a.question_id, a.id, a.correct
        FROM answers a
        JOIN questions q ON a.question_id = q.id
        WHERE q.quiz_id = ?
        ORDER BY a.id
        "#,
    )
    .bind(quiz_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_question: HashMap<i64, Vec<AnswerKey>> = HashMap::new();
    for row in answers {
        by_question.entry(row.question_id).or_default().push(AnswerKey {
            id: row.id,
            correct: row.correct,
        });
    }

    Ok(questions
        .into_iter()
        .map(|question| QuestionKey {
            points: question.points,
            answers: by_question.remove(&question.id).unwrap_or_default(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(id: i64, correct: bool) -> AnswerKey {
        AnswerKey { id, correct }
    }

    fn checked(ids: &[i64]) -> HashSet<i64> {
        ids.iter().copied().collect()
    }

    /// Quiz worth 0 with one 10-point question: A1 (id 1) correct, A2 (id 2) not.
    fn single_question_quiz() -> QuizKey {
        QuizKey {
            points: 0,
            questions: vec![QuestionKey {
                points: 10,
                answers: vec![answer(1, true), answer(2, false)],
            }],
        }
    }

    fn mixed_quiz() -> QuizKey {
        QuizKey {
            points: 7,
            questions: vec![
                QuestionKey {
                    points: 3,
                    answers: vec![answer(10, true), answer(11, true), answer(12, false)],
                },
                QuestionKey {
                    points: 1,
                    answers: vec![answer(20, false), answer(21, true)],
                },
                QuestionKey {
                    points: 5,
                    answers: vec![answer(30, false), answer(31, false)],
                },
            ],
        }
    }

    #[test]
    fn single_question_scenarios() {
        let quiz = single_question_quiz();
        assert_eq!(score(&quiz, &checked(&[1])), 0.0);
        assert_eq!(score(&quiz, &checked(&[1, 2])), -5.0);
        assert_eq!(score(&quiz, &checked(&[2])), -10.0);
        assert_eq!(score(&quiz, &checked(&[])), -10.0);
    }

    #[test]
    fn checking_nothing_scores_base_minus_max() {
        let quiz = mixed_quiz();
        assert_eq!(quiz.max_points(), 9.0);
        assert_eq!(score(&quiz, &HashSet::new()), 7.0 - 9.0);
    }

    #[test]
    fn perfect_play_scores_base_points() {
        let quiz = QuizKey {
            points: 4,
            questions: vec![
                QuestionKey {
                    points: 2,
                    answers: vec![answer(1, true), answer(2, false), answer(3, false)],
                },
                mixed_quiz().questions[1].clone(),
            ],
        };
        assert_eq!(score(&quiz, &checked(&[1, 21])), 4.0);
    }

    #[test]
    fn all_correct_on_multi_correct_question_is_not_full_credit() {
        // 3 * 2 / (2 * 2): the precision x recall product divides by both counts.
        let quiz = mixed_quiz();
        assert_eq!(quiz.questions[0].contribution(&checked(&[10, 11])), 1.5);
    }

    #[test]
    fn zero_correct_question_awards_full_weight_for_any_subset() {
        let quiz = mixed_quiz();
        let question = &quiz.questions[2];
        for subset in [&[30][..], &[31], &[30, 31]] {
            assert_eq!(question.contribution(&checked(subset)), 5.0);
        }
        assert_eq!(question.contribution(&checked(&[])), 0.0);
    }

    #[test]
    fn partial_credit_is_fractional() {
        // 2 correct answers, 1 of them checked plus 1 wrong: 3 * 1 / (2 * 2).
        let quiz = mixed_quiz();
        let question = &quiz.questions[0];
        assert_eq!(question.contribution(&checked(&[10, 12])), 0.75);
        // Only correct ones but not all of them: 3 * 1 / (2 * 1).
        assert_eq!(question.contribution(&checked(&[11])), 1.5);
    }

    #[test]
    fn foreign_answer_ids_are_ignored() {
        let quiz = single_question_quiz();
        assert_eq!(
            score(&quiz, &checked(&[1, 999])),
            score(&quiz, &checked(&[1]))
        );
    }

    #[test]
    fn quiz_without_questions_scores_its_base() {
        let quiz = QuizKey {
            points: -3,
            questions: Vec::new(),
        };
        assert_eq!(score(&quiz, &checked(&[1, 2, 3])), -3.0);
    }

    #[test]
    fn combined_quiz_total() {
        // 7 - 9 + 0.75 + 1 + 5
        let quiz = mixed_quiz();
        assert_eq!(score(&quiz, &checked(&[10, 12, 21, 31])), 4.75);
    }

    #[test]
    fn extreme_weights_do_not_overflow() {
        let quiz = QuizKey {
            points: 0,
            questions: vec![
                QuestionKey {
                    points: i64::MAX,
                    answers: vec![answer(1, true)],
                },
                QuestionKey {
                    points: i64::MAX,
                    answers: vec![answer(2, true)],
                },
            ],
        };
        let total = score(&quiz, &checked(&[1, 2]));
        assert!(total.is_finite());
        assert_eq!(total, 0.0);
        assert!(score(&quiz, &checked(&[])) < 0.0);
    }

    #[tokio::test]
    async fn stored_structure_scores_like_the_literal_key() {
        let pool = crate::db::connect("sqlite::memory:").await.unwrap();
        crate::db::migrate(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO users (id, email, username, password, created_at) VALUES (1, 'a@b.c', 'a', 'x', '2024-01-01 00:00:00')",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO quizzes (id, name, points, author_id, date) VALUES (1, 'q', 0, 1, '2024-01-01 00:00:00')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO questions (id, quiz_id, value, points) VALUES (1, 1, 'v', 10)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO answers (id, question_id, value, correct) VALUES (1, 1, 'a', TRUE), (2, 1, 'b', FALSE)")
            .execute(&pool)
            .await
            .unwrap();

        let mut conn = pool.acquire().await.unwrap();
        let questions = load_question_keys(&mut *conn, 1).await.unwrap();
        assert_eq!(questions, single_question_quiz().questions);

        let quiz = QuizKey {
            points: 0,
            questions,
        };
        assert_eq!(score(&quiz, &checked(&[1, 2])), -5.0);
        assert!(load_question_keys(&mut *conn, 2).await.unwrap().is_empty());
    }
}
