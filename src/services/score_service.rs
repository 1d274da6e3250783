use crate::dto::score_dto::{EditScoreRequest, ScoreFilter, SubmitAnswer};
use crate::error::{Error, Result};
use crate::models::quiz::Quiz;
use crate::models::score::{AnswerRecord, Score, ScoreEdit};
use crate::models::user::{User, ADMIN_ROLES, ROLE_SUPER_ADMIN};
use crate::services::scoring::{ScoringService, SubmittedAnswer};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ScoreService {
    pool: PgPool,
}

/// Who is performing an audited edit. Built from the request claims.
#[derive(Debug, Clone)]
pub struct EditorContext {
    pub id: Uuid,
    pub role: String,
    pub college: String,
}

/// Exactly one edit target per request.
#[derive(Debug, Clone, PartialEq)]
pub enum EditTarget {
    Total { new_percentage: Decimal },
    Question { index: usize, new_score: Decimal },
    Instruction { index: usize, new_score: Decimal },
}

impl EditTarget {
    /// Validates the request shape: a mandatory non-blank reason, exactly
    /// one target, and values inside [0, 100].
    pub fn parse(req: &EditScoreRequest) -> Result<(EditTarget, String)> {
        let reason = req.reason.trim();
        if reason.is_empty() {
            return Err(Error::BadRequest(
                "A non-empty reason is required for score edits".to_string(),
            ));
        }

        let target = match (
            req.new_total_percentage,
            req.new_question_score,
            req.new_instruction_score,
        ) {
            (Some(p), None, None) => {
                if req.question_index.is_some() {
                    return Err(Error::BadRequest(
                        "question_index is not valid for a total-score edit".to_string(),
                    ));
                }
                EditTarget::Total {
                    new_percentage: in_range(p)?,
                }
            }
            (None, Some(s), None) => EditTarget::Question {
                index: question_index(req)?,
                new_score: in_range(s)?,
            },
            (None, None, Some(s)) => EditTarget::Instruction {
                index: question_index(req)?,
                new_score: in_range(s)?,
            },
            (None, None, None) => {
                return Err(Error::BadRequest(
                    "One of new_total_percentage, new_question_score or new_instruction_score is required".to_string(),
                ))
            }
            _ => {
                return Err(Error::BadRequest(
                    "Only one score value may be edited per request".to_string(),
                ))
            }
        };

        Ok((target, reason.to_string()))
    }
}

fn question_index(req: &EditScoreRequest) -> Result<usize> {
    match req.question_index {
        Some(i) if i >= 0 => Ok(i as usize),
        Some(_) => Err(Error::BadRequest(
            "question_index must not be negative".to_string(),
        )),
        None => Err(Error::BadRequest(
            "question_index is required for per-question edits".to_string(),
        )),
    }
}

fn in_range(value: f64) -> Result<Decimal> {
    let d = Decimal::from_f64(value)
        .ok_or_else(|| Error::BadRequest("Score value is not a valid number".to_string()))?;
    if d < Decimal::ZERO || d > Decimal::from(100) {
        return Err(Error::BadRequest(
            "Score value must lie in [0, 100]".to_string(),
        ));
    }
    Ok(d)
}

impl ScoreService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Grades a submission and persists the score with a snapshot of the
    /// quiz ceiling. Returns the score and whether the quiz had to fall
    /// back to the default ceiling.
    pub async fn submit_quiz(
        &self,
        quiz: &Quiz,
        student: &User,
        answers: Vec<SubmitAnswer>,
    ) -> Result<(Score, bool)> {
        let questions = crate::services::quiz_service::parse_questions(&quiz.questions)?;
        let submitted: Vec<SubmittedAnswer> = answers
            .into_iter()
            .map(|a| SubmittedAnswer {
                question_id: a.question_id,
                selected_option: a.selected_option,
                ranking: a.ranking,
                reasoning: a.reasoning,
            })
            .collect();

        let outcome = ScoringService::grade(&questions, &submitted);
        let normalized = ScoringService::normalize(outcome.percentage, quiz.max_marks);
        if normalized.misconfigured {
            tracing::warn!(quiz_id = %quiz.id, "Quiz has no usable max_marks; defaulted to 100");
        }

        let answers_json = serde_json::to_value(&outcome.answers)?;
        let score = sqlx::query_as::<_, Score>(
            r#"
            INSERT INTO scores (
                quiz_id, student_id, student_name, quiz_title, college,
                percentage, total_score, max_marks, answers
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(quiz.id)
        .bind(student.id)
        .bind(&student.name)
        .bind(&quiz.title)
        .bind(&student.college)
        .bind(outcome.percentage)
        .bind(normalized.marks)
        .bind(normalized.ceiling)
        .bind(&answers_json)
        .fetch_one(&self.pool)
        .await?;

        Ok((score, normalized.misconfigured))
    }

    pub async fn get_score(&self, score_id: Uuid) -> Result<Score> {
        let score = sqlx::query_as::<_, Score>(r#"SELECT * FROM scores WHERE id = $1"#)
            .bind(score_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(score)
    }

    pub async fn list_scores(&self, filter: ScoreFilter) -> Result<Vec<Score>> {
        let scores = sqlx::query_as::<_, Score>(
            r#"
            SELECT * FROM scores
            WHERE ($1::uuid IS NULL OR quiz_id = $1)
              AND ($2::uuid IS NULL OR student_id = $2)
              AND ($3::varchar IS NULL OR college = $3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(filter.quiz_id)
        .bind(filter.student_id)
        .bind(filter.college)
        .fetch_all(&self.pool)
        .await?;
        Ok(scores)
    }

    pub async fn list_edits(&self, score_id: Uuid) -> Result<Vec<ScoreEdit>> {
        let edits = sqlx::query_as::<_, ScoreEdit>(
            r#"SELECT * FROM score_edits WHERE score_id = $1 ORDER BY created_at ASC, id ASC"#,
        )
        .bind(score_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(edits)
    }

    /// Applies an audited admin edit. Marks are re-derived through the
    /// normalization routine against the stored ceiling snapshot; the audit
    /// row is appended in the same call. Last write wins on concurrent
    /// edits.
    ///
    /// Per-question edits re-derive the percentage from the answer records,
    /// so they supersede any earlier total-percentage override; the audit
    /// trail still carries the override as its own `total` entry.
    pub async fn edit_score(
        &self,
        score_id: Uuid,
        target: EditTarget,
        reason: &str,
        editor: &EditorContext,
    ) -> Result<(Score, ScoreEdit)> {
        let score = self.get_score(score_id).await?;

        if !ADMIN_ROLES
            .iter()
            .any(|r| r.eq_ignore_ascii_case(&editor.role))
        {
            return Err(Error::Forbidden(
                "Only admins may edit scores".to_string(),
            ));
        }
        if !editor.role.eq_ignore_ascii_case(ROLE_SUPER_ADMIN) && editor.college != score.college {
            return Err(Error::Forbidden(
                "Editors may only modify scores in their own college".to_string(),
            ));
        }

        let mut answers: Vec<AnswerRecord> = serde_json::from_value(score.answers.clone())?;

        let (field, question_index, old_value, new_value, new_percentage) = match target {
            EditTarget::Total { new_percentage } => {
                ("total", None, score.percentage, new_percentage, new_percentage)
            }
            EditTarget::Question { index, new_score } => {
                let record = answers.get_mut(index).ok_or_else(|| {
                    Error::BadRequest(format!("question_index {} is out of range", index))
                })?;
                if new_score > Decimal::from(record.max_points) {
                    return Err(Error::BadRequest(format!(
                        "Score value exceeds the question maximum of {}",
                        record.max_points
                    )));
                }
                let old = record.points_awarded;
                record.points_awarded = new_score;
                let percentage = recompute_percentage(&answers, score.percentage);
                ("question", Some(index as i32), old, new_score, percentage)
            }
            EditTarget::Instruction { index, new_score } => {
                let record = answers.get_mut(index).ok_or_else(|| {
                    Error::BadRequest(format!("question_index {} is out of range", index))
                })?;
                let old = record.instruction_score.unwrap_or(Decimal::ZERO);
                record.instruction_score = Some(new_score);
                // instruction scores grade the free-text reasoning and do
                // not feed the total
                (
                    "instruction",
                    Some(index as i32),
                    old,
                    new_score,
                    score.percentage,
                )
            }
        };

        let normalized = ScoringService::normalize(new_percentage, Some(score.max_marks));
        let answers_json = serde_json::to_value(&answers)?;

        let updated = sqlx::query_as::<_, Score>(
            r#"
            UPDATE scores
            SET percentage = $1, total_score = $2, answers = $3, updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(new_percentage)
        .bind(normalized.marks)
        .bind(&answers_json)
        .bind(score_id)
        .fetch_one(&self.pool)
        .await?;

        let edit = sqlx::query_as::<_, ScoreEdit>(
            r#"
            INSERT INTO score_edits (score_id, field, question_index, old_value, new_value, reason, edited_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(score_id)
        .bind(field)
        .bind(question_index)
        .bind(old_value)
        .bind(new_value)
        .bind(reason)
        .bind(editor.id)
        .fetch_one(&self.pool)
        .await?;

        Ok((updated, edit))
    }

    /// Quiz reset: bulk-deletes the quiz's scores, nothing else.
    pub async fn reset_quiz_scores(&self, quiz_id: Uuid) -> Result<u64> {
        let result = sqlx::query(r#"DELETE FROM scores WHERE quiz_id = $1"#)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Explicit re-sync of the denormalized ceiling snapshot after a quiz's
    /// `max_marks` changed. Re-derives every stored total from its raw
    /// percentage against the new ceiling.
    pub async fn resync_quiz_scores(&self, quiz: &Quiz) -> Result<(u64, Decimal)> {
        let normalized = ScoringService::normalize(Decimal::ZERO, quiz.max_marks);
        let ceiling = normalized.ceiling;

        let result = sqlx::query(
            r#"
            UPDATE scores
            SET max_marks = $1,
                total_score = percentage / 100 * $1,
                updated_at = NOW()
            WHERE quiz_id = $2
            "#,
        )
        .bind(ceiling)
        .bind(quiz.id)
        .execute(&self.pool)
        .await?;

        Ok((result.rows_affected(), ceiling))
    }
}

fn recompute_percentage(answers: &[AnswerRecord], fallback: Decimal) -> Decimal {
    let possible: i32 = answers.iter().map(|a| a.max_points).sum();
    if possible <= 0 {
        return fallback;
    }
    let earned: Decimal = answers.iter().map(|a| a.points_awarded).sum();
    // stored percentages always stay inside 0-100
    (earned / Decimal::from(possible) * Decimal::from(100))
        .clamp(Decimal::ZERO, Decimal::from(100))
}
