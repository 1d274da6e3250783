use crate::dto::quiz_dto::{CreateQuizPayload, PublicQuizSummary, UpdateQuizPayload};
use crate::error::{Error, Result};
use crate::models::question::Question;
use crate::models::quiz::Quiz;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct QuizService {
    pool: PgPool,
}

impl QuizService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_quiz(&self, payload: CreateQuizPayload, created_by: Uuid) -> Result<Quiz> {
        let questions_json = match &payload.questions {
            Some(qs) => serde_json::to_value(assign_question_ids(qs))?,
            None => serde_json::json!([]),
        };
        let max_marks = convert_max_marks(payload.max_marks)?;

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes (title, description, max_marks, questions, created_by, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(max_marks)
        .bind(&questions_json)
        .bind(created_by)
        .bind(payload.is_active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await?;

        Ok(quiz)
    }

    pub async fn get_quiz_by_id(&self, quiz_id: Uuid) -> Result<Quiz> {
        let quiz = sqlx::query_as::<_, Quiz>(r#"SELECT * FROM quizzes WHERE id = $1"#)
            .bind(quiz_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(quiz)
    }

    pub async fn list_quizzes(&self) -> Result<Vec<Quiz>> {
        let quizzes =
            sqlx::query_as::<_, Quiz>(r#"SELECT * FROM quizzes ORDER BY created_at DESC"#)
                .fetch_all(&self.pool)
                .await?;
        Ok(quizzes)
    }

    /// Active quizzes stripped of option point values for the public
    /// listing.
    pub async fn list_public(&self) -> Result<Vec<PublicQuizSummary>> {
        let quizzes = sqlx::query_as::<_, Quiz>(
            r#"SELECT * FROM quizzes WHERE is_active = TRUE ORDER BY created_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(quizzes
            .into_iter()
            .map(|q| {
                let total_questions = parse_questions(&q.questions).map(|v| v.len()).unwrap_or(0);
                PublicQuizSummary {
                    id: q.id,
                    title: q.title,
                    description: q.description,
                    max_marks: q.max_marks,
                    total_questions,
                }
            })
            .collect())
    }

    /// Updating `max_marks` only changes the quiz document. Existing
    /// scores keep their snapshot until the resync operation runs.
    pub async fn update_quiz(&self, quiz_id: Uuid, payload: UpdateQuizPayload) -> Result<Quiz> {
        let questions_json: Option<JsonValue> = match &payload.questions {
            Some(qs) => Some(serde_json::to_value(assign_question_ids(qs))?),
            None => None,
        };
        let max_marks = convert_max_marks(payload.max_marks)?;

        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            UPDATE quizzes SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                max_marks = COALESCE($3, max_marks),
                questions = COALESCE($4, questions),
                is_active = COALESCE($5, is_active),
                updated_at = NOW()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&payload.title)
        .bind(&payload.description)
        .bind(max_marks)
        .bind(&questions_json)
        .bind(payload.is_active)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(quiz)
    }

    pub async fn delete_quiz(&self, quiz_id: Uuid) -> Result<()> {
        let result = sqlx::query(r#"DELETE FROM quizzes WHERE id = $1"#)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Quiz not found".to_string()));
        }
        Ok(())
    }

    pub async fn flag_misconfigured(&self, quiz_id: Uuid) -> Result<()> {
        sqlx::query(r#"UPDATE quizzes SET misconfigured = TRUE, updated_at = NOW() WHERE id = $1"#)
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

pub fn parse_questions(value: &JsonValue) -> Result<Vec<Question>> {
    let questions: Vec<Question> = serde_json::from_value(value.clone())?;
    Ok(questions)
}

fn convert_max_marks(raw: Option<f64>) -> Result<Option<Decimal>> {
    match raw {
        Some(m) => {
            let d = Decimal::from_f64(m)
                .ok_or_else(|| Error::BadRequest("Invalid max_marks value".to_string()))?;
            Ok(Some(d))
        }
        None => Ok(None),
    }
}

/// Questions are identified by a 1-based id inside the JSONB list; ids the
/// client omitted get assigned positionally.
fn assign_question_ids(questions: &[Question]) -> Vec<Question> {
    questions
        .iter()
        .enumerate()
        .map(|(idx, q)| {
            let mut q = q.clone();
            if q.id <= 0 {
                q.id = (idx as i32) + 1;
            }
            q
        })
        .collect()
}
