use crate::dto::admin_dto::{CreateStudentRequest, StudentSummary};
use crate::error::{Error, Result};
use crate::models::user::{User, ROLE_STUDENT};
use crate::utils::crypto::hash_password;
use sqlx::PgPool;

#[derive(Clone)]
pub struct StudentService {
    pool: PgPool,
}

impl StudentService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_students(&self, college: &str) -> Result<Vec<StudentSummary>> {
        let users = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users WHERE college = $1 AND role = $2 ORDER BY created_at DESC"#,
        )
        .bind(college)
        .bind(ROLE_STUDENT)
        .fetch_all(&self.pool)
        .await?;

        Ok(users
            .into_iter()
            .map(|u| StudentSummary {
                id: u.id,
                name: u.name,
                email: u.email,
                college: u.college,
                is_active: u.is_active,
                created_at: u.created_at,
            })
            .collect())
    }

    /// License checks happen before this is called; this only persists.
    pub async fn create_student(
        &self,
        req: CreateStudentRequest,
        college: &str,
    ) -> Result<User> {
        let password_hash = hash_password(&req.password)?;
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role, college)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&req.name)
        .bind(&req.email)
        .bind(&password_hash)
        .bind(ROLE_STUDENT)
        .bind(college)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Error::BadRequest("A user with this email already exists".to_string())
            }
            other => other.into(),
        })?;
        Ok(user)
    }

    pub async fn get_user_by_id(&self, id: uuid::Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE email = $1"#)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn count_active_students(&self, college: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM users WHERE college = $1 AND role = $2 AND is_active = TRUE"#,
        )
        .bind(college)
        .bind(ROLE_STUDENT)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.0)
    }
}
