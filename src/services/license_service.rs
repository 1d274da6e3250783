use crate::dto::admin_dto::UpdateLicenseRequest;
use crate::error::{Error, Result};
use crate::models::license::{License, LICENSE_ACTIVE, LICENSE_DISABLED, LICENSE_EXPIRED};
use sqlx::PgPool;

#[derive(Clone)]
pub struct LicenseService {
    pool: PgPool,
}

/// Status-change side effect the caller must broadcast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LicenseTransition {
    Disabled,
    Reactivated,
    Expired,
}

/// Outcome of the student-creation license check.
#[derive(Debug, Clone, PartialEq)]
pub enum LicenseGate {
    Allowed,
    NotLicensed(String),
    LimitReached,
}

impl LicenseService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_by_college(&self, college: &str) -> Result<License> {
        let license = sqlx::query_as::<_, License>(r#"SELECT * FROM licenses WHERE college = $1"#)
            .bind(college)
            .fetch_one(&self.pool)
            .await?;
        Ok(license)
    }

    /// Upserts the license and reports the status transition, if any, so
    /// the route can emit the matching notification event.
    pub async fn update_license(
        &self,
        college: &str,
        req: UpdateLicenseRequest,
    ) -> Result<(License, Option<LicenseTransition>)> {
        if let Some(status) = &req.status {
            let known = [LICENSE_ACTIVE, LICENSE_EXPIRED, LICENSE_DISABLED];
            if !known.contains(&status.as_str()) {
                return Err(Error::BadRequest(format!(
                    "Unknown license status: {}",
                    status
                )));
            }
        }

        let previous = sqlx::query_as::<_, License>(
            r#"SELECT * FROM licenses WHERE college = $1"#,
        )
        .bind(college)
        .fetch_optional(&self.pool)
        .await?;

        let license = sqlx::query_as::<_, License>(
            r#"
            INSERT INTO licenses (college, max_students, status, expires_at)
            VALUES ($1, COALESCE($2, 0), COALESCE($3, 'active'), $4)
            ON CONFLICT (college) DO UPDATE SET
                max_students = COALESCE($2, licenses.max_students),
                status = COALESCE($3, licenses.status),
                expires_at = COALESCE($4, licenses.expires_at),
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(college)
        .bind(req.max_students)
        .bind(&req.status)
        .bind(req.expires_at)
        .fetch_one(&self.pool)
        .await?;

        let old_status = previous.map(|l| l.status).unwrap_or_default();
        let transition = match (old_status.as_str(), license.status.as_str()) {
            (old, LICENSE_DISABLED) if old != LICENSE_DISABLED => {
                Some(LicenseTransition::Disabled)
            }
            (LICENSE_DISABLED | LICENSE_EXPIRED, LICENSE_ACTIVE) => {
                Some(LicenseTransition::Reactivated)
            }
            (old, LICENSE_EXPIRED) if old != LICENSE_EXPIRED => Some(LicenseTransition::Expired),
            _ => None,
        };

        Ok((license, transition))
    }

    /// Gate for student creation: the college must hold an active license
    /// with headroom. Distinguishes "no/non-active license" from "cap
    /// reached" so the route can emit `license:limitReached` only for the
    /// latter.
    pub async fn check_can_add_student(
        &self,
        college: &str,
        current_students: i64,
    ) -> Result<LicenseGate> {
        let license = sqlx::query_as::<_, License>(
            r#"SELECT * FROM licenses WHERE college = $1"#,
        )
        .bind(college)
        .fetch_optional(&self.pool)
        .await?;

        let Some(license) = license else {
            return Ok(LicenseGate::NotLicensed(format!(
                "No license registered for college {}",
                college
            )));
        };
        if license.status != LICENSE_ACTIVE {
            return Ok(LicenseGate::NotLicensed(format!(
                "License for college {} is {}",
                college, license.status
            )));
        }
        if current_students >= license.max_students as i64 {
            return Ok(LicenseGate::LimitReached);
        }
        Ok(LicenseGate::Allowed)
    }

    /// Sweeper: flips overdue active licenses to expired and returns them
    /// so the worker can broadcast `license:expired` per college.
    pub async fn expire_due(&self) -> Result<Vec<License>> {
        let expired = sqlx::query_as::<_, License>(
            r#"
            UPDATE licenses
            SET status = 'expired', updated_at = NOW()
            WHERE status = 'active' AND expires_at IS NOT NULL AND expires_at <= NOW()
            RETURNING *
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(expired)
    }
}
