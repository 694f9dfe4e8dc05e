use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use cascara_core::error::AppError;
use cascara_core::job::{ExtractionRule, SelectorType};
use cascara_core::traits::RuleStore;

/// PostgreSQL-backed extraction rule store.
///
/// Rules are replaced wholesale per job; their `position` column keeps
/// the order the caller supplied them in.
#[derive(Clone)]
pub struct RuleRepository {
    pool: Pool<Postgres>,
}

impl RuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RuleRow {
    name: String,
    selector_type: String,
    selector: String,
    attribute: Option<String>,
    is_list: bool,
    is_required: bool,
}

impl From<RuleRow> for ExtractionRule {
    fn from(row: RuleRow) -> Self {
        ExtractionRule {
            name: row.name,
            selector_type: match row.selector_type.as_str() {
                "xpath" => SelectorType::XPath,
                _ => SelectorType::Css,
            },
            selector: row.selector,
            attribute: row.attribute,
            is_list: row.is_list,
            is_required: row.is_required,
        }
    }
}

fn selector_type_str(selector_type: SelectorType) -> &'static str {
    match selector_type {
        SelectorType::Css => "css",
        SelectorType::XPath => "xpath",
    }
}

impl RuleStore for RuleRepository {
    async fn set_rules(&self, job_id: Uuid, rules: &[ExtractionRule]) -> Result<(), AppError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        sqlx::query(r#"DELETE FROM extraction_rules WHERE job_id = $1"#)
            .bind(job_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        for (position, rule) in rules.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO extraction_rules
                    (job_id, name, selector_type, selector, attribute, is_list, is_required, position)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(job_id)
            .bind(&rule.name)
            .bind(selector_type_str(rule.selector_type))
            .bind(&rule.selector)
            .bind(&rule.attribute)
            .bind(rule.is_list)
            .bind(rule.is_required)
            .bind(position as i32)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::DatabaseError(e.to_string()))?;
        Ok(())
    }

    async fn get_rules(&self, job_id: Uuid) -> Result<Vec<ExtractionRule>, AppError> {
        let rows = sqlx::query_as::<_, RuleRow>(
            r#"
            SELECT name, selector_type, selector, attribute, is_list, is_required
            FROM extraction_rules
            WHERE job_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
