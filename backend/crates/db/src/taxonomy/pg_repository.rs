use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use crate::taxonomy::models::{Category, CategoryInput, Label, LabelInput};
use crate::taxonomy::repositories::TaxonomyRepository;
use crate::{db_error, write_error};
use helpdesk_common::error::{HelpdeskError, HelpdeskResult};

#[derive(Clone)]
pub struct PgTaxonomyRepository {
    pool: PgPool,
}

impl PgTaxonomyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_category(row: PgRow) -> Category {
        Category {
            id: row.get("id"),
            name: row.get("name"),
            description: row.get("description"),
            created_at: row.get("created_at"),
        }
    }

    fn map_label(row: PgRow) -> Label {
        Label {
            id: row.get("id"),
            name: row.get("name"),
            color: row.get("color"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl TaxonomyRepository for PgTaxonomyRepository {
    async fn list_categories(&self) -> HelpdeskResult<Vec<Category>> {
        let rows = sqlx::query(
            "select id, name, description, created_at from categories order by lower(name)",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        Ok(rows.into_iter().map(Self::map_category).collect())
    }

    async fn create_category(&self, input: CategoryInput) -> HelpdeskResult<Category> {
        let input = input.validated()?;
        let row = sqlx::query(
            "insert into categories (id, name, description) values ($1, $2, $3)
             returning id, name, description, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "category"))?;
        tracing::info!(name = %input.name, "category created");
        Ok(Self::map_category(row))
    }

    async fn update_category(&self, id: Uuid, input: CategoryInput) -> HelpdeskResult<Category> {
        let input = input.validated()?;
        let row = sqlx::query(
            "update categories set name = $2, description = $3 where id = $1
             returning id, name, description, created_at",
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, "category"))?
        .ok_or_else(|| HelpdeskError::NotFound(format!("category {id}")))?;
        Ok(Self::map_category(row))
    }

    async fn delete_category(&self, id: Uuid) -> HelpdeskResult<()> {
        let result = sqlx::query("delete from categories where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(HelpdeskError::NotFound(format!("category {id}")));
        }
        Ok(())
    }

    async fn list_labels(&self) -> HelpdeskResult<Vec<Label>> {
        let rows = sqlx::query("select id, name, color, created_at from labels order by lower(name)")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(rows.into_iter().map(Self::map_label).collect())
    }

    async fn create_label(&self, input: LabelInput) -> HelpdeskResult<Label> {
        let input = input.validated()?;
        let row = sqlx::query(
            "insert into labels (id, name, color) values ($1, $2, $3)
             returning id, name, color, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(input.color_or_default())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "label"))?;
        tracing::info!(name = %input.name, "label created");
        Ok(Self::map_label(row))
    }

    async fn update_label(&self, id: Uuid, input: LabelInput) -> HelpdeskResult<Label> {
        let input = input.validated()?;
        let row = sqlx::query(
            "update labels set name = $2, color = $3 where id = $1
             returning id, name, color, created_at",
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.color_or_default())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, "label"))?
        .ok_or_else(|| HelpdeskError::NotFound(format!("label {id}")))?;
        Ok(Self::map_label(row))
    }

    async fn delete_label(&self, id: Uuid) -> HelpdeskResult<()> {
        let result = sqlx::query("delete from labels where id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        if result.rows_affected() == 0 {
            return Err(HelpdeskError::NotFound(format!("label {id}")));
        }
        Ok(())
    }
}
