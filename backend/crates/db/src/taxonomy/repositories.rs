use async_trait::async_trait;
use uuid::Uuid;

use crate::taxonomy::models::{Category, CategoryInput, Label, LabelInput};
use helpdesk_common::error::HelpdeskResult;

#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    async fn list_categories(&self) -> HelpdeskResult<Vec<Category>>;
    async fn create_category(&self, input: CategoryInput) -> HelpdeskResult<Category>;
    async fn update_category(&self, id: Uuid, input: CategoryInput) -> HelpdeskResult<Category>;
    /// Tickets in the category keep existing with no category.
    async fn delete_category(&self, id: Uuid) -> HelpdeskResult<()>;

    async fn list_labels(&self) -> HelpdeskResult<Vec<Label>>;
    async fn create_label(&self, input: LabelInput) -> HelpdeskResult<Label>;
    async fn update_label(&self, id: Uuid, input: LabelInput) -> HelpdeskResult<Label>;
    async fn delete_label(&self, id: Uuid) -> HelpdeskResult<()>;
}
