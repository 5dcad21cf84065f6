use async_trait::async_trait;

use crate::users::models::{User, UserUpdate};
use helpdesk_common::error::HelpdeskResult;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn list(&self) -> HelpdeskResult<Vec<User>>;
    async fn get(&self, username: &str) -> HelpdeskResult<Option<User>>;
    /// `Conflict` when the username is taken.
    async fn create(&self, user: User) -> HelpdeskResult<()>;
    async fn update(&self, username: &str, update: UserUpdate) -> HelpdeskResult<User>;
    /// The `admin` account cannot be deleted.
    async fn delete(&self, username: &str) -> HelpdeskResult<()>;
}
