use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::users::models::{Role, User, UserUpdate, UsersFile};
use crate::users::repositories::UserRepository;
use helpdesk_common::error::{HelpdeskError, HelpdeskResult};

pub const PROTECTED_USERNAME: &str = "admin";

/// Accounts kept in a small JSON file, rewritten in full on every change.
pub struct FileUserRepository {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileUserRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Seed an `admin` account when the file holds no users at all.
    pub async fn bootstrap_admin(&self, password: &str) -> HelpdeskResult<bool> {
        let _guard = self.lock.lock().await;
        let mut file = self.read().await?;
        if !file.users.is_empty() {
            return Ok(false);
        }
        file.users.push(User::new(
            PROTECTED_USERNAME,
            password,
            Role::Admin,
            Some("Administrator"),
        ));
        self.write(&file).await?;
        tracing::info!(path = %self.path.display(), "seeded admin account");
        Ok(true)
    }

    /// A missing file holds no users. A file that cannot be read or parsed
    /// is an error, so callers never rewrite it from an empty list.
    async fn read(&self) -> HelpdeskResult<UsersFile> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(UsersFile::default()),
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "users file unreadable");
                return Err(HelpdeskError::Internal(format!("failed to read users: {e}")));
            }
        };
        serde_json::from_str(&raw).map_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "users file is not valid");
            HelpdeskError::Config(format!("users file {} is not valid: {e}", self.path.display()))
        })
    }

    async fn write(&self, file: &UsersFile) -> HelpdeskResult<()> {
        let body = serde_json::to_string_pretty(file)
            .map_err(|e| HelpdeskError::Internal(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| HelpdeskError::Internal(format!("users dir: {e}")))?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| HelpdeskError::Internal(format!("failed to write users: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| HelpdeskError::Internal(format!("failed to write users: {e}")))
    }
}

#[async_trait]
impl UserRepository for FileUserRepository {
    async fn list(&self) -> HelpdeskResult<Vec<User>> {
        Ok(self.read().await?.users)
    }

    async fn get(&self, username: &str) -> HelpdeskResult<Option<User>> {
        Ok(self
            .read()
            .await?
            .users
            .into_iter()
            .find(|u| u.username == username))
    }

    async fn create(&self, user: User) -> HelpdeskResult<()> {
        let _guard = self.lock.lock().await;
        let mut file = self.read().await?;
        if file.users.iter().any(|u| u.username == user.username) {
            return Err(HelpdeskError::Conflict("Username already exists".to_owned()));
        }
        tracing::info!(username = %user.username, role = %user.role, "user created");
        file.users.push(user);
        self.write(&file).await
    }

    async fn update(&self, username: &str, update: UserUpdate) -> HelpdeskResult<User> {
        let _guard = self.lock.lock().await;
        let mut file = self.read().await?;
        let user = file
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| HelpdeskError::NotFound("User not found".to_owned()))?;

        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(display_name) = update.display_name {
            user.display_name = display_name;
        }
        if let Some(hash) = update.password_hash {
            user.password_hash = hash;
        }
        let updated = user.clone();
        self.write(&file).await?;
        Ok(updated)
    }

    async fn delete(&self, username: &str) -> HelpdeskResult<()> {
        if username == PROTECTED_USERNAME {
            return Err(HelpdeskError::Validation("Cannot delete admin user".to_owned()));
        }
        let _guard = self.lock.lock().await;
        let mut file = self.read().await?;
        let before = file.users.len();
        file.users.retain(|u| u.username != username);
        if file.users.len() == before {
            return Err(HelpdeskError::NotFound("User not found".to_owned()));
        }
        self.write(&file).await?;
        tracing::info!(username, "user deleted");
        Ok(())
    }
}
