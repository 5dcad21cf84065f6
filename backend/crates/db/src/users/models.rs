use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Account role. Users files written by hand may carry other role names;
/// those load as [`Role::Other`] and get viewer rights.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    #[default]
    Viewer,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Viewer => "viewer",
            Self::Other(name) => name,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.trim() {
            "admin" => Self::Admin,
            "viewer" => Self::Viewer,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_owned()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strict parse for roles assigned through the API: only `admin` and `viewer`.
impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match Role::from(value.to_owned()) {
            Self::Other(other) => Err(format!("unknown role: {other}")),
            known => Ok(known),
        }
    }
}

/// Stored account; `password_hash` is lowercase hex SHA-256 of the password.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub display_name: String,
}

impl User {
    pub fn new(username: &str, password: &str, role: Role, display_name: Option<&str>) -> Self {
        let username = username.trim().to_owned();
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| username.clone());
        Self {
            username,
            password_hash: hash_password(password),
            role,
            display_name,
        }
    }

    pub fn verify_password(&self, password: &str) -> bool {
        hash_password(password) == self.password_hash
    }

    pub fn public(&self) -> PublicUser {
        let display_name = if self.display_name.trim().is_empty() {
            self.username.clone()
        } else {
            self.display_name.clone()
        };
        PublicUser {
            username: self.username.clone(),
            role: self.role.clone(),
            display_name,
        }
    }
}

/// Account as shown to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicUser {
    pub username: String,
    pub role: Role,
    pub display_name: String,
}

/// On-disk shape: `{"users": [...]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsersFile {
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub role: Option<Role>,
    pub display_name: Option<String>,
    pub password_hash: Option<String>,
}

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}
