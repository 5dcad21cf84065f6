use chrono::{DateTime, Utc};
use helpdesk_common::error::{HelpdeskError, HelpdeskResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_LABEL_COLOR: &str = "#64748b";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Label {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CategoryInput {
    /// Trimmed copy; rejects a blank name.
    pub fn validated(&self) -> HelpdeskResult<Self> {
        Ok(Self {
            name: validate_name(&self.name, "category")?,
            description: self.description.trim().to_owned(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabelInput {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl LabelInput {
    /// Trimmed copy with a lowercase `#rrggbb` colour, defaulting when absent.
    pub fn validated(&self) -> HelpdeskResult<Self> {
        let color = match self.color.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_LABEL_COLOR.to_owned(),
            Some(raw) => normalize_color(raw)?,
        };
        Ok(Self {
            name: validate_name(&self.name, "label")?,
            color: Some(color),
        })
    }

    pub fn color_or_default(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_LABEL_COLOR)
    }
}

fn validate_name(name: &str, what: &str) -> HelpdeskResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(HelpdeskError::Validation(format!("{what} name is required")));
    }
    Ok(name.to_owned())
}

pub fn normalize_color(raw: &str) -> HelpdeskResult<String> {
    let hex = raw.strip_prefix('#').unwrap_or(raw);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(HelpdeskError::Validation(format!(
            "label color must look like #rrggbb, got {raw}"
        )));
    }
    Ok(format!("#{}", hex.to_ascii_lowercase()))
}
