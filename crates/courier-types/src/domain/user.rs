use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
    Rider,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
            Role::Rider => "rider",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            "rider" => Ok(Role::Rider),
            other => anyhow::bail!("unknown role {other}"),
        }
    }
}

/// Outcome of an admin reviewing a user's request for elevated access.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Approved,
    Removed,
}

impl ApprovalStatus {
    pub fn granted_role(&self) -> Role {
        match self {
            ApprovalStatus::Approved => Role::Admin,
            ApprovalStatus::Removed => Role::User,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    #[serde(rename = "photoURL", default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        email: String,
        display_name: String,
        photo_url: Option<String>,
    ) -> anyhow::Result<Self> {
        if !email.contains('@') {
            anyhow::bail!("invalid email");
        }
        Ok(Self {
            id: Uuid::new_v4(),
            email,
            display_name,
            photo_url,
            role: Role::User,
            created_at: Utc::now(),
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Filter and paging for the admin user listing.
#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub search: Option<String>,
    pub limit: usize,
    pub skip: usize,
}

impl UserQuery {
    pub fn matches(&self, user: &User) -> bool {
        match &self.search {
            Some(text) => user
                .display_name
                .to_lowercase()
                .contains(&text.to_lowercase()),
            None => true,
        }
    }
}
