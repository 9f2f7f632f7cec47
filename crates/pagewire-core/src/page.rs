//! Page payloads.

use serde::{Deserialize, Serialize};

/// Data for a rendered page, tagged by its `$type` discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum PageData {
    /// A user profile page.
    #[serde(rename = "UserProfilePage")]
    UserProfile(UserProfile),
    /// A page with no remote data.
    #[serde(rename = "EmptyPage")]
    Empty,
}

impl PageData {
    /// The `$type` discriminant of this page.
    pub fn page_type(&self) -> &'static str {
        match self {
            Self::UserProfile(_) => "UserProfilePage",
            Self::Empty => "EmptyPage",
        }
    }

    /// Convert to a JSON value (the form stored in caches and snapshots).
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    /// Parse from a JSON value.
    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// Get the user profile, if this is a profile page.
    pub fn as_user_profile(&self) -> Option<&UserProfile> {
        match self {
            Self::UserProfile(profile) => Some(profile),
            Self::Empty => None,
        }
    }
}

impl Default for PageData {
    fn default() -> Self {
        Self::Empty
    }
}

/// A user as returned by the upstream user service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: u64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub username: String,
}

impl UserProfile {
    /// Full display name.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}
