//! Database Models - structs representing database tables (used by sqlx/serde).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;

/// A stored enum column held a value outside the known set.
#[derive(Debug, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

/// TEXT-backed enum: string form, parsing, and sqlx decoding via `try_from`.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [&'static str] = &[$($text),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = UnknownVariant;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlogStatus {
    #[default]
    Draft,
    Published,
}

text_enum!(BlogStatus, "blog status", {
    Draft => "draft",
    Published => "published",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectCategory {
    MachineLearning,
    DeepLearning,
    DataScience,
    WebDevelopment,
    Other,
}

text_enum!(ProjectCategory, "project category", {
    MachineLearning => "machine_learning",
    DeepLearning => "deep_learning",
    DataScience => "data_science",
    WebDevelopment => "web_development",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceType {
    Education,
    Work,
    Research,
}

text_enum!(ExperienceType, "experience type", {
    Education => "education",
    Work => "work",
    Research => "research",
});

/// Blog comment. `date` is the creation timestamp.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub message: String,
    #[sqlx(rename = "created_at")]
    pub date: DateTime<Utc>,
}

/// Blog post model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub cover_image_url: Option<String>,
    pub tags: Vec<String>,
    #[sqlx(try_from = "String")]
    pub status: BlogStatus,
    pub featured: bool,
    pub likes: i64,
    pub created_date: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl BlogPost {
    pub fn is_published(&self) -> bool {
        self.status == BlogStatus::Published
    }

    pub fn matches(&self, id_or_slug: &str) -> bool {
        self.id == id_or_slug || self.slug == id_or_slug
    }
}

/// Portfolio project model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub github_url: Option<String>,
    pub demo_url: Option<String>,
    pub image_url: Option<String>,
    #[sqlx(try_from = "String")]
    pub category: ProjectCategory,
    pub featured: bool,
    pub created_date: DateTime<Utc>,
}

/// Education / work / research entry
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Experience {
    pub id: String,
    pub title: String,
    pub organization: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub kind: ExperienceType,
    pub current: bool,
}

impl Experience {
    /// An ongoing entry has no end date, whatever is stored.
    pub fn normalized(mut self) -> Self {
        if self.current {
            self.end_date = None;
        }
        self
    }
}

/// The single profile row
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Profile {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub profile_image_url: Option<String>,
    pub resume_url: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Upload,
    Login,
    Logout,
}

text_enum!(AuditAction, "audit action", {
    Create => "CREATE",
    Update => "UPDATE",
    Delete => "DELETE",
    Upload => "UPLOAD",
    Login => "LOGIN",
    Logout => "LOGOUT",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Profile,
    Project,
    Blog,
    Experience,
    File,
}

text_enum!(ResourceKind, "resource type", {
    Profile => "profile",
    Project => "project",
    Blog => "blog",
    Experience => "experience",
    File => "file",
});

/// New audit log row. The store stamps the time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub actor_id: String,
    pub action: AuditAction,
    pub resource_type: ResourceKind,
    pub resource_id: Option<String>,
    pub ip_address: String,
    pub user_agent: String,
    pub metadata: Option<serde_json::Value>,
}
