/**
 * Fallback Data
 * Bundled read-only content served when the database is unreachable or unset
 */
use std::sync::Arc;

use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;

use crate::db::models::{BlogPost, Experience, Profile, Project};

static BUNDLED: Lazy<Arc<FallbackData>> = Lazy::new(|| {
    Arc::new(FallbackData {
        blogs: parse("blogs.json", include_str!("../data/blogs.json")),
        projects: parse("projects.json", include_str!("../data/projects.json")),
        experiences: parse("experiences.json", include_str!("../data/experiences.json")),
        profile: parse("user.json", include_str!("../data/user.json")),
    })
});

fn parse<T: DeserializeOwned + Default>(name: &str, raw: &str) -> T {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::error!(file = %name, error = %e, "bundled fallback data is invalid");
        T::default()
    })
}

#[derive(Debug, Clone, Default)]
pub struct FallbackData {
    blogs: Vec<BlogPost>,
    projects: Vec<Project>,
    experiences: Vec<Experience>,
    profile: Profile,
}

impl FallbackData {
    pub fn bundled() -> Arc<FallbackData> {
        BUNDLED.clone()
    }

    pub fn new(
        blogs: Vec<BlogPost>,
        projects: Vec<Project>,
        experiences: Vec<Experience>,
        profile: Profile,
    ) -> Self {
        Self {
            blogs,
            projects,
            experiences,
            profile,
        }
    }

    pub fn published_posts(&self) -> Vec<BlogPost> {
        self.blogs.iter().filter(|p| p.is_published()).cloned().collect()
    }

    pub fn find_post(&self, id_or_slug: &str) -> Option<BlogPost> {
        self.blogs
            .iter()
            .find(|p| p.is_published() && p.matches(id_or_slug))
            .cloned()
    }

    /// Like count of a published post, by id.
    pub fn likes_for(&self, id: &str) -> Option<i64> {
        self.blogs
            .iter()
            .find(|p| p.is_published() && p.id == id)
            .map(|p| p.likes)
    }

    pub fn projects(&self) -> Vec<Project> {
        self.projects.clone()
    }

    pub fn experiences(&self) -> Vec<Experience> {
        self.experiences
            .iter()
            .cloned()
            .map(Experience::normalized)
            .collect()
    }

    pub fn profile(&self) -> Profile {
        self.profile.clone()
    }
}
