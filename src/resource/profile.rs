use serde_json::Value;

use crate::db::models::Profile;
use crate::validation::{Mode, Payload, Text, ValidationErrors};

const SHORT: Text = Text::max(120);
const BIO: Text = Text::max(2000);

/// Profile changes. Every field is optional; URL fields may be cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub title: Option<String>,
    pub location: Option<String>,
    pub profile_image_url: Option<Option<String>>,
    pub resume_url: Option<Option<String>>,
    pub github_url: Option<Option<String>>,
    pub linkedin_url: Option<Option<String>>,
}

impl ProfilePatch {
    pub fn parse(body: &Value) -> Result<Self, ValidationErrors> {
        let mut p = Payload::parse(body, Mode::Update)?;
        let patch = ProfilePatch {
            full_name: p.text("full_name", SHORT),
            email: p.email("email"),
            bio: p.text("bio", BIO),
            title: p.text("title", SHORT),
            location: p.text("location", SHORT),
            profile_image_url: p.url("profile_image_url"),
            resume_url: p.url("resume_url"),
            github_url: p.url("github_url"),
            linkedin_url: p.url("linkedin_url"),
        };
        p.finish()?;
        Ok(patch)
    }

    pub fn apply(self, profile: &mut Profile) {
        if let Some(v) = self.full_name {
            profile.full_name = Some(v);
        }
        if let Some(v) = self.email {
            profile.email = Some(v);
        }
        if let Some(v) = self.bio {
            profile.bio = Some(v);
        }
        if let Some(v) = self.title {
            profile.title = Some(v);
        }
        if let Some(v) = self.location {
            profile.location = Some(v);
        }
        if let Some(v) = self.profile_image_url {
            profile.profile_image_url = v;
        }
        if let Some(v) = self.resume_url {
            profile.resume_url = v;
        }
        if let Some(v) = self.github_url {
            profile.github_url = v;
        }
        if let Some(v) = self.linkedin_url {
            profile.linkedin_url = v;
        }
    }

    pub fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", self.full_name.is_some()),
            ("email", self.email.is_some()),
            ("bio", self.bio.is_some()),
            ("title", self.title.is_some()),
            ("location", self.location.is_some()),
            ("profile_image_url", self.profile_image_url.is_some()),
            ("resume_url", self.resume_url.is_some()),
            ("github_url", self.github_url.is_some()),
            ("linkedin_url", self.linkedin_url.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}
