use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{present, Resource};
use crate::db::models::{Project, ProjectCategory, ResourceKind};
use crate::validation::{Mode, Payload, Text, ValidationErrors};

#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub github_url: Option<String>,
    pub demo_url: Option<String>,
    pub image_url: Option<String>,
    pub category: ProjectCategory,
    pub featured: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    pub github_url: Option<Option<String>>,
    pub demo_url: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub category: Option<ProjectCategory>,
    pub featured: Option<bool>,
}

fn read(body: &Value, mode: Mode) -> Result<ProjectPatch, ValidationErrors> {
    let mut p = Payload::parse(body, mode)?;
    let patch = ProjectPatch {
        title: p.required_text("title", Text::min(3)),
        description: p.required_text("description", Text::min(10)),
        technologies: p.list("technologies"),
        github_url: p.url("github_url"),
        demo_url: p.url("demo_url"),
        image_url: p.url("image_url"),
        category: p.required_choice("category", ProjectCategory::ALL),
        featured: p.flag("featured"),
    };
    p.finish()?;
    Ok(patch)
}

impl Resource for Project {
    const KIND: ResourceKind = ResourceKind::Project;

    type New = NewProject;
    type Patch = ProjectPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn parse_new(body: &Value) -> Result<NewProject, ValidationErrors> {
        let fields = read(body, Mode::Create)?;
        Ok(NewProject {
            title: present(fields.title, "title")?,
            description: present(fields.description, "description")?,
            technologies: fields.technologies.unwrap_or_default(),
            github_url: fields.github_url.flatten(),
            demo_url: fields.demo_url.flatten(),
            image_url: fields.image_url.flatten(),
            category: present(fields.category, "category")?,
            featured: fields.featured.unwrap_or(false),
        })
    }

    fn parse_patch(body: &Value) -> Result<ProjectPatch, ValidationErrors> {
        read(body, Mode::Update)
    }

    fn build(id: String, created: DateTime<Utc>, new: NewProject) -> Self {
        Project {
            id,
            title: new.title,
            description: new.description,
            technologies: new.technologies,
            github_url: new.github_url,
            demo_url: new.demo_url,
            image_url: new.image_url,
            category: new.category,
            featured: new.featured,
            created_date: created,
        }
    }

    fn apply(&mut self, patch: ProjectPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(technologies) = patch.technologies {
            self.technologies = technologies;
        }
        if let Some(url) = patch.github_url {
            self.github_url = url;
        }
        if let Some(url) = patch.demo_url {
            self.demo_url = url;
        }
        if let Some(url) = patch.image_url {
            self.image_url = url;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(featured) = patch.featured {
            self.featured = featured;
        }
    }

    fn changed_fields(patch: &ProjectPatch) -> Vec<&'static str> {
        [
            ("title", patch.title.is_some()),
            ("description", patch.description.is_some()),
            ("technologies", patch.technologies.is_some()),
            ("github_url", patch.github_url.is_some()),
            ("demo_url", patch.demo_url.is_some()),
            ("image_url", patch.image_url.is_some()),
            ("category", patch.category.is_some()),
            ("featured", patch.featured.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    fn summary(&self) -> Value {
        json!({ "title": self.title, "category": self.category })
    }
}
