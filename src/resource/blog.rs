use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{present, Resource};
use crate::db::models::{BlogPost, BlogStatus, ResourceKind};
use crate::validation::{Mode, Payload, Text, ValidationErrors};

pub const TITLE: Text = Text::min(5);
pub const EXCERPT: Text = Text::max(400);

#[derive(Debug, Clone, PartialEq)]
pub struct NewBlogPost {
    pub title: String,
    pub slug: String,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub cover_image_url: Option<String>,
    pub tags: Vec<String>,
    pub status: BlogStatus,
    pub featured: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogPatch {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub content: Option<Option<String>>,
    pub excerpt: Option<Option<String>>,
    pub cover_image_url: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub status: Option<BlogStatus>,
    pub featured: Option<bool>,
}

fn read(body: &Value, mode: Mode) -> Result<BlogPatch, ValidationErrors> {
    let mut p = Payload::parse(body, mode)?;
    let patch = BlogPatch {
        title: p.required_text("title", TITLE),
        slug: p.required_slug("slug"),
        content: p.nullable_text("content", Text::ANY),
        excerpt: p.nullable_text("excerpt", EXCERPT),
        cover_image_url: p.url("cover_image_url"),
        tags: p.list("tags"),
        status: p.choice("status", BlogStatus::ALL),
        featured: p.flag("featured"),
    };
    p.finish()?;
    Ok(patch)
}

impl Resource for BlogPost {
    const KIND: ResourceKind = ResourceKind::Blog;

    type New = NewBlogPost;
    type Patch = BlogPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn parse_new(body: &Value) -> Result<NewBlogPost, ValidationErrors> {
        let fields = read(body, Mode::Create)?;
        Ok(NewBlogPost {
            title: present(fields.title, "title")?,
            slug: present(fields.slug, "slug")?,
            content: fields.content.flatten(),
            excerpt: fields.excerpt.flatten(),
            cover_image_url: fields.cover_image_url.flatten(),
            tags: fields.tags.unwrap_or_default(),
            status: fields.status.unwrap_or_default(),
            featured: fields.featured.unwrap_or(false),
        })
    }

    fn parse_patch(body: &Value) -> Result<BlogPatch, ValidationErrors> {
        read(body, Mode::Update)
    }

    fn build(id: String, created: DateTime<Utc>, new: NewBlogPost) -> Self {
        BlogPost {
            id,
            title: new.title,
            slug: new.slug,
            content: new.content,
            excerpt: new.excerpt,
            cover_image_url: new.cover_image_url,
            tags: new.tags,
            status: new.status,
            featured: new.featured,
            likes: 0,
            created_date: created,
            comments: Vec::new(),
        }
    }

    fn apply(&mut self, patch: BlogPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(slug) = patch.slug {
            self.slug = slug;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(excerpt) = patch.excerpt {
            self.excerpt = excerpt;
        }
        if let Some(url) = patch.cover_image_url {
            self.cover_image_url = url;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(featured) = patch.featured {
            self.featured = featured;
        }
    }

    fn changed_fields(patch: &BlogPatch) -> Vec<&'static str> {
        [
            ("title", patch.title.is_some()),
            ("slug", patch.slug.is_some()),
            ("content", patch.content.is_some()),
            ("excerpt", patch.excerpt.is_some()),
            ("cover_image_url", patch.cover_image_url.is_some()),
            ("tags", patch.tags.is_some()),
            ("status", patch.status.is_some()),
            ("featured", patch.featured.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    fn summary(&self) -> Value {
        json!({ "title": self.title, "slug": self.slug })
    }
}
