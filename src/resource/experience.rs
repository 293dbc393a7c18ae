use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::{present, Resource};
use crate::db::models::{Experience, ExperienceType, ResourceKind};
use crate::validation::{Mode, Payload, Text, ValidationErrors};

#[derive(Debug, Clone, PartialEq)]
pub struct NewExperience {
    pub title: String,
    pub organization: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub description: Option<String>,
    pub kind: ExperienceType,
    pub current: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperiencePatch {
    pub title: Option<String>,
    pub organization: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub kind: Option<ExperienceType>,
    pub current: Option<bool>,
}

fn read(body: &Value, mode: Mode) -> Result<ExperiencePatch, ValidationErrors> {
    let mut p = Payload::parse(body, mode)?;
    let patch = ExperiencePatch {
        title: p.required_text("title", Text::min(3)),
        organization: p.required_text("organization", Text::min(2)),
        start_date: p.required_text("start_date", Text::min(1)),
        end_date: p.nullable_date("end_date"),
        description: p.nullable_text("description", Text::min(10)),
        kind: p.required_choice("type", ExperienceType::ALL),
        current: p.flag("current"),
    };
    p.finish()?;
    Ok(patch)
}

impl Resource for Experience {
    const KIND: ResourceKind = ResourceKind::Experience;

    type New = NewExperience;
    type Patch = ExperiencePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn parse_new(body: &Value) -> Result<NewExperience, ValidationErrors> {
        let fields = read(body, Mode::Create)?;
        Ok(NewExperience {
            title: present(fields.title, "title")?,
            organization: present(fields.organization, "organization")?,
            start_date: present(fields.start_date, "start_date")?,
            end_date: fields.end_date.flatten(),
            description: fields.description.flatten(),
            kind: present(fields.kind, "type")?,
            current: fields.current.unwrap_or(false),
        })
    }

    fn parse_patch(body: &Value) -> Result<ExperiencePatch, ValidationErrors> {
        read(body, Mode::Update)
    }

    fn build(id: String, _created: DateTime<Utc>, new: NewExperience) -> Self {
        Experience {
            id,
            title: new.title,
            organization: new.organization,
            start_date: new.start_date,
            end_date: new.end_date,
            description: new.description,
            kind: new.kind,
            current: new.current,
        }
        .normalized()
    }

    fn apply(&mut self, patch: ExperiencePatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(organization) = patch.organization {
            self.organization = organization;
        }
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(current) = patch.current {
            self.current = current;
        }
        if self.current {
            self.end_date = None;
        }
    }

    fn changed_fields(patch: &ExperiencePatch) -> Vec<&'static str> {
        [
            ("title", patch.title.is_some()),
            ("organization", patch.organization.is_some()),
            ("start_date", patch.start_date.is_some()),
            ("end_date", patch.end_date.is_some()),
            ("description", patch.description.is_some()),
            ("type", patch.kind.is_some()),
            ("current", patch.current.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    fn summary(&self) -> Value {
        json!({ "title": self.title, "organization": self.organization })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ongoing_entry() {
        let new = Experience::parse_new(&json!({
            "title": "Engineer",
            "organization": "Acme",
            "start_date": "2023-02",
            "end_date": "",
            "description": "",
            "type": "work",
            "current": true
        }))
        .unwrap();
        assert_eq!(new.end_date, None);
        assert_eq!(new.description, None);
        assert!(new.current);
    }

    #[test]
    fn test_required_fields() {
        let errors = Experience::parse_new(&json!({ "title": "Engineer" })).unwrap_err();
        for field in ["organization", "start_date", "type"] {
            assert_eq!(errors.get(field).unwrap(), ["is required"], "{field}");
        }
        assert!(!errors.contains("title"));
    }

    #[test]
    fn test_description_minimum_applies_when_present() {
        let errors = Experience::parse_patch(&json!({ "description": "too short" })).unwrap_err();
        assert!(errors.contains("description"));
        let patch = Experience::parse_patch(&json!({ "description": null })).unwrap();
        assert_eq!(patch.description, Some(None));
    }

    #[test]
    fn test_current_entry_never_keeps_end_date() {
        let new = Experience::parse_new(&json!({
            "title": "Engineer",
            "organization": "Acme",
            "start_date": "2023-02",
            "end_date": "2024-01",
            "type": "work",
            "current": true
        }))
        .unwrap();
        let mut entry = Experience::build("e1".to_string(), Utc::now(), new);
        assert_eq!(entry.end_date, None);

        entry.apply(Experience::parse_patch(&json!({ "current": false, "end_date": "2024-06" })).unwrap());
        assert_eq!(entry.end_date.as_deref(), Some("2024-06"));

        entry.apply(Experience::parse_patch(&json!({ "current": true })).unwrap());
        assert_eq!(entry.end_date, None);
    }
}
