//! In-memory store with failure injection, used by handler tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::models::{AuditEntry, BlogPost, Comment, Experience, Profile, Project};
use super::store::{AuditSink, ProfileStore, PublicStore, Repository};
use crate::error::StoreError;
use crate::resource::{ProfilePatch, Resource};

#[derive(Default)]
pub struct MemoryStore {
    blogs: Mutex<Vec<BlogPost>>,
    projects: Mutex<Vec<Project>>,
    experiences: Mutex<Vec<Experience>>,
    profiles: Mutex<Vec<Profile>>,
    audit: Mutex<Vec<AuditEntry>>,
    write_failure: Mutex<Option<String>>,
    audit_fails: AtomicBool,
    snapshot_fails: AtomicBool,
    reads_fail: AtomicBool,
}

impl MemoryStore {
    pub fn fail_writes(&self, message: &str) {
        *self.write_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_audit(&self) {
        self.audit_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_snapshots(&self) {
        self.snapshot_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_reads(&self) {
        self.reads_fail.store(true, Ordering::SeqCst);
    }

    pub fn seed_blog(&self, post: BlogPost) {
        self.blogs.lock().unwrap().push(post);
    }

    pub fn blog_count(&self) -> usize {
        self.blogs.lock().unwrap().len()
    }

    pub fn likes_of(&self, id: &str) -> Option<i64> {
        self.blogs
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.likes)
    }

    pub fn profile_rows(&self) -> usize {
        self.profiles.lock().unwrap().len()
    }

    pub fn profile_snapshot(&self) -> Option<Profile> {
        self.profiles.lock().unwrap().first().cloned()
    }

    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit.lock().unwrap().clone()
    }

    fn check_write(&self) -> Result<(), StoreError> {
        match self.write_failure.lock().unwrap().as_ref() {
            Some(message) => Err(StoreError::Backend(message.clone())),
            None => Ok(()),
        }
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if self.reads_fail.load(Ordering::SeqCst) {
            Err(StoreError::Backend("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Selects the table a resource lives in.
pub trait Stored: Resource {
    fn rows(store: &MemoryStore) -> &Mutex<Vec<Self>>;
}

impl Stored for BlogPost {
    fn rows(store: &MemoryStore) -> &Mutex<Vec<Self>> {
        &store.blogs
    }
}

impl Stored for Project {
    fn rows(store: &MemoryStore) -> &Mutex<Vec<Self>> {
        &store.projects
    }
}

impl Stored for Experience {
    fn rows(store: &MemoryStore) -> &Mutex<Vec<Self>> {
        &store.experiences
    }
}

#[async_trait]
impl<R: Stored> Repository<R> for MemoryStore {
    async fn insert(&self, new: R::New) -> Result<R, StoreError> {
        self.check_write()?;
        let record = R::build(Uuid::new_v4().to_string(), Utc::now(), new);
        R::rows(self).lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: &str, patch: R::Patch) -> Result<Option<R>, StoreError> {
        self.check_write()?;
        let mut rows = R::rows(self).lock().unwrap();
        Ok(rows.iter_mut().find(|r| r.id() == id).map(|record| {
            record.apply(patch);
            record.clone()
        }))
    }

    async fn find(&self, id: &str) -> Result<Option<R>, StoreError> {
        if self.snapshot_fails.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("snapshot read failed".to_string()));
        }
        Ok(R::rows(self)
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == id)
            .cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut rows = R::rows(self).lock().unwrap();
        let before = rows.len();
        rows.retain(|r| r.id() != id);
        Ok(rows.len() < before)
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get(&self) -> Result<Option<Profile>, StoreError> {
        self.check_read()?;
        Ok(self.profile_snapshot())
    }

    async fn upsert(&self, patch: ProfilePatch) -> Result<Profile, StoreError> {
        self.check_write()?;
        let mut rows = self.profiles.lock().unwrap();
        if rows.is_empty() {
            rows.push(Profile::default());
        }
        let profile = &mut rows[0];
        patch.apply(profile);
        Ok(profile.clone())
    }
}

#[async_trait]
impl PublicStore for MemoryStore {
    async fn published_posts(&self) -> Result<Vec<BlogPost>, StoreError> {
        self.check_read()?;
        let mut posts: Vec<BlogPost> = self
            .blogs
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.is_published())
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_date.cmp(&a.created_date));
        Ok(posts)
    }

    async fn published_post(&self, id_or_slug: &str) -> Result<Option<BlogPost>, StoreError> {
        self.check_read()?;
        Ok(self
            .blogs
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.is_published() && p.matches(id_or_slug))
            .cloned())
    }

    async fn projects(&self) -> Result<Vec<Project>, StoreError> {
        self.check_read()?;
        Ok(self.projects.lock().unwrap().clone())
    }

    async fn experiences(&self) -> Result<Vec<Experience>, StoreError> {
        self.check_read()?;
        Ok(self
            .experiences
            .lock()
            .unwrap()
            .iter()
            .cloned()
            .map(Experience::normalized)
            .collect())
    }

    async fn adjust_likes(&self, id: &str, delta: i64) -> Result<Option<i64>, StoreError> {
        self.check_write()?;
        let mut rows = self.blogs.lock().unwrap();
        Ok(rows.iter_mut().find(|p| p.id == id).map(|post| {
            post.likes = (post.likes + delta).max(0);
            post.likes
        }))
    }

    async fn add_comment(
        &self,
        post_id: &str,
        author: &str,
        message: &str,
    ) -> Result<Option<Comment>, StoreError> {
        self.check_write()?;
        let mut rows = self.blogs.lock().unwrap();
        Ok(rows
            .iter_mut()
            .find(|p| p.id == post_id && p.is_published())
            .map(|post| {
                let comment = Comment {
                    id: Uuid::new_v4().to_string(),
                    author: author.to_string(),
                    message: message.to_string(),
                    date: Utc::now(),
                };
                post.comments.push(comment.clone());
                comment
            }))
    }

    async fn ping(&self) -> Result<Duration, StoreError> {
        self.check_read()?;
        Ok(Duration::from_millis(1))
    }
}

#[async_trait]
impl AuditSink for MemoryStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), StoreError> {
        if self.audit_fails.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("audit table unavailable".to_string()));
        }
        self.audit.lock().unwrap().push(entry);
        Ok(())
    }
}
