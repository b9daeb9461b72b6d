//! # Guestbook
//!
//! The one store service every transport goes through.
//!
//! ## Submit
//! 1. Trim and truncate name (100), comment (500) and course (50)
//! 2. Derive a display location from the geolocation hint
//! 3. Reject if the submitter's last accepted submission is younger than the cooldown
//! 4. Append a fresh entry, keep only the newest `entry_cap` entries
//! 5. Persist the collection, then stamp the submitter's rate-limit record
//!
//! ## Delete
//! Shared-secret bearer check, then remove by id.
use std::sync::Arc;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::{Config, Environment},
    error::AppError,
    models::{
        COMMENT_MAX_CHARS, COURSE_MAX_CHARS, Entry, GeoHint, NAME_MAX_CHARS, PublicEntry,
        RateLimitRecord, SubmitPayload,
    },
    storage::BlobStore,
    utils::{location, sanitize},
};

pub const ENTRIES_KEY: &str = "entries";
pub const RATE_LIMIT_PREFIX: &str = "rate_limit_";

#[derive(Clone, Debug)]
pub struct Settings {
    pub entry_cap: usize,
    pub cooldown: TimeDelta,
    pub environment: Environment,
    pub admin_password: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            entry_cap: 1000,
            cooldown: TimeDelta::milliseconds(60_000),
            environment: Environment::Production,
            admin_password: None,
        }
    }
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Self {
            entry_cap: config.entry_cap,
            cooldown: TimeDelta::milliseconds(config.cooldown_ms),
            environment: config.environment,
            admin_password: config.admin_password.clone(),
        }
    }
}

pub struct Guestbook {
    store: Arc<dyn BlobStore>,
    settings: Settings,
}

impl Guestbook {
    pub fn new(store: Arc<dyn BlobStore>, settings: Settings) -> Self {
        Self { store, settings }
    }

    /// All entries, newest first, without submitter addresses.
    pub async fn list(&self) -> Result<Vec<PublicEntry>, AppError> {
        let mut entries = self.load().await?;
        sort_newest_first(&mut entries);

        Ok(entries.into_iter().map(PublicEntry::from).collect())
    }

    pub async fn submit(
        &self,
        payload: SubmitPayload,
        submitter: &str,
        geo: Option<&GeoHint>,
    ) -> Result<PublicEntry, AppError> {
        self.submit_at(payload, submitter, geo, Utc::now()).await
    }

    pub async fn submit_at(
        &self,
        payload: SubmitPayload,
        submitter: &str,
        geo: Option<&GeoHint>,
        now: DateTime<Utc>,
    ) -> Result<PublicEntry, AppError> {
        let (name, comment, course) = validate(payload)?;
        let location = location(geo, self.settings.environment);

        // stored timestamps only keep milliseconds, compare at the same precision
        let now = now.trunc_subsecs(3);
        self.check_cooldown(submitter, now).await?;

        let entry = Entry {
            id: Uuid::new_v4().to_string(),
            name,
            comment,
            course,
            location,
            timestamp: now,
            submitter_address: Some(submitter.to_string()),
        };

        let mut entries = self.load().await?;
        entries.push(entry.clone());

        if entries.len() > self.settings.entry_cap {
            sort_newest_first(&mut entries);
            entries.truncate(self.settings.entry_cap);
        }

        self.save(&entries).await?;

        let record = serde_json::to_string(&RateLimitRecord { timestamp: now })?;
        let key = rate_limit_key(submitter);

        // the record is useless once the cooldown is over
        match self.settings.cooldown.to_std() {
            Ok(ttl) if !ttl.is_zero() => self.store.set_expiring(&key, record, ttl).await?,
            _ => self.store.set(&key, record).await?,
        }

        info!("Accepted entry {} ({} stored)", entry.id, entries.len());

        Ok(entry.into())
    }

    /// Removes one entry. The credential is checked before the id is even looked at.
    pub async fn delete(&self, id: Option<&str>, credential: Option<&str>) -> Result<(), AppError> {
        self.authorize(credential)?;

        let id = id.filter(|id| !id.is_empty()).ok_or(AppError::MissingId)?;

        let mut entries = self.load().await?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);

        if entries.len() == before {
            return Err(AppError::NotFound);
        }

        self.save(&entries).await?;
        info!("Deleted entry {id}");

        Ok(())
    }

    fn authorize(&self, credential: Option<&str>) -> Result<(), AppError> {
        match (&self.settings.admin_password, credential) {
            (Some(secret), Some(credential))
                if bool::from(secret.as_bytes().ct_eq(credential.as_bytes())) =>
            {
                Ok(())
            }
            _ => {
                warn!("Rejected delete with bad credential");
                Err(AppError::Unauthorized)
            }
        }
    }

    async fn check_cooldown(&self, submitter: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        let Some(raw) = self.store.get(&rate_limit_key(submitter)).await? else {
            return Ok(());
        };

        let record: RateLimitRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("Ignoring unreadable rate-limit record for {submitter}: {e}");
                return Ok(());
            }
        };

        if now - record.timestamp < self.settings.cooldown {
            info!("Rate limited {submitter}");
            return Err(AppError::RateLimited);
        }

        Ok(())
    }

    async fn load(&self) -> Result<Vec<Entry>, AppError> {
        match self.store.get(ENTRIES_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, entries: &[Entry]) -> Result<(), AppError> {
        let raw = serde_json::to_string(entries)?;

        Ok(self.store.set(ENTRIES_KEY, raw).await?)
    }
}

fn validate(payload: SubmitPayload) -> Result<(String, String, Option<String>), AppError> {
    let (Some(name), Some(comment)) = (payload.name, payload.comment) else {
        return Err(AppError::MissingFields);
    };

    if name.is_empty() || comment.is_empty() {
        return Err(AppError::MissingFields);
    }

    let name = sanitize(&name, NAME_MAX_CHARS);
    let comment = sanitize(&comment, COMMENT_MAX_CHARS);

    if name.is_empty() || comment.is_empty() {
        return Err(AppError::EmptyFields);
    }

    let course = payload
        .course
        .map(|course| sanitize(&course, COURSE_MAX_CHARS))
        .filter(|course| !course.is_empty());

    Ok((name, comment, course))
}

fn sort_newest_first(entries: &mut [Entry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

fn rate_limit_key(submitter: &str) -> String {
    format!("{RATE_LIMIT_PREFIX}{submitter}")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::storage::MemoryStore;

    const SECRET: &str = "correct horse";

    fn guestbook() -> (Guestbook, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let settings = Settings {
            admin_password: Some(SECRET.to_string()),
            ..Settings::default()
        };

        (Guestbook::new(store.clone(), settings), store)
    }

    fn payload(name: &str, comment: &str) -> SubmitPayload {
        SubmitPayload {
            name: Some(name.to_string()),
            comment: Some(comment.to_string()),
            course: None,
        }
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + TimeDelta::seconds(seconds)
    }

    #[tokio::test]
    async fn test_submit_returns_public_entry() {
        let (guestbook, _) = guestbook();

        let entry = guestbook
            .submit_at(payload("  Ada  ", "hello"), "10.0.0.1", None, at(0))
            .await
            .unwrap();

        assert!(!entry.id.is_empty());
        assert_eq!(entry.name, "Ada");
        assert_eq!(entry.comment, "hello");
        assert_eq!(entry.location, "Unknown");
        assert_eq!(entry.timestamp, at(0));

        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("ip").is_none());
    }

    #[tokio::test]
    async fn test_submit_persists_submitter_address() {
        let (guestbook, store) = guestbook();

        guestbook
            .submit_at(payload("Ada", "hello"), "10.0.0.1", None, at(0))
            .await
            .unwrap();

        let raw = store.get(ENTRIES_KEY).await.unwrap().unwrap();
        let stored: Vec<Entry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored[0].submitter_address.as_deref(), Some("10.0.0.1"));

        assert!(store.get("rate_limit_10.0.0.1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_submit_truncates_fields() {
        let (guestbook, _) = guestbook();
        let submission = SubmitPayload {
            name: Some("n".repeat(150)),
            comment: Some("c".repeat(600)),
            course: Some(format!("  {}  ", "k".repeat(80))),
        };

        let entry = guestbook.submit_at(submission, "10.0.0.1", None, at(0)).await.unwrap();

        assert_eq!(entry.name.chars().count(), 100);
        assert_eq!(entry.comment.chars().count(), 500);
        assert_eq!(entry.course.unwrap().chars().count(), 50);
    }

    #[tokio::test]
    async fn test_blank_course_is_dropped() {
        let (guestbook, _) = guestbook();
        let submission = SubmitPayload {
            course: Some("   ".to_string()),
            ..payload("Ada", "hello")
        };

        let entry = guestbook.submit_at(submission, "10.0.0.1", None, at(0)).await.unwrap();

        assert_eq!(entry.course, None);
    }

    #[tokio::test]
    async fn test_submit_rejects_missing_and_blank_fields() {
        let (guestbook, store) = guestbook();

        let result = guestbook.submit_at(payload("", "x"), "10.0.0.1", None, at(0)).await;
        assert!(matches!(result, Err(AppError::MissingFields)));

        let result = guestbook.submit_at(payload("   ", "x"), "10.0.0.1", None, at(0)).await;
        assert!(matches!(result, Err(AppError::EmptyFields)));

        let result = guestbook
            .submit_at(SubmitPayload::default(), "10.0.0.1", None, at(0))
            .await;
        assert!(matches!(result, Err(AppError::MissingFields)));

        assert!(store.get(ENTRIES_KEY).await.unwrap().is_none());
        assert!(store.get("rate_limit_10.0.0.1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cooldown() {
        let (guestbook, _) = guestbook();

        guestbook
            .submit_at(payload("Ada", "one"), "10.0.0.1", None, at(0))
            .await
            .unwrap();

        let result = guestbook
            .submit_at(payload("Ada", "two"), "10.0.0.1", None, at(59))
            .await;
        assert!(matches!(result, Err(AppError::RateLimited)));

        // other submitters are unaffected
        guestbook
            .submit_at(payload("Grace", "hi"), "10.0.0.2", None, at(30))
            .await
            .unwrap();

        guestbook
            .submit_at(payload("Ada", "three"), "10.0.0.1", None, at(61))
            .await
            .unwrap();

        assert_eq!(guestbook.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_cooldown_boundary() {
        let (guestbook, _) = guestbook();
        let start = at(0);

        guestbook
            .submit_at(payload("Ada", "one"), "10.0.0.1", None, start)
            .await
            .unwrap();

        let result = guestbook
            .submit_at(
                payload("Ada", "early"),
                "10.0.0.1",
                None,
                start + TimeDelta::milliseconds(59_999),
            )
            .await;
        assert!(matches!(result, Err(AppError::RateLimited)));

        guestbook
            .submit_at(
                payload("Ada", "on time"),
                "10.0.0.1",
                None,
                start + TimeDelta::milliseconds(60_000),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_submission_does_not_reset_cooldown() {
        let (guestbook, _) = guestbook();

        guestbook
            .submit_at(payload("Ada", "one"), "10.0.0.1", None, at(0))
            .await
            .unwrap();
        let _ = guestbook
            .submit_at(payload("Ada", "two"), "10.0.0.1", None, at(50))
            .await;

        guestbook
            .submit_at(payload("Ada", "three"), "10.0.0.1", None, at(60))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let (guestbook, _) = guestbook();

        for (i, address) in ["a", "b", "c"].iter().enumerate() {
            guestbook
                .submit_at(payload(address, "hi"), address, None, at(i as i64))
                .await
                .unwrap();
        }

        let names: Vec<String> = guestbook.list().await.unwrap().into_iter().map(|e| e.name).collect();

        assert_eq!(names, ["c", "b", "a"]);
    }

    #[tokio::test]
    async fn test_collection_is_capped() {
        let (guestbook, _) = guestbook();

        for i in 0..1001 {
            let address = format!("10.0.{}.{}", i / 256, i % 256);

            guestbook
                .submit_at(payload(&format!("visitor {i}"), "hi"), &address, None, at(i))
                .await
                .unwrap();
        }

        let entries = guestbook.list().await.unwrap();

        assert_eq!(entries.len(), 1000);
        assert_eq!(entries[0].name, "visitor 1000");
        assert_eq!(entries[999].name, "visitor 1");
        assert!(entries.windows(2).all(|pair| pair[0].timestamp >= pair[1].timestamp));
    }

    #[tokio::test]
    async fn test_delete_removes_only_target() {
        let (guestbook, _) = guestbook();

        let first = guestbook
            .submit_at(payload("Ada", "one"), "10.0.0.1", None, at(0))
            .await
            .unwrap();
        let second = guestbook
            .submit_at(payload("Grace", "two"), "10.0.0.2", None, at(1))
            .await
            .unwrap();

        guestbook.delete(Some(&first.id), Some(SECRET)).await.unwrap();

        let remaining = guestbook.list().await.unwrap();
        assert_eq!(remaining, vec![second]);
    }

    #[tokio::test]
    async fn test_delete_with_wrong_credential() {
        let (guestbook, _) = guestbook();

        let entry = guestbook
            .submit_at(payload("Ada", "one"), "10.0.0.1", None, at(0))
            .await
            .unwrap();

        let result = guestbook.delete(Some(&entry.id), Some("guess")).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));

        let result = guestbook.delete(Some(&entry.id), None).await;
        assert!(matches!(result, Err(AppError::Unauthorized)));

        assert_eq!(guestbook.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_without_configured_secret() {
        let store = Arc::new(MemoryStore::default());
        let guestbook = Guestbook::new(store, Settings::default());

        let result = guestbook.delete(Some("anything"), Some("")).await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_delete_missing_and_unknown_id() {
        let (guestbook, _) = guestbook();

        let result = guestbook.delete(None, Some(SECRET)).await;
        assert!(matches!(result, Err(AppError::MissingId)));

        let result = guestbook.delete(Some("nope"), Some(SECRET)).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_corrupt_blob_is_internal_error() {
        let (guestbook, store) = guestbook();
        store.set(ENTRIES_KEY, "{not json".to_string()).await.unwrap();

        let result = guestbook.list().await;

        assert!(matches!(result, Err(AppError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_location_placeholder_in_development() {
        let store = Arc::new(MemoryStore::default());
        let settings = Settings {
            environment: Environment::Development,
            ..Settings::default()
        };
        let guestbook = Guestbook::new(store, settings);
        let geo = GeoHint {
            city: Some("Lyon".to_string()),
            country: Some("France".to_string()),
        };

        let entry = guestbook
            .submit_at(payload("Ada", "hi"), "10.0.0.1", Some(&geo), at(0))
            .await
            .unwrap();

        assert_eq!(entry.location, "Local Development");
    }

    #[tokio::test]
    async fn test_unreadable_rate_limit_record_is_ignored() {
        let (guestbook, store) = guestbook();
        store
            .set("rate_limit_10.0.0.1", "garbage".to_string())
            .await
            .unwrap();

        guestbook
            .submit_at(payload("Ada", "hi"), "10.0.0.1", None, at(0))
            .await
            .unwrap();

        // the bad record was replaced, so the cooldown applies again
        let result = guestbook
            .submit_at(payload("Ada", "again"), "10.0.0.1", None, at(1))
            .await;
        assert!(matches!(result, Err(AppError::RateLimited)));
    }

    #[tokio::test]
    async fn test_rate_limit_record_expires_with_cooldown() {
        let store = Arc::new(MemoryStore::default());
        let settings = Settings {
            cooldown: TimeDelta::milliseconds(30),
            ..Settings::default()
        };
        let guestbook = Guestbook::new(store.clone(), settings);

        guestbook
            .submit(payload("Ada", "hi"), "10.0.0.1", None)
            .await
            .unwrap();
        assert!(store.get("rate_limit_10.0.0.1").await.unwrap().is_some());

        tokio::time::sleep(std::time::Duration::from_millis(80)).await;

        assert!(store.get("rate_limit_10.0.0.1").await.unwrap().is_none());
        guestbook
            .submit(payload("Ada", "again"), "10.0.0.1", None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_delete_rejects_secret_prefix_and_extension() {
        let (guestbook, _) = guestbook();

        let entry = guestbook
            .submit_at(payload("Ada", "one"), "10.0.0.1", None, at(0))
            .await
            .unwrap();

        for credential in ["correct", "correct horse battery", ""] {
            let result = guestbook.delete(Some(&entry.id), Some(credential)).await;
            assert!(matches!(result, Err(AppError::Unauthorized)));
        }

        assert_eq!(guestbook.list().await.unwrap().len(), 1);
    }
}
