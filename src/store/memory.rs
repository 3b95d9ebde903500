//! In-memory collaborator implementations. They back the test suite and are
//! usable as-is by an embedding that does not need durable storage.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use eyre::{eyre, Result};
use uuid::Uuid;

use crate::models::otp::{OtpPurpose, OtpRecord};
use crate::models::post::{NewPost, Post};
use crate::models::user::{SubscriptionPlan, User};
use crate::store::{ClaimOutcome, MediaStore, OtpStore, PostStore, UserDirectory};

#[derive(Default)]
pub struct InMemoryOtpStore {
    records: Mutex<Vec<OtpRecord>>,
}

impl OtpStore for InMemoryOtpStore {
    fn insert(&self, record: OtpRecord) -> Result<()> {
        self.lock()?.push(record);
        Ok(())
    }

    fn claim(
        &self,
        email: &str,
        code: &str,
        purpose: OtpPurpose,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let email = email.trim().to_lowercase();
        let mut records = self.lock()?;

        let mut expired_match = false;
        let mut best: Option<usize> = None;
        for (i, r) in records.iter().enumerate() {
            if r.used || r.email != email || r.code != code || r.purpose != purpose {
                continue;
            }
            if r.expired(now) {
                expired_match = true;
                continue;
            }
            // Prefer the most recently issued unexpired match.
            match best {
                Some(j) if records[j].issued_at >= r.issued_at => {}
                _ => best = Some(i),
            }
        }

        if let Some(i) = best {
            records[i].used = true;
            return Ok(ClaimOutcome::Claimed(records[i].clone()));
        }
        if expired_match {
            // Expired records stay unused; they are invalid at lookup time.
            return Ok(ClaimOutcome::Expired);
        }
        Ok(ClaimOutcome::NotFound)
    }
}

impl InMemoryOtpStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<OtpRecord>>> {
        self.records.lock().map_err(|_| eyre!("otp store mutex poisoned"))
    }

    pub fn records(&self) -> Vec<OtpRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[derive(Default)]
pub struct InMemoryPostStore {
    posts: Mutex<Vec<Post>>,
}

impl PostStore for InMemoryPostStore {
    fn count_between(&self, user_id: Uuid, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<u32> {
        let posts = self.lock()?;
        Ok(posts
            .iter()
            .filter(|p| p.user_id == user_id && from <= p.created_at && p.created_at < to)
            .count() as u32)
    }

    fn append(&self, post: NewPost) -> Result<Post> {
        let created = Post {
            id: Uuid::new_v4(),
            user_id: post.user_id,
            text: post.text,
            audio_url: post.audio_url,
            created_at: post.created_at,
        };
        self.lock()?.push(created.clone());
        Ok(created)
    }
}

impl InMemoryPostStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Post>>> {
        self.posts.lock().map_err(|_| eyre!("post store mutex poisoned"))
    }

    pub fn all(&self) -> Vec<Post> {
        self.posts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserDirectory {
    pub fn upsert(&self, user: User) -> Result<()> {
        self.lock()?.insert(user.id, user);
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, User>>> {
        self.users.lock().map_err(|_| eyre!("user directory mutex poisoned"))
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self.lock()?.values().find(|u| u.email == email).cloned())
    }

    fn set_audio_gate(&self, id: Uuid, verified: bool) -> Result<()> {
        let mut users = self.lock()?;
        let user = users.get_mut(&id).ok_or_else(|| eyre!("user not found"))?;
        user.audio_otp_verified = verified;
        Ok(())
    }

    fn consume_audio_gate(&self, id: Uuid) -> Result<bool> {
        // One lock acquisition covers the read and the clear.
        let mut users = self.lock()?;
        let user = users.get_mut(&id).ok_or_else(|| eyre!("user not found"))?;
        let was_armed = user.audio_otp_verified;
        user.audio_otp_verified = false;
        Ok(was_armed)
    }

    fn set_plan(&self, id: Uuid, plan: SubscriptionPlan, expires_at: DateTime<Utc>) -> Result<()> {
        let mut users = self.lock()?;
        let user = users.get_mut(&id).ok_or_else(|| eyre!("user not found"))?;
        user.plan = plan;
        user.plan_expires_at = Some(expires_at);
        Ok(())
    }
}

/// Media store keeping artifacts in a map; tests assert on stored/deleted
/// locations to check the discard-on-reject rule.
#[derive(Default)]
pub struct InMemoryMediaStore {
    artifacts: Mutex<HashMap<String, Vec<u8>>>,
}

impl MediaStore for InMemoryMediaStore {
    fn store(&self, filename: &str, data: &[u8]) -> Result<String> {
        let location = format!("mem://{filename}");
        self.lock()?.insert(location.clone(), data.to_vec());
        Ok(location)
    }

    fn delete(&self, location: &str) -> Result<()> {
        self.lock()?.remove(location);
        Ok(())
    }
}

impl InMemoryMediaStore {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.artifacts.lock().map_err(|_| eyre!("media store mutex poisoned"))
    }

    pub fn contains(&self, location: &str) -> bool {
        self.artifacts
            .lock()
            .map(|a| a.contains_key(location))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.artifacts.lock().map(|a| a.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::otp::OtpPurpose;
    use crate::policy::window::tests::ist_instant;

    #[test]
    fn claim_marks_used_exactly_once() {
        let store = InMemoryOtpStore::default();
        let issued = ist_instant(15, 0, 0);
        store
            .insert(OtpRecord::new("a@b.c", "123456", OtpPurpose::AudioUpload, issued))
            .unwrap();

        let now = ist_instant(15, 1, 0);
        let first = store.claim("a@b.c", "123456", OtpPurpose::AudioUpload, now).unwrap();
        assert!(matches!(first, ClaimOutcome::Claimed(_)));
        let second = store.claim("a@b.c", "123456", OtpPurpose::AudioUpload, now).unwrap();
        assert_eq!(second, ClaimOutcome::NotFound);
    }

    #[test]
    fn claim_prefers_unexpired_and_leaves_expired_unused() {
        let store = InMemoryOtpStore::default();
        store
            .insert(OtpRecord::new(
                "a@b.c",
                "123456",
                OtpPurpose::AudioUpload,
                ist_instant(10, 0, 0),
            ))
            .unwrap();

        // Past the 10 minute TTL.
        let late = ist_instant(10, 10, 1);
        assert_eq!(
            store.claim("a@b.c", "123456", OtpPurpose::AudioUpload, late).unwrap(),
            ClaimOutcome::Expired
        );
        assert!(store.records().iter().all(|r| !r.used));

        // A fresh record with the same code wins over the expired one.
        store
            .insert(OtpRecord::new(
                "a@b.c",
                "123456",
                OtpPurpose::AudioUpload,
                ist_instant(10, 5, 0),
            ))
            .unwrap();
        assert!(matches!(
            store.claim("a@b.c", "123456", OtpPurpose::AudioUpload, late).unwrap(),
            ClaimOutcome::Claimed(_)
        ));
    }

    #[test]
    fn post_count_respects_bounds() {
        let store = InMemoryPostStore::default();
        let user = Uuid::new_v4();
        for (h, m) in [(0, 1), (12, 0), (23, 59)] {
            store
                .append(NewPost {
                    user_id: user,
                    text: "hi".into(),
                    audio_url: None,
                    created_at: ist_instant(h, m, 0),
                })
                .unwrap();
        }
        let (from, to) = crate::policy::window::ist_day_bounds(ist_instant(12, 0, 0));
        assert_eq!(store.count_between(user, from, to).unwrap(), 3);
        assert_eq!(store.count_between(Uuid::new_v4(), from, to).unwrap(), 0);
    }
}
