use std::ops::DerefMut;

use bolide_dependencies::chrono::{Duration, NaiveDateTime};
use bolide_dependencies::securefmt;
use sqlx::{query, query_as};
use tracing::trace;

use crate::{BolideModelError, Client};

/// How long a fetch marker is trusted before it counts as abandoned, so a
/// crashed sync cannot leave the refresh control disabled forever.
const FETCH_MARKER_TTL: i64 = 10;

#[derive(sqlx::FromRow, securefmt::Debug, Clone, PartialEq)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    #[sensitive]
    pub github_token: String,
    /// ETag of the last notification listing, for conditional fetches.
    pub etag: Option<String>,
    pub last_synced_at: Option<NaiveDateTime>,
    pub fetching_since: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    pub fn displayname(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.login)
    }

    /// True while a sync for this user is believed to be running.
    pub fn is_fetching(&self, now: NaiveDateTime) -> bool {
        match self.fetching_since {
            Some(since) => now - since < Duration::minutes(FETCH_MARKER_TTL),
            None => false,
        }
    }

    /// Whether the scheduler should enqueue a sync for this user.
    pub fn sync_due(&self, now: NaiveDateTime, poll_interval: Duration) -> bool {
        if self.is_fetching(now) {
            return false;
        }
        match self.last_synced_at {
            None => true,
            Some(synced) => now - synced >= poll_interval,
        }
    }

    pub async fn get_id(client: &mut Client, id: i64) -> Result<Option<User>, BolideModelError> {
        Ok(query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(client.db().await?.deref_mut())
            .await?)
    }

    pub async fn get_by_login(
        client: &mut Client,
        login: &str,
    ) -> Result<Option<User>, BolideModelError> {
        Ok(query_as::<_, User>("SELECT * FROM users WHERE login = $1")
            .bind(login)
            .fetch_optional(client.db().await?.deref_mut())
            .await?)
    }

    pub async fn all(client: &mut Client) -> Result<Vec<User>, BolideModelError> {
        Ok(query_as::<_, User>("SELECT * FROM users ORDER BY id")
            .fetch_all(client.db().await?.deref_mut())
            .await?)
    }

    /// Registers or refreshes a user from their verified GitHub profile.
    /// The stored token is replaced on every sign-in.
    pub async fn upsert_from_remote(
        client: &mut Client,
        login: &str,
        name: Option<&str>,
        avatar_url: Option<&str>,
        github_token: &str,
        now: NaiveDateTime,
    ) -> Result<User, BolideModelError> {
        trace!("upserting user {}", login);
        let user = query_as::<_, User>(
            "INSERT INTO users (login, name, avatar_url, github_token, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             ON CONFLICT (login) DO UPDATE SET \
                name = EXCLUDED.name, \
                avatar_url = EXCLUDED.avatar_url, \
                github_token = EXCLUDED.github_token, \
                updated_at = EXCLUDED.updated_at \
             RETURNING *",
        )
        .bind(login)
        .bind(name)
        .bind(avatar_url)
        .bind(github_token)
        .bind(now)
        .fetch_one(client.db().await?.deref_mut())
        .await?;
        client.invalidate_user(user.id).await;
        Ok(user)
    }

    /// Marks a sync as started so the UI can show the fetch spinner and the
    /// scheduler stays off this user.
    pub async fn mark_fetching(
        &mut self,
        client: &mut Client,
        now: NaiveDateTime,
    ) -> Result<(), BolideModelError> {
        self.fetching_since = Some(now);
        query("UPDATE users SET fetching_since = $2 WHERE id = $1")
            .bind(self.id)
            .bind(self.fetching_since)
            .execute(client.db().await?.deref_mut())
            .await?;
        client.invalidate_user(self.id).await;
        Ok(())
    }

    pub async fn finish_fetch(
        &mut self,
        client: &mut Client,
        now: NaiveDateTime,
        etag: Option<String>,
    ) -> Result<(), BolideModelError> {
        self.fetching_since = None;
        self.last_synced_at = Some(now);
        self.etag = etag;
        query("UPDATE users SET fetching_since = NULL, last_synced_at = $2, etag = $3 WHERE id = $1")
            .bind(self.id)
            .bind(self.last_synced_at)
            .bind(&self.etag)
            .execute(client.db().await?.deref_mut())
            .await?;
        client.invalidate_user(self.id).await;
        Ok(())
    }

    /// Wipes the conditional-fetch state, used together with the cache
    /// clear so the next sync rebuilds from scratch.
    pub async fn reset_sync_state(&mut self, client: &mut Client) -> Result<(), BolideModelError> {
        self.etag = None;
        self.last_synced_at = None;
        query("UPDATE users SET etag = NULL, last_synced_at = NULL WHERE id = $1")
            .bind(self.id)
            .execute(client.db().await?.deref_mut())
            .await?;
        client.invalidate_user(self.id).await;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bolide_dependencies::chrono::NaiveDate;

    fn dt(day: u32, hour: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 9, day)
            .unwrap()
            .and_hms_opt(hour, min, 0)
            .unwrap()
    }

    fn user() -> User {
        User {
            id: 1,
            login: "octocat".to_string(),
            name: None,
            avatar_url: None,
            github_token: "ghp_test".to_string(),
            etag: None,
            last_synced_at: None,
            fetching_since: None,
            created_at: dt(1, 0, 0),
            updated_at: dt(1, 0, 0),
        }
    }

    #[test]
    fn displayname_falls_back_to_login() {
        let mut u = user();
        assert_eq!(u.displayname(), "octocat");
        u.name = Some("The Octocat".to_string());
        assert_eq!(u.displayname(), "The Octocat");
    }

    #[test]
    fn stale_fetch_markers_expire() {
        let mut u = user();
        assert!(!u.is_fetching(dt(2, 12, 0)));
        u.fetching_since = Some(dt(2, 12, 0));
        assert!(u.is_fetching(dt(2, 12, 5)));
        assert!(!u.is_fetching(dt(2, 12, 10)));
        assert!(!u.is_fetching(dt(3, 0, 0)));
    }

    #[test]
    fn sync_due_respects_interval_and_markers() {
        let mut u = user();
        let now = dt(2, 12, 0);
        // never synced
        assert!(u.sync_due(now, Duration::minutes(2)));
        u.last_synced_at = Some(dt(2, 11, 59));
        assert!(!u.sync_due(now, Duration::minutes(2)));
        u.last_synced_at = Some(dt(2, 11, 58));
        assert!(u.sync_due(now, Duration::minutes(2)));
        // a live fetch marker blocks re-enqueueing
        u.fetching_since = Some(now);
        assert!(!u.sync_due(now, Duration::minutes(2)));
    }

    #[test]
    fn token_stays_out_of_debug_output() {
        let u = user();
        let dbg = format!("{:?}", u);
        assert!(!dbg.contains("ghp_test"));
        assert!(dbg.contains("octocat"));
    }
}
