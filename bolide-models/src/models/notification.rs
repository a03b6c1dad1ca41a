use std::ops::DerefMut;
use std::str::FromStr;

use bolide_dependencies::chrono::NaiveDateTime;
use sqlx::{query, query_as};
use tracing::trace;

use crate::{merge_observation, pg_text_enum, BolideModelError, Client, RemoteObservation};

/// Triage bucket of a notification. Stored as TEXT, rendered in the UI as
/// Unread / Read / Resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Queued,
    Staged,
    Closed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Queued => "queued",
            NotificationStatus::Staged => "staged",
            NotificationStatus::Closed => "closed",
        }
    }

    /// Tab caption in the inbox.
    pub fn label(&self) -> &'static str {
        match self {
            NotificationStatus::Queued => "Unread",
            NotificationStatus::Staged => "Read",
            NotificationStatus::Closed => "Resolved",
        }
    }
}

impl Default for NotificationStatus {
    fn default() -> Self {
        NotificationStatus::Queued
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for NotificationStatus {
    fn from(s: &str) -> Self {
        match s {
            "staged" => NotificationStatus::Staged,
            "closed" => NotificationStatus::Closed,
            _ => NotificationStatus::Queued,
        }
    }
}

pg_text_enum!(NotificationStatus);

/// Reason scope of the inbox. The sync only mirrors participating threads,
/// so All and Participating select the same rows; Comment narrows down to
/// threads the user commented on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationFilter {
    Participating,
    Comment,
    All,
}

impl NotificationFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationFilter::Participating => "participating",
            NotificationFilter::Comment => "comment",
            NotificationFilter::All => "all",
        }
    }
}

impl Default for NotificationFilter {
    fn default() -> Self {
        NotificationFilter::Participating
    }
}

impl std::fmt::Display for NotificationFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for NotificationFilter {
    fn from(s: &str) -> Self {
        match s {
            "comment" => NotificationFilter::Comment,
            "all" => NotificationFilter::All,
            _ => NotificationFilter::Participating,
        }
    }
}

/// Subject type of the thread behind a notification. GitHub reports more
/// types than we care to distinguish; everything that is neither a pull
/// request nor an issue degrades to Other and renders without an icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum NotificationKind {
    PullRequest,
    Issue,
    Other,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::PullRequest => "PullRequest",
            NotificationKind::Issue => "Issue",
            NotificationKind::Other => "Other",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for NotificationKind {
    fn from(s: &str) -> Self {
        match s {
            "PullRequest" => NotificationKind::PullRequest,
            "Issue" => NotificationKind::Issue,
            _ => NotificationKind::Other,
        }
    }
}

pg_text_enum!(NotificationKind);

/// Attention markers derived during sync. Unknown tokens from newer
/// deployments decode to Unknown and render nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Badge {
    Hot,
    Old,
    Comments,
    Unknown,
}

impl Badge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Badge::Hot => "Hot",
            Badge::Old => "Old",
            Badge::Comments => "Comments",
            Badge::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Badge {
    fn from(s: &str) -> Self {
        match s {
            "Hot" => Badge::Hot,
            "Old" => Badge::Old,
            "Comments" => Badge::Comments,
            _ => Badge::Unknown,
        }
    }
}

impl FromStr for Badge {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Badge::from(s))
    }
}

pg_text_enum!(Badge);

#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub user_id: i64,
    /// GitHub thread id, stable across updates of the same thread.
    pub remote_id: String,
    pub kind: NotificationKind,
    pub title: String,
    /// Issue/PR number from the subject URL; releases and commits have none.
    pub number: Option<i64>,
    pub repository: String,
    pub repository_url: String,
    pub url: String,
    /// Reason history in arrival order, consecutive duplicates collapsed.
    pub reasons: Vec<String>,
    pub badges: Vec<Badge>,
    pub score: i64,
    pub is_author: bool,
    pub status: NotificationStatus,
    pub staged_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    /// Remote update time of the thread, not a local write marker.
    pub updated_at: NaiveDateTime,
}

/// Tab counts for one (filter, query) view of a user's inbox.
#[derive(sqlx::FromRow, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCounts {
    pub queued: i64,
    pub staged: i64,
    pub closed: i64,
}

impl StatusCounts {
    pub fn get(&self, status: NotificationStatus) -> i64 {
        match status {
            NotificationStatus::Queued => self.queued,
            NotificationStatus::Staged => self.staged,
            NotificationStatus::Closed => self.closed,
        }
    }
}

/// Escapes LIKE metacharacters so user queries match literally.
pub fn like_escape(q: &str) -> String {
    q.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

fn filter_clause(filter: NotificationFilter) -> &'static str {
    match filter {
        NotificationFilter::Comment => " AND 'comment' = ANY(reasons)",
        NotificationFilter::Participating | NotificationFilter::All => "",
    }
}

impl Notification {
    pub async fn get(
        client: &mut Client,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Notification>, BolideModelError> {
        Ok(
            query_as::<_, Notification>(
                "SELECT * FROM notifications WHERE id = $1 AND user_id = $2",
            )
            .bind(id)
            .bind(user_id)
            .fetch_optional(client.db().await?.deref_mut())
            .await?,
        )
    }

    pub async fn get_remote(
        client: &mut Client,
        user_id: i64,
        remote_id: &str,
    ) -> Result<Option<Notification>, BolideModelError> {
        Ok(query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = $1 AND remote_id = $2",
        )
        .bind(user_id)
        .bind(remote_id)
        .fetch_optional(client.db().await?.deref_mut())
        .await?)
    }

    /// One page of the inbox, hottest first.
    pub async fn search(
        client: &mut Client,
        user_id: i64,
        status: NotificationStatus,
        filter: NotificationFilter,
        query_text: Option<&str>,
        page: u64,
        page_size: u64,
    ) -> Result<Vec<Notification>, BolideModelError> {
        let pattern = query_text
            .filter(|q| !q.trim().is_empty())
            .map(|q| format!("%{}%", like_escape(q.trim())));
        let mut sql =
            String::from("SELECT * FROM notifications WHERE user_id = $1 AND status = $2");
        sql.push_str(filter_clause(filter));
        let (limit_pos, offset_pos) = if pattern.is_some() {
            sql.push_str(
                " AND (title ILIKE $3 ESCAPE '\\' OR repository ILIKE $3 ESCAPE '\\')",
            );
            (4, 5)
        } else {
            (3, 4)
        };
        sql.push_str(&format!(
            " ORDER BY score DESC, updated_at DESC LIMIT ${} OFFSET ${}",
            limit_pos, offset_pos
        ));
        let offset = page.saturating_sub(1) * page_size;
        trace!("inbox page query for user {}: {}", user_id, sql);
        let mut q = query_as::<_, Notification>(&sql).bind(user_id).bind(status);
        if let Some(pattern) = &pattern {
            q = q.bind(pattern);
        }
        Ok(q.bind(page_size as i64)
            .bind(offset as i64)
            .fetch_all(client.db().await?.deref_mut())
            .await?)
    }

    /// Counts per bucket for the active (filter, query) view, all three in
    /// one round trip so the tabs stay consistent with each other.
    pub async fn status_counts(
        client: &mut Client,
        user_id: i64,
        filter: NotificationFilter,
        query_text: Option<&str>,
    ) -> Result<StatusCounts, BolideModelError> {
        let pattern = query_text
            .filter(|q| !q.trim().is_empty())
            .map(|q| format!("%{}%", like_escape(q.trim())));
        let mut sql = String::from(
            "SELECT \
                COUNT(*) FILTER (WHERE status = 'queued') AS queued, \
                COUNT(*) FILTER (WHERE status = 'staged') AS staged, \
                COUNT(*) FILTER (WHERE status = 'closed') AS closed \
            FROM notifications WHERE user_id = $1",
        );
        sql.push_str(filter_clause(filter));
        if pattern.is_some() {
            sql.push_str(" AND (title ILIKE $2 ESCAPE '\\' OR repository ILIKE $2 ESCAPE '\\')");
        }
        let mut q = query_as::<_, StatusCounts>(&sql).bind(user_id);
        if let Some(pattern) = &pattern {
            q = q.bind(pattern);
        }
        Ok(q.fetch_one(client.db().await?.deref_mut()).await?)
    }

    /// Stage events since the given midnight, for the sidebar tally.
    pub async fn staged_today_count(
        client: &mut Client,
        user_id: i64,
        midnight: NaiveDateTime,
    ) -> Result<i64, BolideModelError> {
        #[derive(sqlx::FromRow)]
        struct Cnt {
            cnt: i64,
        }
        let count: Cnt = query_as(
            "SELECT COUNT(*) AS cnt FROM notifications WHERE user_id = $1 AND staged_at >= $2",
        )
        .bind(user_id)
        .bind(midnight)
        .fetch_one(client.db().await?.deref_mut())
        .await?;
        Ok(count.cnt)
    }

    pub async fn stage(
        &mut self,
        client: &mut Client,
        now: NaiveDateTime,
    ) -> Result<(), BolideModelError> {
        trace!("staging notification {}", self.id);
        self.status = NotificationStatus::Staged;
        self.staged_at = Some(now);
        query("UPDATE notifications SET status = $2, staged_at = $3 WHERE id = $1")
            .bind(self.id)
            .bind(self.status)
            .bind(self.staged_at)
            .execute(client.db().await?.deref_mut())
            .await?;
        Ok(())
    }

    pub async fn restore(&mut self, client: &mut Client) -> Result<(), BolideModelError> {
        trace!("restoring notification {}", self.id);
        self.status = NotificationStatus::Queued;
        self.staged_at = None;
        query("UPDATE notifications SET status = $2, staged_at = NULL WHERE id = $1")
            .bind(self.id)
            .bind(self.status)
            .execute(client.db().await?.deref_mut())
            .await?;
        Ok(())
    }

    pub async fn resolve(&mut self, client: &mut Client) -> Result<(), BolideModelError> {
        trace!("resolving notification {}", self.id);
        self.status = NotificationStatus::Closed;
        query("UPDATE notifications SET status = $2 WHERE id = $1")
            .bind(self.id)
            .bind(self.status)
            .execute(client.db().await?.deref_mut())
            .await?;
        Ok(())
    }

    /// Drops every stored notification of the user. Returns how many went.
    pub async fn clear_for_user(
        client: &mut Client,
        user_id: i64,
    ) -> Result<u64, BolideModelError> {
        let res = query("DELETE FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .execute(client.db().await?.deref_mut())
            .await?;
        Ok(res.rows_affected())
    }

    /// Folds one remote observation into the store: fresh threads land in
    /// QUEUED, known threads merge their reason history and re-queue when
    /// the remote side moved.
    pub async fn ingest(
        client: &mut Client,
        user_id: i64,
        obs: &RemoteObservation,
        now: NaiveDateTime,
    ) -> Result<Notification, BolideModelError> {
        match Self::get_remote(client, user_id, &obs.remote_id).await? {
            Some(mut existing) => {
                merge_observation(&mut existing, obs, now);
                existing.update(client).await?;
                Ok(existing)
            }
            None => {
                let fresh = obs.into_fresh(user_id, now);
                fresh.insert(client).await
            }
        }
    }

    async fn insert(&self, client: &mut Client) -> Result<Notification, BolideModelError> {
        Ok(query_as::<_, Notification>(
            "INSERT INTO notifications \
                (user_id, remote_id, kind, title, number, repository, repository_url, url, \
                 reasons, badges, score, is_author, status, staged_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16) \
             RETURNING *",
        )
        .bind(self.user_id)
        .bind(&self.remote_id)
        .bind(self.kind)
        .bind(&self.title)
        .bind(self.number)
        .bind(&self.repository)
        .bind(&self.repository_url)
        .bind(&self.url)
        .bind(&self.reasons)
        .bind(&self.badges)
        .bind(self.score)
        .bind(self.is_author)
        .bind(self.status)
        .bind(self.staged_at)
        .bind(self.created_at)
        .bind(self.updated_at)
        .fetch_one(client.db().await?.deref_mut())
        .await?)
    }

    pub async fn update(&self, client: &mut Client) -> Result<(), BolideModelError> {
        trace!("updating notification {}", self.id);
        query(
            "UPDATE notifications SET \
                kind = $2, title = $3, number = $4, repository = $5, repository_url = $6, \
                url = $7, reasons = $8, badges = $9, score = $10, is_author = $11, \
                status = $12, staged_at = $13, updated_at = $14 \
             WHERE id = $1",
        )
        .bind(self.id)
        .bind(self.kind)
        .bind(&self.title)
        .bind(self.number)
        .bind(&self.repository)
        .bind(&self.repository_url)
        .bind(&self.url)
        .bind(&self.reasons)
        .bind(&self.badges)
        .bind(self.score)
        .bind(self.is_author)
        .bind(self.status)
        .bind(self.staged_at)
        .bind(self.updated_at)
        .execute(client.db().await?.deref_mut())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn status_round_trips_and_degrades() {
        for status in [
            NotificationStatus::Queued,
            NotificationStatus::Staged,
            NotificationStatus::Closed,
        ] {
            assert_eq!(NotificationStatus::from(status.as_str()), status);
        }
        assert_eq!(
            NotificationStatus::from("garbage"),
            NotificationStatus::Queued
        );
        assert_eq!(NotificationStatus::Queued.label(), "Unread");
        assert_eq!(NotificationStatus::Staged.label(), "Read");
        assert_eq!(NotificationStatus::Closed.label(), "Resolved");
    }

    #[test]
    fn kind_degrades_to_other() {
        assert_eq!(
            NotificationKind::from("PullRequest"),
            NotificationKind::PullRequest
        );
        assert_eq!(NotificationKind::from("Issue"), NotificationKind::Issue);
        assert_eq!(NotificationKind::from("Release"), NotificationKind::Other);
        assert_eq!(NotificationKind::from(""), NotificationKind::Other);
    }

    #[test]
    fn badge_degrades_to_unknown() {
        assert_eq!(Badge::from("Hot"), Badge::Hot);
        assert_eq!(Badge::from("Old"), Badge::Old);
        assert_eq!(Badge::from("Comments"), Badge::Comments);
        assert_eq!(Badge::from("Sparkly"), Badge::Unknown);
    }

    #[test]
    fn like_escape_keeps_globs_literal() {
        assert_eq!(like_escape("50%_done"), "50\\%\\_done");
        assert_eq!(like_escape("back\\slash"), "back\\\\slash");
        assert_eq!(like_escape("plain"), "plain");
    }

    #[test]
    fn filter_defaults_to_participating() {
        assert_eq!(
            NotificationFilter::default(),
            NotificationFilter::Participating
        );
        assert_eq!(NotificationFilter::from("comment"), NotificationFilter::Comment);
        assert_eq!(
            NotificationFilter::from("bogus"),
            NotificationFilter::Participating
        );
    }
}
