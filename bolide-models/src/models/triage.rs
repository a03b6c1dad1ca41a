use bolide_dependencies::chrono::{Duration, NaiveDateTime};

use crate::{Badge, Notification, NotificationKind, NotificationStatus};

/// One thread as seen during a sync pass, already mapped out of the wire
/// format. The triage fields (score, badges, status) are derived here.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteObservation {
    pub remote_id: String,
    pub kind: NotificationKind,
    pub title: String,
    pub number: Option<i64>,
    pub repository: String,
    pub repository_url: String,
    pub url: String,
    pub reason: String,
    pub is_author: bool,
    pub remote_updated_at: NaiveDateTime,
}

/// Weight of a single reason occurrence. Reasons the API grows later count
/// as plain subscriptions.
pub fn reason_points(reason: &str) -> i64 {
    match reason {
        "review_requested" => 8,
        "security_alert" => 8,
        "mention" => 6,
        "assign" => 5,
        "author" => 4,
        "team_mention" => 3,
        "comment" => 3,
        "state_change" => 2,
        "subscribed" => 1,
        "manual" => 1,
        _ => 1,
    }
}

pub fn score_for(reasons: &[String]) -> i64 {
    reasons.iter().map(|r| reason_points(r)).sum()
}

/// Appends a reason unless it repeats the latest entry. Returns whether the
/// history grew.
pub fn merge_reasons(reasons: &mut Vec<String>, new: &str) -> bool {
    if reasons.last().map(|r| r.as_str()) == Some(new) {
        return false;
    }
    reasons.push(new.to_string());
    true
}

/// Derives the attention badges from the reason history and thread age.
/// Order is fixed so rows render stably.
pub fn badges_for(
    kind: NotificationKind,
    reasons: &[String],
    first_seen: NaiveDateTime,
    remote_updated: NaiveDateTime,
    now: NaiveDateTime,
) -> Vec<Badge> {
    let mut badges = Vec::new();
    if reasons.len() >= 4 && now - remote_updated < Duration::days(1) {
        badges.push(Badge::Hot);
    }
    if kind == NotificationKind::PullRequest
        && reasons.iter().any(|r| r == "review_requested")
        && now - first_seen > Duration::days(7)
    {
        badges.push(Badge::Old);
    }
    if reasons.iter().filter(|r| r.as_str() == "comment").count() >= 4 {
        badges.push(Badge::Comments);
    }
    badges
}

impl RemoteObservation {
    /// First sighting of a thread: full score history starts with this one
    /// reason and the row lands in the unread queue.
    pub fn into_fresh(&self, user_id: i64, now: NaiveDateTime) -> Notification {
        let reasons = vec![self.reason.clone()];
        let badges = badges_for(self.kind, &reasons, now, self.remote_updated_at, now);
        let score = score_for(&reasons);
        Notification {
            id: 0,
            user_id,
            remote_id: self.remote_id.clone(),
            kind: self.kind,
            title: self.title.clone(),
            number: self.number,
            repository: self.repository.clone(),
            repository_url: self.repository_url.clone(),
            url: self.url.clone(),
            reasons,
            badges,
            score,
            is_author: self.is_author,
            status: NotificationStatus::Queued,
            staged_at: None,
            created_at: now,
            updated_at: self.remote_updated_at,
        }
    }
}

/// Folds a new observation into a stored notification. Fresh remote
/// activity re-queues rows the user had already dealt with; a plain
/// re-observation of the same state leaves the bucket alone but still lets
/// time-based badges decay.
pub fn merge_observation(existing: &mut Notification, obs: &RemoteObservation, now: NaiveDateTime) {
    let moved = obs.remote_updated_at > existing.updated_at;
    if moved {
        merge_reasons(&mut existing.reasons, &obs.reason);
        existing.updated_at = obs.remote_updated_at;
        if existing.status != NotificationStatus::Queued {
            existing.status = NotificationStatus::Queued;
            existing.staged_at = None;
        }
    }
    existing.title = obs.title.clone();
    existing.number = obs.number;
    existing.repository = obs.repository.clone();
    existing.repository_url = obs.repository_url.clone();
    existing.url = obs.url.clone();
    existing.is_author = existing.is_author || obs.is_author;
    existing.score = score_for(&existing.reasons);
    existing.badges = badges_for(
        existing.kind,
        &existing.reasons,
        existing.created_at,
        existing.updated_at,
        now,
    );
}
