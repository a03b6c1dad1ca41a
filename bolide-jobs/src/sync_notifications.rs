use bolide_core::{
    config::Configuration,
    error::{BolideError, BolideResult},
    http_client,
};
use bolide_dependencies::{
    chrono::{DateTime, Utc},
    lazy_static::lazy_static,
    regex::Regex,
    reqwest,
};
use bolide_models::{Client, Notification, NotificationKind, RemoteObservation, User};
use sqlxmq::{Checkpoint, CurrentJob};

use crate::SharedCtx;

const PER_PAGE: usize = 100;
const MAX_PAGES: u64 = 10;

lazy_static! {
    static ref TRAILING_NUMBER: Regex = Regex::new(r"/(\d+)$").expect("static regex");
}

#[derive(serde::Serialize, serde::Deserialize, Clone, Debug, Default)]
pub struct SyncConfig {
    pub user_id: i64,
    /// Page to resume from after a checkpointed retry.
    #[serde(default)]
    pub page: u64,
}

#[instrument(skip(current_job, sctx))]
#[sqlxmq::job(retries = 3)]
pub async fn run_job(mut current_job: CurrentJob, sctx: SharedCtx) -> BolideResult<()> {
    let progress: SyncConfig = current_job
        .json()?
        .expect("job requires configuration copy");
    info!(
        "Job {}: Syncing notifications for user {}",
        current_job.id(),
        progress.user_id
    );
    let mut client = sctx.client.clone();
    let user = match User::get_id(&mut client, progress.user_id).await? {
        Some(user) => user,
        None => {
            warn!("user {} vanished before sync, dropping job", progress.user_id);
            current_job.complete().await?;
            return Ok(());
        }
    };
    sync_user(&sctx.config, &mut client, &mut current_job, user, progress).await?;
    current_job.complete().await?;
    Ok(())
}

async fn sync_user(
    config: &Configuration,
    client: &mut Client,
    current_job: &mut CurrentJob,
    mut user: User,
    mut progress: SyncConfig,
) -> BolideResult<()> {
    let http = http_client(config)?;
    let now = Utc::now().naive_utc();
    let mut checkpoint = Checkpoint::new();
    let mut page = progress.page.max(1);
    let mut new_etag: Option<String> = None;
    loop {
        if page > MAX_PAGES {
            warn!("user {}: giving up after {} pages", user.id, MAX_PAGES);
            break;
        }
        let url = config.github_api_base.join("notifications")?;
        let req = http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header(
                reqwest::header::AUTHORIZATION,
                format!("token {}", user.github_token),
            )
            .query(&[("all", "true"), ("participating", "true")])
            .query(&[("page", page.to_string().as_str()), ("per_page", "100")]);
        // conditional fetch only makes sense for the first page
        let req = match (&user.etag, page) {
            (Some(etag), 1) => req.header(reqwest::header::IF_NONE_MATCH, etag.clone()),
            _ => req,
        };
        let resp = req.send().await?;
        if resp.status() == reqwest::StatusCode::NOT_MODIFIED {
            trace!("user {}: nothing changed upstream", user.id);
            let etag = user.etag.clone();
            user.finish_fetch(client, now, etag).await?;
            return Ok(());
        }
        if !resp.status().is_success() {
            return Err(BolideError::GithubApi(format!(
                "notification listing failed with {}",
                resp.status()
            )));
        }
        if page == 1 {
            new_etag = resp
                .headers()
                .get(reqwest::header::ETAG)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string());
        }
        let threads: Vec<RemoteThread> = resp.json().await?;
        let count = threads.len();
        for thread in threads {
            let obs = thread.into_observation();
            Notification::ingest(client, user.id, &obs, now).await?;
        }
        trace!("user {}: page {} carried {} threads", user.id, page, count);
        if count < PER_PAGE {
            break;
        }
        page += 1;
        progress.page = page;
        checkpoint.set_json(&progress)?;
        current_job.checkpoint(&checkpoint).await?;
    }
    user.finish_fetch(client, now, new_etag).await?;
    Ok(())
}

#[derive(serde::Deserialize, Debug)]
struct RemoteThread {
    id: String,
    reason: String,
    updated_at: DateTime<Utc>,
    subject: RemoteSubject,
    repository: RemoteRepository,
}

#[derive(serde::Deserialize, Debug)]
struct RemoteSubject {
    title: String,
    url: Option<String>,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(serde::Deserialize, Debug)]
struct RemoteRepository {
    full_name: String,
    html_url: String,
}

impl RemoteThread {
    fn into_observation(self) -> RemoteObservation {
        let number = self.subject.url.as_deref().and_then(subject_number);
        let url = html_url(self.subject.url.as_deref(), &self.repository.html_url);
        RemoteObservation {
            remote_id: self.id,
            kind: NotificationKind::from(self.subject.kind.as_str()),
            title: self.subject.title,
            number,
            repository: self.repository.full_name,
            repository_url: self.repository.html_url,
            url,
            is_author: self.reason == "author",
            reason: self.reason,
            remote_updated_at: self.updated_at.naive_utc(),
        }
    }
}

fn subject_number(subject_url: &str) -> Option<i64> {
    TRAILING_NUMBER
        .captures(subject_url)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// The listing API hands out api URLs for the subjects, the inbox links to
/// the web UI instead. Covers github.com and enterprise /api/v3 layouts.
fn html_url(subject_url: Option<&str>, repo_html_url: &str) -> String {
    match subject_url {
        Some(u) => u
            .replacen("//api.github.com/repos/", "//github.com/", 1)
            .replacen("/api/v3/repos/", "/", 1)
            .replacen("/pulls/", "/pull/", 1)
            .replacen("/commits/", "/commit/", 1),
        None => repo_html_url.to_string(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn subject_numbers_come_from_the_last_path_segment() {
        assert_eq!(
            subject_number("https://api.github.com/repos/rust-lang/rust/issues/1024"),
            Some(1024)
        );
        assert_eq!(
            subject_number("https://api.github.com/repos/rust-lang/rust/pulls/77"),
            Some(77)
        );
        assert_eq!(
            subject_number("https://api.github.com/repos/rust-lang/rust/releases"),
            None
        );
    }

    #[test]
    fn subject_urls_rewrite_to_the_web_ui() {
        assert_eq!(
            html_url(
                Some("https://api.github.com/repos/rust-lang/rust/pulls/77"),
                "https://github.com/rust-lang/rust"
            ),
            "https://github.com/rust-lang/rust/pull/77"
        );
        assert_eq!(
            html_url(
                Some("https://ghe.example.com/api/v3/repos/core/infra/issues/5"),
                "https://ghe.example.com/core/infra"
            ),
            "https://ghe.example.com/core/infra/issues/5"
        );
        assert_eq!(
            html_url(None, "https://github.com/rust-lang/rust"),
            "https://github.com/rust-lang/rust"
        );
    }

    #[test]
    fn threads_map_to_observations() {
        let thread = RemoteThread {
            id: "thread-9".to_string(),
            reason: "author".to_string(),
            updated_at: "2023-09-03T10:00:00Z".parse().unwrap(),
            subject: RemoteSubject {
                title: "Fix the flux capacitor".to_string(),
                url: Some("https://api.github.com/repos/doc/delorean/pulls/88".to_string()),
                kind: "PullRequest".to_string(),
            },
            repository: RemoteRepository {
                full_name: "doc/delorean".to_string(),
                html_url: "https://github.com/doc/delorean".to_string(),
            },
        };
        let obs = thread.into_observation();
        assert_eq!(obs.kind, NotificationKind::PullRequest);
        assert_eq!(obs.number, Some(88));
        assert_eq!(obs.url, "https://github.com/doc/delorean/pull/88");
        assert!(obs.is_author);
        assert_eq!(obs.reason, "author");
        assert_eq!(obs.repository, "doc/delorean");
    }

    #[test]
    fn unknown_subject_kinds_degrade_to_other() {
        let thread = RemoteThread {
            id: "thread-10".to_string(),
            reason: "subscribed".to_string(),
            updated_at: "2023-09-03T10:00:00Z".parse().unwrap(),
            subject: RemoteSubject {
                title: "v1.2 tagged".to_string(),
                url: None,
                kind: "Release".to_string(),
            },
            repository: RemoteRepository {
                full_name: "doc/delorean".to_string(),
                html_url: "https://github.com/doc/delorean".to_string(),
            },
        };
        let obs = thread.into_observation();
        assert_eq!(obs.kind, NotificationKind::Other);
        assert_eq!(obs.number, None);
        assert_eq!(obs.url, "https://github.com/doc/delorean");
        assert!(!obs.is_author);
    }
}
