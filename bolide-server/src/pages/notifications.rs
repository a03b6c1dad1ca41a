//! The inbox and every command its rows and toolbar can issue.

use axum::{
    extract::{Query, State},
    response::Redirect,
    Form, Router,
};
use axum_extra::routing::{RouterExt, TypedPath};
use bolide_dependencies::axum_flash::Flash;
use bolide_dependencies::chrono::{Local, Utc};
use bolide_dependencies::serde_urlencoded;
use maud::{html, Markup};

use bolide_core::{
    error::{BolideError, BolideResult},
    request_helper::{ApiFormData, BolideResponse, FormMethod},
    session::Authenticated,
    state::{BolideRequestState, BolideState},
};
use bolide_models::{
    Client, Notification, NotificationFilter, NotificationStatus, User,
};

use crate::pages::common::frontmatter::{app, HeaderSearch};
use crate::pages::common::inbox::{inbox_page, InboxView};
use crate::pages::common::pagination::{last_page_for, PageInfo, PAGE_SIZE};
use crate::pages::common::timeago;

#[derive(TypedPath, serde::Deserialize)]
#[typed_path("/")]
pub struct PathHome {}

#[derive(TypedPath, serde::Deserialize)]
#[typed_path("/notifications")]
pub struct PathNotifications {}

#[derive(TypedPath, serde::Deserialize)]
#[typed_path("/notifications/:id/open")]
pub struct PathNotificationOpen {
    pub id: i64,
}

#[derive(TypedPath, serde::Deserialize)]
#[typed_path("/notifications/:id/stage")]
pub struct PathNotificationStage {
    pub id: i64,
}

#[derive(TypedPath, serde::Deserialize)]
#[typed_path("/notifications/:id/restore")]
pub struct PathNotificationRestore {
    pub id: i64,
}

#[derive(TypedPath, serde::Deserialize)]
#[typed_path("/notifications/:id/resolve")]
pub struct PathNotificationResolve {
    pub id: i64,
}

#[derive(TypedPath, serde::Deserialize)]
#[typed_path("/notifications/refresh")]
pub struct PathNotificationsRefresh {}

#[derive(TypedPath, serde::Deserialize)]
#[typed_path("/notifications/clear")]
pub struct PathNotificationsClear {}

pub fn notification_pages(r: Router<BolideState>) -> Router<BolideState> {
    r.typed_get(home)
        .typed_get(index)
        .typed_post(open_thread)
        .typed_post(stage)
        .typed_post(restore)
        .typed_post(resolve)
        .typed_post(refresh)
        .typed_post(clear_cache)
}

/// View state the inbox carries through every link and form. Kept stringly
/// typed at the wire so a stale or hand-edited URL degrades to the default
/// view instead of rejecting the request.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct InboxQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
}

impl InboxQuery {
    /// Builds the query for a view, leaving defaults out so URLs stay short.
    pub fn for_view(
        status: NotificationStatus,
        filter: NotificationFilter,
        page: u64,
        query: Option<&str>,
    ) -> Self {
        Self {
            status: (status != NotificationStatus::default())
                .then(|| status.as_str().to_string()),
            filter: (filter != NotificationFilter::default())
                .then(|| filter.as_str().to_string()),
            page: (page > 1).then(|| page.to_string()),
            q: query
                .map(str::trim)
                .filter(|q| !q.is_empty())
                .map(String::from),
        }
    }

    pub fn status(&self) -> NotificationStatus {
        self.status
            .as_deref()
            .map(NotificationStatus::from)
            .unwrap_or_default()
    }

    pub fn filter(&self) -> NotificationFilter {
        self.filter
            .as_deref()
            .map(NotificationFilter::from)
            .unwrap_or_default()
    }

    pub fn page(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|p| p.parse::<u64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }

    pub fn query(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(String::from)
    }

    /// Inbox URL carrying this view state.
    pub fn target(&self) -> String {
        let path = PathNotifications {}.to_uri().to_string();
        match serde_urlencoded::to_string(self) {
            Ok(qs) if !qs.is_empty() => format!("{}?{}", path, qs),
            _ => path,
        }
    }

    /// Hidden form fields mirroring [`Self::target`], so a mutating POST
    /// can hand the view state back to the redirect.
    pub fn hidden_inputs(&self) -> Markup {
        html! {
            @if let Some(status) = &self.status {
                input type="hidden" name="status" value=(status);
            }
            @if let Some(filter) = &self.filter {
                input type="hidden" name="filter" value=(filter);
            }
            @if let Some(page) = &self.page {
                input type="hidden" name="page" value=(page);
            }
            @if let Some(q) = &self.q {
                input type="hidden" name="q" value=(q);
            }
        }
    }
}

pub async fn home(_: PathHome) -> Redirect {
    Redirect::to(&PathNotifications {}.to_uri().to_string())
}

#[instrument(skip(state, rstate))]
pub async fn index(
    _: PathNotifications,
    State(state): State<BolideState>,
    rstate: BolideRequestState<Authenticated>,
    Query(query): Query<InboxQuery>,
) -> BolideResult<BolideResponse<()>> {
    let mut client = state.get_db_client();
    let user = current_user(&state, &rstate).await?;
    let now = Utc::now().naive_utc();
    let status = query.status();
    let filter = query.filter();
    let query_text = query.query();
    let fetching = user.is_fetching(now);

    let counts =
        Notification::status_counts(&mut client, user.id, filter, query_text.as_deref()).await?;
    let total = counts.get(status).max(0) as u64;
    let page = query.page().min(last_page_for(total, PAGE_SIZE));
    let notifications = if fetching {
        // the loading box replaces the table, no point fetching rows
        Vec::new()
    } else {
        Notification::search(
            &mut client,
            user.id,
            status,
            filter,
            query_text.as_deref(),
            page,
            PAGE_SIZE,
        )
        .await?
    };
    let staged_today =
        Notification::staged_today_count(&mut client, user.id, timeago::midnight(now)).await?;

    let pager = PageInfo::new(page, PAGE_SIZE, total, fetching);
    let search = HeaderSearch {
        status,
        filter,
        query: query_text.clone(),
        disabled: pager.loading,
    };
    let view = InboxView {
        status,
        filter,
        query: query_text,
        pager,
        counts,
        notifications,
        staged_today,
        fetching,
        now,
        local_now: Local::now().naive_local(),
        csrf_token: rstate.csrf_token(),
    };
    let body = inbox_page(&view, state.footer_data())?;
    let page = app(&state, &rstate, Some("Notifications".into()), &search, body).await?;
    Ok(BolideResponse::Html(page.into()))
}

/// Stages the notification and hands the browser on to the thread itself.
/// The row's form targets a fresh tab, so the inbox stays where it was.
#[instrument(skip(state, rstate, flash, afd))]
pub async fn open_thread(
    PathNotificationOpen { id }: PathNotificationOpen,
    State(state): State<BolideState>,
    flash: Flash,
    rstate: BolideRequestState<Authenticated>,
    Form(afd): Form<ApiFormData<InboxQuery>>,
) -> BolideResult<BolideResponse<(Flash, Redirect)>> {
    if !afd.verify_csrf(Some(FormMethod::Update), &rstate) {
        return Ok(BolideResponse::Other(expired_form(flash, &afd.data)));
    }
    let mut client = state.get_db_client();
    let user = current_user(&state, &rstate).await?;
    let mut notification = owned_notification(&mut client, &user, id).await?;
    if notification.status != NotificationStatus::Staged {
        notification
            .stage(&mut client, Utc::now().naive_utc())
            .await?;
    }
    Ok(BolideResponse::Redirect(Redirect::to(&notification.url)))
}

#[instrument(skip(state, rstate, flash, afd))]
pub async fn stage(
    PathNotificationStage { id }: PathNotificationStage,
    State(state): State<BolideState>,
    flash: Flash,
    rstate: BolideRequestState<Authenticated>,
    Form(afd): Form<ApiFormData<InboxQuery>>,
) -> BolideResult<(Flash, Redirect)> {
    if !afd.verify_csrf(Some(FormMethod::Update), &rstate) {
        return Ok(expired_form(flash, &afd.data));
    }
    let mut client = state.get_db_client();
    let user = current_user(&state, &rstate).await?;
    let mut notification = owned_notification(&mut client, &user, id).await?;
    if notification.status != NotificationStatus::Staged {
        notification
            .stage(&mut client, Utc::now().naive_utc())
            .await?;
    }
    Ok((flash, back_to(&afd.data)))
}

#[instrument(skip(state, rstate, flash, afd))]
pub async fn restore(
    PathNotificationRestore { id }: PathNotificationRestore,
    State(state): State<BolideState>,
    flash: Flash,
    rstate: BolideRequestState<Authenticated>,
    Form(afd): Form<ApiFormData<InboxQuery>>,
) -> BolideResult<(Flash, Redirect)> {
    if !afd.verify_csrf(Some(FormMethod::Update), &rstate) {
        return Ok(expired_form(flash, &afd.data));
    }
    let mut client = state.get_db_client();
    let user = current_user(&state, &rstate).await?;
    let mut notification = owned_notification(&mut client, &user, id).await?;
    notification.restore(&mut client).await?;
    Ok((flash, back_to(&afd.data)))
}

#[instrument(skip(state, rstate, flash, afd))]
pub async fn resolve(
    PathNotificationResolve { id }: PathNotificationResolve,
    State(state): State<BolideState>,
    flash: Flash,
    rstate: BolideRequestState<Authenticated>,
    Form(afd): Form<ApiFormData<InboxQuery>>,
) -> BolideResult<(Flash, Redirect)> {
    if !afd.verify_csrf(Some(FormMethod::Update), &rstate) {
        return Ok(expired_form(flash, &afd.data));
    }
    let mut client = state.get_db_client();
    let user = current_user(&state, &rstate).await?;
    let mut notification = owned_notification(&mut client, &user, id).await?;
    notification.resolve(&mut client).await?;
    Ok((flash, back_to(&afd.data)))
}

#[instrument(skip(state, rstate, flash, afd))]
pub async fn refresh(
    _: PathNotificationsRefresh,
    State(state): State<BolideState>,
    flash: Flash,
    rstate: BolideRequestState<Authenticated>,
    Form(afd): Form<ApiFormData<InboxQuery>>,
) -> BolideResult<(Flash, Redirect)> {
    if !afd.verify_csrf(Some(FormMethod::Update), &rstate) {
        return Ok(expired_form(flash, &afd.data));
    }
    let mut client = state.get_db_client();
    let mut user = current_user(&state, &rstate).await?;
    let now = Utc::now().naive_utc();
    let back = back_to(&afd.data);
    if bolide_jobs::request_sync_for(&state.get_db_pool(), &mut client, &mut user, now).await? {
        Ok((flash.info("Refreshing your notifications"), back))
    } else {
        Ok((flash.warning("A refresh is already running"), back))
    }
}

#[instrument(skip(state, rstate, flash, afd))]
pub async fn clear_cache(
    _: PathNotificationsClear,
    State(state): State<BolideState>,
    flash: Flash,
    rstate: BolideRequestState<Authenticated>,
    Form(afd): Form<ApiFormData<InboxQuery>>,
) -> BolideResult<(Flash, Redirect)> {
    if !afd.verify_csrf(Some(FormMethod::Delete), &rstate) {
        return Ok(expired_form(flash, &afd.data));
    }
    let mut client = state.get_db_client();
    let user = current_user(&state, &rstate).await?;
    let removed = Notification::clear_for_user(&mut client, user.id).await?;
    info!("user {} cleared {} notifications", user.id, removed);
    let message = format!(
        "Cleared {} notification{} from the cache",
        removed,
        if removed == 1 { "" } else { "s" }
    );
    Ok((flash.info(message), back_to(&afd.data)))
}

async fn current_user(
    state: &BolideState,
    rstate: &BolideRequestState<Authenticated>,
) -> BolideResult<User> {
    rstate
        .user(state)
        .await?
        .ok_or(BolideError::AccessDenied)
}

async fn owned_notification(
    client: &mut Client,
    user: &User,
    id: i64,
) -> BolideResult<Notification> {
    Notification::get(client, user.id, id)
        .await?
        .ok_or_else(|| BolideError::PageNotFound(format!("notification {}", id)))
}

fn back_to(query: &InboxQuery) -> Redirect {
    Redirect::to(&query.target())
}

fn expired_form(flash: Flash, query: &InboxQuery) -> (Flash, Redirect) {
    (
        flash.error("The form has expired, please retry"),
        back_to(query),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn bogus_query_state_degrades_to_the_default_view() {
        let q: InboxQuery =
            serde_urlencoded::from_str("status=zzz&filter=nope&page=abc&q=").unwrap();
        assert_eq!(q.status(), NotificationStatus::Queued);
        assert_eq!(q.filter(), NotificationFilter::Participating);
        assert_eq!(q.page(), 1);
        assert_eq!(q.query(), None);
    }

    #[test]
    fn page_zero_and_negative_pages_clamp_to_one() {
        let q: InboxQuery = serde_urlencoded::from_str("page=0").unwrap();
        assert_eq!(q.page(), 1);
        let q: InboxQuery = serde_urlencoded::from_str("page=-4").unwrap();
        assert_eq!(q.page(), 1);
    }

    #[test]
    fn targets_only_carry_non_default_state() {
        let q = InboxQuery::for_view(
            NotificationStatus::Queued,
            NotificationFilter::Participating,
            1,
            None,
        );
        assert_eq!(q.target(), "/notifications");
        let q = InboxQuery::for_view(
            NotificationStatus::Staged,
            NotificationFilter::Comment,
            3,
            Some("rust"),
        );
        assert_eq!(
            q.target(),
            "/notifications?status=staged&filter=comment&page=3&q=rust"
        );
    }

    #[test]
    fn blank_queries_are_dropped() {
        let q = InboxQuery::for_view(
            NotificationStatus::Queued,
            NotificationFilter::Participating,
            1,
            Some("   "),
        );
        assert_eq!(q.target(), "/notifications");
        assert_eq!(q.query(), None);
    }

    #[test]
    fn view_state_round_trips_through_the_query_string() {
        let q = InboxQuery::for_view(
            NotificationStatus::Closed,
            NotificationFilter::Comment,
            2,
            Some("tokio"),
        );
        let encoded = serde_urlencoded::to_string(&q).unwrap();
        let decoded: InboxQuery = serde_urlencoded::from_str(&encoded).unwrap();
        assert_eq!(decoded, q);
    }

    #[test]
    fn hidden_inputs_mirror_the_target() {
        let q = InboxQuery::for_view(
            NotificationStatus::Staged,
            NotificationFilter::Comment,
            2,
            Some("axum"),
        );
        let markup = q.hidden_inputs().into_string();
        assert!(markup.contains("name=\"status\" value=\"staged\""));
        assert!(markup.contains("name=\"filter\" value=\"comment\""));
        assert!(markup.contains("name=\"page\" value=\"2\""));
        assert!(markup.contains("name=\"q\" value=\"axum\""));
        let default = InboxQuery::default().hidden_inputs().into_string();
        assert_eq!(default, "");
    }

    #[test]
    fn form_posts_decode_the_view_state_next_to_the_csrf_fields() {
        let afd: ApiFormData<InboxQuery> =
            serde_urlencoded::from_str("_csrf_token=tok&_method=update&status=closed&page=2")
                .unwrap();
        assert_eq!(afd.method(), Some(FormMethod::Update));
        assert_eq!(afd.data.status(), NotificationStatus::Closed);
        assert_eq!(afd.data.page(), 2);
    }
}
