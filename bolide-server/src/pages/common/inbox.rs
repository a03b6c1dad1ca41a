//! The inbox body: sidebar, toolbar, status tabs and the notification
//! table. Everything renders off an [`InboxView`] snapshot, so the markup
//! is testable without a database.

use axum_extra::routing::TypedPath;
use maud::{html, Markup};

use bolide_core::{error::BolideResult, footer::FooterData, request_helper::FormMethod};
use bolide_dependencies::chrono::NaiveDateTime;
use bolide_models::{Notification, NotificationFilter, NotificationStatus, StatusCounts};

use crate::pages::common::frontmatter::form_method;
use crate::pages::common::icons::{badge_icons, thread_icon};
use crate::pages::common::pagination::{pager, PageInfo};
use crate::pages::common::timeago::{clock_line, date_line, relative_time};
use crate::pages::notifications::{
    InboxQuery, PathNotificationOpen, PathNotificationResolve, PathNotificationRestore,
    PathNotificationStage, PathNotificationsClear, PathNotificationsRefresh,
};

/// Everything one render of the inbox needs, gathered by the route handler.
#[derive(Debug, Clone)]
pub struct InboxView {
    pub status: NotificationStatus,
    pub filter: NotificationFilter,
    pub query: Option<String>,
    pub pager: PageInfo,
    pub counts: StatusCounts,
    pub notifications: Vec<Notification>,
    pub staged_today: i64,
    pub fetching: bool,
    /// Same scale as the stored timestamps, which are UTC.
    pub now: NaiveDateTime,
    /// Wall clock for the sidebar.
    pub local_now: NaiveDateTime,
    pub csrf_token: String,
}

impl InboxView {
    pub fn loading(&self) -> bool {
        self.pager.loading
    }

    /// The view state every link and mutating form carries.
    fn current_query(&self) -> InboxQuery {
        InboxQuery::for_view(
            self.status,
            self.filter,
            self.pager.page,
            self.query.as_deref(),
        )
    }

    fn status_href(&self, status: NotificationStatus) -> String {
        InboxQuery::for_view(status, self.filter, 1, self.query.as_deref()).target()
    }

    fn filter_href(&self, filter: NotificationFilter) -> String {
        InboxQuery::for_view(self.status, filter, 1, self.query.as_deref()).target()
    }

    fn page_href(&self, page: u64) -> String {
        InboxQuery::for_view(self.status, self.filter, page, self.query.as_deref()).target()
    }

    fn clear_query_href(&self) -> String {
        InboxQuery::for_view(self.status, self.filter, 1, None).target()
    }

    fn csrf_input(&self) -> Markup {
        html! {
            input type="hidden" name="_csrf_token" value=(self.csrf_token);
        }
    }
}

pub fn inbox_page(view: &InboxView, footer: &FooterData) -> BolideResult<Markup> {
    Ok(html! {
        .inbox {
            (sidebar(view, footer)?)
            .inbox__main {
                (toolbar(view))
                (status_tabs(view))
                (content(view))
            }
        }
    })
}

pub fn sidebar(view: &InboxView, footer: &FooterData) -> BolideResult<Markup> {
    Ok(html! {
        aside.sidebar {
            h3.sidebar__clock {
                i.icon.icon-clock {}
                " "
                (clock_line(view.local_now))
            }
            span.sidebar__date { (date_line(view.local_now)) }
            span.sidebar__tally {
                "You've triaged " (view.staged_today) " notifications today"
            }
            nav.sidebar__filters {
                (filter_link(
                    view,
                    NotificationFilter::Participating,
                    "icon-bolt",
                    "your updates",
                    "All the updates for issues and pull requests that are your responsibility to deal with",
                ))
                (filter_link(
                    view,
                    NotificationFilter::Comment,
                    "icon-people",
                    "participating",
                    "Updates for issues and pull requests that you have commented on",
                ))
            }
            nav.sidebar__links {
                @for column in &footer.cols {
                    @for row in &footer.rows[column] {
                        @if row.bold {
                            strong { a.sidebar__link href=(row.url()?) { (row.title) } }
                        } @else {
                            a.sidebar__link href=(row.url()?) { (row.title) }
                        }
                    }
                }
            }
        }
    })
}

fn filter_link(
    view: &InboxView,
    filter: NotificationFilter,
    icon_class: &str,
    label: &str,
    tooltip: &str,
) -> Markup {
    let active = view.filter == filter;
    let class = format!(
        "sidebar__filter sidebar__filter--{}{}",
        filter.as_str(),
        if active { " sidebar__filter--active" } else { "" }
    );
    html! {
        a class=(class) href=(view.filter_href(filter)) title=(tooltip) {
            i.icon.(icon_class) {}
            span { (label) }
        }
    }
}

pub fn toolbar(view: &InboxView) -> Markup {
    let query = view.current_query();
    html! {
        .toolbar {
            form.toolbar__form action=(PathNotificationsRefresh {}.to_uri().to_string()) method="POST" {
                (view.csrf_input())
                (form_method(FormMethod::Update))
                (query.hidden_inputs())
                button.toolbar__button type="submit" title="Refresh your notifications"
                    disabled[view.loading()] {
                    i.icon.icon-refresh {}
                }
            }
            form.toolbar__form action=(PathNotificationsClear {}.to_uri().to_string()) method="POST"
                data-confirm="Are you sure you want to clear the cache?" {
                (view.csrf_input())
                (form_method(FormMethod::Delete))
                (query.hidden_inputs())
                button.toolbar__button type="submit"
                    title="Delete all of your notifications from the cache"
                    disabled[view.loading()] {
                    i.icon.icon-trash {}
                }
            }
            @if let Some(q) = &view.query {
                span.toolbar__chip {
                    "Showing results for '" (q) "'"
                    @if view.loading() {
                        span.toolbar__chip__clear { i.icon.icon-x {} }
                    } @else {
                        a.toolbar__chip__clear href=(view.clear_query_href())
                            title="Clear the current search" {
                            i.icon.icon-x {}
                        }
                    }
                }
            }
            .toolbar__pages {
                @if view.pager.total > 0 {
                    span.toolbar__range { (view.pager.range_label()) }
                }
                (pager(
                    &view.pager,
                    &view.page_href(view.pager.page.saturating_sub(1)),
                    &view.page_href(view.pager.page + 1),
                ))
            }
        }
    }
}

pub fn status_tabs(view: &InboxView) -> Markup {
    html! {
        nav.tabs {
            (status_tab(view, NotificationStatus::Queued,
                "New updates that you haven't dealt with yet"))
            (status_tab(view, NotificationStatus::Staged,
                "Notifications that you've seen, clicked on, or otherwise have handled"))
            (status_tab(view, NotificationStatus::Closed,
                "Stale and old notifications that are considered closed out and finished"))
        }
    }
}

fn status_tab(view: &InboxView, status: NotificationStatus, tooltip: &str) -> Markup {
    let active = view.status == status;
    let class = format!(
        "tab tab--{}{}",
        status.as_str(),
        if active { " tab--active" } else { "" }
    );
    html! {
        a class=(class) href=(view.status_href(status)) title=(tooltip) {
            span.tab__label { (status.label()) }
            span.tab__count { (view.counts.get(status)) }
        }
    }
}

pub fn content(view: &InboxView) -> Markup {
    html! {
        .content {
            @if view.fetching {
                (loading_box())
            } @else if view.notifications.is_empty() {
                (empty_state(view.status))
            } @else {
                (notification_table(view))
            }
        }
    }
}

pub fn loading_box() -> Markup {
    html! {
        .loader {
            .loader__spinner {}
            span.loader__caption { "Loading notifications" }
        }
    }
}

pub fn empty_state(status: NotificationStatus) -> Markup {
    html! {
        .message {
            p.message__headline { "No " (status.as_str()) " notifications" }
            p.message__subline { "🎉 You're all set here for the moment" }
        }
    }
}

fn notification_table(view: &InboxView) -> Markup {
    html! {
        table.notifications {
            tbody {
                @for n in &view.notifications {
                    (notification_row(view, n))
                }
            }
        }
    }
}

fn notification_row(view: &InboxView, n: &Notification) -> Markup {
    let query = view.current_query();
    html! {
        tr.row {
            td.row__icon { (thread_icon(n.kind)) }
            td.row__title {
                // one activation, one stage: the whole title is a submit
                // button that stages and then lands on the thread
                form method="POST" target="_blank"
                    action=(PathNotificationOpen { id: n.id }.to_uri().to_string()) {
                    (view.csrf_input())
                    (form_method(FormMethod::Update))
                    (query.hidden_inputs())
                    button.row__open type="submit" {
                        span.row__name { (n.title) }
                        @if let Some(number) = n.number {
                            span.row__number { "#" (number) }
                        }
                    }
                }
            }
            td.row__when {
                (relative_time(n.updated_at, view.now))
                @if n.is_author {
                    i.icon.icon-author title="You authored this thread" {}
                }
            }
            td.row__badges { (badge_icons(&n.badges)) }
            td.row__repository {
                a href=(n.repository_url) target="_blank" rel="noopener" { (n.repository) }
            }
            td.row__score { span.pill { (n.score) } }
            td.row__actions { (row_actions(view, n, &query)) }
        }
    }
}

fn row_actions(view: &InboxView, n: &Notification, query: &InboxQuery) -> Markup {
    html! {
        @if n.status == NotificationStatus::Queued {
            (action_form(view, query,
                PathNotificationStage { id: n.id }.to_uri().to_string(),
                "icon-check", "Mark as read"))
        } @else {
            (action_form(view, query,
                PathNotificationRestore { id: n.id }.to_uri().to_string(),
                "icon-undo", "Revert back to unread"))
        }
        @if n.status == NotificationStatus::Closed {
            // resolved rows keep a dead help glyph where the X was, on purpose
            i.icon.icon-help.row__noop {}
        } @else {
            (action_form(view, query,
                PathNotificationResolve { id: n.id }.to_uri().to_string(),
                "icon-x", "Mark as resolved"))
        }
    }
}

fn action_form(
    view: &InboxView,
    query: &InboxQuery,
    action: String,
    icon_class: &str,
    tooltip: &str,
) -> Markup {
    html! {
        form.row__action method="POST" action=(action) {
            (view.csrf_input())
            (form_method(FormMethod::Update))
            (query.hidden_inputs())
            button.row__button type="submit" title=(tooltip) {
                i.icon.(icon_class) {}
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pages::common::pagination::PAGE_SIZE;
    use bolide_dependencies::chrono::NaiveDate;
    use bolide_models::{Badge, NotificationKind};

    fn when() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 9, 20)
            .unwrap()
            .and_hms_opt(15, 0, 0)
            .unwrap()
    }

    fn sample_notification(id: i64, status: NotificationStatus) -> Notification {
        Notification {
            id,
            user_id: 1,
            remote_id: format!("{}", id),
            kind: NotificationKind::PullRequest,
            title: "Fix the flaky integration test".to_string(),
            number: Some(42),
            repository: "bolide-app/bolide".to_string(),
            repository_url: "https://github.com/bolide-app/bolide".to_string(),
            url: "https://github.com/bolide-app/bolide/pull/42".to_string(),
            reasons: vec!["review_requested".to_string()],
            badges: vec![Badge::Hot],
            score: 8,
            is_author: false,
            status,
            staged_at: None,
            created_at: when(),
            updated_at: when(),
        }
    }

    fn sample_view(
        status: NotificationStatus,
        notifications: Vec<Notification>,
        fetching: bool,
    ) -> InboxView {
        let total = notifications.len() as u64;
        InboxView {
            status,
            filter: NotificationFilter::Participating,
            query: None,
            pager: PageInfo::new(1, PAGE_SIZE, total, fetching),
            counts: StatusCounts {
                queued: 4,
                staged: 2,
                closed: 1,
            },
            notifications,
            staged_today: 3,
            fetching,
            now: when(),
            local_now: when(),
            csrf_token: "test-csrf".to_string(),
        }
    }

    #[test]
    fn empty_state_lowercases_the_status() {
        for (status, needle) in [
            (NotificationStatus::Queued, "No queued notifications"),
            (NotificationStatus::Staged, "No staged notifications"),
            (NotificationStatus::Closed, "No closed notifications"),
        ] {
            let markup = empty_state(status).into_string();
            assert!(markup.contains(needle), "{} missing", needle);
            assert!(markup.contains("🎉 You're all set here for the moment"));
        }
    }

    #[test]
    fn loading_replaces_the_empty_state() {
        let view = sample_view(NotificationStatus::Queued, Vec::new(), true);
        let markup = content(&view).into_string();
        assert!(markup.contains("loader"));
        assert!(!markup.contains("No queued notifications"));
    }

    #[test]
    fn empty_buckets_show_the_empty_state_only_when_idle() {
        let view = sample_view(NotificationStatus::Queued, Vec::new(), false);
        let markup = content(&view).into_string();
        assert!(markup.contains("No queued notifications"));
        assert!(!markup.contains("loader__spinner"));
    }

    #[test]
    fn queued_rows_offer_stage_and_resolve() {
        let view = sample_view(
            NotificationStatus::Queued,
            vec![sample_notification(7, NotificationStatus::Queued)],
            false,
        );
        let markup = content(&view).into_string();
        assert!(markup.contains("/notifications/7/stage"));
        assert!(markup.contains("Mark as read"));
        assert!(markup.contains("/notifications/7/resolve"));
        assert!(markup.contains("Mark as resolved"));
        assert!(!markup.contains("/notifications/7/restore"));
    }

    #[test]
    fn closed_rows_offer_restore_and_a_dead_help_glyph() {
        let view = sample_view(
            NotificationStatus::Closed,
            vec![sample_notification(9, NotificationStatus::Closed)],
            false,
        );
        let markup = content(&view).into_string();
        assert!(markup.contains("/notifications/9/restore"));
        assert!(markup.contains("Revert back to unread"));
        assert!(markup.contains("icon-help"));
        assert!(!markup.contains("/notifications/9/resolve"));
        assert!(!markup.contains("Mark as resolved"));
    }

    #[test]
    fn open_forms_post_into_a_fresh_tab() {
        let view = sample_view(
            NotificationStatus::Queued,
            vec![sample_notification(7, NotificationStatus::Queued)],
            false,
        );
        let markup = content(&view).into_string();
        assert!(markup.contains("action=\"/notifications/7/open\""));
        assert!(markup.contains("target=\"_blank\""));
        assert!(markup.contains("#42"));
    }

    #[test]
    fn author_marker_renders_next_to_the_timestamp() {
        let mut n = sample_notification(7, NotificationStatus::Queued);
        n.is_author = true;
        let view = sample_view(NotificationStatus::Queued, vec![n], false);
        let markup = content(&view).into_string();
        assert!(markup.contains("icon-author"));
        assert!(markup.contains("You authored this thread"));
    }

    #[test]
    fn tabs_carry_counts_and_keep_filter_and_query() {
        let mut view = sample_view(NotificationStatus::Queued, Vec::new(), false);
        view.filter = NotificationFilter::Comment;
        view.query = Some("rust".to_string());
        let markup = status_tabs(&view).into_string();
        assert!(markup.contains("tab--queued tab--active"));
        assert!(markup.contains(">4</span>"));
        assert!(markup.contains(">2</span>"));
        assert!(markup.contains(">1</span>"));
        assert!(markup.contains("/notifications?status=staged&amp;filter=comment&amp;q=rust"));
        assert!(markup.contains("New updates that you haven't dealt with yet"));
    }

    #[test]
    fn toolbar_shows_the_query_chip_with_a_clear_link() {
        let mut view = sample_view(NotificationStatus::Queued, Vec::new(), false);
        view.query = Some("tokio".to_string());
        let markup = toolbar(&view).into_string();
        assert!(markup.contains("Showing results for 'tokio'"));
        assert!(markup.contains("href=\"/notifications\""));
        let mut loading = view.clone();
        loading.pager.loading = true;
        let markup = toolbar(&loading).into_string();
        assert!(markup.contains("Showing results for 'tokio'"));
    }

    #[test]
    fn toolbar_guards_the_clear_cache_form() {
        let view = sample_view(NotificationStatus::Queued, Vec::new(), false);
        let markup = toolbar(&view).into_string();
        assert!(markup.contains("/notifications/clear"));
        assert!(markup.contains("Are you sure you want to clear the cache?"));
        assert!(markup.contains("Delete all of your notifications from the cache"));
        assert!(markup.contains("Refresh your notifications"));
        assert!(markup.contains("value=\"delete\""));
    }

    #[test]
    fn mutating_forms_carry_the_view_state() {
        let mut view = sample_view(
            NotificationStatus::Staged,
            vec![sample_notification(7, NotificationStatus::Staged)],
            false,
        );
        view.query = Some("serde".to_string());
        let markup = toolbar(&view).into_string();
        assert!(markup.contains("name=\"status\" value=\"staged\""));
        assert!(markup.contains("name=\"q\" value=\"serde\""));
        let markup = content(&view).into_string();
        assert!(markup.contains("name=\"status\" value=\"staged\""));
    }

    #[test]
    fn sidebar_reports_the_daily_tally_and_filters() {
        let view = sample_view(NotificationStatus::Queued, Vec::new(), false);
        let markup = sidebar(&view, &FooterData::default()).unwrap().into_string();
        assert!(markup.contains("You've triaged 3 notifications today"));
        assert!(markup.contains("your updates"));
        assert!(markup.contains("participating"));
        assert!(markup.contains(
            "All the updates for issues and pull requests that are your responsibility to deal with"
        ));
        assert!(markup.contains("Updates for issues and pull requests that you have commented on"));
        assert!(markup.contains("sidebar__filter--participating sidebar__filter--active"));
        assert!(markup.contains("3:00pm"));
        assert!(markup.contains("Wednesday, September 20th"));
    }

    #[test]
    fn sidebar_renders_the_info_links() {
        let data = r#"{
            "cols": ["Info"],
            "Info": [
                { "title": "Report bugs", "url": "https://github.com/bolide-app/bolide/issues" },
                { "title": "See source code", "url": "https://github.com/bolide-app/bolide" }
            ]
        }"#;
        let data: FooterData = serde_json::from_str(data).unwrap();
        let view = sample_view(NotificationStatus::Queued, Vec::new(), false);
        let markup = sidebar(&view, &data).unwrap().into_string();
        assert!(markup.contains("Report bugs"));
        assert!(markup.contains("See source code"));
    }
}
