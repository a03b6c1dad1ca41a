//! Closed icon mappings for thread kinds and badges. Everything the sync
//! stores but this module does not know renders as nothing, never as a
//! wrong glyph.

use maud::{html, Markup};

use bolide_models::{Badge, NotificationKind};

/// Visual identity of a thread row's leading icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadIcon {
    PullMerged,
    IssueOpen,
    None,
}

impl ThreadIcon {
    pub fn for_kind(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::PullRequest => ThreadIcon::PullMerged,
            NotificationKind::Issue => ThreadIcon::IssueOpen,
            NotificationKind::Other => ThreadIcon::None,
        }
    }

    pub fn class(&self) -> Option<&'static str> {
        match self {
            ThreadIcon::PullMerged => Some("icon-pull-merged"),
            ThreadIcon::IssueOpen => Some("icon-issue-open"),
            ThreadIcon::None => None,
        }
    }
}

pub fn thread_icon(kind: NotificationKind) -> Markup {
    match ThreadIcon::for_kind(kind).class() {
        Some(class) => html! {
            i.icon.(class) {}
        },
        None => html! {},
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeIcon {
    pub class: &'static str,
    pub tooltip: &'static str,
}

pub fn badge_icon(badge: Badge) -> Option<BadgeIcon> {
    match badge {
        Badge::Hot => Some(BadgeIcon {
            class: "icon-flame",
            tooltip: "Lots of recent activity",
        }),
        Badge::Old => Some(BadgeIcon {
            class: "icon-timer",
            tooltip: "Old pull request that needs your review",
        }),
        Badge::Comments => Some(BadgeIcon {
            class: "icon-conversation",
            tooltip: "Very talkative thread",
        }),
        Badge::Unknown => None,
    }
}

/// Renders badges in stored order, skipping anything unrecognized.
pub fn badge_icons(badges: &[Badge]) -> Markup {
    html! {
        @for badge in badges {
            @if let Some(icon) = badge_icon(*badge) {
                i.icon.(icon.class) title=(icon.tooltip) {}
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pull_requests_and_issues_have_distinct_icons() {
        let pr = thread_icon(NotificationKind::PullRequest).into_string();
        let issue = thread_icon(NotificationKind::Issue).into_string();
        assert!(pr.contains("icon-pull-merged"));
        assert!(issue.contains("icon-issue-open"));
        assert_ne!(pr, issue);
    }

    #[test]
    fn other_kinds_render_no_icon() {
        assert_eq!(thread_icon(NotificationKind::Other).into_string(), "");
    }

    #[test]
    fn badges_keep_their_stored_order() {
        let markup =
            badge_icons(&[Badge::Comments, Badge::Hot, Badge::Old]).into_string();
        let conversation = markup.find("icon-conversation").unwrap();
        let flame = markup.find("icon-flame").unwrap();
        let timer = markup.find("icon-timer").unwrap();
        assert!(conversation < flame);
        assert!(flame < timer);
    }

    #[test]
    fn badge_tooltips_describe_the_marker() {
        let markup = badge_icons(&[Badge::Hot, Badge::Old, Badge::Comments]).into_string();
        assert!(markup.contains("Lots of recent activity"));
        assert!(markup.contains("Old pull request that needs your review"));
        assert!(markup.contains("Very talkative thread"));
    }

    #[test]
    fn unknown_badges_render_nothing() {
        assert_eq!(badge_icons(&[Badge::Unknown]).into_string(), "");
        assert_eq!(badge_icons(&[]).into_string(), "");
        let markup = badge_icons(&[Badge::Unknown, Badge::Hot]).into_string();
        assert!(markup.contains("icon-flame"));
        assert!(!markup.contains("Unknown"));
    }
}
