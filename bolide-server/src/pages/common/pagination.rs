//! Page window derivations for the inbox toolbar.

use maud::{html, Markup};

/// Rows per inbox page.
pub const PAGE_SIZE: u64 = 25;

/// Everything the pager controls derive from. `loading` covers both a
/// remote fetch and an in-flight search; while it is set both arrows go
/// inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
    pub loading: bool,
}

/// Last valid page for a bucket, never below 1 so an empty bucket still
/// has a current page.
pub fn last_page_for(total: u64, page_size: u64) -> u64 {
    ((total + page_size - 1) / page_size).max(1)
}

impl PageInfo {
    pub fn new(page: u64, page_size: u64, total: u64, loading: bool) -> Self {
        Self {
            page: page.clamp(1, last_page_for(total, page_size)),
            page_size,
            total,
            loading,
        }
    }

    pub fn last_page(&self) -> u64 {
        last_page_for(self.total, self.page_size)
    }

    pub fn first_item(&self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        (self.page - 1) * self.page_size + 1
    }

    pub fn last_item(&self) -> u64 {
        (self.page * self.page_size).min(self.total)
    }

    pub fn range_label(&self) -> String {
        format!(
            "{}-{} of about {}",
            self.first_item(),
            self.last_item(),
            self.total
        )
    }

    pub fn prev_disabled(&self) -> bool {
        self.page == 1 || self.loading
    }

    pub fn next_disabled(&self) -> bool {
        self.page == self.last_page() || self.loading
    }
}

/// The two page arrows. Disabled arrows are spans without an href, so
/// nothing dead is clickable.
pub fn pager(info: &PageInfo, prev_href: &str, next_href: &str) -> Markup {
    html! {
        @if info.prev_disabled() {
            span.toolbar__pager.toolbar__pager--disabled {
                i.icon.icon-chevron-left {}
            }
        } @else {
            a.toolbar__pager href=(prev_href) title="Previous page" {
                i.icon.icon-chevron-left {}
            }
        }
        @if info.next_disabled() {
            span.toolbar__pager.toolbar__pager--disabled {
                i.icon.icon-chevron-right {}
            }
        } @else {
            a.toolbar__pager href=(next_href) title="Next page" {
                i.icon.icon-chevron-right {}
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn last_page_rounds_up_and_never_hits_zero() {
        assert_eq!(last_page_for(0, 25), 1);
        assert_eq!(last_page_for(1, 25), 1);
        assert_eq!(last_page_for(25, 25), 1);
        assert_eq!(last_page_for(26, 25), 2);
        assert_eq!(last_page_for(50, 25), 2);
        assert_eq!(last_page_for(51, 25), 3);
    }

    #[test]
    fn out_of_range_pages_clamp_into_the_bucket() {
        let info = PageInfo::new(9, 25, 30, false);
        assert_eq!(info.page, 2);
        let info = PageInfo::new(0, 25, 30, false);
        assert_eq!(info.page, 1);
    }

    #[test]
    fn range_label_windows_the_bucket() {
        let info = PageInfo::new(1, 25, 60, false);
        assert_eq!(info.range_label(), "1-25 of about 60");
        let info = PageInfo::new(3, 25, 60, false);
        assert_eq!(info.range_label(), "51-60 of about 60");
        let info = PageInfo::new(1, 25, 0, false);
        assert_eq!(info.range_label(), "0-0 of about 0");
    }

    #[test]
    fn arrows_disable_at_the_edges() {
        let first = PageInfo::new(1, 25, 60, false);
        assert!(first.prev_disabled());
        assert!(!first.next_disabled());
        let middle = PageInfo::new(2, 25, 60, false);
        assert!(!middle.prev_disabled());
        assert!(!middle.next_disabled());
        let last = PageInfo::new(3, 25, 60, false);
        assert!(!last.prev_disabled());
        assert!(last.next_disabled());
    }

    #[test]
    fn loading_disables_both_arrows() {
        let info = PageInfo::new(2, 25, 60, true);
        assert!(info.prev_disabled());
        assert!(info.next_disabled());
    }

    #[test]
    fn single_page_buckets_disable_both_arrows() {
        let info = PageInfo::new(1, 25, 10, false);
        assert!(info.prev_disabled());
        assert!(info.next_disabled());
    }

    #[test]
    fn disabled_arrows_are_not_links() {
        let info = PageInfo::new(1, 25, 60, false);
        let markup = pager(&info, "/prev", "/next").into_string();
        assert!(!markup.contains("href=\"/prev\""));
        assert!(markup.contains("href=\"/next\""));
        assert!(markup.contains("toolbar__pager--disabled"));
    }
}
