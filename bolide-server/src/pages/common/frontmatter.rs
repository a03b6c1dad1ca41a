//! Shared page chrome: document shell, header, flash banners and the
//! footer, plus the hidden inputs every mutating form carries.

use axum_extra::routing::TypedPath;
use maud::{html, Markup, PreEscaped};

use bolide_core::{
    app::PageTitle,
    assets::SiteConfig,
    error::BolideResult,
    request_helper::FormMethod,
    session::SessionMode,
    state::{BolideRequestState, BolideState},
};
use bolide_models::{NotificationFilter, NotificationStatus};

use crate::pages::notifications::PathNotifications;
use crate::pages::session::{PathSessionLogout, PathSessionsLogin};

pub async fn csrf_meta_tag<T: SessionMode>(rstate: &BolideRequestState<T>) -> Markup {
    let csrf = rstate.csrf_token();
    html! {
        meta content=(csrf) csrf-param="_csrf_token" method-param="_method" name="csrf-token";
    }
}

pub async fn csrf_input_tag<T: SessionMode>(rstate: &BolideRequestState<T>) -> Markup {
    let csrf = rstate.csrf_token();
    html! {
        input type="hidden" name="_csrf_token" value=(csrf);
    }
}

pub fn form_method(method: FormMethod) -> Markup {
    html! {
        input type="hidden" name="_method" value=(method.to_string());
    }
}

pub fn form_submit_button(label: &str) -> Markup {
    html! {
        input type="submit" value=(label);
    }
}

/// What the header search field renders with. The hidden inputs keep the
/// active status and filter across a search submit; the page deliberately
/// resets to 1.
#[derive(Debug, Clone)]
pub struct HeaderSearch {
    pub status: NotificationStatus,
    pub filter: NotificationFilter,
    pub query: Option<String>,
    pub disabled: bool,
}

impl Default for HeaderSearch {
    fn default() -> Self {
        Self {
            status: NotificationStatus::default(),
            filter: NotificationFilter::default(),
            query: None,
            disabled: false,
        }
    }
}

pub async fn header<T: SessionMode>(
    site_config: &SiteConfig,
    state: &BolideState,
    rstate: &BolideRequestState<T>,
    search: &HeaderSearch,
) -> BolideResult<Markup> {
    let user = rstate.user(state).await?;
    let inbox = PathNotifications {}.to_uri().to_string();
    Ok(html! {
        header.header {
            .header__left {
                // the logo drops back to the default view, unread and participating
                a.header__link.header__logo href=(inbox) {
                    i.icon.icon-bolt {}
                    span.header__title { (site_config.site_name()) }
                }
                a.header__link href=(inbox) title="Home" {
                    i.icon.icon-home {}
                }
            }
            @if user.is_some() {
                form.header__search action=(inbox) method="GET" {
                    @if search.status != NotificationStatus::default() {
                        input type="hidden" name="status" value=(search.status);
                    }
                    @if search.filter != NotificationFilter::default() {
                        input type="hidden" name="filter" value=(search.filter);
                    }
                    input.header__input #q name="q" placeholder="Search for notifications"
                        value=(search.query.clone().unwrap_or_default())
                        autocapitalize="none" disabled[search.disabled];
                    button.header__search__button type="submit" title="Search" disabled[search.disabled] {
                        i.icon.icon-search {}
                    }
                }
            }
            .header__right {
                @if let Some(user) = &user {
                    @if let Some(avatar) = &user.avatar_url {
                        img.header__avatar src=(avatar) alt=(user.displayname());
                    }
                    span.header__user { (user.displayname()) }
                    form.header__logout action=(PathSessionLogout {}.to_uri().to_string()) method="POST" {
                        (csrf_input_tag(rstate).await)
                        (form_method(FormMethod::Delete))
                        button.header__link.header__button type="submit" { "Sign out" }
                    }
                } @else {
                    a.header__link href=(PathSessionsLogin {}.to_uri().to_string()) { "Sign in" }
                }
            }
        }
    })
}

pub fn flash_warnings<T: SessionMode>(rstate: &BolideRequestState<T>) -> Markup {
    use bolide_dependencies::axum_flash::Level;
    let mut flash_msgs: Vec<PreEscaped<String>> = Vec::new();
    for (flash_lvl, flash_msg) in rstate.flash.iter() {
        flash_msgs.push(match flash_lvl {
            Level::Debug | Level::Info | Level::Success => {
                html! { .flash.flash--success { (flash_msg) } }
            }
            Level::Warning | Level::Error => {
                html! { .flash.flash--warning { (flash_msg) } }
            }
        });
    }
    html! {
        @for flash_msg in flash_msgs {
            (flash_msg);
        }
    }
}

pub async fn footer<T: SessionMode>(
    state: &BolideState,
    rstate: &BolideRequestState<T>,
) -> BolideResult<Markup> {
    let time = rstate.started_at.elapsed();
    let time: f32 = time.as_secs_f32() * 1000f32;
    let site_config = state.site_config();
    let render_time = {
        #[cfg(debug_assertions)]
        let ret = format!(" (rendered in {:1.3} ms, debug)", time);
        #[cfg(not(debug_assertions))]
        let ret = format!(" (rendered in {:1.3} ms)", time);
        ret
    };
    Ok(html! {
        footer #footer {
            div #serving_info {
                "Powered by "
                a href=(site_config.source_repo()) { (site_config.source_name()) }
                (render_time)
            }
        }
    })
}

pub async fn app<T: SessionMode>(
    state: &BolideState,
    rstate: &BolideRequestState<T>,
    page_title: Option<PageTitle>,
    search: &HeaderSearch,
    body: Markup,
) -> BolideResult<Markup> {
    let site_config = state.site_config();
    let meta = html! {
        meta charset="UTF-8";
        meta http-equiv="X-UA-Compatible" content="IE=edge";
        meta name="viewport" content="width=device-width, initial-scale=1";
    };
    let title = html! {
        title { (
            match page_title {
                Some(title) => {
                    let title: String = title.into();
                    format!("{} - {}", title, site_config.site_name())
                },
                None => site_config.site_name().to_string(),
            }
        ) }
    };
    let links_and_meta = html! {
        link rel="stylesheet" href="/static/app.css";
        link rel="icon" href="/favicon.ico" type="image/x-icon";
        link rel="icon" href="/favicon.svg" type="image/svg+xml";
        meta name="generator" content=(bolide_core::package_name());
        meta name="theme-color" content="#457cff";
        meta name="format-detection" content="telephone=no";
        (csrf_meta_tag(rstate).await);
    };
    let script = html! {
        script type="text/javascript" src="/static/app.js" async="async" {}
    };
    let body = html! {
        body {
            div #container {
                (header(site_config, state, rstate, search).await?);
                (flash_warnings(rstate));
                main #content { (body) }
                (footer(state, rstate).await?);
            }
        }
    };
    Ok(html! {
        (maud::DOCTYPE)
        html lang="en" {
            (meta);
            (title);
            (links_and_meta);
            (script);
            (body);
        }
    })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn form_method_encodes_as_hidden_input() {
        let markup = form_method(FormMethod::Delete).into_string();
        assert!(markup.contains("name=\"_method\""));
        assert!(markup.contains("value=\"delete\""));
        assert!(markup.contains("type=\"hidden\""));
    }

    #[test]
    fn submit_button_carries_the_label() {
        let markup = form_submit_button("Sign in").into_string();
        assert!(markup.contains("type=\"submit\""));
        assert!(markup.contains("value=\"Sign in\""));
    }

    #[test]
    fn search_defaults_to_the_reset_view() {
        let search = HeaderSearch::default();
        assert_eq!(search.status, NotificationStatus::Queued);
        assert_eq!(search.filter, NotificationFilter::Participating);
        assert!(search.query.is_none());
        assert!(!search.disabled);
    }
}
