use axum::http::{StatusCode, Uri};
use maud::{html, Markup};

use bolide_core::error::BolideError;
use bolide_core::request_helper::HtmlResponse;

pub mod common;
pub mod notifications;
pub mod session;

pub fn error_page(err: &BolideError) -> Markup {
    let error = err.to_string();
    html! {
        (maud::DOCTYPE)
        html {
            head {
                title { "Error" }
                link rel="stylesheet" href="/static/app.css";
            }
            body {
                div.error.wrapper {
                     h1.error.title { "An error occured while processing your request" }
                     main {
                         (error)
                     }
                }
            }
        }
    }
}

pub async fn not_found_page(uri: Uri) -> (StatusCode, HtmlResponse) {
    let page = error_page(&BolideError::PageNotFound(uri.path().to_string()));
    (
        StatusCode::NOT_FOUND,
        HtmlResponse {
            content: page.into_string(),
        },
    )
}
