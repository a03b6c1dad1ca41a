#[macro_use]
extern crate tracing;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use bolide_dependencies::reqwest::{self, header::HeaderMap, Proxy};

use crate::config::Configuration;
use crate::error::BolideResult;

pub mod app;
pub mod assets;
pub mod config;
pub mod error;
pub mod footer;
pub mod request_helper;
pub mod session;
pub mod state;

pub fn http_client(config: &Configuration) -> BolideResult<reqwest::Client> {
    let client = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_millis(1000))
        .timeout(std::time::Duration::from_secs(15))
        .redirect(reqwest::redirect::Policy::none());
    let client = if let Some(proxy) = &config.proxy {
        client.proxy(Proxy::all(proxy.clone())?)
    } else {
        client
    };
    Ok(client.default_headers(common_headers()).build()?)
}

/// Paths that must never allocate or load a session.
pub struct StatelessPaths {}

impl StatelessPaths {
    pub fn contains(path: &str) -> bool {
        match path {
            "/favicon.svg" => true,
            "/favicon.ico" => true,
            "/robots.txt" => true,
            _ => path.starts_with("/static/"),
        }
    }
}

fn common_headers() -> HeaderMap {
    let mut hm = HeaderMap::new();
    let user_agent = format!("Mozilla/5.0 ({} v{})", package_name(), package_version());
    trace!("new user agent with value {}", user_agent);
    hm.append(reqwest::header::USER_AGENT, user_agent.parse().unwrap());
    hm
}

pub fn package_full() -> String {
    format!("{} v{}", package_name(), package_version())
}

pub const fn package_name() -> &'static str {
    const NAME: &str = env!("CARGO_PKG_NAME");
    NAME
}

pub const fn package_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    VERSION
}

pub async fn csp_header(
    State(state): State<crate::state::BolideState>,
    req: Request<Body>,
    next: Next<Body>,
) -> Response {
    use bolide_dependencies::csp::{Directive, Source, Sources, CSP};
    let static_host = state.config().static_host().map(|x| x.to_string());
    let csp = CSP::new()
        .add(Directive::DefaultSrc({
            let s = Sources::new_with(Source::Self_);
            match &static_host {
                Some(v) => s.add(Source::Host(v)),
                None => s,
            }
        }))
        .add(Directive::ObjectSrc(Sources::new()))
        .add(Directive::FrameAncestors(Sources::new()))
        .add(Directive::FrameSrc(Sources::new()))
        .add(Directive::FormAction(
            // thread-open POSTs answer with a redirect to the thread's own
            // host, and browsers check that hop against form-action too
            Sources::new_with(Source::Self_).add(Source::Scheme("https")),
        ))
        .add(Directive::ManifestSrc(Sources::new_with(Source::Self_)))
        .add(Directive::StyleSrc({
            let s = Sources::new_with(Source::Self_).add(Source::UnsafeInline);
            match &static_host {
                Some(v) => s.add(Source::Host(v)),
                None => s,
            }
        }))
        .add(Directive::ImgSrc({
            // avatars come straight off GitHub's CDN
            let s = Sources::new_with(Source::Self_)
                .add(Source::Scheme("data"))
                .add(Source::Host("*.githubusercontent.com"));
            match &static_host {
                Some(v) => s.add(Source::Host(v)),
                None => s,
            }
        }))
        .add(Directive::BlockAllMixedContent);
    let csp = csp.to_string();
    let mut res = next.run(req).await;
    if let Ok(v) = HeaderValue::from_str(&csp) {
        res.headers_mut()
            .insert(header::CONTENT_SECURITY_POLICY, v);
    }
    res
}
