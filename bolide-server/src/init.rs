use bolide_core::config::Configuration;
use bolide_dependencies::sentry;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

pub fn logging() {
    better_panic::install();
    if let Err(e) = kankyo::load(false) {
        info!("couldn't load .env file: {}, this is probably fine", e);
    }
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
        .add_directive("sqlx=warn".parse().expect("static directive"))
        .add_directive("sqlx::query=warn".parse().expect("static directive"))
        .add_directive("sqlxmq=warn".parse().expect("static directive"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();
}

/// Keep the returned guard alive until shutdown, dropping it flushes the
/// transport.
pub fn sentry_guard(config: &Configuration) -> Option<sentry::ClientInitGuard> {
    match &config.sentry_url {
        Some(url) => {
            debug!("Sending error reports to {}", url);
            Some(sentry::init((
                url.to_string(),
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    traces_sample_rate: config.sentry_ratio.unwrap_or(0.1),
                    ..Default::default()
                },
            )))
        }
        None => {
            debug!("No sentry_url set, error reporting disabled");
            None
        }
    }
}
