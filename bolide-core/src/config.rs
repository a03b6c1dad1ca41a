use std::str::FromStr;

use bolide_dependencies::{securefmt, url};

use crate::{app::DBPool, error::BolideResult};

fn default_data_root() -> String {
    "./res".to_string()
}

fn default_session_cookie() -> String {
    "bolide_session".to_string()
}

fn default_bind_to() -> std::net::SocketAddr {
    std::net::SocketAddr::from_str("[::]:8081").unwrap()
}

fn default_github_api_base() -> url::Url {
    url::Url::from_str("https://api.github.com").unwrap()
}

fn default_poll_interval() -> i64 {
    10
}

#[derive(serde::Deserialize, serde::Serialize, clap::Args, Clone, securefmt::Debug)]
pub struct Configuration {
    /// Postgres the inbox state lives in, also carries the job queue
    #[clap(long, env = "DATABASE_URL")]
    #[sensitive]
    pub database_url: url::Url,
    #[clap(long, env = "BIND_TO", default_value = "[::]:8081")]
    #[serde(default = "default_bind_to")]
    pub bind_to: std::net::SocketAddr,
    #[clap(long, env = "SESSION_COOKIE", default_value = "bolide_session")]
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    /// Host the static assets are served from if not this instance
    #[clap(long, env = "STATIC_HOST")]
    pub(crate) static_host: Option<String>,
    #[clap(long, env = "STATIC_ROOT", default_value = "./res")]
    #[serde(default = "default_data_root")]
    pub static_root: String,
    /// Point this at a GHE instance if the inbox should not talk to github.com
    #[clap(long, env = "GITHUB_API_BASE", default_value = "https://api.github.com")]
    #[serde(default = "default_github_api_base")]
    pub github_api_base: url::Url,
    /// Minutes between notification syncs per user
    #[clap(long, env = "POLL_INTERVAL", default_value = "10")]
    #[serde(default = "default_poll_interval")]
    pub poll_interval: i64,
    #[clap(long, env = "HTTP_PROXY")]
    #[serde(alias = "HTTP_PROXY", alias = "HTTPS_PROXY", alias = "SOCKS_PROXY")]
    pub proxy: Option<url::Url>,
    #[clap(long, env = "SENTRY_URL")]
    pub sentry_url: Option<url::Url>,
    #[clap(long, env = "SENTRY_RATIO")]
    pub sentry_ratio: Option<f32>,
    #[serde(skip)]
    #[clap(skip)]
    #[sensitive]
    pub alt_dbconn: Option<DBPool>,
}

impl Configuration {
    pub async fn db_conn(&self) -> BolideResult<DBPool> {
        match &self.alt_dbconn {
            Some(v) => return Ok(v.clone()),
            None => (),
        }
        let opts = sqlx::postgres::PgConnectOptions::from_str(&self.database_url.to_string())?
            .application_name(&crate::package_full());
        let conn = sqlx::PgPool::connect_with(opts).await?;

        Ok(conn)
    }
    /// Tests hand in their own pool here, routing every `db_conn` call
    /// to it instead of the configured database.
    pub unsafe fn set_alt_dbconn(&mut self, db: DBPool) {
        self.alt_dbconn = Some(db);
    }
    pub fn static_host(&self) -> Option<&str> {
        self.static_host.as_deref()
    }
    pub fn poll_interval(&self) -> bolide_dependencies::chrono::Duration {
        bolide_dependencies::chrono::Duration::minutes(self.poll_interval.max(1))
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            database_url: url::Url::from_str("postgres://localhost/bolide").unwrap(),
            bind_to: default_bind_to(),
            session_cookie: default_session_cookie(),
            static_host: None,
            static_root: default_data_root(),
            github_api_base: default_github_api_base(),
            poll_interval: default_poll_interval(),
            proxy: None,
            sentry_url: None,
            sentry_ratio: None,
            alt_dbconn: None,
        }
    }
}
