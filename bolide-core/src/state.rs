use std::marker::PhantomData;
use std::time::Instant;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap, Uri},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use bolide_dependencies::axum_flash::{self, IncomingFlashes};
use bolide_models::{Client, User};

use crate::app::DBPool;
use crate::assets::{AssetLoader, SiteConfig};
use crate::config::Configuration;
use crate::error::{BolideError, BolideResult};
use crate::footer::FooterData;
use crate::request_helper::DbRef;
use crate::session::{PostgresSessionStore, Session, SessionMode};

#[derive(Clone)]
pub struct BolideState {
    pub config: Configuration,
    pub db_pool: DBPool,
    pub asset_loader: AssetLoader,
    pub client: Client,
    pub url_directions: UrlDirections,
    session_store: PostgresSessionStore,
    flash_config: axum_flash::Config,
}

/// Routes the core needs to point at but only the server crate knows.
#[derive(Clone, Debug)]
pub struct UrlDirections {
    pub login_page: Uri,
}

impl FromRef<BolideState> for axum_flash::Config {
    fn from_ref(state: &BolideState) -> Self {
        state.flash_config.clone()
    }
}

impl BolideState {
    pub async fn new(config: Configuration, url_directions: UrlDirections) -> BolideResult<Self> {
        debug!("Grabbing Database Pool for HTTP Stateful Requests");
        let db_pool = config.db_conn().await?;
        Ok(Self {
            client: Client::new(db_pool.clone()),
            session_store: PostgresSessionStore::from_client(
                db_pool.clone(),
                &config.session_cookie,
            ),
            flash_config: axum_flash::Config::new(axum_flash::Key::generate()),
            asset_loader: AssetLoader::new(&config)?,
            db_pool,
            config,
            url_directions,
        })
    }
    pub async fn get_db(&self) -> std::result::Result<DbRef, sqlx::Error> {
        self.db_pool.acquire().await
    }
    pub fn get_db_pool(&self) -> DBPool {
        self.db_pool.clone()
    }
    pub fn get_db_client(&self) -> Client {
        self.client.clone()
    }
    #[instrument(skip(pool))]
    pub async fn get_db_client_standalone(pool: DBPool) -> BolideResult<Client> {
        // calling this unnecessarily is bad as it means we loose in-proc cache
        warn!("Creating standalone database client");
        Ok(Client::new(pool))
    }
    pub fn config(&self) -> &Configuration {
        &self.config
    }
    pub fn session_store(&self) -> &PostgresSessionStore {
        &self.session_store
    }
    pub fn site_config(&self) -> &SiteConfig {
        self.asset_loader.site_config()
    }
    pub fn footer_data(&self) -> &FooterData {
        self.asset_loader.footer_data()
    }
}

pub struct BolideRequestState<T: SessionMode> {
    pub cookie_jar: CookieJar,
    pub headers: HeaderMap,
    pub uri: Uri,
    pub session: Session,
    pub flash: IncomingFlashes,
    pub started_at: Instant,
    store: PostgresSessionStore,
    _mode: PhantomData<T>,
}

pub enum RequestStateRejection {
    Error(BolideError),
    LoginRequired(Uri),
}

impl From<BolideError> for RequestStateRejection {
    fn from(e: BolideError) -> Self {
        Self::Error(e)
    }
}

impl IntoResponse for RequestStateRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Error(e) => e.into_response(),
            Self::LoginRequired(uri) => Redirect::to(&uri.to_string()).into_response(),
        }
    }
}

#[async_trait]
impl<T: SessionMode> FromRequestParts<BolideState> for BolideRequestState<T> {
    type Rejection = RequestStateRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &BolideState,
    ) -> Result<Self, Self::Rejection> {
        // the session middleware parks the loaded session in the extensions
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(BolideError::StaticSession)?;
        if T::requires_user() && session.user_id().is_none() {
            debug!("unauthenticated request to {}, redirecting to login", parts.uri);
            return Err(RequestStateRejection::LoginRequired(
                state.url_directions.login_page.clone(),
            ));
        }
        let flash = match IncomingFlashes::from_request_parts(parts, state).await {
            Ok(v) => v,
            // axum-flash 0.7 declares a rejection type but its impl never errors
            Err(_) => unreachable!("IncomingFlashes extraction cannot fail"),
        };
        Ok(Self {
            cookie_jar: CookieJar::from_headers(&parts.headers),
            headers: parts.headers.clone(),
            uri: parts.uri.clone(),
            session,
            flash,
            started_at: Instant::now(),
            store: state.session_store().clone(),
            _mode: PhantomData,
        })
    }
}

impl<T: SessionMode> BolideRequestState<T> {
    pub fn session(&self) -> &Session {
        &self.session
    }
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }
    pub fn csrf_token(&self) -> String {
        self.session.csrf_token()
    }
    /// Writes the (possibly mutated) session back to the store.
    pub async fn push_session_update(&self) -> BolideResult<()> {
        self.store.store_session(&self.session).await
    }
    pub async fn destroy_session(&self) -> BolideResult<()> {
        self.store.destroy_session(&self.session).await
    }
    pub async fn user(&self, state: &BolideState) -> BolideResult<Option<User>> {
        self.session.get_user(&mut state.get_db_client()).await
    }
}
