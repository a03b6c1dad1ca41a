use std::collections::BTreeMap;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use bolide_dependencies::{
    base64::{self, Engine},
    chrono::{Duration, NaiveDateTime},
    ring, securefmt,
    uuid::Uuid,
};
use bolide_models::{Client, User};
use sqlx::{pool::PoolConnection, PgPool, Postgres};

use crate::error::BolideResult;
use crate::state::BolideState;

/// Marks a request state as requiring a signed-in user or not. Routes
/// pick their mode through the request state extractor.
pub trait SessionMode: Send + Sync + 'static {
    fn requires_user() -> bool;
}

pub struct Authenticated;
pub struct Unauthenticated;

impl SessionMode for Authenticated {
    fn requires_user() -> bool {
        true
    }
}

impl SessionMode for Unauthenticated {
    fn requires_user() -> bool {
        false
    }
}

#[derive(Clone, Debug)]
pub struct PostgresSessionStore {
    client: PgPool,
    table_name: String,
    cookie_name: String,
}

#[derive(Clone, serde::Serialize, serde::Deserialize, securefmt::Debug)]
pub struct Session {
    id: Uuid,
    created: NaiveDateTime,
    expires: NaiveDateTime,
    #[sensitive]
    csrf_token: String,
    user_id: Option<i64>,
    data: BTreeMap<String, serde_json::Value>,
}

impl Session {
    pub fn id(&self) -> Uuid {
        self.id
    }
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created: bolide_dependencies::chrono::Utc::now().naive_utc(),
            expires: bolide_dependencies::chrono::Utc::now()
                .naive_utc()
                .checked_add_signed(Duration::days(7))
                .expect("must be valid"),
            data: BTreeMap::new(),
            user_id: None,
            csrf_token: base64::engine::general_purpose::STANDARD.encode(
                ring::rand::generate::<[u8; 32]>(&ring::rand::SystemRandom::new())
                    .expect("system rng must be available")
                    .expose(),
            ),
        }
    }
    pub fn expiry(&self) -> i64 {
        self.expires.timestamp_millis()
    }
    pub fn expired(&self) -> bool {
        self.expires <= bolide_dependencies::chrono::Utc::now().naive_utc()
    }
    pub fn csrf_token(&self) -> String {
        self.csrf_token.clone()
    }
    /// Compares in constant time, a plain == would leak the token byte by byte.
    pub fn verify_csrf(&self, presented: &str) -> bool {
        ring::constant_time::verify_slices_are_equal(
            self.csrf_token.as_bytes(),
            presented.as_bytes(),
        )
        .is_ok()
    }
    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }
    pub fn set_user(&mut self, user: &User) {
        self.user_id = Some(user.id);
    }
    pub fn unset_user(&mut self) {
        self.user_id = None;
    }
    pub async fn get_user(&self, client: &mut Client) -> BolideResult<Option<User>> {
        match self.user_id {
            None => Ok(None),
            Some(user_id) => Ok(client.get_user_cached(user_id).await?),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl PostgresSessionStore {
    pub fn from_client(client: PgPool, cookie_name: &str) -> Self {
        Self {
            client,
            table_name: "user_sessions".into(),
            cookie_name: cookie_name.into(),
        }
    }
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
    async fn connection(&self) -> sqlx::Result<PoolConnection<Postgres>> {
        self.client.acquire().await
    }
    pub async fn cleanup(&self) -> sqlx::Result<u64> {
        let mut conn = self.connection().await?;
        let res = sqlx::query(&format!(
            "DELETE FROM {} WHERE expires < $1",
            self.table_name
        ))
        .bind(bolide_dependencies::chrono::Utc::now().naive_utc())
        .execute(&mut *conn)
        .await?;

        Ok(res.rows_affected())
    }
    pub async fn count(&self) -> sqlx::Result<i64> {
        let mut conn = self.connection().await?;
        let (count,): (i64,) =
            sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", self.table_name))
                .fetch_one(&mut *conn)
                .await?;
        Ok(count)
    }

    pub async fn load_session(&self, cookie_value: String) -> BolideResult<Option<Session>> {
        if cookie_value.is_empty() {
            return Ok(None);
        }
        let id: Uuid = cookie_value.parse()?;
        let mut conn = self.connection().await?;
        let result: Option<(String,)> = sqlx::query_as(&format!(
            "SELECT session FROM {} WHERE id = $1 AND (expires IS NULL OR expires > $2)",
            self.table_name
        ))
        .bind(id)
        .bind(bolide_dependencies::chrono::Utc::now().naive_utc())
        .fetch_optional(&mut *conn)
        .await?;
        Ok(result
            .map(|(session,)| serde_json::from_str(&session))
            .transpose()?)
    }

    pub async fn store_session(&self, session: &Session) -> BolideResult<()> {
        let id = session.id();
        let string = serde_json::to_string(&session)?;
        let mut conn = self.connection().await?;

        sqlx::query(&format!(
            r#"INSERT INTO {}
            (id, session, expires) SELECT $1, $2, $3
            ON CONFLICT(id) DO UPDATE SET
                expires = EXCLUDED.expires,
                session = EXCLUDED.session"#,
            self.table_name
        ))
        .bind(id)
        .bind(&string)
        .bind(session.expires)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn destroy_session(&self, session: &Session) -> BolideResult<()> {
        let id = session.id();
        let mut conn = self.connection().await?;
        sqlx::query(&format!("DELETE FROM {} WHERE id = $1", self.table_name))
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

/// Loads the session named by the request cookie, minting and persisting a
/// fresh one when there is none to load. Handlers find it in the request
/// extensions, static paths are skipped entirely.
pub async fn session_middleware(
    State(state): State<BolideState>,
    mut req: Request<Body>,
    next: Next<Body>,
) -> Response {
    if crate::StatelessPaths::contains(req.uri().path()) {
        return next.run(req).await;
    }
    let store = state.session_store().clone();
    let jar = CookieJar::from_headers(req.headers());
    let loaded = match jar.get(store.cookie_name()) {
        Some(cookie) => match store.load_session(cookie.value().to_string()).await {
            Ok(Some(session)) => Some(session),
            Ok(None) => {
                info!("Got an empty session");
                None
            }
            Err(e) => {
                warn!("error trying to get session: {}", e);
                None
            }
        },
        None => None,
    };
    let (session, set_cookie) = match loaded {
        Some(session) => (session, None),
        None => {
            trace!("No session in request, making a session");
            let session = Session::new();
            trace!("New session {}", session.id());
            match store.store_session(&session).await {
                Ok(_) => (),
                Err(e) => warn!("Error in session store (new) : {:?}", e),
            };
            let cookie = Cookie::build(store.cookie_name().to_string(), session.id().to_string())
                .path("/")
                .same_site(SameSite::Lax)
                .http_only(true)
                .finish();
            (session, Some(cookie))
        }
    };
    req.extensions_mut().insert(session);
    let mut res = next.run(req).await;
    if let Some(cookie) = set_cookie {
        match HeaderValue::from_str(&cookie.to_string()) {
            Ok(v) => {
                res.headers_mut().append(header::SET_COOKIE, v);
            }
            Err(e) => warn!("could not append session cookie: {}", e),
        }
    }
    res
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fresh_sessions_carry_a_csrf_token() {
        let session = Session::new();
        assert!(!session.csrf_token().is_empty());
        assert!(!session.expired());
        assert_eq!(session.user_id(), None);
    }

    #[test]
    fn csrf_token_only_verifies_against_itself() {
        let session = Session::new();
        let other = Session::new();
        assert!(session.verify_csrf(&session.csrf_token()));
        assert!(!session.verify_csrf(&other.csrf_token()));
        assert!(!session.verify_csrf(""));
    }

    #[test]
    fn sessions_expire_at_their_deadline() {
        let mut session = Session::new();
        session.expires = bolide_dependencies::chrono::Utc::now().naive_utc()
            - Duration::seconds(1);
        assert!(session.expired());
    }

    #[test]
    fn sessions_survive_the_store_format() {
        let mut session = Session::new();
        session.data.insert("probe".to_string(), serde_json::json!(1));
        let stored = serde_json::to_string(&session).unwrap();
        let restored: Session = serde_json::from_str(&stored).unwrap();
        assert_eq!(restored.id(), session.id());
        assert_eq!(restored.csrf_token(), session.csrf_token());
        assert_eq!(restored.data, session.data);
    }
}
