#[macro_use]
extern crate tracing;

mod models;
#[macro_use]
mod macros;

pub use models::*;

use bolide_dependencies::moka::future::Cache;
use sqlx::{pool::PoolConnection, PgPool, Postgres};

pub type Db = sqlx::pool::PoolConnection<Postgres>;
pub type ClientRef<'a> = &'a mut Client;

#[derive(thiserror::Error, Debug)]
pub enum BolideModelError {
    #[error("Other error: {}", .0)]
    Other(String),
    #[error("Error in underlying datamodel: {}", .0)]
    SQLx(#[from] sqlx::Error),
}

/// Database handle shared across the app. Cheap to clone, all connections
/// come out of the pool on demand.
#[derive(Clone)]
pub struct Client {
    db: PgPool,
    cache_users: Cache<i64, Option<User>>,
}

impl Client {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            cache_users: Cache::new(1000),
        }
    }

    pub(crate) async fn db(&self) -> Result<PoolConnection<Postgres>, BolideModelError> {
        Ok(self.db.acquire().await?)
    }

    /// User lookup through the per-process cache. Sessions hit this on
    /// every page render.
    pub async fn get_user_cached(&mut self, id: i64) -> Result<Option<User>, BolideModelError> {
        if let Some(user) = self.cache_users.get(&id).await {
            trace!("User {} served from cache", id);
            return Ok(user);
        }
        let user = User::get_id(self, id).await?;
        self.cache_users.insert(id, user.clone()).await;
        Ok(user)
    }

    /// Drops a user from the cache, for after token or profile updates.
    pub async fn invalidate_user(&self, id: i64) {
        self.cache_users.invalidate(&id).await;
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("db", &self.db).finish()
    }
}

impl From<PgPool> for Client {
    fn from(p: PgPool) -> Self {
        Client::new(p)
    }
}

impl From<&PgPool> for Client {
    fn from(p: &PgPool) -> Self {
        Client::new(p.clone())
    }
}

impl<'c> sqlx::Executor<'c> for &mut Client {
    type Database = sqlx::Postgres;

    #[instrument(skip(query), fields(query = query.sql()))]
    fn fetch_many<'e, 'q: 'e, E: 'q>(
        self,
        query: E,
    ) -> bolide_dependencies::futures_util::stream::BoxStream<
        'e,
        Result<
            sqlx::Either<
                <Self::Database as sqlx::Database>::QueryResult,
                <Self::Database as sqlx::Database>::Row,
            >,
            sqlx::Error,
        >,
    >
    where
        'c: 'e,
        E: sqlx::Execute<'q, Self::Database>,
    {
        use bolide_dependencies::tracing_futures::Instrument;
        Box::pin(
            self.db
                .fetch_many(query)
                .instrument(tracing::span::Span::current()),
        )
    }

    #[instrument(skip(query), fields(query = query.sql()))]
    fn fetch_optional<'e, 'q: 'e, E: 'q>(
        self,
        query: E,
    ) -> bolide_dependencies::futures_util::future::BoxFuture<
        'e,
        Result<Option<<Self::Database as sqlx::Database>::Row>, sqlx::Error>,
    >
    where
        'c: 'e,
        E: sqlx::Execute<'q, Self::Database>,
    {
        use bolide_dependencies::tracing_futures::Instrument;
        Box::pin(
            self.db
                .fetch_optional(query)
                .instrument(tracing::span::Span::current()),
        )
    }

    #[instrument(skip(parameters))]
    fn prepare_with<'e, 'q: 'e>(
        self,
        sql: &'q str,
        parameters: &'e [<Self::Database as sqlx::Database>::TypeInfo],
    ) -> bolide_dependencies::futures_util::future::BoxFuture<
        'e,
        Result<<Self::Database as sqlx::database::HasStatement<'q>>::Statement, sqlx::Error>,
    >
    where
        'c: 'e,
    {
        use bolide_dependencies::tracing_futures::Instrument;
        Box::pin(
            self.db
                .prepare_with(sql, parameters)
                .instrument(tracing::span::Span::current()),
        )
    }

    #[instrument]
    fn describe<'e, 'q: 'e>(
        self,
        sql: &'q str,
    ) -> bolide_dependencies::futures_util::future::BoxFuture<
        'e,
        Result<sqlx::Describe<Self::Database>, sqlx::Error>,
    >
    where
        'c: 'e,
    {
        use bolide_dependencies::tracing_futures::Instrument;
        Box::pin(
            self.db
                .describe(sql)
                .instrument(tracing::span::Span::current()),
        )
    }
}
