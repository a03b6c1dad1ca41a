use axum::{middleware, Router};
use axum_extra::routing::TypedPath;
use bolide_core::{
    app::DBPool,
    config::Configuration,
    csp_header,
    error::BolideResult,
    session::session_middleware,
    state::{BolideState, UrlDirections},
};
use bolide_dependencies::{sentry_tower, tower::ServiceBuilder};
use sqlx::Postgres;

use crate::pages::{self, not_found_page, session::PathSessionsLogin};

pub async fn run_migrations(
    _config: &Configuration,
    db_conn: sqlx::Pool<Postgres>,
) -> BolideResult<()> {
    info!("Migrating database");
    sqlx::migrate!("../migrations").run(&db_conn).await?;
    info!("Database migrated!");
    Ok(())
}

pub fn setup_all_routes(router: Router<BolideState>) -> Router<BolideState> {
    let router = pages::notifications::notification_pages(router);
    let router = pages::session::session_pages(router);
    let router = bolide_core::assets::embedded_file_pages(router);

    router
}

pub async fn axum_setup(config: &Configuration) -> BolideResult<Router> {
    let router = Router::new();

    let router = setup_all_routes(router);

    let state = BolideState::new(
        config.clone(),
        UrlDirections {
            login_page: PathSessionsLogin {}.to_uri(),
        },
    )
    .await?;

    let router = router
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    session_middleware,
                ))
                .layer(middleware::from_fn_with_state(state.clone(), csp_header))
                .layer(sentry_tower::NewSentryLayer::new_from_top())
                .layer(sentry_tower::SentryHttpLayer::with_transaction()),
        )
        .fallback(not_found_page)
        .with_state(state);

    Ok(router)
}

pub async fn server_start(
    start_job_scheduler: bool,
    start_jobs: bool,
    config: Configuration,
) -> BolideResult<()> {
    info!("Starting with config {:?}", config);
    let db_conn: DBPool = config.db_conn().await?;
    run_migrations(&config, db_conn.clone()).await?;
    let job_runner = if start_jobs {
        debug!("Starting job runner");
        Some(bolide_jobs::runner(db_conn.clone(), config.clone()))
    } else {
        None
    };
    debug!("Configuring application server");

    let axum = axum_setup(&config).await?;

    let scheduler = if start_job_scheduler {
        debug!("Booting up job scheduler");
        let db_conn = db_conn.clone();
        let config = config.clone();
        Some(tokio::spawn(async move {
            bolide_jobs::scheduler(db_conn, config).await
        }))
    } else {
        None
    };
    let server = axum.into_make_service();
    let server = axum::Server::bind(&config.bind_to).serve(server);
    match (scheduler, job_runner) {
        (Some(scheduler), Some(job_runner)) => {
            tokio::select! {
                r = server => {
                    match r {
                        Ok(()) => error!("server exited cleanly but unexpectedly"),
                        Err(e) => error!("server error exit: {:?}", e),
                    }
                }
                r = scheduler => {
                    match r {
                        Ok(()) => error!("scheduler exited cleanly but unexpectedly"),
                        Err(e) => error!("scheduler error exit: {}", e),
                    }
                }
                r = job_runner => {
                    match r {
                        Ok(()) => error!("job runner exited cleanly but unexpectedly"),
                        Err(e) => error!("job runner error exit: {}", e),
                    }
                }
            };
        }
        (None, Some(job_runner)) => {
            tokio::select! {
                r = server => {
                    match r {
                        Ok(()) => error!("server exited cleanly but unexpectedly"),
                        Err(e) => error!("server error exit: {:?}", e),
                    }
                }
                r = job_runner => {
                    match r {
                        Ok(()) => error!("job runner exited cleanly but unexpectedly"),
                        Err(e) => error!("job runner error exit: {}", e),
                    }
                }
            };
        }
        _ => match server.await {
            Ok(()) => error!("server exited cleanly but unexpectedly"),
            Err(e) => {
                error!("Could not start server: {:?}", e);
            }
        },
    }
    println!("Bolide exited.");
    Ok(())
}

#[cfg(test)]
mod test {
    #[test]
    pub fn test_verify_routes_build() {
        let router = axum::Router::new();

        super::setup_all_routes(router);
    }
}
