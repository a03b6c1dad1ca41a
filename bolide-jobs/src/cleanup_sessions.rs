use bolide_core::{error::BolideResult, session::PostgresSessionStore};
use sqlxmq::CurrentJob;

use crate::SharedCtx;

#[instrument(level = "trace", skip(current_job, sctx))]
#[sqlxmq::job]
pub async fn run_job(mut current_job: CurrentJob, sctx: SharedCtx) -> BolideResult<()> {
    let pool = current_job.pool().clone();
    let store = PostgresSessionStore::from_client(pool, &sctx.config.session_cookie);
    let dropped = store.cleanup().await?;
    let live = store.count().await?;
    current_job.complete().await?;
    info!(
        "Job {}: Completed session pruning, dropped {} sessions, {} live",
        current_job.id(),
        dropped,
        live
    );
    Ok(())
}
