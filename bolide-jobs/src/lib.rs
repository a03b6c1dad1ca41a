#[macro_use]
extern crate tracing;

pub mod cleanup_sessions;
pub mod sync_notifications;

use std::error::Error;

use bolide_core::{
    app::DBPool, config::Configuration, error::BolideResult, state::BolideState,
};
use bolide_dependencies::chrono::{NaiveDateTime, Utc};
use bolide_models::{Client, User};
use sqlxmq::JobRegistry;
use tokio_cron_scheduler::{Job, JobScheduler};

#[derive(Clone, Debug)]
pub struct SharedCtx {
    client: Client,
    config: Configuration,
}

pub fn registry() -> BolideResult<JobRegistry> {
    Ok(JobRegistry::new(&[
        sync_notifications::run_job,
        cleanup_sessions::run_job,
    ]))
}

pub async fn runner(db: DBPool, config: Configuration) -> BolideResult<()> {
    let mut registry = registry()?;
    let client = BolideState::get_db_client_standalone(db.clone()).await?;
    registry.set_error_handler(job_err_handler);
    registry.set_context(SharedCtx { client, config });
    let handle = registry.runner(&db).set_concurrency(1, 20).run().await?;
    info!("Job runner live");
    // into_inner detaches the drop-cancel guard, the runner must outlive this scope
    let handle = handle.into_inner();
    handle.await?;
    Ok(())
}

pub fn job_err_handler(name: &str, err: Box<dyn Error + Send + 'static>) {
    error!("Job {} failed with {:?} ({:?}) ", name, err, err.source());
}

/// Queues a sync for every user whose last sync aged past the poll interval.
/// The fetch marker keeps double-enqueues out.
pub async fn enqueue_due_syncs(db: &DBPool, config: &Configuration) -> BolideResult<()> {
    let mut client = Client::new(db.clone());
    let now = Utc::now().naive_utc();
    let poll = config.poll_interval();
    for mut user in User::all(&mut client).await? {
        if !user.sync_due(now, poll) {
            continue;
        }
        debug!("user {} is due for a sync", user.id);
        user.mark_fetching(&mut client, now).await?;
        spawn_sync_for(db, user.id).await?;
    }
    Ok(())
}

pub async fn spawn_sync_for(db: &DBPool, user_id: i64) -> BolideResult<()> {
    let mut jb: sqlxmq::JobBuilder = sync_notifications::run_job.builder();
    jb.set_json(&sync_notifications::SyncConfig { user_id, page: 1 })?
        .spawn(db)
        .await?;
    Ok(())
}

/// On-demand sync, used when the user hits refresh or signs in. Returns
/// false without enqueuing while a sync for the user is already running.
pub async fn request_sync_for(
    db: &DBPool,
    client: &mut Client,
    user: &mut User,
    now: NaiveDateTime,
) -> BolideResult<bool> {
    if user.is_fetching(now) {
        debug!("sync for user {} already in flight, not enqueuing", user.id);
        return Ok(false);
    }
    user.mark_fetching(client, now).await?;
    spawn_sync_for(db, user.id).await?;
    Ok(true)
}

pub async fn scheduler(db: DBPool, config: Configuration) -> ! {
    let mut sched = JobScheduler::new();

    {
        let db = db.clone();
        let config = config.clone();
        sched
            .add(
                Job::new("0 0/5 * * * * *", move |uuid, _l| {
                    trace!("Scanning for stale users on scheduler UUID {}", uuid);
                    let db = db.clone();
                    let config = config.clone();
                    tokio::spawn(async move {
                        if let Err(e) = enqueue_due_syncs(&db, &config).await {
                            error!("could not enqueue notification syncs: {}", e);
                        }
                    });
                })
                .expect("could not spawn job"),
            )
            .expect("could not add job to scheduler");
    }
    {
        let db = db.clone();
        sched
            .add(
                Job::new("0 1/10 * * * * *", move |uuid, _l| {
                    info!("Starting cleanup_sessions job on scheduler UUID {}", uuid);
                    let db = db.clone();
                    tokio::spawn(async move {
                        let jb: sqlxmq::JobBuilder = cleanup_sessions::run_job.builder();
                        jb.spawn(&db).await
                    });
                })
                .expect("could not spawn job"),
            )
            .expect("could not add job to scheduler");
    }

    info!("Starting scheduler");
    sched.start().await.expect("scheduler failed");
    error!("scheduler exited");
    drop(sched);
    panic!("returned from scheduler");
}
