use bolide_core::{app::DBPool, config::Configuration, error::BolideResult};
use bolide_dependencies::chrono::Utc;
use bolide_models::{Client, User};

use crate::cli::{RunJobCli, RunJobSelect};

pub async fn run_job(run_job: RunJobCli, config: Configuration) -> BolideResult<()> {
    info!("Starting with config {:?}", config);
    let db_conn: DBPool = config.db_conn().await?;
    match run_job.job {
        RunJobSelect::SyncNotifications { user_id } => {
            let mut client = Client::new(db_conn.clone());
            match User::get_id(&mut client, user_id).await? {
                Some(mut user) => {
                    // set the marker like the scheduler would, the UI keys off it
                    let now = Utc::now().naive_utc();
                    user.mark_fetching(&mut client, now).await?;
                    bolide_jobs::spawn_sync_for(&db_conn, user.id).await?;
                    info!("queued notification sync for user {}", user.id);
                }
                None => error!("no user with id {}", user_id),
            }
        }
        RunJobSelect::CleanupSessions => {
            let jb: sqlxmq::JobBuilder = bolide_jobs::cleanup_sessions::run_job.builder();
            jb.spawn(&db_conn).await?;
            info!("queued session cleanup");
        }
    }
    info!("Bolide exited.");
    Ok(())
}
