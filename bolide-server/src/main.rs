#[macro_use]
extern crate tracing;

use clap::Parser;

use bolide_core::error::BolideResult;
use bolide_core::package_full;

mod cli;
mod init;
mod pages;

fn main() -> BolideResult<()> {
    crate::init::logging();
    let cli = cli::AppCli::parse();
    let _sentry_guard = crate::init::sentry_guard(&cli.config);
    use tokio::runtime::Builder;
    let runtime = Builder::new_multi_thread()
        .worker_threads(16)
        .max_blocking_threads(16)
        .thread_name_fn(|| {
            use std::sync::atomic::{AtomicUsize, Ordering};
            static ATOMIC_ID: AtomicUsize = AtomicUsize::new(0);
            let id = ATOMIC_ID.fetch_add(1, Ordering::SeqCst);
            format!("bolide-{}", id)
        })
        .enable_all()
        .build()
        .unwrap();

    match cli.command {
        cli::Command::Server(server_cli) => {
            info!("Starting {}", package_full());
            let start_jobs = !server_cli.no_jobs;
            let start_scheduler = start_jobs && !server_cli.no_scheduler;
            if !start_jobs {
                warn!("Running without job scheduler and job runner");
            } else if !start_scheduler {
                warn!("Running without job scheduler, only the job worker runs");
            }
            let config = cli.config;
            runtime.block_on(async move {
                tokio::spawn(async move {
                    crate::cli::server::server_start(start_scheduler, start_jobs, config).await
                })
                .await
            })??;
            runtime.shutdown_timeout(std::time::Duration::from_secs(10));
            Ok(())
        }
        cli::Command::ListUsers(list_users_cli) => {
            runtime.block_on(crate::cli::list_users::list_users(list_users_cli, cli.config))
        }
        cli::Command::RunJob(run_job_cli) => {
            runtime.block_on(crate::cli::run_job::run_job(run_job_cli, cli.config))
        }
    }
}
