use clap::{Args, Parser, Subcommand};

pub mod list_users;
pub mod run_job;
pub mod server;

#[derive(Parser, Debug)]
#[clap(author, version, about = "The GitHub notification triage inbox", long_about = None)]
pub struct AppCli {
    #[clap(subcommand)]
    pub command: Command,
    #[clap(flatten)]
    pub config: bolide_core::config::Configuration,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Launch the inbox server
    Server(ServerCli),
    /// List the users known to this deployment
    ListUsers(ListUsersCli),
    /// Run a specific job manually. Note that you will only schedule the job, a worker must be available
    RunJob(RunJobCli),
}

#[derive(Args, Debug)]
pub struct ServerCli {
    #[clap(long, short = 'z', alias = "no-jobrunner")]
    /// Disable all job processing, including scheduler
    pub no_jobs: bool,
    #[clap(long, short = 'y')]
    /// Disable the scheduler, only run a worker
    pub no_scheduler: bool,
}

#[derive(Args, Debug)]
pub struct ListUsersCli {
    /// Only show users whose login or display name contains this text
    #[clap(long, short = 's', value_name = "TERM")]
    pub search: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunJobCli {
    #[clap(subcommand)]
    pub job: RunJobSelect,
}

#[derive(Subcommand, Debug)]
pub enum RunJobSelect {
    /// Queue a notification sync for one user
    SyncNotifications { user_id: i64 },
    /// Queue a sweep of expired sessions
    CleanupSessions,
}
