use bolide_core::{app::DBPool, config::Configuration, error::BolideResult};
use bolide_models::{Client, User};

pub async fn list_users(args: crate::cli::ListUsersCli, config: Configuration) -> BolideResult<()> {
    let db_conn: DBPool = config.db_conn().await?;
    let mut client = Client::new(db_conn);
    let users = User::all(&mut client).await?;
    let needle = args.search.as_deref().map(|s| s.to_lowercase());
    let mut shown = 0usize;
    for user in &users {
        if let Some(needle) = &needle {
            let matches = user.login.to_lowercase().contains(needle)
                || user
                    .name
                    .as_deref()
                    .map(|n| n.to_lowercase().contains(needle))
                    .unwrap_or(false);
            if !matches {
                continue;
            }
        }
        shown += 1;
        let last_synced = match user.last_synced_at {
            Some(at) => at.to_string(),
            None => "never".to_string(),
        };
        println!(
            "{:>6}  {:<24}  {:<24}  last sync: {}",
            user.id,
            user.login,
            user.displayname(),
            last_synced
        );
    }
    println!("{} of {} users shown", shown, users.len());
    Ok(())
}
