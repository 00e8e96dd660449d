use console::style;
use repocache::accounts::{self, NewAccount};
use repocache::db;
use repocache::entity::platform::Platform;
use repocache::repository;

use crate::AccountAction;

pub(crate) async fn handle_account(
    action: AccountAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect_and_migrate(database_url).await?;

    match action {
        AccountAction::Link {
            participant,
            platform,
            user_id,
            user_name,
            display_name,
        } => {
            let account = accounts::link_account(
                &db,
                NewAccount {
                    participant,
                    platform,
                    user_id,
                    user_name,
                    display_name,
                },
            )
            .await?;
            println!(
                "{} Linked {} account {} to participant {}",
                style("✓").green().bold(),
                account.platform,
                style(account.friendly_name()).cyan(),
                account.participant
            );
        }
        AccountAction::List { participant } => {
            let linked = accounts::find_by_participant(&db, participant).await?;
            if linked.is_empty() {
                println!("Participant {} has no linked accounts.", participant);
            }
            for account in linked {
                println!(
                    "{:>6}  {:<7} {:<24} {}",
                    account.id,
                    account.platform,
                    account.friendly_name(),
                    account.profile_url().unwrap_or_default()
                );
            }
        }
    }

    Ok(())
}

/// Print a participant's cached repositories.
pub(crate) async fn handle_repos(
    database_url: &str,
    participant: i64,
    platform: Option<Platform>,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect_and_migrate(database_url).await?;
    let repos = repository::find_by_participant(&db, participant, platform).await?;

    for repo in &repos {
        let fork = if repo.is_fork == Some(true) { " (fork)" } else { "" };
        println!(
            "{:<7} {}{}  {}  fetched {}",
            repo.platform,
            style(&repo.slug).cyan(),
            fork,
            repo.url(),
            repo.info_fetched_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!("{} repositor{}", repos.len(), if repos.len() == 1 { "y" } else { "ies" });
    Ok(())
}
