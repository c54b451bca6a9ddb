//! User administration commands.

use console::style;

use asap_pdf::config::Settings;
use asap_pdf::repository::SaveError;
use crate::cli::icons::{error, success, warn};

pub async fn cmd_user_add(settings: &Settings, email: &str, password: &str) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    match ctx.users().create(email, password).await {
        Ok(user) => {
            println!("{} Added user {} (id {})", success(), user.email_address, user.id);
            Ok(())
        }
        Err(SaveError::Invalid(errors)) => {
            for message in errors.full_messages() {
                eprintln!("  {} {}", error(), message);
            }
            anyhow::bail!("User not created")
        }
        Err(SaveError::Database(e)) => Err(e.into()),
    }
}

pub async fn cmd_user_list(settings: &Settings) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    let users = ctx.users().list().await?;

    if users.is_empty() {
        println!("{} No users yet", warn());
        return Ok(());
    }

    println!("{:<6} {:<40} {}", style("ID").bold(), style("EMAIL").bold(), style("CREATED").bold());
    for user in users {
        println!(
            "{:<6} {:<40} {}",
            user.id,
            user.email_address,
            user.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

pub async fn cmd_user_delete(settings: &Settings, email: &str, confirm: bool) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    let user = ctx
        .users()
        .find_by_email(email)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No user with email {}", email))?;

    if !confirm {
        println!(
            "{} This deletes {} along with their sessions and sites. Re-run with --confirm.",
            warn(),
            user.email_address
        );
        return Ok(());
    }

    if ctx.users().delete(user.id).await? {
        println!("{} Deleted {}", success(), user.email_address);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_and_delete_user() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::with_data_dir(dir.path().to_path_buf());
        settings.create_db_context().unwrap().init_schema().await.unwrap();

        cmd_user_add(&settings, "clerk@springfield.gov", "pw").await.unwrap();
        assert!(cmd_user_add(&settings, "clerk@springfield.gov", "pw").await.is_err());

        // Without --confirm nothing is removed
        cmd_user_delete(&settings, "clerk@springfield.gov", false).await.unwrap();
        let ctx = settings.create_db_context().unwrap();
        assert_eq!(ctx.users().list().await.unwrap().len(), 1);

        cmd_user_delete(&settings, "clerk@springfield.gov", true).await.unwrap();
        assert!(ctx.users().list().await.unwrap().is_empty());
    }
}
