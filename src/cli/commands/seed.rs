//! Development seed data.

use asap_pdf::config::Settings;
use crate::cli::icons::{dim_arrow, success};

pub const SEED_EMAIL: &str = "admin@codeforamerica.org";
pub const SEED_PASSWORD: &str = "password";

/// Create the development admin user if missing.
pub async fn cmd_seed(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let ctx = settings.create_db_context()?;
    ctx.init_schema().await?;

    let users = ctx.users();
    if let Some(user) = users.find_by_email(SEED_EMAIL).await? {
        println!("{} {} already exists (id {})", success(), user.email_address, user.id);
        return Ok(());
    }

    let user = users
        .create(SEED_EMAIL, SEED_PASSWORD)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    println!("{} Created {}", success(), user.email_address);
    println!("  {} Password: {}", dim_arrow(), SEED_PASSWORD);
    Ok(())
}
