//! Initialize and migrate commands.

use console::style;

use asap_pdf::config::Settings;
use asap_pdf::repository::migrations::applied_migrations;
use crate::cli::icons::{error, info, success};

/// Initialize the data directory and database.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context()?;
    let applied = ctx.init_schema().await?;
    for name in &applied {
        println!("  {} Applied {}", success(), name);
    }

    println!(
        "{} Initialized asap-pdf in {}",
        success(),
        settings.data_dir.display()
    );
    println!(
        "  {} Add a user with {}",
        style("→").dim(),
        style("asap-pdf user add EMAIL --password PASSWORD").bold()
    );

    Ok(())
}

/// Apply pending migrations and report what ran.
pub async fn cmd_migrate(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    println!("{} Running database migrations...", info());

    let ctx = settings.create_db_context()?;
    match ctx.init_schema().await {
        Ok(applied) if applied.is_empty() => {
            println!("  {} Database already up to date", success());
        }
        Ok(applied) => {
            for name in &applied {
                println!("  {} Applied {}", success(), name);
            }
        }
        Err(e) => {
            eprintln!("  {} Migration failed: {}", error(), e);
            return Err(anyhow::anyhow!("Database migration failed: {}", e));
        }
    }

    let recorded = applied_migrations(&settings.database_url(), settings.no_tls).await?;
    println!(
        "  {} {} migrations recorded",
        style("→").dim(),
        recorded.len()
    );
    Ok(())
}
