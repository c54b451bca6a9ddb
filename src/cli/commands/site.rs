//! Site listing command.

use console::style;

use asap_pdf::config::Settings;
use asap_pdf::utils::short_number;
use crate::cli::icons::warn;

pub async fn cmd_site_list(settings: &Settings) -> anyhow::Result<()> {
    let ctx = settings.create_db_context()?;
    let sites = ctx.sites().list_all().await?;

    if sites.is_empty() {
        println!("{} No sites configured", warn());
        return Ok(());
    }

    println!(
        "{:<6} {:<32} {:<24} {:>9}  {}",
        style("ID").bold(),
        style("NAME").bold(),
        style("LOCATION").bold(),
        style("DOCUMENTS").bold(),
        style("URL").bold()
    );
    for site in sites {
        let count = ctx.documents().count_for_site(site.id).await?;
        println!(
            "{:<6} {:<32} {:<24} {:>9}  {}",
            site.id,
            site.name,
            site.location,
            short_number(count),
            site.primary_url
        );
    }
    Ok(())
}
