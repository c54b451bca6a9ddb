//! Configuration inspection commands.

use console::style;

use asap_pdf::config::{Config, Settings};
use asap_pdf::repository::util::redact_url_password;
use crate::cli::icons::{dim_arrow, warn};

/// Print the effective settings, with credentials redacted.
pub fn cmd_config_show(settings: &Settings, config: &Config) -> anyhow::Result<()> {
    println!("{}", style("Settings").bold());
    println!("  data_dir:          {}", settings.data_dir.display());
    println!("  database:          {}", redact_url_password(&settings.database_url()));
    println!("  bind:              {}", settings.bind);
    println!("  trust proxy:       {}", settings.trust_proxy_headers);
    println!("  inference model:   {}", settings.inference.model);
    println!("  inference url:     {}", settings.inference.endpoint);
    println!("  inference config:  {}", settings.inference_config_path.display());
    println!("  inference models:  {}", settings.inference_models_path.display());
    match settings.storage {
        Some(ref storage) => println!("  storage:           {}", storage.describe()),
        None => println!("  storage:           {}", style("not configured").dim()),
    }

    match config.source_path {
        Some(ref path) => println!(
            "  {} from {} ({})",
            dim_arrow(),
            path.display(),
            &config.hash()[..16]
        ),
        None => println!("  {} no config file; defaults in use", dim_arrow()),
    }
    Ok(())
}

pub fn cmd_config_path(config: &Config) -> anyhow::Result<()> {
    match config.source_path {
        Some(ref path) => println!("{}", path.display()),
        None => eprintln!("{} No config file found", warn()),
    }
    Ok(())
}
