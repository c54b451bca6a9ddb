//! Web server command.

use asap_pdf::config::Settings;
use crate::cli::icons::{error, info, success};

const DEFAULT_PORT: u16 = 3000;

/// Start the web server.
pub async fn cmd_serve(settings: &Settings, bind: &str, no_migrate: bool) -> anyhow::Result<()> {
    let (host, port) = parse_bind_address(bind)?;

    if !no_migrate {
        settings.ensure_directories()?;
        println!("{} Running database migrations...", info());
        let ctx = settings.create_db_context()?;
        match ctx.init_schema().await {
            Ok(_) => println!("  {} Database ready", success()),
            Err(e) => {
                eprintln!("  {} Migration failed: {}", error(), e);
                return Err(anyhow::anyhow!("Database migration failed: {}", e));
            }
        }
    }

    println!("{} Starting asap-pdf at http://{}:{}", info(), host, port);
    println!("  Press Ctrl+C to stop");

    asap_pdf::server::serve(settings, &host, port).await
}

/// Parse a bind address that can be:
/// - Just a port: "3000" -> 127.0.0.1:3000
/// - Just a host: "0.0.0.0" -> 0.0.0.0:3000
/// - Host and port: "0.0.0.0:3000" -> 0.0.0.0:3000
fn parse_bind_address(bind: &str) -> anyhow::Result<(String, u16)> {
    if let Ok(port) = bind.parse::<u16>() {
        return Ok(("127.0.0.1".to_string(), port));
    }

    if let Some((host, port_str)) = bind.rsplit_once(':') {
        if let Ok(port) = port_str.parse::<u16>() {
            return Ok((host.to_string(), port));
        }
        anyhow::bail!("Invalid port in bind address: {}", bind);
    }

    Ok((bind.to_string(), DEFAULT_PORT))
}
