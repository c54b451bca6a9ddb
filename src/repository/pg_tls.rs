//! rustls-backed TLS for PostgreSQL connections.
//!
//! Used by the diesel-async pool and by the raw migration client. TLS is on
//! unless `--no-tls` / `ASAP_NO_TLS=1` is given.

use diesel::ConnectionError;
use diesel_async::AsyncPgConnection;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use rustls::ClientConfig;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::{error, warn};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn build_rustls_config() -> Result<ClientConfig, BoxError> {
    let result = rustls_native_certs::load_native_certs();
    for e in &result.errors {
        warn!("Error loading system certificates: {}", e);
    }

    let mut roots = rustls::RootCertStore::empty();
    let (added, ignored) = roots.add_parsable_certificates(result.certs);
    if ignored > 0 {
        warn!("Skipped {} invalid system certificates", ignored);
    }
    if added == 0 {
        return Err("no valid system certificates found".into());
    }

    Ok(ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth())
}

fn make_tls_connector() -> Result<MakeRustlsConnect, BoxError> {
    Ok(MakeRustlsConnect::new(build_rustls_config()?))
}

/// `custom_setup` hook for the pool manager.
pub fn establish_tls_connection(
    url: &str,
) -> BoxFuture<'_, diesel::ConnectionResult<AsyncPgConnection>> {
    async move {
        let tls = make_tls_connector()
            .map_err(|e| ConnectionError::BadConnection(format!("TLS setup failed: {}", e)))?;
        let (client, conn) = tokio_postgres::connect(url, tls)
            .await
            .map_err(|e| ConnectionError::BadConnection(e.to_string()))?;
        AsyncPgConnection::try_from_client_and_connection(client, conn).await
    }
    .boxed()
}

/// Connect a raw client and drive its connection on a background task.
pub async fn connect_raw(url: &str, no_tls: bool) -> Result<tokio_postgres::Client, BoxError> {
    if no_tls {
        let (client, connection) = tokio_postgres::connect(url, tokio_postgres::NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });
        Ok(client)
    } else {
        let (client, connection) = tokio_postgres::connect(url, make_tls_connector()?).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });
        Ok(client)
    }
}
