use std::net::ToSocketAddrs;

use tiberius::{Client, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::TokioAsyncWriteCompatExt;

use super::config::{MssqlClient, MssqlOptions, build_tiberius_config};
use crate::middleware::SqlMiddlewareDbError;

/// Open a new SQL Server connection.
///
/// Named instances are located through the SQL Browser service; a routing
/// redirect from the server (Azure SQL gateways) is followed once.
///
/// # Errors
/// Returns `SqlMiddlewareDbError::ConnectionError` if the MSSQL connection fails.
pub async fn create_mssql_client(opts: &MssqlOptions) -> Result<MssqlClient, SqlMiddlewareDbError> {
    let mut config = build_tiberius_config(opts);

    let tcp = if opts.instance_name.is_some() {
        TcpStream::connect_named(&config).await.map_err(|e| {
            SqlMiddlewareDbError::ConnectionError(format!("SQL Browser lookup failed: {e}"))
        })?
    } else {
        connect_tcp(&opts.server, opts.port_or_default()).await?
    };

    let client = match Client::connect(config.clone(), tcp.compat_write()).await {
        Ok(client) => client,
        Err(tiberius::error::Error::Routing { host, port }) => {
            tracing::info!(%host, port, "SQL Server redirected the connection");
            config.host(&host);
            config.port(port);
            let tcp = connect_tcp(&host, port).await?;
            Client::connect(config, tcp.compat_write())
                .await
                .map_err(|e| {
                    SqlMiddlewareDbError::ConnectionError(format!(
                        "SQL Server connection error: {e}"
                    ))
                })?
        }
        Err(e) => {
            return Err(SqlMiddlewareDbError::ConnectionError(format!(
                "SQL Server connection error: {e}"
            )));
        }
    };

    tracing::info!(
        server = %opts.server,
        database = %opts.database,
        "connected to SQL Server"
    );
    Ok(client)
}

async fn connect_tcp(server: &str, port: u16) -> Result<TcpStream, SqlMiddlewareDbError> {
    let addr_iter = (server, port).to_socket_addrs().map_err(|e| {
        SqlMiddlewareDbError::ConnectionError(format!("Failed to resolve server address: {e}"))
    })?;

    let server_addr = addr_iter.into_iter().next().ok_or_else(|| {
        SqlMiddlewareDbError::ConnectionError(format!("No valid address found for {server}"))
    })?;

    let tcp = TcpStream::connect(server_addr)
        .await
        .map_err(|e| SqlMiddlewareDbError::ConnectionError(format!("TCP connection error: {e}")))?;
    tcp.set_nodelay(true)
        .map_err(|e| SqlMiddlewareDbError::ConnectionError(format!("TCP setup error: {e}")))?;
    Ok(tcp)
}
