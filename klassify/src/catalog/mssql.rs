//! SQL Server implementation of `SchemaSource` on top of tiberius

use async_trait::async_trait;
use tiberius::{AuthMethod, Client, Config, EncryptionLevel, Query, SqlBrowser};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

use super::{SchemaSource, TableName};
use crate::config::{defaults, Configuration};
use crate::error::{KlassifyError, Result};

type TdsClient = Client<Compat<TcpStream>>;

/// Catalog filtered to base tables. No ORDER BY: callers get the catalog's own order.
const BASE_TABLES_QUERY: &str = "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES \
     WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_CATALOG = @P1";

/// Host, port and instance parsed from the `server` setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
    /// Named instance, resolved through the SQL Browser at connect time
    pub instance: Option<String>,
}

impl ServerAddress {
    /// Parse `host`, `host,port`, `host\instance`, optionally prefixed with `tcp:`.
    ///
    /// `.` and `(local)` mean localhost. An explicit port wins over an instance name.
    pub fn parse(server: &str) -> Result<Self> {
        let server = server.trim();
        let server = match server.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("tcp:") => &server[4..],
            _ => server,
        };

        let (host, port) = match server.split_once(',') {
            Some((host, port)) => {
                let port = port.trim().parse::<u16>().map_err(|_| {
                    KlassifyError::ConfigError(format!("Invalid port in server: {}", server))
                })?;
                (host.trim(), Some(port))
            }
            None => (server, None),
        };

        let (host, instance) = match host.split_once('\\') {
            Some((host, instance)) => {
                let instance = instance.trim();
                if instance.is_empty() {
                    return Err(KlassifyError::ConfigError(format!(
                        "Missing instance name in server: {}",
                        server
                    )));
                }
                (host.trim(), Some(instance))
            }
            None => (host, None),
        };

        let host = match host {
            "" | "." | "(local)" => defaults::SERVER,
            other => other,
        };

        Ok(Self {
            host: host.to_string(),
            port: port.unwrap_or(defaults::PORT),
            instance: match port {
                Some(_) => None,
                None => instance.map(str::to_string),
            },
        })
    }
}

impl std::fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.instance {
            Some(instance) => write!(f, "{}\\{}", self.host, instance),
            None => write!(f, "{}:{}", self.host, self.port),
        }
    }
}

/// One TDS connection, opened once and reused for every query of the run
pub struct MssqlSource {
    client: Option<TdsClient>,
}

impl MssqlSource {
    /// Connect and log in, bounded by the configured connect timeout.
    pub async fn connect(config: &Configuration) -> Result<Self> {
        let address = ServerAddress::parse(&config.server)?;
        let tds = build_config(config, &address)?;

        let client = match config.connect_timeout() {
            Some(limit) => tokio::time::timeout(limit, open(tds)).await.map_err(|_| {
                KlassifyError::ConnectionError(format!(
                    "Timed out after {}s connecting to {}",
                    config.connection_timeout_secs, address
                ))
            })?,
            None => open(tds).await,
        }
        .map_err(connection_error)?;

        info!("Connected to SQL Server: {}/{}", address, config.database);
        Ok(Self {
            client: Some(client),
        })
    }

    fn client(&mut self) -> Result<&mut TdsClient> {
        self.client
            .as_mut()
            .ok_or_else(|| KlassifyError::ConnectionError("Connection already closed".into()))
    }
}

#[async_trait]
impl SchemaSource for MssqlSource {
    async fn list_base_tables(&mut self, database: &str) -> Result<Vec<TableName>> {
        let client = self.client()?;

        let mut query = Query::new(BASE_TABLES_QUERY);
        query.bind(database);

        let rows = query
            .query(client)
            .await
            .map_err(connection_error)?
            .into_first_result()
            .await
            .map_err(connection_error)?;

        let mut tables = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(name) = row.try_get::<&str, _>(0).map_err(connection_error)? {
                tables.push(TableName::from(name));
            }
        }

        debug!("Catalog {} has {} base tables", database, tables.len());
        Ok(tables)
    }

    async fn query_scalar(&mut self, batch: &str, table: &TableName) -> Result<Option<String>> {
        let client = self.client()?;

        let mut query = Query::new(batch);
        query.bind(table.as_str());

        let stream = query.query(client).await.map_err(|e| classify(e, table))?;
        let row = stream.into_row().await.map_err(|e| classify(e, table))?;

        match row {
            Some(row) => row
                .try_get::<&str, _>(0)
                .map(|value| value.map(str::to_owned))
                .map_err(|e| classify(e, table)),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.close().await.map_err(connection_error)?;
            debug!("Connection closed");
        }
        Ok(())
    }
}

fn build_config(config: &Configuration, address: &ServerAddress) -> Result<Config> {
    let mut tds = Config::new();
    tds.host(&address.host);
    tds.port(address.port);
    if let Some(instance) = &address.instance {
        tds.instance_name(instance);
    }
    tds.database(&config.database);
    tds.application_name(env!("CARGO_PKG_NAME"));

    match &config.credentials {
        Some(credentials) => {
            tds.authentication(AuthMethod::sql_server(
                &credentials.user_id,
                &credentials.password,
            ));
        }
        None => use_integrated_auth(&mut tds)?,
    }

    // Encrypted, but the server certificate is not validated.
    tds.trust_cert();
    tds.encryption(EncryptionLevel::Required);

    Ok(tds)
}

#[cfg(any(windows, feature = "integrated-auth"))]
fn use_integrated_auth(tds: &mut Config) -> Result<()> {
    debug!("No user/password configured, using integrated authentication");
    tds.authentication(AuthMethod::Integrated);
    Ok(())
}

#[cfg(not(any(windows, feature = "integrated-auth")))]
fn use_integrated_auth(_tds: &mut Config) -> Result<()> {
    Err(KlassifyError::ConnectionError(
        "No user/password configured and integrated authentication is not available \
         in this build (enable the `integrated-auth` feature)"
            .into(),
    ))
}

/// TCP connect plus login, following at most one server redirect.
///
/// The first attempt goes through the SQL Browser when an instance name is set.
/// A redirect names its target host and port directly.
async fn open(mut tds: Config) -> tiberius::Result<TdsClient> {
    let mut redirected = false;
    loop {
        let tcp = if redirected {
            TcpStream::connect(tds.get_addr())
                .await
                .map_err(|e| tiberius::error::Error::Io {
                    kind: e.kind(),
                    message: e.to_string(),
                })?
        } else {
            TcpStream::connect_named(&tds).await?
        };
        tcp.set_nodelay(true).ok();

        match Client::connect(tds.clone(), tcp.compat_write()).await {
            Err(tiberius::error::Error::Routing { host, port }) if !redirected => {
                debug!("Server redirected connection to {}:{}", host, port);
                tds.host(&host);
                tds.port(port);
                redirected = true;
            }
            result => return result,
        }
    }
}

fn connection_error(err: tiberius::error::Error) -> KlassifyError {
    KlassifyError::ConnectionError(err.to_string())
}

/// Server errors and result conversion failures stay with the table; anything
/// else means the connection is gone.
fn classify(err: tiberius::error::Error, table: &TableName) -> KlassifyError {
    match err {
        tiberius::error::Error::Server(_) | tiberius::error::Error::Conversion(_) => {
            KlassifyError::generation(table.as_str(), err)
        }
        other => connection_error(other),
    }
}
