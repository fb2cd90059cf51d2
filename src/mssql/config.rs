use tiberius::{AuthMethod, Config as TiberiusConfig};
use tokio::net::TcpStream;
use tokio_util::compat::Compat;

use crate::middleware::SqlMiddlewareDbError;
use crate::translation::PlaceholderStyle;

/// Type alias for SQL Server client
pub type MssqlClient = tiberius::Client<Compat<TcpStream>>;

const DEFAULT_PORT: u16 = 1433;

/// Options for connecting to SQL Server.
#[derive(Debug, Clone)]
pub struct MssqlOptions {
    pub server: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub port: Option<u16>,
    pub instance_name: Option<String>,
    /// Accept the server certificate without validation.
    pub trust_cert: bool,
    /// Translate `placeholder_style` markers into `@Pn` by default.
    pub translate_placeholders: bool,
    pub placeholder_style: PlaceholderStyle,
}

impl MssqlOptions {
    #[must_use]
    pub fn new(server: String, database: String, user: String, password: String) -> Self {
        Self {
            server,
            database,
            user,
            password,
            port: None,
            instance_name: None,
            trust_cert: true,
            translate_placeholders: false,
            placeholder_style: PlaceholderStyle::Pyformat,
        }
    }

    /// Read connection details from `MSSQL_SERVER`, `MSSQL_DATABASE`, `MSSQL_USER`,
    /// `MSSQL_PASSWORD` and the optional `MSSQL_PORT`, `MSSQL_INSTANCE`, `MSSQL_TRUST_CERT`.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::ConfigError` if a required variable is missing or
    /// an optional one cannot be parsed.
    pub fn from_env() -> Result<Self, SqlMiddlewareDbError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SqlMiddlewareDbError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| SqlMiddlewareDbError::ConfigError(format!("{key} is not set")))
        };

        let mut opts = Self::new(
            required("MSSQL_SERVER")?,
            required("MSSQL_DATABASE")?,
            required("MSSQL_USER")?,
            required("MSSQL_PASSWORD")?,
        );

        if let Some(port) = lookup("MSSQL_PORT") {
            let port = port.parse::<u16>().map_err(|e| {
                SqlMiddlewareDbError::ConfigError(format!("MSSQL_PORT `{port}` is invalid: {e}"))
            })?;
            opts.port = Some(port);
        }
        opts.instance_name = lookup("MSSQL_INSTANCE").filter(|v| !v.is_empty());
        if let Some(flag) = lookup("MSSQL_TRUST_CERT") {
            opts.trust_cert = parse_flag("MSSQL_TRUST_CERT", &flag)?;
        }

        Ok(opts)
    }

    #[must_use]
    pub fn with_translation(mut self, translate_placeholders: bool) -> Self {
        self.translate_placeholders = translate_placeholders;
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_instance_name(mut self, instance_name: Option<String>) -> Self {
        self.instance_name = instance_name;
        self
    }

    /// Port to connect to, defaulting to 1433.
    #[must_use]
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, SqlMiddlewareDbError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(SqlMiddlewareDbError::ConfigError(format!(
            "{key} `{other}` is not a boolean"
        ))),
    }
}

/// Fluent builder for MSSQL options.
#[derive(Debug, Clone)]
pub struct MssqlOptionsBuilder {
    opts: MssqlOptions,
}

impl MssqlOptionsBuilder {
    #[must_use]
    pub fn new(server: String, database: String, user: String, password: String) -> Self {
        Self {
            opts: MssqlOptions::new(server, database, user, password),
        }
    }

    #[must_use]
    pub fn translation(mut self, translate_placeholders: bool) -> Self {
        self.opts.translate_placeholders = translate_placeholders;
        self
    }

    #[must_use]
    pub fn placeholder_style(mut self, style: PlaceholderStyle) -> Self {
        self.opts.placeholder_style = style;
        self
    }

    #[must_use]
    pub fn port(mut self, port: Option<u16>) -> Self {
        self.opts.port = port;
        self
    }

    #[must_use]
    pub fn instance_name(mut self, instance_name: Option<String>) -> Self {
        self.opts.instance_name = instance_name;
        self
    }

    #[must_use]
    pub fn trust_cert(mut self, trust_cert: bool) -> Self {
        self.opts.trust_cert = trust_cert;
        self
    }

    #[must_use]
    pub fn finish(self) -> MssqlOptions {
        self.opts
    }
}

pub(crate) fn build_tiberius_config(opts: &MssqlOptions) -> TiberiusConfig {
    let mut config = TiberiusConfig::new();
    config.host(&opts.server);
    config.database(&opts.database);
    config.port(opts.port_or_default());
    config.authentication(AuthMethod::sql_server(&opts.user, &opts.password));
    if let Some(instance) = &opts.instance_name {
        config.instance_name(instance);
    }
    if opts.trust_cert {
        config.trust_cert();
    }
    config
}
