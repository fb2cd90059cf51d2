use crate::driver::Driver;
use crate::error::SqlMiddlewareDbError;
use crate::executor::ExecuteRequest;
use crate::mssql::{MssqlClient, MssqlOptions, create_mssql_client};
use crate::query_builder::{ExecuteBuilder, TranslationDefaults};
use crate::results::ExecutionResult;
use crate::translation::PlaceholderStyle;
use crate::types::RowValues;

/// Async entry point: one driver connection plus the caller's translation defaults.
///
/// Every call takes `&mut self`, so a client is used by one task at a time.
///
/// # Examples
/// ```rust,no_run
/// use mssql_middleware::prelude::*;
///
/// # async fn demo() -> Result<(), SqlMiddlewareDbError> {
/// let options = MssqlOptions::from_env()?;
/// let mut client = SqlClient::connect(&options).await?;
///
/// let rows = client.query("SELECT @P1 AS val", &[RowValues::Int(1)]).await?;
/// assert_eq!(rows.first_row().and_then(|r| r.get("val")), Some(&RowValues::Int(1)));
///
/// let tuples = vec![vec![RowValues::Int(1)], vec![RowValues::Int(2)]];
/// let summary = client
///     .execute("INSERT INTO t (v) VALUES (@P1)")
///     .params_many(&tuples)
///     .batch_size(500)
///     .run()
///     .await?;
/// assert_eq!(summary.statements, 2);
/// # Ok(())
/// # }
/// ```
pub struct SqlClient<D: Driver = MssqlClient> {
    driver: D,
    defaults: TranslationDefaults,
}

impl SqlClient<MssqlClient> {
    /// Open a SQL Server connection.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::ConnectionError` if the server cannot be reached or
    /// the login fails.
    pub async fn connect(options: &MssqlOptions) -> Result<Self, SqlMiddlewareDbError> {
        let driver = create_mssql_client(options).await?;
        Ok(Self::new(driver)
            .with_translation(options.translate_placeholders, options.placeholder_style))
    }
}

impl<D: Driver> SqlClient<D> {
    /// Wrap an already-open driver. Translation is off by default.
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            defaults: TranslationDefaults {
                enabled: false,
                style: PlaceholderStyle::Pyformat,
            },
        }
    }

    /// Set the default placeholder translation for calls that do not override it.
    #[must_use]
    pub fn with_translation(mut self, enabled: bool, style: PlaceholderStyle) -> Self {
        self.defaults = TranslationDefaults { enabled, style };
        self
    }

    #[must_use]
    pub fn translation_enabled(&self) -> bool {
        self.defaults.enabled
    }

    /// Access the underlying driver, e.g. for transaction statements.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_inner(self) -> D {
        self.driver
    }

    /// Run one statement with one parameter tuple and return its last result set.
    ///
    /// # Errors
    ///
    /// Returns `SqlMiddlewareDbError::ExecutionError` if the driver rejects the
    /// statement, or `Coercion` if a returned value cannot be converted.
    pub async fn query(
        &mut self,
        sql: &str,
        params: &[RowValues],
    ) -> Result<ExecutionResult, SqlMiddlewareDbError> {
        self.execute(sql)
            .params(params)
            .fetch(true)
            .run()
            .await
    }

    /// Start a builder for one statement, optionally over many parameter tuples.
    pub fn execute<'a>(&'a mut self, sql: &'a str) -> ExecuteBuilder<'a, D> {
        ExecuteBuilder::new(
            &mut self.driver,
            self.defaults,
            ExecuteRequest::statement(sql),
        )
    }

    /// Start a builder for independent statements run in order.
    pub fn execute_many<'a, S: AsRef<str>>(
        &'a mut self,
        statements: &'a [S],
    ) -> ExecuteBuilder<'a, D> {
        ExecuteBuilder::new(
            &mut self.driver,
            self.defaults,
            ExecuteRequest::statements(statements),
        )
    }
}
