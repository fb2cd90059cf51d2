use std::borrow::Cow;

use tokio::time::Instant;

use crate::driver::Driver;
use crate::error::SqlMiddlewareDbError;
use crate::executor::{self, ExecuteOptions, ExecuteRequest};
use crate::results::ExecutionResult;
use crate::translation::{PlaceholderStyle, TranslationMode};
use crate::types::RowValues;

/// A client's placeholder translation defaults, applied when a call leaves
/// translation at `TranslationMode::ClientDefault`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TranslationDefaults {
    pub(crate) enabled: bool,
    pub(crate) style: PlaceholderStyle,
}

/// Fluent builder for batched execution with optional placeholder translation.
///
/// Created by `SqlClient::execute` or `SqlClient::execute_many`; nothing is sent
/// until [`run`](Self::run) is awaited.
pub struct ExecuteBuilder<'a, D: Driver + ?Sized> {
    driver: &'a mut D,
    defaults: TranslationDefaults,
    request: ExecuteRequest<'a>,
}

impl<'a, D: Driver + ?Sized> ExecuteBuilder<'a, D> {
    pub(crate) fn new(
        driver: &'a mut D,
        defaults: TranslationDefaults,
        request: ExecuteRequest<'a>,
    ) -> Self {
        Self {
            driver,
            defaults,
            request,
        }
    }

    /// Bind a single parameter tuple.
    #[must_use]
    pub fn params(mut self, params: &'a [RowValues]) -> Self {
        self.request.params = Some(Cow::Owned(vec![params.to_vec()]));
        self
    }

    /// Execute the statement once per tuple, grouped into batches.
    #[must_use]
    pub fn params_many(mut self, params: &'a [Vec<RowValues>]) -> Self {
        self.request.params = Some(Cow::Borrowed(params));
        self
    }

    /// Fetch the last result set of the final batch or statement.
    #[must_use]
    pub fn fetch(mut self, fetch: bool) -> Self {
        self.request.options = self.request.options.fetch(fetch);
        self
    }

    /// Fetch every result set of every batch or statement.
    #[must_use]
    pub fn fetch_all(mut self) -> Self {
        self.request.options = self.request.options.fetch_all();
        self
    }

    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.request.options = self.request.options.batch_size(batch_size);
        self
    }

    /// Stop dispatching once `deadline` has passed.
    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.request.options = self.request.options.deadline(deadline);
        self
    }

    /// Override translation mode directly.
    #[must_use]
    pub fn translation(mut self, translation: TranslationMode) -> Self {
        self.request.options = self.request.options.translation(translation);
        self
    }

    /// Replace all options at once.
    #[must_use]
    pub fn options(mut self, options: ExecuteOptions) -> Self {
        self.request.options = options;
        self
    }

    /// Run the request.
    ///
    /// # Errors
    ///
    /// See [`executor::execute`].
    pub async fn run(self) -> Result<ExecutionResult, SqlMiddlewareDbError> {
        let ExecuteBuilder {
            driver,
            defaults,
            request,
        } = self;
        let request = if request.options.translation.resolve(defaults.enabled) {
            request.translated(defaults.style)
        } else {
            request
        };
        executor::execute(driver, &request).await
    }
}
