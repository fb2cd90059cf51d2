//! Batched execution of one statement over many parameter tuples, or of many
//! independent statements, against any [`Driver`].

mod plan;

use tokio::time::Instant;

pub use plan::{ExecuteOptions, ExecuteRequest, FetchMode, MAX_PARAMS_PER_REQUEST};
use plan::{Plan, plan};

use crate::coercion::coerce_result_set;
use crate::driver::Driver;
use crate::error::{DriverError, ExecutionTarget, SqlMiddlewareDbError};
use crate::results::ExecutionResult;
use crate::translation::expand_batch;
use crate::types::RowValues;

/// One driver request.
struct Dispatch<'a> {
    target: ExecutionTarget,
    index: usize,
    sql: &'a str,
    params: &'a [RowValues],
    /// Statement executions this request covers.
    covers: usize,
    fetch: FetchMode,
}

/// Run a request to completion, one driver call at a time and in input order.
///
/// Parameter tuples are grouped into batches; each batch becomes a single
/// request in which the statement is repeated once per tuple. Without
/// parameters, every statement is its own request.
///
/// # Errors
///
/// Returns `SqlMiddlewareDbError::ConfigError` when the request is invalid (nothing
/// is dispatched in that case), `DeadlineExceeded` when the deadline passes between
/// requests, `ExecutionError` when the driver fails, and `Coercion` when a fetched
/// value cannot be converted. Work completed before a failure is not rolled back.
pub async fn execute<D: Driver + ?Sized>(
    driver: &mut D,
    request: &ExecuteRequest<'_>,
) -> Result<ExecutionResult, SqlMiddlewareDbError> {
    let plan = plan(request)?;
    let options = request.options;
    let total = plan.batch_count();
    let mut result = ExecutionResult::default();

    match plan {
        Plan::Parameterized {
            sql,
            tuples,
            width,
            batch_size,
        } => {
            for (index, chunk) in tuples.chunks(batch_size).enumerate() {
                check_deadline(options.deadline, ExecutionTarget::Batch, index)?;
                let batch_sql = expand_batch(sql, chunk.len(), width);
                let params: Vec<RowValues> = chunk.iter().flatten().cloned().collect();
                let step = Dispatch {
                    target: ExecutionTarget::Batch,
                    index,
                    sql: &batch_sql,
                    params: &params,
                    covers: chunk.len(),
                    fetch: fetch_for(options.fetch, index + 1 == total),
                };
                dispatch(driver, step, &mut result).await?;
            }
        }
        Plan::Statements { statements } => {
            for (index, sql) in statements.iter().enumerate() {
                check_deadline(options.deadline, ExecutionTarget::Statement, index)?;
                let step = Dispatch {
                    target: ExecutionTarget::Statement,
                    index,
                    sql: sql.as_ref(),
                    params: &[],
                    covers: 1,
                    fetch: fetch_for(options.fetch, index + 1 == total),
                };
                dispatch(driver, step, &mut result).await?;
            }
        }
    }

    Ok(result)
}

/// `Last` only fetches on the final request; earlier ones just execute.
fn fetch_for(requested: FetchMode, is_last: bool) -> FetchMode {
    match requested {
        FetchMode::Last if !is_last => FetchMode::None,
        other => other,
    }
}

fn check_deadline(
    deadline: Option<Instant>,
    target: ExecutionTarget,
    index: usize,
) -> Result<(), SqlMiddlewareDbError> {
    if let Some(deadline) = deadline
        && Instant::now() >= deadline
    {
        tracing::warn!(kind = %target, index, "deadline expired, aborting remaining work");
        return Err(SqlMiddlewareDbError::DeadlineExceeded { target, index });
    }
    Ok(())
}

async fn dispatch<D: Driver + ?Sized>(
    driver: &mut D,
    step: Dispatch<'_>,
    result: &mut ExecutionResult,
) -> Result<(), SqlMiddlewareDbError> {
    tracing::debug!(
        kind = %step.target,
        index = step.index,
        statements = step.covers,
        params = step.params.len(),
        fetch = ?step.fetch,
        "dispatching"
    );

    let fail = |err: DriverError| {
        tracing::warn!(kind = %step.target, index = step.index, error = %err, "execution failed");
        SqlMiddlewareDbError::execution(step.target, step.index, step.sql, err)
    };

    match step.fetch {
        FetchMode::None => {
            result.rows_affected += driver.execute(step.sql, step.params).await.map_err(fail)?;
        }
        FetchMode::Last => {
            let raw_sets = driver.query(step.sql, step.params).await.map_err(fail)?;
            if let Some(last) = raw_sets.last() {
                result.result_sets.push(coerce_result_set(last)?);
            }
        }
        FetchMode::All => {
            let raw_sets = driver.query(step.sql, step.params).await.map_err(fail)?;
            for raw in &raw_sets {
                result.result_sets.push(coerce_result_set(raw)?);
            }
        }
    }

    result.batches += 1;
    result.statements += step.covers;
    Ok(())
}
