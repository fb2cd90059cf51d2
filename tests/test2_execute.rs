use mssql_middleware::middleware::{
    DriverError, ExecuteOptions, ExecuteRequest, ExecutionTarget, RowValues, SqlMiddlewareDbError,
};
use mssql_middleware::test_utils::{CallKind, MockDriver};
use mssql_middleware::{SqlClient, executor};
use tokio::time::{Duration, Instant};

fn triples(count: i64) -> Vec<Vec<RowValues>> {
    (0..count)
        .map(|val| {
            vec![
                RowValues::Int(val),
                RowValues::Int(val + 1),
                RowValues::Int(val + 2),
            ]
        })
        .collect()
}

#[tokio::test]
async fn test_execute_without_fetch() -> Result<(), SqlMiddlewareDbError> {
    let mut client = SqlClient::new(MockDriver::new());

    let result = client.execute("CREATE TABLE #temp (val int)").run().await?;
    assert!(result.result_sets.is_empty());
    assert_eq!(result.batches, 1);
    assert_eq!(result.statements, 1);

    // rows are never fetched when not asked for, even from a SELECT
    let result = client.execute("SELECT 'hello' col").run().await?;
    assert!(!result.has_rows());
    assert_eq!(client.into_inner().calls()[1].kind, CallKind::Execute);
    Ok(())
}

#[tokio::test]
async fn test_execute_with_fetch() -> Result<(), SqlMiddlewareDbError> {
    let mut client = SqlClient::new(MockDriver::new());
    let result = client.execute("SELECT 'hello' col").fetch(true).run().await?;
    assert_eq!(
        result.first_row().and_then(|r| r.get("col")),
        Some(&RowValues::Text("hello".into()))
    );
    Ok(())
}

#[tokio::test]
async fn test_execute_many_tuples_in_one_batch() -> Result<(), SqlMiddlewareDbError> {
    let mut client = SqlClient::new(MockDriver::new());
    let tuples = vec![
        vec![RowValues::Int(1)],
        vec![RowValues::Int(2)],
        vec![RowValues::Int(3)],
    ];

    let result = client
        .execute("SELECT @P1 val")
        .params_many(&tuples)
        .fetch_all()
        .run()
        .await?;

    assert_eq!(result.batches, 1);
    assert_eq!(result.statements, 3);
    let vals: Vec<_> = result
        .result_sets
        .iter()
        .map(|set| set.results[0].get("val").cloned())
        .collect();
    assert_eq!(
        vals,
        [1, 2, 3].map(|v| Some(RowValues::Int(v))).to_vec()
    );

    let driver = client.into_inner();
    let call = &driver.calls()[0];
    assert_eq!(call.sql, "SELECT @P1 val;\nSELECT @P2 val;\nSELECT @P3 val");
    assert_eq!(call.params.len(), 3);
    Ok(())
}

#[tokio::test]
async fn test_execute_batched() -> Result<(), SqlMiddlewareDbError> {
    let mut client = SqlClient::new(MockDriver::new());
    let tuples = triples(1000);

    let result = client
        .execute("SELECT @P1 a, @P2 b, @P3 c")
        .params_many(&tuples)
        .batch_size(500)
        .run()
        .await?;

    assert_eq!(result.batches, 2);
    assert_eq!(result.statements, 1000);
    assert_eq!(result.rows_affected, 1000);

    let driver = client.into_inner();
    assert_eq!(driver.call_count(), 2);
    assert!(driver.calls().iter().all(|call| call.params.len() == 1500));
    assert!(driver.calls()[1].sql.ends_with("SELECT @P1498 a, @P1499 b, @P1500 c"));
    assert_eq!(driver.calls()[1].params[0], RowValues::Int(500));
    Ok(())
}

#[tokio::test]
async fn uneven_batches_round_up() -> Result<(), SqlMiddlewareDbError> {
    for (count, batch_size) in [(10, 3), (9, 3), (1, 5), (7, 1)] {
        let mut client = SqlClient::new(MockDriver::new());
        let tuples: Vec<Vec<RowValues>> = (0..count).map(|v| vec![RowValues::Int(v)]).collect();
        let result = client
            .execute("SELECT @P1 v")
            .params_many(&tuples)
            .batch_size(batch_size)
            .run()
            .await?;
        let expected = usize::try_from(count).unwrap().div_ceil(batch_size);
        assert_eq!(result.batches, expected, "{count} tuples / {batch_size}");
        assert_eq!(client.into_inner().call_count(), expected);
    }
    Ok(())
}

#[tokio::test]
async fn default_batch_size_stays_under_parameter_limit() -> Result<(), SqlMiddlewareDbError> {
    let mut client = SqlClient::new(MockDriver::new());
    let tuples = triples(1000);

    let result = client
        .execute("INSERT INTO #t (a, b, c) VALUES (@P1, @P2, @P3)")
        .params_many(&tuples)
        .run()
        .await?;

    assert_eq!(result.batches, 2);
    let driver = client.into_inner();
    assert!(driver.calls().iter().all(|call| call.params.len() <= 2100));
    Ok(())
}

#[tokio::test]
async fn test_execute_many_operations() -> Result<(), SqlMiddlewareDbError> {
    let mut client = SqlClient::new(MockDriver::new());
    let statements: Vec<String> = (0..1000).map(|val| format!("SELECT {val} val")).collect();

    let result = client.execute_many(&statements).fetch(true).run().await?;

    assert_eq!(result.result_sets.len(), 1);
    assert_eq!(result.data().len(), 1);
    assert_eq!(
        result.first_row().and_then(|r| r.get("val")),
        Some(&RowValues::Int(999))
    );
    assert_eq!(result.batches, 1000);

    let driver = client.into_inner();
    let queries = driver
        .calls()
        .iter()
        .filter(|call| call.kind == CallKind::Query)
        .count();
    assert_eq!(queries, 1);
    Ok(())
}

#[tokio::test]
async fn rows_affected_counts_only_unfetched_requests() -> Result<(), SqlMiddlewareDbError> {
    let statements = ["SELECT 1 a", "SELECT 2 b", "SELECT 3 c"];

    let mut client = SqlClient::new(MockDriver::new());
    let plain = client.execute_many(&statements).run().await?;
    let last = client.execute_many(&statements).fetch(true).run().await?;
    let all = client.execute_many(&statements).fetch_all().run().await?;

    assert_eq!(plain.rows_affected, 3);
    // the final request fetches, so only the first two count
    assert_eq!(last.rows_affected, 2);
    assert_eq!(all.rows_affected, 0);
    for result in [&plain, &last, &all] {
        assert_eq!(result.batches, 3);
        assert_eq!(result.statements, 3);
    }
    Ok(())
}

#[tokio::test]
async fn fetch_all_keeps_every_result_set_in_order() -> Result<(), SqlMiddlewareDbError> {
    let mut client = SqlClient::new(MockDriver::new());
    let statements = ["SELECT 1 a", "CREATE TABLE #t (v int)", "SELECT 2 b"];

    let result = client.execute_many(&statements).fetch_all().run().await?;

    assert_eq!(result.result_sets.len(), 2);
    assert_eq!(result.result_sets[0].get_column_names().unwrap()[0], "a");
    assert_eq!(result.columns(), ["b"]);
    Ok(())
}

#[tokio::test]
async fn zero_batch_size_dispatches_nothing() {
    let mut client = SqlClient::new(MockDriver::new());
    let tuples = triples(3);

    let err = client
        .execute("SELECT @P1 a, @P2 b, @P3 c")
        .params_many(&tuples)
        .batch_size(0)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, SqlMiddlewareDbError::ConfigError(_)));
    assert_eq!(client.into_inner().call_count(), 0);
}

#[tokio::test]
async fn empty_tuple_list_executes_nothing() -> Result<(), SqlMiddlewareDbError> {
    let mut client = SqlClient::new(MockDriver::new());
    let tuples: Vec<Vec<RowValues>> = Vec::new();

    let result = client
        .execute("SELECT @P1 v")
        .params_many(&tuples)
        .fetch(true)
        .run()
        .await?;

    assert_eq!(result.batches, 0);
    assert!(result.result_sets.is_empty());
    assert_eq!(client.into_inner().call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn failure_aborts_and_reports_the_batch() {
    let driver = MockDriver::new().failing_at(
        2,
        DriverError::Server {
            code: 2627,
            state: 1,
            message: "Violation of PRIMARY KEY constraint".into(),
        },
    );
    let mut client = SqlClient::new(driver);
    let tuples: Vec<Vec<RowValues>> = (0..10).map(|v| vec![RowValues::Int(v)]).collect();

    let err = client
        .execute("INSERT INTO t (id) VALUES (@P1)")
        .params_many(&tuples)
        .batch_size(2)
        .run()
        .await
        .unwrap_err();

    match &err {
        SqlMiddlewareDbError::ExecutionError {
            target,
            index,
            statement,
            ..
        } => {
            assert_eq!(*target, ExecutionTarget::Batch);
            assert_eq!(*index, 2);
            assert!(statement.starts_with("INSERT INTO t"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(matches!(
        err.driver_error(),
        Some(DriverError::Server { code: 2627, .. })
    ));
    // batches after the failing one were never sent
    assert_eq!(client.into_inner().call_count(), 3);
}

#[tokio::test]
async fn failing_statement_is_reported_by_index() {
    let driver = MockDriver::new().failing_at(1, DriverError::Io("connection reset".into()));
    let mut client = SqlClient::new(driver);

    let err = client
        .execute_many(&["SELECT 1 a", "SELECT 2 b", "SELECT 3 c"])
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SqlMiddlewareDbError::ExecutionError {
            target: ExecutionTarget::Statement,
            index: 1,
            ..
        }
    ));
    assert!(err.to_string().contains("statement 1"));
}

#[tokio::test]
async fn expired_deadline_stops_before_dispatch() {
    let mut client = SqlClient::new(MockDriver::new());

    let err = client
        .execute_many(&["SELECT 1 a", "SELECT 2 b"])
        .deadline(Instant::now())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SqlMiddlewareDbError::DeadlineExceeded { index: 0, .. }
    ));
    assert_eq!(client.into_inner().call_count(), 0);
}

#[tokio::test]
async fn distant_deadline_does_not_interfere() -> Result<(), SqlMiddlewareDbError> {
    let mut client = SqlClient::new(MockDriver::new());
    let result = client
        .execute_many(&["SELECT 1 a", "SELECT 2 b"])
        .deadline(Instant::now() + Duration::from_secs(60))
        .run()
        .await?;
    assert_eq!(result.batches, 2);
    Ok(())
}

#[tokio::test]
async fn executor_runs_against_a_bare_driver() -> Result<(), SqlMiddlewareDbError> {
    let mut driver = MockDriver::new();
    let tuples = vec![vec![RowValues::Int(7)]];
    let request = ExecuteRequest::parameterized("SELECT @P1 v", &tuples)
        .with_options(ExecuteOptions::default().fetch(true));

    let result = executor::execute(&mut driver, &request).await?;
    assert_eq!(
        result.first_row().and_then(|r| r.get("v")),
        Some(&RowValues::Int(7))
    );
    Ok(())
}

#[tokio::test]
async fn params_with_several_statements_are_rejected() {
    let mut client = SqlClient::new(MockDriver::new());
    let err = client
        .execute_many(&["SELECT @P1 a", "SELECT @P1 b"])
        .params(&[RowValues::Int(1)])
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, SqlMiddlewareDbError::ConfigError(_)));
}
