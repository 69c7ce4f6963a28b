//! Multi-location, multi-day retrieval of aligned turning-movement counts.
//!
//! One query is issued per (location, day). Queries run concurrently on the
//! tokio runtime, bounded by a semaphore; each attempt has a deadline and
//! transient failures are retried with exponential backoff. A failed
//! (location, day) is recorded and skipped, never aborting the batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{Instrument, debug, info, warn};

use crate::align::{DropCounts, align};
use crate::config::ClientConfig;
use crate::error::{FailureKind, ReportError};
use crate::flatten::{FlattenIssue, FlattenedReport, flatten};
use crate::records::AlignedSample;
use crate::report::{ReportClient, ReportDocument, ReportQuery};

/// Signals and inclusive date range to retrieve.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TmcRequest {
    pub location_ids: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub bin_size_minutes: u32,
}

impl TmcRequest {
    /// One query per (location, day), locations outermost.
    pub fn queries(&self) -> Result<Vec<ReportQuery>, ReportError> {
        if self.location_ids.is_empty() {
            return Err(ReportError::InvalidRequest("no location ids given".to_string()));
        }
        if self.end_date < self.start_date {
            return Err(ReportError::InvalidRequest(format!(
                "end date {} is before start date {}",
                self.end_date, self.start_date
            )));
        }
        if self.bin_size_minutes == 0 {
            return Err(ReportError::InvalidRequest("bin size must be positive".to_string()));
        }

        let dates: Vec<NaiveDate> = self
            .start_date
            .iter_days()
            .take_while(|d| *d <= self.end_date)
            .collect();

        Ok(self
            .location_ids
            .iter()
            .flat_map(|location| {
                dates
                    .iter()
                    .map(move |date| ReportQuery::for_day(location, *date, self.bin_size_minutes))
            })
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    pub base_delay: Duration,
    /// Deadline of a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            timeout: config.request_timeout,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based): `base_delay * 2^(retry-1)`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// A (location, day) that could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryFailure {
    pub location_id: String,
    pub date: NaiveDate,
    pub kind: FailureKind,
    pub attempts: u32,
    pub message: String,
}

/// Result of a batch: aligned rows plus everything that went wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TmcReport {
    pub rows: Vec<AlignedSample>,
    pub failures: Vec<QueryFailure>,
    pub issues: Vec<FlattenIssue>,
    pub dropped: DropCounts,
    pub queries: usize,
}

impl TmcReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.issues.is_empty()
    }
}

/// Issues `query`, retrying transient failures per `policy`.
///
/// Returns the number of attempts made alongside the final outcome.
pub async fn query_with_retry<C: ReportClient + ?Sized>(
    client: &C,
    query: &ReportQuery,
    policy: &RetryPolicy,
) -> (u32, Result<ReportDocument, ReportError>) {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(policy.timeout, client.query(query)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ReportError::Timeout(policy.timeout)),
        };

        match outcome {
            Err(e) if e.is_transient() && attempt <= policy.max_retries => {
                let delay = policy.backoff(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient report failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            outcome => return (attempt, outcome),
        }
    }
}

/// Fetches, flattens and aligns every (location, day) of `request`.
///
/// At most `concurrency` queries are in flight at once. Only an invalid
/// request is an error; per-query failures end up in
/// [`TmcReport::failures`].
#[tracing::instrument(
    skip(client, request, policy),
    fields(
        locations = request.location_ids.len(),
        start = %request.start_date,
        end = %request.end_date
    )
)]
pub async fn fetch_turning_movements<C>(
    client: Arc<C>,
    request: &TmcRequest,
    policy: RetryPolicy,
    concurrency: usize,
) -> Result<TmcReport, ReportError>
where
    C: ReportClient + ?Sized + 'static,
{
    let queries = request.queries()?;
    let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency.max(1)));

    info!(queries = queries.len(), "Starting report batch");

    let mut tasks = Vec::with_capacity(queries.len());
    for query in queries {
        let sem = semaphore.clone();
        let client = client.clone();
        let span = tracing::info_span!(
            "report_query",
            location = %query.location_id,
            date = %query.date(),
        );
        let meta = (query.location_id.clone(), query.date());

        let task = tokio::spawn(
            async move {
                // The semaphore is never closed, so the permit is always granted.
                let _permit = sem.acquire_owned().await.ok();
                let (attempts, outcome) = query_with_retry(client.as_ref(), &query, &policy).await;
                let outcome = outcome.map(|doc| flatten(&query.location_id, &doc));
                (attempts, outcome)
            }
            .instrument(span),
        );
        tasks.push((meta, task));
    }

    let mut report = TmcReport {
        queries: tasks.len(),
        ..TmcReport::default()
    };
    let mut flat = FlattenedReport::default();

    for ((location_id, date), task) in tasks {
        let failure = |kind, attempts, message| QueryFailure {
            location_id: location_id.clone(),
            date,
            kind,
            attempts,
            message,
        };

        match task.await {
            Ok((attempts, Ok(page))) => {
                debug!(
                    location = %location_id,
                    %date,
                    attempts,
                    samples = page.samples.len(),
                    plans = page.plans.len(),
                    "Report flattened"
                );
                flat.extend(page);
            }
            Ok((attempts, Err(e))) => {
                warn!(
                    location = %location_id,
                    %date,
                    attempts,
                    error = %e,
                    "Report query failed, skipping"
                );
                report.failures.push(failure(e.kind(), attempts, e.to_string()));
            }
            Err(e) => {
                warn!(location = %location_id, %date, error = %e, "Report task aborted, skipping");
                report.failures.push(failure(FailureKind::Aborted, 0, e.to_string()));
            }
        }
    }

    let FlattenedReport {
        samples,
        plans,
        issues,
    } = flat;
    let alignment = align(samples, plans);

    report.rows = alignment.rows;
    report.dropped = alignment.dropped;
    report.issues = issues;

    info!(
        queries = report.queries,
        failed = report.failures.len(),
        rows = report.rows.len(),
        dropped = report.dropped.total(),
        skipped_records = report.issues.len(),
        "Report batch finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum Reply {
        Document(ReportDocument),
        Status(u16),
        Malformed,
        Hang,
        Panic,
        /// Fails with a 503 this many times, then answers.
        Flaky(u32, ReportDocument),
    }

    #[derive(Default)]
    struct MockClient {
        replies: HashMap<(String, NaiveDate), Reply>,
        calls: Mutex<HashMap<(String, NaiveDate), u32>>,
    }

    impl MockClient {
        fn with(mut self, location: &str, date: NaiveDate, reply: Reply) -> Self {
            self.replies.insert((location.to_string(), date), reply);
            self
        }

        fn calls(&self, location: &str, date: NaiveDate) -> u32 {
            let calls = self.calls.lock().unwrap();
            calls.get(&(location.to_string(), date)).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl ReportClient for MockClient {
        async fn query(&self, query: &ReportQuery) -> Result<ReportDocument, ReportError> {
            let key = (query.location_id.clone(), query.date());
            let call = {
                let mut calls = self.calls.lock().unwrap();
                let n = calls.entry(key.clone()).or_default();
                *n += 1;
                *n
            };

            match self.replies.get(&key) {
                None => Ok(ReportDocument::default()),
                Some(Reply::Document(doc)) => Ok(doc.clone()),
                Some(Reply::Status(status)) => Err(ReportError::Status {
                    status: *status,
                    body: String::new(),
                }),
                Some(Reply::Malformed) => {
                    Err(serde_json::from_str::<ReportDocument>("<html>").unwrap_err().into())
                }
                Some(Reply::Panic) => panic!("report task crashed"),
                Some(Reply::Hang) => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(ReportDocument::default())
                }
                Some(Reply::Flaky(failures, doc)) => {
                    if call <= *failures {
                        Err(ReportError::Status {
                            status: 503,
                            body: String::new(),
                        })
                    } else {
                        Ok(doc.clone())
                    }
                }
            }
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 11, d).unwrap()
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_millis(50),
        }
    }

    fn request(locations: &[&str], start: u32, end: u32) -> TmcRequest {
        TmcRequest {
            location_ids: locations.iter().map(|s| s.to_string()).collect(),
            start_date: day(start),
            end_date: day(end),
            bin_size_minutes: 5,
        }
    }

    /// One AM-peak plan and two volume bins for the given day.
    fn day_document(location: &str, d: u32, counts: [u32; 2]) -> ReportDocument {
        let ts = |h: u32, m: u32| format!("2024-11-{d:02}T{h:02}:{m:02}:00.000");
        serde_json::from_value(json!({
            "table": [{
                "direction": "Northbound",
                "movementType": "Thru",
                "volumes": [
                    {"timestamp": ts(7, 0), "value": counts[0]},
                    {"timestamp": ts(9, 0), "value": counts[1]}
                ]
            }],
            "charts": [{
                "locationIdentifier": location,
                "locationDescription": "Main St & 1st Ave",
                "direction": "Northbound",
                "movementType": "Thru",
                "plans": [
                    {
                        "planNumber": 1,
                        "planDescription": "AM Peak",
                        "start": ts(6, 0),
                        "end": ts(9, 0)
                    }
                ]
            }]
        }))
        .unwrap()
    }

    #[test]
    fn test_queries_cover_every_location_and_day() {
        let queries = request(&["7115", "7116"], 6, 8).queries().unwrap();

        let pairs: Vec<_> = queries
            .iter()
            .map(|q| (q.location_id.as_str(), q.date()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("7115", day(6)),
                ("7115", day(7)),
                ("7115", day(8)),
                ("7116", day(6)),
                ("7116", day(7)),
                ("7116", day(8)),
            ]
        );
    }

    #[test]
    fn test_invalid_requests_are_rejected() {
        assert!(request(&[], 6, 8).queries().is_err());
        assert!(request(&["7115"], 8, 6).queries().is_err());
        let mut zero_bin = request(&["7115"], 6, 6);
        zero_bin.bin_size_minutes = 0;
        assert!(zero_bin.queries().is_err());
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy {
            base_delay: Duration::from_millis(100),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(100));
        assert_eq!(policy.backoff(2), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_batch_aligns_across_days() {
        let client = MockClient::default()
            .with("7115", day(6), Reply::Document(day_document("7115", 6, [10, 99])))
            .with("7115", day(7), Reply::Document(day_document("7115", 7, [20, 99])));

        let report =
            fetch_turning_movements(Arc::new(client), &request(&["7115"], 6, 7), fast_policy(), 2)
                .await
                .unwrap();

        assert_eq!(report.queries, 2);
        assert!(report.is_complete());
        // The 09:00 bins sit exactly on the plan end and are dropped.
        let counts: Vec<_> = report.rows.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![10, 20]);
        assert_eq!(report.dropped.past_plan_end, 2);
        assert!(report.rows.iter().all(|r| r.plan_description == "AM Peak"));
    }

    #[tokio::test]
    async fn test_failed_day_is_skipped_not_fatal() {
        let client = MockClient::default()
            .with("7115", day(6), Reply::Document(day_document("7115", 6, [10, 0])))
            .with("7115", day(7), Reply::Status(404))
            .with("7116", day(6), Reply::Malformed)
            .with("7116", day(7), Reply::Document(day_document("7116", 7, [5, 0])));

        let report = fetch_turning_movements(
            Arc::new(client),
            &request(&["7115", "7116"], 6, 7),
            fast_policy(),
            4,
        )
        .await
        .unwrap();

        assert_eq!(report.rows.len(), 2);
        let failures: Vec<_> = report
            .failures
            .iter()
            .map(|f| (f.location_id.as_str(), f.date, f.kind, f.attempts))
            .collect();
        assert_eq!(
            failures,
            vec![
                ("7115", day(7), FailureKind::Transport, 1),
                ("7116", day(6), FailureKind::Parse, 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let client = Arc::new(
            MockClient::default()
                .with("7115", day(6), Reply::Flaky(2, day_document("7115", 6, [10, 0]))),
        );

        let report =
            fetch_turning_movements(client.clone(), &request(&["7115"], 6, 6), fast_policy(), 1)
                .await
                .unwrap();

        assert!(report.failures.is_empty());
        assert_eq!(report.rows.len(), 1);
        assert_eq!(client.calls("7115", day(6)), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let client = MockClient::default()
            .with("7115", day(6), Reply::Flaky(10, ReportDocument::default()));

        let (attempts, outcome) = query_with_retry(
            &client,
            &ReportQuery::for_day("7115", day(6), 5),
            &fast_policy(),
        )
        .await;

        assert_eq!(attempts, 3);
        assert!(matches!(outcome, Err(ReportError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_hanging_query_times_out() {
        let client = MockClient::default().with("7115", day(6), Reply::Hang);
        let policy = RetryPolicy {
            max_retries: 1,
            ..fast_policy()
        };

        let report = fetch_turning_movements(Arc::new(client), &request(&["7115"], 6, 6), policy, 1)
            .await
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].kind, FailureKind::Timeout);
        assert_eq!(report.failures[0].attempts, 2);
    }

    #[tokio::test]
    async fn test_panicking_task_is_recorded_as_aborted() {
        let client = MockClient::default()
            .with("7115", day(6), Reply::Panic)
            .with("7115", day(7), Reply::Document(day_document("7115", 7, [20, 0])));

        let report =
            fetch_turning_movements(Arc::new(client), &request(&["7115"], 6, 7), fast_policy(), 2)
                .await
                .unwrap();

        assert_eq!(report.queries, 2);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.location_id, "7115");
        assert_eq!(failure.date, day(6));
        assert_eq!(failure.kind, FailureKind::Aborted);
        assert_eq!(failure.attempts, 0);

        let counts: Vec<_> = report.rows.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![20]);
    }
}
