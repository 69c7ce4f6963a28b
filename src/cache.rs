//! Caller-owned cache of batch results.
//!
//! Entries are keyed on the full [`TmcRequest`] (signal ids, date range, bin
//! size), expire after a fixed time-to-live and can be invalidated manually.
//! Only batches without failed queries are stored, so a later call retries
//! the days that failed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::batch::{RetryPolicy, TmcReport, TmcRequest, fetch_turning_movements};
use crate::error::ReportError;
use crate::report::ReportClient;

struct Entry {
    report: Arc<TmcReport>,
    created_at: Instant,
}

pub struct ReportCache {
    ttl: Duration,
    max_entries: usize,
    entries: HashMap<TmcRequest, Entry>,
}

impl ReportCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: HashMap::new(),
        }
    }

    fn evict_expired(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.created_at.elapsed() < ttl);
    }

    pub fn get(&mut self, request: &TmcRequest) -> Option<Arc<TmcReport>> {
        self.evict_expired();
        self.entries.get(request).map(|e| e.report.clone())
    }

    /// Stores `report`, evicting the oldest entry when full.
    pub fn insert(&mut self, request: TmcRequest, report: Arc<TmcReport>) {
        self.evict_expired();
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&request) {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(
            request,
            Entry {
                report,
                created_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&mut self, request: &TmcRequest) -> bool {
        self.entries.remove(request).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached report for `request`, fetching it on a miss.
    pub async fn get_or_fetch<C>(
        &mut self,
        client: Arc<C>,
        request: &TmcRequest,
        policy: RetryPolicy,
        concurrency: usize,
    ) -> Result<Arc<TmcReport>, ReportError>
    where
        C: ReportClient + ?Sized + 'static,
    {
        if let Some(hit) = self.get(request) {
            debug!(locations = request.location_ids.len(), "Report cache hit");
            return Ok(hit);
        }

        let report = Arc::new(fetch_turning_movements(client, request, policy, concurrency).await?);
        if report.failures.is_empty() {
            self.insert(request.clone(), report.clone());
        } else {
            debug!(
                failed = report.failures.len(),
                "Not caching report with failed queries"
            );
        }
        Ok(report)
    }
}
