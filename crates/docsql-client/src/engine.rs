//! Cross-partition query execution.
//!
//! A cross-partition SELECT is sent to every partition key range with a
//! per-partition rewrite of its text (see [`QueryPlan::partition_query`]),
//! and the pages are combined by a [`Merger`]. Progress across calls lives
//! in a continuation token that records, per unfinished partition, the
//! partition's own continuation and any rows fetched but not yet emitted,
//! plus the DISTINCT rows already emitted and how much of an OFFSET/LIMIT
//! window has been consumed.
//!
//! Fetching depends on the merge:
//!
//! - Bare and DISTINCT scans visit partitions one after another with the
//!   remaining page budget.
//! - ORDER BY keeps one buffer per partition and refills every empty buffer
//!   at once (unless [`FanOut::Sequential`] is configured) before picking
//!   the next row. Rows left in the buffers when the cap is reached travel
//!   in the token, so order holds across calls.
//! - GROUP BY fetches one page from every partition and emits the groups
//!   folded from those pages; totals hold within one call only.
//!
//! In the first two cases a page never exceeds the cap. Without a cap every
//! partition is drained in a single call.

use std::cmp::Ordering;
use std::collections::VecDeque;

use docsql_core::merge::compare_keys;
use docsql_core::{DistinctSet, Merger, PartitionRows, QueryKind, QueryPlan};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::FanOut;
use crate::error::{Error, Result};
use crate::rest::{PkRange, QueryPage, QueryRequest, RestClient};

/// One page of a query as the caller sees it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Merged rows.
    pub rows: Vec<JsonValue>,
    /// Token for the next page, `None` at the end of the scan.
    pub continuation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Cursor {
    range_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    continuation: Option<String>,
    /// Rows fetched for an ORDER BY merge and not yet emitted.
    #[serde(default, skip_serializing_if = "VecDeque::is_empty")]
    buffered: VecDeque<JsonValue>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    rewritten: bool,
    /// No pages left to fetch.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    drained: bool,
}

impl Cursor {
    fn is_finished(&self) -> bool {
        self.drained && self.buffered.is_empty()
    }
}

/// Everything a scan needs to resume. Serialized as the continuation token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct ScanState {
    cursors: Vec<Cursor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    seen: Vec<String>,
    #[serde(default)]
    skipped: u64,
    #[serde(default)]
    taken: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    plan: Option<QueryPlan>,
}

impl ScanState {
    fn start(ranges: Vec<PkRange>) -> Self {
        Self {
            cursors: ranges
                .into_iter()
                .map(|range| Cursor {
                    range_id: range.id,
                    ..Cursor::default()
                })
                .collect(),
            ..Self::default()
        }
    }

    fn decode(token: &str) -> Result<Self> {
        serde_json::from_str(token).map_err(|e| Error::InvalidContinuation(e.to_string()))
    }

    fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidContinuation(e.to_string()))
    }

    fn limit_reached(&self, plan: &QueryPlan) -> bool {
        plan.limit.is_some_and(|limit| self.taken >= limit)
    }

    /// Applies the global OFFSET/LIMIT window to merged rows.
    fn cut(&mut self, rows: Vec<JsonValue>, plan: &QueryPlan) -> Vec<JsonValue> {
        let offset = plan.offset.unwrap_or(0);
        let mut out = Vec::new();
        for row in rows {
            if self.limit_reached(plan) {
                break;
            }
            if self.skipped < offset {
                self.skipped += 1;
                continue;
            }
            self.taken += 1;
            out.push(row);
        }
        out
    }

    /// Switches to the backend's plan the first time a page carries one.
    fn adopt_plan(&mut self, page: &mut QueryPage, merger: &mut Merger) {
        if let Some(backend) = page.query_plan.take() {
            if self.plan.is_none() {
                debug!(kind = ?backend.kind(), "using backend query plan");
                merger.override_plan(backend.clone());
                self.plan = Some(backend);
            }
        }
    }
}

fn rows_of(page: &mut QueryPage) -> PartitionRows {
    match page.rewritten_documents.take() {
        Some(rows) => PartitionRows::rewritten(rows),
        None => PartitionRows::plain(std::mem::take(&mut page.documents)),
    }
}

/// Runs queries against one collection, single- or cross-partition.
pub struct QueryEngine<'c> {
    client: &'c dyn RestClient,
    fan_out: FanOut,
}

impl<'c> QueryEngine<'c> {
    /// Creates an engine over `client`.
    #[must_use]
    pub fn new(client: &'c dyn RestClient, fan_out: FanOut) -> Self {
        Self { client, fan_out }
    }

    /// Runs one page of `req`.
    ///
    /// A single-partition request is passed through and its continuation
    /// returned as is. A cross-partition request starts a scan, or resumes
    /// the one `req.continuation` came from.
    pub async fn query(&self, req: &QueryRequest) -> Result<QueryResult> {
        if req.is_single_partition() {
            let page = self.client.query_documents(req).await?;
            debug!(
                rows = page.count,
                more = page.continuation.is_some(),
                "single-partition page"
            );
            return Ok(QueryResult {
                rows: page.documents,
                continuation: page.continuation,
            });
        }
        self.cross_partition(req).await
    }

    async fn cross_partition(&self, req: &QueryRequest) -> Result<QueryResult> {
        let mut plan = QueryPlan::infer(&req.query, &req.params)?;
        let mut state = match req.continuation.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => ScanState::decode(token)?,
            None => {
                let ranges = self
                    .client
                    .list_pk_ranges(&req.db_name, &req.coll_name)
                    .await?;
                ScanState::start(ranges)
            }
        };
        if let Some(backend) = state.plan.clone() {
            plan.override_with(backend);
        }
        let seen = DistinctSet::from_keys(std::mem::take(&mut state.seen));
        let mut merger = Merger::with_seen(plan, seen);
        let kind = merger.plan().kind();
        debug!(
            db = %req.db_name,
            coll = %req.coll_name,
            partitions = state.cursors.len(),
            kind = ?kind,
            cap = req.max_item_count,
            "cross-partition query"
        );

        let rows = match kind {
            QueryKind::Bare | QueryKind::Distinct => {
                self.serial(req, &mut state, &mut merger).await?
            }
            QueryKind::OrderBy => self.ordered(req, &mut state, &mut merger).await?,
            QueryKind::GroupBy => self.grouped(req, &mut state, &mut merger).await?,
        };

        if merger.plan().is_distinct() {
            state.seen = merger.seen().keys();
        }
        let done = state.cursors.is_empty() || state.limit_reached(merger.plan());
        let continuation = if done { None } else { Some(state.encode()?) };
        debug!(
            rows = rows.len(),
            remaining = state.cursors.len(),
            more = continuation.is_some(),
            "cross-partition page"
        );
        Ok(QueryResult { rows, continuation })
    }

    /// Visits partitions in order, never fetching more than the remaining budget.
    async fn serial(
        &self,
        req: &QueryRequest,
        state: &mut ScanState,
        merger: &mut Merger,
    ) -> Result<Vec<JsonValue>> {
        let cap = usize::try_from(req.max_item_count).ok().filter(|&c| c > 0);
        let mut out = Vec::new();
        while let Some(cursor) = state.cursors.first() {
            if state.limit_reached(merger.plan()) {
                break;
            }
            let budget = match cap {
                Some(cap) if out.len() >= cap => break,
                Some(cap) => i64::try_from(cap - out.len()).unwrap_or(i64::MAX),
                None => -1,
            };
            let query = merger.plan().partition_query(&req.query)?;
            let mut page = self.fetch(req, &query, cursor, budget).await?;
            state.adopt_plan(&mut page, merger);
            let rows = merger.merge_pages(vec![rows_of(&mut page)])?;
            out.extend(state.cut(rows, merger.plan()));
            match page.continuation {
                Some(next) => state.cursors[0].continuation = Some(next),
                None => {
                    state.cursors.remove(0);
                }
            }
        }
        Ok(out)
    }

    /// Merges partition buffers row by row until the cap is reached or every
    /// partition is drained.
    async fn ordered(
        &self,
        req: &QueryRequest,
        state: &mut ScanState,
        merger: &mut Merger,
    ) -> Result<Vec<JsonValue>> {
        let cap = usize::try_from(req.max_item_count).ok().filter(|&c| c > 0);
        let mut out = Vec::new();
        loop {
            if state.limit_reached(merger.plan()) || cap.is_some_and(|cap| out.len() >= cap) {
                break;
            }
            self.refill(req, state, merger).await?;
            let Some(index) = next_in_order(&state.cursors, merger)? else {
                break;
            };
            let cursor = &mut state.cursors[index];
            let rewritten = cursor.rewritten;
            let row = cursor.buffered.pop_front();
            if cursor.is_finished() {
                state.cursors.remove(index);
            }
            let Some(row) = row else {
                break;
            };
            if let Some(row) = merger.emit_ordered(row, rewritten)? {
                out.extend(state.cut(vec![row], merger.plan()));
            }
        }
        Ok(out)
    }

    /// Fetches the next page of every partition whose buffer ran dry, until
    /// each remaining partition has a row to compare or is drained.
    async fn refill(
        &self,
        req: &QueryRequest,
        state: &mut ScanState,
        merger: &mut Merger,
    ) -> Result<()> {
        loop {
            let dry: Vec<usize> = state
                .cursors
                .iter()
                .enumerate()
                .filter(|(_, c)| c.buffered.is_empty() && !c.drained)
                .map(|(i, _)| i)
                .collect();
            if dry.is_empty() {
                break;
            }
            let query = merger.plan().partition_query(&req.query)?;
            let targets: Vec<Cursor> = dry.iter().map(|&i| state.cursors[i].clone()).collect();
            let pages = self
                .fetch_all(req, &query, &targets, req.max_item_count)
                .await?;
            for (index, mut page) in dry.into_iter().zip(pages) {
                state.adopt_plan(&mut page, merger);
                let rows = rows_of(&mut page);
                let cursor = &mut state.cursors[index];
                cursor.buffered.extend(rows.rows);
                cursor.rewritten = rows.rewritten;
                cursor.drained = page.continuation.is_none();
                cursor.continuation = page.continuation;
            }
        }
        state.cursors.retain(|c| !c.is_finished());
        Ok(())
    }

    /// Fetches one page from every partition per round and folds it into
    /// groups; without a cap, rounds repeat until all partitions are drained.
    async fn grouped(
        &self,
        req: &QueryRequest,
        state: &mut ScanState,
        merger: &mut Merger,
    ) -> Result<Vec<JsonValue>> {
        let capped = req.max_item_count > 0;
        let mut pending = std::mem::take(&mut state.cursors);

        while !pending.is_empty() {
            let query = merger.plan().partition_query(&req.query)?;
            let pages = self
                .fetch_all(req, &query, &pending, req.max_item_count)
                .await?;
            let mut next = Vec::new();
            for (cursor, mut page) in pending.into_iter().zip(pages) {
                state.adopt_plan(&mut page, merger);
                merger.merge_pages(vec![rows_of(&mut page)])?;
                if let Some(continuation) = page.continuation {
                    let cursor = Cursor {
                        continuation: Some(continuation),
                        ..cursor
                    };
                    if capped {
                        state.cursors.push(cursor);
                    } else {
                        next.push(cursor);
                    }
                }
            }
            pending = next;
        }

        Ok(state.cut(merger.flatten(), merger.plan()))
    }

    async fn fetch_all(
        &self,
        req: &QueryRequest,
        query: &str,
        cursors: &[Cursor],
        max_item_count: i64,
    ) -> Result<Vec<QueryPage>> {
        let fetches = cursors
            .iter()
            .map(|cursor| self.fetch(req, query, cursor, max_item_count));
        match self.fan_out {
            FanOut::Concurrent => try_join_all(fetches).await,
            FanOut::Sequential => {
                let mut pages = Vec::with_capacity(cursors.len());
                for fetch in fetches {
                    pages.push(fetch.await?);
                }
                Ok(pages)
            }
        }
    }

    async fn fetch(
        &self,
        req: &QueryRequest,
        query: &str,
        cursor: &Cursor,
        max_item_count: i64,
    ) -> Result<QueryPage> {
        let partition_req = QueryRequest {
            query: query.to_string(),
            max_item_count,
            partition_key: None,
            range_id: Some(cursor.range_id.clone()),
            continuation: cursor.continuation.clone(),
            ..req.clone()
        };
        let page = self.client.query_documents(&partition_req).await?;
        debug!(
            range = %cursor.range_id,
            rows = page.count,
            more = page.continuation.is_some(),
            "partition page"
        );
        Ok(page)
    }
}

/// Index of the partition whose buffered head comes first; ties go to the
/// earlier partition.
fn next_in_order(cursors: &[Cursor], merger: &Merger) -> Result<Option<usize>> {
    let descending = merger.plan().descending();
    let mut best: Option<(usize, Vec<Option<JsonValue>>)> = None;
    for (index, cursor) in cursors.iter().enumerate() {
        let Some(row) = cursor.buffered.front() else {
            continue;
        };
        let key = merger.sort_key(row, cursor.rewritten)?;
        let first = match &best {
            Some((_, best_key)) => compare_keys(&key, best_key, &descending) == Ordering::Less,
            None => true,
        };
        if first {
            best = Some((index, key));
        }
    }
    Ok(best.map(|(index, _)| index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(query: &str) -> QueryPlan {
        QueryPlan::infer(query, &[]).unwrap()
    }

    #[test]
    fn test_token_round_trip() {
        let mut state = ScanState::start(vec![PkRange::new("0"), PkRange::new("1")]);
        state.cursors[1].continuation = Some("+RID:abc".into());
        state.seen = vec!["\"x\"".into()];
        state.taken = 3;
        let token = state.encode().unwrap();
        assert_eq!(ScanState::decode(&token).unwrap(), state);
    }

    #[test]
    fn test_buffered_rows_travel_in_token() {
        let mut state = ScanState::start(vec![PkRange::new("0")]);
        state.cursors[0].buffered = VecDeque::from(vec![json!({"n": 2}), json!({"n": 1})]);
        state.cursors[0].drained = true;
        let token = state.encode().unwrap();
        assert!(token.contains("buffered"));
        assert_eq!(ScanState::decode(&token).unwrap(), state);
    }

    #[test]
    fn test_next_in_order() {
        let merger = Merger::new(plan("SELECT * FROM c ORDER BY c.n DESC"));
        let cursor = |rows: Vec<JsonValue>| Cursor {
            buffered: rows.into(),
            ..Cursor::default()
        };
        let cursors = vec![
            cursor(vec![json!({"n": 5})]),
            cursor(vec![]),
            cursor(vec![json!({"n": 8})]),
            cursor(vec![json!({"n": 8})]),
        ];
        assert_eq!(next_in_order(&cursors, &merger).unwrap(), Some(2));
        assert_eq!(next_in_order(&cursors[..2], &merger).unwrap(), Some(0));
        assert_eq!(next_in_order(&[], &merger).unwrap(), None);
    }

    #[test]
    fn test_bad_token() {
        assert!(matches!(
            ScanState::decode("not a token"),
            Err(Error::InvalidContinuation(_))
        ));
    }

    #[test]
    fn test_cut_window_spans_calls() {
        let plan = plan("SELECT * FROM c OFFSET 2 LIMIT 3");
        let mut state = ScanState::default();
        let first = state.cut(vec![json!(1), json!(2), json!(3)], &plan);
        assert_eq!(first, vec![json!(3)]);
        let second = state.cut(vec![json!(4), json!(5), json!(6)], &plan);
        assert_eq!(second, vec![json!(4), json!(5)]);
        assert!(state.limit_reached(&plan));
    }

    #[test]
    fn test_cut_without_window() {
        let plan = plan("SELECT * FROM c");
        let mut state = ScanState::default();
        assert_eq!(state.cut(vec![json!(1), json!(2)], &plan).len(), 2);
        assert!(!state.limit_reached(&plan));
    }

    #[test]
    fn test_adopt_plan_once() {
        let mut state = ScanState::default();
        let mut merger = Merger::new(plan("SELECT * FROM c"));
        let mut page = QueryPage {
            query_plan: Some(plan("SELECT * FROM c ORDER BY c.n")),
            ..QueryPage::default()
        };
        state.adopt_plan(&mut page, &mut merger);
        assert_eq!(merger.plan().kind(), QueryKind::OrderBy);
        assert!(state.plan.is_some());
    }
}
