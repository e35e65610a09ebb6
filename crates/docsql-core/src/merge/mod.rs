//! Combining per-partition pages into one result.
//!
//! [`Merger`] applies a [`QueryPlan`] to pages fetched from several
//! partitions. ORDER BY pages are k-way merged, DISTINCT rows filtered
//! against everything emitted so far, and aggregate rows folded into a
//! [`GroupAccumulator`] that is read back with [`Merger::flatten`].

mod distinct;
mod group;
mod order;

use serde_json::{Map, Value as JsonValue};

pub use distinct::DistinctSet;
pub use group::{GroupAccumulator, Partial};
pub use order::{compare_keys, compare_values, kway_merge, Run};

use crate::error::{CoreError, Result};
use crate::plan::{QueryKind, QueryPlan};

/// Serializes `value` with object keys sorted and integral numbers written
/// as integers, so equal documents produce equal strings.
#[must_use]
pub fn canonical_json(value: &JsonValue) -> String {
    fn normalize(value: &JsonValue) -> JsonValue {
        match value {
            JsonValue::Object(map) => {
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                let mut sorted = Map::new();
                for key in keys {
                    sorted.insert(key.clone(), normalize(&map[key]));
                }
                JsonValue::Object(sorted)
            }
            JsonValue::Array(items) => JsonValue::Array(items.iter().map(normalize).collect()),
            JsonValue::Number(n) if n.as_i64().is_none() && n.as_u64().is_none() => {
                match n.as_f64() {
                    #[allow(clippy::cast_possible_truncation)]
                    Some(f) if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
                        JsonValue::from(f as i64)
                    }
                    _ => value.clone(),
                }
            }
            other => other.clone(),
        }
    }
    normalize(value).to_string()
}

/// Rows returned by one partition for one request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionRows {
    /// The rows, in partition order.
    pub rows: Vec<JsonValue>,
    /// Whether the rows use the rewritten `orderByItems` / `groupByItems` shape.
    pub rewritten: bool,
}

impl PartitionRows {
    /// Plain rows.
    #[must_use]
    pub fn plain(rows: Vec<JsonValue>) -> Self {
        Self {
            rows,
            rewritten: false,
        }
    }

    /// Rows in the rewritten shape.
    #[must_use]
    pub fn rewritten(rows: Vec<JsonValue>) -> Self {
        Self {
            rows,
            rewritten: true,
        }
    }
}

fn payload_of(row: JsonValue) -> Result<JsonValue> {
    match row {
        JsonValue::Object(mut map) if map.contains_key("payload") => {
            Ok(map.remove("payload").unwrap_or(JsonValue::Null))
        }
        other => Err(CoreError::MalformedRow(format!("missing payload in {other}"))),
    }
}

/// Applies a query plan to successive batches of partition pages.
#[derive(Debug, Clone)]
pub struct Merger {
    plan: QueryPlan,
    seen: DistinctSet,
    groups: GroupAccumulator,
}

impl Merger {
    /// Creates a merger with no rows seen.
    #[must_use]
    pub fn new(plan: QueryPlan) -> Self {
        Self::with_seen(plan, DistinctSet::new())
    }

    /// Creates a merger that continues a DISTINCT scan.
    #[must_use]
    pub fn with_seen(plan: QueryPlan, seen: DistinctSet) -> Self {
        let groups = GroupAccumulator::new(plan.aggregates.clone(), plan.value);
        Self { plan, seen, groups }
    }

    /// The plan in effect.
    #[must_use]
    pub const fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// Replaces the plan with one supplied by the backend. Groups already
    /// folded are kept only if the aggregates did not change.
    pub fn override_plan(&mut self, backend: QueryPlan) {
        self.plan.override_with(backend);
        if self.groups.is_empty() {
            self.groups = GroupAccumulator::new(self.plan.aggregates.clone(), self.plan.value);
        }
    }

    /// Rows emitted so far by a DISTINCT scan.
    #[must_use]
    pub const fn seen(&self) -> &DistinctSet {
        &self.seen
    }

    /// Merges one page from each partition.
    ///
    /// Returns the rows ready to emit. Aggregate queries return nothing here;
    /// their rows come from [`Merger::flatten`].
    pub fn merge_pages(&mut self, pages: Vec<PartitionRows>) -> Result<Vec<JsonValue>> {
        let rows = match self.plan.kind() {
            QueryKind::GroupBy => {
                for page in &pages {
                    for row in &page.rows {
                        if page.rewritten {
                            self.groups.add_rewritten(row)?;
                        } else {
                            self.groups.add_row(row)?;
                        }
                    }
                }
                return Ok(Vec::new());
            }
            QueryKind::OrderBy => {
                let runs = pages
                    .into_iter()
                    .map(|page| self.keyed_run(page))
                    .collect::<Result<Vec<_>>>()?;
                kway_merge(runs, &self.plan.descending())
            }
            QueryKind::Bare | QueryKind::Distinct => {
                let mut rows = Vec::new();
                for page in pages {
                    for row in page.rows {
                        if page.rewritten && row.get("payload").is_some() {
                            rows.push(payload_of(row)?);
                        } else {
                            rows.push(row);
                        }
                    }
                }
                rows
            }
        };
        if self.plan.is_distinct() {
            Ok(self.seen.filter(rows))
        } else {
            Ok(rows)
        }
    }

    fn keyed_run(&self, page: PartitionRows) -> Result<Run> {
        page.rows
            .into_iter()
            .map(|row| {
                let key = self.sort_key(&row, page.rewritten)?;
                let row = if page.rewritten { payload_of(row)? } else { row };
                Ok((key, row))
            })
            .collect()
    }

    /// The ORDER BY key of a row as its partition returned it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedRow`] if a rewritten row has no
    /// `orderByItems`.
    pub fn sort_key(&self, row: &JsonValue, rewritten: bool) -> Result<Vec<Option<JsonValue>>> {
        if !rewritten {
            return Ok(self.plan.order_key(row));
        }
        match row.get("orderByItems") {
            Some(JsonValue::Array(items)) => {
                Ok(items.iter().map(|item| item.get("item").cloned()).collect())
            }
            _ => Err(CoreError::MalformedRow(format!(
                "missing orderByItems in {row}"
            ))),
        }
    }

    /// Emits one row picked by an ORDER BY merge, unwrapping rewritten rows.
    /// Returns `None` when a DISTINCT scan already emitted an equal row.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MalformedRow`] if a rewritten row has no payload.
    pub fn emit_ordered(&mut self, row: JsonValue, rewritten: bool) -> Result<Option<JsonValue>> {
        let row = if rewritten { payload_of(row)? } else { row };
        if self.plan.is_distinct() && !self.seen.insert(&row) {
            return Ok(None);
        }
        Ok(Some(row))
    }

    /// The folded aggregate rows. Pure: calling it twice yields the same rows.
    #[must_use]
    pub fn flatten(&self) -> Vec<JsonValue> {
        self.groups.flatten()
    }
}
