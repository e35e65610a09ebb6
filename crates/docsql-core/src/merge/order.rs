//! Type-ranked comparison and the k-way ORDER BY merge.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde_json::Value as JsonValue;

/// Rank of a value's type: undefined < null < bool < number < string <
/// array < object.
const fn type_rank(value: Option<&JsonValue>) -> u8 {
    match value {
        None => 0,
        Some(JsonValue::Null) => 1,
        Some(JsonValue::Bool(_)) => 2,
        Some(JsonValue::Number(_)) => 3,
        Some(JsonValue::String(_)) => 4,
        Some(JsonValue::Array(_)) => 5,
        Some(JsonValue::Object(_)) => 6,
    }
}

/// Orders two values, `None` standing for undefined.
///
/// Values of different types order by type rank. Numbers compare as `f64`,
/// arrays element-wise, objects by their sorted canonical form.
#[must_use]
pub fn compare_values(a: Option<&JsonValue>, b: Option<&JsonValue>) -> Ordering {
    let by_rank = type_rank(a).cmp(&type_rank(b));
    if by_rank != Ordering::Equal {
        return by_rank;
    }
    match (a, b) {
        (Some(JsonValue::Bool(x)), Some(JsonValue::Bool(y))) => x.cmp(y),
        (Some(JsonValue::Number(x)), Some(JsonValue::Number(y))) => {
            match (x.as_i64(), y.as_i64()) {
                (Some(x), Some(y)) => x.cmp(&y),
                _ => {
                    let x = x.as_f64().unwrap_or(f64::NAN);
                    let y = y.as_f64().unwrap_or(f64::NAN);
                    x.total_cmp(&y)
                }
            }
        }
        (Some(JsonValue::String(x)), Some(JsonValue::String(y))) => x.cmp(y),
        (Some(JsonValue::Array(x)), Some(JsonValue::Array(y))) => x
            .iter()
            .zip(y)
            .map(|(x, y)| compare_values(Some(x), Some(y)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Some(x @ JsonValue::Object(_)), Some(y @ JsonValue::Object(_))) => {
            super::canonical_json(x).cmp(&super::canonical_json(y))
        }
        _ => Ordering::Equal,
    }
}

/// Compares two ORDER BY keys item by item, honouring each item's direction.
#[must_use]
pub fn compare_keys(
    a: &[Option<JsonValue>],
    b: &[Option<JsonValue>],
    descending: &[bool],
) -> Ordering {
    a.iter()
        .zip(b)
        .enumerate()
        .map(|(i, (x, y))| {
            let ord = compare_values(x.as_ref(), y.as_ref());
            if descending.get(i).copied().unwrap_or(false) {
                ord.reverse()
            } else {
                ord
            }
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// A row waiting in the merge heap.
struct HeapEntry<'d> {
    key: Vec<Option<JsonValue>>,
    run: usize,
    pos: usize,
    descending: &'d [bool],
}

impl PartialEq for HeapEntry<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry<'_> {}

impl PartialOrd for HeapEntry<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry<'_> {
    // BinaryHeap is a max-heap: reverse so the smallest key pops first, with
    // ties broken by run and then position.
    fn cmp(&self, other: &Self) -> Ordering {
        compare_keys(&self.key, &other.key, self.descending)
            .then(self.run.cmp(&other.run))
            .then(self.pos.cmp(&other.pos))
            .reverse()
    }
}

/// One sorted run: `(key, row)` pairs in partition order.
pub type Run = Vec<(Vec<Option<JsonValue>>, JsonValue)>;

/// Merges sorted runs into one sorted sequence.
///
/// The merge is stable: equal keys keep run order, then in-run order.
#[must_use]
pub fn kway_merge(runs: Vec<Run>, descending: &[bool]) -> Vec<JsonValue> {
    let total = runs.iter().map(Vec::len).sum();
    let mut iters: Vec<_> = runs.into_iter().map(Vec::into_iter).collect();
    let mut pending: Vec<Option<JsonValue>> = vec![None; iters.len()];
    let mut heap = BinaryHeap::with_capacity(iters.len());

    for (run, iter) in iters.iter_mut().enumerate() {
        if let Some((key, row)) = iter.next() {
            pending[run] = Some(row);
            heap.push(HeapEntry {
                key,
                run,
                pos: 0,
                descending,
            });
        }
    }

    let mut out = Vec::with_capacity(total);
    while let Some(entry) = heap.pop() {
        if let Some(row) = pending[entry.run].take() {
            out.push(row);
        }
        if let Some((key, row)) = iters[entry.run].next() {
            pending[entry.run] = Some(row);
            heap.push(HeapEntry {
                key,
                run: entry.run,
                pos: entry.pos + 1,
                descending,
            });
        }
    }
    out
}
