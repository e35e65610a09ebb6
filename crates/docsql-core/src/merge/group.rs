//! GROUP BY and aggregate folding.

use std::collections::HashMap;

use serde_json::{Map, Number, Value as JsonValue};

use super::canonical_json;
use super::order::compare_values;
use crate::error::{CoreError, Result};
use crate::plan::{Aggregate, AggregateKind};

/// A partially combined aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum Partial {
    /// Running count.
    Count(f64),
    /// Running sum.
    Sum(f64),
    /// Smallest value so far.
    Min(JsonValue),
    /// Largest value so far.
    Max(JsonValue),
    /// Running sum and count of an average.
    Avg {
        /// Sum of the averaged values.
        sum: f64,
        /// Number of averaged values.
        count: f64,
    },
}

impl Partial {
    /// Reads the partial of one aggregate from a value as a partition returns it.
    fn from_value(kind: AggregateKind, value: &JsonValue) -> Option<Self> {
        match kind {
            AggregateKind::Count => value.as_f64().map(Self::Count),
            AggregateKind::Sum => value.as_f64().map(Self::Sum),
            AggregateKind::Min => Some(Self::Min(value.clone())),
            AggregateKind::Max => Some(Self::Max(value.clone())),
            AggregateKind::Avg => Some(Self::Avg {
                sum: value.get("sum")?.as_f64()?,
                count: value.get("count")?.as_f64()?,
            }),
        }
    }

    /// Reads the partial of `aggregate` from a plain projected row, where
    /// AVG arrives as `<alias>__sum` and `<alias>__count`.
    fn from_row(aggregate: &Aggregate, row: &Map<String, JsonValue>) -> Option<Self> {
        if aggregate.kind == AggregateKind::Avg {
            return Some(Self::Avg {
                sum: row.get(&format!("{}__sum", aggregate.alias))?.as_f64()?,
                count: row.get(&format!("{}__count", aggregate.alias))?.as_f64()?,
            });
        }
        Self::from_value(aggregate.kind, row.get(&aggregate.alias)?)
    }

    fn combine(&mut self, other: Self) {
        match (self, other) {
            (Self::Count(a), Self::Count(b)) | (Self::Sum(a), Self::Sum(b)) => *a += b,
            (Self::Min(a), Self::Min(b)) => {
                if compare_values(Some(&b), Some(&*a)).is_lt() {
                    *a = b;
                }
            }
            (Self::Max(a), Self::Max(b)) => {
                if compare_values(Some(&b), Some(&*a)).is_gt() {
                    *a = b;
                }
            }
            (Self::Avg { sum, count }, Self::Avg { sum: s, count: c }) => {
                *sum += s;
                *count += c;
            }
            _ => {}
        }
    }

    /// The final value, `None` for an undefined result (AVG over nothing).
    #[must_use]
    pub fn finish(&self) -> Option<JsonValue> {
        match self {
            Self::Count(n) | Self::Sum(n) => Some(number(*n)),
            Self::Min(v) | Self::Max(v) => Some(v.clone()),
            Self::Avg { count, .. } if *count == 0.0 => None,
            Self::Avg { sum, count } => Some(number(sum / count)),
        }
    }
}

/// Renders an integral float as an integer.
#[allow(clippy::cast_possible_truncation)]
fn number(n: f64) -> JsonValue {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        JsonValue::from(n as i64)
    } else {
        Number::from_f64(n).map_or(JsonValue::Null, JsonValue::Number)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Group {
    fields: Map<String, JsonValue>,
    partials: Vec<Option<Partial>>,
}

/// Folds per-partition aggregate rows into one row per group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupAccumulator {
    aggregates: Vec<Aggregate>,
    value: bool,
    groups: Vec<Group>,
    index: HashMap<String, usize>,
}

impl GroupAccumulator {
    /// Creates an accumulator for the given aggregates. `value` is set for
    /// `SELECT VALUE <aggregate>`.
    #[must_use]
    pub fn new(aggregates: Vec<Aggregate>, value: bool) -> Self {
        Self {
            aggregates,
            value,
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Number of groups seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns true if no group was seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn is_aggregate_field(&self, name: &str) -> bool {
        self.aggregates.iter().any(|a| {
            name == a.alias
                || name
                    .strip_prefix(a.alias.as_str())
                    .is_some_and(|rest| rest == "__sum" || rest == "__count")
        })
    }

    fn fold(&mut self, key: String, fields: Map<String, JsonValue>, partials: Vec<Option<Partial>>) {
        match self.index.get(&key) {
            Some(&i) => {
                let group = &mut self.groups[i];
                for (slot, partial) in group.partials.iter_mut().zip(partials) {
                    if let Some(p) = partial {
                        match slot {
                            Some(current) => current.combine(p),
                            None => *slot = Some(p),
                        }
                    }
                }
            }
            None => {
                self.index.insert(key, self.groups.len());
                self.groups.push(Group { fields, partials });
            }
        }
    }

    /// Adds a row as the partition projected it.
    pub fn add_row(&mut self, row: &JsonValue) -> Result<()> {
        let object = match row {
            JsonValue::Object(map) => map.clone(),
            other if self.value && self.aggregates.len() == 1 => {
                let mut map = Map::new();
                map.insert(self.aggregates[0].alias.clone(), other.clone());
                map
            }
            other => {
                return Err(CoreError::MalformedRow(format!(
                    "expected an object in an aggregate query, got {other}"
                )))
            }
        };
        let partials = self
            .aggregates
            .iter()
            .map(|a| Partial::from_row(a, &object))
            .collect();
        let fields: Map<String, JsonValue> = object
            .into_iter()
            .filter(|(name, _)| !self.is_aggregate_field(name))
            .collect();
        let key = canonical_json(&JsonValue::Object(fields.clone()));
        self.fold(key, fields, partials);
        Ok(())
    }

    /// Adds a rewritten row:
    /// `{"groupByItems":[{"item":..}],"payload":{alias:{"item":partial}}}`.
    pub fn add_rewritten(&mut self, row: &JsonValue) -> Result<()> {
        let payload = row
            .get("payload")
            .ok_or_else(|| CoreError::MalformedRow(format!("missing payload in {row}")))?;
        let key = row
            .get("groupByItems")
            .map_or_else(|| "[]".to_string(), canonical_json);

        if self.value && self.aggregates.len() == 1 && !payload.is_object() {
            let partial = Partial::from_value(self.aggregates[0].kind, payload);
            self.fold(key, Map::new(), vec![partial]);
            return Ok(());
        }
        let JsonValue::Object(payload) = payload else {
            return Err(CoreError::MalformedRow(format!(
                "payload is not an object in {row}"
            )));
        };

        let mut fields = Map::new();
        let mut partials = vec![None; self.aggregates.len()];
        for (name, value) in payload {
            match self.aggregates.iter().position(|a| &a.alias == name) {
                Some(i) => {
                    partials[i] = value
                        .get("item")
                        .and_then(|item| Partial::from_value(self.aggregates[i].kind, item));
                }
                None => {
                    fields.insert(name.clone(), value.clone());
                }
            }
        }
        self.fold(key, fields, partials);
        Ok(())
    }

    /// The combined rows, one per group in first-seen order.
    ///
    /// Does not consume or change the accumulator.
    #[must_use]
    pub fn flatten(&self) -> Vec<JsonValue> {
        self.groups
            .iter()
            .filter_map(|group| {
                if self.value && self.aggregates.len() == 1 && group.fields.is_empty() {
                    return group.partials[0].as_ref().and_then(Partial::finish);
                }
                let mut row = group.fields.clone();
                for (aggregate, partial) in self.aggregates.iter().zip(&group.partials) {
                    if let Some(value) = partial.as_ref().and_then(Partial::finish) {
                        row.insert(aggregate.alias.clone(), value);
                    }
                }
                Some(JsonValue::Object(row))
            })
            .collect()
    }
}
