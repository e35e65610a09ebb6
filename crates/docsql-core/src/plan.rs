//! Query-plan inference for cross-partition SELECT.
//!
//! The plan says how rows coming back from several partitions have to be
//! combined: concatenated, merged by ORDER BY keys, de-duplicated, or folded
//! into groups. It is inferred client-side from the query tokens; a plan
//! supplied by the backend takes precedence when one is available.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{CoreError, Result};
use crate::lexer::{Keyword, Lexer, Span, Token, TokenKind};
use crate::parser::ParseError;
use crate::statement::QueryParam;

/// How a plan's rows must be merged across partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Plain concatenation.
    Bare,
    /// K-way merge on the ORDER BY keys.
    OrderBy,
    /// De-duplication without ordering.
    Distinct,
    /// Aggregation, with or without GROUP BY.
    GroupBy,
}

/// The DISTINCT flavour of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DistinctKind {
    /// No DISTINCT.
    #[default]
    None,
    /// `DISTINCT VALUE`.
    Value,
    /// `DISTINCT` over projected objects.
    Document,
}

/// Aggregate functions that can be combined across partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregateKind {
    /// `COUNT`.
    Count,
    /// `SUM`.
    Sum,
    /// `MIN`.
    Min,
    /// `MAX`.
    Max,
    /// `AVG`, carried as sum and count until the final row.
    Avg,
}

impl AggregateKind {
    const fn from_keyword(keyword: Keyword) -> Option<Self> {
        match keyword {
            Keyword::Count => Some(Self::Count),
            Keyword::Sum => Some(Self::Sum),
            Keyword::Min => Some(Self::Min),
            Keyword::Max => Some(Self::Max),
            Keyword::Avg => Some(Self::Avg),
            _ => None,
        }
    }
}

/// One ORDER BY item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderByItem {
    /// Expression text as written.
    pub expression: String,
    /// Property path below the FROM alias, when the expression is a plain path.
    #[serde(default)]
    pub path: Vec<String>,
    /// `DESC`.
    #[serde(default)]
    pub descending: bool,
}

/// An aggregate in the projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    /// Output property name (`$1` style when unnamed).
    pub alias: String,
    /// Function.
    pub kind: AggregateKind,
    /// Argument text.
    #[serde(default)]
    pub argument: String,
}

/// One projected item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectItem {
    /// Expression text, `*` for a star projection.
    pub expression: String,
    /// Output property name.
    pub alias: String,
    #[serde(skip)]
    span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
struct ClauseSpans {
    top: Option<Span>,
    offset_limit: Option<Span>,
}

/// The merge plan of a SELECT.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryPlan {
    /// DISTINCT flavour.
    pub distinct: DistinctKind,
    /// `SELECT VALUE`.
    pub value: bool,
    /// `TOP n`.
    pub top: Option<u64>,
    /// ORDER BY items.
    pub order_by: Vec<OrderByItem>,
    /// GROUP BY expressions.
    pub group_by: Vec<String>,
    /// Aggregates in the projection.
    pub aggregates: Vec<Aggregate>,
    /// `OFFSET n`.
    pub offset: Option<u64>,
    /// Effective row limit: `LIMIT m` folded with `TOP n`.
    pub limit: Option<u64>,
    /// Query to send to each partition instead of the original text.
    pub rewritten_query: Option<String>,
    /// Projected items; empty when the plan came from elsewhere.
    pub select_items: Vec<SelectItem>,
    #[serde(skip)]
    spans: ClauseSpans,
}

fn token_text<'a>(input: &'a str, tokens: &[Token]) -> &'a str {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => first.span.merge(last.span).slice(input).trim(),
        _ => "",
    }
}

/// Splits `tokens` on commas that are not nested in brackets.
fn split_top_level(tokens: &[Token]) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind.opens_group() {
            depth += 1;
        } else if token.kind.closes_group() {
            depth = depth.saturating_sub(1);
        } else if depth == 0 && token.kind == TokenKind::Comma {
            parts.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    parts.push(&tokens[start..]);
    parts.retain(|part| !part.is_empty());
    parts
}

/// `root(.name | ["name"] | [n])*` → the segments after the root.
fn path_of(input: &str, tokens: &[Token]) -> Option<Vec<String>> {
    let (first, mut rest) = tokens.split_first()?;
    if !matches!(first.kind, TokenKind::Identifier(_)) {
        return None;
    }
    let mut segments = Vec::new();
    loop {
        match rest {
            [] => return Some(segments),
            [dot, name, tail @ ..] if dot.kind == TokenKind::Dot => {
                match name.kind {
                    TokenKind::Identifier(_) | TokenKind::Keyword(_) => {
                        segments.push(name.span.slice(input).to_string());
                    }
                    _ => return None,
                }
                rest = tail;
            }
            [open, key, close, tail @ ..]
                if open.kind == TokenKind::LeftBracket && close.kind == TokenKind::RightBracket =>
            {
                match &key.kind {
                    TokenKind::String(s) => segments.push(s.clone()),
                    TokenKind::Integer(n) => segments.push(n.to_string()),
                    _ => return None,
                }
                rest = tail;
            }
            _ => return None,
        }
    }
}

/// Walks `path` through objects and arrays.
pub(crate) fn lookup_path<'v>(value: &'v JsonValue, path: &[String]) -> Option<&'v JsonValue> {
    path.iter().try_fold(value, |current, segment| match current {
        JsonValue::Object(map) => map.get(segment),
        JsonValue::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// `AGG( ... )` spanning the whole item.
fn aggregate_of<'a>(input: &'a str, tokens: &[Token]) -> Option<(AggregateKind, &'a str)> {
    let [head, open, inner @ .., close] = tokens else {
        return None;
    };
    let TokenKind::Keyword(keyword) = head.kind else {
        return None;
    };
    let kind = AggregateKind::from_keyword(keyword)?;
    if open.kind != TokenKind::LeftParen || close.kind != TokenKind::RightParen {
        return None;
    }
    let mut depth = 0usize;
    for token in inner {
        if token.kind.opens_group() {
            depth += 1;
        } else if token.kind.closes_group() {
            depth = depth.checked_sub(1)?;
        }
    }
    (depth == 0).then(|| (kind, token_text(input, inner)))
}

const fn can_end_expression(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Identifier(_)
            | TokenKind::String(_)
            | TokenKind::Integer(_)
            | TokenKind::Float(_)
            | TokenKind::Parameter(_)
            | TokenKind::RightParen
            | TokenKind::RightBracket
            | TokenKind::RightBrace
            | TokenKind::Keyword(Keyword::True | Keyword::False | Keyword::Null | Keyword::Undefined)
    )
}

/// The property name an alias token stands for; `AS 'Value'` names `Value`.
fn alias_name(input: &str, token: &Token) -> String {
    match &token.kind {
        TokenKind::String(name) => name.clone(),
        _ => token.span.slice(input).to_string(),
    }
}

/// Writes `name` back as alias text, quoting it unless it is a plain identifier.
fn alias_text(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && Keyword::from_str(name).is_none();
    if plain {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\\', "\\\\").replace('\'', "\\'"))
    }
}

/// Separates an item into its expression tokens and explicit alias, if any.
fn split_alias<'t>(input: &str, tokens: &'t [Token]) -> (&'t [Token], Option<String>) {
    match tokens {
        [expr @ .., as_kw, name] if !expr.is_empty() && as_kw.is_keyword(Keyword::As) => {
            (expr, Some(alias_name(input, name)))
        }
        [expr @ .., prev, name]
            if matches!(name.kind, TokenKind::Identifier(_)) && can_end_expression(&prev.kind) =>
        {
            (&tokens[..=expr.len()], Some(alias_name(input, name)))
        }
        _ => (tokens, None),
    }
}

fn resolve_count(token: Option<&Token>, params: &[QueryParam], clause: &str) -> Result<u64> {
    let token = token.ok_or_else(|| {
        CoreError::from(ParseError::unexpected_eof(format!("a {clause} count"), Span::default()))
    })?;
    let value = match &token.kind {
        TokenKind::Integer(n) => JsonValue::from(*n),
        TokenKind::Parameter(name) => params
            .iter()
            .find(|p| p.name.strip_prefix('@') == Some(name.as_str()))
            .map(|p| p.value.clone())
            .ok_or_else(|| CoreError::validation(format!("parameter @{name} is not bound")))?,
        other => {
            return Err(ParseError::unexpected(
                format!("a {clause} count"),
                format!("{other:?}"),
                token.span,
            )
            .into())
        }
    };
    value
        .as_u64()
        .ok_or_else(|| CoreError::validation(format!("{clause} must be a non-negative integer")))
}

impl QueryPlan {
    /// Infers the plan of `query`, resolving `@name` counts from `params`.
    ///
    /// # Errors
    ///
    /// Returns an error if the text cannot be tokenized or a TOP / OFFSET /
    /// LIMIT count is not a non-negative integer.
    pub fn infer(query: &str, params: &[QueryParam]) -> Result<Self> {
        let tokens = Lexer::new(query).tokenize();
        if let Some(bad) = tokens.iter().find(|t| matches!(t.kind, TokenKind::Error(_))) {
            if let TokenKind::Error(msg) = &bad.kind {
                return Err(ParseError::new(msg.clone(), bad.span).into());
            }
        }
        let tokens = &tokens[..tokens.len().saturating_sub(1)];
        let mut plan = Self::default();

        let mut pos = match tokens.first() {
            Some(t) if t.is_keyword(Keyword::Select) => 1,
            _ => {
                let found = token_text(query, tokens.get(..1).unwrap_or_default());
                return Err(ParseError::unexpected("SELECT", found, Span::default()).into());
            }
        };

        let mut distinct = false;
        loop {
            match tokens.get(pos) {
                Some(t) if t.is_keyword(Keyword::Distinct) => {
                    distinct = true;
                    pos += 1;
                }
                Some(t) if t.is_keyword(Keyword::Top) => {
                    plan.top = Some(resolve_count(tokens.get(pos + 1), params, "TOP")?);
                    let end = tokens.get(pos + 1).map_or(t.span, |n| n.span);
                    plan.spans.top = Some(t.span.merge(end));
                    pos += 2;
                }
                Some(t) if t.is_keyword(Keyword::Value) => {
                    plan.value = true;
                    pos += 1;
                }
                _ => break,
            }
        }
        if distinct {
            plan.distinct = if plan.value {
                DistinctKind::Value
            } else {
                DistinctKind::Document
            };
        }

        // Top-level clause markers after the projection.
        let mut markers: Vec<(usize, Keyword)> = Vec::new();
        let mut depth = 0usize;
        for (i, token) in tokens.iter().enumerate().skip(pos) {
            if token.kind.opens_group() {
                depth += 1;
            } else if token.kind.closes_group() {
                depth = depth.saturating_sub(1);
            } else if depth == 0 {
                if let TokenKind::Keyword(
                    kw @ (Keyword::From
                    | Keyword::Where
                    | Keyword::Order
                    | Keyword::Group
                    | Keyword::Offset
                    | Keyword::Limit),
                ) = token.kind
                {
                    markers.push((i, kw));
                }
            }
        }
        let region = |index: usize| -> &[Token] {
            let end = markers
                .iter()
                .map(|(i, _)| *i)
                .find(|i| *i > index)
                .unwrap_or(tokens.len());
            &tokens[index + 1..end]
        };

        let projection_end = markers.first().map_or(tokens.len(), |(i, _)| *i);
        plan.read_projection(query, &tokens[pos..projection_end]);

        for &(index, keyword) in &markers {
            match keyword {
                Keyword::Order | Keyword::Group => {
                    let body = region(index);
                    let Some((by, body)) = body.split_first() else {
                        continue;
                    };
                    if !by.is_keyword(Keyword::By) {
                        continue;
                    }
                    if keyword == Keyword::Order {
                        plan.order_by = split_top_level(body)
                            .into_iter()
                            .map(|item| order_item(query, item))
                            .collect();
                    } else {
                        plan.group_by = split_top_level(body)
                            .into_iter()
                            .map(|item| token_text(query, item).to_string())
                            .collect();
                    }
                }
                Keyword::Offset | Keyword::Limit => {
                    let count = resolve_count(tokens.get(index + 1), params, keyword.as_str())?;
                    if keyword == Keyword::Offset {
                        plan.offset = Some(count);
                    } else {
                        plan.limit = Some(count);
                    }
                    let end = tokens.get(index + 1).map_or(tokens[index].span, |t| t.span);
                    let span = tokens[index].span.merge(end);
                    plan.spans.offset_limit =
                        Some(plan.spans.offset_limit.map_or(span, |s| s.merge(span)));
                }
                _ => {}
            }
        }

        if let Some(top) = plan.top {
            plan.limit = Some(plan.limit.map_or(top, |limit| limit.min(top)));
        }
        Ok(plan)
    }

    fn read_projection(&mut self, input: &str, tokens: &[Token]) {
        let mut unnamed = 0;
        for item in split_top_level(tokens) {
            if let [only] = item {
                if only.kind == TokenKind::Star {
                    self.select_items.push(SelectItem {
                        expression: "*".into(),
                        alias: String::new(),
                        span: only.span,
                    });
                    continue;
                }
            }
            let (expr, alias) = split_alias(input, item);
            let alias = alias.unwrap_or_else(|| match path_of(input, expr) {
                Some(path) if !path.is_empty() => path[path.len() - 1].clone(),
                Some(_) => token_text(input, expr).to_string(),
                None => {
                    unnamed += 1;
                    format!("${unnamed}")
                }
            });
            if let Some((kind, argument)) = aggregate_of(input, expr) {
                self.aggregates.push(Aggregate {
                    alias: alias.clone(),
                    kind,
                    argument: argument.to_string(),
                });
            }
            self.select_items.push(SelectItem {
                expression: token_text(input, expr).to_string(),
                alias,
                span: item[0].span.merge(item[item.len() - 1].span),
            });
        }
    }

    /// The merge strategy this plan calls for.
    #[must_use]
    pub fn kind(&self) -> QueryKind {
        if !self.group_by.is_empty() || !self.aggregates.is_empty() {
            QueryKind::GroupBy
        } else if !self.order_by.is_empty() {
            QueryKind::OrderBy
        } else if self.distinct != DistinctKind::None {
            QueryKind::Distinct
        } else {
            QueryKind::Bare
        }
    }

    /// Returns true if the plan de-duplicates rows.
    #[must_use]
    pub fn is_distinct(&self) -> bool {
        self.distinct != DistinctKind::None
    }

    /// Takes the backend's view of the query, keeping locally inferred
    /// projection details the backend did not send.
    pub fn override_with(&mut self, backend: Self) {
        let select_items = std::mem::take(&mut self.select_items);
        let spans = self.spans;
        *self = backend;
        if self.select_items.is_empty() {
            self.select_items = select_items;
        }
        self.spans = spans;
    }

    /// The text each partition is queried with.
    ///
    /// OFFSET/LIMIT become `OFFSET 0 LIMIT offset+limit` so the global window
    /// can be cut after merging; DISTINCT and aggregate queries lose TOP and
    /// OFFSET/LIMIT entirely. `AVG(x)` is split into a sum and a count.
    ///
    /// # Errors
    ///
    /// Returns an error for `SELECT VALUE AVG(...)`, which cannot be split
    /// without a backend rewrite.
    pub fn partition_query(&self, original: &str) -> Result<String> {
        if let Some(rewritten) = &self.rewritten_query {
            return Ok(rewritten.clone());
        }
        let kind = self.kind();
        let windowed = matches!(kind, QueryKind::Bare | QueryKind::OrderBy) && !self.is_distinct();
        let mut edits: Vec<(Span, String)> = Vec::new();

        if let Some(span) = self.spans.offset_limit {
            let replacement = match (windowed, self.limit) {
                (true, Some(limit)) => {
                    format!("OFFSET 0 LIMIT {}", self.offset.unwrap_or(0).saturating_add(limit))
                }
                _ => String::new(),
            };
            edits.push((span, replacement));
        }
        if let (false, Some(span)) = (windowed, self.spans.top) {
            edits.push((span, String::new()));
        }
        for aggregate in self.aggregates.iter().filter(|a| a.kind == AggregateKind::Avg) {
            if self.value {
                return Err(CoreError::validation(
                    "SELECT VALUE AVG across partitions needs a backend query plan",
                ));
            }
            let Some(item) = self.select_items.iter().find(|i| i.alias == aggregate.alias) else {
                continue;
            };
            let arg = &aggregate.argument;
            let sum = alias_text(&format!("{}__sum", aggregate.alias));
            let count = alias_text(&format!("{}__count", aggregate.alias));
            edits.push((item.span, format!("SUM({arg}) AS {sum}, COUNT({arg}) AS {count}")));
        }

        edits.sort_by_key(|(span, _)| std::cmp::Reverse(span.start));
        let mut text = original.to_string();
        for (span, replacement) in edits {
            let mut end = span.end;
            if replacement.is_empty() {
                end += text
                    .get(end..)
                    .map_or(0, |rest| rest.len() - rest.trim_start().len());
            }
            if text.get(span.start..end).is_some() {
                text.replace_range(span.start..end, &replacement);
            }
        }
        Ok(text.trim_end().to_string())
    }

    /// The ORDER BY key values of a plain (not rewritten) row.
    #[must_use]
    pub fn order_key(&self, row: &JsonValue) -> Vec<Option<JsonValue>> {
        self.order_by
            .iter()
            .map(|item| {
                if !row.is_object() {
                    return Some(row.clone());
                }
                let projected = self
                    .select_items
                    .iter()
                    .find(|s| s.expression == item.expression && !s.alias.is_empty());
                match projected {
                    Some(s) => row.get(&s.alias).cloned(),
                    None if !item.path.is_empty() => lookup_path(row, &item.path).cloned(),
                    None => None,
                }
            })
            .collect()
    }

    /// Sort directions, one per ORDER BY item.
    #[must_use]
    pub fn descending(&self) -> Vec<bool> {
        self.order_by.iter().map(|item| item.descending).collect()
    }
}

fn order_item(input: &str, tokens: &[Token]) -> OrderByItem {
    let (expr, descending) = match tokens.split_last() {
        Some((last, rest)) if last.is_keyword(Keyword::Desc) => (rest, true),
        Some((last, rest)) if last.is_keyword(Keyword::Asc) => (rest, false),
        _ => (tokens, false),
    };
    OrderByItem {
        expression: token_text(input, expr).to_string(),
        path: path_of(input, expr).unwrap_or_default(),
        descending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan(query: &str) -> QueryPlan {
        QueryPlan::infer(query, &[]).unwrap_or_else(|e| panic!("{query}: {e}"))
    }

    #[test]
    fn test_bare() {
        let p = plan("SELECT * FROM c WHERE c.a > 1");
        assert_eq!(p.kind(), QueryKind::Bare);
        assert_eq!(p.select_items[0].expression, "*");
    }

    #[test]
    fn test_order_by() {
        let p = plan("SELECT c.id, c.age AS years FROM c ORDER BY c.age DESC, c[\"id\"]");
        assert_eq!(p.kind(), QueryKind::OrderBy);
        assert_eq!(p.order_by.len(), 2);
        assert!(p.order_by[0].descending);
        assert_eq!(p.order_by[1].path, vec!["id"]);
        assert_eq!(p.select_items[1].alias, "years");
        let key = p.order_key(&json!({"id": "x", "years": 30}));
        assert_eq!(key, vec![Some(json!(30)), Some(json!("x"))]);
    }

    #[test]
    fn test_distinct_value() {
        let p = plan("SELECT DISTINCT VALUE c.city FROM c");
        assert_eq!(p.distinct, DistinctKind::Value);
        assert_eq!(p.kind(), QueryKind::Distinct);
    }

    #[test]
    fn test_group_by_aggregates() {
        let p = plan("SELECT c.city, COUNT(1) AS n, AVG(c.age) mean FROM c GROUP BY c.city");
        assert_eq!(p.kind(), QueryKind::GroupBy);
        assert_eq!(p.group_by, vec!["c.city"]);
        assert_eq!(p.aggregates.len(), 2);
        assert_eq!(p.aggregates[1].kind, AggregateKind::Avg);
        assert_eq!(p.aggregates[1].argument, "c.age");
        assert_eq!(
            p.partition_query("SELECT c.city, COUNT(1) AS n, AVG(c.age) mean FROM c GROUP BY c.city")
                .unwrap(),
            "SELECT c.city, COUNT(1) AS n, SUM(c.age) AS mean__sum, COUNT(c.age) AS mean__count FROM c GROUP BY c.city"
        );
    }

    #[test]
    fn test_quoted_aliases() {
        let q = "SELECT c.category AS 'Category', count(1) AS 'Value', AVG(c.grade) AS 'Mean Grade' FROM c GROUP BY c.category";
        let p = plan(q);
        assert_eq!(p.select_items[0].alias, "Category");
        assert_eq!(p.aggregates[0].alias, "Value");
        assert_eq!(p.aggregates[1].alias, "Mean Grade");
        assert_eq!(
            p.partition_query(q).unwrap(),
            "SELECT c.category AS 'Category', count(1) AS 'Value', SUM(c.grade) AS 'Mean Grade__sum', COUNT(c.grade) AS 'Mean Grade__count' FROM c GROUP BY c.category"
        );
    }

    #[test]
    fn test_alias_text() {
        assert_eq!(alias_text("Value__sum"), "Value__sum");
        assert_eq!(alias_text("value"), "'value'");
        assert_eq!(alias_text("$1__sum"), "'$1__sum'");
        assert_eq!(alias_text("it's"), r"'it\'s'");
    }

    #[test]
    fn test_unnamed_aggregate() {
        let p = plan("SELECT COUNT(1) FROM c");
        assert_eq!(p.aggregates[0].alias, "$1");
        assert_eq!(p.kind(), QueryKind::GroupBy);
    }

    #[test]
    fn test_offset_limit_rewrite() {
        let q = "SELECT * FROM c ORDER BY c.id OFFSET 5 LIMIT 10";
        let p = plan(q);
        assert_eq!((p.offset, p.limit), (Some(5), Some(10)));
        assert_eq!(
            p.partition_query(q).unwrap(),
            "SELECT * FROM c ORDER BY c.id OFFSET 0 LIMIT 15"
        );
    }

    #[test]
    fn test_distinct_drops_window() {
        let q = "SELECT DISTINCT TOP 3 c.a FROM c";
        let p = plan(q);
        assert_eq!(p.limit, Some(3));
        assert_eq!(p.partition_query(q).unwrap(), "SELECT DISTINCT c.a FROM c");
    }

    #[test]
    fn test_parameter_counts() {
        let params = vec![QueryParam {
            name: "@_1".into(),
            value: json!(4),
        }];
        let p = QueryPlan::infer("SELECT * FROM c OFFSET 0 LIMIT @_1", &params).unwrap();
        assert_eq!(p.limit, Some(4));
        assert!(QueryPlan::infer("SELECT * FROM c OFFSET 0 LIMIT @_2", &params).is_err());
    }

    #[test]
    fn test_nested_keywords_ignored() {
        let p = plan("SELECT c.id, ARRAY(SELECT VALUE t FROM t IN c.tags ORDER BY t) AS tags FROM c");
        assert_eq!(p.kind(), QueryKind::Bare);
        assert_eq!(p.select_items[1].alias, "tags");
    }

    #[test]
    fn test_lookup_path() {
        let doc = json!({"a": {"b": [10, 20]}});
        let path = vec!["a".to_string(), "b".to_string(), "1".to_string()];
        assert_eq!(lookup_path(&doc, &path), Some(&json!(20)));
    }
}
