//! Request-scoped list parameters and their parsing from bracketed query strings:
//! `id=5,7`, `filter[name]=app`, `filter[price][from]=1`, `sort[field]=price`,
//! `sort[order]=DESC`, `pagination[page]=2`, `pagination[perPage]=20`.

use crate::store::SortDirection;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Debug, PartialEq)]
pub enum FilterValue {
    Exact(Value),
    /// Inclusive on both ends; a missing bound is open.
    Range { from: Option<Value>, to: Option<Value> },
}

impl FilterValue {
    /// An object whose keys are only `from`/`to` is a range; anything else is exact.
    pub fn from_json(v: Value) -> Self {
        match v {
            Value::Object(mut m) if !m.is_empty() && m.keys().all(|k| k == "from" || k == "to") => {
                let nonnull = |v: Option<Value>| v.filter(|v| !v.is_null());
                FilterValue::Range {
                    from: nonnull(m.remove("from")),
                    to: nonnull(m.remove("to")),
                }
            }
            other => FilterValue::Exact(other),
        }
    }
}

impl<'de> Deserialize<'de> for FilterValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(FilterValue::from_json)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SortParam {
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default, alias = "order")]
    pub direction: SortDirection,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PaginationParams {
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default, alias = "perPage")]
    pub per_page: Option<u64>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub filter: IndexMap<String, FilterValue>,
    #[serde(default)]
    pub sort: SortParam,
    #[serde(default)]
    pub pagination: PaginationParams,
}

/// Parsed `GET /{prefix}/{alias}` query: optional identifier set plus list parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ListQuery {
    pub ids: Option<Vec<Value>>,
    pub params: ListParams,
}

/// Split `filter[price][from]` into `("filter", ["price", "from"])`.
fn split_key(key: &str) -> (&str, Vec<&str>) {
    let Some(open) = key.find('[') else {
        return (key, Vec::new());
    };
    let head = &key[..open];
    let parts = key[open..]
        .split('[')
        .filter(|p| !p.is_empty())
        .map(|p| p.trim_end_matches(']'))
        .collect();
    (head, parts)
}

/// Comma-separated or repeated ids; blanks dropped.
pub fn parse_ids(raw: &str) -> Vec<Value> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| Value::String(s.to_string()))
        .collect()
}

/// Numbers parse leniently: a malformed page or per-page value falls back to the default.
fn parse_number(raw: &str) -> Option<u64> {
    let n = raw.trim().parse::<i64>().ok()?;
    Some(u64::try_from(n).unwrap_or(0))
}

impl ListQuery {
    /// Unknown keys are ignored.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut ids: Option<Vec<Value>> = None;
        let mut params = ListParams::default();
        for (key, raw) in pairs {
            let (head, parts) = split_key(key);
            match (head, parts.as_slice()) {
                ("id", []) | ("id", [""]) | ("ids", []) | ("ids", [""]) => {
                    ids.get_or_insert_with(Vec::new).extend(parse_ids(raw));
                }
                ("filter", [field]) => {
                    params
                        .filter
                        .insert(field.to_string(), FilterValue::Exact(Value::String(raw.to_string())));
                }
                ("filter", [field, bound @ ("from" | "to")]) => {
                    let entry = params
                        .filter
                        .entry(field.to_string())
                        .or_insert(FilterValue::Range { from: None, to: None });
                    if !matches!(entry, FilterValue::Range { .. }) {
                        *entry = FilterValue::Range { from: None, to: None };
                    }
                    if let FilterValue::Range { from, to } = entry {
                        let slot = if *bound == "from" { from } else { to };
                        *slot = (!raw.trim().is_empty()).then(|| Value::String(raw.to_string()));
                    }
                }
                ("sort", ["field"]) => params.sort.field = Some(raw.to_string()).filter(|s| !s.is_empty()),
                ("sort", ["order" | "direction"]) => params.sort.direction = SortDirection::parse_lenient(raw),
                ("pagination", ["page"]) | ("page", []) => params.pagination.page = parse_number(raw),
                ("pagination", ["perPage" | "per_page"]) | ("per_page", []) | ("perPage", []) => {
                    params.pagination.per_page = parse_number(raw)
                }
                _ => {}
            }
        }
        ListQuery { ids, params }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(q: &[(&str, &str)]) -> ListQuery {
        ListQuery::from_pairs(q.iter().copied())
    }

    #[test]
    fn ids_accept_commas_and_repeats() {
        let q = parse(&[("id", "5, 7"), ("id[]", "9"), ("id", "")]);
        assert_eq!(q.ids, Some(vec![json!("5"), json!("7"), json!("9")]));
        assert_eq!(parse(&[]).ids, None);
    }

    #[test]
    fn filters_exact_and_range() {
        let q = parse(&[
            ("filter[name]", "app"),
            ("filter[price][from]", "1"),
            ("filter[price][to]", "9.5"),
            ("filter[qty][to]", "3"),
        ]);
        assert_eq!(q.params.filter["name"], FilterValue::Exact(json!("app")));
        assert_eq!(
            q.params.filter["price"],
            FilterValue::Range { from: Some(json!("1")), to: Some(json!("9.5")) }
        );
        assert_eq!(q.params.filter["qty"], FilterValue::Range { from: None, to: Some(json!("3")) });
    }

    #[test]
    fn sort_and_pagination() {
        let q = parse(&[
            ("sort[field]", "price"),
            ("sort[order]", "desc"),
            ("pagination[page]", "3"),
            ("pagination[perPage]", "500"),
        ]);
        assert_eq!(q.params.sort.field.as_deref(), Some("price"));
        assert_eq!(q.params.sort.direction, SortDirection::Desc);
        assert_eq!(q.params.pagination.page, Some(3));
        assert_eq!(q.params.pagination.per_page, Some(500));
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let q = parse(&[("pagination[page]", "x"), ("pagination[perPage]", "-4")]);
        assert_eq!(q.params.pagination.page, None);
        assert_eq!(q.params.pagination.per_page, Some(0));
    }

    #[test]
    fn json_body_form_deserializes() {
        let params: ListParams = serde_json::from_value(json!({
            "filter": {"price": {"from": 1, "to": 5}, "name": "x", "tags": ["a"]},
            "sort": {"field": "name", "order": "DESC"},
            "pagination": {"page": 2, "perPage": 5}
        }))
        .unwrap();
        assert_eq!(
            params.filter["price"],
            FilterValue::Range { from: Some(json!(1)), to: Some(json!(5)) }
        );
        assert_eq!(params.filter["tags"], FilterValue::Exact(json!(["a"])));
        assert_eq!(params.sort.direction, SortDirection::Desc);
        assert_eq!(params.pagination.per_page, Some(5));
    }
}
