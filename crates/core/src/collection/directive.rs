//! Normalization of builder keys into [`SourceDirective`] values.

use chrono::NaiveDate;
use serde_json::{json, Value as JsonValue};
use serde_yaml::Value;
use tracing::warn;

use super::types::{DirectiveKind, SourceDirective};

/// `tmdb_discover` parameters copied through unchanged.
const DISCOVER_PASSTHROUGH: &[&str] = &[
    "sort_by",
    "vote_average.gte",
    "vote_average.lte",
    "vote_count.gte",
    "vote_count.lte",
    "watch_region",
    "with_watch_monetization_types",
    "with_original_language",
    "with_release_type",
    "region",
    "with_status",
];

const DISCOVER_DATES: &[&str] = &[
    "primary_release_date.gte",
    "primary_release_date.lte",
    "first_air_date.gte",
    "first_air_date.lte",
];

/// Reason a builder value could not be normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveValueError(pub String);

/// Normalize one builder key/value pair.
///
/// Returns `Ok(None)` when the builder is configured but empty (for example an
/// IMDb list with no ids), which is skipped with a warning.
pub fn normalize_directive(
    kind: DirectiveKind,
    value: &Value,
) -> Result<Option<SourceDirective>, DirectiveValueError> {
    let directive = match kind {
        DirectiveKind::TmdbTrending(_)
        | DirectiveKind::TmdbPopular
        | DirectiveKind::TraktTrending
        | DirectiveKind::TraktPopular => {
            let limit = as_count(value).ok_or_else(|| {
                DirectiveValueError(format!("expected an item count, got {}", describe(value)))
            })?;
            SourceDirective::new(kind).with_limit(limit)
        }
        DirectiveKind::TmdbDiscover => normalize_discover(value)?,
        DirectiveKind::TmdbList => {
            let ids = string_list(value);
            if ids.is_empty() {
                return Ok(skip_empty(&kind));
            }
            SourceDirective::new(kind).with_param("list_ids", json!(ids))
        }
        DirectiveKind::TraktList | DirectiveKind::MdblistList => {
            let lists = string_list(value);
            if lists.is_empty() {
                return Ok(skip_empty(&kind));
            }
            SourceDirective::new(kind).with_param("lists", json!(lists))
        }
        DirectiveKind::ImdbChart | DirectiveKind::ImdbList => {
            match list_builder(kind.clone(), value, "list_ids")? {
                Some(d) => d,
                None => return Ok(skip_empty(&kind)),
            }
        }
        DirectiveKind::RadarrTaglist | DirectiveKind::SonarrTaglist => {
            match list_builder(kind.clone(), value, "tags")? {
                Some(d) => d,
                None => return Ok(skip_empty(&kind)),
            }
        }
        DirectiveKind::TraktChart | DirectiveKind::LibrarySearch => {
            let Value::Mapping(map) = value else {
                return Err(DirectiveValueError(format!(
                    "expected a mapping, got {}",
                    describe(value)
                )));
            };
            let mut directive = SourceDirective::new(kind);
            for (k, v) in map {
                let key = key_str(k)?;
                if key == "limit" {
                    directive.limit = as_count(v);
                    continue;
                }
                directive.parameters.insert(key.to_string(), to_json(v)?);
            }
            directive
        }
        DirectiveKind::Unsupported(_) => {
            SourceDirective::new(kind).with_param("value", to_json(value)?)
        }
    };

    Ok(Some(directive))
}

fn skip_empty(kind: &DirectiveKind) -> Option<SourceDirective> {
    warn!("Builder '{}' has no usable entries, skipping", kind.key());
    None
}

fn normalize_discover(value: &Value) -> Result<SourceDirective, DirectiveValueError> {
    let Value::Mapping(map) = value else {
        return Err(DirectiveValueError(format!(
            "tmdb_discover expects a mapping, got {}",
            describe(value)
        )));
    };

    let mut directive = SourceDirective::new(DirectiveKind::TmdbDiscover);

    if let Some(limit) = map.get("limit") {
        directive.limit = Some(as_count(limit).ok_or_else(|| {
            DirectiveValueError(format!("limit must be a count, got {}", describe(limit)))
        })?);
    }

    for field in DISCOVER_PASSTHROUGH {
        if let Some(v) = map.get(*field) {
            directive.parameters.insert(field.to_string(), to_json(v)?);
        }
    }

    for field in ["with_genres", "without_genres"] {
        if let Some(v) = map.get(field) {
            let ids = id_list(v, ',')
                .ok_or_else(|| DirectiveValueError(format!("{} must list genre ids", field)))?;
            directive.parameters.insert(field.to_string(), json!(ids));
        }
    }

    if let Some(v) = map.get("with_watch_providers") {
        let ids = id_list(v, '|').ok_or_else(|| {
            DirectiveValueError("with_watch_providers must list provider ids".to_string())
        })?;
        directive
            .parameters
            .insert("with_watch_providers".to_string(), json!(ids));
    }

    for field in DISCOVER_DATES {
        let Some(v) = map.get(*field) else {
            continue;
        };
        match v.as_str().map(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")) {
            Some(Ok(date)) => {
                directive
                    .parameters
                    .insert(field.to_string(), json!(date.format("%Y-%m-%d").to_string()));
            }
            _ => warn!("Invalid date format for {}: {}", field, describe(v)),
        }
    }

    Ok(directive)
}

/// Builders of the form `{<list_key>: [...], limit: N}` or a bare scalar/list.
fn list_builder(
    kind: DirectiveKind,
    value: &Value,
    list_key: &str,
) -> Result<Option<SourceDirective>, DirectiveValueError> {
    let (entries, limit) = match value {
        Value::Mapping(map) => {
            let entries = map.get(list_key).map(string_list).unwrap_or_default();
            let limit = map.get("limit").and_then(as_count);
            (entries, limit)
        }
        other => (string_list(other), None),
    };

    if entries.is_empty() {
        return Ok(None);
    }

    let mut directive = SourceDirective::new(kind).with_param(list_key, json!(entries));
    directive.limit = limit;
    Ok(Some(directive))
}

/// Scalar or sequence into a list of trimmed, non-empty strings.
pub(crate) fn string_list(value: &Value) -> Vec<String> {
    let items: Vec<&Value> = match value {
        Value::Sequence(seq) => seq.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    };

    items
        .into_iter()
        .filter_map(scalar_string)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Integer, `sep`-separated string, or sequence of integers.
pub(crate) fn id_list(value: &Value, sep: char) -> Option<Vec<u32>> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).map(|n| vec![n]),
        Value::String(s) => s
            .split(sep)
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<u32>().ok())
            .collect(),
        Value::Sequence(seq) => seq
            .iter()
            .map(|v| match v {
                Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .collect(),
        _ => None,
    }
}

pub(crate) fn as_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn key_str(key: &Value) -> Result<&str, DirectiveValueError> {
    key.as_str()
        .ok_or_else(|| DirectiveValueError(format!("non-string key {}", describe(key))))
}

pub(crate) fn to_json(value: &Value) -> Result<JsonValue, DirectiveValueError> {
    serde_json::to_value(value).map_err(|e| DirectiveValueError(e.to_string()))
}

pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("'{}'", s),
        Value::Sequence(_) => "a list".to_string(),
        Value::Mapping(_) => "a mapping".to_string(),
        Value::Tagged(t) => format!("tagged value {}", t.tag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::types::TrendingWindow;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_scalar_count_becomes_limit() {
        let d = normalize_directive(
            DirectiveKind::TmdbTrending(TrendingWindow::Week),
            &yaml("20"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(d.limit, Some(20));
        assert!(d.parameters.is_empty());
    }

    #[test]
    fn test_scalar_count_rejects_mapping() {
        let err = normalize_directive(DirectiveKind::TmdbPopular, &yaml("{a: 1}")).unwrap_err();
        assert!(err.0.contains("item count"));
    }

    #[test]
    fn test_discover_normalization() {
        let value = yaml(
            r#"
sort_by: popularity.desc
with_genres: "28,12"
without_genres: 16
with_watch_providers: "8|337"
primary_release_date.gte: "2020-01-01"
first_air_date.lte: "not-a-date"
limit: 40
"#,
        );
        let d = normalize_directive(DirectiveKind::TmdbDiscover, &value)
            .unwrap()
            .unwrap();
        assert_eq!(d.limit, Some(40));
        assert_eq!(d.parameters["sort_by"], json!("popularity.desc"));
        assert_eq!(d.parameters["with_genres"], json!([28, 12]));
        assert_eq!(d.parameters["without_genres"], json!([16]));
        assert_eq!(d.parameters["with_watch_providers"], json!([8, 337]));
        assert_eq!(d.parameters["primary_release_date.gte"], json!("2020-01-01"));
        assert!(!d.parameters.contains_key("first_air_date.lte"));
        assert!(!d.parameters.contains_key("limit"));
    }

    #[test]
    fn test_imdb_builder_forms() {
        let bare = normalize_directive(DirectiveKind::ImdbList, &yaml("ls123"))
            .unwrap()
            .unwrap();
        assert_eq!(bare.parameters["list_ids"], json!(["ls123"]));
        assert_eq!(bare.limit, None);

        let full = normalize_directive(
            DirectiveKind::ImdbChart,
            &yaml("{list_ids: [top, ' moviemeter '], limit: 50}"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(full.parameters["list_ids"], json!(["top", "moviemeter"]));
        assert_eq!(full.limit, Some(50));

        let empty = normalize_directive(DirectiveKind::ImdbList, &yaml("{limit: 5}")).unwrap();
        assert!(empty.is_none());
    }

    #[test]
    fn test_tag_builder() {
        let d = normalize_directive(DirectiveKind::RadarrTaglist, &yaml("[kids, family]"))
            .unwrap()
            .unwrap();
        assert_eq!(d.parameters["tags"], json!(["kids", "family"]));
    }

    #[test]
    fn test_chart_lifts_limit() {
        let d = normalize_directive(
            DirectiveKind::TraktChart,
            &yaml("{chart: watched, time_period: weekly, limit: 15}"),
        )
        .unwrap()
        .unwrap();
        assert_eq!(d.limit, Some(15));
        assert_eq!(d.parameters["chart"], json!("watched"));
        assert_eq!(d.parameters["time_period"], json!("weekly"));
    }

    #[test]
    fn test_unsupported_preserves_value() {
        let d = normalize_directive(
            DirectiveKind::Unsupported("letterboxd_list".to_string()),
            &yaml("https://letterboxd.com/x/list/y"),
        )
        .unwrap()
        .unwrap();
        assert!(!d.is_supported());
        assert_eq!(d.parameters["value"], json!("https://letterboxd.com/x/list/y"));
    }

    #[test]
    fn test_id_list_rejects_garbage() {
        assert_eq!(id_list(&yaml("\"28,abc\""), ','), None);
        assert_eq!(id_list(&yaml("[1, 2]"), ','), Some(vec![1, 2]));
    }
}
