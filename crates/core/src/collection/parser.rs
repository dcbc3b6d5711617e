//! Root config and collection file parsing.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::NaiveDate;
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

use super::directive::{as_count, describe, id_list, normalize_directive, string_list};
use super::schedule::parse_schedule;
use super::template::{resolve_collection, TemplateRegistry};
use super::types::{
    AcquisitionOptions, CollectionOrder, CollectionSpec, DirectiveKind, FilterSpec, LibrarySpec,
    ScheduleRule, SourceDirective, SyncMode,
};
use super::ConfigError;
use crate::media::MediaKind;

const ROOT_DOCUMENT: &str = "config.yml";

/// A collection-level or file-level error that did not abort the parse.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigIssue {
    pub library: String,
    pub file: Option<String>,
    pub error: ConfigError,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "[{} / {}] {}", self.library, file, self.error),
            None => write!(f, "[{}] {}", self.library, self.error),
        }
    }
}

/// Output of a collection tree parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedConfig {
    /// Libraries in declaration order.
    pub libraries: Vec<LibrarySpec>,
    /// Files and collections that were skipped.
    pub errors: Vec<ConfigIssue>,
}

impl ParsedConfig {
    pub fn library(&self, name: &str) -> Option<&LibrarySpec> {
        self.libraries.iter().find(|l| l.name == name)
    }

    pub fn collection(&self, library: &str, name: &str) -> Option<&CollectionSpec> {
        self.library(library)
            .and_then(|l| l.collections.iter().find(|c| c.name == name))
    }

    pub fn collection_count(&self) -> usize {
        self.libraries.iter().map(|l| l.collections.len()).sum()
    }
}

struct LibraryDecl {
    name: String,
    kind: MediaKind,
    files: Vec<String>,
    movie_acquisition: AcquisitionOptions,
    series_acquisition: AcquisitionOptions,
}

/// Parse the root config and the collection files it references.
///
/// `files` maps each referenced path (as written, minus any leading `config/`)
/// to its text. A malformed root document fails the whole parse; problems in a
/// single file or collection are recorded in [`ParsedConfig::errors`].
pub fn parse_collection_tree(
    root_text: &str,
    files: &HashMap<String, String>,
) -> Result<ParsedConfig, ConfigError> {
    let decls = parse_root(root_text)?;
    let mut parsed = ParsedConfig::default();

    for decl in decls {
        let library = parse_library(&decl, files, &mut parsed.errors);
        info!(
            "Parsed library '{}' ({}): {} collections",
            library.name,
            library.kind,
            library.collections.len()
        );
        parsed.libraries.push(library);
    }

    Ok(parsed)
}

/// Collection file paths referenced by the root config, normalized.
pub fn referenced_files(root_text: &str) -> Result<Vec<String>, ConfigError> {
    let decls = parse_root(root_text)?;
    let mut seen = HashSet::new();
    Ok(decls
        .into_iter()
        .flat_map(|d| d.files)
        .filter(|f| seen.insert(f.clone()))
        .collect())
}

/// Read `config.yml` and every referenced collection file from `config_dir`.
///
/// Unreadable collection files are left out so the parse reports them as
/// missing for the library that references them.
pub fn load_collection_tree(config_dir: &Path) -> Result<ParsedConfig, ConfigError> {
    let root_path = config_dir.join(ROOT_DOCUMENT);
    let root_text = std::fs::read_to_string(&root_path).map_err(|e| ConfigError::Io {
        path: root_path.display().to_string(),
        message: e.to_string(),
    })?;

    let mut files = HashMap::new();
    for rel in referenced_files(&root_text)? {
        let path = config_dir.join(&rel);
        match std::fs::read_to_string(&path) {
            Ok(text) => {
                files.insert(rel, text);
            }
            Err(e) => debug!("Could not read {}: {}", path.display(), e),
        }
    }

    parse_collection_tree(&root_text, &files)
}

fn parse_root(root_text: &str) -> Result<Vec<LibraryDecl>, ConfigError> {
    let root: Value = serde_yaml::from_str(root_text).map_err(|e| ConfigError::Yaml {
        document: ROOT_DOCUMENT.to_string(),
        message: e.to_string(),
    })?;

    let libraries = match root.get("libraries") {
        Some(Value::Mapping(map)) => map,
        Some(Value::Null) => return Ok(Vec::new()),
        _ => {
            return Err(ConfigError::Yaml {
                document: ROOT_DOCUMENT.to_string(),
                message: "expected a 'libraries' mapping".to_string(),
            })
        }
    };

    let mut decls = Vec::new();
    for (key, body) in libraries {
        let Some(name) = scalar_key(key) else {
            warn!("Skipping library with non-scalar name {}", describe(key));
            continue;
        };

        let kind = body
            .get("media_type")
            .and_then(Value::as_str)
            .and_then(parse_media_kind)
            .unwrap_or_else(|| MediaKind::infer_from_library_name(&name));

        let files = match body.get("collection_files") {
            Some(Value::Sequence(entries)) => entries.iter().filter_map(file_reference).collect(),
            Some(other) => file_reference(other).into_iter().collect(),
            None => Vec::new(),
        };

        decls.push(LibraryDecl {
            movie_acquisition: acquisition_options(body.get("radarr")),
            series_acquisition: acquisition_options(body.get("sonarr")),
            name,
            kind,
            files,
        });
    }

    Ok(decls)
}

fn parse_media_kind(value: &str) -> Option<MediaKind> {
    match value.trim().to_lowercase().as_str() {
        "movie" | "movies" | "film" | "films" => Some(MediaKind::Movie),
        "show" | "shows" | "series" | "tv" => Some(MediaKind::Series),
        _ => None,
    }
}

fn file_reference(entry: &Value) -> Option<String> {
    let raw = match entry {
        Value::String(s) => s.as_str(),
        Value::Mapping(map) => map.get("file").and_then(Value::as_str)?,
        _ => return None,
    };
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    let trimmed = trimmed.strip_prefix("config/").unwrap_or(trimmed);
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn acquisition_options(value: Option<&Value>) -> AcquisitionOptions {
    let Some(Value::Mapping(map)) = value else {
        return AcquisitionOptions::default();
    };
    let text = |key: &str| {
        map.get(key)
            .and_then(scalar_text)
            .filter(|s| !s.is_empty())
    };
    AcquisitionOptions {
        root_folder: text("root_folder_path"),
        quality_profile: text("quality_profile"),
        tag: text("tag"),
    }
}

fn parse_library(
    decl: &LibraryDecl,
    files: &HashMap<String, String>,
    issues: &mut Vec<ConfigIssue>,
) -> LibrarySpec {
    let mut registry = TemplateRegistry::new();
    let mut collections: Vec<CollectionSpec> = Vec::new();

    for path in &decl.files {
        let mut record = |error: ConfigError| {
            warn!("{}", error);
            issues.push(ConfigIssue {
                library: decl.name.clone(),
                file: Some(path.clone()),
                error,
            });
        };

        let Some(text) = files.get(path) else {
            record(ConfigError::MissingFile {
                library: decl.name.clone(),
                path: path.clone(),
            });
            continue;
        };

        let document: Value = match serde_yaml::from_str(text) {
            Ok(doc) => doc,
            Err(e) => {
                record(ConfigError::Yaml {
                    document: path.clone(),
                    message: e.to_string(),
                });
                continue;
            }
        };

        if let Some(Value::Mapping(templates)) = document.get("templates") {
            for (key, body) in templates {
                match (scalar_key(key), body) {
                    (Some(name), Value::Mapping(body)) => registry.insert(&name, body.clone()),
                    (Some(name), _) => warn!("Template '{}' in {} is not a mapping", name, path),
                    (None, _) => warn!("Skipping template with non-scalar name in {}", path),
                }
            }
        }

        let Some(Value::Mapping(entries)) = document.get("collections") else {
            debug!("{} declares no collections", path);
            continue;
        };

        for (key, body) in entries {
            let Some(name) = scalar_key(key) else {
                warn!("Skipping collection with non-scalar name in {}", path);
                continue;
            };
            if collections.iter().any(|c| c.name == name) {
                record(ConfigError::InvalidField {
                    collection: name,
                    field: "name".to_string(),
                    message: "duplicate collection name in library".to_string(),
                });
                continue;
            }
            match build_collection(decl, &name, body, &registry) {
                Ok(spec) => collections.push(spec),
                Err(error) => record(error),
            }
        }
    }

    LibrarySpec {
        name: decl.name.clone(),
        kind: decl.kind,
        collections,
    }
}

fn build_collection(
    decl: &LibraryDecl,
    name: &str,
    body: &Value,
    registry: &TemplateRegistry,
) -> Result<CollectionSpec, ConfigError> {
    let body = match body {
        Value::Mapping(map) => map.clone(),
        Value::Null => Mapping::new(),
        other => {
            return Err(invalid(
                name,
                "collection",
                format!("expected a mapping, got {}", describe(other)),
            ))
        }
    };

    let (resolved, templates) = resolve_collection(name, &body, registry)?;

    let mut spec = CollectionSpec::new(name, &decl.name, decl.kind);
    spec.templates = templates;
    spec.movie_acquisition = decl.movie_acquisition.clone();
    spec.series_acquisition = decl.series_acquisition.clone();

    for (key, value) in &resolved {
        let Some(key) = key.as_str() else {
            warn!("Collection '{}': ignoring non-string key {}", name, describe(key));
            continue;
        };
        apply_field(&mut spec, key, value)?;
    }

    debug!(
        "Collection '{}': {} sources, schedule {}, mode {:?}",
        spec.name,
        spec.sources.len(),
        spec.schedule,
        spec.sync_mode
    );
    Ok(spec)
}

fn apply_field(spec: &mut CollectionSpec, key: &str, value: &Value) -> Result<(), ConfigError> {
    let name = spec.name.clone();
    match key {
        "summary" => spec.summary = scalar_text(value),
        "sort_title" => spec.sort_title = scalar_text(value),
        "poster" | "file_poster" => spec.poster = scalar_text(value),
        "visible_library" => spec.visibility.library = as_bool(&name, key, value)?,
        "visible_home" => spec.visibility.home = as_bool(&name, key, value)?,
        "visible_shared" => spec.visibility.shared = as_bool(&name, key, value)?,
        "collection_order" => {
            let raw = scalar_text(value).unwrap_or_default();
            spec.order = CollectionOrder::parse(&raw).unwrap_or_else(|| {
                warn!(
                    "Collection '{}': unknown collection_order '{}', using custom",
                    name, raw
                );
                CollectionOrder::Custom
            });
        }
        "sync_mode" => {
            spec.sync_mode = match scalar_text(value).as_deref().map(str::trim) {
                Some("sync") => SyncMode::Sync,
                Some("append") => SyncMode::Append,
                _ => {
                    return Err(invalid(
                        &name,
                        key,
                        format!("expected 'sync' or 'append', got {}", describe(value)),
                    ))
                }
            }
        }
        "minimum_items" => {
            spec.minimum_items = as_count(value)
                .ok_or_else(|| invalid(&name, key, format!("expected a count, got {}", describe(value))))?;
        }
        "limit" => {
            spec.limit = Some(as_count(value).ok_or_else(|| {
                invalid(&name, key, format!("expected a count, got {}", describe(value)))
            })?);
        }
        "schedule" => spec.schedule = schedule_value(&name, value)?,
        "filters" => {
            spec.filters = match value {
                Value::Mapping(map) => parse_filters(&name, map)?,
                Value::Null => FilterSpec::default(),
                other => {
                    return Err(invalid(
                        &name,
                        key,
                        format!("expected a mapping, got {}", describe(other)),
                    ))
                }
            }
        }
        "delete_not_scheduled" => {
            debug!("Collection '{}': delete_not_scheduled has no effect", name);
        }
        "item_radarr_tag" => {
            if let Some(tag) = scalar_text(value).filter(|t| !t.is_empty()) {
                spec.movie_acquisition.tag = Some(tag);
            }
        }
        "item_sonarr_tag" => {
            if let Some(tag) = scalar_text(value).filter(|t| !t.is_empty()) {
                spec.series_acquisition.tag = Some(tag);
            }
        }
        other => {
            let kind = DirectiveKind::from_key(other).unwrap_or_else(|| {
                warn!(
                    "Collection '{}': unsupported key '{}' kept as unsupported directive",
                    name, other
                );
                DirectiveKind::Unsupported(other.to_string())
            });
            let directive: Option<SourceDirective> = normalize_directive(kind, value)
                .map_err(|e| invalid(&name, other, e.0))?;
            if let Some(directive) = directive {
                spec.sources.push(directive);
            }
        }
    }
    Ok(())
}

fn schedule_value(collection: &str, value: &Value) -> Result<ScheduleRule, ConfigError> {
    let raw = match value {
        Value::Null => return Ok(ScheduleRule::Never),
        Value::String(s) => s.clone(),
        other => describe(other),
    };
    parse_schedule(&raw).ok_or_else(|| ConfigError::BadSchedule {
        collection: collection.to_string(),
        value: raw,
    })
}

/// Parse a `filters:` mapping. Unknown keys are kept for diagnostics.
pub(crate) fn parse_filters(collection: &str, map: &Mapping) -> Result<FilterSpec, ConfigError> {
    let mut filters = FilterSpec::default();

    for (key, value) in map {
        let Some(key) = key.as_str() else {
            filters.unknown_keys.push(describe(key));
            continue;
        };
        let count = || {
            as_count(value).ok_or_else(|| {
                invalid(collection, key, format!("expected a number, got {}", describe(value)))
            })
        };
        let rating = || {
            as_rating(value).ok_or_else(|| {
                invalid(collection, key, format!("expected a rating, got {}", describe(value)))
            })
        };
        let genres = || {
            id_list(value, ',').ok_or_else(|| {
                invalid(collection, key, format!("expected genre ids, got {}", describe(value)))
            })
        };
        let date = || {
            value
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
                .ok_or_else(|| {
                    invalid(collection, key, format!("expected YYYY-MM-DD, got {}", describe(value)))
                })
        };

        match key {
            "year.gte" => filters.year_gte = Some(count()?),
            "year.lte" => filters.year_lte = Some(count()?),
            "vote_average.gte" => filters.vote_average_gte = Some(rating()?),
            "vote_average.lte" => filters.vote_average_lte = Some(rating()?),
            "tmdb_vote_count.gte" | "vote_count.gte" => filters.vote_count_gte = Some(count()?),
            "critic_rating.gte" => filters.critic_rating_gte = Some(rating()?),
            "release_date.gte" => filters.release_date_gte = Some(date()?),
            "release_date.lte" => filters.release_date_lte = Some(date()?),
            "with_genres" => filters.with_genres = genres()?,
            "without_genres" => filters.without_genres = genres()?,
            "original_language" => filters.original_language = code_list(value),
            "original_language.not" => filters.original_language_not = code_list(value),
            "origin_country.not" | "country.not" => {
                filters.origin_country_not.extend(code_list(value))
            }
            other => {
                warn!("Collection '{}': unknown filter key '{}'", collection, other);
                filters.unknown_keys.push(other.to_string());
            }
        }
    }

    Ok(filters)
}

/// Language or country codes: list or comma-separated string, lowercased.
fn code_list(value: &Value) -> Vec<String> {
    string_list(value)
        .iter()
        .flat_map(|s| s.split(','))
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn as_rating(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(collection: &str, field: &str, value: &Value) -> Result<bool, ConfigError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            _ => Err(invalid(collection, field, format!("expected a boolean, got '{}'", s))),
        },
        other => Err(invalid(
            collection,
            field,
            format!("expected a boolean, got {}", describe(other)),
        )),
    }
}

fn scalar_key(key: &Value) -> Option<String> {
    scalar_text(key).filter(|s| !s.is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn invalid(collection: &str, field: &str, message: String) -> ConfigError {
    ConfigError::InvalidField {
        collection: collection.to_string(),
        field: field.to_string(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    const ROOT: &str = r#"
libraries:
  Movies:
    collection_files:
      - config/movies.yml
    radarr:
      root_folder_path: /data/movies
      quality_profile: HD-1080p
      tag: curated
  TV Shows:
    collection_files:
      - file: shows.yml
    sonarr:
      root_folder_path: /data/tv
"#;

    fn files(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_referenced_files_strip_prefix() {
        let refs = referenced_files(ROOT).unwrap();
        assert_eq!(refs, vec!["movies.yml", "shows.yml"]);
    }

    #[test]
    fn test_library_kinds_and_acquisition() {
        let movies = r#"
collections:
  Trending:
    tmdb_trending_weekly: 30
    item_radarr_tag: trending
"#;
        let parsed = parse_collection_tree(
            ROOT,
            &files(&[("movies.yml", movies), ("shows.yml", "collections: {}")]),
        )
        .unwrap();

        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.libraries[0].kind, MediaKind::Movie);
        assert_eq!(parsed.libraries[1].kind, MediaKind::Series);

        let spec = parsed.collection("Movies", "Trending").unwrap();
        assert_eq!(spec.movie_acquisition.root_folder.as_deref(), Some("/data/movies"));
        assert_eq!(spec.movie_acquisition.quality_profile.as_deref(), Some("HD-1080p"));
        assert_eq!(spec.movie_acquisition.tag.as_deref(), Some("trending"));
        assert_eq!(spec.sources.len(), 1);
        assert_eq!(spec.sources[0].limit, Some(30));
        assert_eq!(spec.schedule, ScheduleRule::Daily);
    }

    #[test]
    fn test_missing_file_is_recorded_and_other_libraries_continue() {
        let parsed =
            parse_collection_tree(ROOT, &files(&[("shows.yml", "collections: {A: {}}")])).unwrap();

        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].library, "Movies");
        assert!(matches!(
            &parsed.errors[0].error,
            ConfigError::MissingFile { path, .. } if path == "movies.yml"
        ));
        assert_eq!(parsed.library("TV Shows").unwrap().collections.len(), 1);
    }

    #[test]
    fn test_malformed_root_fails() {
        let result = parse_collection_tree("libraries: [oops", &HashMap::new());
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));

        let result = parse_collection_tree("settings: {}", &HashMap::new());
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn test_bad_schedule_skips_only_that_collection() {
        let movies = r#"
collections:
  Good:
    schedule: weekly(sunday)
    tmdb_popular: 10
  Bad:
    schedule: fortnightly
    tmdb_popular: 10
"#;
        let parsed = parse_collection_tree(ROOT, &files(&[("movies.yml", movies)])).unwrap();
        let good = parsed.collection("Movies", "Good").unwrap();
        assert_eq!(good.schedule, ScheduleRule::Weekly(Weekday::Sun));
        assert!(parsed.collection("Movies", "Bad").is_none());
        assert!(parsed.errors.iter().any(|i| matches!(
            &i.error,
            ConfigError::BadSchedule { collection, value } if collection == "Bad" && value == "fortnightly"
        )));
    }

    #[test]
    fn test_empty_schedule_is_never() {
        let movies = "collections:\n  Off:\n    schedule: ''\n";
        let parsed = parse_collection_tree(ROOT, &files(&[("movies.yml", movies)])).unwrap();
        assert_eq!(
            parsed.collection("Movies", "Off").unwrap().schedule,
            ScheduleRule::Never
        );
    }

    #[test]
    fn test_collection_fields() {
        let movies = r#"
collections:
  Best:
    summary: The best
    sort_title: "!Best"
    poster: best.jpg
    visible_home: true
    collection_order: release
    sync_mode: append
    minimum_items: 5
    limit: 50
    filters:
      year.gte: 1990
      vote_average.gte: 7.5
      original_language.not: [ja, ko]
      country.not: "in, cn"
      with_genres: "28,12"
      release_date.lte: 2020-01-01
      sparkle: true
"#;
        let parsed = parse_collection_tree(ROOT, &files(&[("movies.yml", movies)])).unwrap();
        let spec = parsed.collection("Movies", "Best").unwrap();
        assert_eq!(spec.summary.as_deref(), Some("The best"));
        assert_eq!(spec.sort_title.as_deref(), Some("!Best"));
        assert_eq!(spec.poster.as_deref(), Some("best.jpg"));
        assert!(spec.visibility.home);
        assert_eq!(spec.order, CollectionOrder::ReleaseDate);
        assert_eq!(spec.sync_mode, SyncMode::Append);
        assert_eq!(spec.minimum_items, 5);
        assert_eq!(spec.limit, Some(50));
        assert_eq!(spec.filters.year_gte, Some(1990));
        assert_eq!(spec.filters.vote_average_gte, Some(7.5));
        assert_eq!(spec.filters.original_language_not, vec!["ja", "ko"]);
        assert_eq!(spec.filters.origin_country_not, vec!["in", "cn"]);
        assert_eq!(spec.filters.with_genres, vec![28, 12]);
        assert_eq!(
            spec.filters.release_date_lte,
            NaiveDate::from_ymd_opt(2020, 1, 1)
        );
        assert_eq!(spec.filters.unknown_keys, vec!["sparkle"]);
        assert!(spec.sources.is_empty());
    }

    #[test]
    fn test_unknown_collection_key_becomes_unsupported_directive() {
        let movies = r#"
collections:
  Odd:
    letterboxd_list: https://example.org/list
    tmdb_popular: 5
"#;
        let parsed = parse_collection_tree(ROOT, &files(&[("movies.yml", movies)])).unwrap();
        let spec = parsed.collection("Movies", "Odd").unwrap();
        let unsupported: Vec<_> = spec.unsupported_sources().collect();
        assert_eq!(unsupported.len(), 1);
        assert_eq!(unsupported[0].kind.key(), "letterboxd_list");
        assert_eq!(spec.sources.len(), 2);
    }

    #[test]
    fn test_delete_not_scheduled_is_accepted_without_directive() {
        let movies = r#"
collections:
  Weekly:
    delete_not_scheduled: true
    schedule: weekly(monday)
    tmdb_popular: 5
"#;
        let parsed = parse_collection_tree(ROOT, &files(&[("movies.yml", movies)])).unwrap();
        let spec = parsed.collection("Movies", "Weekly").unwrap();
        assert_eq!(spec.unsupported_sources().count(), 0);
        assert_eq!(spec.sources.len(), 1);
        assert_eq!(spec.sources[0].kind.key(), "tmdb_popular");
    }

    #[test]
    fn test_templates_across_files_and_shadowing() {
        let root = r#"
libraries:
  Movies:
    collection_files: [base.yml, more.yml]
"#;
        let base = r#"
templates:
  std: {sync_mode: append, summary: base std}
collections:
  First: {template: std}
"#;
        let more = r#"
templates:
  std: {summary: shadowed std}
collections:
  Second: {template: std}
"#;
        let parsed =
            parse_collection_tree(root, &files(&[("base.yml", base), ("more.yml", more)])).unwrap();
        let first = parsed.collection("Movies", "First").unwrap();
        let second = parsed.collection("Movies", "Second").unwrap();
        assert_eq!(first.summary.as_deref(), Some("base std"));
        assert_eq!(first.sync_mode, SyncMode::Append);
        assert_eq!(second.summary.as_deref(), Some("shadowed std"));
        assert_eq!(second.sync_mode, SyncMode::Sync);
        assert_eq!(second.templates, vec!["std"]);
    }

    #[test]
    fn test_duplicate_collection_name_rejected() {
        let root = "libraries:\n  Movies:\n    collection_files: [a.yml, b.yml]\n";
        let parsed = parse_collection_tree(
            root,
            &files(&[
                ("a.yml", "collections: {Dup: {summary: a}}"),
                ("b.yml", "collections: {Dup: {summary: b}}"),
            ]),
        )
        .unwrap();
        let lib = parsed.library("Movies").unwrap();
        assert_eq!(lib.collections.len(), 1);
        assert_eq!(lib.collections[0].summary.as_deref(), Some("a"));
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.errors[0].file.as_deref(), Some("b.yml"));
    }

    #[test]
    fn test_invalid_yaml_file_recorded() {
        let parsed =
            parse_collection_tree(ROOT, &files(&[("movies.yml", "collections: [unclosed")]))
                .unwrap();
        assert!(parsed
            .errors
            .iter()
            .any(|i| matches!(i.error, ConfigError::Yaml { .. })));
    }

    #[test]
    fn test_load_collection_tree_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.yml"),
            "libraries:\n  Movies:\n    collection_files: [config/movies.yml]\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("movies.yml"),
            "collections:\n  Popular:\n    tmdb_popular: 20\n",
        )
        .unwrap();

        let parsed = load_collection_tree(dir.path()).unwrap();
        assert_eq!(parsed.collection_count(), 1);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_load_collection_tree_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_collection_tree(dir.path());
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
