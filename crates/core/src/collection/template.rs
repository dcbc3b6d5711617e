//! Template references, variable substitution and field-wise merging.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::ConfigError;

/// Resolution hops allowed before a chain is treated as cyclic.
pub const MAX_TEMPLATE_DEPTH: usize = 32;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<<\s*([A-Za-z0-9_]+)\s*>>").unwrap());

/// Named templates visible to a library's collections.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Mapping>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or shadow) a template.
    pub fn insert(&mut self, name: &str, body: Mapping) {
        self.templates.insert(name.to_string(), body);
    }

    pub fn get(&self, name: &str) -> Option<&Mapping> {
        self.templates.get(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// A `template:` reference with its call-site variables.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRef {
    pub name: String,
    pub vars: Mapping,
}

/// Parse a `template:` value: a name, `{name: X, var: value}`, or a list of those.
pub fn template_refs(collection: &str, value: &Value) -> Result<Vec<TemplateRef>, ConfigError> {
    let items: Vec<&Value> = match value {
        Value::Sequence(seq) => seq.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::String(name) => Ok(TemplateRef {
                name: name.trim().to_string(),
                vars: Mapping::new(),
            }),
            Value::Mapping(map) => {
                let name = map
                    .get("name")
                    .and_then(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .ok_or_else(|| ConfigError::InvalidField {
                        collection: collection.to_string(),
                        field: "template".to_string(),
                        message: "template reference is missing 'name'".to_string(),
                    })?;
                let mut vars = map.clone();
                vars.remove("name");
                Ok(TemplateRef { name, vars })
            }
            _ => Err(ConfigError::InvalidField {
                collection: collection.to_string(),
                field: "template".to_string(),
                message: "expected a template name or mapping".to_string(),
            }),
        })
        .collect()
}

/// Resolve a collection body against its templates.
///
/// Templates are merged in declaration order; the collection's own fields are
/// applied last and always win.
pub fn resolve_collection(
    collection: &str,
    body: &Mapping,
    registry: &TemplateRegistry,
) -> Result<(Mapping, Vec<String>), ConfigError> {
    let refs = match body.get("template") {
        Some(value) => template_refs(collection, value)?,
        None => Vec::new(),
    };

    let mut merged = Mapping::new();
    let mut applied = Vec::new();
    for template_ref in &refs {
        let mut chain = Vec::new();
        let expanded = expand(
            collection,
            template_ref,
            &Mapping::new(),
            registry,
            &mut chain,
        )?;
        merge_into(&mut merged, expanded);
        applied.push(template_ref.name.clone());
    }

    let mut own = body.clone();
    own.remove("template");
    merge_into(&mut merged, own);

    Ok((merged, applied))
}

fn expand(
    collection: &str,
    template_ref: &TemplateRef,
    inherited_vars: &Mapping,
    registry: &TemplateRegistry,
    chain: &mut Vec<String>,
) -> Result<Mapping, ConfigError> {
    if chain.len() >= MAX_TEMPLATE_DEPTH || chain.contains(&template_ref.name) {
        chain.push(template_ref.name.clone());
        return Err(ConfigError::CyclicTemplate {
            collection: collection.to_string(),
            chain: chain.join(" -> "),
        });
    }

    let template = registry
        .get(&template_ref.name)
        .ok_or_else(|| ConfigError::UnknownTemplate {
            collection: collection.to_string(),
            template: template_ref.name.clone(),
        })?;

    let mut body = template.clone();
    let defaults = match body.remove("default") {
        Some(Value::Mapping(map)) => map,
        _ => Mapping::new(),
    };
    let nested = body.remove("template");

    let mut vars = defaults;
    merge_into(&mut vars, inherited_vars.clone());
    merge_into(&mut vars, template_ref.vars.clone());

    let mut merged = Mapping::new();
    if let Some(nested) = nested {
        let nested = substitute(nested, &vars);
        chain.push(template_ref.name.clone());
        for nested_ref in template_refs(collection, &nested)? {
            let expanded = expand(collection, &nested_ref, &vars, registry, chain)?;
            merge_into(&mut merged, expanded);
        }
        chain.pop();
    }

    if let Value::Mapping(body) = substitute(Value::Mapping(body), &vars) {
        merge_into(&mut merged, body);
    }

    debug!(
        "Expanded template '{}' for collection '{}'",
        template_ref.name, collection
    );
    Ok(merged)
}

/// Overlay `src` onto `target` field by field. `filters` merges per filter key.
pub fn merge_into(target: &mut Mapping, src: Mapping) {
    for (key, value) in src {
        if key.as_str() == Some("filters") {
            if let (Some(Value::Mapping(existing)), Value::Mapping(incoming)) =
                (target.get_mut(&key), &value)
            {
                for (fk, fv) in incoming {
                    existing.insert(fk.clone(), fv.clone());
                }
                continue;
            }
        }
        target.insert(key, value);
    }
}

/// Replace `<<var>>` placeholders in string values.
///
/// A string made of a single placeholder takes the variable's value with its
/// type; embedded placeholders are replaced by the scalar's text. Unknown
/// placeholders are left in place.
pub fn substitute(value: Value, vars: &Mapping) -> Value {
    match value {
        Value::String(s) => substitute_str(s, vars),
        Value::Sequence(seq) => {
            Value::Sequence(seq.into_iter().map(|v| substitute(v, vars)).collect())
        }
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, substitute(v, vars)))
                .collect(),
        ),
        other => other,
    }
}

fn substitute_str(s: String, vars: &Mapping) -> Value {
    if let Some(caps) = PLACEHOLDER.captures(s.trim()) {
        let whole = caps.get(0).map(|m| m.as_str().len()) == Some(s.trim().len());
        if whole {
            if let Some(v) = vars.get(&caps[1]) {
                return v.clone();
            }
        }
    }

    let replaced = PLACEHOLDER.replace_all(&s, |caps: &Captures| {
        match vars.get(&caps[1]).and_then(scalar_text) {
            Some(text) => text,
            None => {
                debug!("Unresolved template placeholder {}", &caps[0]);
                caps[0].to_string()
            }
        }
    });
    Value::String(replaced.into_owned())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(text: &str) -> Mapping {
        serde_yaml::from_str(text).unwrap()
    }

    fn registry(text: &str) -> TemplateRegistry {
        let mut registry = TemplateRegistry::new();
        for (k, v) in mapping(text) {
            if let (Some(name), Value::Mapping(body)) = (k.as_str(), v) {
                registry.insert(name, body);
            }
        }
        registry
    }

    #[test]
    fn test_template_ref_forms() {
        let refs = template_refs("c", &serde_yaml::from_str("base").unwrap()).unwrap();
        assert_eq!(refs[0].name, "base");

        let refs = template_refs(
            "c",
            &serde_yaml::from_str("[{name: a, year: 2020}, b]").unwrap(),
        )
        .unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "a");
        assert_eq!(refs[0].vars.get("year"), Some(&Value::from(2020)));
        assert_eq!(refs[1].name, "b");
    }

    #[test]
    fn test_collection_fields_override_templates() {
        let reg = registry(
            r#"
t1: {sync_mode: append, summary: from t1, minimum_items: 3}
t2: {sync_mode: sync, sort_title: from t2}
"#,
        );
        let body = mapping("{template: [t1, t2], sync_mode: append, summary: own}");
        let (merged, applied) = resolve_collection("c", &body, &reg).unwrap();

        assert_eq!(applied, vec!["t1", "t2"]);
        assert_eq!(merged.get("sync_mode").unwrap().as_str(), Some("append"));
        assert_eq!(merged.get("summary").unwrap().as_str(), Some("own"));
        assert_eq!(merged.get("sort_title").unwrap().as_str(), Some("from t2"));
        assert_eq!(merged.get("minimum_items").unwrap().as_u64(), Some(3));
        assert!(merged.get("template").is_none());
    }

    #[test]
    fn test_later_template_wins_for_overlapping_fields() {
        let reg = registry("{t1: {summary: one}, t2: {summary: two}}");
        let body = mapping("{template: [t1, t2]}");
        let (merged, _) = resolve_collection("c", &body, &reg).unwrap();
        assert_eq!(merged.get("summary").unwrap().as_str(), Some("two"));
    }

    #[test]
    fn test_filters_merge_per_key() {
        let reg = registry("{t: {filters: {year.gte: 2000, original_language.not: ja}}}");
        let body = mapping("{template: t, filters: {year.gte: 2010}}");
        let (merged, _) = resolve_collection("c", &body, &reg).unwrap();
        let filters = merged.get("filters").unwrap().as_mapping().unwrap();
        assert_eq!(filters.get("year.gte").unwrap().as_u64(), Some(2010));
        assert_eq!(
            filters.get("original_language.not").unwrap().as_str(),
            Some("ja")
        );
    }

    #[test]
    fn test_variable_substitution() {
        let reg = registry(
            r#"
decade:
  default: {label: Films}
  summary: "<<label>> from the <<decade>>s"
  filters: {year.gte: "<<decade>>"}
"#,
        );
        let body = mapping("{template: {name: decade, decade: 1990}}");
        let (merged, _) = resolve_collection("c", &body, &reg).unwrap();
        assert_eq!(
            merged.get("summary").unwrap().as_str(),
            Some("Films from the 1990s")
        );
        let filters = merged.get("filters").unwrap().as_mapping().unwrap();
        assert_eq!(filters.get("year.gte").unwrap().as_u64(), Some(1990));
    }

    #[test]
    fn test_unresolved_placeholder_kept() {
        let vars = Mapping::new();
        let v = substitute(Value::String("hello <<who>>".into()), &vars);
        assert_eq!(v.as_str(), Some("hello <<who>>"));
    }

    #[test]
    fn test_nested_templates() {
        let reg = registry(
            r#"
base: {sync_mode: append, summary: base}
child: {template: base, summary: child}
"#,
        );
        let body = mapping("{template: child}");
        let (merged, _) = resolve_collection("c", &body, &reg).unwrap();
        assert_eq!(merged.get("summary").unwrap().as_str(), Some("child"));
        assert_eq!(merged.get("sync_mode").unwrap().as_str(), Some("append"));
    }

    #[test]
    fn test_cycle_detected() {
        let reg = registry("{a: {template: b}, b: {template: a}}");
        let body = mapping("{template: a}");
        let err = resolve_collection("Loop", &body, &reg).unwrap_err();
        match err {
            ConfigError::CyclicTemplate { collection, chain } => {
                assert_eq!(collection, "Loop");
                assert_eq!(chain, "a -> b -> a");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_deep_chain_within_bound_resolves() {
        let mut reg = TemplateRegistry::new();
        for i in 0..20 {
            let body = mapping(&format!("{{template: t{}, depth_{}: true}}", i + 1, i));
            reg.insert(&format!("t{}", i), body);
        }
        reg.insert("t20", mapping("{summary: bottom}"));
        let (merged, _) = resolve_collection("deep", &mapping("{template: t0}"), &reg).unwrap();
        assert_eq!(merged.get("summary").unwrap().as_str(), Some("bottom"));
    }

    #[test]
    fn test_chain_beyond_bound_is_cyclic() {
        let mut reg = TemplateRegistry::new();
        for i in 0..40 {
            reg.insert(&format!("t{}", i), mapping(&format!("{{template: t{}}}", i + 1)));
        }
        reg.insert("t40", Mapping::new());
        let err = resolve_collection("deep", &mapping("{template: t0}"), &reg).unwrap_err();
        assert!(matches!(err, ConfigError::CyclicTemplate { .. }));
    }

    #[test]
    fn test_unknown_template() {
        let err = resolve_collection("c", &mapping("{template: ghost}"), &TemplateRegistry::new())
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTemplate { .. }));
    }
}
