//! Per-collection resolution of source directives into candidates.

use std::time::Instant;

use futures::future::join_all;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::collection::{CollectionSpec, FilterSpec, SourceDirective};
use crate::config::DiscoverySettings;
use crate::metrics::{CANDIDATES_RESOLVED, SOURCE_FETCHES, SOURCE_FETCH_DURATION};

use super::{deduplicate_candidates, CandidateItem, DiscoveryRegistry, Resolution, SourceError};

/// Fetch limit for one directive.
///
/// Exclusion filters drop fetched items after the fact, so the requested limit
/// is scaled by `1 + 0.5 * exclusions`, capped at `max_multiplier`.
pub fn fetch_limit(base: u32, filters: &FilterSpec, max_multiplier: f32) -> u32 {
    let cap = f64::from(max_multiplier).max(1.0);
    let multiplier = (1.0 + 0.5 * filters.exclusion_count() as f64).min(cap);
    (base as f64 * multiplier).ceil() as u32
}

/// Resolves a collection's directives through the configured collaborators.
#[derive(Debug, Clone)]
pub struct SourceResolver {
    registry: DiscoveryRegistry,
    settings: DiscoverySettings,
}

impl SourceResolver {
    pub fn new(registry: DiscoveryRegistry, settings: DiscoverySettings) -> Self {
        Self { registry, settings }
    }

    /// Fetch every directive of `spec` and join the results in source order.
    ///
    /// A failing, unsupported or unconfigured directive is recorded in
    /// [`Resolution::errors`] and the remaining directives still contribute.
    pub async fn resolve(&self, spec: &CollectionSpec) -> Resolution {
        let outcomes = if self.settings.concurrent {
            join_all(spec.sources.iter().map(|d| self.fetch_one(spec, d))).await
        } else {
            let mut outcomes = Vec::with_capacity(spec.sources.len());
            for directive in &spec.sources {
                outcomes.push(self.fetch_one(spec, directive).await);
            }
            outcomes
        };

        let mut resolution = Resolution::default();
        let mut raw = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(items) => raw.extend(items),
                Err(error) => {
                    warn!("{}", error);
                    resolution.errors.push(error);
                }
            }
        }

        resolution.fetched = raw.len();
        resolution.candidates = deduplicate_candidates(raw);
        CANDIDATES_RESOLVED
            .with_label_values(&[])
            .observe(resolution.candidates.len() as f64);

        info!(
            "Collection '{}': {} candidates from {} sources ({} fetched, {} degraded)",
            spec.name,
            resolution.candidates.len(),
            spec.sources.len(),
            resolution.fetched,
            resolution.errors.len()
        );
        resolution
    }

    async fn fetch_one(
        &self,
        spec: &CollectionSpec,
        directive: &SourceDirective,
    ) -> Result<Vec<CandidateItem>, SourceError> {
        let key = directive.kind.key();
        let Some(provider) = directive.kind.provider() else {
            return Err(SourceError::Unsupported {
                collection: spec.name.clone(),
                directive: key.to_string(),
            });
        };
        let Some(collaborator) = self.registry.get(provider) else {
            SOURCE_FETCHES
                .with_label_values(&[provider.as_str(), "unavailable"])
                .inc();
            return Err(SourceError::Unavailable {
                collection: spec.name.clone(),
                directive: key.to_string(),
                message: format!("no collaborator configured for provider '{}'", provider),
            });
        };

        let base = directive.limit.unwrap_or(self.settings.default_limit);
        let limit = fetch_limit(base, &spec.filters, self.settings.max_limit_multiplier);
        debug!(
            "Fetching '{}' from {} (limit {}, base {})",
            key,
            collaborator.name(),
            limit,
            base
        );

        let start = Instant::now();
        let result = timeout(
            self.settings.timeout(),
            collaborator.fetch(directive, spec.kind, limit),
        )
        .await;
        SOURCE_FETCH_DURATION
            .with_label_values(&[provider.as_str()])
            .observe(start.elapsed().as_secs_f64());

        let items = match result {
            Ok(Ok(items)) => items,
            Ok(Err(error)) => {
                let error = SourceError::from_discovery(&spec.name, key, error);
                let label = match &error {
                    SourceError::RateLimited { .. } => "rate_limited",
                    SourceError::InvalidParameters { .. } => "invalid",
                    _ => "unavailable",
                };
                SOURCE_FETCHES
                    .with_label_values(&[provider.as_str(), label])
                    .inc();
                return Err(error);
            }
            Err(_) => {
                SOURCE_FETCHES
                    .with_label_values(&[provider.as_str(), "timeout"])
                    .inc();
                return Err(SourceError::Unavailable {
                    collection: spec.name.clone(),
                    directive: key.to_string(),
                    message: format!("timed out after {}s", self.settings.timeout_secs),
                });
            }
        };
        SOURCE_FETCHES
            .with_label_values(&[provider.as_str(), "ok"])
            .inc();

        let returned = items.len();
        let items: Vec<CandidateItem> = items
            .into_iter()
            .filter(|item| item.kind == spec.kind)
            .take(limit as usize)
            .collect();
        if items.len() < returned {
            debug!(
                "'{}' returned {} items, kept {} of kind {}",
                key,
                returned,
                items.len(),
                spec.kind
            );
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::collection::{DirectiveKind, Provider, TrendingWindow};
    use crate::media::{ExternalIds, MediaKind};
    use crate::source::DiscoveryError;
    use crate::testing::MockDiscovery;

    fn spec_with(sources: Vec<SourceDirective>) -> CollectionSpec {
        let mut spec = CollectionSpec::new("Trending", "Movies", MediaKind::Movie);
        spec.sources = sources;
        spec
    }

    fn movie(title: &str, year: u32, tmdb: u32) -> CandidateItem {
        CandidateItem::new(title, Some(year), MediaKind::Movie).with_ids(ExternalIds::tmdb(tmdb))
    }

    fn trending() -> SourceDirective {
        SourceDirective::new(DirectiveKind::TmdbTrending(TrendingWindow::Week)).with_limit(10)
    }

    fn trakt() -> SourceDirective {
        SourceDirective::new(DirectiveKind::TraktTrending).with_limit(10)
    }

    fn settings() -> DiscoverySettings {
        DiscoverySettings::default()
    }

    #[test]
    fn test_fetch_limit_scaling() {
        let mut filters = FilterSpec::default();
        assert_eq!(fetch_limit(20, &filters, 4.0), 20);

        filters.original_language_not = vec!["ja".into()];
        assert_eq!(fetch_limit(20, &filters, 4.0), 30);

        filters.origin_country_not = vec!["in".into(), "cn".into(), "kr".into()];
        assert_eq!(fetch_limit(20, &filters, 4.0), 60);

        filters.origin_country_not.extend(["jp".to_string(), "tw".to_string(), "hk".to_string()]);
        assert_eq!(fetch_limit(20, &filters, 4.0), 80);
        assert_eq!(fetch_limit(20, &filters, 2.5), 50);
    }

    #[tokio::test]
    async fn test_overlapping_sources_deduplicate() {
        let tmdb = Arc::new(MockDiscovery::new("tmdb"));
        tmdb.set_default_results(vec![movie("The Matrix", 1999, 603), movie("Heat", 1995, 949)])
            .await;
        let trakt_mock = Arc::new(MockDiscovery::new("trakt"));
        trakt_mock
            .set_default_results(vec![movie("the matrix", 1999, 603), movie("Alien", 1979, 348)])
            .await;

        let registry = DiscoveryRegistry::new()
            .with(Provider::Tmdb, tmdb.clone())
            .with(Provider::Trakt, trakt_mock.clone());
        let resolver = SourceResolver::new(registry, settings());

        let resolution = resolver.resolve(&spec_with(vec![trending(), trakt()])).await;
        let titles: Vec<_> = resolution
            .candidates
            .iter()
            .map(|c| c.title.as_str())
            .collect();
        assert_eq!(titles, vec!["The Matrix", "Heat", "Alien"]);
        assert_eq!(resolution.fetched, 4);
        assert!(resolution.errors.is_empty());
    }

    #[tokio::test]
    async fn test_failing_source_degrades_gracefully() {
        let tmdb = Arc::new(MockDiscovery::new("tmdb"));
        tmdb.set_next_error(DiscoveryError::RateLimited("slow down".into()))
            .await;
        let trakt_mock = Arc::new(MockDiscovery::new("trakt"));
        trakt_mock.set_default_results(vec![movie("Alien", 1979, 348)]).await;

        let registry = DiscoveryRegistry::new()
            .with(Provider::Tmdb, tmdb)
            .with(Provider::Trakt, trakt_mock);
        let resolver = SourceResolver::new(registry, settings());

        let resolution = resolver.resolve(&spec_with(vec![trending(), trakt()])).await;
        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(resolution.errors.len(), 1);
        assert!(matches!(
            &resolution.errors[0],
            SourceError::RateLimited { directive, .. } if directive == "tmdb_trending_weekly"
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_and_unsupported_sources() {
        let tmdb = Arc::new(MockDiscovery::new("tmdb"));
        tmdb.set_default_results(vec![movie("Heat", 1995, 949)]).await;
        let resolver =
            SourceResolver::new(DiscoveryRegistry::new().with(Provider::Tmdb, tmdb), settings());

        let unsupported = SourceDirective::new(DirectiveKind::Unsupported("letterboxd_list".into()));
        let resolution = resolver
            .resolve(&spec_with(vec![trakt(), unsupported, trending()]))
            .await;

        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(resolution.errors.len(), 2);
        assert!(matches!(resolution.errors[0], SourceError::Unavailable { .. }));
        assert!(matches!(resolution.errors[1], SourceError::Unsupported { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_unavailable() {
        let tmdb = Arc::new(MockDiscovery::new("tmdb"));
        tmdb.set_default_results(vec![movie("Heat", 1995, 949)]).await;
        tmdb.set_delay(Duration::from_secs(5)).await;
        let trakt_mock = Arc::new(MockDiscovery::new("trakt"));
        trakt_mock.set_default_results(vec![movie("Alien", 1979, 348)]).await;

        let registry = DiscoveryRegistry::new()
            .with(Provider::Tmdb, tmdb)
            .with(Provider::Trakt, trakt_mock);
        let resolver = SourceResolver::new(
            registry,
            DiscoverySettings {
                timeout_secs: 1,
                ..settings()
            },
        );

        let resolution = resolver.resolve(&spec_with(vec![trending(), trakt()])).await;
        assert_eq!(resolution.candidates.len(), 1);
        assert_eq!(resolution.candidates[0].title, "Alien");
        assert!(matches!(
            &resolution.errors[0],
            SourceError::Unavailable { message, .. } if message.contains("timed out")
        ));
    }

    #[tokio::test]
    async fn test_sequential_mode_keeps_order_and_passes_limit() {
        let tmdb = Arc::new(MockDiscovery::new("tmdb"));
        tmdb.set_default_results((1..=50).map(|i| movie(&format!("M{}", i), 2000, i)).collect())
            .await;
        let resolver = SourceResolver::new(
            DiscoveryRegistry::new().with(Provider::Tmdb, tmdb.clone()),
            DiscoverySettings {
                concurrent: false,
                ..settings()
            },
        );

        let mut spec = spec_with(vec![trending()]);
        spec.filters.original_language_not = vec!["ja".into()];
        let resolution = resolver.resolve(&spec).await;

        assert_eq!(resolution.candidates.len(), 15);
        let fetches = tmdb.recorded_fetches().await;
        assert_eq!(fetches.len(), 1);
        assert_eq!(fetches[0].limit, 15);
        assert_eq!(fetches[0].kind, MediaKind::Movie);
    }

    #[tokio::test]
    async fn test_wrong_kind_dropped() {
        let tmdb = Arc::new(MockDiscovery::new("tmdb"));
        tmdb.set_default_results(vec![
            movie("Heat", 1995, 949),
            CandidateItem::new("Fargo", Some(2014), MediaKind::Series),
        ])
        .await;
        let resolver =
            SourceResolver::new(DiscoveryRegistry::new().with(Provider::Tmdb, tmdb), settings());
        let resolution = resolver.resolve(&spec_with(vec![trending()])).await;
        assert_eq!(resolution.candidates.len(), 1);
    }
}
