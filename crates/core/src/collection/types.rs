//! Normalized, template-resolved collection definitions.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::media::MediaKind;

/// How the desired set is applied to current membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// Desired set replaces membership: items are added and removed.
    #[default]
    Sync,
    /// Desired set is only ever added.
    Append,
}

/// When a collection is eligible for re-evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleRule {
    Daily,
    Weekly(Weekday),
    /// Day of month (1-31). Months shorter than the day fire on their last day.
    Monthly(u32),
    Never,
}

impl Default for ScheduleRule {
    fn default() -> Self {
        ScheduleRule::Daily
    }
}

impl fmt::Display for ScheduleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleRule::Daily => f.write_str("daily"),
            ScheduleRule::Weekly(day) => {
                write!(f, "weekly({})", weekday_name(*day))
            }
            ScheduleRule::Monthly(day) => write!(f, "monthly({})", day),
            ScheduleRule::Never => f.write_str("never"),
        }
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// Ordering applied to the desired items of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionOrder {
    /// Keep discovery source order.
    #[default]
    Custom,
    /// Alphabetical by sort name, falling back to title.
    SortName,
    /// Newest release first.
    ReleaseDate,
    /// Most recently added to the library first.
    DateAdded,
    /// Highest community rating first.
    CommunityRating,
    /// Highest critic rating first.
    CriticRating,
}

impl CollectionOrder {
    /// Parse a `collection_order` value. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        let order = match value.trim().to_lowercase().as_str() {
            "custom" => CollectionOrder::Custom,
            "alpha" | "alphabetical" | "sortname" | "sort_name" | "name" => {
                CollectionOrder::SortName
            }
            "release" | "premieredate" | "release_date" | "date" => CollectionOrder::ReleaseDate,
            "added" | "datecreated" | "date_added" => CollectionOrder::DateAdded,
            "rating" | "communityrating" | "audience_rating" => CollectionOrder::CommunityRating,
            "critic" | "criticrating" | "critic_rating" => CollectionOrder::CriticRating,
            _ => return None,
        };
        Some(order)
    }

    /// Display-order hint understood by the inventory service.
    pub fn display_order(&self) -> &'static str {
        match self {
            CollectionOrder::Custom => "Default",
            CollectionOrder::SortName => "SortName",
            // Newest-first insertion order is kept by the inventory's default order.
            CollectionOrder::ReleaseDate => "Default",
            CollectionOrder::DateAdded => "DateCreated",
            CollectionOrder::CommunityRating => "CommunityRating",
            CollectionOrder::CriticRating => "CommunityRating",
        }
    }
}

/// Discovery provider a directive is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Tmdb,
    Trakt,
    Mdblist,
    Imdb,
    Radarr,
    Sonarr,
    /// The inventory library itself.
    Library,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Tmdb => "tmdb",
            Provider::Trakt => "trakt",
            Provider::Mdblist => "mdblist",
            Provider::Imdb => "imdb",
            Provider::Radarr => "radarr",
            Provider::Sonarr => "sonarr",
            Provider::Library => "library",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trending window for TMDb trending directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendingWindow {
    Day,
    Week,
}

/// Closed set of discovery builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    TmdbTrending(TrendingWindow),
    TmdbPopular,
    TmdbDiscover,
    TmdbList,
    TraktTrending,
    TraktPopular,
    TraktChart,
    TraktList,
    MdblistList,
    ImdbChart,
    ImdbList,
    RadarrTaglist,
    SonarrTaglist,
    LibrarySearch,
    /// A key that is not a recognised collection field or builder.
    Unsupported(String),
}

impl DirectiveKind {
    /// Map a collection key to its builder kind, if it names one.
    pub fn from_key(key: &str) -> Option<Self> {
        let kind = match key {
            "tmdb_trending_weekly" => DirectiveKind::TmdbTrending(TrendingWindow::Week),
            "tmdb_trending_daily" => DirectiveKind::TmdbTrending(TrendingWindow::Day),
            "tmdb_popular" => DirectiveKind::TmdbPopular,
            "tmdb_discover" => DirectiveKind::TmdbDiscover,
            "tmdb_list" => DirectiveKind::TmdbList,
            "trakt_trending" => DirectiveKind::TraktTrending,
            "trakt_popular" => DirectiveKind::TraktPopular,
            "trakt_chart" => DirectiveKind::TraktChart,
            "trakt_list" => DirectiveKind::TraktList,
            "mdblist_list" => DirectiveKind::MdblistList,
            "imdb_chart" => DirectiveKind::ImdbChart,
            "imdb_list" => DirectiveKind::ImdbList,
            "radarr_taglist" => DirectiveKind::RadarrTaglist,
            "sonarr_taglist" => DirectiveKind::SonarrTaglist,
            "plex_search" => DirectiveKind::LibrarySearch,
            _ => return None,
        };
        Some(kind)
    }

    /// The configuration key this kind was declared with.
    pub fn key(&self) -> &str {
        match self {
            DirectiveKind::TmdbTrending(TrendingWindow::Week) => "tmdb_trending_weekly",
            DirectiveKind::TmdbTrending(TrendingWindow::Day) => "tmdb_trending_daily",
            DirectiveKind::TmdbPopular => "tmdb_popular",
            DirectiveKind::TmdbDiscover => "tmdb_discover",
            DirectiveKind::TmdbList => "tmdb_list",
            DirectiveKind::TraktTrending => "trakt_trending",
            DirectiveKind::TraktPopular => "trakt_popular",
            DirectiveKind::TraktChart => "trakt_chart",
            DirectiveKind::TraktList => "trakt_list",
            DirectiveKind::MdblistList => "mdblist_list",
            DirectiveKind::ImdbChart => "imdb_chart",
            DirectiveKind::ImdbList => "imdb_list",
            DirectiveKind::RadarrTaglist => "radarr_taglist",
            DirectiveKind::SonarrTaglist => "sonarr_taglist",
            DirectiveKind::LibrarySearch => "plex_search",
            DirectiveKind::Unsupported(key) => key,
        }
    }

    /// Provider serving this kind; `None` for unsupported keys.
    pub fn provider(&self) -> Option<Provider> {
        let provider = match self {
            DirectiveKind::TmdbTrending(_)
            | DirectiveKind::TmdbPopular
            | DirectiveKind::TmdbDiscover
            | DirectiveKind::TmdbList => Provider::Tmdb,
            DirectiveKind::TraktTrending
            | DirectiveKind::TraktPopular
            | DirectiveKind::TraktChart
            | DirectiveKind::TraktList => Provider::Trakt,
            DirectiveKind::MdblistList => Provider::Mdblist,
            DirectiveKind::ImdbChart | DirectiveKind::ImdbList => Provider::Imdb,
            DirectiveKind::RadarrTaglist => Provider::Radarr,
            DirectiveKind::SonarrTaglist => Provider::Sonarr,
            DirectiveKind::LibrarySearch => Provider::Library,
            DirectiveKind::Unsupported(_) => return None,
        };
        Some(provider)
    }
}

/// One normalized discovery builder invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDirective {
    pub kind: DirectiveKind,
    /// Builder parameters after normalization (genre lists, dates, list ids...).
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Item count requested from the provider, when the directive sets one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl SourceDirective {
    pub fn new(kind: DirectiveKind) -> Self {
        Self {
            kind,
            parameters: BTreeMap::new(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_param(mut self, key: &str, value: serde_json::Value) -> Self {
        self.parameters.insert(key.to_string(), value);
        self
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self.kind, DirectiveKind::Unsupported(_))
    }
}

/// Post-fetch predicates. Every configured predicate must hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub year_gte: Option<u32>,
    pub year_lte: Option<u32>,
    pub vote_average_gte: Option<f32>,
    pub vote_average_lte: Option<f32>,
    pub vote_count_gte: Option<u32>,
    pub critic_rating_gte: Option<f32>,
    pub release_date_gte: Option<NaiveDate>,
    pub release_date_lte: Option<NaiveDate>,
    #[serde(default)]
    pub with_genres: Vec<u32>,
    #[serde(default)]
    pub without_genres: Vec<u32>,
    #[serde(default)]
    pub original_language: Vec<String>,
    #[serde(default)]
    pub original_language_not: Vec<String>,
    #[serde(default)]
    pub origin_country_not: Vec<String>,
    /// Filter keys that were configured but are not understood.
    #[serde(default)]
    pub unknown_keys: Vec<String>,
}

impl FilterSpec {
    /// Number of exclusion lists that may drop fetched candidates.
    pub fn exclusion_count(&self) -> usize {
        self.original_language_not.len() + self.origin_country_not.len()
    }
}

/// Where unmatched items are sent for acquisition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionOptions {
    pub root_folder: Option<String>,
    pub quality_profile: Option<String>,
    pub tag: Option<String>,
}

/// Where the collection is shown in the inventory's UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Visibility {
    pub library: bool,
    pub home: bool,
    pub shared: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            library: true,
            home: false,
            shared: false,
        }
    }
}

/// A fully resolved desired collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub library: String,
    pub kind: MediaKind,
    pub summary: Option<String>,
    pub sort_title: Option<String>,
    /// Poster file name, relative to the posters directory.
    pub poster: Option<String>,
    pub visibility: Visibility,
    pub order: CollectionOrder,
    pub sync_mode: SyncMode,
    pub minimum_items: u32,
    /// Truncation applied after filtering.
    pub limit: Option<u32>,
    pub schedule: ScheduleRule,
    pub filters: FilterSpec,
    pub sources: Vec<SourceDirective>,
    /// Template names applied, in declaration order.
    pub templates: Vec<String>,
    pub movie_acquisition: AcquisitionOptions,
    pub series_acquisition: AcquisitionOptions,
}

impl CollectionSpec {
    /// Blank spec with defaults for every optional field.
    pub fn new(name: &str, library: &str, kind: MediaKind) -> Self {
        Self {
            name: name.to_string(),
            library: library.to_string(),
            kind,
            summary: None,
            sort_title: None,
            poster: None,
            visibility: Visibility::default(),
            order: CollectionOrder::default(),
            sync_mode: SyncMode::default(),
            minimum_items: 1,
            limit: None,
            schedule: ScheduleRule::default(),
            filters: FilterSpec::default(),
            sources: Vec::new(),
            templates: Vec::new(),
            movie_acquisition: AcquisitionOptions::default(),
            series_acquisition: AcquisitionOptions::default(),
        }
    }

    /// Directives flagged as unsupported.
    pub fn unsupported_sources(&self) -> impl Iterator<Item = &SourceDirective> {
        self.sources.iter().filter(|s| !s.is_supported())
    }

    pub fn acquisition_options(&self, kind: MediaKind) -> &AcquisitionOptions {
        match kind {
            MediaKind::Movie => &self.movie_acquisition,
            MediaKind::Series => &self.series_acquisition,
        }
    }
}

/// All collections of one library, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySpec {
    pub name: String,
    pub kind: MediaKind,
    pub collections: Vec<CollectionSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directive_key_round_trip() {
        for key in [
            "tmdb_trending_weekly",
            "tmdb_trending_daily",
            "tmdb_discover",
            "trakt_chart",
            "imdb_list",
            "sonarr_taglist",
            "plex_search",
        ] {
            let kind = DirectiveKind::from_key(key).unwrap();
            assert_eq!(kind.key(), key);
        }
        assert!(DirectiveKind::from_key("letterboxd_list").is_none());
    }

    #[test]
    fn test_directive_provider() {
        assert_eq!(
            DirectiveKind::TmdbDiscover.provider(),
            Some(Provider::Tmdb)
        );
        assert_eq!(DirectiveKind::ImdbChart.provider(), Some(Provider::Imdb));
        assert_eq!(
            DirectiveKind::LibrarySearch.provider(),
            Some(Provider::Library)
        );
        assert_eq!(
            DirectiveKind::Unsupported("x".to_string()).provider(),
            None
        );
    }

    #[test]
    fn test_collection_order_parse() {
        assert_eq!(CollectionOrder::parse("Alpha"), Some(CollectionOrder::SortName));
        assert_eq!(
            CollectionOrder::parse("release"),
            Some(CollectionOrder::ReleaseDate)
        );
        assert_eq!(
            CollectionOrder::parse("critic_rating"),
            Some(CollectionOrder::CriticRating)
        );
        assert_eq!(CollectionOrder::parse("sideways"), None);
    }

    #[test]
    fn test_schedule_display() {
        assert_eq!(ScheduleRule::Weekly(Weekday::Sun).to_string(), "weekly(sunday)");
        assert_eq!(ScheduleRule::Monthly(15).to_string(), "monthly(15)");
    }

    #[test]
    fn test_collection_spec_defaults() {
        let spec = CollectionSpec::new("Trending", "Films", MediaKind::Movie);
        assert_eq!(spec.sync_mode, SyncMode::Sync);
        assert_eq!(spec.schedule, ScheduleRule::Daily);
        assert_eq!(spec.minimum_items, 1);
        assert!(spec.visibility.library);
        assert_eq!(spec.unsupported_sources().count(), 0);
    }
}
