//! Podcast catalog: filtered, sorted lists and single-podcast lookups

use log::{debug, warn};
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::error::Error;
use crate::gateway::{self, PodcastSort};
use crate::generation::{Generation, Ticket};
use crate::models::{Podcast, PodcastCategory};
use crate::PodPulse;

/// Number of podcasts shown on the home page
pub const FEATURED_COUNT: usize = 10;

/// Shown when the catalog list cannot be loaded
pub const LOAD_FAILED: &str = "Failed to load podcasts. Please try again later.";

/// Category selection of the catalog list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(PodcastCategory),
}

impl CategoryFilter {
    /// Read the `category` URL parameter; unknown names select everything
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::parse::<PodcastCategory>) {
            Some(Ok(category)) => CategoryFilter::Only(category),
            Some(Err(e)) => {
                debug!("Ignoring category parameter: {}", e);
                CategoryFilter::All
            }
            None => CategoryFilter::All,
        }
    }

    pub fn accepts(&self, category: Option<PodcastCategory>) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(selected) => category == Some(*selected),
        }
    }
}

/// Whether a podcast passes the search text and category filter
pub fn matches(podcast: &Podcast, query: &str, filter: CategoryFilter) -> bool {
    let needle = query.to_lowercase();
    let text_hit = podcast.title.to_lowercase().contains(&needle)
        || podcast.description.to_lowercase().contains(&needle);
    text_hit && filter.accepts(podcast.category)
}

/// The visible subset of `podcasts`, keeping their order
pub fn derive(podcasts: &[Podcast], query: &str, filter: CategoryFilter) -> Vec<Podcast> {
    podcasts
        .iter()
        .filter(|p| matches(p, query, filter))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Loaded,
    Failed(String),
}

/// The catalog page: a fetched set plus the filters applied to it.
///
/// Text and category changes recompute the visible list in place; a sort
/// change fetches again. Responses to superseded fetches are dropped.
#[derive(Debug)]
pub struct PodcastList {
    fetched: Vec<Podcast>,
    visible: Vec<Podcast>,
    query: String,
    category: CategoryFilter,
    sort: PodcastSort,
    state: LoadState,
    generation: Generation,
}

impl PodcastList {
    /// An empty list, waiting for its first fetch
    pub fn new(category: CategoryFilter) -> Self {
        Self {
            fetched: Vec::new(),
            visible: Vec::new(),
            query: String::new(),
            category,
            sort: PodcastSort::default(),
            state: LoadState::Loading,
            generation: Generation::new(),
        }
    }

    pub fn visible(&self) -> &[Podcast] {
        &self.visible
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn category(&self) -> CategoryFilter {
        self.category
    }

    pub fn sort(&self) -> PodcastSort {
        self.sort
    }

    /// Mark a fetch as started and return its ticket
    pub fn begin_fetch(&mut self) -> Ticket {
        self.state = LoadState::Loading;
        self.generation.next()
    }

    /// Apply the outcome of a fetch; returns false when it was superseded
    pub fn complete_fetch(&mut self, ticket: Ticket, result: Result<Vec<Podcast>, Error>) -> bool {
        if !self.generation.is_current(ticket) {
            warn!("Discarding stale podcast list response");
            return false;
        }
        match result {
            Ok(podcasts) => {
                self.fetched = podcasts;
                self.state = LoadState::Loaded;
            }
            Err(_) => {
                self.fetched.clear();
                self.state = LoadState::Failed(LOAD_FAILED.to_string());
            }
        }
        self.recompute();
        true
    }

    /// Fetch the list with the current sort
    pub async fn load(&mut self, app: &PodPulse) {
        let ticket = self.begin_fetch();
        let result = gateway::list_podcasts(app, Some(self.sort), None).await;
        self.complete_fetch(ticket, result);
    }

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.recompute();
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.category = category;
        self.recompute();
    }

    /// Change the sort and fetch again
    pub async fn set_sort(&mut self, app: &PodPulse, sort: PodcastSort) {
        self.sort = sort;
        self.load(app).await;
    }

    fn recompute(&mut self) {
        self.visible = derive(&self.fetched, &self.query, self.category);
    }
}

/// Podcasts for the home page, shuffled
pub async fn featured(app: &PodPulse) -> Result<Vec<Podcast>, Error> {
    let mut podcasts = gateway::list_podcasts(app, None, Some(FEATURED_COUNT)).await?;
    podcasts.shuffle(&mut rand::thread_rng());
    Ok(podcasts)
}

/// Why a podcast page has nothing to show
#[derive(Debug, Error)]
pub enum DetailError {
    #[error("No podcast ID provided")]
    MissingId,

    #[error("Podcast not found")]
    NotFound,

    #[error("Error fetching podcast")]
    Fetch(#[source] Error),
}

/// Look up the podcast behind a detail page
pub async fn podcast_details(app: &PodPulse, id: Option<&str>) -> Result<Podcast, DetailError> {
    let id = match id {
        Some(id) if !id.is_empty() => id,
        _ => return Err(DetailError::MissingId),
    };
    match gateway::get_podcast(app, id).await {
        Ok(Some(podcast)) => Ok(podcast),
        Ok(None) => Err(DetailError::NotFound),
        Err(e) => Err(DetailError::Fetch(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn podcast(title: &str, description: &str, category: Option<PodcastCategory>) -> Podcast {
        Podcast {
            id: title.to_lowercase(),
            title: title.to_string(),
            description: description.to_string(),
            category,
            audio_url: None,
            video_url: None,
            image_url: None,
            created_at: Utc::now(),
            created_by: "admin".to_string(),
        }
    }

    fn sample() -> Vec<Podcast> {
        vec![
            podcast("Foo Bar", "weekly science", Some(PodcastCategory::Science)),
            podcast("Foo Bar", "painting", Some(PodcastCategory::Arts)),
            podcast("Quiet Hours", "nothing about FOO", None),
        ]
    }

    #[test]
    fn empty_query_and_all_keeps_everything_in_order() {
        let all = sample();
        assert_eq!(derive(&all, "", CategoryFilter::All), all);
    }

    #[test]
    fn query_and_category_both_apply() {
        let all = sample();
        let hits = derive(&all, "foo", CategoryFilter::Only(PodcastCategory::Science));
        assert_eq!(hits, vec![all[0].clone()]);

        // descriptions match too, case-insensitively
        let hits = derive(&all, "FoO", CategoryFilter::All);
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn uncategorized_podcasts_never_match_a_category() {
        let all = sample();
        for category in PodcastCategory::ALL {
            let hits = derive(&all, "quiet", CategoryFilter::Only(category));
            assert!(hits.is_empty());
        }
    }

    #[test]
    fn derivation_is_idempotent() {
        let all = sample();
        let once = derive(&all, "foo", CategoryFilter::Only(PodcastCategory::Arts));
        let twice = derive(&once, "foo", CategoryFilter::Only(PodcastCategory::Arts));
        assert_eq!(once, twice);
    }

    #[test]
    fn category_param_falls_back_to_all() {
        assert_eq!(
            CategoryFilter::from_param(Some("Society & Culture")),
            CategoryFilter::Only(PodcastCategory::SocietyAndCulture)
        );
        assert_eq!(CategoryFilter::from_param(Some("Cooking")), CategoryFilter::All);
        assert_eq!(CategoryFilter::from_param(None), CategoryFilter::All);
    }

    #[test]
    fn stale_responses_are_discarded() {
        let mut list = PodcastList::new(CategoryFilter::All);
        let first = list.begin_fetch();
        let second = list.begin_fetch();

        assert!(list.complete_fetch(second, Ok(sample())));
        assert!(!list.complete_fetch(first, Ok(Vec::new())));
        assert_eq!(list.visible().len(), 3);
        assert_eq!(list.state(), &LoadState::Loaded);
    }

    #[test]
    fn failed_fetch_shows_message() {
        let mut list = PodcastList::new(CategoryFilter::All);
        let ticket = list.begin_fetch();
        list.complete_fetch(ticket, Err(Error::database("down")));
        assert_eq!(list.state(), &LoadState::Failed(LOAD_FAILED.to_string()));
        assert!(list.visible().is_empty());
    }

    #[test]
    fn filters_recompute_without_fetching() {
        let mut list = PodcastList::new(CategoryFilter::Only(PodcastCategory::Arts));
        let ticket = list.begin_fetch();
        list.complete_fetch(ticket, Ok(sample()));
        assert_eq!(list.visible().len(), 1);

        list.set_category(CategoryFilter::All);
        list.set_query("quiet");
        assert_eq!(list.visible().len(), 1);
        assert_eq!(list.visible()[0].title, "Quiet Hours");
    }

    #[tokio::test]
    async fn detail_lookup_errors() {
        let app = PodPulse::in_memory();
        let err = podcast_details(&app, None).await.unwrap_err();
        assert_eq!(err.to_string(), "No podcast ID provided");
        let err = podcast_details(&app, Some("nope")).await.unwrap_err();
        assert_eq!(err.to_string(), "Podcast not found");
    }
}
