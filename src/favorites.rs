//! Per-user favorites: the toggle on a podcast page and the favorites list

use futures_util::future::try_join_all;
use log::{debug, info};

use crate::auth::Identity;
use crate::error::Error;
use crate::gateway;
use crate::models::Podcast;
use crate::tracked::Tracked;
use crate::PodPulse;

/// The favorite button of one podcast for one user
#[derive(Debug, Clone)]
pub struct FavoriteToggle {
    uid: String,
    podcast_id: String,
    flag: Tracked<bool>,
}

impl FavoriteToggle {
    /// Read the current membership of `podcast_id` in the favorites of `identity`
    pub async fn load(
        app: &PodPulse,
        identity: &Identity,
        podcast_id: &str,
    ) -> Result<Self, Error> {
        let flag = gateway::is_favorite(app, &identity.uid, podcast_id).await?;
        Ok(Self {
            uid: identity.uid.clone(),
            podcast_id: podcast_id.to_string(),
            flag: Tracked::new(flag),
        })
    }

    /// Whether the podcast is shown as a favorite
    pub fn is_favorite(&self) -> bool {
        *self.flag.displayed()
    }

    pub fn is_pending(&self) -> bool {
        self.flag.is_pending()
    }

    /// Flip the membership; on failure the flag reverts and the error is returned
    pub async fn toggle(&mut self, app: &PodPulse) -> Result<bool, Error> {
        let target = !*self.flag.committed();
        self.flag.begin(target);

        let result = if target {
            gateway::add_favorite(app, &self.uid, &self.podcast_id).await
        } else {
            gateway::remove_favorite(app, &self.uid, &self.podcast_id).await
        };

        match result {
            Ok(()) => {
                self.flag.commit();
                info!(
                    "Podcast {} {} favorites of {}",
                    self.podcast_id,
                    if target { "added to" } else { "removed from" },
                    self.uid
                );
                Ok(target)
            }
            Err(e) => {
                self.flag.rollback();
                Err(e)
            }
        }
    }
}

/// The favorite podcasts of `identity`.
///
/// Lookups run concurrently; one failing lookup fails the list. Favorites
/// whose podcast has since been deleted are skipped.
pub async fn favorite_podcasts(app: &PodPulse, identity: &Identity) -> Result<Vec<Podcast>, Error> {
    let ids = gateway::favorite_ids(app, &identity.uid).await?;
    let lookups = ids.iter().map(|id| gateway::get_podcast(app, id));
    let podcasts = try_join_all(lookups).await?;

    let found: Vec<Podcast> = podcasts.into_iter().flatten().collect();
    if found.len() < ids.len() {
        debug!(
            "Skipped {} favorites of {} without a podcast",
            ids.len() - found.len(),
            identity.uid
        );
    }
    Ok(found)
}
