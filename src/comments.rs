//! Live comment threads: a standing query per podcast, likes and submissions

use std::collections::HashMap;

use log::{debug, error, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::auth::Identity;
use crate::error::Error;
use crate::gateway;
use crate::models::{Comment, NewComment};
use crate::store::Collection;
use crate::tracked::Tracked;
use crate::PodPulse;

pub use crate::gateway::CommentSort;

/// Highest rating a comment can carry
pub const MAX_RATING: u8 = 5;

/// Author name for users without a display name
pub const ANONYMOUS: &str = "Anonymous";

/// What a comment subscription currently has to show
#[derive(Debug, Clone, PartialEq)]
pub enum FeedState {
    /// Subscribed, first snapshot not in yet
    Awaiting,
    Ready(Vec<Comment>),
    Failed(String),
}

/// A standing query over one podcast's comments.
///
/// Each change to the comments collection that may concern the podcast
/// triggers a fresh snapshot. Dropping the subscription tears the feed down.
pub struct CommentSubscription {
    podcast_id: String,
    sort: CommentSort,
    rx: watch::Receiver<FeedState>,
    task: JoinHandle<()>,
}

/// Query a snapshot and publish it; false once nobody is listening
async fn publish_snapshot(
    app: &PodPulse,
    podcast_id: &str,
    sort: CommentSort,
    tx: &watch::Sender<FeedState>,
) -> bool {
    let state = match gateway::comments_for_podcast(app, podcast_id, sort).await {
        Ok(comments) => {
            debug!("Comment snapshot for {} has {} entries", podcast_id, comments.len());
            FeedState::Ready(comments)
        }
        Err(e) => FeedState::Failed(e.user_message("comments")),
    };
    tx.send(state).is_ok()
}

impl CommentSubscription {
    /// Subscribe to the comments of `podcast_id` in the given order
    pub fn open(app: &PodPulse, podcast_id: &str, sort: CommentSort) -> Self {
        let (tx, rx) = watch::channel(FeedState::Awaiting);
        let app = app.clone();
        let id = podcast_id.to_string();

        let task = tokio::spawn(async move {
            // watch before the first query so no change slips in between
            let watched = app
                .changes()
                .watch_matching(&Collection::Comments, "podcastId", &id)
                .await;
            let mut changes = match watched {
                Ok(changes) => changes,
                Err(e) => {
                    error!("Error subscribing to comments of {}: {}", id, e);
                    let _ = tx.send(FeedState::Failed(e.user_message("comments")));
                    return;
                }
            };

            if !publish_snapshot(&app, &id, sort, &tx).await {
                return;
            }
            while let Some(event) = changes.next().await {
                if !event.may_touch("podcastId", &id) {
                    continue;
                }
                if !publish_snapshot(&app, &id, sort, &tx).await {
                    break;
                }
            }
            debug!("Comment feed for {} ended", id);
        });

        Self {
            podcast_id: podcast_id.to_string(),
            sort,
            rx,
            task,
        }
    }

    pub fn podcast_id(&self) -> &str {
        &self.podcast_id
    }

    pub fn sort(&self) -> CommentSort {
        self.sort
    }

    /// The latest published state
    pub fn state(&self) -> FeedState {
        self.rx.borrow().clone()
    }

    /// Wait until a new state is published and return it
    pub async fn changed(&mut self) -> Result<FeedState, Error> {
        self.rx
            .changed()
            .await
            .map_err(|_| Error::realtime("comment feed closed"))?;
        Ok(self.rx.borrow_and_update().clone())
    }

    /// Wait for the next snapshot that is not `Awaiting`
    pub async fn settled(&mut self) -> Result<FeedState, Error> {
        loop {
            let state = self.rx.borrow_and_update().clone();
            if state != FeedState::Awaiting {
                return Ok(state);
            }
            self.rx
                .changed()
                .await
                .map_err(|_| Error::realtime("comment feed closed"))?;
        }
    }
}

impl Drop for CommentSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Post a comment as `identity`; the thread picks it up from the feed
pub async fn submit_comment(
    app: &PodPulse,
    identity: Option<&Identity>,
    podcast_id: &str,
    text: &str,
    rating: i32,
) -> Result<String, Error> {
    let identity =
        identity.ok_or_else(|| Error::validation("You must be logged in to add a comment"))?;
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::validation("Comment cannot be empty"));
    }

    let comment = NewComment {
        podcast_id: podcast_id.to_string(),
        user_id: identity.uid.clone(),
        user_name: identity
            .display_name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| ANONYMOUS.to_string()),
        text: text.to_string(),
        rating: rating.clamp(0, MAX_RATING as i32) as u8,
    };
    let id = gateway::add_comment(app, &comment).await?;
    info!("Comment {} added to podcast {}", id, podcast_id);
    Ok(id)
}

/// Add one like to a comment and return the new count.
///
/// The count is read, incremented and written back; concurrent likes may
/// overwrite each other.
pub async fn like_comment(
    app: &PodPulse,
    identity: Option<&Identity>,
    comment_id: &str,
) -> Result<u32, Error> {
    if identity.is_none() {
        return Err(Error::validation("You must be logged in to like a comment"));
    }
    let comment = gateway::get_comment(app, comment_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("comment {}", comment_id)))?;
    let likes = comment.likes.saturating_add(1);
    gateway::set_comment_likes(app, comment_id, likes).await?;
    Ok(likes)
}

/// Mean rating, 0 for no comments
pub fn average_rating(comments: &[Comment]) -> f64 {
    if comments.is_empty() {
        return 0.0;
    }
    let total: u32 = comments.iter().map(|c| c.rating as u32).sum();
    total as f64 / comments.len() as f64
}

/// The comment section of a podcast page
pub struct CommentThread {
    podcast_id: String,
    subscription: Option<CommentSubscription>,
    likes: HashMap<String, Tracked<u32>>,
}

impl CommentThread {
    /// Open the thread with the default (newest first) order
    pub fn open(app: &PodPulse, podcast_id: &str) -> Self {
        Self::open_sorted(app, podcast_id, CommentSort::default())
    }

    pub fn open_sorted(app: &PodPulse, podcast_id: &str, sort: CommentSort) -> Self {
        Self {
            podcast_id: podcast_id.to_string(),
            subscription: Some(CommentSubscription::open(app, podcast_id, sort)),
            likes: HashMap::new(),
        }
    }

    pub fn sort(&self) -> CommentSort {
        self.subscription
            .as_ref()
            .map(|s| s.sort())
            .unwrap_or_default()
    }

    /// Replace the subscription with one in the new order
    pub fn resort(&mut self, app: &PodPulse, sort: CommentSort) {
        if self.sort() == sort && self.subscription.is_some() {
            return;
        }
        // the old feed goes first
        self.subscription = None;
        self.subscription = Some(CommentSubscription::open(app, &self.podcast_id, sort));
    }

    /// Stop listening
    pub fn close(&mut self) {
        self.subscription = None;
    }

    pub fn state(&self) -> FeedState {
        self.subscription
            .as_ref()
            .map(|s| s.state())
            .unwrap_or(FeedState::Awaiting)
    }

    /// Wait for the next snapshot
    pub async fn next_update(&mut self) -> Result<FeedState, Error> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.changed().await,
            None => Err(Error::realtime("comment thread is closed")),
        }
    }

    /// Wait until a snapshot is available
    pub async fn settled(&mut self) -> Result<FeedState, Error> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.settled().await,
            None => Err(Error::realtime("comment thread is closed")),
        }
    }

    /// The current snapshot with like counts as displayed
    pub fn comments(&self) -> Vec<Comment> {
        match self.state() {
            FeedState::Ready(mut comments) => {
                for comment in comments.iter_mut() {
                    comment.likes = self.displayed_likes(comment);
                }
                comments
            }
            _ => Vec::new(),
        }
    }

    fn displayed_likes(&self, comment: &Comment) -> u32 {
        match self.likes.get(&comment.id) {
            Some(tracked) => comment.likes.max(*tracked.displayed()),
            None => comment.likes,
        }
    }

    pub fn average_rating(&self) -> f64 {
        average_rating(&self.comments())
    }

    /// Post a comment to this thread
    pub async fn submit(
        &self,
        app: &PodPulse,
        text: &str,
        rating: i32,
    ) -> Result<String, Error> {
        let identity = app.current_user();
        submit_comment(app, identity.as_ref(), &self.podcast_id, text, rating).await
    }

    /// Like a comment, showing the new count until the write settles
    pub async fn like(&mut self, app: &PodPulse, comment_id: &str) -> Result<u32, Error> {
        let identity = app.current_user();
        if identity.is_none() {
            return Err(Error::validation("You must be logged in to like a comment"));
        }

        let shown = self
            .comments()
            .into_iter()
            .find(|c| c.id == comment_id)
            .map(|c| c.likes)
            .unwrap_or_default();
        let tracked = self
            .likes
            .entry(comment_id.to_string())
            .or_insert_with(|| Tracked::new(shown));
        tracked.reset(shown);
        tracked.begin(shown.saturating_add(1));

        let result = like_comment(app, identity.as_ref(), comment_id).await;
        if let Some(tracked) = self.likes.get_mut(comment_id) {
            match &result {
                Ok(likes) => {
                    tracked.begin(*likes);
                    tracked.commit();
                }
                Err(_) => tracked.rollback(),
            }
        }
        result
    }

    /// Like count shown for `comment_id` while a like is in flight
    pub fn pending_likes(&self, comment_id: &str) -> Option<u32> {
        self.likes
            .get(comment_id)
            .filter(|t| t.is_pending())
            .map(|t| *t.displayed())
    }
}
