//! Typed reads and writes over the backend services.
//!
//! Every operation logs its failure and hands it back unchanged; nothing is
//! retried or cached.

use chrono::Utc;
use log::{debug, error};
use serde_json::{json, Value};

use crate::error::Error;
use crate::models::{Comment, Favorite, NewComment, NewPodcast, Podcast, UserProfile};
use crate::storage::Upload;
use crate::store::{to_fields, Collection, Fields, Order, Query};
use crate::PodPulse;

/// Podcast list ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PodcastSort {
    /// Newest first
    #[default]
    Date,
    /// Alphabetical
    Title,
}

impl PodcastSort {
    pub fn order(&self) -> Order {
        match self {
            PodcastSort::Date => Order::desc("createdAt"),
            PodcastSort::Title => Order::asc("title"),
        }
    }
}

/// Comment list ordering; both newest or best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentSort {
    #[default]
    Date,
    Rating,
}

impl CommentSort {
    pub fn order(&self) -> Order {
        match self {
            CommentSort::Date => Order::desc("createdAt"),
            CommentSort::Rating => Order::desc("rating"),
        }
    }
}

fn logged<T>(action: &str, result: Result<T, Error>) -> Result<T, Error> {
    result.map_err(|e| {
        error!("Error {}: {}", action, e);
        e
    })
}

fn stamped(mut fields: Fields, field: &str) -> Fields {
    fields.insert(field.to_string(), json!(Utc::now()));
    fields
}

/// Fetch podcasts, optionally ordered and limited
pub async fn list_podcasts(
    app: &PodPulse,
    sort: Option<PodcastSort>,
    limit: Option<usize>,
) -> Result<Vec<Podcast>, Error> {
    let mut query = Query::new();
    if let Some(sort) = sort {
        query = query.order(sort.order());
    }
    if let Some(limit) = limit {
        query = query.limit(limit);
    }

    let result: Result<Vec<Podcast>, Error> = async {
        let docs = app.documents().query(&Collection::Podcasts, &query).await?;
        docs.iter().map(|d| d.decode()).collect::<Result<Vec<Podcast>, _>>()
    }
    .await;
    logged("fetching podcasts", result)
}

/// Fetch one podcast; `None` when it does not exist
pub async fn get_podcast(app: &PodPulse, id: &str) -> Result<Option<Podcast>, Error> {
    let result: Result<Option<Podcast>, Error> = async {
        match app.documents().get(&Collection::Podcasts, id).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }
    .await;
    logged("fetching podcast", result)
}

/// Create a podcast and return its id
pub async fn add_podcast(app: &PodPulse, podcast: &NewPodcast) -> Result<String, Error> {
    let result: Result<String, Error> = async {
        let fields = stamped(to_fields(podcast)?, "createdAt");
        app.documents().insert(&Collection::Podcasts, fields).await
    }
    .await;
    let id = logged("adding podcast", result)?;
    debug!("Podcast added with ID: {}", id);
    Ok(id)
}

pub async fn delete_podcast(app: &PodPulse, id: &str) -> Result<(), Error> {
    logged(
        "deleting podcast",
        app.documents().delete(&Collection::Podcasts, id).await,
    )
}

/// Create a comment with zero likes and return its id
pub async fn add_comment(app: &PodPulse, comment: &NewComment) -> Result<String, Error> {
    let result: Result<String, Error> = async {
        let mut fields = stamped(to_fields(comment)?, "createdAt");
        fields.insert("likes".to_string(), json!(0));
        app.documents().insert(&Collection::Comments, fields).await
    }
    .await;
    logged("adding comment", result)
}

/// The query behind a podcast's comment list
pub fn comments_query(podcast_id: &str, sort: CommentSort) -> Query {
    Query::new().eq("podcastId", podcast_id).order(sort.order())
}

pub async fn comments_for_podcast(
    app: &PodPulse,
    podcast_id: &str,
    sort: CommentSort,
) -> Result<Vec<Comment>, Error> {
    let query = comments_query(podcast_id, sort);
    let result: Result<Vec<Comment>, Error> = async {
        let docs = app.documents().query(&Collection::Comments, &query).await?;
        docs.iter().map(|d| d.decode()).collect::<Result<Vec<Comment>, _>>()
    }
    .await;
    logged("fetching comments", result)
}

pub async fn get_comment(app: &PodPulse, id: &str) -> Result<Option<Comment>, Error> {
    let result: Result<Option<Comment>, Error> = async {
        match app.documents().get(&Collection::Comments, id).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }
    .await;
    logged("fetching comment", result)
}

/// Overwrite the like counter of a comment
pub async fn set_comment_likes(app: &PodPulse, id: &str, likes: u32) -> Result<(), Error> {
    let mut patch = Fields::new();
    patch.insert("likes".to_string(), json!(likes));
    logged(
        "updating comment likes",
        app.documents().update(&Collection::Comments, id, patch).await,
    )
}

pub async fn delete_comment(app: &PodPulse, id: &str) -> Result<(), Error> {
    logged(
        "deleting comment",
        app.documents().delete(&Collection::Comments, id).await,
    )
}

/// Mark `podcast_id` as a favorite of `uid`
pub async fn add_favorite(app: &PodPulse, uid: &str, podcast_id: &str) -> Result<(), Error> {
    let fields = stamped(Fields::new(), "addedAt");
    logged(
        "adding favorite",
        app.documents()
            .set(&Collection::favorites(uid), podcast_id, fields)
            .await,
    )
}

pub async fn remove_favorite(app: &PodPulse, uid: &str, podcast_id: &str) -> Result<(), Error> {
    logged(
        "removing favorite",
        app.documents()
            .delete(&Collection::favorites(uid), podcast_id)
            .await,
    )
}

/// Whether the membership record exists
pub async fn is_favorite(app: &PodPulse, uid: &str, podcast_id: &str) -> Result<bool, Error> {
    let result = app
        .documents()
        .get(&Collection::favorites(uid), podcast_id)
        .await
        .map(|doc| doc.is_some());
    logged("checking favorite status", result)
}

/// Podcast ids in the favorites of `uid`
pub async fn favorite_ids(app: &PodPulse, uid: &str) -> Result<Vec<String>, Error> {
    let result: Result<Vec<String>, Error> = async {
        let docs = app
            .documents()
            .query(&Collection::favorites(uid), &Query::new())
            .await?;
        docs.iter()
            .map(|doc| doc.decode::<Favorite>().map(|f| f.podcast_id))
            .collect()
    }
    .await;
    logged("fetching favorites", result)
}

pub async fn get_profile(app: &PodPulse, uid: &str) -> Result<Option<UserProfile>, Error> {
    let result: Result<Option<UserProfile>, Error> = async {
        match app.documents().get(&Collection::Users, uid).await? {
            Some(doc) => Ok(Some(doc.decode()?)),
            None => Ok(None),
        }
    }
    .await;
    logged("fetching user profile", result)
}

/// Write the profile document of `profile.uid`
pub async fn create_profile(app: &PodPulse, profile: &UserProfile) -> Result<(), Error> {
    let result: Result<(), Error> = async {
        let fields = to_fields(profile)?;
        app.documents().set(&Collection::Users, &profile.uid, fields).await
    }
    .await;
    logged("creating user profile", result)
}

/// Upload a file and return its public URL
pub async fn upload_file(app: &PodPulse, upload: &Upload, path: &str) -> Result<String, Error> {
    let url = logged("uploading file", app.storage().upload(path, upload).await)?;
    debug!("Uploaded {} to {}", upload.file_name, url);
    Ok(url)
}

pub async fn remove_file(app: &PodPulse, path: &str) -> Result<(), Error> {
    logged("removing file", app.storage().remove(path).await)
}

/// Call a backend function
pub async fn call_function(app: &PodPulse, name: &str, data: Value) -> Result<Value, Error> {
    logged(
        &format!("calling function {}", name),
        app.functions().call(name, data).await,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PodcastCategory;

    fn new_podcast(title: &str) -> NewPodcast {
        NewPodcast {
            title: title.to_string(),
            description: "about things".to_string(),
            category: Some(PodcastCategory::Science),
            audio_url: None,
            video_url: None,
            image_url: None,
            created_by: "admin".to_string(),
        }
    }

    #[tokio::test]
    async fn podcasts_come_back_typed_and_stamped() {
        let app = PodPulse::in_memory();
        let id = add_podcast(&app, &new_podcast("Beta")).await.unwrap();
        add_podcast(&app, &new_podcast("Alpha")).await.unwrap();

        let podcast = get_podcast(&app, &id).await.unwrap().unwrap();
        assert_eq!(podcast.id, id);
        assert_eq!(podcast.title, "Beta");
        assert!(podcast.created_at <= Utc::now());

        let titles: Vec<_> = list_podcasts(&app, Some(PodcastSort::Title), None)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);

        assert!(get_podcast(&app, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn favorites_are_membership_records() {
        let app = PodPulse::in_memory();
        assert!(!is_favorite(&app, "u1", "p1").await.unwrap());

        add_favorite(&app, "u1", "p1").await.unwrap();
        assert!(is_favorite(&app, "u1", "p1").await.unwrap());
        assert!(!is_favorite(&app, "u2", "p1").await.unwrap());
        assert_eq!(favorite_ids(&app, "u1").await.unwrap(), vec!["p1"]);

        add_favorite(&app, "u2", "p1").await.unwrap();
        assert_eq!(favorite_ids(&app, "u1").await.unwrap(), vec!["p1"]);
        assert_eq!(favorite_ids(&app, "u2").await.unwrap(), vec!["p1"]);

        remove_favorite(&app, "u1", "p1").await.unwrap();
        remove_favorite(&app, "u1", "p1").await.unwrap();
        assert!(favorite_ids(&app, "u1").await.unwrap().is_empty());
        assert_eq!(favorite_ids(&app, "u2").await.unwrap(), vec!["p1"]);
    }

    #[tokio::test]
    async fn malformed_favorite_fails_the_listing() {
        let app = PodPulse::in_memory();
        let mut fields = Fields::new();
        fields.insert("addedAt".to_string(), json!("yesterday"));
        app.documents()
            .set(&Collection::favorites("u1"), "p1", fields)
            .await
            .unwrap();
        assert!(favorite_ids(&app, "u1").await.is_err());
    }

    #[tokio::test]
    async fn new_comments_start_without_likes() {
        let app = PodPulse::in_memory();
        let id = add_comment(
            &app,
            &NewComment {
                podcast_id: "p1".to_string(),
                user_id: "u1".to_string(),
                user_name: "Anonymous".to_string(),
                text: "great".to_string(),
                rating: 4,
            },
        )
        .await
        .unwrap();

        let comment = get_comment(&app, &id).await.unwrap().unwrap();
        assert_eq!(comment.likes, 0);
        set_comment_likes(&app, &id, 2).await.unwrap();
        assert_eq!(get_comment(&app, &id).await.unwrap().unwrap().likes, 2);

        let err = set_comment_likes(&app, "gone", 1).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
