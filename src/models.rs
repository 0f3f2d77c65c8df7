//! Records stored by the backend

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Podcast categories, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PodcastCategory {
    Comedy,
    News,
    Technology,
    Science,
    History,
    Business,
    Politics,
    Entertainment,
    Sports,
    Education,
    #[serde(rename = "Health & Fitness")]
    HealthAndFitness,
    #[serde(rename = "Society & Culture")]
    SocietyAndCulture,
    Arts,
    Music,
    #[serde(rename = "TV & Film")]
    TvAndFilm,
}

impl PodcastCategory {
    /// Every category, in display order
    pub const ALL: [PodcastCategory; 15] = [
        PodcastCategory::Comedy,
        PodcastCategory::News,
        PodcastCategory::Technology,
        PodcastCategory::Science,
        PodcastCategory::History,
        PodcastCategory::Business,
        PodcastCategory::Politics,
        PodcastCategory::Entertainment,
        PodcastCategory::Sports,
        PodcastCategory::Education,
        PodcastCategory::HealthAndFitness,
        PodcastCategory::SocietyAndCulture,
        PodcastCategory::Arts,
        PodcastCategory::Music,
        PodcastCategory::TvAndFilm,
    ];

    /// The stored (and displayed) name
    pub fn as_str(&self) -> &'static str {
        match self {
            PodcastCategory::Comedy => "Comedy",
            PodcastCategory::News => "News",
            PodcastCategory::Technology => "Technology",
            PodcastCategory::Science => "Science",
            PodcastCategory::History => "History",
            PodcastCategory::Business => "Business",
            PodcastCategory::Politics => "Politics",
            PodcastCategory::Entertainment => "Entertainment",
            PodcastCategory::Sports => "Sports",
            PodcastCategory::Education => "Education",
            PodcastCategory::HealthAndFitness => "Health & Fitness",
            PodcastCategory::SocietyAndCulture => "Society & Culture",
            PodcastCategory::Arts => "Arts",
            PodcastCategory::Music => "Music",
            PodcastCategory::TvAndFilm => "TV & Film",
        }
    }
}

impl fmt::Display for PodcastCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned for a name outside the fixed category set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown podcast category: {}", self.0)
    }
}

impl std::error::Error for UnknownCategory {}

impl FromStr for PodcastCategory {
    type Err = UnknownCategory;

    /// Names match exactly, as stored
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PodcastCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Older records store an empty string where no asset was uploaded
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

/// A podcast in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Podcast {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<PodcastCategory>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: String,
}

/// Fields of a podcast about to be created
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPodcast {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<PodcastCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_by: String,
}

/// A review left on a podcast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub podcast_id: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub rating: u8,
    #[serde(default)]
    pub likes: u32,
}

/// Fields of a comment about to be created
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub podcast_id: String,
    pub user_id: String,
    pub user_name: String,
    pub text: String,
    pub rating: u8,
}

/// A favorites membership record; the document id is the podcast id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    #[serde(rename = "id")]
    pub podcast_id: String,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

/// A user's profile document; the document id is the uid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "id")]
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_names_round_trip_exactly() {
        for category in PodcastCategory::ALL {
            assert_eq!(category.as_str().parse::<PodcastCategory>(), Ok(category));
            assert_eq!(serde_json::to_value(category).unwrap(), json!(category.as_str()));
        }
        assert!("science".parse::<PodcastCategory>().is_err());
        assert!("Health and Fitness".parse::<PodcastCategory>().is_err());
    }

    #[test]
    fn empty_asset_urls_read_as_absent() {
        let podcast: Podcast = serde_json::from_value(json!({
            "id": "p1",
            "title": "T",
            "description": "D",
            "category": "TV & Film",
            "audioUrl": "",
            "imageUrl": "https://cdn.example.test/c.png",
            "createdAt": "2024-05-01T10:00:00Z",
            "createdBy": "admin"
        }))
        .unwrap();
        assert_eq!(podcast.category, Some(PodcastCategory::TvAndFilm));
        assert_eq!(podcast.audio_url, None);
        assert_eq!(podcast.video_url, None);
        assert_eq!(podcast.image_url.as_deref(), Some("https://cdn.example.test/c.png"));
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let comment: Comment = serde_json::from_value(json!({
            "id": "c1",
            "podcastId": "p1",
            "userId": "u1",
            "userName": "Anonymous",
            "text": "nice",
            "createdAt": "2024-05-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(comment.likes, 0);
        assert_eq!(comment.rating, 0);

        let profile: UserProfile = serde_json::from_value(json!({ "id": "u1" })).unwrap();
        assert!(!profile.is_admin);
    }
}
