//! Admin panel mutations. Each one re-checks the admin flag right before it acts.

use log::{error, info, warn};
use serde_json::{json, Value};

use crate::access::require_admin;
use crate::error::Error;
use crate::functions::MAKE_USER_ADMIN;
use crate::gateway;
use crate::models::{NewPodcast, Podcast, PodcastCategory};
use crate::storage::{AssetKind, Upload};
use crate::PodPulse;

/// Shown when a required podcast field is blank
pub const MISSING_FIELDS: &str = "Please fill in all required fields.";

/// The "add podcast" form
#[derive(Debug, Clone, Default)]
pub struct NewPodcastForm {
    pub title: String,
    pub description: String,
    pub category: Option<PodcastCategory>,
    pub video_url: Option<String>,
    pub audio: Option<Upload>,
    pub image: Option<Upload>,
}

impl NewPodcastForm {
    fn validate(&self) -> Result<PodcastCategory, Error> {
        match self.category {
            Some(category)
                if !self.title.trim().is_empty() && !self.description.trim().is_empty() =>
            {
                Ok(category)
            }
            _ => Err(Error::validation(MISSING_FIELDS)),
        }
    }
}

/// Blobs uploaded for a podcast record that does not exist yet
#[derive(Debug, Default)]
struct Staged {
    paths: Vec<String>,
}

impl Staged {
    async fn upload(
        &mut self,
        app: &PodPulse,
        kind: AssetKind,
        upload: &Upload,
    ) -> Result<String, Error> {
        let path = kind.path_for(upload);
        let url = gateway::upload_file(app, upload, &path).await?;
        self.paths.push(path);
        Ok(url)
    }

    /// Remove everything staged; blobs that cannot be removed are left orphaned
    async fn rollback(self, app: &PodPulse) {
        for path in self.paths.iter().rev() {
            if let Err(e) = gateway::remove_file(app, path).await {
                warn!("Orphaned blob {} could not be removed: {}", path, e);
            }
        }
    }
}

async fn upload_assets(
    app: &PodPulse,
    form: &NewPodcastForm,
    staged: &mut Staged,
) -> Result<(Option<String>, Option<String>), Error> {
    let audio_url = match &form.audio {
        Some(upload) => Some(staged.upload(app, AssetKind::Audio, upload).await?),
        None => None,
    };
    let image_url = match &form.image {
        Some(upload) => Some(staged.upload(app, AssetKind::Image, upload).await?),
        None => None,
    };
    Ok((audio_url, image_url))
}

/// Upload the form's files, then create the podcast record.
///
/// The record is only written once every upload succeeded. If an upload or
/// the record write fails, files uploaded so far are removed again.
pub async fn add_podcast(app: &PodPulse, form: &NewPodcastForm) -> Result<String, Error> {
    let identity = app.current_user();
    let admin = require_admin(app.documents(), identity.as_ref()).await?;
    let category = form.validate()?;

    let mut staged = Staged::default();
    let (audio_url, image_url) = match upload_assets(app, form, &mut staged).await {
        Ok(urls) => urls,
        Err(e) => {
            error!("Error uploading podcast files: {}", e);
            staged.rollback(app).await;
            return Err(e);
        }
    };

    let podcast = NewPodcast {
        title: form.title.trim().to_string(),
        description: form.description.trim().to_string(),
        category: Some(category),
        audio_url,
        video_url: form.video_url.clone().filter(|u| !u.trim().is_empty()),
        image_url,
        created_by: admin.uid.clone(),
    };

    match gateway::add_podcast(app, &podcast).await {
        Ok(id) => {
            info!("Podcast {} added by {}", id, admin.uid);
            Ok(id)
        }
        Err(e) => {
            staged.rollback(app).await;
            Err(e)
        }
    }
}

pub async fn delete_podcast(app: &PodPulse, podcast_id: &str) -> Result<(), Error> {
    let identity = app.current_user();
    let admin = require_admin(app.documents(), identity.as_ref()).await?;
    gateway::delete_podcast(app, podcast_id).await?;
    info!("Podcast {} deleted by {}", podcast_id, admin.uid);
    Ok(())
}

/// Grant admin rights to `uid` through the promotion function; returns its message
pub async fn promote_user(app: &PodPulse, uid: &str) -> Result<String, Error> {
    let identity = app.current_user();
    require_admin(app.documents(), identity.as_ref()).await?;

    let uid = uid.trim();
    if uid.is_empty() {
        return Err(Error::InvalidArgument("A user ID is required".to_string()));
    }

    let result = gateway::call_function(app, MAKE_USER_ADMIN, json!({ "uid": uid })).await?;
    Ok(match result {
        Value::String(message) => message,
        other => other.to_string(),
    })
}

/// Every podcast, for the admin dashboard
pub async fn load_dashboard(app: &PodPulse) -> Result<Vec<Podcast>, Error> {
    let identity = app.current_user();
    require_admin(app.documents(), identity.as_ref()).await?;
    gateway::list_podcasts(app, None, None).await
}
