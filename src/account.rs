//! Registration, sign-in and the profile page

use chrono::{DateTime, Utc};
use log::info;

use crate::auth::Identity;
use crate::error::Error;
use crate::gateway;
use crate::models::UserProfile;
use crate::PodPulse;

/// Profile name shown when none was stored
pub const NO_NAME: &str = "No Name Provided";

/// The registration form
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub email: String,
    pub password: String,
    pub name: String,
    pub age: Option<u32>,
    /// Only set by trusted setup code; regular sign-ups leave it empty
    pub is_admin: Option<bool>,
}

/// Create the account and its profile document, leaving the user signed in
pub async fn register(app: &PodPulse, form: &RegistrationForm) -> Result<Identity, Error> {
    if form.email.trim().is_empty() || form.password.is_empty() {
        return Err(Error::validation("Email and password are required"));
    }
    let name = form.name.trim();
    let display_name = if name.is_empty() { None } else { Some(name) };

    let identity = app
        .auth()
        .sign_up(form.email.trim(), &form.password, display_name)
        .await?;

    let profile = UserProfile {
        uid: identity.uid.clone(),
        email: identity.email.clone().or_else(|| Some(form.email.trim().to_string())),
        name: display_name.map(str::to_string),
        age: form.age,
        is_admin: form.is_admin.unwrap_or(false),
        created_at: Some(Utc::now()),
    };
    gateway::create_profile(app, &profile).await?;

    info!("Registered user {}", identity.uid);
    Ok(identity)
}

pub async fn login(app: &PodPulse, email: &str, password: &str) -> Result<Identity, Error> {
    app.auth().sign_in(email.trim(), password).await
}

pub async fn logout(app: &PodPulse) -> Result<(), Error> {
    app.auth().sign_out().await
}

/// What the profile page shows
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
    pub uid: String,
    pub email: Option<String>,
    pub name: String,
    pub age: Option<u32>,
    pub is_admin: bool,
    pub member_since: Option<DateTime<Utc>>,
}

/// The signed-in user's profile; a missing document shows defaults
pub async fn load_profile(app: &PodPulse) -> Result<ProfileView, Error> {
    let identity = app
        .current_user()
        .ok_or_else(|| Error::auth("Not logged in"))?;
    let profile = gateway::get_profile(app, &identity.uid).await?;

    Ok(match profile {
        Some(profile) => ProfileView {
            uid: profile.uid,
            email: profile.email.or(identity.email),
            name: profile
                .name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| NO_NAME.to_string()),
            age: profile.age,
            is_admin: profile.is_admin,
            member_since: profile.created_at,
        },
        None => ProfileView {
            uid: identity.uid,
            email: identity.email,
            name: identity.display_name.unwrap_or_else(|| NO_NAME.to_string()),
            age: None,
            is_admin: false,
            member_since: None,
        },
    })
}
