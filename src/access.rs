//! Admin access check shared by the client gates and the promotion callable

use log::{debug, error};
use serde_json::Value;

use crate::auth::Identity;
use crate::error::Error;
use crate::store::{Collection, DocumentStore};

/// Outcome of an admin check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminStatus {
    /// The profile could not be read
    Unknown,
    Admin,
    NotAdmin,
}

impl AdminStatus {
    /// True only for a confirmed admin; an unknown status reads as false
    pub fn is_admin(&self) -> bool {
        matches!(self, AdminStatus::Admin)
    }
}

/// Check whether `identity` holds the admin flag.
///
/// Only a stored boolean `true` grants admin. Anything else, including a
/// missing profile or a truthy non-boolean, does not.
pub async fn check_admin(store: &dyn DocumentStore, identity: Option<&Identity>) -> AdminStatus {
    let identity = match identity {
        Some(identity) => identity,
        None => return AdminStatus::NotAdmin,
    };

    match store.get(&Collection::Users, &identity.uid).await {
        Ok(Some(profile)) => match profile.fields.get("isAdmin") {
            Some(Value::Bool(true)) => AdminStatus::Admin,
            _ => AdminStatus::NotAdmin,
        },
        Ok(None) => {
            debug!("No profile for user {}", identity.uid);
            AdminStatus::NotAdmin
        }
        Err(e) => {
            error!("Error checking admin status for {}: {}", identity.uid, e);
            AdminStatus::Unknown
        }
    }
}

/// Gate an admin-only operation; returns the acting admin
pub async fn require_admin<'a>(
    store: &dyn DocumentStore,
    identity: Option<&'a Identity>,
) -> Result<&'a Identity, Error> {
    let status = check_admin(store, identity).await;
    match (status, identity) {
        (AdminStatus::Admin, Some(identity)) => Ok(identity),
        (AdminStatus::Unknown, Some(identity)) => {
            Err(Error::AdminCheckFailed(identity.uid.clone()))
        }
        _ => Err(Error::PermissionDenied("Admin access required".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Fields, MemoryStore};
    use serde_json::json;

    async fn store_with(uid: &str, profile: Value) -> MemoryStore {
        let store = MemoryStore::new();
        let fields: Fields = profile.as_object().cloned().unwrap_or_default();
        store.set(&Collection::Users, uid, fields).await.unwrap();
        store
    }

    #[tokio::test]
    async fn absent_identity_is_not_admin() {
        let store = MemoryStore::new();
        assert_eq!(check_admin(&store, None).await, AdminStatus::NotAdmin);
    }

    #[tokio::test]
    async fn only_boolean_true_grants_admin() {
        let admin = Identity::new("a");
        let store = store_with("a", json!({ "isAdmin": true })).await;
        assert_eq!(check_admin(&store, Some(&admin)).await, AdminStatus::Admin);

        let store = store_with("a", json!({ "isAdmin": "true" })).await;
        assert_eq!(check_admin(&store, Some(&admin)).await, AdminStatus::NotAdmin);

        let store = store_with("a", json!({ "name": "no flag" })).await;
        assert_eq!(check_admin(&store, Some(&admin)).await, AdminStatus::NotAdmin);

        let store = MemoryStore::new();
        assert_eq!(check_admin(&store, Some(&admin)).await, AdminStatus::NotAdmin);
    }

    #[tokio::test]
    async fn require_admin_denies_regular_users() {
        let user = Identity::new("u");
        let store = store_with("u", json!({ "isAdmin": false })).await;
        let err = require_admin(&store, Some(&user)).await.unwrap_err();
        assert!(err.is_permission_denied());
    }
}
