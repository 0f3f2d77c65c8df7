use std::sync::Arc;

use async_trait::async_trait;
use log::{info, warn};
use serde_json::{json, Value};

use super::FunctionInvoker;
use crate::access::{check_admin, AdminStatus};
use crate::auth::{AuthProvider, Identity};
use crate::error::Error;
use crate::store::{Collection, DocumentStore, Fields};

/// Name of the promotion callable
pub const MAKE_USER_ADMIN: &str = "makeUserAdmin";

/// Grant the admin flag to the user named by `data.uid`.
///
/// The caller must be signed in and already an admin; otherwise the target
/// is left untouched.
pub async fn make_user_admin(
    store: &dyn DocumentStore,
    caller: Option<&Identity>,
    data: &Value,
) -> Result<Value, Error> {
    match check_admin(store, caller).await {
        AdminStatus::Admin => {}
        AdminStatus::NotAdmin => {
            warn!("Rejected {} from non-admin caller", MAKE_USER_ADMIN);
            return Err(Error::PermissionDenied(
                "Only admins can make other users admins.".to_string(),
            ));
        }
        AdminStatus::Unknown => {
            let uid = caller.map(|c| c.uid.clone()).unwrap_or_default();
            return Err(Error::AdminCheckFailed(uid));
        }
    }

    let uid = match data.get("uid").and_then(Value::as_str) {
        Some(uid) if !uid.trim().is_empty() => uid,
        _ => {
            return Err(Error::InvalidArgument(
                "The function must be called with a valid uid.".to_string(),
            ))
        }
    };

    let mut patch = Fields::new();
    patch.insert("isAdmin".to_string(), Value::Bool(true));
    store.update(&Collection::Users, uid, patch).await?;

    info!("User {} has been made an admin", uid);
    Ok(json!(format!("User {} has been made an admin.", uid)))
}

/// Runs the callable functions in-process, against the given store.
///
/// The caller is whoever the auth provider reports as signed in.
pub struct LocalFunctions {
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthProvider>,
}

impl LocalFunctions {
    pub fn new(store: Arc<dyn DocumentStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Self { store, auth }
    }
}

#[async_trait]
impl FunctionInvoker for LocalFunctions {
    async fn call(&self, name: &str, data: Value) -> Result<Value, Error> {
        match name {
            MAKE_USER_ADMIN => {
                let caller = self.auth.current_user();
                make_user_admin(self.store.as_ref(), caller.as_ref(), &data).await
            }
            other => Err(Error::NotFound(format!("function {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        for (uid, admin) in [("boss", true), ("joe", false)] {
            let mut fields = Fields::new();
            fields.insert("isAdmin".to_string(), Value::Bool(admin));
            store.set(&Collection::Users, uid, fields).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn admin_promotes_target() {
        let store = seeded().await;
        let boss = Identity::new("boss");
        let result = make_user_admin(&store, Some(&boss), &json!({ "uid": "joe" }))
            .await
            .unwrap();
        assert_eq!(result, json!("User joe has been made an admin."));

        let joe = store.get(&Collection::Users, "joe").await.unwrap().unwrap();
        assert_eq!(joe.fields["isAdmin"], json!(true));
    }

    #[tokio::test]
    async fn non_admin_is_denied_and_target_unchanged() {
        let store = seeded().await;
        let joe = Identity::new("joe");
        let err = make_user_admin(&store, Some(&joe), &json!({ "uid": "joe" }))
            .await
            .unwrap_err();
        assert_eq!(err.callable_status(), "PERMISSION_DENIED");

        let err = make_user_admin(&store, None, &json!({ "uid": "joe" }))
            .await
            .unwrap_err();
        assert!(err.is_permission_denied());

        let doc = store.get(&Collection::Users, "joe").await.unwrap().unwrap();
        assert_eq!(doc.fields["isAdmin"], json!(false));
    }

    #[tokio::test]
    async fn missing_uid_is_invalid() {
        let store = seeded().await;
        let boss = Identity::new("boss");
        for data in [json!({}), json!({ "uid": "" }), json!({ "uid": 7 })] {
            let err = make_user_admin(&store, Some(&boss), &data).await.unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }
}
