use std::collections::HashMap;

use async_trait::async_trait;
use log::info;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AuthProvider, Identity};
use crate::error::Error;

struct Account {
    password: String,
    identity: Identity,
}

/// In-process auth provider keyed by email
#[derive(Default)]
pub struct MemoryAuth {
    accounts: Mutex<HashMap<String, Account>>,
    current: std::sync::Mutex<Option<Identity>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    fn set_current(&self, identity: Option<Identity>) {
        let mut guard = match self.current.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = identity;
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, Error> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(email) {
            return Err(Error::auth("email already in use"));
        }
        if password.len() < 6 {
            return Err(Error::auth("password should be at least 6 characters"));
        }

        let mut identity = Identity::new(&Uuid::new_v4().to_string()).with_email(email);
        identity.display_name = display_name.map(str::to_string);

        accounts.insert(email.to_string(), Account {
            password: password.to_string(),
            identity: identity.clone(),
        });
        drop(accounts);

        self.set_current(Some(identity.clone()));
        info!("User created successfully: {}", identity.uid);
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, Error> {
        let accounts = self.accounts.lock().await;
        let identity = match accounts.get(email) {
            Some(account) if account.password == password => account.identity.clone(),
            _ => return Err(Error::auth("invalid login credentials")),
        };
        drop(accounts);

        self.set_current(Some(identity.clone()));
        info!("User logged in successfully: {}", identity.uid);
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), Error> {
        if self.current_user().is_none() {
            return Err(Error::auth("Not logged in"));
        }
        self.set_current(None);
        info!("User signed out successfully");
        Ok(())
    }

    fn current_user(&self) -> Option<Identity> {
        match self.current.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
