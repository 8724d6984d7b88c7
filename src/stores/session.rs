//! Session authentication and role gate

use async_trait::async_trait;
use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::{IrisError, IrisResult};
use crate::services::backend::IrisBackend;
use crate::services::normalizer::safe_call;
use crate::types::{Role, UserProfile};

/// External identity provider (e.g. Internet Identity in the browser)
#[async_trait(?Send)]
pub trait IdentityProvider {
    async fn is_authenticated(&self) -> IrisResult<bool>;
    async fn principal(&self) -> IrisResult<Option<String>>;
    async fn logout(&self) -> IrisResult<()>;
}

pub type SessionListener = Box<dyn Fn(Option<&UserProfile>)>;

pub struct SessionGate {
    identity: Rc<dyn IdentityProvider>,
    backend: IrisBackend,
    profile: RefCell<Option<UserProfile>>,
    listener: RefCell<Option<SessionListener>>,
}

impl SessionGate {
    pub fn new(identity: Rc<dyn IdentityProvider>, backend: IrisBackend) -> Self {
        Self {
            identity,
            backend,
            profile: RefCell::new(None),
            listener: RefCell::new(None),
        }
    }

    pub fn on_change(&self, listener: SessionListener) {
        *self.listener.borrow_mut() = Some(listener);
    }

    fn set_profile(&self, profile: Option<UserProfile>) {
        *self.profile.borrow_mut() = profile;
        if let Some(listener) = self.listener.borrow().as_ref() {
            listener(self.profile.borrow().as_ref());
        }
    }

    /// False when the provider cannot answer
    pub async fn is_authenticated(&self) -> bool {
        safe_call(self.identity.is_authenticated(), false, "Error checking authentication").await
    }

    pub async fn principal(&self) -> Option<String> {
        safe_call(self.identity.principal(), None, "Error reading principal").await
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.borrow().clone()
    }

    /// Role of the cached profile. `None` if unknown or unreadable.
    pub fn current_role(&self) -> Option<Role> {
        self.profile.borrow().as_ref().and_then(|p| p.role)
    }

    /// Re-read the profile. Users who have not registered yet have none.
    pub async fn refresh_profile(&self) -> Option<UserProfile> {
        let profile = safe_call(
            async { self.backend.get_user_profile().await.map(Some) },
            None,
            "Error fetching user profile",
        )
        .await;
        self.set_profile(profile.clone());
        profile
    }

    /// Register the signed-in user. A role is assigned once and never changes.
    pub async fn register(&self, role: Role) -> IrisResult<UserProfile> {
        if let Some(existing) = self.current_role() {
            return Err(IrisError::validation(format!(
                "You are already registered as a {}",
                existing.label()
            )));
        }
        if !self.is_authenticated().await {
            return Err(IrisError::validation("Please sign in first"));
        }

        let profile = self.backend.register_user(role).await?;
        self.set_profile(Some(profile.clone()));
        Ok(profile)
    }

    /// Profile of a signed-in user holding `role`
    pub async fn require_role(&self, role: Role) -> IrisResult<UserProfile> {
        if !self.is_authenticated().await {
            return Err(IrisError::validation("Please sign in first"));
        }

        let profile = match self.profile() {
            Some(profile) => Some(profile),
            None => self.refresh_profile().await,
        };
        let profile =
            profile.ok_or_else(|| IrisError::validation("Please choose a role to continue"))?;

        if profile.role != Some(role) {
            return Err(IrisError::validation(format!(
                "This page is only available to {}s",
                role.label()
            )));
        }
        Ok(profile)
    }

    pub async fn logout(&self) -> IrisResult<()> {
        self.set_profile(None);
        self.identity.logout().await?;
        log::info!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::actor::mock::{mock_actor, MockTransport};
    use serde_json::json;
    use std::cell::Cell;
    use std::time::Duration;

    struct FakeIdentity {
        authenticated: Cell<bool>,
        broken: bool,
    }

    #[async_trait(?Send)]
    impl IdentityProvider for FakeIdentity {
        async fn is_authenticated(&self) -> IrisResult<bool> {
            if self.broken {
                return Err(IrisError::Transport("auth client unavailable".to_string()));
            }
            Ok(self.authenticated.get())
        }

        async fn principal(&self) -> IrisResult<Option<String>> {
            Ok(self.authenticated.get().then(|| "2vxsx-fae".to_string()))
        }

        async fn logout(&self) -> IrisResult<()> {
            self.authenticated.set(false);
            Ok(())
        }
    }

    fn gate(authenticated: bool, broken: bool) -> (Rc<MockTransport>, SessionGate) {
        let (mock, actor) = mock_actor();
        let identity = Rc::new(FakeIdentity { authenticated: Cell::new(authenticated), broken });
        let backend = IrisBackend::new(actor, Duration::from_secs(1));
        (mock, SessionGate::new(identity, backend))
    }

    fn profile_json(role: serde_json::Value) -> serde_json::Value {
        json!({"Ok": {"user_principal": "2vxsx-fae", "role": role, "created_at": 1}})
    }

    #[tokio::test]
    async fn test_broken_provider_means_signed_out() {
        let (_mock, gate) = gate(true, true);
        assert!(!gate.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_malformed_role_is_none() {
        let (mock, gate) = gate(true, false);
        mock.respond("get_user_profile", profile_json(json!({"Customer": null, "Merchant": null})));
        let profile = gate.refresh_profile().await.unwrap();
        assert_eq!(profile.role, None);
        assert_eq!(gate.current_role(), None);
    }

    #[tokio::test]
    async fn test_role_is_assigned_once() {
        let (mock, gate) = gate(true, false);
        mock.respond("register_user", profile_json(json!({"Merchant": null})));

        let profile = gate.register(Role::Merchant).await.unwrap();
        assert_eq!(profile.role, Some(Role::Merchant));
        assert_eq!(mock.last_args("register_user"), Some(json!([{"role": {"Merchant": null}}])));

        let err = gate.register(Role::Customer).await.unwrap_err();
        assert!(err.is_validation());
        assert_eq!(mock.call_count("register_user"), 1);
    }

    #[tokio::test]
    async fn test_require_role() {
        let (mock, gate) = gate(true, false);
        mock.respond("get_user_profile", profile_json(json!({"Customer": null})));

        assert!(gate.require_role(Role::Customer).await.is_ok());
        let err = gate.require_role(Role::Merchant).await.unwrap_err();
        assert_eq!(err.to_string(), "This page is only available to merchants");
    }

    #[tokio::test]
    async fn test_logout_clears_profile() {
        let (mock, gate) = gate(true, false);
        mock.respond("get_user_profile", profile_json(json!({"Merchant": null})));
        gate.refresh_profile().await;
        assert_eq!(gate.current_role(), Some(Role::Merchant));

        gate.logout().await.unwrap();
        assert_eq!(gate.current_role(), None);
        assert!(!gate.is_authenticated().await);
        assert!(gate.require_role(Role::Merchant).await.is_err());
    }
}
