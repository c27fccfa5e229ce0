//! Service wiring: the store, the credential backend and the cross-cutting
//! steps handlers share (authentication, signup provisioning).

use std::sync::Arc;

use chrono::Utc;

use fire_accounts::{Decision, User};
use fire_auth::{AuthDriver, BasicCredentials, CredentialProvider, verify_password};
use fire_core::{DomainError, DomainResult, NewUserRequestId, UserId};
use fire_infra::{Decided, FireStore, InMemoryStore, PostgresStore, seed};

use crate::config::Config;
use crate::context::CurrentUser;

pub struct AppServices {
    store: Arc<dyn FireStore>,
    credentials: AuthDriver,
    sip_host: String,
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices")
            .field("credentials", &self.credentials.kind())
            .field("sip_host", &self.sip_host)
            .finish_non_exhaustive()
    }
}

impl AppServices {
    pub fn new(store: Arc<dyn FireStore>, credentials: AuthDriver, sip_host: impl Into<String>) -> Self {
        Self {
            store,
            credentials,
            sip_host: sip_host.into(),
        }
    }

    pub fn store(&self) -> &dyn FireStore {
        self.store.as_ref()
    }

    pub fn sip_host(&self) -> &str {
        &self.sip_host
    }

    /// Resolve Basic credentials to an active user.
    ///
    /// Every failure collapses into `Unauthorized`; the reason is only logged.
    pub async fn authenticate(&self, credentials: &BasicCredentials) -> DomainResult<User> {
        let Some(user) = self.store.find_active_user(&credentials.username).await? else {
            tracing::debug!(username = %credentials.username, "no active user");
            return Err(DomainError::Unauthorized);
        };
        if !verify_password(&self.credentials, user.sip_account(), &credentials.password).await {
            tracing::debug!(username = %credentials.username, "password mismatch");
            return Err(DomainError::Unauthorized);
        }
        Ok(user)
    }

    /// Fresh copy of the caller's record.
    pub async fn current_user(&self, current: &CurrentUser) -> DomainResult<User> {
        match self.store.get_user(current.id()).await {
            Ok(user) => Ok(user),
            Err(DomainError::NotFound(_)) => Err(DomainError::inconsistency("Cannot get current user")),
            Err(e) => Err(e),
        }
    }

    /// Accept or reject a request on behalf of `admin`.
    ///
    /// The call that wins acceptance also provisions the registrar account when
    /// the candidate supplied a password. A failed provisioning is logged and
    /// does not undo the acceptance.
    pub async fn decide_new_user_request(
        &self,
        id: NewUserRequestId,
        decision: Decision,
        admin: UserId,
    ) -> DomainResult<Decided> {
        let decided = self
            .store
            .decide_new_user_request(id, decision, admin, Utc::now())
            .await?;

        if decided.applied() {
            tracing::info!(
                request_id = %id,
                admin_id = %admin,
                decision = decision.verb(),
                "new user request decided"
            );
            if decision == Decision::Accept {
                self.provision(&decided).await;
            }
        }
        Ok(decided)
    }

    async fn provision(&self, decided: &Decided) {
        let candidate = &decided.request.candidate;
        let Some(password) = candidate.password.as_deref() else {
            return;
        };
        let account = candidate.sip_account();
        if !self.credentials.add_user(account, password).await {
            tracing::warn!(
                request_id = %decided.request.id,
                account,
                "registrar provisioning failed"
            );
        }
    }
}

/// Wire the store and credential backend described by `config`.
pub async fn build_services(config: &Config) -> DomainResult<AppServices> {
    let store: Arc<dyn FireStore> = match (config.persistent, config.database_url.as_deref()) {
        (true, Some(url)) => {
            let store = PostgresStore::connect(url).await?;
            store.ensure_schema().await?;
            tracing::info!("using postgres store");
            Arc::new(store)
        }
        (true, None) => {
            return Err(DomainError::storage("persistent storage requested without a database url"));
        }
        (false, _) => {
            tracing::info!("using in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    if config.seed {
        seed::load(store.as_ref()).await?;
    }

    let credentials = config.build_auth_driver();
    tracing::info!(driver = credentials.kind().as_str(), "credential backend ready");

    Ok(AppServices::new(store, credentials, config.sip_host.clone()))
}

#[cfg(test)]
mod tests {
    use fire_accounts::{NewUserRequest, RequestState, UserDraft};
    use fire_auth::StaticCredentials;

    use super::*;

    async fn seeded() -> AppServices {
        let store = Arc::new(InMemoryStore::new());
        seed::load(store.as_ref()).await.unwrap();
        AppServices::new(
            store,
            AuthDriver::Static(StaticCredentials::with_default_password("pass")),
            "sip.fire.test",
        )
    }

    fn basic(username: &str, password: &str) -> BasicCredentials {
        BasicCredentials {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn authenticates_active_users_only() {
        let services = seeded().await;
        let joel = services.authenticate(&basic("joel", "pass")).await.unwrap();
        assert!(joel.admin);

        assert_eq!(
            services.authenticate(&basic("joel", "nope")).await.unwrap_err(),
            DomainError::Unauthorized
        );
        assert_eq!(
            services.authenticate(&basic("chris", "pass")).await.unwrap_err(),
            DomainError::Unauthorized
        );
    }

    #[tokio::test]
    async fn accepted_candidate_password_is_provisioned() {
        let services = seeded().await;
        let request = services
            .store()
            .create_new_user_request(
                UserDraft {
                    name: "Ed Chigliak".into(),
                    username: "ed".into(),
                    phone_number: Some("77".into()),
                    password: Some("films".into()),
                    ..Default::default()
                },
                Utc::now(),
            )
            .await
            .unwrap();

        let decided = services
            .decide_new_user_request(request.id, Decision::Accept, UserId::new(1))
            .await
            .unwrap();
        assert_eq!(decided.request.state, RequestState::Accepted);

        assert!(services.authenticate(&basic("ed", "films")).await.is_ok());
        assert!(services.authenticate(&basic("ed", "pass")).await.is_err());
    }

    #[tokio::test]
    async fn signup_cannot_take_over_an_existing_registrar_account() {
        let services = seeded().await;
        let eve = UserDraft {
            name: "Eve".into(),
            username: "eve".into(),
            phone_number: Some("1".into()),
            password: Some("pwned".into()),
            ..Default::default()
        };

        let err = services
            .store()
            .create_new_user_request(eve.clone(), Utc::now())
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::validation("SIP account 1 already in use"));

        // Same candidate slipped in as a raw record: acceptance is refused too.
        let request = services
            .store()
            .insert_new_user_request(NewUserRequest::pending(NewUserRequestId::new(0), eve, Utc::now()))
            .await
            .unwrap();
        let err = services
            .decide_new_user_request(request.id, Decision::Accept, UserId::new(1))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::validation("SIP account 1 already in use"));

        assert!(services.authenticate(&basic("joel", "pass")).await.unwrap().admin);
        assert!(services.authenticate(&basic("joel", "pwned")).await.is_err());
        assert!(services.authenticate(&basic("eve", "pwned")).await.is_err());
    }

    #[tokio::test]
    async fn vanished_caller_is_an_inconsistency() {
        let services = seeded().await;
        let marilyn = services.authenticate(&basic("marilyn", "pass")).await.unwrap();
        let current = CurrentUser::new(marilyn);
        services.store().delete_user(current.id()).await.unwrap();

        assert_eq!(
            services.current_user(&current).await.unwrap_err(),
            DomainError::inconsistency("Cannot get current user")
        );
    }
}
