use std::sync::Arc;

use courier_types::domain::user::{ApprovalStatus, Role, User, UserQuery};
use courier_types::ports::store::{CourierStore, RepoError};
use uuid::Uuid;

use crate::errors::AppError;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

pub struct UserService<S: CourierStore> {
    store: Arc<S>,
}

impl<S: CourierStore> UserService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Registers the user on first login. Returns the stored user and whether
    /// it was created by this call.
    pub async fn login(
        &self,
        email: String,
        display_name: String,
        photo_url: Option<String>,
    ) -> Result<(User, bool), AppError> {
        if let Some(existing) = self.store.find_user_by_email(&email).await? {
            return Ok((existing, false));
        }
        let user = User::new(email.clone(), display_name, photo_url)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        match self.store.insert_user(user).await {
            Ok(user) => {
                tracing::info!(email = %user.email, "user registered");
                Ok((user, true))
            }
            // lost a race with a concurrent first login
            Err(RepoError::Duplicate(_)) => {
                let existing = self
                    .store
                    .find_user_by_email(&email)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("user {}", email)))?;
                Ok((existing, false))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_users(
        &self,
        search: Option<String>,
        limit: Option<usize>,
        skip: Option<usize>,
    ) -> Result<Vec<User>, AppError> {
        let query = UserQuery {
            search: search.filter(|s| !s.trim().is_empty()),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE),
            skip: skip.unwrap_or(0),
        };
        Ok(self.store.list_users(&query).await?)
    }

    pub async fn review_role(&self, id: Uuid, approval: ApprovalStatus) -> Result<User, AppError> {
        let role = approval.granted_role();
        match self.store.set_user_role(id, role).await? {
            Some(user) => {
                tracing::info!(email = %user.email, role = %role, "user role changed");
                Ok(user)
            }
            None => Err(AppError::NotFound(format!("user {}", id))),
        }
    }

    pub async fn role_of(&self, email: &str) -> Result<Role, AppError> {
        match self.store.find_user_by_email(email).await? {
            Some(user) => Ok(user.role),
            None => Err(AppError::NotFound(format!("user {}", email))),
        }
    }

    /// Unknown users are not admins.
    pub async fn is_admin(&self, email: &str) -> Result<bool, AppError> {
        Ok(self
            .store
            .find_user_by_email(email)
            .await?
            .is_some_and(|u| u.is_admin()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_repo::memory::InMemoryRepo;

    fn service() -> UserService<InMemoryRepo> {
        UserService::new(Arc::new(InMemoryRepo::new()))
    }

    #[tokio::test]
    async fn second_login_returns_existing_user() {
        let svc = service();
        let (first, created) = svc
            .login("a@x.com".into(), "Alice".into(), None)
            .await
            .unwrap();
        assert!(created);
        let (second, created) = svc
            .login("a@x.com".into(), "Alice Again".into(), None)
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.display_name, "Alice");
    }

    #[tokio::test]
    async fn review_role_promotes_and_removes_admin() {
        let svc = service();
        let (user, _) = svc
            .login("a@x.com".into(), "Alice".into(), None)
            .await
            .unwrap();
        assert!(!svc.is_admin("a@x.com").await.unwrap());

        svc.review_role(user.id, ApprovalStatus::Approved)
            .await
            .unwrap();
        assert!(svc.is_admin("a@x.com").await.unwrap());
        assert_eq!(svc.role_of("a@x.com").await.unwrap(), Role::Admin);

        svc.review_role(user.id, ApprovalStatus::Removed)
            .await
            .unwrap();
        assert_eq!(svc.role_of("a@x.com").await.unwrap(), Role::User);
    }

    #[tokio::test]
    async fn missing_users() {
        let svc = service();
        assert!(matches!(
            svc.role_of("ghost@x.com").await,
            Err(AppError::NotFound(_))
        ));
        assert!(!svc.is_admin("ghost@x.com").await.unwrap());
        assert!(matches!(
            svc.review_role(Uuid::new_v4(), ApprovalStatus::Approved).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_users_caps_page_size() {
        let svc = service();
        for i in 0..3 {
            svc.login(format!("u{i}@x.com"), format!("User {i}"), None)
                .await
                .unwrap();
        }
        let all = svc.list_users(None, Some(1_000), None).await.unwrap();
        assert_eq!(all.len(), 3);
        let page = svc.list_users(None, Some(2), Some(2)).await.unwrap();
        assert_eq!(page.len(), 1);
        let found = svc
            .list_users(Some("user 1".into()), None, None)
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
