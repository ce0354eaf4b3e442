use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::user::{Role, User, UserQuery};
use crate::ports::store::RepoError;

#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Fails with [`RepoError::Duplicate`] when the email is already registered.
    async fn insert_user(&self, user: User) -> Result<User, RepoError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, RepoError>;
    async fn list_users(&self, query: &UserQuery) -> Result<Vec<User>, RepoError>;
    async fn set_user_role(&self, id: Uuid, role: Role) -> Result<Option<User>, RepoError>;
    async fn set_user_role_by_email(
        &self,
        email: &str,
        role: Role,
    ) -> Result<Option<User>, RepoError>;
}
