use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};

use crate::auth::PasswordHasher;
use crate::db::models::{FollowGraph, User, UserFields, UserId};
use crate::db::store::{RelationshipGraph, UserStore};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::Result;

/// Public view of a user; never carries the credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub followers_count: usize,
    pub following_count: usize,
}

impl UserProfile {
    pub fn new(user: &User, followers_count: usize, following_count: usize) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.full_name(),
            followers_count,
            following_count,
        }
    }
}

impl From<&FollowGraph> for UserProfile {
    fn from(graph: &FollowGraph) -> Self {
        Self::new(&graph.user, graph.followers.len(), graph.following.len())
    }
}

pub struct UserService {
    users: Arc<dyn UserStore>,
    graph: Arc<dyn RelationshipGraph>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        graph: Arc<dyn RelationshipGraph>,
        hasher: PasswordHasher,
    ) -> Self {
        Self { users, graph, hasher }
    }

    pub async fn user_with_follow_graph(&self, id: UserId) -> Result<FollowGraph> {
        self.graph
            .get_user_with_follow_graph(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("User {}", id)))
    }

    pub async fn profile(&self, id: UserId) -> Result<UserProfile> {
        Ok(UserProfile::from(&self.user_with_follow_graph(id).await?))
    }

    #[instrument(skip(self, email, password))]
    pub async fn update(
        &self,
        caller: UserId,
        id: UserId,
        email: &str,
        password: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<()> {
        if caller != id {
            return Err(AuthError::Forbidden.into());
        }
        if self.users.get_user_by_id(id).await?.is_none() {
            return Err(AppError::not_found(format!("User {}", id)));
        }
        if let Some(owner) = self.users.get_user_by_email(email).await? {
            if owner.id != id {
                return Err(AppError::Conflict(format!("Email {} is already registered", email)));
            }
        }

        let fields = UserFields {
            email: email.to_string(),
            password_hash: self.hasher.hash(password)?,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        };
        let updated = self.users.update_user(id, &fields).await.map_err(|e| match e {
            AppError::DatabaseError(DatabaseError::Duplicate) => {
                AppError::Conflict(format!("Email {} is already registered", email))
            }
            other => other,
        })?;
        if updated.is_none() {
            return Err(AppError::not_found(format!("User {}", id)));
        }

        info!(user_id = id, "Profile updated");
        Ok(())
    }

    /// `acting` starts following `target`. Following twice is a no-op.
    #[instrument(skip(self))]
    pub async fn follow(&self, caller: UserId, acting: UserId, target: UserId) -> Result<()> {
        self.check_edge_request(caller, acting, target).await?;
        if self.graph.follow(target, acting).await? {
            info!(follower = acting, followed = target, "Follow edge added");
        }
        Ok(())
    }

    /// Unfollowing someone not followed is a no-op.
    #[instrument(skip(self))]
    pub async fn unfollow(&self, caller: UserId, acting: UserId, target: UserId) -> Result<()> {
        self.check_edge_request(caller, acting, target).await?;
        if self.graph.unfollow(target, acting).await? {
            info!(follower = acting, followed = target, "Follow edge removed");
        }
        Ok(())
    }

    async fn check_edge_request(&self, caller: UserId, acting: UserId, target: UserId) -> Result<()> {
        if caller != acting {
            return Err(AuthError::Forbidden.into());
        }
        if acting == target {
            return Err(AppError::InvalidRequest("Users cannot follow themselves".into()));
        }
        if self.users.get_user_by_id(acting).await?.is_none() {
            return Err(AppError::not_found(format!("User {}", acting)));
        }
        if self.users.get_user_by_id(target).await?.is_none() {
            return Err(AppError::not_found(format!("User {}", target)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    async fn setup() -> (UserService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let hasher = PasswordHasher::new(1_000);
        for (email, first) in [("a@example.com", "Ada"), ("b@example.com", "Bob"), ("c@example.com", "Cy")] {
            store
                .create_user(&UserFields {
                    email: email.to_string(),
                    password_hash: hasher.hash("password123").unwrap(),
                    first_name: first.to_string(),
                    last_name: "Test".to_string(),
                })
                .await
                .unwrap();
        }
        (UserService::new(store.clone(), store.clone(), hasher), store)
    }

    #[tokio::test]
    async fn test_follow_is_visible_from_both_sides() {
        let (service, _) = setup().await;
        service.follow(1, 1, 2).await.unwrap();

        let a = service.user_with_follow_graph(1).await.unwrap();
        let b = service.user_with_follow_graph(2).await.unwrap();
        assert_eq!(a.following, vec![2]);
        assert!(a.followers.is_empty());
        assert_eq!(b.followers, vec![1]);
        assert!(b.following.is_empty());

        service.unfollow(1, 1, 2).await.unwrap();
        let a = service.user_with_follow_graph(1).await.unwrap();
        let b = service.user_with_follow_graph(2).await.unwrap();
        assert!(a.following.is_empty());
        assert!(b.followers.is_empty());
    }

    #[tokio::test]
    async fn test_follow_is_idempotent() {
        let (service, _) = setup().await;
        service.follow(1, 1, 2).await.unwrap();
        service.follow(1, 1, 2).await.unwrap();
        service.follow(3, 3, 2).await.unwrap();

        let profile = service.profile(2).await.unwrap();
        assert_eq!(profile.followers_count, 2);
        assert_eq!(profile.following_count, 0);
        assert_eq!(profile.name, "Bob Test");

        // Missing edge
        service.unfollow(2, 2, 1).await.unwrap();
        assert_eq!(service.profile(2).await.unwrap().followers_count, 2);
    }

    #[tokio::test]
    async fn test_follow_rejections_in_order() {
        let (service, _) = setup().await;

        let err = service.follow(2, 1, 1).await.unwrap_err();
        assert!(matches!(err, AppError::AuthError(AuthError::Forbidden)));

        let err = service.follow(1, 1, 1).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let err = service.follow(9, 9, 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = service.unfollow(1, 1, 9).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert!(service.user_with_follow_graph(1).await.unwrap().following.is_empty());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (service, store) = setup().await;

        service
            .update(1, 1, "ada@example.com", "new-password", "Ada", "Byron")
            .await
            .unwrap();
        let profile = service.profile(1).await.unwrap();
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.name, "Ada Byron");

        let stored = store.get_user_by_id(1).await.unwrap().unwrap();
        assert!(PasswordHasher::new(1_000).verify("new-password", &stored.password_hash));

        // Keeping one's own email is fine
        service.update(1, 1, "ada@example.com", "new-password", "Ada", "B").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_profile_rejections() {
        let (service, _) = setup().await;

        let err = service.update(2, 1, "x@example.com", "password", "X", "Y").await.unwrap_err();
        assert!(matches!(err, AppError::AuthError(AuthError::Forbidden)));

        let err = service.update(1, 1, "b@example.com", "password", "X", "Y").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let err = service.update(7, 7, "x@example.com", "password", "X", "Y").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
