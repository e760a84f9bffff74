//! Permission checks and grants over the [`AdminStore`].

use std::sync::Arc;

use tracing::info;

use crate::domain::{AdminUser, Permission};
use crate::errors::StoreError;
use crate::store::AdminStore;

pub struct PermissionChecker {
    store: Arc<dyn AdminStore>,
}

impl PermissionChecker {
    pub fn new(store: Arc<dyn AdminStore>) -> Self {
        Self { store }
    }

    /// Users without a stored row are VIEWERs.
    pub async fn effective_permission(&self, user_id: &str) -> Result<Permission, StoreError> {
        Ok(self
            .store
            .get_by_user_id(user_id)
            .await?
            .map(|user| user.permission)
            .unwrap_or(Permission::Viewer))
    }

    pub async fn check_permission(
        &self,
        user_id: &str,
        required: Permission,
    ) -> Result<bool, StoreError> {
        Ok(self.effective_permission(user_id).await?.allows(required))
    }

    pub async fn grant(
        &self,
        user_id: &str,
        username: &str,
        permission: Permission,
    ) -> Result<AdminUser, StoreError> {
        let user = AdminUser::new(user_id, username, permission)?;
        let stored = self.store.upsert(user).await?;
        info!(user_id, %permission, "permission granted");
        Ok(stored)
    }

    pub async fn revoke(&self, user_id: &str) -> Result<bool, StoreError> {
        let removed = self.store.delete(user_id).await?;
        if removed {
            info!(user_id, "permission revoked");
        }
        Ok(removed)
    }

    pub async fn list(&self) -> Result<Vec<AdminUser>, StoreError> {
        self.store.list().await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::PermissionChecker;
    use crate::domain::{AdminUser, Permission};
    use crate::errors::{StoreError, ValidationError};
    use crate::test_support::StubAdminStore;

    fn checker_with(users: Vec<AdminUser>) -> PermissionChecker {
        PermissionChecker::new(Arc::new(StubAdminStore::with_users(users)))
    }

    #[tokio::test]
    async fn unknown_users_default_to_viewer() {
        let checker = checker_with(vec![]);

        assert_eq!(
            checker.effective_permission("U_UNKNOWN").await.expect("lookup succeeds"),
            Permission::Viewer
        );
        assert!(checker.check_permission("U_UNKNOWN", Permission::Viewer).await.expect("checks"));
        assert!(!checker.check_permission("U_UNKNOWN", Permission::Editor).await.expect("checks"));
    }

    #[tokio::test]
    async fn stored_levels_gate_higher_tiers() {
        let editor = AdminUser::new("U_EDITOR", "alice", Permission::Editor).expect("valid user");
        let checker = checker_with(vec![editor]);

        assert!(checker.check_permission("U_EDITOR", Permission::Editor).await.expect("checks"));
        assert!(!checker.check_permission("U_EDITOR", Permission::Admin).await.expect("checks"));
    }

    #[tokio::test]
    async fn grant_upserts_and_revoke_restores_the_default() {
        let checker = checker_with(vec![]);

        checker.grant("U1", "bob", Permission::Admin).await.expect("grant succeeds");
        assert_eq!(
            checker.effective_permission("U1").await.expect("lookup succeeds"),
            Permission::Admin
        );

        checker.grant("U1", "bob", Permission::Viewer).await.expect("regrant succeeds");
        assert_eq!(
            checker.effective_permission("U1").await.expect("lookup succeeds"),
            Permission::Viewer
        );

        assert!(checker.revoke("U1").await.expect("revoke succeeds"));
        assert!(!checker.revoke("U1").await.expect("second revoke succeeds"));
        assert_eq!(
            checker.effective_permission("U1").await.expect("lookup succeeds"),
            Permission::Viewer
        );
    }

    #[tokio::test]
    async fn granting_a_blank_user_id_is_rejected() {
        let checker = checker_with(vec![]);

        let result = checker.grant("  ", "bob", Permission::Editor).await;
        assert!(matches!(
            result,
            Err(StoreError::Validation(ValidationError::EmptyUserId))
        ));
    }
}
