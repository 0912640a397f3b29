//! Authorization Resolver
//!
//! Decides which dashboards a user may see:
//!
//! 1. profile `role_id` → role row → [`Role`]
//! 2. admins see every dashboard
//! 3. everyone else sees the dashboards they hold a permission row for
//!
//! A missing profile, role id or role row means non-admin. Any failed
//! lookup aborts the whole resolution; callers never get a partial list.

use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;

use crate::backend::{Backend, BackendError};
use crate::model::{sort_newest_first, Dashboard, DashboardId, Role};

/// Resolves roles and dashboard visibility against the backend
#[derive(Clone)]
pub struct AuthorizationResolver {
    backend: Arc<dyn Backend>,
}

/// A user's role and the dashboards visible to them, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visibility {
    pub role: Role,
    pub dashboards: Vec<Dashboard>,
}

/// Resolution failures
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Access restricted to administrators")]
    Forbidden,
}

impl AuthorizationResolver {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Look up the role of a user
    pub async fn resolve_role(&self, token: &str, user_id: &str) -> Result<Role, ResolveError> {
        let profile = self.backend.profile(token, user_id).await?;

        let Some(role_id) = profile.and_then(|p| p.role_id) else {
            tracing::debug!(user_id, "No role assigned, defaulting to user");
            return Ok(Role::User);
        };

        let role = match self.backend.role(token, role_id).await? {
            Some(record) => Role::from_name(&record.name),
            None => {
                tracing::warn!(user_id, role_id, "Profile points at a missing role");
                Role::User
            }
        };

        tracing::debug!(user_id, role = %role, "Resolved role");
        Ok(role)
    }

    /// Role plus visible dashboards for a user
    pub async fn visible_dashboards(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<Visibility, ResolveError> {
        let role = self.resolve_role(token, user_id).await?;
        let dashboards = self.dashboards_for(token, user_id, role).await?;

        tracing::debug!(user_id, role = %role, visible = dashboards.len(), "Resolved visibility");
        Ok(Visibility { role, dashboards })
    }

    /// Dashboards visible to a user whose role is already known
    pub async fn dashboards_for(
        &self,
        token: &str,
        user_id: &str,
        role: Role,
    ) -> Result<Vec<Dashboard>, ResolveError> {
        let mut dashboards = if role.is_admin() {
            self.backend.list_dashboards(token).await?
        } else {
            let ids = self.granted_ids(token, user_id).await?;
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            self.backend.dashboards_by_ids(token, &ids).await?
        };

        sort_newest_first(&mut dashboards);
        Ok(dashboards)
    }

    /// A single dashboard, if the user may see it
    pub async fn visible_dashboard(
        &self,
        token: &str,
        user_id: &str,
        dashboard_id: DashboardId,
    ) -> Result<Option<Dashboard>, ResolveError> {
        let role = self.resolve_role(token, user_id).await?;
        self.dashboard_for_role(token, user_id, role, dashboard_id).await
    }

    /// A single dashboard for a user whose role is already known
    pub async fn dashboard_for_role(
        &self,
        token: &str,
        user_id: &str,
        role: Role,
        dashboard_id: DashboardId,
    ) -> Result<Option<Dashboard>, ResolveError> {
        if !role.is_admin() && !self.granted_ids(token, user_id).await?.contains(&dashboard_id) {
            return Ok(None);
        }

        let mut rows = self.backend.dashboards_by_ids(token, &[dashboard_id]).await?;
        Ok(rows.pop())
    }

    /// Succeed only for admins
    pub async fn require_admin(&self, token: &str, user_id: &str) -> Result<(), ResolveError> {
        match self.resolve_role(token, user_id).await? {
            Role::Admin => Ok(()),
            Role::User => {
                tracing::warn!(user_id, "Non-admin attempted an admin action");
                Err(ResolveError::Forbidden)
            }
        }
    }

    async fn granted_ids(&self, token: &str, user_id: &str) -> Result<Vec<DashboardId>, ResolveError> {
        let permissions = self.backend.permissions_for_user(token, user_id).await?;
        let ids: BTreeSet<DashboardId> = permissions
            .into_iter()
            .filter(|p| p.user_id == user_id)
            .map(|p| p.dashboard_id)
            .collect();
        Ok(ids.into_iter().collect())
    }
}


#[cfg(test)]
mod properties {
    use super::*;
    use crate::backend::InMemoryBackend;
    use crate::model::{NewDashboard, Permission};
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;

    struct Member {
        token: String,
        id: String,
    }

    struct World {
        backend: Arc<InMemoryBackend>,
        admin_token: String,
        ana: Member,
        bo: Member,
        ids: Vec<DashboardId>,
    }

    impl World {
        /// Grant each dashboard to ana and bo as the row says, returning the
        /// ids granted to each
        async fn grant(&self, rows: &[Row]) -> (Vec<DashboardId>, Vec<DashboardId>) {
            let mut ana = Vec::new();
            let mut bo = Vec::new();
            for (id, (_, to_ana, to_bo)) in self.ids.iter().zip(rows) {
                for (granted, member, expected) in
                    [(*to_ana, &self.ana, &mut ana), (*to_bo, &self.bo, &mut bo)]
                {
                    if granted {
                        self.backend
                            .grant_permission(&self.admin_token, &Permission::new(*id, &member.id))
                            .await
                            .unwrap();
                        expected.push(*id);
                    }
                }
            }
            (ana, bo)
        }

        async fn visible_to(&self, member: &Member) -> Vec<Dashboard> {
            let resolver = AuthorizationResolver::new(self.backend.clone());
            resolver
                .visible_dashboards(&member.token, &member.id)
                .await
                .unwrap()
                .dashboards
        }
    }

    async fn member(backend: &InMemoryBackend, email: &str) -> Member {
        let user = backend.add_user(email, "secret1", Some("user")).await;
        Member {
            token: backend.session_for(&user).await.access_token,
            id: user.id,
        }
    }

    /// One admin, two users, a dashboard per day offset (offsets may repeat)
    async fn world(day_offsets: &[i64]) -> World {
        let backend = Arc::new(InMemoryBackend::new());
        let admin = backend.add_user("admin@example.com", "secret1", Some("admin")).await;
        let ana = member(&backend, "ana@example.com").await;
        let bo = member(&backend, "bo@example.com").await;
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let mut ids = Vec::new();
        for (i, days) in day_offsets.iter().enumerate() {
            let d = backend
                .add_dashboard(
                    NewDashboard::new(format!("D{}", i), "https://app.powerbi.com/r"),
                    base + Duration::days(*days),
                )
                .await;
            ids.push(d.id);
        }

        World {
            admin_token: backend.session_for(&admin).await.access_token,
            ana,
            bo,
            backend,
            ids,
        }
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    fn is_newest_first(dashboards: &[Dashboard]) -> bool {
        dashboards.windows(2).all(|w| {
            (w[0].created_at, w[0].id) > (w[1].created_at, w[1].id)
        })
    }

    fn sorted_ids(dashboards: &[Dashboard]) -> Vec<DashboardId> {
        let mut ids: Vec<_> = dashboards.iter().map(|d| d.id).collect();
        ids.sort_unstable();
        ids
    }

    /// Day offset of a dashboard, then whether ana and bo are granted it
    type Row = (i64, bool, bool);

    fn cases() -> impl Strategy<Value = Vec<Row>> {
        prop::collection::vec((0i64..5, any::<bool>(), any::<bool>()), 0..8)
    }

    fn offsets(rows: &[Row]) -> Vec<i64> {
        rows.iter().map(|(d, _, _)| *d).collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Admins see every dashboard regardless of grants
        #[test]
        fn admin_sees_all(rows in cases()) {
            let (ids, visible) = runtime().block_on(async {
                let w = world(&offsets(&rows)).await;
                w.grant(&rows).await;
                let resolver = AuthorizationResolver::new(w.backend.clone());
                let admin = w.backend.current_user(&w.admin_token).await.unwrap();
                let v = resolver.visible_dashboards(&w.admin_token, &admin.id).await.unwrap();
                (w.ids, v.dashboards)
            });

            prop_assert_eq!(sorted_ids(&visible), ids);
            prop_assert!(is_newest_first(&visible));
        }

        /// Each non-admin sees exactly their own grants, newest first, no
        /// repeats, and nothing granted only to the other user
        #[test]
        fn user_sees_exactly_granted(rows in cases()) {
            let ((ana_granted, bo_granted), ana_visible, bo_visible) = runtime().block_on(async {
                let w = world(&offsets(&rows)).await;
                let granted = w.grant(&rows).await;
                let ana = w.visible_to(&w.ana).await;
                let bo = w.visible_to(&w.bo).await;
                (granted, ana, bo)
            });

            prop_assert_eq!(sorted_ids(&ana_visible), ana_granted.clone());
            prop_assert_eq!(sorted_ids(&bo_visible), bo_granted.clone());
            prop_assert!(is_newest_first(&ana_visible));
            prop_assert!(is_newest_first(&bo_visible));

            let bo_only: Vec<_> = bo_granted.iter().filter(|id| !ana_granted.contains(id)).collect();
            prop_assert!(ana_visible.iter().all(|d| !bo_only.contains(&&d.id)));
            let ana_only: Vec<_> = ana_granted.iter().filter(|id| !bo_granted.contains(id)).collect();
            prop_assert!(bo_visible.iter().all(|d| !ana_only.contains(&&d.id)));
        }

        /// Granting then revoking a dashboard leaves visibility unchanged
        #[test]
        fn grant_then_revoke_is_neutral(rows in cases(), pick in any::<prop::sample::Index>()) {
            prop_assume!(!rows.is_empty());
            let (before, after) = runtime().block_on(async {
                let w = world(&offsets(&rows)).await;
                w.grant(&rows).await;
                let before = (w.visible_to(&w.ana).await, w.visible_to(&w.bo).await);

                let index = pick.index(rows.len());
                let (_, already, _) = rows[index];
                if !already {
                    let p = Permission::new(w.ids[index], &w.ana.id);
                    w.backend.grant_permission(&w.admin_token, &p).await.unwrap();
                    w.backend.revoke_permission(&w.admin_token, &p).await.unwrap();
                }
                let after = (w.visible_to(&w.ana).await, w.visible_to(&w.bo).await);
                (before, after)
            });

            prop_assert_eq!(before, after);
        }

        /// Any failed lookup yields an error, never a partial list
        #[test]
        fn outage_is_an_error(rows in cases()) {
            let outcome = runtime().block_on(async {
                let w = world(&offsets(&rows)).await;
                for id in &w.ids {
                    w.backend
                        .grant_permission(&w.admin_token, &Permission::new(*id, &w.ana.id))
                        .await
                        .unwrap();
                }
                w.backend.set_unavailable(true).await;
                let resolver = AuthorizationResolver::new(w.backend.clone());
                resolver.visible_dashboards(&w.ana.token, &w.ana.id).await
            });

            prop_assert!(outcome.is_err());
        }
    }
}
