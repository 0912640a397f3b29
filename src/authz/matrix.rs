//! Permission matrix for the admin editor
//!
//! One row per user, one column per dashboard, one boolean per cell.

use serde::Serialize;
use std::collections::HashSet;

use crate::model::{Dashboard, DashboardId, Permission, Profile};

/// Grid of grants, built from store rows
#[derive(Debug, Clone, Serialize)]
pub struct PermissionMatrix {
    pub dashboards: Vec<MatrixColumn>,
    pub rows: Vec<MatrixRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixColumn {
    pub id: DashboardId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatrixRow {
    pub user_id: String,
    pub label: String,
    /// One entry per column, same order as `dashboards`
    pub cells: Vec<bool>,
}

impl PermissionMatrix {
    /// Build the grid.
    ///
    /// Users are ordered by label then id; columns keep the order of
    /// `dashboards`. Grants for unknown users or dashboards are dropped.
    pub fn build(profiles: &[Profile], dashboards: &[Dashboard], permissions: &[Permission]) -> Self {
        let granted: HashSet<(&str, DashboardId)> = permissions
            .iter()
            .map(|p| (p.user_id.as_str(), p.dashboard_id))
            .collect();

        let columns: Vec<MatrixColumn> = dashboards
            .iter()
            .map(|d| MatrixColumn {
                id: d.id,
                name: d.name.clone(),
            })
            .collect();

        let mut users: Vec<&Profile> = profiles.iter().collect();
        users.sort_by(|a, b| {
            a.display_name()
                .cmp(b.display_name())
                .then_with(|| a.id.cmp(&b.id))
        });
        users.dedup_by(|a, b| a.id == b.id);

        let rows = users
            .into_iter()
            .map(|profile| MatrixRow {
                user_id: profile.id.clone(),
                label: profile.display_name().to_string(),
                cells: columns
                    .iter()
                    .map(|c| granted.contains(&(profile.id.as_str(), c.id)))
                    .collect(),
            })
            .collect();

        Self {
            dashboards: columns,
            rows,
        }
    }

    pub fn is_granted(&self, user_id: &str, dashboard_id: DashboardId) -> bool {
        let Some(col) = self.dashboards.iter().position(|c| c.id == dashboard_id) else {
            return false;
        };
        self.rows
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.cells[col])
            .unwrap_or(false)
    }

    /// Number of granted cells
    pub fn granted_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.cells.iter().filter(|c| **c).count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(id: &str, email: Option<&str>) -> Profile {
        Profile {
            id: id.to_string(),
            email: email.map(str::to_string),
            role_id: Some(2),
        }
    }

    fn dashboard(id: DashboardId) -> Dashboard {
        Dashboard {
            id,
            name: format!("D{}", id),
            description: None,
            embed_url: "https://x.io".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_build() {
        let profiles = vec![
            profile("u2", Some("zoe@example.com")),
            profile("u1", Some("ana@example.com")),
            profile("u3", None),
        ];
        let dashboards = vec![dashboard(20), dashboard(10)];
        let permissions = vec![
            Permission::new(10, "u1"),
            Permission::new(20, "u2"),
            Permission::new(20, "u2"),
            Permission::new(99, "u1"),
            Permission::new(10, "ghost"),
        ];

        let matrix = PermissionMatrix::build(&profiles, &dashboards, &permissions);

        let labels: Vec<_> = matrix.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["ana@example.com", "u3", "zoe@example.com"]);
        assert_eq!(matrix.dashboards.iter().map(|c| c.id).collect::<Vec<_>>(), vec![20, 10]);
        assert_eq!(matrix.rows[0].cells, vec![false, true]);
        assert_eq!(matrix.rows[1].cells, vec![false, false]);
        assert_eq!(matrix.rows[2].cells, vec![true, false]);

        assert!(matrix.is_granted("u1", 10));
        assert!(!matrix.is_granted("u1", 99));
        assert!(!matrix.is_granted("ghost", 10));
        assert_eq!(matrix.granted_count(), 2);
    }

    #[test]
    fn test_empty() {
        let matrix = PermissionMatrix::build(&[], &[], &[]);
        assert!(matrix.rows.is_empty());
        assert_eq!(matrix.granted_count(), 0);
    }
}
