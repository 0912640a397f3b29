//! Permissions matrix editor

use maud::{html, Markup};

use super::{page, Viewer};
use crate::authz::PermissionMatrix;
use crate::session::Flash;

pub fn render(viewer: &Viewer<'_>, matrix: &PermissionMatrix, flashes: &[Flash]) -> Markup {
    let content = html! {
        h1 { "Permissions" }
        @if matrix.rows.is_empty() || matrix.dashboards.is_empty() {
            p class="empty" { "Permissions can be edited once there are users and dashboards." }
        } @else {
            p class="empty" { (matrix.granted_count()) " grants" }
            table {
                thead {
                    tr {
                        th { "User" }
                        @for column in &matrix.dashboards {
                            th { (column.name) }
                        }
                    }
                }
                tbody {
                    @for row in &matrix.rows {
                        tr {
                            td { (row.label) }
                            @for (column, granted) in matrix.dashboards.iter().zip(&row.cells) {
                                td class="cell" {
                                    form method="post" action="/admin/permissions" {
                                        input type="hidden" name="dashboard_id" value=(column.id);
                                        input type="hidden" name="user_id" value=(row.user_id);
                                        @if *granted {
                                            input type="hidden" name="action" value="revoke";
                                            button type="submit" title="Revoke" { "✓" }
                                        } @else {
                                            input type="hidden" name="action" value="grant";
                                            button class="muted" type="submit" title="Grant" { "—" }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    page("Permissions", Some(viewer), flashes, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Dashboard, Permission, Profile, Role, User};
    use chrono::Utc;

    #[test]
    fn test_cells_toggle_action() {
        let admin = User::new("a", "admin@example.com");
        let viewer = Viewer {
            user: &admin,
            role: Role::Admin,
        };
        let profiles = vec![Profile {
            id: "u1".to_string(),
            email: Some("ana@example.com".to_string()),
            role_id: Some(2),
        }];
        let dashboards = vec![
            Dashboard {
                id: 1,
                name: "One".to_string(),
                description: None,
                embed_url: "https://x.io/1".to_string(),
                created_at: Utc::now(),
            },
            Dashboard {
                id: 2,
                name: "Two".to_string(),
                description: None,
                embed_url: "https://x.io/2".to_string(),
                created_at: Utc::now(),
            },
        ];
        let matrix =
            PermissionMatrix::build(&profiles, &dashboards, &[Permission::new(1, "u1")]);

        let html = render(&viewer, &matrix, &[]).into_string();
        assert_eq!(html.matches(r#"value="revoke""#).count(), 1);
        assert_eq!(html.matches(r#"value="grant""#).count(), 1);
        assert!(html.contains("1 grants"));
    }
}
