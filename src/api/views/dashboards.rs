//! Dashboard list and detail pages

use maud::{html, Markup};

use super::{page, Viewer};
use crate::model::Dashboard;
use crate::session::Flash;

/// Visible dashboards, newest first
pub fn list(viewer: &Viewer<'_>, dashboards: &[Dashboard], flashes: &[Flash]) -> Markup {
    let content = html! {
        h1 { "Dashboards" }
        @if dashboards.is_empty() {
            p class="empty" { "No dashboards have been shared with you yet." }
        } @else {
            div class="grid" {
                @for dashboard in dashboards {
                    article class="card" {
                        h3 { a href=(format!("/dashboards/{}", dashboard.id)) { (dashboard.name) } }
                        @if let Some(description) = &dashboard.description {
                            p { (description) }
                        }
                        small class="empty" { "Added " (dashboard.created_at.format("%Y-%m-%d").to_string()) }
                    }
                }
            }
        }
    };

    page("Dashboards", Some(viewer), flashes, content)
}

/// One dashboard with its embedded report
pub fn detail(viewer: &Viewer<'_>, dashboard: &Dashboard, flashes: &[Flash]) -> Markup {
    let content = html! {
        p { a href="/dashboards" { "← All dashboards" } }
        h1 { (dashboard.name) }
        @if let Some(description) = &dashboard.description {
            p { (description) }
        }
        iframe src=(dashboard.embed_url) title=(dashboard.name) allowfullscreen {}
    };

    page(&dashboard.name, Some(viewer), flashes, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, User};
    use chrono::Utc;

    #[test]
    fn test_list_empty_and_filled() {
        let user = User::new("u1", "ana@example.com");
        let viewer = Viewer {
            user: &user,
            role: Role::User,
        };

        let empty = list(&viewer, &[], &[]).into_string();
        assert!(empty.contains("No dashboards have been shared"));

        let dashboard = Dashboard {
            id: 9,
            name: "Vendas".to_string(),
            description: Some("Mensal".to_string()),
            embed_url: "https://app.powerbi.com/view?r=9".to_string(),
            created_at: Utc::now(),
        };
        let filled = list(&viewer, std::slice::from_ref(&dashboard), &[]).into_string();
        assert!(filled.contains("/dashboards/9"));
        assert!(filled.contains("Mensal"));

        let shown = detail(&viewer, &dashboard, &[]).into_string();
        assert!(shown.contains(r#"src="https://app.powerbi.com/view?r=9""#));
    }
}
