//! Admin panel: create and delete dashboard records

use maud::{html, Markup};

use super::{page, Viewer};
use crate::model::Dashboard;
use crate::session::Flash;

pub fn render(viewer: &Viewer<'_>, dashboards: &[Dashboard], flashes: &[Flash]) -> Markup {
    let content = html! {
        section class="card" {
            h2 { "New dashboard" }
            form class="stack" method="post" action="/admin/dashboards" {
                input type="text" name="name" placeholder="Name" required maxlength="200";
                input type="text" name="description" placeholder="Description";
                input type="url" name="embed_url" placeholder="Power BI link" required;
                button type="submit" { "Create" }
            }
        }

        h2 { "Dashboards (" (dashboards.len()) ")" }
        @if dashboards.is_empty() {
            p class="empty" { "No dashboards yet." }
        } @else {
            table {
                thead {
                    tr { th { "Name" } th { "Description" } th { "Created" } th {} }
                }
                tbody {
                    @for dashboard in dashboards {
                        tr {
                            td { a href=(format!("/dashboards/{}", dashboard.id)) { (dashboard.name) } }
                            td { (dashboard.description.as_deref().unwrap_or("")) }
                            td { (dashboard.created_at.format("%Y-%m-%d %H:%M").to_string()) }
                            td {
                                form method="post"
                                    action=(format!("/admin/dashboards/{}/delete", dashboard.id))
                                    onsubmit="return confirm('Delete this dashboard and its permissions?')" {
                                    button class="danger" type="submit" { "Delete" }
                                }
                            }
                        }
                    }
                }
            }
        }
    };

    page("Manage dashboards", Some(viewer), flashes, content)
}
