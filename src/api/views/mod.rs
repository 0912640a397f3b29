//! Server-rendered pages (maud)

pub mod admin;
pub mod dashboards;
pub mod login;
pub mod permissions;

use maud::{html, Markup, PreEscaped, DOCTYPE};

use crate::model::{Role, User};
use crate::session::{Flash, FlashKind};

/// Who is looking at the page
pub struct Viewer<'a> {
    pub user: &'a User,
    pub role: Role,
}

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; margin: 0; background: #f4f5f7; color: #1f2933; }
nav { display: flex; align-items: center; gap: 1rem; padding: .75rem 1.5rem; background: #1f2933; color: #fff; }
nav a { color: #fff; text-decoration: none; }
nav .spacer { flex: 1; }
nav form { margin: 0; }
main { max-width: 1100px; margin: 2rem auto; padding: 0 1.5rem; }
.card { background: #fff; border-radius: 8px; padding: 1rem 1.25rem; margin-bottom: 1rem; box-shadow: 0 1px 3px rgba(0,0,0,.08); }
.grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(260px, 1fr)); gap: 1rem; }
form.stack { display: flex; flex-direction: column; gap: .5rem; max-width: 420px; }
input { padding: .5rem; border: 1px solid #cbd2d9; border-radius: 4px; }
button { padding: .45rem .9rem; border: 0; border-radius: 4px; background: #2563eb; color: #fff; cursor: pointer; }
button.danger { background: #dc2626; }
button.muted { background: #9aa5b1; }
table { border-collapse: collapse; width: 100%; background: #fff; }
th, td { border-bottom: 1px solid #e4e7eb; padding: .5rem; text-align: left; }
td.cell { text-align: center; }
td.cell form { margin: 0; }
iframe { width: 100%; height: 640px; border: 0; background: #fff; }
.empty { color: #616e7c; }
.toasts { position: fixed; right: 1rem; bottom: 1rem; display: flex; flex-direction: column; gap: .5rem; }
.toast { padding: .75rem 1rem; border-radius: 6px; color: #fff;
         box-shadow: 0 4px 12px rgba(0,0,0,.2); animation: toast-out .4s ease-in forwards; }
.toast.success { background: #16a34a; }
.toast.error { background: #dc2626; }
@keyframes toast-out { to { opacity: 0; visibility: hidden; } }
"#;

/// Page shell: head, nav bar, flash toasts
pub fn page(title: &str, viewer: Option<&Viewer<'_>>, flashes: &[Flash], content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " · BI Portal" }
                style { (PreEscaped(STYLE)) }
            }
            body {
                @if let Some(viewer) = viewer {
                    (nav(viewer))
                }
                main { (content) }
                @if !flashes.is_empty() {
                    div class="toasts" {
                        @for flash in flashes {
                            (toast(flash))
                        }
                    }
                }
            }
        }
    }
}

fn nav(viewer: &Viewer<'_>) -> Markup {
    html! {
        nav {
            strong { "BI Portal" }
            a href="/dashboards" { "Dashboards" }
            @if viewer.role.is_admin() {
                a href="/admin" { "Manage" }
                a href="/admin/permissions" { "Permissions" }
            }
            span class="spacer" {}
            span { (viewer.user.display_name()) " (" (viewer.role.as_str()) ")" }
            form method="post" action="/logout" {
                button class="muted" type="submit" { "Sign out" }
            }
        }
    }
}

fn toast(flash: &Flash) -> Markup {
    let class = match flash.kind {
        FlashKind::Success => "toast success",
        FlashKind::Error => "toast error",
    };
    html! {
        div class=(class) role="status"
            style=(format!("animation-delay: {}ms", flash.dismiss_after_ms())) {
            (flash.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_escapes_flash() {
        let flash = Flash::error("<script>alert(1)</script>");
        let html = page("T", None, std::slice::from_ref(&flash), html! { p { "body" } })
            .into_string();
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("animation-delay: 5000ms"));
        assert!(!html.contains("Sign out"));
    }

    #[test]
    fn test_flashes_stack() {
        let flashes = [Flash::success("Signed out"), Flash::error("Backend unavailable")];
        let html = page("T", None, &flashes, html! {}).into_string();
        assert_eq!(html.matches(r#"role="status""#).count(), 2);
        assert!(html.find("Signed out").unwrap() < html.find("Backend unavailable").unwrap());
    }

    #[test]
    fn test_admin_nav() {
        let user = User::new("u1", "admin@example.com");
        let viewer = Viewer {
            user: &user,
            role: Role::Admin,
        };
        let html = page("T", Some(&viewer), &[], html! {}).into_string();
        assert!(html.contains("/admin/permissions"));
        assert!(html.contains("admin@example.com (admin)"));
    }
}
