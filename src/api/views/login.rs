use maud::{html, Markup};

use super::page;
use crate::session::Flash;

/// Sign-in and sign-up forms
pub fn render(flashes: &[Flash]) -> Markup {
    let content = html! {
        div class="grid" {
            section class="card" {
                h2 { "Sign in" }
                form class="stack" method="post" action="/login" {
                    input type="email" name="email" placeholder="Email" required autocomplete="username";
                    input type="password" name="password" placeholder="Password" required autocomplete="current-password";
                    button type="submit" { "Sign in" }
                }
            }
            section class="card" {
                h2 { "Create an account" }
                form class="stack" method="post" action="/signup" {
                    input type="email" name="email" placeholder="Email" required autocomplete="username";
                    input type="password" name="password" placeholder="Password" required minlength="6" autocomplete="new-password";
                    button type="submit" { "Sign up" }
                }
            }
        }
    };

    page("Sign in", None, flashes, content)
}
