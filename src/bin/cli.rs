//! BI Portal CLI
//!
//! Command-line client for the portal's JSON API:
//! - Sign in and print an access token
//! - Show the current user and role
//! - List visible dashboards
//! - Check server health

use biportal::api::dto::{DashboardListResponse, HealthResponse, LoginResponse, MeResponse};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "biportal-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Command-line client for the BI Portal JSON API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Portal server URL
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and print an access token
    Login {
        /// Account email
        email: String,
        /// Password (default: BIPORTAL_PASSWORD)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Show the signed-in user and role
    Me {
        /// Access token (default: BIPORTAL_TOKEN)
        #[arg(short, long)]
        token: Option<String>,
    },

    /// List dashboards visible to the signed-in user
    Dashboards {
        /// Access token (default: BIPORTAL_TOKEN)
        #[arg(short, long)]
        token: Option<String>,
    },

    /// Show server health
    Status,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.api_url.trim_end_matches('/');

    match cli.command {
        Commands::Login { email, password } => {
            let Some(password) = password.or_else(|| std::env::var("BIPORTAL_PASSWORD").ok())
            else {
                eprintln!("Pass --password or set BIPORTAL_PASSWORD");
                std::process::exit(2);
            };

            let body = serde_json::json!({ "email": email, "password": password });
            let response = client
                .post(format!("{}/api/v1/auth/login", base))
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                eprintln!("Login failed ({}): {}", status, text);
                std::process::exit(1);
            }

            let login: LoginResponse = response.json().await?;
            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&login)?),
                _ => {
                    println!("Signed in as {} ({})", login.user.display_name(), login.role);
                    println!();
                    println!("export BIPORTAL_TOKEN={}", login.access_token);
                }
            }
        }

        Commands::Me { token } => {
            let token = require_token(token);
            let response = client
                .get(format!("{}/api/v1/me", base))
                .bearer_auth(&token)
                .send()
                .await?;

            if !response.status().is_success() {
                eprintln!("Request failed: {}", response.status());
                std::process::exit(1);
            }

            let me: MeResponse = response.json().await?;
            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&me)?),
                _ => {
                    println!("User:  {}", me.user.display_name());
                    println!("ID:    {}", me.user.id);
                    println!("Role:  {}", me.role);
                }
            }
        }

        Commands::Dashboards { token } => {
            let token = require_token(token);
            let response = client
                .get(format!("{}/api/v1/dashboards", base))
                .bearer_auth(&token)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                eprintln!("Failed to fetch dashboards ({}): {}", status, text);
                std::process::exit(1);
            }

            let list: DashboardListResponse = response.json().await?;
            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&list)?),
                _ if list.dashboards.is_empty() => {
                    println!("No dashboards have been shared with you yet.");
                }
                _ => {
                    println!("{:<6} {:<30} {:<12} {}", "ID", "Name", "Created", "Link");
                    println!("{}", "-".repeat(80));
                    for d in &list.dashboards {
                        println!(
                            "{:<6} {:<30} {:<12} {}",
                            d.id,
                            truncate(&d.name, 30),
                            d.created_at.format("%Y-%m-%d"),
                            d.embed_url
                        );
                    }
                    println!();
                    println!("{} dashboard(s), role: {}", list.total, list.role);
                }
            }
        }

        Commands::Status => {
            let response = client.get(format!("{}/health", base)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: HealthResponse = resp.json().await?;
                    match cli.format.as_str() {
                        "json" => println!("{}", serde_json::to_string_pretty(&health)?),
                        _ => {
                            println!("BI Portal v{}", health.version);
                            println!();
                            println!("Status:   {}", health.status);
                            println!("Backend:  {}", health.backend);
                            println!("Sessions: {}", health.sessions);
                            println!("Uptime:   {}", format_duration(health.uptime_seconds));
                        }
                    }
                }
                Ok(resp) => {
                    eprintln!("API returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to BI Portal at {}", cli.api_url);
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

fn require_token(token: Option<String>) -> String {
    match token.or_else(|| std::env::var("BIPORTAL_TOKEN").ok()) {
        Some(token) => token,
        None => {
            eprintln!("Pass --token or set BIPORTAL_TOKEN (see `biportal-cli login`)");
            std::process::exit(2);
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

fn format_duration(seconds: u64) -> String {
    let days = seconds / 86400;
    let hours = (seconds % 86400) / 3600;
    let minutes = (seconds % 3600) / 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m {}s", minutes, seconds % 60)
    }
}
