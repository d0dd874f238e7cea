use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Command line client for the talent proxy", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:5000")]
    url: String,

    /// Admin API key, required for `status`.
    #[arg(short, long, env = "ADMIN_API_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxy liveness
    Health,
    /// Show proxy status and rate limiter occupancy (admin)
    Status,
    /// Search opportunities
    Search {
        /// Skill or role keywords
        #[arg(short = 'w', long)]
        keywords: String,
        /// Experience level, e.g. potential-to-develop
        #[arg(short, long)]
        experience: Option<String>,
        /// Maximum number of results
        #[arg(short, long)]
        limit: Option<u32>,
    },
    /// Fetch a genome (profile) by username
    Genome { username: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)).send().await?,
        Commands::Status => {
            let key = cli.key.ok_or("--key (or ADMIN_API_KEY) is required for status")?;
            let mut headers = HeaderMap::new();
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))?,
            );
            client
                .get(format!("{}/admin/status", base))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Search {
            keywords,
            experience,
            limit,
        } => {
            let mut body = Map::new();
            body.insert("keywords".into(), json!(keywords));
            if let Some(experience) = experience {
                body.insert("experience".into(), json!(experience));
            }
            if let Some(limit) = limit {
                body.insert("limit".into(), json!(limit));
            }
            client
                .post(format!("{}/api/job-search", base))
                .json(&Value::Object(body))
                .send()
                .await?
        }
        Commands::Genome { username } => {
            client
                .get(format!("{}/api/genome/{}", base, username))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        let text = res.text().await.unwrap_or_default();
        return Err(format!("proxy returned status {}: {}", status, text).into());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
