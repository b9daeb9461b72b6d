use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[arg(long, default_value = "http://localhost:1111")]
    base_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Post `count` entries, each from its own fake address so the cooldown never trips.
    /// The server only honours those addresses when started with `TRUSTED_PROXY_HOPS=1`.
    Seed { count: u32 },

    /// Print the current entries
    List,

    /// Delete one entry
    Delete {
        id: String,

        #[arg(long, env = "ADMIN_PASSWORD")]
        secret: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let client = Client::new();
    let endpoint = format!("{}/api/guestbook", args.base_url.trim_end_matches('/'));

    match args.command {
        Command::Seed { count } => seed(&client, &endpoint, count).await,
        Command::List => list(&client, &endpoint).await,
        Command::Delete { id, secret } => delete(&client, &endpoint, &id, &secret).await,
    }
}

async fn seed(client: &Client, endpoint: &str, count: u32) -> Result<()> {
    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    let mut rejected = 0;

    for i in 0..count {
        let address = format!("198.18.{}.{}", i / 256, i % 256);
        pb.set_message(format!("Posting as {address}"));

        let course = (i % 3 == 0).then_some("intro to rust");

        let response = client
            .post(endpoint)
            .header("x-forwarded-for", &address)
            .json(&json!({
                "name": format!("Visitor {i}"),
                "comment": format!("Seeded comment number {i}"),
                "course": course,
            }))
            .send()
            .await?;

        if response.status() != StatusCode::CREATED {
            rejected += 1;
            pb.println(format!("{address}: {} {}", response.status(), response.text().await?));
        }

        pb.inc(1);
    }

    pb.finish_with_message("Done");
    println!("Accepted: {}", count - rejected);
    println!("Rejected: {rejected}");

    Ok(())
}

async fn list(client: &Client, endpoint: &str) -> Result<()> {
    let entries: Vec<Value> = client
        .get(endpoint)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    for entry in &entries {
        println!(
            "{} [{}] {} ({}): {}",
            entry["timestamp"].as_str().unwrap_or_default(),
            entry["id"].as_str().unwrap_or_default(),
            entry["name"].as_str().unwrap_or_default(),
            entry["location"].as_str().unwrap_or_default(),
            entry["comment"].as_str().unwrap_or_default(),
        );
    }

    println!("\nTotal entries: {}", entries.len());

    Ok(())
}

async fn delete(client: &Client, endpoint: &str, id: &str, secret: &str) -> Result<()> {
    let response = client
        .delete(endpoint)
        .query(&[("id", id)])
        .bearer_auth(secret)
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        bail!("Delete failed: {status} {body}");
    }

    println!("{body}");

    Ok(())
}
