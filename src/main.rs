mod db;
mod discover;
mod extract;
mod normalize;
mod pipeline;
mod render;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, bail};
use clap::{Parser, Subcommand};
use tracing::warn;

use render::Renderer;

#[derive(Parser)]
#[command(name = "menu_scraper", about = "McDonald's UA full-menu nutrition scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the menu index and print discovered item URLs
    Discover,
    /// Full pipeline: discover, render each item, persist, export
    Run {
        /// Max items to process (default: all discovered)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// WebDriver endpoint driving the browser session
        #[arg(long, default_value = "http://localhost:4444")]
        webdriver: String,
        /// Export file for this run's records
        #[arg(long, default_value = "products.json")]
        out: PathBuf,
    },
    /// List stored products
    List {
        #[arg(long, default_value = "0")]
        skip: usize,
        #[arg(short = 'n', long, default_value = "10")]
        limit: usize,
    },
    /// Show one product by name
    Show { name: String },
    /// Show one field of one product
    Field { name: String, field: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Discover => {
            let client = reqwest::Client::new();
            let urls = discover::fetch_menu_urls(&client, discover::MENU_URL).await?;
            for url in &urls {
                println!("{}", url);
            }
            println!("{} menu items discovered", urls.len());
            Ok(())
        }
        Commands::Run { limit, webdriver, out } => run(limit, &webdriver, &out).await,
        Commands::List { skip, limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let products = db::fetch_products(&conn, skip, limit)?;
            if products.is_empty() {
                println!("No products stored. Run 'run' first.");
                return Ok(());
            }
            println!(
                "{:<32} | {:>6} | {:>6} | {:>8} | {:<12}",
                "Product", "kcal", "fats", "proteins", "portion"
            );
            println!("{}", "-".repeat(78));
            for p in &products {
                println!(
                    "{:<32} | {:>6} | {:>6} | {:>8} | {:<12}",
                    truncate(&p.name, 32),
                    opt(p.calories),
                    opt(p.fats),
                    opt(p.proteins),
                    truncate(&p.portion, 12),
                );
            }
            println!("\n{} products", products.len());
            Ok(())
        }
        Commands::Show { name } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let product = db::fetch_by_name(&conn, &name)?
                .ok_or_else(|| anyhow!("Product '{}' not found", name))?;
            println!("{}", serde_json::to_string_pretty(&product)?);
            Ok(())
        }
        Commands::Field { name, field } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let product = db::fetch_by_name(&conn, &name)?
                .ok_or_else(|| anyhow!("Product '{}' not found", name))?;
            match db::field_value(&product, &field) {
                Some(value) => {
                    println!("{}", value);
                    Ok(())
                }
                None => bail!("Field '{}' does not exist on Product", field),
            }
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// One complete run: index fetch and session construction are fatal, the
/// per-item loop is not, and the browser session is released on every path
/// before the export is written.
async fn run(limit: Option<usize>, webdriver: &str, out: &std::path::Path) -> anyhow::Result<()> {
    let conn = db::connect()?;
    db::init_schema(&conn)?;

    let client = reqwest::Client::new();
    let mut urls = discover::fetch_menu_urls(&client, discover::MENU_URL).await?;
    if let Some(n) = limit {
        urls.truncate(n);
    }
    if urls.is_empty() {
        println!("No menu items found on the index page.");
        return Ok(());
    }

    println!("Scraping {} menu items...", urls.len());
    let renderer = Renderer::connect(webdriver).await?;
    let outcome = pipeline::process_all(&renderer, &conn, &urls).await;
    if let Err(e) = renderer.close().await {
        warn!("Failed to close webdriver session: {}", e);
    }

    let (products, stats) = outcome;
    pipeline::write_export(out, &products)?;
    println!(
        "Done: {} processed ({} ok, {} errors), exported to {}",
        stats.total,
        stats.ok,
        stats.errors,
        out.display()
    );
    Ok(())
}

fn opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map(|x| x.to_string()).unwrap_or_else(|| "-".into())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
