//! Dengue Dashboard CLI
//!
//! Command-line interface for the dashboard API:
//! - Add and delete case records
//! - List records with the table filters
//! - Upload CSV exports
//! - Print dashboard aggregates and map data

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use dengue_dash::import::CaseCsvImporter;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dengue")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Record and summarize dengue case reports")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8086", global = true)]
    pub api_url: String,

    /// Output format (table, json, csv)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a case record
    Add {
        /// City or municipality
        location: String,
        /// Region name, e.g. "CARAGA"
        #[arg(short, long, default_value = "")]
        region: String,
        #[arg(short, long, default_value = "0")]
        cases: u64,
        #[arg(short, long, default_value = "0")]
        deaths: u64,
        /// Report date (YYYY-MM-DD)
        #[arg(short = 't', long)]
        date: Option<String>,
    },

    /// List records
    List {
        /// Search across location, region, cases and deaths
        #[arg(short, long)]
        query: Option<String>,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        region: Option<String>,
        /// Sort field (location, region, cases, deaths, date)
        #[arg(short, long)]
        sort: Option<String>,
        /// Sort descending
        #[arg(long)]
        desc: bool,
        #[arg(short, long, default_value = "1")]
        page: usize,
        #[arg(long, default_value = "8")]
        per_page: usize,
        /// Bypass the server-side cache
        #[arg(long)]
        refresh: bool,
    },

    /// Delete a record by id
    Delete { id: String },

    /// Upload a CSV export
    Import {
        /// Path to CSV file
        path: PathBuf,
        /// Leading data rows to drop (server default when omitted)
        #[arg(long)]
        skip_rows: Option<usize>,
        /// Parse locally and show what would be imported
        #[arg(long)]
        dry_run: bool,
    },

    /// Show aggregated totals
    Dashboard {
        /// Year (YYYY)
        #[arg(short, long)]
        year: Option<String>,
        /// Month (MM)
        #[arg(short, long)]
        month: Option<String>,
        /// Grouping: location, region or region_name
        #[arg(short, long, default_value = "location")]
        group_by: String,
    },

    /// Show per-region map data
    Map {
        #[arg(short, long)]
        year: Option<String>,
        #[arg(short, long)]
        month: Option<String>,
        /// Color scale: relative or absolute
        #[arg(short, long)]
        scale: Option<String>,
        /// Write the enriched GeoJSON to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the region catalog
    Regions,

    /// Show server status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let api = format!("{}/api/v1", cli.api_url.trim_end_matches('/'));

    match cli.command {
        Commands::Add {
            location,
            region,
            cases,
            deaths,
            date,
        } => {
            let body = serde_json::json!({
                "location": location,
                "region": region,
                "cases": cases,
                "deaths": deaths,
                "date": date.unwrap_or_default(),
            });

            let response = client
                .post(format!("{}/records", api))
                .json(&body)
                .send()
                .await?;
            let created = expect_json(response).await?;

            println!(
                "Added {} ({} cases, {} deaths) as {}",
                location,
                cases,
                deaths,
                created["id"].as_str().unwrap_or("?")
            );
        }

        Commands::List {
            query,
            location,
            region,
            sort,
            desc,
            page,
            per_page,
            refresh,
        } => {
            let mut params: Vec<(&str, String)> = vec![
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
                ("refresh", refresh.to_string()),
            ];
            if let Some(q) = query {
                params.push(("q", q));
            }
            if let Some(location) = location {
                params.push(("location", location));
            }
            if let Some(region) = region {
                params.push(("region", region));
            }
            if let Some(sort) = sort {
                params.push(("sort", sort));
                params.push(("order", if desc { "desc" } else { "asc" }.to_string()));
            }

            let response = client
                .get(format!("{}/records", api))
                .query(&params)
                .send()
                .await?;
            let data = expect_json(response).await?;

            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&data)?),
                "csv" => print_records_csv(&data)?,
                _ => print_records_table(&data),
            }
        }

        Commands::Delete { id } => {
            let response = client
                .delete(format!("{}/records/{}", api, urlencoding::encode(&id)))
                .send()
                .await?;

            if response.status().is_success() {
                println!("Deleted {}", id);
            } else {
                fail::<()>(response).await?;
            }
        }

        Commands::Import {
            path,
            skip_rows,
            dry_run,
        } => {
            if !path.exists() {
                bail!("File not found: {:?}", path);
            }

            if dry_run {
                let mut importer = CaseCsvImporter::new();
                if let Some(skip) = skip_rows {
                    importer = importer.with_skip_rows(skip);
                }
                let parsed = importer.parse_path(&path)?;

                println!("Rows read: {}", parsed.rows_read);
                println!("Rows skipped: {}", parsed.rows_skipped);
                println!("Rows to import: {}", parsed.rows.len());
                for row in parsed.rows.iter().take(10) {
                    println!(
                        "  line {}: {} / {} / {} cases / {} deaths / {}",
                        row.line,
                        row.record.location,
                        row.record.region,
                        row.record.cases,
                        row.record.deaths,
                        row.record
                            .date
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "-".to_string())
                    );
                }
                println!();
                println!("(Dry run - no data was imported)");
                return Ok(());
            }

            let body = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {:?}", path))?;

            let mut request = client
                .post(format!("{}/import", api))
                .header("Content-Type", "text/csv")
                .body(body);
            if let Some(skip) = skip_rows {
                request = request.query(&[("skip_rows", skip)]);
            }

            let response = request.send().await?;
            let report = expect_json(response).await?;

            println!("Import {}", report["status"].as_str().unwrap_or("unknown"));
            println!("  Rows read: {}", report["rows_read"].as_u64().unwrap_or(0));
            println!("  Rows skipped: {}", report["rows_skipped"].as_u64().unwrap_or(0));
            println!("  Written: {}", report["written"].as_u64().unwrap_or(0));

            if let Some(failures) = report["failures"].as_array() {
                println!("  Failed: {}", failures.len());
                for failure in failures.iter().take(10) {
                    println!(
                        "    line {}: {} ({})",
                        failure["line"].as_u64().unwrap_or(0),
                        failure["location"].as_str().unwrap_or("-"),
                        failure["error"].as_str().unwrap_or("-")
                    );
                }
            }
        }

        Commands::Dashboard {
            year,
            month,
            group_by,
        } => {
            let mut params = vec![("group_by", group_by)];
            if let Some(year) = year {
                params.push(("year", year));
            }
            if let Some(month) = month {
                params.push(("month", month));
            }

            let response = client
                .get(format!("{}/dashboard", api))
                .query(&params)
                .send()
                .await?;
            let data = expect_json(response).await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                print_buckets(&data["buckets"]);
                println!();
                println!(
                    "Total: {} cases, {} deaths",
                    data["total_cases"].as_u64().unwrap_or(0),
                    data["total_deaths"].as_u64().unwrap_or(0)
                );
            }
        }

        Commands::Map {
            year,
            month,
            scale,
            output,
        } => {
            let mut params = Vec::new();
            if let Some(year) = year {
                params.push(("year", year));
            }
            if let Some(month) = month {
                params.push(("month", month));
            }
            if let Some(scale) = scale {
                params.push(("scale", scale));
            }

            let response = client
                .get(format!("{}/map", api))
                .query(&params)
                .send()
                .await?;
            let data = expect_json(response).await?;

            if let Some(path) = output {
                std::fs::write(&path, serde_json::to_string(&data["geojson"])?)?;
                println!("GeoJSON written to {:?}", path);
            }

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                print_map(&data);
            }
        }

        Commands::Regions => {
            let response = client.get(format!("{}/regions", api)).send().await?;
            let data = expect_json(response).await?;

            println!("{:<6} {}", "Code", "Name");
            println!("{}", "-".repeat(40));
            for region in data["regions"].as_array().into_iter().flatten() {
                println!(
                    "{:<6} {}",
                    region["code"].as_str().unwrap_or("-"),
                    region["name"].as_str().unwrap_or("-")
                );
            }
        }

        Commands::Status => {
            let response = client
                .get(format!("{}/health", cli.api_url))
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: Value = resp.json().await?;

                    println!("Dengue dashboard v{}", env!("CARGO_PKG_VERSION"));
                    println!();
                    println!("API Status: {}", health["status"].as_str().unwrap_or("unknown"));
                    println!(
                        "Record store: {} ({})",
                        health["store"].as_str().unwrap_or("unknown"),
                        health["backend"].as_str().unwrap_or("unknown")
                    );
                    println!(
                        "Cached records: {}",
                        health["cache"]["records"].as_u64().unwrap_or(0)
                    );

                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => bail!("API returned error: {}", resp.status()),
                Err(e) => {
                    eprintln!("Cannot connect to the dashboard API at {}", cli.api_url);
                    eprintln!();
                    eprintln!("Make sure the API server is running:");
                    eprintln!("  cargo run --bin dengue-api");
                    return Err(e.into());
                }
            }
        }

        Commands::Config { output } => {
            let config = dengue_dash::config::generate_default_config();

            match output {
                Some(path) => {
                    // Create parent directory if needed
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

/// Decode a successful JSON response or turn the error body into an error
async fn expect_json(response: reqwest::Response) -> anyhow::Result<Value> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        fail(response).await
    }
}

async fn fail<T>(response: reqwest::Response) -> anyhow::Result<T> {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();

    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|body| {
            let message = body["error"]["message"].as_str()?.to_string();
            if body["error"]["retryable"].as_bool() == Some(true) {
                Some(format!("{} (try again)", message))
            } else {
                Some(message)
            }
        })
        .unwrap_or(text);

    bail!("Request failed ({}): {}", status, message)
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

fn print_records_table(data: &Value) {
    let records = match data["records"].as_array() {
        Some(r) if !r.is_empty() => r,
        _ => {
            println!("No records");
            return;
        }
    };

    println!(
        "{:<20} {:<32} {:>7} {:>7} {:<10}  {}",
        "Location", "Region", "Cases", "Deaths", "Date", "ID"
    );
    println!("{}", "-".repeat(100));

    for record in records {
        println!(
            "{:<20} {:<32} {:>7} {:>7} {:<10}  {}",
            record["location"].as_str().unwrap_or("-"),
            record["region"].as_str().unwrap_or("-"),
            record["cases"].as_u64().unwrap_or(0),
            record["deaths"].as_u64().unwrap_or(0),
            record["date"].as_str().unwrap_or("-"),
            record["id"].as_str().unwrap_or("-"),
        );
    }

    println!();
    println!(
        "Page {} of {} ({} records)",
        data["page"].as_u64().unwrap_or(1),
        data["pages"].as_u64().unwrap_or(1).max(1),
        data["total"].as_u64().unwrap_or(0)
    );
}

fn print_records_csv(data: &Value) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    writer.write_record(["id", "location", "region", "cases", "deaths", "date"])?;

    for record in data["records"].as_array().into_iter().flatten() {
        let cases = record["cases"].as_u64().unwrap_or(0).to_string();
        let deaths = record["deaths"].as_u64().unwrap_or(0).to_string();
        writer.write_record([
            record["id"].as_str().unwrap_or(""),
            record["location"].as_str().unwrap_or(""),
            record["region"].as_str().unwrap_or(""),
            cases.as_str(),
            deaths.as_str(),
            record["date"].as_str().unwrap_or(""),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn print_buckets(buckets: &Value) {
    let buckets = match buckets.as_array() {
        Some(b) if !b.is_empty() => b,
        _ => {
            println!("No data for the selected period");
            return;
        }
    };

    println!("{:<32} {:>8} {:>8}", "Group", "Cases", "Deaths");
    println!("{}", "-".repeat(50));
    for bucket in buckets {
        let key = bucket["key"].as_str().unwrap_or("");
        println!(
            "{:<32} {:>8} {:>8}",
            if key.is_empty() { "(none)" } else { key },
            bucket["total_cases"].as_u64().unwrap_or(0),
            bucket["total_deaths"].as_u64().unwrap_or(0)
        );
    }
}

fn print_map(data: &Value) {
    println!(
        "Mean per region: {:.1} cases, {:.1} deaths",
        data["stats"]["mean_cases"].as_f64().unwrap_or(0.0),
        data["stats"]["mean_deaths"].as_f64().unwrap_or(0.0)
    );
    println!();

    println!("{:<6} {:<32} {:>8} {:>8}  {}", "Code", "Region", "Cases", "Deaths", "Fill");
    println!("{}", "-".repeat(68));
    for feature in data["geojson"]["features"].as_array().into_iter().flatten() {
        let props = &feature["properties"];
        println!(
            "{:<6} {:<32} {:>8} {:>8}  {}",
            props["id"].as_str().unwrap_or("-"),
            props["region_name"].as_str().unwrap_or("-"),
            props["cases"].as_u64().unwrap_or(0),
            props["deaths"].as_u64().unwrap_or(0),
            props["fill"].as_str().unwrap_or("-")
        );
    }

    if let Some(unmatched) = data["unmatched"].as_array().filter(|u| !u.is_empty()) {
        println!();
        println!("Not on the map (unknown region name):");
        for bucket in unmatched {
            let key = bucket["key"].as_str().unwrap_or("");
            println!(
                "  {:<30} {:>8} cases",
                if key.is_empty() { "(blank)" } else { key },
                bucket["total_cases"].as_u64().unwrap_or(0)
            );
        }
    }
}
