use anyhow::{Context, Result};
use clap::Parser;
use plb::Database;

/// Looks up which zone(s) a point falls in, printing one block per match
/// plus the point's distance to the nearest zone boundary.
#[derive(Parser, Debug)]
#[command(name = "zdlookup", version)]
struct Args {
    /// Path to the `.bin` database.
    db_path: std::path::PathBuf,

    /// Latitude in degrees.
    lat: f64,

    /// Longitude in degrees.
    lon: f64,
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();

    let db = Database::open(&args.db_path)
        .with_context(|| format!("could not open database {}", args.db_path.display()))?;

    let outcome = db.lookup(args.lat, args.lon, true);
    print_results(&outcome);

    Ok(())
}

fn print_results(outcome: &plb::LookupOutcome) {
    for hit in &outcome.results {
        println!("{}:", hit.result);
        println!("  meta: {}", hit.meta_id);
        for (name, value) in &hit.fields {
            if !name.is_empty() && !value.is_empty() {
                println!("  {name}: {value}");
            }
        }
    }

    if !outcome.results.is_empty() {
        if let Some(safezone) = outcome.safezone_deg {
            println!("Safezone: {safezone}");
        }
    }

    println!();
    println!();
}
