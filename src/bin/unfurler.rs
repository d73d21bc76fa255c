// src/bin/unfurler.rs
use clap::{value_parser, Arg, Command};
use std::process;
use anyhow::Result;

use unfurler::logging::init_tracing;
use unfurler::Settings;

mod commands;
use commands::*;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let app = Command::new("unfurler")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Unfurler - link metadata enrichment workers")
        .subcommand(
            Command::new("start")
                .about("Start enrichment workers")
                .arg(Arg::new("concurrency")
                    .short('c')
                    .long("concurrency")
                    .value_name("NUMBER")
                    .help("Number of workers (0 or less uses the default)")
                    .allow_negative_numbers(true)
                    .value_parser(value_parser!(i64)))
                .arg(Arg::new("poll_timeout")
                    .long("poll-timeout")
                    .value_name("SECONDS")
                    .help("How long a worker blocks waiting for a job")
                    .value_parser(value_parser!(u64).range(1..)))
                .arg(Arg::new("fetch_timeout")
                    .long("fetch-timeout")
                    .value_name("SECONDS")
                    .help("Upper bound for a single metadata fetch")
                    .value_parser(value_parser!(u64)))
                .arg(Arg::new("http")
                    .long("http")
                    .value_name("ADDR")
                    .help("Serve /stats and /in_flight.csv on this address"))
        )
        .subcommand(
            Command::new("enqueue")
                .about("Enqueue a metadata fetch for one link")
                .arg(Arg::new("content")
                    .long("content")
                    .value_name("ID")
                    .help("Owning content id")
                    .required(true))
                .arg(Arg::new("link")
                    .long("link")
                    .value_name("ID")
                    .help("Link id")
                    .required(true))
                .arg(Arg::new("url")
                    .long("url")
                    .value_name("URL")
                    .help("Target URL")
                    .required(true))
        )
        .subcommand(
            Command::new("stats")
                .about("Show pending and in-flight depths")
                .arg(Arg::new("watch")
                    .short('w')
                    .long("watch")
                    .help("Watch stats in real-time")
                    .action(clap::ArgAction::SetTrue))
        )
        .subcommand(
            Command::new("in-flight")
                .about("List in-flight jobs, oldest first")
                .arg(Arg::new("limit")
                    .short('l')
                    .long("limit")
                    .value_name("NUMBER")
                    .help("Limit number of results")
                    .default_value("20")
                    .value_parser(value_parser!(usize)))
        );

    let matches = app.get_matches();
    let settings = Settings::from_env()?;

    match matches.subcommand() {
        Some(("start", sub_matches)) => start_command(sub_matches, settings).await,
        Some(("enqueue", sub_matches)) => enqueue_command(sub_matches, settings).await,
        Some(("stats", sub_matches)) => stats_command(sub_matches, settings).await,
        Some(("in-flight", sub_matches)) => in_flight_command(sub_matches, settings).await,
        _ => {
            println!("No command specified. Use --help for usage information.");
            process::exit(1);
        }
    }
}
