// src/bin/commands/mod.rs
use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, App, HttpServer};
use anyhow::{Context, Result};
use chrono::Utc;
use clap::ArgMatches;
use colored::*;
use tokio::signal;
use tokio::time::interval;

use unfurler::redis_pool::get_redis_conn;
use unfurler::routes::metrics_route::ops_routes;
use unfurler::services::metrics_service::OpsState;
use unfurler::utils::job_info::JobInfo;
use unfurler::{
    HttpFetcher, JobQueue, LinkJob, RedisPersister, RedisPublisher, RedisQueue, Settings,
    WorkerPool,
};

// Start enrichment workers until Ctrl+C
pub async fn start_command(matches: &ArgMatches, settings: Settings) -> Result<()> {
    let mut pool_config = settings.pool.clone();
    if let Some(workers) = matches.get_one::<i64>("concurrency") {
        pool_config = pool_config.with_requested_workers(*workers);
    }
    if let Some(secs) = matches.get_one::<u64>("poll_timeout") {
        pool_config = pool_config.with_poll_timeout(Duration::from_secs(*secs));
    }
    if let Some(secs) = matches.get_one::<u64>("fetch_timeout") {
        pool_config = pool_config.with_fetch_timeout(Duration::from_secs(*secs));
    }

    let client = redis::Client::open(settings.redis_url.as_str())
        .with_context(|| format!("Invalid Redis URL {}", settings.redis_url))?;
    let queue: Arc<dyn JobQueue> = Arc::new(RedisQueue::new(client.clone(), &settings.key_prefix).await?);
    let conn = get_redis_conn(&client).await.context("Failed to connect to Redis")?;
    let persister = Arc::new(RedisPersister::new(conn.clone(), settings.key_prefix.as_str()));
    let publisher = Arc::new(RedisPublisher::new(conn, settings.events_channel.as_str()));
    let fetcher = Arc::new(HttpFetcher::new(pool_config.fetch_timeout)?);

    println!("{}", "🚀 Starting unfurler workers...".green().bold());
    println!("Workers: {}", pool_config.workers);
    println!("Queue prefix: {}", settings.key_prefix);
    println!("Events channel: {}", settings.events_channel);

    let controller = WorkerPool::new(queue.clone(), fetcher, persister, publisher)
        .with_config(pool_config)
        .start();

    match matches.get_one::<String>("http") {
        Some(addr) => {
            let state = OpsState {
                queue: queue.clone(),
                basic_auth: settings.basic_auth.clone(),
            };
            let server = HttpServer::new(move || {
                App::new()
                    .app_data(web::Data::new(state.clone()))
                    .configure(ops_routes)
            })
            .disable_signals()
            .bind(addr.as_str())
            .with_context(|| format!("Failed to bind {addr}"))?
            .run();
            let server_handle = server.handle();
            tokio::pin!(server);

            println!("Ops endpoints on http://{addr}");
            println!("{}", "✅ Workers started. Press Ctrl+C to stop.".green());

            let interrupted = tokio::select! {
                result = &mut server => {
                    result?;
                    false
                }
                result = signal::ctrl_c() => {
                    result?;
                    true
                }
            };
            if interrupted {
                let (_, result) = tokio::join!(server_handle.stop(true), &mut server);
                result?;
            }
        }
        None => {
            println!("{}", "✅ Workers started. Press Ctrl+C to stop.".green());
            signal::ctrl_c().await?;
        }
    }

    println!("\n{}", "🛑 Shutting down workers...".yellow());
    controller.stop().await;
    println!("{}", "✅ Workers stopped.".green());

    Ok(())
}

// Enqueue a single link job
pub async fn enqueue_command(matches: &ArgMatches, settings: Settings) -> Result<()> {
    let content = matches.get_one::<String>("content").context("--content is required")?;
    let link = matches.get_one::<String>("link").context("--link is required")?;
    let url = matches.get_one::<String>("url").context("--url is required")?;

    let job = LinkJob::new(content.as_str(), link.as_str(), url.as_str())?;
    let queue = RedisQueue::connect(&settings.redis_url, &settings.key_prefix).await?;
    queue.enqueue(&job).await?;

    println!("{} {}", "✅ Enqueued job ID:".green(), job.id());
    Ok(())
}

// Show queue depths, optionally refreshing
pub async fn stats_command(matches: &ArgMatches, settings: Settings) -> Result<()> {
    let queue = RedisQueue::connect(&settings.redis_url, &settings.key_prefix).await?;

    if !matches.get_flag("watch") {
        return show_stats(&queue).await;
    }

    println!("{}", "📈 Watching unfurler stats (Press Ctrl+C to stop)".blue().bold());
    let mut interval = interval(Duration::from_secs(2));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                // Clear screen
                print!("\x1B[2J\x1B[1;1H");
                if let Err(e) = show_stats(&queue).await {
                    eprintln!("Error: {}", e);
                    break;
                }
            }
            _ = signal::ctrl_c() => {
                println!("\n{}", "👋 Stopped watching.".green());
                break;
            }
        }
    }
    Ok(())
}

async fn show_stats(queue: &RedisQueue) -> Result<()> {
    let pending = queue.pending_depth().await?;
    let in_flight = queue.in_flight_depth().await?;

    println!("{}", format!("📊 Unfurler Statistics - {}", Utc::now().format("%H:%M:%S")).blue().bold());
    println!("{}", "=".repeat(40).blue());
    println!("  Pending:   {}", pending.to_string().yellow());
    println!("  In-flight: {}", in_flight.to_string().cyan());
    Ok(())
}

// List in-flight jobs so stuck entries are visible
pub async fn in_flight_command(matches: &ArgMatches, settings: Settings) -> Result<()> {
    let limit = matches.get_one::<usize>("limit").copied().unwrap_or(20);
    let queue = RedisQueue::connect(&settings.redis_url, &settings.key_prefix).await?;
    let payloads = queue.peek_in_flight(limit).await?;

    if payloads.is_empty() {
        println!("{}", "No in-flight jobs.".green());
        return Ok(());
    }

    println!("{:<12} {:<26} {:<16} {}", "ID".bold(), "Created".bold(), "Link".bold(), "URL".bold());
    println!("{}", "-".repeat(80));
    for payload in payloads {
        let info = JobInfo::from_payload(&payload);
        let id = if info.id == "malformed" { info.id.red() } else { info.id.normal() };
        println!("{:<12} {:<26} {:<16} {}", id, info.created_at, info.link_id, info.url);
    }
    Ok(())
}
