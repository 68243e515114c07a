//! # Book Club Job Runner
//!
//! Operational entry point for the club engine: connects PostgreSQL,
//! runs migrations, and keeps the daily scheduler sweeping in-progress
//! events (leaderboard snapshots, backup flags, auto-completion).
//!
//! The HTTP/API surface lives in a separate deployment; this binary
//! only wires the engine to its infrastructure.
//!
//! ## Quick Start
//!
//! 1. Set up PostgreSQL and create the database
//! 2. Copy `.env.example` to `.env` and configure
//! 3. Start the runner: `cargo run --bin club-backend`
//!
//! ## Environment Variables
//!
//! See [`bookclub_backend::config`] for all supported keys.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use bookclub_backend::db::Database;
use bookclub_backend::{AppConfig, DailyScheduler, LoggingNotifier, PgStore, SystemClock};

/// Main entry point for the job runner.
///
/// This function:
/// 1. Initializes logging
/// 2. Loads configuration from environment
/// 3. Connects the database and runs migrations
/// 4. Starts the daily scheduler until Ctrl-C
#[tokio::main]
async fn main() {
    // =========================================
    // STEP 1: Initialize Logging
    // =========================================
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("🚀 Starting Book Club Backend Service");

    // =========================================
    // STEP 2: Load Configuration
    // =========================================
    dotenvy::dotenv().ok(); // It's okay if .env doesn't exist

    let config = AppConfig::from_env().expect("Failed to load configuration");

    info!("📋 Configuration loaded");
    info!("   Daily flower quota: {}", config.daily_flower_quota);
    info!("   Flower grace days:  {}", config.flower_grace_days);
    info!("   Sweep interval:     {}s", config.stat_interval_secs);

    // =========================================
    // STEP 3: Initialize Database
    // =========================================
    let db = Database::connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    info!("🗄️  Database connected");

    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    info!("📦 Database migrations complete");

    // =========================================
    // STEP 4: Start the Daily Scheduler
    // =========================================
    let store = Arc::new(PgStore::new(db));
    let clock = Arc::new(SystemClock);
    let notifier = Arc::new(LoggingNotifier);

    let scheduler = DailyScheduler::new(store, clock, notifier, config);

    info!("📅 Daily scheduler starting");

    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("🛑 Shutdown signal received");
        }
    }
}
