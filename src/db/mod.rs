//! # Database Module
//!
//! This module owns the PostgreSQL connection pool and schema setup
//! for the book-club backend. The tables store:
//!
//! - Event records (approval + activity state machines)
//! - Schedule slots and leader assignments
//! - Enrollments with their running counters
//! - Check-ins, flowers and per-day quotas
//! - Leaderboard snapshots and certificates
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      DATABASE LAYER                          │
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │                  Connection Pool                      │   │
//! │  │                 (deadpool-postgres)                   │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                            │                                 │
//! │        ┌───────────────────┼───────────────────┐            │
//! │        ▼                   ▼                   ▼            │
//! │  ┌──────────┐       ┌────────────┐      ┌────────────┐     │
//! │  │  events  │       │enrollments │      │  flowers   │     │
//! │  │  slots   │       │ check_ins  │      │   quotas   │     │
//! │  └──────────┘       └────────────┘      └────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Query functions live in [`queries`]; the invariant-carrying
//! multi-statement transactions live in the Postgres store
//! implementation, which builds on this pool.

pub mod models;
pub mod queries;

use deadpool_postgres::{Config, Pool, Runtime};
use thiserror::Error;
use tokio_postgres::{Config as TokioConfig, NoTls};
use tracing::{debug, info, warn};

/// Database-related errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to connect to the database
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryError(#[from] tokio_postgres::Error),

    /// Migration failed
    #[error("Migration failed: {0}")]
    MigrationError(String),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A stored value could not be decoded into its domain type
    #[error("Invalid row data: {0}")]
    InvalidRow(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

/// Database connection wrapper.
///
/// Wraps the deadpool connection pool and provides connection setup
/// and schema migration.
///
/// ## Usage
///
/// ```rust,ignore
/// let db = Database::connect(&config.database_url).await?;
/// db.run_migrations().await?;
/// let event = queries::get_event(db.pool(), event_id).await?;
/// ```
#[derive(Clone)]
pub struct Database {
    /// The connection pool
    pool: Pool,
}

impl Database {
    /// Connect to the PostgreSQL database.
    ///
    /// Creates a connection pool with sensible defaults (max 10
    /// connections) and verifies it with a probe query.
    ///
    /// ## Arguments
    ///
    /// * `database_url` - PostgreSQL connection string
    ///
    /// ## Returns
    ///
    /// * `Ok(Database)` - Connected successfully
    /// * `Err(DatabaseError)` - Connection failed
    pub async fn connect(database_url: &str) -> Result<Self, DatabaseError> {
        info!("Connecting to database...");

        // Parse the connection string using tokio_postgres::Config
        let tokio_config = database_url
            .parse::<TokioConfig>()
            .map_err(|e| DatabaseError::ConfigError(format!("Invalid database URL: {}", e)))?;

        // Convert to deadpool config
        let mut config = Config::new();

        if let Some(dbname) = tokio_config.get_dbname() {
            config.dbname = Some(dbname.to_string());
        }
        if let Some(user) = tokio_config.get_user() {
            config.user = Some(user.to_string());
        }
        if let Some(password) = tokio_config.get_password() {
            // Password is &[u8], convert to String
            config.password = Some(String::from_utf8_lossy(password).to_string());
        }
        if let Some(host) = tokio_config.get_hosts().first() {
            if let tokio_postgres::config::Host::Tcp(host_str) = host {
                config.host = Some(host_str.clone());
            }
        }
        if let Some(port) = tokio_config.get_ports().first() {
            config.port = Some(*port);
        }

        config.pool = Some(deadpool_postgres::PoolConfig {
            max_size: 10,
            ..Default::default()
        });

        let pool = config
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        // Probe the pool before declaring victory
        let client = pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;
        client
            .query("SELECT 1", &[])
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        info!("Database connection established");

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// The schema lives in a single idempotent SQL script; re-running
    /// against an existing database is safe.
    ///
    /// ## Migration Files
    ///
    /// ```text
    /// migrations/
    /// └── 001_initial_schema.sql
    /// ```
    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        info!("Running database migrations...");

        let client = self
            .pool
            .get()
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        // The working directory differs between `cargo run` and a
        // deployed binary; try the usual locations.
        let migration_paths = [
            "migrations/001_initial_schema.sql",
            "../migrations/001_initial_schema.sql",
            "./bookclub-backend/migrations/001_initial_schema.sql",
        ];

        let mut migration_sql = None;
        for path in &migration_paths {
            match std::fs::read_to_string(path) {
                Ok(content) => {
                    info!("Found migration file at: {}", path);
                    migration_sql = Some(content);
                    break;
                }
                Err(e) => {
                    debug!("Tried path '{}': {}", path, e);
                }
            }
        }

        let migration_sql = migration_sql.ok_or_else(|| {
            DatabaseError::MigrationError(format!(
                "Could not find migration file. Tried paths: {:?}",
                migration_paths
            ))
        })?;

        debug!("Executing migration SQL ({} bytes)...", migration_sql.len());

        // batch_execute runs the whole script in one round trip and
        // handles multiple statements correctly.
        match client.batch_execute(&migration_sql).await {
            Ok(_) => {
                info!("Migrations completed successfully");
                Ok(())
            }
            Err(e) => {
                // 42P07 = duplicate_table, 42710 = duplicate_object.
                // Those mean a previous run already created the schema.
                let is_duplicate = e
                    .code()
                    .map(|code| {
                        let code_str = code.code();
                        code_str == "42P07" || code_str == "42710"
                    })
                    .unwrap_or(false);

                if is_duplicate || e.to_string().contains("already exists") {
                    warn!("Schema objects already exist, continuing: {}", e);
                    Ok(())
                } else {
                    Err(DatabaseError::MigrationError(format!(
                        "Migration execution failed: {} (code: {:?})",
                        e,
                        e.code().map(|c| c.code())
                    )))
                }
            }
        }
    }

    /// Get a reference to the connection pool.
    ///
    /// Use this when you need direct access to the pool
    /// for custom queries.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

// Re-export commonly used items
pub use models::*;
