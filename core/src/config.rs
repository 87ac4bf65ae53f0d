//! Application settings loaded from the environment.
//!
//! `DATABASE_URL` is required and has no default. `HOST`/`PORT` are
//! carried for the external request-routing layer; the core never binds
//! a socket itself.

use crate::error::{AnalyticsError, AnalyticsResult};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone)]
pub struct Settings {
    /// Connection string to the relational store. For SQLite this is a
    /// filesystem path (`:memory:` is accepted for throwaway stores).
    pub database_url: String,
    /// Directory scanned for `activities_YYYYMMDD.csv` extracts.
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

impl Settings {
    pub fn from_env() -> AnalyticsResult<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AnalyticsError::MissingSetting("DATABASE_URL"))?;

        let data_dir = env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let host = env::var("HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse().map_err(|_| AnalyticsError::InvalidSetting {
                name: "PORT",
                value: raw.clone(),
            })?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            database_url,
            data_dir,
            host,
            port,
        })
    }
}
