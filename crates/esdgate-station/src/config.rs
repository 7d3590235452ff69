//! Station configuration from the environment.

use std::env;
use std::path::PathBuf;

use esdgate_core::constants::NANO_BAUD_RATE;
use esdgate_core::{Error, Result};

/// Runtime configuration, read once at startup.
///
/// Every field has a default suitable for a dev box; a `.env` file is
/// honored when present.
#[derive(Debug, Clone)]
pub struct StationConfig {
    /// Backend API root, e.g. `http://172.16.65.18:8989/api`.
    pub api_url: String,

    /// Station identifier reported with every test record.
    pub station_id: String,

    /// Serial port of the ESD test-hardware controller.
    pub nano_port: String,

    /// Baud rate of the test controller link.
    pub nano_baud: u32,

    /// Append-only fallback file for records the backend did not accept.
    pub records_file: PathBuf,

    /// `tracing` filter directive.
    pub log_filter: String,
}

impl StationConfig {
    /// Load configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `ESDGATE_NANO_BAUD` is present but not
    /// a number.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let nano_baud = match env::var("ESDGATE_NANO_BAUD") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("invalid ESDGATE_NANO_BAUD: {raw}")))?,
            Err(_) => NANO_BAUD_RATE,
        };

        Ok(Self {
            api_url: env::var("ESDGATE_API_URL")
                .unwrap_or_else(|_| "http://172.16.65.18:8989/api".to_string()),
            station_id: env::var("ESDGATE_STATION_ID").unwrap_or_else(|_| "ESD-01".to_string()),
            nano_port: env::var("ESDGATE_NANO_PORT")
                .unwrap_or_else(|_| "/dev/ttyUSB0".to_string()),
            nano_baud,
            records_file: env::var("ESDGATE_RECORDS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("records.txt")),
            log_filter: env::var("ESDGATE_LOG").unwrap_or_else(|_| "esdgate=info".to_string()),
        })
    }
}
