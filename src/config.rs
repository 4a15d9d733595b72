// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment at startup. The encrypted
//! custodial tables can come inline or from files; file-backed tables are
//! re-read on SIGHUP so registers can be rotated without a restart.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Root directory for the ledger db and audit logs | `/data` |
//! | `SETTLEMENT_GATEWAY_URL` | Base URL of the settlement gateway daemon | Required |
//! | `VAULT_PASSPHRASE` | Passphrase the vault key is derived from | Required |
//! | `VAULT_SALT` | Salt for vault key derivation | Required |
//! | `REGISTERS_JSON` | Encrypted register table, inline JSON | One of the two |
//! | `REGISTERS_PATH` | Encrypted register table, file path | One of the two |
//! | `RESERVE_JSON` | Encrypted reserve entry, inline JSON | One of the two |
//! | `RESERVE_PATH` | Encrypted reserve entry, file path | One of the two |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//!
//! Both tables are JSON objects mapping encrypted addresses to encrypted
//! secrets; the reserve table holds exactly one entry. The vault decrypts
//! them into a plaintext lookup map at load time.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;
use url::Url;

/// Default bind address.
const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
const DEFAULT_PORT: &str = "8080";

/// Default data directory.
const DEFAULT_DATA_DIR: &str = "/data";

// ============================================================================
// Fixed policy constants
// ============================================================================

/// A register whose balance would drop below this after an outgoing payment
/// is refilled from the reserve first.
pub const REGISTER_REFILL_FLOOR: Decimal = dec!(20);

/// Amount moved from the reserve per refill.
pub const REGISTER_REFILL_AMOUNT: Decimal = dec!(20);

/// Flat deduction applied on top of every successful outgoing settlement
/// event during reconciliation.
pub const OUTGOING_TRANSFER_SURCHARGE: Decimal = dec!(0.02);

/// Transaction history page size.
pub const TRANSACTION_PAGE_SIZE: usize = 25;

/// Swap history page size.
pub const SWAP_PAGE_SIZE: usize = 10;

/// How long a quoted payment stays available for sending.
pub const PREPARED_PAYMENT_TTL: Duration = Duration::from_secs(15 * 60);

/// Shared cache sizing.
pub const CACHE_CAPACITY: usize = 1024;
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Where an encrypted custodial table comes from.
#[derive(Debug, Clone)]
pub enum TableSource {
    /// Inline JSON from the environment, fixed for the process lifetime.
    Inline(String),
    /// A file path, re-read on every load.
    File(PathBuf),
}

impl TableSource {
    /// Read and parse the table from its source.
    pub fn read(&self) -> Result<HashMap<String, String>, ConfigError> {
        let raw = match self {
            TableSource::Inline(json) => json.clone(),
            TableSource::File(path) => std::fs::read_to_string(path).map_err(|e| {
                ConfigError::Invalid(format!("failed to read {}: {e}", path.display()))
            })?,
        };
        parse_table_json(&raw)
    }
}

fn parse_table_json(raw: &str) -> Result<HashMap<String, String>, ConfigError> {
    serde_json::from_str(raw)
        .map_err(|e| ConfigError::Invalid(format!("custodial table is not a JSON object: {e}")))
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub gateway_url: Url,
    pub vault_passphrase: String,
    pub vault_salt: String,
    pub registers: TableSource,
    pub reserve: TableSource,
}

impl BridgeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("HOST", DEFAULT_HOST);
        let port = env_or_default("PORT", DEFAULT_PORT)
            .parse::<u16>()
            .map_err(|e| ConfigError::Invalid(format!("PORT: {e}")))?;
        let data_dir = PathBuf::from(env_or_default("DATA_DIR", DEFAULT_DATA_DIR));
        let gateway_url = Url::parse(&env_required("SETTLEMENT_GATEWAY_URL")?)
            .map_err(|e| ConfigError::Invalid(format!("SETTLEMENT_GATEWAY_URL: {e}")))?;
        let vault_passphrase = env_required("VAULT_PASSPHRASE")?;
        let vault_salt = env_required("VAULT_SALT")?;
        let registers = table_source("REGISTERS_JSON", "REGISTERS_PATH")?;
        let reserve = table_source("RESERVE_JSON", "RESERVE_PATH")?;

        Ok(Self {
            host,
            port,
            data_dir,
            gateway_url,
            vault_passphrase,
            vault_salt,
            registers,
            reserve,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Read both encrypted custodial tables from their configured sources.
    pub fn load_custodial_tables(
        &self,
    ) -> Result<(HashMap<String, String>, HashMap<String, String>), ConfigError> {
        Ok((self.registers.read()?, self.reserve.read()?))
    }
}

fn table_source(inline_var: &str, path_var: &str) -> Result<TableSource, ConfigError> {
    if let Some(json) = env_optional(inline_var) {
        return Ok(TableSource::Inline(json));
    }
    if let Some(path) = env_optional(path_var) {
        return Ok(TableSource::File(PathBuf::from(path)));
    }
    Err(ConfigError::Missing(format!("{inline_var} or {path_var}")))
}

fn env_required(name: &str) -> Result<String, ConfigError> {
    env_optional(name).ok_or_else(|| ConfigError::Missing(name.to_string()))
}

fn env_optional(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        Err(_) => None,
    }
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
