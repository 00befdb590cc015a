use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

use crate::error::{RelayError, Result};

const KEY_BASE_URL: &str = "ff-base-url";
const KEY_TOKEN: &str = "token";
const KEY_INCOME_ACCOUNT: &str = "inc-acct-id";
const KEY_OWED_ACCOUNT: &str = "owe-acct-id";
const KEY_CURRENCY: &str = "currency-code";

/// Environment overrides, checked after the properties file
const ENV_KEYS: [(&str, &str); 5] = [
    ("RELAY_BASE_URL", KEY_BASE_URL),
    ("RELAY_TOKEN", KEY_TOKEN),
    ("RELAY_INCOME_ACCOUNT_ID", KEY_INCOME_ACCOUNT),
    ("RELAY_OWED_ACCOUNT_ID", KEY_OWED_ACCOUNT),
    ("RELAY_CURRENCY_CODE", KEY_CURRENCY),
];

/// Validated process configuration
///
/// All keys except the currency code are required; a missing key is a
/// startup error, never a runtime one.
#[derive(Clone, Debug)]
pub struct RelayConfig {
    /// Ledger service root, also used to build and parse backlink URLs
    pub base_url: String,
    /// Bearer token for the ledger REST API
    pub token: String,
    /// Account the proportion transaction draws from
    pub income_account_id: u64,
    /// Account the proportion transaction deposits into
    pub owed_account_id: u64,
    pub currency_code: String,
}

impl RelayConfig {
    /// Load configuration from a properties file, then apply environment
    /// overrides. The file may be absent when the environment supplies
    /// every key.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut props = if path.exists() {
            read_props(path)?
        } else {
            HashMap::new()
        };
        for (env_key, prop_key) in ENV_KEYS {
            if let Ok(value) = env::var(env_key) {
                props.insert(prop_key.to_string(), value);
            }
        }
        Self::from_props(&props)
    }

    pub fn from_props(props: &HashMap<String, String>) -> Result<Self> {
        let base_url = required(props, KEY_BASE_URL)?
            .trim_end_matches('/')
            .to_string();
        let token = required(props, KEY_TOKEN)?.to_string();
        let income_account_id = account_id(props, KEY_INCOME_ACCOUNT)?;
        let owed_account_id = account_id(props, KEY_OWED_ACCOUNT)?;
        let currency_code = props
            .get(KEY_CURRENCY)
            .filter(|code| !code.is_empty())
            .cloned()
            .unwrap_or_else(|| "USD".to_string());

        Ok(Self {
            base_url,
            token,
            income_account_id,
            owed_account_id,
            currency_code,
        })
    }
}

fn required<'a>(props: &'a HashMap<String, String>, key: &str) -> Result<&'a str> {
    props
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| RelayError::Config(format!("missing required key '{key}'")))
}

fn account_id(props: &HashMap<String, String>, key: &str) -> Result<u64> {
    required(props, key)?
        .parse()
        .map_err(|_| RelayError::Config(format!("key '{key}' must be a numeric account id")))
}

/// Parse a `key=value` properties file; `#` lines are comments
pub fn read_props(path: &Path) -> Result<HashMap<String, String>> {
    let text = fs::read_to_string(path)?;
    let mut props = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            props.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    Ok(props)
}
