use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::converter::ConvertOptions;
use crate::error::{ConvertError, Result};
use crate::extractors::{ExtractOptions, DEFAULT_LOOKBACK_ROWS};
use crate::resolver::FALLBACK_CODE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_fallback_code")]
    pub fallback_code: String,
    #[serde(default = "default_fallback_code")]
    pub clearing_code: String,
    #[serde(default = "default_lookback_rows")]
    pub lookback_rows: usize,
    #[serde(default = "default_bank")]
    pub default_bank: String,
    #[serde(default)]
    pub debit_prefixes: Vec<String>,
    #[serde(default)]
    pub credit_prefixes: Vec<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_interest_account")]
    pub interest_account: String,
    #[serde(default = "default_discount_account")]
    pub discount_account: String,
    #[serde(default = "default_bank_fee_account")]
    pub bank_fee_account: String,
    #[serde(default = "default_notary_fee_account")]
    pub notary_fee_account: String,
}

fn default_fallback_code() -> String {
    FALLBACK_CODE.to_string()
}

fn default_lookback_rows() -> usize {
    DEFAULT_LOOKBACK_ROWS
}

fn default_bank() -> String {
    ExtractOptions::default().default_bank
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_interest_account() -> String {
    ExtractOptions::default().interest_account
}

fn default_discount_account() -> String {
    ExtractOptions::default().discount_account
}

fn default_bank_fee_account() -> String {
    ExtractOptions::default().bank_fee_account
}

fn default_notary_fee_account() -> String {
    ExtractOptions::default().notary_fee_account
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            fallback_code: default_fallback_code(),
            clearing_code: default_fallback_code(),
            lookback_rows: default_lookback_rows(),
            default_bank: default_bank(),
            debit_prefixes: Vec::new(),
            credit_prefixes: Vec::new(),
            output_dir: default_output_dir(),
            interest_account: default_interest_account(),
            discount_account: default_discount_account(),
            bank_fee_account: default_bank_fee_account(),
            notary_fee_account: default_notary_fee_account(),
        }
    }
}

impl Settings {
    /// Conversion options from these settings. Prefixes given on the
    /// command line replace the configured ones side by side.
    pub fn convert_options(&self, debit_prefixes: &[String], credit_prefixes: &[String]) -> ConvertOptions {
        let pick = |cli: &[String], configured: &[String]| {
            if cli.is_empty() {
                configured.to_vec()
            } else {
                cli.to_vec()
            }
        };
        ConvertOptions {
            fallback_code: self.fallback_code.clone(),
            extract: ExtractOptions {
                debit_prefixes: pick(debit_prefixes, &self.debit_prefixes),
                credit_prefixes: pick(credit_prefixes, &self.credit_prefixes),
                clearing_code: self.clearing_code.clone(),
                lookback_rows: self.lookback_rows,
                default_bank: self.default_bank.clone(),
                interest_account: self.interest_account.clone(),
                discount_account: self.discount_account.clone(),
                bank_fee_account: self.bank_fee_account.clone(),
                notary_fee_account: self.notary_fee_account.clone(),
            },
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("razao")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

/// Missing or unreadable files fall back to defaults.
pub fn load_settings_from(path: &std::path::Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &std::path::Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(|e| ConvertError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            fallback_code: "0".to_string(),
            debit_prefixes: vec!["1.1.2".to_string()],
            lookback_rows: 4,
            ..Default::default()
        };
        save_settings_to(&settings, &path).unwrap();
        assert_eq!(load_settings_from(&path), settings);
    }

    #[test]
    fn test_load_returns_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let s = load_settings_from(&dir.path().join("absent.json"));
        assert_eq!(s.fallback_code, FALLBACK_CODE);
        assert_eq!(s.lookback_rows, DEFAULT_LOOKBACK_ROWS);
        assert!(s.debit_prefixes.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"credit_prefixes": ["2.1.1"], "default_bank": "Banco Sicredi"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.credit_prefixes, vec!["2.1.1"]);
        assert_eq!(s.default_bank, "Banco Sicredi");
        assert_eq!(s.clearing_code, FALLBACK_CODE);
        assert_eq!(s.interest_account, "JUROS RECEBIDOS");
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(load_settings_from(&path), Settings::default());
    }

    #[test]
    fn test_save_creates_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep").join("nested").join("settings.json");
        save_settings_to(&Settings::default(), &path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_command_line_prefixes_override() {
        let settings = Settings {
            debit_prefixes: vec!["1".to_string()],
            credit_prefixes: vec!["2".to_string()],
            ..Default::default()
        };
        let opts = settings.convert_options(&["9".to_string()], &[]);
        assert_eq!(opts.extract.debit_prefixes, vec!["9"]);
        assert_eq!(opts.extract.credit_prefixes, vec!["2"]);
        assert_eq!(opts.fallback_code, FALLBACK_CODE);
    }

    #[test]
    fn test_shellexpand_path() {
        if dirs::home_dir().is_some() {
            assert!(!shellexpand_path("~/ledgers").starts_with('~'));
        }
        assert_eq!(shellexpand_path("/tmp/x"), "/tmp/x");
    }
}
