//! Brand catalog
//!
//! Maps a (brand, denomination) pair to the gift card issuer's catalog identifier, and carries the redemption URL that
//! is included when codes are delivered to the buyer.
//!
//! Brands are matched case-insensitively. Unknown brands are an error and are never mapped to a default SKU.
use std::{fmt::Display, path::Path};

use gcm_common::Cents;
use log::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_DENOMINATIONS: [i64; 4] = [10, 25, 50, 100];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("Unknown gift card brand: {0}")]
    UnknownBrand(String),
    #[error("{brand} gift cards are not available in a denomination of {denomination}")]
    UnsupportedDenomination { brand: String, denomination: Cents },
    #[error("Could not load the catalog: {0}")]
    LoadError(String),
}

/// The issuer's identifier for a specific brand and value, e.g. `AMZN-25`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogSku(pub String);

impl CatalogSku {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CatalogSku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub brand: String,
    pub sku_prefix: String,
    pub redemption_url: String,
    /// Supported face values, in whole dollars
    pub denominations: Vec<i64>,
}

impl CatalogEntry {
    fn new(brand: &str, sku_prefix: &str, redemption_url: &str, denominations: &[i64]) -> Self {
        Self {
            brand: brand.to_string(),
            sku_prefix: sku_prefix.to_string(),
            redemption_url: redemption_url.to_string(),
            denominations: denominations.to_vec(),
        }
    }

    pub fn supports(&self, denomination: Cents) -> bool {
        denomination.is_whole_dollars() && self.denominations.contains(&denomination.whole_dollars())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Default for Catalog {
    fn default() -> Self {
        let d = &DEFAULT_DENOMINATIONS;
        let entries = vec![
            CatalogEntry::new("Amazon", "AMZN", "https://www.amazon.com/gc/redeem", d),
            CatalogEntry::new(
                "Steam",
                "STEAM",
                "https://store.steampowered.com/account/redeemwalletcode",
                &[10, 20, 25, 50, 100],
            ),
            CatalogEntry::new("Apple", "APPL", "https://www.apple.com/redeem", d),
            CatalogEntry::new("Xbox", "XBOX", "https://account.microsoft.com/billing/redeem", d),
            CatalogEntry::new("PlayStation", "PSN", "https://store.playstation.com/redeem", d),
            CatalogEntry::new("Google Play", "GPLAY", "https://play.google.com/redeem", d),
            CatalogEntry::new("Spotify", "SPOT", "https://www.spotify.com/redeem", d),
            CatalogEntry::new("Netflix", "NF", "https://www.netflix.com/redeem", d),
        ];
        Self { entries }
    }
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Loads a catalog from a JSON file containing an array of [`CatalogEntry`] objects.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .map_err(|e| CatalogError::LoadError(format!("{}: {e}", path.display())))?;
        let entries: Vec<CatalogEntry> =
            serde_json::from_str(&data).map_err(|e| CatalogError::LoadError(format!("{}: {e}", path.display())))?;
        info!("🎁️ Loaded {} catalog entries from {}", entries.len(), path.display());
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn entry(&self, brand: &str) -> Result<&CatalogEntry, CatalogError> {
        let brand = brand.trim();
        self.entries
            .iter()
            .find(|e| e.brand.eq_ignore_ascii_case(brand))
            .ok_or_else(|| CatalogError::UnknownBrand(brand.to_string()))
    }

    /// Checks that the brand is known and that the issuer sells it in the given denomination.
    pub fn validate(&self, brand: &str, denomination: Cents) -> Result<(), CatalogError> {
        let entry = self.entry(brand)?;
        if entry.supports(denomination) {
            Ok(())
        } else {
            Err(CatalogError::UnsupportedDenomination { brand: entry.brand.clone(), denomination })
        }
    }

    pub fn sku_for(&self, brand: &str, denomination: Cents) -> Result<CatalogSku, CatalogError> {
        self.validate(brand, denomination)?;
        let entry = self.entry(brand)?;
        Ok(CatalogSku(format!("{}-{}", entry.sku_prefix, denomination.whole_dollars())))
    }

    pub fn redemption_url(&self, brand: &str) -> Option<&str> {
        self.entry(brand).ok().map(|e| e.redemption_url.as_str())
    }
}
