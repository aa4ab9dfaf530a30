//! Coin package catalog.
//!
//! The catalog is built once from configuration and shared by reference
//! between the approval processor and the purchase endpoints, so there is
//! exactly one copy of the tier table in the process.

use serde::Serialize;
use utoipa::ToSchema;

/// A purchasable tier and the coins it grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CoinPackage {
    /// Tier identifier (e.g. `"standard"`).
    pub id: String,
    /// Coins credited on approval.
    pub coins: i64,
}

/// Errors raised while building a catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CatalogError {
    /// An entry was not of the form `id:coins`.
    #[error("malformed coin package entry: {0:?}")]
    MalformedEntry(String),
    /// A coin amount was not a positive integer.
    #[error("invalid coin amount for package {id}: {raw:?}")]
    InvalidCoins {
        /// Package id of the offending entry.
        id: String,
        /// Raw coin value.
        raw: String,
    },
    /// The same package id appeared twice.
    #[error("duplicate coin package: {0}")]
    Duplicate(String),
    /// No packages were defined.
    #[error("coin catalog is empty")]
    Empty,
}

/// Ordered, immutable list of coin packages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinCatalog {
    packages: Vec<CoinPackage>,
}

impl CoinCatalog {
    /// Builds a catalog from `(id, coins)` pairs, keeping declaration order.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] on empty input, duplicate ids, blank ids or
    /// non-positive coin amounts.
    pub fn new<I, S>(entries: I) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let mut packages: Vec<CoinPackage> = Vec::new();
        for (id, coins) in entries {
            let id = id.into();
            if id.trim().is_empty() {
                return Err(CatalogError::MalformedEntry(id));
            }
            if coins <= 0 {
                return Err(CatalogError::InvalidCoins {
                    id,
                    raw: coins.to_string(),
                });
            }
            if packages.iter().any(|p| p.id == id) {
                return Err(CatalogError::Duplicate(id));
            }
            packages.push(CoinPackage { id, coins });
        }
        if packages.is_empty() {
            return Err(CatalogError::Empty);
        }
        Ok(Self { packages })
    }

    /// Parses a catalog from `"id:coins,id:coins"` notation.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if any entry is malformed.
    pub fn parse(text: &str) -> Result<Self, CatalogError> {
        let mut entries = Vec::new();
        for raw in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let (id, coins) = raw
                .split_once(':')
                .ok_or_else(|| CatalogError::MalformedEntry(raw.to_string()))?;
            let id = id.trim();
            let coins_raw = coins.trim();
            let coins = coins_raw
                .parse::<i64>()
                .map_err(|_| CatalogError::InvalidCoins {
                    id: id.to_string(),
                    raw: coins_raw.to_string(),
                })?;
            entries.push((id.to_string(), coins));
        }
        Self::new(entries)
    }

    /// Looks up a package by id.
    #[must_use]
    pub fn get(&self, package_id: &str) -> Option<&CoinPackage> {
        self.packages.iter().find(|p| p.id == package_id)
    }

    /// Returns all packages in declaration order.
    #[must_use]
    pub fn list(&self) -> &[CoinPackage] {
        &self.packages
    }
}

impl Default for CoinCatalog {
    /// The four production tiers: basic 40, standard 80, premium 120, pro 300.
    fn default() -> Self {
        Self {
            packages: [("basic", 40), ("standard", 80), ("premium", 120), ("pro", 300)]
                .into_iter()
                .map(|(id, coins)| CoinPackage {
                    id: id.to_string(),
                    coins,
                })
                .collect(),
        }
    }
}
