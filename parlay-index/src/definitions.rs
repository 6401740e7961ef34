use crate::provider::ProviderId;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{str::FromStr, sync::LazyLock};

/// Lifecycle status of an index.
///
/// Only a case-insensitive `"inactive"` flips an index into the settled
/// branch; anything else reads as active.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Deserialize, Serialize)]
pub enum IndexStatus {
    #[default]
    #[serde(alias = "active")]
    Active,
    #[serde(alias = "inactive")]
    Inactive,
}

impl IndexStatus {
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::Inactive)
    }
}

impl FromStr for IndexStatus {
    type Err = std::convert::Infallible;

    fn from_str(status: &str) -> Result<Self, Self::Err> {
        if status.eq_ignore_ascii_case("inactive") {
            Ok(Self::Inactive)
        } else {
            Ok(Self::Active)
        }
    }
}

/// Predefined index definition: identity plus the constituent layout.
///
/// Definitions are fixed at build time - indexes are curated, not
/// user-created - and `market_ids`/`position_codes` are parallel sequences:
/// one position code per constituent slot.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct IndexDefinition {
    pub id: SmolStr,
    pub name: String,
    pub provider: ProviderId,
    pub market_ids: Vec<SmolStr>,
    pub position_codes: Vec<i64>,
    /// On-chain address backing this index. Opaque - never validated here.
    pub contract_address: String,
    pub status: IndexStatus,
    /// Free-text resolution time, e.g. `"Resolves in 45 days"`.
    pub resolution_time: String,
    /// Confirmed yield narrative for settled indexes, percent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmed_yield: Option<f64>,
}

impl IndexDefinition {
    /// Placeholder definition for an id with no catalog entry, so the
    /// fallback-index path has something to copy.
    pub fn adhoc(id: &str) -> Self {
        Self {
            id: SmolStr::from(id),
            name: id.to_string(),
            provider: ProviderId::Polymarket,
            market_ids: Vec::new(),
            position_codes: Vec::new(),
            contract_address: String::new(),
            status: IndexStatus::Active,
            resolution_time: String::new(),
            confirmed_yield: None,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.status.is_expired()
    }
}

static CATALOG: LazyLock<Vec<IndexDefinition>> = LazyLock::new(catalog);

/// The fixed, in-process index catalog.
pub fn definitions() -> &'static [IndexDefinition] {
    &CATALOG
}

/// Look up one predefined index by id.
pub fn find(id: &str) -> Option<&'static IndexDefinition> {
    CATALOG.iter().find(|definition| definition.id == id)
}

fn catalog() -> Vec<IndexDefinition> {
    vec![
        IndexDefinition {
            id: SmolStr::new_static("ai-frontier"),
            name: "AI Frontier Index".to_string(),
            provider: ProviderId::Polymarket,
            market_ids: vec![
                SmolStr::new_static(
                    "0x178a6a7e5f6ab6e4b6a7dc0a0d573c4ff8d2e5a9c0b1e24d8f6a3b9c7d5e1f02",
                ),
                SmolStr::new_static(
                    "0x2b9c4e1d8f7a6053c2e9b8d7a6f5e4d3c2b1a09f8e7d6c5b4a3928170f6e5d4c",
                ),
                SmolStr::new_static(
                    "0x3c0d5f2e9a8b7164d3fac9e8b7a6f5e4d3c2b1a09f8e7d6c5b4a3928170f6e5d",
                ),
                SmolStr::new_static(
                    "0x4d1e603fab9c8275e4abdaf9c8b7a6f5e4d3c2b1a09f8e7d6c5b4a3928170f6e",
                ),
            ],
            position_codes: vec![1, 1, 2, 1],
            contract_address: "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string(),
            status: IndexStatus::Active,
            resolution_time: "Resolves in 45 days".to_string(),
            confirmed_yield: None,
        },
        IndexDefinition {
            id: SmolStr::new_static("fed-pivot"),
            name: "Fed Pivot Basket".to_string(),
            provider: ProviderId::Polymarket,
            market_ids: vec![
                SmolStr::new_static(
                    "0x5e2f714abc0d9386f5bcebfad9c8b7a6f5e4d3c2b1a09f8e7d6c5b4a3928170f",
                ),
                SmolStr::new_static(
                    "0x6f30825bcd1ea497a6cdfcabead9c8b7a6f5e4d3c2b1a09f8e7d6c5b4a392817",
                ),
                SmolStr::new_static(
                    "0x704193acde2fb5a8b7deadbcfbead9c8b7a6f5e4d3c2b1a09f8e7d6c5b4a3928",
                ),
            ],
            position_codes: vec![1, 2, 1],
            contract_address: "0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512".to_string(),
            status: IndexStatus::Active,
            resolution_time: "Resolves in 30 days".to_string(),
            confirmed_yield: None,
        },
        IndexDefinition {
            id: SmolStr::new_static("election-season"),
            name: "Election Season Index".to_string(),
            provider: ProviderId::Polymarket,
            market_ids: vec![
                SmolStr::new_static(
                    "0x8152a4bdef30c6b9c8efbecdacfbead9c8b7a6f5e4d3c2b1a09f8e7d6c5b4a39",
                ),
                SmolStr::new_static(
                    "0x9263b5cef041d7cad9facfdebdacfbead9c8b7a6f5e4d3c2b1a09f8e7d6c5b4a",
                ),
            ],
            position_codes: vec![1, 1],
            contract_address: "0x9fE46736679d2D9a65F0992F2272dE9f3c7fa6e0".to_string(),
            status: IndexStatus::Inactive,
            resolution_time: "Resolved".to_string(),
            confirmed_yield: Some(9.2),
        },
        IndexDefinition {
            id: SmolStr::new_static("crypto-milestones"),
            name: "Crypto Milestones Index".to_string(),
            provider: ProviderId::Polymarket,
            market_ids: vec![
                SmolStr::new_static(
                    "0xa374c6df0152e8dbeafbdfefcdacfbead9c8b7a6f5e4d3c2b1a09f8e7d6c5b4a",
                ),
                SmolStr::new_static(
                    "0xb485d7ef0263f9ecfbacefffdeacfbead9c8b7a6f5e4d3c2b1a09f8e7d6c5b4a",
                ),
            ],
            position_codes: vec![1, 2],
            contract_address: "0xCf7Ed3AccA5a467e9e704C703E8D87F634fB0Fc9".to_string(),
            status: IndexStatus::Active,
            resolution_time: "Resolves in 90 days".to_string(),
            confirmed_yield: None,
        },
    ]
}
