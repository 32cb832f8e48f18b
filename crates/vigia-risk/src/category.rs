//! Risk categories, their horizons, and severity buckets.

use serde::{Deserialize, Serialize};

/// Risk category classification.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskCategory {
    /// Price risk on open positions
    #[display("market")]
    Market,
    /// Cost and feasibility of exiting positions
    #[display("liquidity")]
    Liquidity,
    /// Counterparty default
    #[display("credit")]
    Credit,
    /// Systems, people and processes
    #[display("operational")]
    Operational,
    /// Contagion across the whole market
    #[display("systemic")]
    Systemic,
}

impl RiskCategory {
    /// Every category, in canonical order.
    pub const ALL: [Self; 5] = [
        Self::Market,
        Self::Liquidity,
        Self::Credit,
        Self::Operational,
        Self::Systemic,
    ];

    /// Position in [`Self::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Market => 0,
            Self::Liquidity => 1,
            Self::Credit => 2,
            Self::Operational => 3,
            Self::Systemic => 4,
        }
    }

    /// Horizon over which this category's risk typically materializes.
    #[must_use]
    pub const fn timeframe(self) -> Timeframe {
        match self {
            Self::Market => Timeframe::Immediate,
            Self::Liquidity => Timeframe::ShortTerm,
            Self::Credit | Self::Operational => Timeframe::MediumTerm,
            Self::Systemic => Timeframe::LongTerm,
        }
    }

    /// Get a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &str {
        match self {
            Self::Market => "Value-at-risk of current positions",
            Self::Liquidity => "Bid-ask spread and order book depth",
            Self::Credit => "Default probability and counterparty exposure",
            Self::Operational => "System, human, process and external failures",
            Self::Systemic => "Contagion, liquidity spirals, fire sales and network effects",
        }
    }
}

/// Horizon of a risk or of a mitigation.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Now
    #[display("immediate")]
    Immediate,
    /// Days
    #[display("short_term")]
    ShortTerm,
    /// Weeks
    #[display("medium_term")]
    MediumTerm,
    /// Months and beyond
    #[display("long_term")]
    LongTerm,
}

/// Severity bucket of a normalized score.
///
/// Ordered, so `Severity::Critical > Severity::Low`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Below 0.3
    #[display("LOW")]
    Low,
    /// From 0.3 up to 0.6
    #[display("MEDIUM")]
    Medium,
    /// From 0.6 up to 0.85
    #[display("HIGH")]
    High,
    /// 0.85 and above
    #[display("CRITICAL")]
    Critical,
}

impl Severity {
    /// Lowest score bucketed as [`Severity::Medium`].
    pub const MEDIUM_THRESHOLD: f64 = 0.3;
    /// Lowest score bucketed as [`Severity::High`].
    pub const HIGH_THRESHOLD: f64 = 0.6;
    /// Lowest score bucketed as [`Severity::Critical`].
    pub const CRITICAL_THRESHOLD: f64 = 0.85;

    /// Bucket a score in [0, 1].
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= Self::CRITICAL_THRESHOLD {
            Self::Critical
        } else if score >= Self::HIGH_THRESHOLD {
            Self::High
        } else if score >= Self::MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}
