use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    #[default]
    Free,
    Premium,
    Pro,
}

impl Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plan = match self {
            PlanTier::Free => "free",
            PlanTier::Premium => "premium",
            PlanTier::Pro => "pro",
        };
        write!(f, "{}", plan)
    }
}

impl PlanTier {
    pub fn from_str(value: &str) -> Self {
        match value {
            "premium" => PlanTier::Premium,
            "pro" => PlanTier::Pro,
            _ => PlanTier::Free,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlanTier::Free => "Gratuit",
            PlanTier::Premium => "Premium",
            PlanTier::Pro => "Pro",
        }
    }

    /// Credits granted on every monthly refill.
    pub fn monthly_credits(&self) -> i32 {
        match self {
            PlanTier::Free => 5,
            PlanTier::Premium => 50,
            PlanTier::Pro => 200,
        }
    }

    pub fn signup_bonus(&self) -> i32 {
        match self {
            PlanTier::Free => 3,
            PlanTier::Premium | PlanTier::Pro => 0,
        }
    }

    /// Seconds of avatar video per calendar month.
    pub fn visio_quota_seconds(&self) -> i32 {
        match self {
            PlanTier::Free => 600,
            PlanTier::Premium => 1800,
            PlanTier::Pro => 3600,
        }
    }
}
