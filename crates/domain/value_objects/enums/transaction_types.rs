use std::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    SignupBonus,
    SubscriptionRefill,
    VideoGeneration,
    Purchase,
    AdminAdjustment,
    PromoCode,
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            TransactionType::SignupBonus => "signup_bonus",
            TransactionType::SubscriptionRefill => "subscription_refill",
            TransactionType::VideoGeneration => "video_generation",
            TransactionType::Purchase => "purchase",
            TransactionType::AdminAdjustment => "admin_adjustment",
            TransactionType::PromoCode => "promo_code",
        };
        write!(f, "{}", kind)
    }
}

impl TransactionType {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "signup_bonus" => Some(TransactionType::SignupBonus),
            "subscription_refill" => Some(TransactionType::SubscriptionRefill),
            "video_generation" => Some(TransactionType::VideoGeneration),
            "purchase" => Some(TransactionType::Purchase),
            "admin_adjustment" => Some(TransactionType::AdminAdjustment),
            "promo_code" => Some(TransactionType::PromoCode),
            _ => None,
        }
    }
}
