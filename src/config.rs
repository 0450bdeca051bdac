use serde::{Deserialize, Serialize};

use crate::decimal::Money;

/// engine configuration; the source system scattered these constants through
/// its calculations, here they are injected once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// fixed fee charged once per disbursement and once per exit settlement
    pub admin_fee: Money,
    /// prefix of generated loan numbers
    pub loan_number_prefix: String,
}

impl EngineConfig {
    pub fn new(admin_fee: Money) -> Self {
        Self {
            admin_fee,
            loan_number_prefix: "RS".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(Money::from_major(5_000))
    }
}
