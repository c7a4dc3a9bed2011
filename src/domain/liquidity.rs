//! Liquidity provisions for constant-product pools.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ContractId, LiquidityId, UserId};
use super::money::Amount;

/// Money a user added to a CPMM pool.
///
/// `liquidity` is the number of pool units issued for `amount`; settlement
/// splits the residual pool by these units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityProvision {
    pub id: LiquidityId,
    pub user_id: UserId,
    pub contract_id: ContractId,
    pub amount: Amount,
    pub liquidity: Amount,
    pub created_time: DateTime<Utc>,
    #[serde(default)]
    pub is_ante: bool,
}

impl LiquidityProvision {
    pub fn new(
        user_id: UserId,
        contract_id: ContractId,
        amount: Amount,
        liquidity: Amount,
        created_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LiquidityId::generate(),
            user_id,
            contract_id,
            amount,
            liquidity,
            created_time,
            is_ante: false,
        }
    }
}
