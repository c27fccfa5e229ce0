use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fire_core::{DomainError, DomainResult, Entity, UserId, VoucherId};

/// Voucher lifecycle: sold `Inactive`, redeemed to `Active`, used up to `Depleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherState {
    Inactive,
    Active,
    Depleted,
}

impl VoucherState {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherState::Inactive => "inactive",
            VoucherState::Active => "active",
            VoucherState::Depleted => "depleted",
        }
    }
}

impl FromStr for VoucherState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inactive" => Ok(VoucherState::Inactive),
            "active" => Ok(VoucherState::Active),
            "depleted" => Ok(VoucherState::Depleted),
            other => Err(DomainError::validation(format!("unknown voucher state: {other}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voucher {
    pub id: VoucherId,
    pub user_id: Option<UserId>,
    pub state: VoucherState,
    pub code: String,
    pub credit_total: i64,
    pub credit_remaining: i64,
    pub url: Option<String>,
    pub bulk_number: Option<String>,
    pub vendor: Option<String>,
    pub created: DateTime<Utc>,
    pub activated: Option<DateTime<Utc>>,
    pub depleted: Option<DateTime<Utc>>,
}

impl Voucher {
    pub fn is_redeemable(&self) -> bool {
        self.state == VoucherState::Inactive
    }

    /// Redeem this voucher for `user`.
    ///
    /// A voucher that is already active or depleted reports the same error as an
    /// unknown code.
    pub fn redeem(&mut self, user: UserId, now: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_redeemable() {
            return Err(code_not_found(&self.code));
        }
        self.state = VoucherState::Active;
        self.activated = Some(now);
        self.user_id = Some(user);
        Ok(())
    }
}

impl Entity for Voucher {
    type Id = VoucherId;

    fn id(&self) -> VoucherId {
        self.id
    }

    fn describe(id: VoucherId) -> String {
        format!("vouchers[id={id}]")
    }
}

pub fn code_not_found(code: &str) -> DomainError {
    DomainError::not_found(format!("Voucher with code {code}"))
}
