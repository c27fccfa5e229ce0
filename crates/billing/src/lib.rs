//! `fire-billing` — prepaid vouchers and the published price tables.

pub mod pricing;
pub mod voucher;

pub use pricing::{CallPricing, InternationalRate, Pricing};
pub use voucher::{Voucher, VoucherState};
