//! Static price tables (per-minute rates).
//!
//! These are published as-is; they are not persisted and never change at runtime.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InternationalRate {
    pub country: String,
    pub mobile: f64,
    pub land_lines: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub local_mobile: f64,
    pub local_land_lines: f64,
    pub national_mobile: f64,
    pub national_land_lines: f64,
    pub international: Vec<InternationalRate>,
}

impl Pricing {
    pub fn standard() -> Self {
        Self {
            local_mobile: 1.5,
            local_land_lines: 0.8,
            national_mobile: 2.3,
            national_land_lines: 2.1,
            international: vec![
                InternationalRate {
                    country: "Sierra Leone".to_string(),
                    mobile: 8.4,
                    land_lines: 5.3,
                },
                InternationalRate {
                    country: "Rwanda".to_string(),
                    mobile: 9.2,
                    land_lines: 6.3,
                },
            ],
        }
    }
}

/// Rates for placing a call over GSM vs. VoIP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CallPricing {
    pub gsm: f64,
    pub voip: f64,
}

impl CallPricing {
    /// Rates do not depend on the dialled number yet.
    pub fn for_number(_number: &str) -> Self {
        Self { gsm: 1.5, voip: 0.01 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pricing_serializes_camel_case() {
        let json = serde_json::to_value(Pricing::standard()).unwrap();
        assert_eq!(json["localMobile"], 1.5);
        assert_eq!(json["nationalLandLines"], 2.1);
        assert_eq!(json["international"][0]["country"], "Sierra Leone");
        assert_eq!(json["international"][1]["landLines"], 6.3);
    }

    #[test]
    fn call_pricing_is_flat() {
        let p = CallPricing::for_number("123-123-123");
        assert_eq!(p, CallPricing::for_number("999"));
        assert_eq!(p.gsm, 1.5);
        assert_eq!(p.voip, 0.01);
    }
}
