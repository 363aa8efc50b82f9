//! # Discount Policy
//!
//! The rules the discount ledger enforces, without the storage.
//!
//! ## Two Usage Modes
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────────────────┐
//! │ UsagePolicy          │ Behaviour                                        │
//! ├──────────────────────┼──────────────────────────────────────────────────┤
//! │ SingleUse            │ One usage per (code, client). A prior usage on   │
//! │ (single-code path)   │ another appointment → DiscountAlreadyUsed.       │
//! ├──────────────────────┼──────────────────────────────────────────────────┤
//! │ Reusable             │ No prior-usage check. The same client may use    │
//! │ (multi-code path)    │ the code again in another multi-code booking.    │
//! └──────────────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! Both modes share the same usage table; they are kept as separate named
//! modes because they reject different bookings.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::pricing::{compute_discount, Discount, PriceBreakdown};
use crate::types::{DiscountCode, DiscountCodeUsage};
use crate::validation::validate_discount_code;

/// Maximum number of codes in one multi-code booking.
pub const MAX_CODES_PER_APPOINTMENT: usize = 5;

// =============================================================================
// Usage Policy
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum UsagePolicy {
    SingleUse,
    Reusable,
}

impl UsagePolicy {
    /// Checks a code's prior usages by one client.
    ///
    /// Usages tied to `appointment_id` are ignored: re-applying a code to the
    /// appointment that already holds it is not a second use.
    pub fn check_prior_usage(
        &self,
        code: &DiscountCode,
        usages: &[DiscountCodeUsage],
        appointment_id: Option<i64>,
    ) -> CoreResult<()> {
        if *self == UsagePolicy::Reusable {
            return Ok(());
        }

        let used_elsewhere = usages.iter().any(|usage| {
            usage.discount_code_id == code.id && Some(usage.appointment_id) != appointment_id
        });

        if used_elsewhere {
            return Err(CoreError::DiscountAlreadyUsed {
                code: code.code.clone(),
            });
        }
        Ok(())
    }
}

/// Resolves a looked-up code: missing and inactive codes are both
/// [`CoreError::DiscountNotFound`].
pub fn ensure_usable<'a>(requested: &str, found: Option<&'a DiscountCode>) -> CoreResult<&'a DiscountCode> {
    match found {
        Some(code) if code.is_active => Ok(code),
        _ => Err(CoreError::DiscountNotFound(requested.to_string())),
    }
}

/// [`ensure_usable`] for repricing: a deactivated code listed in `held` (the
/// codes the appointment already carries) is still accepted.
pub fn ensure_usable_for<'a>(
    requested: &str,
    found: Option<&'a DiscountCode>,
    held: &[i64],
) -> CoreResult<&'a DiscountCode> {
    match found {
        Some(code) if held.contains(&code.id) => Ok(code),
        _ => ensure_usable(requested, found),
    }
}

// =============================================================================
// Requests
// =============================================================================

/// One code in a multi-code booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DiscountRequest {
    pub code: String,
    /// Packages this code should apply to. `None` means every booked package.
    #[serde(default)]
    pub applied_to_packages: Option<Vec<i64>>,
}

/// What discounts a booking or edit asks for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiscountSelection {
    /// No discount.
    #[default]
    None,
    /// Legacy single-code path, [`UsagePolicy::SingleUse`].
    Single(String),
    /// Multi-code path, [`UsagePolicy::Reusable`].
    Multiple(Vec<DiscountRequest>),
}

impl DiscountSelection {
    pub fn policy(&self) -> UsagePolicy {
        match self {
            DiscountSelection::Multiple(_) => UsagePolicy::Reusable,
            _ => UsagePolicy::SingleUse,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, DiscountSelection::None)
    }

    /// Validates and normalizes every code.
    ///
    /// ## Rules
    /// - Every code passes [`validate_discount_code`]
    /// - A multi-code batch holds at most [`MAX_CODES_PER_APPOINTMENT`] codes
    /// - The same code may not appear twice in one batch
    /// - An empty multi-code batch means no discount
    pub fn normalized(self) -> CoreResult<DiscountSelection> {
        match self {
            DiscountSelection::None => Ok(DiscountSelection::None),
            DiscountSelection::Single(code) => {
                Ok(DiscountSelection::Single(validate_discount_code(&code)?))
            }
            DiscountSelection::Multiple(requests) if requests.is_empty() => {
                Ok(DiscountSelection::None)
            }
            DiscountSelection::Multiple(requests) => {
                if requests.len() > MAX_CODES_PER_APPOINTMENT {
                    return Err(ValidationError::OutOfRange {
                        field: "multipleDiscountCodes".to_string(),
                        min: 1,
                        max: MAX_CODES_PER_APPOINTMENT as i64,
                    }
                    .into());
                }

                let mut normalized: Vec<DiscountRequest> = Vec::with_capacity(requests.len());
                for request in requests {
                    let code = validate_discount_code(&request.code)?;
                    if normalized.iter().any(|r| r.code == code) {
                        return Err(ValidationError::Duplicate {
                            field: "multipleDiscountCodes".to_string(),
                            value: code,
                        }
                        .into());
                    }
                    normalized.push(DiscountRequest {
                        code,
                        applied_to_packages: request.applied_to_packages,
                    });
                }
                Ok(DiscountSelection::Multiple(normalized))
            }
        }
    }

    /// The (normalized) codes and their requested package subsets.
    pub fn requests(&self) -> Vec<DiscountRequest> {
        match self {
            DiscountSelection::None => Vec::new(),
            DiscountSelection::Single(code) => vec![DiscountRequest {
                code: code.clone(),
                applied_to_packages: None,
            }],
            DiscountSelection::Multiple(requests) => requests.clone(),
        }
    }
}

// =============================================================================
// Batch Planning
// =============================================================================

/// A resolved code ready to be priced: the code, the subset requested for it
/// and the client's prior usages of it.
#[derive(Debug, Clone)]
pub struct ResolvedCode {
    pub code: DiscountCode,
    pub applied_to_packages: Option<Vec<i64>>,
    pub prior_usages: Vec<DiscountCodeUsage>,
}

/// Validates and prices a batch of codes, all or nothing.
///
/// Any single failure (already used, not applicable) fails the whole batch,
/// so nothing is persisted for a partially valid batch.
pub fn plan_discounts(
    policy: UsagePolicy,
    codes: &[ResolvedCode],
    breakdown: &PriceBreakdown,
    appointment_id: Option<i64>,
) -> CoreResult<Vec<Discount>> {
    codes
        .iter()
        .map(|resolved| {
            policy.check_prior_usage(&resolved.code, &resolved.prior_usages, appointment_id)?;
            compute_discount(
                &resolved.code,
                breakdown,
                resolved.applied_to_packages.as_deref(),
            )
        })
        .collect()
}

/// Sum of the discounts in a plan.
pub fn total_discount(discounts: &[Discount]) -> Money {
    discounts.iter().map(|d| d.amount).sum()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PricedPackage;
    use crate::types::DiscountType;
    use chrono::Utc;

    fn percent_code(id: i64, code: &str, bps: i64, applicable: Vec<i64>) -> DiscountCode {
        DiscountCode {
            id,
            code: code.to_string(),
            discount_type: DiscountType::Percentage,
            discount_percent_bps: Some(bps),
            discount_amount_cents: None,
            applicable_packages: applicable,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    fn usage(code_id: i64, appointment_id: i64) -> DiscountCodeUsage {
        DiscountCodeUsage {
            id: 1,
            discount_code_id: code_id,
            client_id: 5,
            appointment_id,
            used_at: Utc::now(),
        }
    }

    fn breakdown() -> PriceBreakdown {
        PriceBreakdown::new(
            PricedPackage::new(1, "Haircut", Money::from_cents(5000)),
            vec![PricedPackage::new(2, "Beard Trim", Money::from_cents(3000))],
        )
    }

    #[test]
    fn test_single_use_rejects_prior_usage() {
        let code = percent_code(1, "SAVE10", 1000, vec![]);
        let result = UsagePolicy::SingleUse.check_prior_usage(&code, &[usage(1, 10)], Some(11));
        assert!(matches!(result, Err(CoreError::DiscountAlreadyUsed { .. })));
    }

    #[test]
    fn test_single_use_ignores_same_appointment() {
        let code = percent_code(1, "SAVE10", 1000, vec![]);
        assert!(UsagePolicy::SingleUse
            .check_prior_usage(&code, &[usage(1, 10)], Some(10))
            .is_ok());
    }

    #[test]
    fn test_reusable_allows_prior_usage() {
        let code = percent_code(1, "SAVE10", 1000, vec![]);
        assert!(UsagePolicy::Reusable
            .check_prior_usage(&code, &[usage(1, 10)], None)
            .is_ok());
    }

    #[test]
    fn test_inactive_code_not_found() {
        let mut code = percent_code(1, "SAVE10", 1000, vec![]);
        code.is_active = false;
        assert!(matches!(
            ensure_usable("SAVE10", Some(&code)),
            Err(CoreError::DiscountNotFound(_))
        ));
        assert!(ensure_usable("SAVE10", None).is_err());
    }

    #[test]
    fn test_held_inactive_code_still_usable() {
        let mut code = percent_code(1, "SAVE10", 1000, vec![]);
        code.is_active = false;

        assert!(ensure_usable_for("SAVE10", Some(&code), &[1]).is_ok());
        assert!(matches!(
            ensure_usable_for("SAVE10", Some(&code), &[2]),
            Err(CoreError::DiscountNotFound(_))
        ));
        assert!(ensure_usable_for("SAVE10", None, &[1]).is_err());
    }

    #[test]
    fn test_selection_normalizes_codes() {
        let selection = DiscountSelection::Single(" save10 ".to_string())
            .normalized()
            .unwrap();
        assert_eq!(selection, DiscountSelection::Single("SAVE10".to_string()));
        assert_eq!(selection.policy(), UsagePolicy::SingleUse);
    }

    #[test]
    fn test_selection_rejects_duplicate_codes() {
        let selection = DiscountSelection::Multiple(vec![
            DiscountRequest {
                code: "save10".to_string(),
                applied_to_packages: None,
            },
            DiscountRequest {
                code: "SAVE10".to_string(),
                applied_to_packages: Some(vec![2]),
            },
        ]);
        assert!(matches!(
            selection.normalized(),
            Err(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
    }

    #[test]
    fn test_empty_batch_is_no_discount() {
        let selection = DiscountSelection::Multiple(vec![]).normalized().unwrap();
        assert!(selection.is_none());
    }

    #[test]
    fn test_plan_sums_each_code_on_its_subset() {
        let codes = vec![
            ResolvedCode {
                code: percent_code(1, "HAIR10", 1000, vec![]),
                applied_to_packages: Some(vec![1]),
                prior_usages: vec![],
            },
            ResolvedCode {
                code: percent_code(2, "BEARD50", 5000, vec![2]),
                applied_to_packages: None,
                prior_usages: vec![usage(2, 3)],
            },
        ];

        let plan = plan_discounts(UsagePolicy::Reusable, &codes, &breakdown(), None).unwrap();
        // HAIR10 is unrestricted, so it covers the whole 80.00.
        assert_eq!(plan[0].amount, Money::from_cents(800));
        assert_eq!(plan[1].amount, Money::from_cents(1500));
        assert_eq!(total_discount(&plan), Money::from_cents(2300));
    }

    #[test]
    fn test_plan_is_all_or_nothing() {
        let codes = vec![
            ResolvedCode {
                code: percent_code(1, "SAVE10", 1000, vec![]),
                applied_to_packages: None,
                prior_usages: vec![],
            },
            ResolvedCode {
                code: percent_code(2, "COLOR", 1000, vec![99]),
                applied_to_packages: None,
                prior_usages: vec![],
            },
        ];

        let result = plan_discounts(UsagePolicy::Reusable, &codes, &breakdown(), None);
        assert!(matches!(
            result,
            Err(CoreError::DiscountNotApplicable { .. })
        ));
    }
}
