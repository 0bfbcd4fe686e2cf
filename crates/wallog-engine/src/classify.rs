//! Stage classification.
//!
//! An ordered chain of rules derives the single pipeline stage a record
//! is currently stuck at, evaluated from the most advanced stage toward
//! the least advanced. The chain is a fixed rule table rather than a
//! nested conditional cascade: each rule is a named predicate producing
//! one of three outcomes, and the first rule that does not pass is
//! final. Reordering the table changes behavior, so the order is part
//! of the contract.
//!
//! All gap thresholds compare strictly (`>`): a case exactly at its
//! allowed gap is compliant.

use std::collections::HashSet;

use chrono::NaiveDate;
use wallog_core::fields;
use wallog_core::Stage;
use wallog_store::RecordData;

use crate::calendar::{business_days_between, date_field};

/// Allowed readiness-to-ship gap for returns leaving a problem
/// facility, in business days.
const PROBLEM_FACILITY_SHIP_ALLOWANCE: i64 = 10;
/// Allowed readiness-to-ship gap everywhere else.
const DEFAULT_SHIP_ALLOWANCE: i64 = 3;

/// Everything a rule may look at, extracted from the record once.
struct StageContext {
    cancelled: bool,
    cancelled_exempt: bool,
    disputed: bool,
    damaged: bool,
    /// Tri-state: rules distinguish "explicitly false" from "absent".
    out_of_stock: Option<bool>,
    problem_facility: bool,
    today: NaiveDate,

    creation: Option<NaiveDate>,
    rma_request: Option<NaiveDate>,
    rma_obtained: Option<NaiveDate>,
    fwd_readiness: Option<NaiveDate>,
    fwd_ship: Option<NaiveDate>,
    fwd_delivery: Option<NaiveDate>,
    part_receipt: Option<NaiveDate>,
    usage_notification: Option<NaiveDate>,
    disposition: Option<NaiveDate>,
    rvrs_readiness: Option<NaiveDate>,
    rvrs_ship: Option<NaiveDate>,
    rvrs_unload: Option<NaiveDate>,
    goods_receipt: Option<NaiveDate>,
}

impl StageContext {
    fn extract(
        record: &RecordData,
        disputed_serials: &HashSet<String>,
        problem_facilities: &HashSet<String>,
        today: NaiveDate,
    ) -> Self {
        let disputed = record
            .get_str(fields::NOTIFICATION_ID)
            .is_some_and(|id| disputed_serials.contains(id));

        let problem_facility = record
            .get_str(fields::FACILITY_CODE)
            .is_some_and(|code| problem_facilities.contains(&code.to_lowercase()));

        let cancelled_exempt =
            record.get_str(fields::DISPOSITION_TYPE) == Some(fields::DISPOSITION_RETURN_UNUSED);

        Self {
            cancelled: record.get_bool(fields::RMA_CANCELLED_FLAG) == Some(true),
            cancelled_exempt,
            disputed,
            damaged: record.get_bool(fields::DAMAGED_ON_ARRIVAL) == Some(true),
            out_of_stock: record.get_bool(fields::OUT_OF_STOCK_FLAG),
            problem_facility,
            today,
            creation: date_field(record, fields::CREATION_TIMESTAMP),
            rma_request: date_field(record, fields::RMA_REQUEST_DATE),
            rma_obtained: date_field(record, fields::RMA_OBTAINED_DATE),
            fwd_readiness: date_field(record, fields::FWD_MATERIAL_READINESS_DATE),
            fwd_ship: date_field(record, fields::FWD_ACTUAL_SHIP_DATE),
            fwd_delivery: date_field(record, fields::FWD_ACTUAL_DELIVERY_DATE),
            part_receipt: date_field(record, fields::PART_RECEIPT_DATE),
            usage_notification: date_field(record, fields::USAGE_NOTIFICATION_DATE),
            disposition: date_field(record, fields::DISPOSITION_DATE),
            rvrs_readiness: date_field(record, fields::RVRS_MATERIAL_READINESS_DATE),
            rvrs_ship: date_field(record, fields::RVRS_ACTUAL_SHIP_DATE),
            rvrs_unload: date_field(record, fields::RVRS_CARRIER_UNLOAD_DATE),
            goods_receipt: date_field(record, fields::GOODS_RECEIPT_CONFIRMATION_DATE),
        }
    }
}

/// What one rule decided.
enum RuleOutcome {
    /// This stage applies; stop.
    Assign(Stage),
    /// No stage applies; stop.
    Clear,
    /// This rule is not concerned; try the next one.
    Pass,
}

struct Rule {
    name: &'static str,
    eval: fn(&StageContext) -> RuleOutcome,
}

/// True when the gap from `start` to `end` exceeds `allowed` business
/// days, or `end` has not happened at all.
fn overdue(start: NaiveDate, end: Option<NaiveDate>, allowed: i64) -> bool {
    match end {
        Some(end) => business_days_between(start, end) > allowed,
        None => true,
    }
}

/// The classification chain, most advanced stage first. Order matters.
static RULES: &[Rule] = &[
    // A cancelled RMA is terminal either way: it needs reconciliation
    // when the part already shipped (unless returned unused), and no
    // stage otherwise.
    Rule {
        name: "cancelled-rma",
        eval: |ctx| {
            if !ctx.cancelled {
                return RuleOutcome::Pass;
            }
            if ctx.fwd_ship.is_some() && !ctx.cancelled_exempt {
                RuleOutcome::Assign(Stage::Reconciliation)
            } else {
                RuleOutcome::Clear
            }
        },
    },
    Rule {
        name: "disputed-serial",
        eval: |ctx| {
            if ctx.disputed {
                RuleOutcome::Assign(Stage::DiscrepancySn)
            } else {
                RuleOutcome::Pass
            }
        },
    },
    // With a goods-receipt confirmation the case is closed out unless
    // the unload-to-confirmation gap was too long; without an unload
    // timestamp the confirmation cannot be aged and the case is clear.
    Rule {
        name: "goods-receipt-confirmed",
        eval: |ctx| {
            let Some(confirmation) = ctx.goods_receipt else {
                return RuleOutcome::Pass;
            };
            match ctx.rvrs_unload {
                Some(unload) if business_days_between(unload, confirmation) > 2 => {
                    RuleOutcome::Assign(Stage::GrSi)
                }
                _ => RuleOutcome::Clear,
            }
        },
    },
    // Carrier unloaded but no confirmation yet: the confirmation is
    // overdue by definition.
    Rule {
        name: "goods-receipt-overdue",
        eval: |ctx| {
            if ctx.rvrs_unload.is_some() && ctx.goods_receipt.is_none() {
                RuleOutcome::Assign(Stage::GrSi)
            } else {
                RuleOutcome::Pass
            }
        },
    },
    Rule {
        name: "return-delivery",
        eval: |ctx| match ctx.rvrs_ship {
            Some(ship) if overdue(ship, ctx.rvrs_unload, 2) => {
                RuleOutcome::Assign(Stage::RvrsDelivery)
            }
            _ => RuleOutcome::Pass,
        },
    },
    // Return shipment ages against the actual ship date when there is
    // one, otherwise against today. Problem facilities get a longer
    // allowance.
    Rule {
        name: "return-shipment",
        eval: |ctx| {
            let Some(readiness) = ctx.rvrs_readiness else {
                return RuleOutcome::Pass;
            };
            let allowed = if ctx.problem_facility {
                PROBLEM_FACILITY_SHIP_ALLOWANCE
            } else {
                DEFAULT_SHIP_ALLOWANCE
            };
            let reference = ctx.rvrs_ship.unwrap_or(ctx.today);
            if business_days_between(readiness, reference) > allowed {
                RuleOutcome::Assign(Stage::RvrsShipment)
            } else {
                RuleOutcome::Pass
            }
        },
    },
    Rule {
        name: "return-load-id",
        eval: |ctx| match ctx.disposition {
            Some(disposition) if overdue(disposition, ctx.rvrs_readiness, 1) => {
                RuleOutcome::Assign(Stage::RvrsLoadId)
            }
            _ => RuleOutcome::Pass,
        },
    },
    // Disposition is due after delivery for damaged parts, and after a
    // usage notification for out-of-stock consumption.
    Rule {
        name: "disposition",
        eval: |ctx| {
            if ctx.damaged {
                match ctx.fwd_delivery {
                    Some(delivery) if overdue(delivery, ctx.disposition, 2) => {
                        return RuleOutcome::Assign(Stage::Disposition);
                    }
                    _ => return RuleOutcome::Pass,
                }
            }
            if ctx.out_of_stock == Some(true) {
                if let Some(notified) = ctx.usage_notification {
                    if overdue(notified, ctx.disposition, 1) {
                        return RuleOutcome::Assign(Stage::Disposition);
                    }
                }
            }
            RuleOutcome::Pass
        },
    },
    Rule {
        name: "consumption",
        eval: |ctx| {
            if ctx.damaged {
                return RuleOutcome::Pass;
            }
            match ctx.part_receipt {
                Some(receipt) if overdue(receipt, ctx.usage_notification, 1) => {
                    RuleOutcome::Assign(Stage::Consumption)
                }
                _ => RuleOutcome::Pass,
            }
        },
    },
    Rule {
        name: "facility-goods-receipt",
        eval: |ctx| {
            if ctx.damaged {
                return RuleOutcome::Pass;
            }
            match ctx.fwd_delivery {
                Some(delivery) if overdue(delivery, ctx.part_receipt, 1) => {
                    RuleOutcome::Assign(Stage::GrDc)
                }
                _ => RuleOutcome::Pass,
            }
        },
    },
    Rule {
        name: "received-damaged",
        eval: |ctx| {
            if ctx.damaged {
                RuleOutcome::Assign(Stage::ReceivedDamaged)
            } else {
                RuleOutcome::Pass
            }
        },
    },
    Rule {
        name: "forward-delivery",
        eval: |ctx| match ctx.fwd_ship {
            Some(ship) if overdue(ship, ctx.fwd_delivery, 2) => {
                RuleOutcome::Assign(Stage::FwdDelivery)
            }
            _ => RuleOutcome::Pass,
        },
    },
    Rule {
        name: "forward-shipment",
        eval: |ctx| match ctx.fwd_readiness {
            Some(readiness) if overdue(readiness, ctx.fwd_ship, 2) => {
                RuleOutcome::Assign(Stage::FwdShipment)
            }
            _ => RuleOutcome::Pass,
        },
    },
    // Restock path: only when the out-of-stock flag is explicitly
    // false. A compliant gap clears the record outright here; it does
    // not fall through to the RMA aging rules below.
    Rule {
        name: "restock-load-id",
        eval: |ctx| {
            let Some(notified) = ctx.usage_notification else {
                return RuleOutcome::Pass;
            };
            if ctx.out_of_stock != Some(false) {
                return RuleOutcome::Pass;
            }
            if overdue(notified, ctx.fwd_readiness, 1) {
                RuleOutcome::Assign(Stage::FwdLoadId)
            } else {
                RuleOutcome::Clear
            }
        },
    },
    Rule {
        name: "forward-load-id",
        eval: |ctx| match ctx.rma_obtained {
            Some(obtained) if overdue(obtained, ctx.fwd_readiness, 1) => {
                RuleOutcome::Assign(Stage::FwdLoadId)
            }
            _ => RuleOutcome::Pass,
        },
    },
    Rule {
        name: "rma-resolution",
        eval: |ctx| match ctx.rma_request {
            Some(requested) if overdue(requested, ctx.rma_obtained, 1) => {
                RuleOutcome::Assign(Stage::WallogResolution)
            }
            _ => RuleOutcome::Pass,
        },
    },
    Rule {
        name: "rma-creation",
        eval: |ctx| match ctx.creation {
            Some(created) if overdue(created, ctx.rma_request, 1) => {
                RuleOutcome::Assign(Stage::RmaCreation)
            }
            _ => RuleOutcome::Pass,
        },
    },
];

/// Classify one record.
///
/// Deterministic and total: any combination of present, absent or
/// corrupt fields yields either a stage or `None`, never an error.
#[must_use]
pub fn classify(
    record: &RecordData,
    disputed_serials: &HashSet<String>,
    problem_facilities: &HashSet<String>,
    today: NaiveDate,
) -> Option<Stage> {
    let ctx = StageContext::extract(record, disputed_serials, problem_facilities, today);

    for rule in RULES {
        match (rule.eval)(&ctx) {
            RuleOutcome::Assign(stage) => {
                tracing::trace!(rule = rule.name, stage = %stage, "Rule matched");
                return Some(stage);
            }
            RuleOutcome::Clear => {
                tracing::trace!(rule = rule.name, "Rule cleared record");
                return None;
            }
            RuleOutcome::Pass => {}
        }
    }

    None
}
