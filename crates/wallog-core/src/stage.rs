//! Pipeline stage labels for return-handling cases.

use serde::{Deserialize, Serialize};

/// The step of the return-handling pipeline a record is currently
/// overdue at.
///
/// Variants are ordered by pipeline progression, from the earliest step
/// (RMA creation) to the latest (serial-number discrepancy). At most one
/// stage applies to a record at a time; the cached `stage` field on a
/// record is either empty or one of these labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// RMA request not raised in time after case creation.
    RmaCreation,
    /// RMA number not obtained in time after the request.
    WallogResolution,
    /// Outbound load id (material readiness) not posted in time.
    FwdLoadId,
    /// Outbound shipment overdue after material readiness.
    FwdShipment,
    /// Outbound delivery overdue after ship.
    FwdDelivery,
    /// Part arrived damaged; case parked until disposition.
    ReceivedDamaged,
    /// Goods receipt at the facility overdue after delivery.
    GrDc,
    /// Usage notification overdue after part receipt.
    Consumption,
    /// Disposition decision overdue.
    Disposition,
    /// Return load id overdue after disposition.
    RvrsLoadId,
    /// Return shipment overdue after return readiness.
    RvrsShipment,
    /// Return delivery overdue after return ship.
    RvrsDelivery,
    /// Goods receipt at the integrator overdue after carrier unload.
    GrSi,
    /// Cancelled RMA that was already shipped; needs reconciliation.
    Reconciliation,
    /// Serial number under dispute.
    DiscrepancySn,
}

impl Stage {
    /// The kebab-case label stored in the remote `stage` field.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::RmaCreation => "rma-creation",
            Stage::WallogResolution => "wallog-resolution",
            Stage::FwdLoadId => "fwd-load-id",
            Stage::FwdShipment => "fwd-shipment",
            Stage::FwdDelivery => "fwd-delivery",
            Stage::ReceivedDamaged => "received-damaged",
            Stage::GrDc => "gr-dc",
            Stage::Consumption => "consumption",
            Stage::Disposition => "disposition",
            Stage::RvrsLoadId => "rvrs-load-id",
            Stage::RvrsShipment => "rvrs-shipment",
            Stage::RvrsDelivery => "rvrs-delivery",
            Stage::GrSi => "gr-si",
            Stage::Reconciliation => "reconciliation",
            Stage::DiscrepancySn => "discrepancy-sn",
        }
    }

    /// All stages, in pipeline order.
    #[must_use]
    pub fn all() -> &'static [Stage] {
        &[
            Stage::RmaCreation,
            Stage::WallogResolution,
            Stage::FwdLoadId,
            Stage::FwdShipment,
            Stage::FwdDelivery,
            Stage::ReceivedDamaged,
            Stage::GrDc,
            Stage::Consumption,
            Stage::Disposition,
            Stage::RvrsLoadId,
            Stage::RvrsShipment,
            Stage::RvrsDelivery,
            Stage::GrSi,
            Stage::Reconciliation,
            Stage::DiscrepancySn,
        ]
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when a string is not a known stage label.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage label: {0}")]
pub struct UnknownStage(pub String);

impl std::str::FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::all()
            .iter()
            .find(|stage| stage.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}
