//! Field and collection names of the remote record schema.
//!
//! Every shard shares this schema subset; auxiliary collections carry
//! their own small schemas. Names are kept as string constants so the
//! select lists, filter builders and diff payloads all agree.

/// System creation timestamp, the global ordering key for merged scans.
pub const CREATED_ON: &str = "createdon";
/// Monotonic per-record version, the within-instant ordering key.
pub const VERSION: &str = "versionnumber";

/// Case identifier shared across shards and auxiliary collections.
pub const NOTIFICATION_ID: &str = "notificationid";
/// Cached classification label. Owned by the reconciliation job; never
/// written by uploads.
pub const STAGE: &str = "stage";
/// Manual review marker; `"Reviewed"` hands routing over to the remark.
pub const REVIEW_STATUS: &str = "reviewstatus";
/// Free-text remark that reassigns ownership once a record is reviewed.
pub const REMARK: &str = "remark";
/// Destination facility code (matched case-insensitively against the
/// problem-facility set).
pub const FACILITY_CODE: &str = "facilitycode";

pub const RMA_CANCELLED_FLAG: &str = "rmacancelledflag";
pub const DISPOSITION_TYPE: &str = "dispositiontype";
pub const CREATION_TIMESTAMP: &str = "creationtimestamp";
pub const RMA_REQUEST_DATE: &str = "rmarequestdate";
pub const RMA_OBTAINED_DATE: &str = "rmaobtaineddate";
pub const FWD_MATERIAL_READINESS_DATE: &str = "fwdmaterialreadinessdate";
pub const FWD_ACTUAL_SHIP_DATE: &str = "fwdactualshipdate";
pub const FWD_ACTUAL_DELIVERY_DATE: &str = "fwdactualdeliverydate";
pub const PART_RECEIPT_DATE: &str = "partreceiptdate";
pub const USAGE_NOTIFICATION_DATE: &str = "usagenotificationdate";
pub const DISPOSITION_DATE: &str = "dispositiondate";
pub const RVRS_MATERIAL_READINESS_DATE: &str = "rvrsmaterialreadinessdate";
pub const RVRS_ACTUAL_SHIP_DATE: &str = "rvrsactualshipdate";
pub const RVRS_CARRIER_UNLOAD_DATE: &str = "rvrscarrierunloaddate";
pub const GOODS_RECEIPT_CONFIRMATION_DATE: &str = "goodsreceiptconfirmationdate";
pub const DAMAGED_ON_ARRIVAL: &str = "damagedonarrival";
pub const OUT_OF_STOCK_FLAG: &str = "outofstockflag";

/// The record value that exempts a cancelled-but-shipped RMA from
/// reconciliation.
pub const DISPOSITION_RETURN_UNUSED: &str = "Return & Unused";
/// The review-status value that switches owner routing to the remark.
pub const REVIEW_STATUS_REVIEWED: &str = "Reviewed";

/// Columns needed to classify a record (the shard id field is added per
/// shard).
pub const STAGE_SELECT: &[&str] = &[
    RMA_CANCELLED_FLAG,
    FWD_ACTUAL_SHIP_DATE,
    DISPOSITION_TYPE,
    CREATION_TIMESTAMP,
    RMA_REQUEST_DATE,
    RMA_OBTAINED_DATE,
    FWD_MATERIAL_READINESS_DATE,
    FWD_ACTUAL_DELIVERY_DATE,
    PART_RECEIPT_DATE,
    USAGE_NOTIFICATION_DATE,
    DISPOSITION_DATE,
    RVRS_MATERIAL_READINESS_DATE,
    RVRS_ACTUAL_SHIP_DATE,
    RVRS_CARRIER_UNLOAD_DATE,
    GOODS_RECEIPT_CONFIRMATION_DATE,
    DAMAGED_ON_ARRIVAL,
    NOTIFICATION_ID,
    FACILITY_CODE,
    OUT_OF_STOCK_FLAG,
    STAGE,
];

/// Audit trail of field changes awaiting approval.
pub mod change_log {
    /// Collection name.
    pub const COLLECTION: &str = "changehistories";

    pub const FIELD: &str = "field";
    pub const OLD_VALUE: &str = "oldvalue";
    pub const NEW_VALUE: &str = "newvalue";
    pub const CHANGED_BY: &str = "changedby";
    pub const SOURCE: &str = "source";
    pub const STATUS: &str = "status";

    /// Option-set code for entries still awaiting approval.
    pub const STATUS_PENDING: i64 = 170_260_000;

    /// Serial-number fields whose pending entries mark a case disputed.
    pub const DISPUTED_SERIAL_FIELDS: &[&str] =
        &["failedpartserialnumber", "sparepartserialnumber"];
}

/// Country watch list driving the extended return-shipment allowance.
pub mod problem_countries {
    pub const COLLECTION: &str = "problemcountries";
    pub const COUNTRY: &str = "country";
}

/// Facility directory, joined against the country watch list.
pub mod facilities {
    pub const COLLECTION: &str = "facilities";
    pub const COUNTRY: &str = "country";
    pub const FACILITY_CODE: &str = "facilitycode";
}
