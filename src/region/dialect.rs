// Per-region schema dialects.
//
// The three regional stores were provisioned at different times and drifted:
// the same logical column lives under different names, or not at all. A
// dialect records that drift so the SQL adapter can select `NULL` for what is
// missing and the rest of the service never sees the difference.

/// Column map for one region. `None` means the region has no such column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionDialect {
    pub submissions_table: &'static str,
    pub submission_approved_at: Option<&'static str>,

    pub application_name: Option<&'static str>,
    pub application_nickname: Option<&'static str>,
    pub application_email: Option<&'static str>,
    pub application_phone: Option<&'static str>,

    pub campaign_brand: Option<&'static str>,
    pub campaign_type: Option<&'static str>,
    pub campaign_points_override: Option<&'static str>,
    pub campaign_reward_points: Option<&'static str>,
    pub campaign_estimated_cost: Option<&'static str>,
    pub campaign_video_count: Option<&'static str>,

    pub profile_nickname: Option<&'static str>,
    pub profile_email: Option<&'static str>,
    pub profile_phone: Option<&'static str>,

    pub ledger_table: &'static str,
    pub ledger_campaign: &'static str,
    pub ledger_transaction_type: Option<&'static str>,
    pub ledger_description: Option<&'static str>,

    /// Balance history kept beside the ledger (`campaign_id`, `type`, `reason` columns)
    pub history_table: &'static str,
}

impl RegionDialect {
    pub fn korea() -> Self {
        Self {
            submissions_table: "video_submissions",
            submission_approved_at: Some("approved_at"),
            application_name: Some("applicant_name"),
            application_nickname: Some("nickname"),
            application_email: Some("email"),
            application_phone: Some("phone_number"),
            campaign_brand: Some("brand"),
            campaign_type: Some("campaign_type"),
            campaign_points_override: Some("creator_points_override"),
            campaign_reward_points: Some("reward_points"),
            campaign_estimated_cost: Some("estimated_cost"),
            campaign_video_count: Some("video_count"),
            profile_nickname: Some("nickname"),
            profile_email: Some("email"),
            profile_phone: Some("phone"),
            ledger_table: "point_transactions",
            ledger_campaign: "related_campaign_id",
            ledger_transaction_type: Some("transaction_type"),
            ledger_description: Some("description"),
            history_table: "point_history",
        }
    }

    pub fn japan() -> Self {
        Self {
            application_nickname: None,
            application_phone: Some("phone"),
            campaign_estimated_cost: None,
            profile_nickname: None,
            ..Self::korea()
        }
    }

    pub fn us() -> Self {
        Self {
            application_nickname: None,
            application_email: None,
            application_phone: Some("phone"),
            campaign_points_override: Some("point_amount"),
            campaign_video_count: None,
            profile_nickname: None,
            ledger_description: None,
            ..Self::korea()
        }
    }

    /// Preset for a region name; unknown regions get the korea layout
    pub fn for_region(region: &str) -> Self {
        match region {
            "japan" => Self::japan(),
            "us" => Self::us(),
            _ => Self::korea(),
        }
    }
}

/// `column::type AS alias`, or `NULL::type AS alias` when the column is absent
pub(crate) fn select_or_null(column: Option<&str>, sql_type: &str, alias: &str) -> String {
    match column {
        Some(column) => format!("{}::{} AS {}", column, sql_type, alias),
        None => format!("NULL::{} AS {}", sql_type, alias),
    }
}
