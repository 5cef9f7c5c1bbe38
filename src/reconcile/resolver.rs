use std::collections::HashMap;

use crate::region::gateway::RegionGateway;
use crate::region::models::*;
use crate::reconcile::{distinct_ids, or_empty};

/// Per-region lookup tables, built once per run from batch fetches
#[derive(Debug, Default)]
pub struct RegionIndexes {
    pub applications_by_id: HashMap<String, Application>,
    pub applications_by_pair: HashMap<String, Application>,
    pub campaigns: HashMap<String, Campaign>,
    pub profiles: HashMap<String, UserProfile>,
}

impl RegionIndexes {
    pub fn build(
        by_id: Vec<Application>,
        by_user_campaign: Vec<Application>,
        campaigns: Vec<Campaign>,
        profiles: Vec<UserProfile>,
    ) -> Self {
        let mut indexes = Self::default();

        for application in by_id {
            indexes
                .applications_by_id
                .entry(application.id.clone())
                .or_insert(application);
        }
        // The composite lookup is a superset query; first row per pair wins
        for application in by_user_campaign {
            if let (Some(user_id), Some(campaign_id)) =
                (&application.user_id, &application.campaign_id)
            {
                indexes
                    .applications_by_pair
                    .entry(pair_key(user_id, campaign_id))
                    .or_insert(application);
            }
        }
        for campaign in campaigns {
            indexes.campaigns.entry(campaign.id.clone()).or_insert(campaign);
        }
        for profile in profiles {
            indexes.profiles.entry(profile.id.clone()).or_insert(profile);
        }

        indexes
    }

    /// Batch-load every table the submissions reference: one query per table.
    /// A failed table contributes nothing; the rest still load.
    pub async fn load(
        region: &RegionId,
        gateway: &dyn RegionGateway,
        submissions: &[Submission],
    ) -> Self {
        let user_ids = distinct_ids(submissions.iter().map(|s| &s.user_id));
        let campaign_ids = distinct_ids(submissions.iter().map(|s| &s.campaign_id));
        let application_ids = distinct_ids(submissions.iter().map(|s| &s.application_id));

        let by_id = or_empty(
            region,
            "applications",
            gateway.fetch_applications_by_ids(&application_ids).await,
        );
        let by_user_campaign = or_empty(
            region,
            "applications",
            gateway
                .fetch_applications_by_user_campaign(&user_ids, &campaign_ids)
                .await,
        );
        let campaigns = or_empty(
            region,
            "campaigns",
            gateway.fetch_campaigns_by_ids(&campaign_ids).await,
        );
        let profiles = or_empty(
            region,
            "user_profiles",
            gateway.fetch_profiles_by_ids(&user_ids).await,
        );

        Self::build(by_id, by_user_campaign, campaigns, profiles)
    }
}

/// One way of finding a submission's application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationLookup {
    /// Direct foreign key
    ById,
    /// `userId_campaignId` composite key
    ByUserCampaign,
}

/// Tried in order; the first hit wins
pub const APPLICATION_LOOKUPS: &[ApplicationLookup] =
    &[ApplicationLookup::ById, ApplicationLookup::ByUserCampaign];

impl ApplicationLookup {
    fn find<'a>(&self, submission: &Submission, indexes: &'a RegionIndexes) -> Option<&'a Application> {
        match self {
            ApplicationLookup::ById => submission
                .application_id
                .as_ref()
                .and_then(|id| indexes.applications_by_id.get(id)),
            ApplicationLookup::ByUserCampaign => match (&submission.user_id, &submission.campaign_id) {
                (Some(user_id), Some(campaign_id)) => indexes
                    .applications_by_pair
                    .get(&pair_key(user_id, campaign_id)),
                _ => None,
            },
        }
    }
}

/// A submission's owning records within its own region
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedEntities<'a> {
    pub application: Option<&'a Application>,
    pub campaign: Option<&'a Campaign>,
    pub profile: Option<&'a UserProfile>,
}

impl<'a> ResolvedEntities<'a> {
    /// applicant name, application nickname, profile name, profile nickname
    pub fn creator_name(&self) -> Option<String> {
        let app = self.application;
        let profile = self.profile;
        app.and_then(|a| non_empty(&a.applicant_name))
            .or_else(|| app.and_then(|a| non_empty(&a.nickname)))
            .or_else(|| profile.and_then(|p| non_empty(&p.name)))
            .or_else(|| profile.and_then(|p| non_empty(&p.nickname)))
            .map(str::to_string)
    }

    pub fn phone(&self) -> Option<String> {
        self.application
            .and_then(|a| non_empty(&a.phone_number))
            .or_else(|| self.profile.and_then(|p| non_empty(&p.phone)))
            .map(str::to_string)
    }

    pub fn email(&self) -> Option<String> {
        self.application
            .and_then(|a| non_empty(&a.email))
            .or_else(|| self.profile.and_then(|p| non_empty(&p.email)))
            .map(str::to_string)
    }
}

/// Resolve a submission's application, campaign and profile. Never fails;
/// anything unmatched is `None`.
pub fn resolve<'a>(submission: &Submission, indexes: &'a RegionIndexes) -> ResolvedEntities<'a> {
    let application = APPLICATION_LOOKUPS
        .iter()
        .find_map(|lookup| lookup.find(submission, indexes));

    ResolvedEntities {
        application,
        campaign: submission
            .campaign_id
            .as_ref()
            .and_then(|id| indexes.campaigns.get(id)),
        profile: submission
            .user_id
            .as_ref()
            .and_then(|id| indexes.profiles.get(id)),
    }
}
