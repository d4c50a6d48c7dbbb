//! Member search.
//!
//! Filters combine with AND across categories and OR within a category.
//! Each category is evaluated once to a candidate set of member ids, and the
//! candidate sets are intersected with the set of active members. Profiles
//! are assembled only for the members that survive truncation.

use crate::directory::Directory;
use crate::error::Result;
use crate::store::MemberCriterion;
use hipeac_core::{
    Member, MemberId, MembershipType, MetadataId, MetadataItem, MetadataRelation, MetadataType,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Limit applied when the caller does not provide one.
pub const DEFAULT_SEARCH_LIMIT: u32 = 20;

/// Upper bound on the number of returned members.
pub const MAX_SEARCH_LIMIT: u32 = 100;

/// Member search filters. Empty lists and an empty query are not applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberSearch {
    pub query: Option<String>,
    pub topic_ids: Vec<MetadataId>,
    pub application_area_ids: Vec<MetadataId>,
    pub countries: Vec<String>,
    pub institution_type_ids: Vec<MetadataId>,
    pub membership_types: Vec<MembershipType>,
    pub limit: Option<u32>,
}

impl MemberSearch {
    /// Requested limit, defaulted and capped.
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT)
    }

    /// One criterion per applied filter category.
    pub fn criteria(&self) -> Vec<MemberCriterion> {
        let mut criteria = Vec::new();

        if let Some(query) = self.query.as_deref().filter(|q| !q.is_empty()) {
            criteria.push(MemberCriterion::Text(query.to_string()));
        }
        if !self.topic_ids.is_empty() {
            criteria.push(MemberCriterion::Topics(self.topic_ids.clone()));
        }
        if !self.application_area_ids.is_empty() {
            criteria.push(MemberCriterion::ApplicationAreas(
                self.application_area_ids.clone(),
            ));
        }
        if !self.countries.is_empty() {
            criteria.push(MemberCriterion::Countries(
                self.countries.iter().map(|c| c.to_uppercase()).collect(),
            ));
        }
        if !self.institution_type_ids.is_empty() {
            criteria.push(MemberCriterion::InstitutionTypes(
                self.institution_type_ids.clone(),
            ));
        }
        if !self.membership_types.is_empty() {
            criteria.push(MemberCriterion::MembershipTypes(
                self.membership_types.clone(),
            ));
        }

        criteria
    }
}

/// Institution information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionProfile {
    pub name: String,
    pub country: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub institution_type: Option<MetadataItem>,
}

/// Individual member profile.
///
/// Relation fields are absent when the member has no links of that kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub profile_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub membership: Option<MembershipType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institutions: Option<Vec<InstitutionProfile>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_areas: Option<Vec<MetadataItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<MetadataItem>>,
}

/// Search results for member queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSearchResponse {
    /// Number of members returned.
    pub total: usize,
    /// Effective limit after capping.
    pub limit: u32,
    pub members: Vec<MemberProfile>,
}

impl Directory {
    /// Search active members.
    pub async fn search_members(&self, request: &MemberSearch) -> Result<MemberSearchResponse> {
        let limit = request.effective_limit();
        let mut candidates = self.store.active_member_ids().await?;

        for criterion in request.criteria() {
            if candidates.is_empty() {
                break;
            }
            let matched = self.store.member_ids_where(&criterion).await?;
            tracing::debug!(
                category = criterion.category(),
                matched = matched.len(),
                "Applied member filter"
            );
            candidates = candidates.intersection(&matched).copied().collect();
        }

        let ids: Vec<MemberId> = candidates.into_iter().take(limit as usize).collect();
        if ids.is_empty() {
            return Ok(MemberSearchResponse {
                total: 0,
                limit,
                members: Vec::new(),
            });
        }

        let mut rows: HashMap<MemberId, Member> = self
            .store
            .members(&ids)
            .await?
            .into_iter()
            .map(|member| (member.id, member))
            .collect();

        let mut members = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(member) = rows.remove(id) {
                members.push(self.assemble_profile(member).await?);
            }
        }

        Ok(MemberSearchResponse {
            total: members.len(),
            limit,
            members,
        })
    }

    async fn assemble_profile(&self, member: Member) -> Result<MemberProfile> {
        let institutions = self.institution_profiles(member.id).await?;
        let topics = self.related_items(member.id, MetadataRelation::Topic).await?;
        let application_areas = self
            .related_items(member.id, MetadataRelation::ApplicationArea)
            .await?;
        let membership = self.store.active_membership_type(member.id).await?;

        Ok(MemberProfile {
            profile_url: self.config.profile_url(&member.username),
            username: member.username,
            first_name: member.first_name,
            last_name: member.last_name,
            membership,
            institutions,
            application_areas,
            topics,
        })
    }

    async fn institution_profiles(&self, member: MemberId) -> Result<Option<Vec<InstitutionProfile>>> {
        let institutions = self.store.institutions_of(member).await?;
        if institutions.is_empty() {
            return Ok(None);
        }

        let mut profiles = Vec::with_capacity(institutions.len());
        for institution in institutions {
            let institution_type = match institution.type_id {
                Some(type_id) => {
                    self.catalog
                        .resolve_one(MetadataType::InstitutionType, type_id)
                        .await?
                }
                None => None,
            };
            profiles.push(InstitutionProfile {
                name: institution.name,
                country: institution.country,
                institution_type,
            });
        }
        Ok(Some(profiles))
    }

    async fn related_items(
        &self,
        member: MemberId,
        relation: MetadataRelation,
    ) -> Result<Option<Vec<MetadataItem>>> {
        let ids = self.store.metadata_ids_of(member, relation).await?;
        if ids.is_empty() {
            return Ok(None);
        }
        let items = self.catalog.resolve(relation.metadata_type(), &ids).await?;
        Ok((!items.is_empty()).then_some(items))
    }
}
