//! Expert finder.
//!
//! Free-text variant of member search: each expertise term is resolved to
//! topic and application area rows, and each row yields its own group of
//! active members linked to it. Output is a grouped plain-text listing.

use crate::directory::Directory;
use crate::error::Result;
use crate::store::{ExpertiseTerm, MemberCriterion};
use hipeac_core::{Member, MemberId, MetadataRelation, MetadataType};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Upper bound on experts listed per topic or application area.
pub const MAX_EXPERTS_PER_AREA: u32 = 10;

const NO_INSTITUTION: &str = "No institution";
const NO_EXPERTS: &str = "No experts found in the specified areas.";

/// Metadata types an expertise term may resolve to.
const EXPERTISE_TYPES: [MetadataType; 2] = [MetadataType::Topic, MetadataType::ApplicationArea];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpertQuery {
    pub expertise: Vec<ExpertiseTerm>,
    pub country: Option<String>,
    pub min_members: u32,
}

impl ExpertQuery {
    pub fn new<I, S>(expertise: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            expertise: expertise
                .into_iter()
                .map(|raw| ExpertiseTerm::parse(raw.as_ref()))
                .collect(),
            country: None,
            min_members: 1,
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    pub fn with_min_members(mut self, min_members: u32) -> Self {
        self.min_members = min_members;
        self
    }

    /// Experts listed per group.
    pub fn per_group(&self) -> u32 {
        self.min_members.min(MAX_EXPERTS_PER_AREA)
    }

    fn country_code(&self) -> Option<String> {
        self.country
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(str::to_uppercase)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expert {
    pub first_name: String,
    pub last_name: String,
    pub institutions: Vec<String>,
    pub profile_url: String,
}

/// Experts linked to one topic or application area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpertGroup {
    pub area: String,
    pub experts: Vec<Expert>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpertListing {
    pub groups: Vec<ExpertGroup>,
}

impl ExpertListing {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn render(&self) -> String {
        if self.groups.is_empty() {
            return NO_EXPERTS.to_string();
        }

        let mut lines = Vec::new();
        for group in &self.groups {
            lines.push(format!("## Experts in: {}\n", group.area));
            for (idx, expert) in group.experts.iter().enumerate() {
                let institutions = if expert.institutions.is_empty() {
                    NO_INSTITUTION.to_string()
                } else {
                    expert.institutions.join(", ")
                };
                lines.push(format!(
                    "{}. **{} {}** - {}\n   Profile: {}",
                    idx + 1,
                    expert.first_name,
                    expert.last_name,
                    institutions,
                    expert.profile_url
                ));
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }
}

impl fmt::Display for ExpertListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Member sets shared by every group of one query, fetched on first need.
#[derive(Default)]
struct Eligible {
    active: Option<BTreeSet<MemberId>>,
    in_country: Option<BTreeSet<MemberId>>,
}

impl Directory {
    /// Find experts per topic or application area.
    pub async fn find_experts(&self, query: &ExpertQuery) -> Result<ExpertListing> {
        let per_group = query.per_group() as usize;
        let country = query.country_code();
        let mut eligible = Eligible::default();
        let mut listing = ExpertListing::default();

        for term in &query.expertise {
            if term.is_blank() {
                continue;
            }

            let rows = self.store.find_metadata(term, &EXPERTISE_TYPES).await?;
            tracing::debug!(term = ?term, rows = rows.len(), "Resolved expertise term");

            for row in rows {
                let Some(relation) = MetadataRelation::for_type(row.metadata_type) else {
                    continue;
                };

                let linked = self
                    .store
                    .member_ids_where(&MemberCriterion::linked_to(relation, row.id))
                    .await?;
                if linked.is_empty() {
                    continue;
                }

                if eligible.active.is_none() {
                    eligible.active = Some(self.store.active_member_ids().await?);
                }
                if let Some(code) = &country
                    && eligible.in_country.is_none()
                {
                    let criterion = MemberCriterion::Countries(vec![code.clone()]);
                    eligible.in_country = Some(self.store.member_ids_where(&criterion).await?);
                }

                let ids: Vec<MemberId> = linked
                    .into_iter()
                    .filter(|id| eligible.active.as_ref().is_some_and(|s| s.contains(id)))
                    .filter(|id| eligible.in_country.as_ref().is_none_or(|s| s.contains(id)))
                    .take(per_group)
                    .collect();
                if ids.is_empty() {
                    continue;
                }

                let experts = self.experts(&ids).await?;
                if experts.is_empty() {
                    continue;
                }
                listing.groups.push(ExpertGroup {
                    area: row.value,
                    experts,
                });
            }
        }

        Ok(listing)
    }

    async fn experts(&self, ids: &[MemberId]) -> Result<Vec<Expert>> {
        let mut rows: HashMap<MemberId, Member> = self
            .store
            .members(ids)
            .await?
            .into_iter()
            .map(|member| (member.id, member))
            .collect();

        let mut experts = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(member) = rows.remove(id) else {
                continue;
            };
            let institutions = self
                .store
                .institutions_of(member.id)
                .await?
                .into_iter()
                .map(|institution| institution.name)
                .collect();
            experts.push(Expert {
                profile_url: self.config.profile_url(&member.username),
                first_name: member.first_name,
                last_name: member.last_name,
                institutions,
            });
        }
        Ok(experts)
    }
}
