use async_trait::async_trait;
use hipeac_core::{
    Institution, Member, MemberId, MembershipType, Metadata, MetadataId, MetadataRelation,
    MetadataType,
};
use std::collections::BTreeSet;

/// A free-form expertise argument, classified once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpertiseTerm {
    /// Exact metadata identifier.
    Identifier(MetadataId),
    /// Case-insensitive substring of the metadata value.
    Name(String),
}

impl ExpertiseTerm {
    /// Classify a raw argument: all ASCII digits is an identifier, anything
    /// else is a name.
    pub fn parse(raw: &str) -> Self {
        if !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
            && let Ok(id) = raw.parse::<MetadataId>()
        {
            return ExpertiseTerm::Identifier(id);
        }
        ExpertiseTerm::Name(raw.to_string())
    }

    /// Blank names never resolve to anything.
    pub fn is_blank(&self) -> bool {
        matches!(self, ExpertiseTerm::Name(name) if name.trim().is_empty())
    }
}

/// One filter category, evaluated to the set of member ids that satisfy it.
///
/// Multi-valued variants match members linked to any of the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberCriterion {
    /// First name, last name, email or username contains the text
    /// (case-insensitive).
    Text(String),
    /// Linked to any of the topics.
    Topics(Vec<MetadataId>),
    /// Linked to any of the application areas.
    ApplicationAreas(Vec<MetadataId>),
    /// Affiliated with an institution located in any of the (upper case)
    /// country codes.
    Countries(Vec<String>),
    /// Affiliated with an institution of any of the types.
    InstitutionTypes(Vec<MetadataId>),
    /// Holds a membership (active or ended) of any of the types.
    MembershipTypes(Vec<MembershipType>),
}

impl MemberCriterion {
    /// Linked to the given metadata row through its matching relation.
    pub fn linked_to(relation: MetadataRelation, id: MetadataId) -> Self {
        match relation {
            MetadataRelation::Topic => MemberCriterion::Topics(vec![id]),
            MetadataRelation::ApplicationArea => MemberCriterion::ApplicationAreas(vec![id]),
        }
    }

    /// Category name, for logs.
    pub fn category(&self) -> &'static str {
        match self {
            MemberCriterion::Text(_) => "query",
            MemberCriterion::Topics(_) => "topics",
            MemberCriterion::ApplicationAreas(_) => "application_areas",
            MemberCriterion::Countries(_) => "countries",
            MemberCriterion::InstitutionTypes(_) => "institution_types",
            MemberCriterion::MembershipTypes(_) => "membership_types",
        }
    }
}

/// Read-only query interface over the membership database.
///
/// Implementations must never mutate the underlying data. Errors are
/// returned as-is; callers do not retry.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// All metadata rows of the given types, ordered by (type, position, value).
    async fn metadata(&self, types: &[MetadataType]) -> anyhow::Result<Vec<Metadata>>;

    /// Metadata rows with the given ids, in no particular order.
    async fn metadata_by_ids(&self, ids: &[MetadataId]) -> anyhow::Result<Vec<Metadata>>;

    /// Metadata rows of the given types matching the term, ordered by
    /// (type, position, value).
    async fn find_metadata(
        &self,
        term: &ExpertiseTerm,
        types: &[MetadataType],
    ) -> anyhow::Result<Vec<Metadata>>;

    /// Members holding at least one membership without an end date.
    async fn active_member_ids(&self) -> anyhow::Result<BTreeSet<MemberId>>;

    /// Members satisfying a single criterion, regardless of membership status.
    async fn member_ids_where(
        &self,
        criterion: &MemberCriterion,
    ) -> anyhow::Result<BTreeSet<MemberId>>;

    /// Member rows for the given ids, in no particular order.
    async fn members(&self, ids: &[MemberId]) -> anyhow::Result<Vec<Member>>;

    /// Institutions linked to a member, in link order.
    async fn institutions_of(&self, member: MemberId) -> anyhow::Result<Vec<Institution>>;

    /// Metadata ids linked to a member through a relation, in link order.
    async fn metadata_ids_of(
        &self,
        member: MemberId,
        relation: MetadataRelation,
    ) -> anyhow::Result<Vec<MetadataId>>;

    /// Type of the first active membership of a member.
    async fn active_membership_type(
        &self,
        member: MemberId,
    ) -> anyhow::Result<Option<MembershipType>>;
}
