//! In-memory directory store.
//!
//! Holds the same tables as the production database in plain collections.
//! Used by tests across the workspace and for exercising the MCP surface
//! without a database.

use crate::store::{DirectoryStore, ExpertiseTerm, MemberCriterion};
use async_trait::async_trait;
use chrono::NaiveDate;
use hipeac_core::{
    Institution, Member, MemberId, Membership, MembershipType, Metadata, MetadataId,
    MetadataRelation, MetadataType,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct Tables {
    metadata: Vec<Metadata>,
    members: BTreeMap<MemberId, Member>,
    memberships: Vec<Membership>,
    institutions: BTreeMap<i64, Institution>,
    institution_links: Vec<(MemberId, i64)>,
    topic_links: Vec<(MemberId, MetadataId)>,
    application_area_links: Vec<(MemberId, MetadataId)>,
}

impl Tables {
    fn metadata_links(&self, relation: MetadataRelation) -> &[(MemberId, MetadataId)] {
        match relation {
            MetadataRelation::Topic => &self.topic_links,
            MetadataRelation::ApplicationArea => &self.application_area_links,
        }
    }

    fn members_linked(
        links: &[(MemberId, MetadataId)],
        targets: &[MetadataId],
    ) -> BTreeSet<MemberId> {
        links
            .iter()
            .filter(|(_, target)| targets.contains(target))
            .map(|(member, _)| *member)
            .collect()
    }

    fn members_with_institution(&self, pred: impl Fn(&Institution) -> bool) -> BTreeSet<MemberId> {
        self.institution_links
            .iter()
            .filter(|(_, inst)| self.institutions.get(inst).is_some_and(&pred))
            .map(|(member, _)| *member)
            .collect()
    }
}

/// A [`DirectoryStore`] backed by in-process collections.
#[derive(Default)]
pub struct InMemoryDirectory {
    tables: Mutex<Tables>,
    unavailable: AtomicBool,
    metadata_scans: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_available(&self) -> anyhow::Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            anyhow::bail!("data source unavailable");
        }
        Ok(())
    }

    /// Make every query fail, as a dropped database connection would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of metadata table scans served so far.
    pub fn metadata_scans(&self) -> usize {
        self.metadata_scans.load(Ordering::SeqCst)
    }

    pub fn add_metadata(
        &self,
        id: MetadataId,
        metadata_type: MetadataType,
        value: &str,
        position: i32,
    ) {
        self.tables().metadata.push(Metadata {
            id,
            metadata_type,
            value: value.to_string(),
            position,
        });
    }

    pub fn add_member(&self, id: MemberId, username: &str, first_name: &str, last_name: &str) {
        self.tables().members.insert(
            id,
            Member {
                id,
                username: username.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
                email: format!("{}@example.org", username),
            },
        );
    }

    pub fn add_membership(
        &self,
        member_id: MemberId,
        membership_type: MembershipType,
        date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) {
        let mut tables = self.tables();
        let id = tables.memberships.len() as i64 + 1;
        tables.memberships.push(Membership {
            id,
            member_id,
            membership_type,
            date,
            end_date,
        });
    }

    /// Membership started on 2020-01-01 with no end date.
    pub fn add_active_membership(&self, member_id: MemberId, membership_type: MembershipType) {
        self.add_membership(member_id, membership_type, start_date(), None);
    }

    /// Membership that ran from 2020-01-01 to 2022-12-31.
    pub fn add_ended_membership(&self, member_id: MemberId, membership_type: MembershipType) {
        self.add_membership(
            member_id,
            membership_type,
            start_date(),
            NaiveDate::from_ymd_opt(2022, 12, 31),
        );
    }

    pub fn add_institution(&self, id: i64, name: &str, country: &str, type_id: Option<MetadataId>) {
        self.tables().institutions.insert(
            id,
            Institution {
                id,
                name: name.to_string(),
                country: country.to_string(),
                type_id,
            },
        );
    }

    pub fn link_institution(&self, member_id: MemberId, institution_id: i64) {
        self.tables()
            .institution_links
            .push((member_id, institution_id));
    }

    pub fn link_topic(&self, member_id: MemberId, topic_id: MetadataId) {
        self.tables().topic_links.push((member_id, topic_id));
    }

    pub fn link_application_area(&self, member_id: MemberId, area_id: MetadataId) {
        self.tables()
            .application_area_links
            .push((member_id, area_id));
    }
}

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default()
}

fn sorted(mut rows: Vec<Metadata>) -> Vec<Metadata> {
    rows.sort_by(|a, b| {
        (a.metadata_type, a.position, &a.value).cmp(&(b.metadata_type, b.position, &b.value))
    });
    rows
}

#[async_trait]
impl DirectoryStore for InMemoryDirectory {
    async fn metadata(&self, types: &[MetadataType]) -> anyhow::Result<Vec<Metadata>> {
        self.check_available()?;
        self.metadata_scans.fetch_add(1, Ordering::SeqCst);
        let rows = self
            .tables()
            .metadata
            .iter()
            .filter(|row| types.contains(&row.metadata_type))
            .cloned()
            .collect();
        Ok(sorted(rows))
    }

    async fn metadata_by_ids(&self, ids: &[MetadataId]) -> anyhow::Result<Vec<Metadata>> {
        self.check_available()?;
        Ok(self
            .tables()
            .metadata
            .iter()
            .filter(|row| ids.contains(&row.id))
            .cloned()
            .collect())
    }

    async fn find_metadata(
        &self,
        term: &ExpertiseTerm,
        types: &[MetadataType],
    ) -> anyhow::Result<Vec<Metadata>> {
        self.check_available()?;
        let rows = self
            .tables()
            .metadata
            .iter()
            .filter(|row| types.contains(&row.metadata_type))
            .filter(|row| match term {
                ExpertiseTerm::Identifier(id) => row.id == *id,
                ExpertiseTerm::Name(name) => row
                    .value
                    .to_lowercase()
                    .contains(&name.to_lowercase()),
            })
            .cloned()
            .collect();
        Ok(sorted(rows))
    }

    async fn active_member_ids(&self) -> anyhow::Result<BTreeSet<MemberId>> {
        self.check_available()?;
        Ok(self
            .tables()
            .memberships
            .iter()
            .filter(|m| m.is_active())
            .map(|m| m.member_id)
            .collect())
    }

    async fn member_ids_where(
        &self,
        criterion: &MemberCriterion,
    ) -> anyhow::Result<BTreeSet<MemberId>> {
        self.check_available()?;
        let tables = self.tables();
        let ids = match criterion {
            MemberCriterion::Text(text) => {
                let needle = text.to_lowercase();
                tables
                    .members
                    .values()
                    .filter(|m| {
                        [&m.first_name, &m.last_name, &m.email, &m.username]
                            .iter()
                            .any(|field| field.to_lowercase().contains(&needle))
                    })
                    .map(|m| m.id)
                    .collect()
            }
            MemberCriterion::Topics(ids) => Tables::members_linked(&tables.topic_links, ids),
            MemberCriterion::ApplicationAreas(ids) => {
                Tables::members_linked(&tables.application_area_links, ids)
            }
            MemberCriterion::Countries(codes) => {
                tables.members_with_institution(|inst| codes.contains(&inst.country))
            }
            MemberCriterion::InstitutionTypes(ids) => tables.members_with_institution(|inst| {
                inst.type_id.is_some_and(|type_id| ids.contains(&type_id))
            }),
            MemberCriterion::MembershipTypes(types) => tables
                .memberships
                .iter()
                .filter(|m| types.contains(&m.membership_type))
                .map(|m| m.member_id)
                .collect(),
        };
        Ok(ids)
    }

    async fn members(&self, ids: &[MemberId]) -> anyhow::Result<Vec<Member>> {
        self.check_available()?;
        let tables = self.tables();
        Ok(ids
            .iter()
            .filter_map(|id| tables.members.get(id).cloned())
            .collect())
    }

    async fn institutions_of(&self, member: MemberId) -> anyhow::Result<Vec<Institution>> {
        self.check_available()?;
        let tables = self.tables();
        Ok(tables
            .institution_links
            .iter()
            .filter(|(m, _)| *m == member)
            .filter_map(|(_, inst)| tables.institutions.get(inst).cloned())
            .collect())
    }

    async fn metadata_ids_of(
        &self,
        member: MemberId,
        relation: MetadataRelation,
    ) -> anyhow::Result<Vec<MetadataId>> {
        self.check_available()?;
        Ok(self
            .tables()
            .metadata_links(relation)
            .iter()
            .filter(|(m, _)| *m == member)
            .map(|(_, target)| *target)
            .collect())
    }

    async fn active_membership_type(
        &self,
        member: MemberId,
    ) -> anyhow::Result<Option<MembershipType>> {
        self.check_available()?;
        Ok(self
            .tables()
            .memberships
            .iter()
            .find(|m| m.member_id == member && m.is_active())
            .map(|m| m.membership_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_text_criterion_matches_any_field() {
        let store = InMemoryDirectory::new();
        store.add_member(1, "jsmith", "Jane", "Smith");
        store.add_member(2, "bob", "Robert", "Jones");

        let by_name = store
            .member_ids_where(&MemberCriterion::Text("JANE".to_string()))
            .await
            .unwrap();
        assert_eq!(by_name.into_iter().collect::<Vec<_>>(), vec![1]);

        let by_email = store
            .member_ids_where(&MemberCriterion::Text("example.org".to_string()))
            .await
            .unwrap();
        assert_eq!(by_email.len(), 2);
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = InMemoryDirectory::new();
        store.set_unavailable(true);
        assert!(store.active_member_ids().await.is_err());
        store.set_unavailable(false);
        assert!(store.active_member_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_active_membership_wins() {
        let store = InMemoryDirectory::new();
        store.add_member(1, "a", "A", "A");
        store.add_ended_membership(1, MembershipType::AffiliatedPhd);
        store.add_active_membership(1, MembershipType::AffiliatedMember);
        store.add_active_membership(1, MembershipType::Member);

        let membership = store.active_membership_type(1).await.unwrap();
        assert_eq!(membership, Some(MembershipType::AffiliatedMember));
    }
}
