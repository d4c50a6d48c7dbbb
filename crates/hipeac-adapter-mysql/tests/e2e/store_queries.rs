//! Store queries against the fixture data.

use super::common::*;
use hipeac_core::{MembershipType, MetadataRelation, MetadataType};
use hipeac_directory::{DirectoryStore, ExpertiseTerm, MemberCriterion};

async fn ids(ctx: &TestContext, criterion: MemberCriterion) -> Vec<i64> {
    ctx.store
        .member_ids_where(&criterion)
        .await
        .expect("criterion query should succeed")
        .into_iter()
        .collect()
}

pub async fn test_metadata_ordering(ctx: &TestContext) {
    println!("  🧪 test_metadata_ordering");

    let rows = ctx.store.metadata(&MetadataType::ALL).await.unwrap();
    let order: Vec<_> = rows.iter().map(|r| r.id).collect();
    assert_eq!(order, vec![10, 11, 20, 21, 1, 2, 3, 30]);

    let topics = ctx.store.metadata(&[MetadataType::Topic]).await.unwrap();
    assert_eq!(topics.len(), 4);
    assert!(topics.iter().all(|r| r.metadata_type == MetadataType::Topic));

    println!("     ✓ Ordered by (type, position, value)");
}

pub async fn test_find_metadata(ctx: &TestContext) {
    println!("  🧪 test_find_metadata");

    let types = [MetadataType::Topic, MetadataType::ApplicationArea];

    let by_name = ctx
        .store
        .find_metadata(&ExpertiseTerm::parse("COMP"), &types)
        .await
        .unwrap();
    let values: Vec<_> = by_name.iter().map(|r| r.value.as_str()).collect();
    assert_eq!(values, vec!["Compilers", "Computer Architecture"]);

    let by_id = ctx
        .store
        .find_metadata(&ExpertiseTerm::parse("11"), &types)
        .await
        .unwrap();
    assert_eq!(by_id.len(), 1);
    assert_eq!(by_id[0].value, "Healthcare");

    // Institution types are outside the requested types.
    let excluded = ctx
        .store
        .find_metadata(&ExpertiseTerm::parse("20"), &types)
        .await
        .unwrap();
    assert!(excluded.is_empty());

    // `%` is matched literally.
    let literal = ctx
        .store
        .find_metadata(&ExpertiseTerm::parse("100%"), &types)
        .await
        .unwrap();
    assert_eq!(literal.len(), 1);
    let wildcard = ctx
        .store
        .find_metadata(&ExpertiseTerm::parse("%"), &types)
        .await
        .unwrap();
    assert_eq!(wildcard.len(), 1);

    println!("     ✓ Identifier, name and escaped wildcard lookups");
}

pub async fn test_active_members(ctx: &TestContext) {
    println!("  🧪 test_active_members");

    let active: Vec<_> = ctx.store.active_member_ids().await.unwrap().into_iter().collect();
    assert_eq!(active, vec![1, 3, 4]);

    println!("     ✓ Only members with an open membership");
}

pub async fn test_criteria(ctx: &TestContext) {
    println!("  🧪 test_criteria");

    assert_eq!(ids(ctx, MemberCriterion::Text("GARC".into())).await, vec![2]);
    assert_eq!(ids(ctx, MemberCriterion::Text("ugent".into())).await, vec![1]);
    assert_eq!(ids(ctx, MemberCriterion::Topics(vec![1])).await, vec![1, 2, 3]);
    // Topic 3 is only linked to a project row.
    assert!(ids(ctx, MemberCriterion::Topics(vec![3])).await.is_empty());
    assert_eq!(
        ids(ctx, MemberCriterion::ApplicationAreas(vec![10, 11])).await,
        vec![3]
    );
    assert_eq!(
        ids(ctx, MemberCriterion::Countries(vec!["BE".into()])).await,
        vec![1, 3]
    );
    assert_eq!(
        ids(ctx, MemberCriterion::InstitutionTypes(vec![21])).await,
        vec![3]
    );
    assert_eq!(
        ids(ctx, MemberCriterion::MembershipTypes(vec![MembershipType::Member])).await,
        vec![1, 2, 3]
    );
    assert!(ids(ctx, MemberCriterion::Topics(vec![])).await.is_empty());

    println!("     ✓ Every criterion scoped to member rows");
}

pub async fn test_member_details(ctx: &TestContext) {
    println!("  🧪 test_member_details");

    let mut members = ctx.store.members(&[3, 1, 999]).await.unwrap();
    members.sort_by_key(|m| m.id);
    assert_eq!(members.len(), 2);
    assert_eq!(members[1].username, "carol");
    assert_eq!(members[1].email, "carol@antwerp-systems.be");

    let institutions = ctx.store.institutions_of(2).await.unwrap();
    assert_eq!(institutions.len(), 1);
    assert_eq!(institutions[0].country, "ES");
    assert_eq!(institutions[0].type_id, None);

    let topics = ctx
        .store
        .metadata_ids_of(3, MetadataRelation::Topic)
        .await
        .unwrap();
    assert_eq!(topics, vec![2, 1]);

    let areas = ctx
        .store
        .metadata_ids_of(1, MetadataRelation::ApplicationArea)
        .await
        .unwrap();
    assert!(areas.is_empty());

    assert_eq!(
        ctx.store.active_membership_type(3).await.unwrap(),
        Some(MembershipType::AssociatedMember)
    );
    assert_eq!(ctx.store.active_membership_type(2).await.unwrap(), None);

    println!("     ✓ Member rows, links and membership type");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n📂 Store queries");
    test_metadata_ordering(ctx).await;
    test_find_metadata(ctx).await;
    test_active_members(ctx).await;
    test_criteria(ctx).await;
    test_member_details(ctx).await;
}
