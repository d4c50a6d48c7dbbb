//! Directory operations over the MySQL store.

use super::common::*;
use hipeac_core::MembershipType;
use hipeac_directory::{ExpertQuery, MemberSearch};

pub async fn test_search_members(ctx: &TestContext) {
    println!("  🧪 test_search_members");

    let directory = ctx.directory();

    let all = directory.search_members(&MemberSearch::default()).await.unwrap();
    let names: Vec<_> = all.members.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, vec!["alice", "carol", "dave"]);

    let members_only = directory
        .search_members(&MemberSearch {
            membership_types: vec![MembershipType::Member],
            countries: vec!["be".into()],
            ..Default::default()
        })
        .await
        .unwrap();
    let names: Vec<_> = members_only
        .members
        .iter()
        .map(|m| m.username.as_str())
        .collect();
    assert_eq!(names, vec!["alice", "carol"]);

    let carol = &members_only.members[1];
    assert_eq!(carol.membership, Some(MembershipType::AssociatedMember));
    let institution = &carol.institutions.as_ref().unwrap()[0];
    assert_eq!(institution.name, "Antwerp Systems NV");
    assert_eq!(
        institution.institution_type.as_ref().map(|t| t.value.as_str()),
        Some("Industry")
    );
    assert_eq!(carol.application_areas.as_ref().unwrap()[0].value, "Healthcare");

    let alice = &members_only.members[0];
    assert!(alice.application_areas.is_none());

    println!("     ✓ Filters, ordering and profile assembly");
}

pub async fn test_find_experts(ctx: &TestContext) {
    println!("  🧪 test_find_experts");

    let listing = ctx
        .directory()
        .find_experts(&ExpertQuery::new(["intelligence"]).with_min_members(10))
        .await
        .unwrap();
    let text = listing.render();
    assert!(text.starts_with("## Experts in: Artificial Intelligence (AI)\n"));
    assert!(text.contains("1. **Alice Peeters** - Ghent University"));
    assert!(text.contains("2. **Carol Janssens** - Antwerp Systems NV"));
    assert!(!text.contains("Bob"));

    let none = ctx
        .directory()
        .find_experts(&ExpertQuery::new(["Computer Architecture"]))
        .await
        .unwrap();
    assert_eq!(none.render(), "No experts found in the specified areas.");

    println!("     ✓ Grouped listing");
}

pub async fn test_get_metadata(ctx: &TestContext) {
    println!("  🧪 test_get_metadata");

    let catalog = ctx.directory().get_metadata().await.unwrap();
    assert_eq!(catalog.topics.len(), 4);
    assert_eq!(catalog.application_areas.len(), 2);
    assert_eq!(catalog.institution_types.len(), 2);
    assert_eq!(catalog.membership_types.len(), 4);

    println!("     ✓ Catalog from a single query");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n🔎 Directory operations");
    test_search_members(ctx).await;
    test_find_experts(ctx).await;
    test_get_metadata(ctx).await;
}
