//! The store's pool runs read-only sessions.

use super::common::*;

pub async fn test_writes_are_rejected(ctx: &TestContext) {
    println!("  🧪 test_writes_are_rejected");

    let insert = sqlx::query("INSERT INTO hipeac_metadata (`type`, value) VALUES ('topic', 'Nope')")
        .execute(ctx.store.pool())
        .await;
    assert!(insert.is_err(), "insert should fail on a read-only session");

    let update = sqlx::query("UPDATE hipeac_user SET first_name = 'X' WHERE id = 1")
        .execute(ctx.store.pool())
        .await;
    assert!(update.is_err(), "update should fail on a read-only session");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM hipeac_metadata WHERE value = 'Nope'")
        .fetch_one(&ctx.admin)
        .await
        .unwrap();
    assert_eq!(count, 0);

    println!("     ✓ Writes fail closed");
}

pub async fn run_all_tests(ctx: &TestContext) {
    println!("\n🔒 Read-only sessions");
    test_writes_are_rejected(ctx).await;
}
