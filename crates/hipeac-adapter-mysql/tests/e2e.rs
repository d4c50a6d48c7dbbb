//! End-to-end tests against a Docker MySQL container.
//!
//! Test modules:
//! - `store_queries` - every `DirectoryStore` query against the fixture schema
//! - `directory` - member search, expert finder and catalog over MySQL
//! - `read_only` - writes through the store's pool are rejected
//!
//! Run with:
//!   cargo test -p hipeac-adapter-mysql --test e2e -- --nocapture --test-threads=1
//!
//! Requirements:
//!   - Docker must be running
//!   - Port 3307 must be available

#[path = "e2e/common/mod.rs"]
mod common;

#[path = "e2e/directory.rs"]
mod directory;

#[path = "e2e/read_only.rs"]
mod read_only;

#[path = "e2e/store_queries.rs"]
mod store_queries;

use common::TestContext;

/// Run all E2E tests sequentially against one container.
#[tokio::test]
async fn e2e_all_tests() {
    println!("\n🚀 Starting HiPEAC MySQL adapter end-to-end tests\n");

    let ctx = match TestContext::setup().await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("❌ Failed to setup test context: {}", e);
            eprintln!("   Make sure Docker is running and port 3307 is available");
            return;
        }
    };

    store_queries::run_all_tests(&ctx).await;
    directory::run_all_tests(&ctx).await;
    read_only::run_all_tests(&ctx).await;

    println!("\n🎉 All E2E test modules passed!\n");
}
