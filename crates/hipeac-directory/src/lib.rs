//! # hipeac-directory
//!
//! Read-only query core of the HiPEAC directory: metadata catalog, member
//! search and expert finder.
//!
//! All operations go through a [`DirectoryStore`], the only seam that talks
//! to the membership database. The production implementation lives in
//! `hipeac-adapter-mysql`; [`memory::InMemoryDirectory`] backs tests.
//!
//! ```text
//!   MCP tool / resource
//!          │
//!          ▼
//!   ┌──────────────┐      ┌──────────────────┐
//!   │  Directory   │─────▶│ MetadataCatalog  │  (process-lifetime lookup cache)
//!   │  search      │      └────────┬─────────┘
//!   │  experts     │               │
//!   └──────┬───────┘               │
//!          ▼                       ▼
//!      dyn DirectoryStore (read-only)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use hipeac_directory::{Directory, MemberSearch};
//!
//! let directory = Directory::new(store, config.directory.clone());
//! let found = directory
//!     .search_members(&MemberSearch {
//!         countries: vec!["be".into()],
//!         ..Default::default()
//!     })
//!     .await?;
//! ```

pub mod catalog;
pub mod directory;
pub mod error;
pub mod experts;
pub mod memory;
pub mod search;
pub mod store;

pub use catalog::{MembershipTypeItem, MetadataCache, MetadataCatalog, MetadataResponse};
pub use directory::Directory;
pub use error::{DirectoryError, Result};
pub use experts::{Expert, ExpertGroup, ExpertListing, ExpertQuery, MAX_EXPERTS_PER_AREA};
pub use search::{
    DEFAULT_SEARCH_LIMIT, InstitutionProfile, MAX_SEARCH_LIMIT, MemberProfile, MemberSearch,
    MemberSearchResponse,
};
pub use store::{DirectoryStore, ExpertiseTerm, MemberCriterion};
