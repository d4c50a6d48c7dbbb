//! Tool execution.
//!
//! Arguments are decoded into typed requests at this boundary; anything the
//! typed interface rejects (wrong JSON types, negative limits, unknown
//! membership types) becomes [`McpError::InvalidArguments`]. Directory
//! failures are reported as tool results with `isError: true`.

use crate::error::McpError;
use crate::protocol::CallToolResponse;
use crate::tool_definitions::{FIND_EXPERTS, GET_METADATA, SEARCH_MEMBERS};
use hipeac_core::{MembershipType, MetadataId};
use hipeac_directory::{Directory, ExpertQuery, MemberSearch};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchMembersArgs {
    query: Option<String>,
    topic_ids: Option<Vec<MetadataId>>,
    application_area_ids: Option<Vec<MetadataId>>,
    countries: Option<Vec<String>>,
    institution_type_ids: Option<Vec<MetadataId>>,
    membership_types: Option<Vec<MembershipType>>,
    limit: Option<u32>,
}

impl From<SearchMembersArgs> for MemberSearch {
    fn from(args: SearchMembersArgs) -> Self {
        MemberSearch {
            query: args.query,
            topic_ids: args.topic_ids.unwrap_or_default(),
            application_area_ids: args.application_area_ids.unwrap_or_default(),
            countries: args.countries.unwrap_or_default(),
            institution_type_ids: args.institution_type_ids.unwrap_or_default(),
            membership_types: args.membership_types.unwrap_or_default(),
            limit: args.limit,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FindExpertsArgs {
    expertise: Vec<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    min_members: Option<u32>,
}

/// Runs directory tools.
#[derive(Clone)]
pub struct ToolExecutor {
    directory: Arc<Directory>,
}

impl ToolExecutor {
    pub fn new(directory: Arc<Directory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Execute a tool by name.
    pub async fn execute(&self, name: &str, arguments: Value) -> Result<CallToolResponse, McpError> {
        let started = Instant::now();

        let outcome = match name {
            GET_METADATA => self.get_metadata().await,
            SEARCH_MEMBERS => {
                let args: SearchMembersArgs = decode(name, arguments)?;
                self.search_members(args.into()).await
            }
            FIND_EXPERTS => {
                let args: FindExpertsArgs = decode(name, arguments)?;
                if args.expertise.is_empty() {
                    return Err(McpError::InvalidArguments {
                        tool: name.to_string(),
                        reason: "expertise must contain at least one term".to_string(),
                    });
                }
                let mut query = ExpertQuery::new(&args.expertise)
                    .with_min_members(args.min_members.unwrap_or(1));
                query.country = args.country;
                self.find_experts(query).await
            }
            other => {
                return Err(McpError::ToolNotFound {
                    name: other.to_string(),
                });
            }
        };

        match outcome {
            Ok(response) => {
                tracing::info!(
                    tool = name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool call completed"
                );
                Ok(response)
            }
            Err(McpError::ExecutionFailed(e)) => {
                tracing::error!(tool = name, error = %e, "Tool call failed");
                Ok(CallToolResponse::error(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    async fn get_metadata(&self) -> Result<CallToolResponse, McpError> {
        let catalog = self.directory.get_metadata().await?;
        Ok(CallToolResponse::structured(serde_json::to_value(catalog)?))
    }

    async fn search_members(&self, request: MemberSearch) -> Result<CallToolResponse, McpError> {
        let response = self.directory.search_members(&request).await?;
        tracing::debug!(total = response.total, limit = response.limit, "Member search");
        Ok(CallToolResponse::structured(serde_json::to_value(response)?))
    }

    async fn find_experts(&self, query: ExpertQuery) -> Result<CallToolResponse, McpError> {
        let listing = self.directory.find_experts(&query).await?;
        Ok(CallToolResponse::text(listing.render()))
    }
}

/// Decode tool arguments. Absent arguments decode like an empty object.
fn decode<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, McpError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| McpError::InvalidArguments {
        tool: tool.to_string(),
        reason: e.to_string(),
    })
}
