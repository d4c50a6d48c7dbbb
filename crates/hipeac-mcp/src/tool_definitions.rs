//! Directory tool definitions.
//!
//! | Tool | Arguments | Result |
//! |------|-----------|--------|
//! | `get_metadata` | none | structured catalog |
//! | `search_members` | optional filters, `limit` | structured member list |
//! | `find_experts` | `expertise`, `country`, `min_members` | grouped text listing |

use crate::protocol::{ToolAnnotations, ToolDefinition};
use hipeac_core::MembershipType;
use hipeac_directory::{DEFAULT_SEARCH_LIMIT, MAX_EXPERTS_PER_AREA, MAX_SEARCH_LIMIT};
use serde_json::{Value, json};

pub const GET_METADATA: &str = "get_metadata";
pub const SEARCH_MEMBERS: &str = "search_members";
pub const FIND_EXPERTS: &str = "find_experts";

/// All tools served by the directory MCP server.
pub fn directory_tools() -> Vec<ToolDefinition> {
    vec![get_metadata_tool(), search_members_tool(), find_experts_tool()]
}

pub fn get_metadata_tool() -> ToolDefinition {
    ToolDefinition {
        name: GET_METADATA.to_string(),
        description: Some(
            "Get available metadata as structured JSON. Returns all metadata categories \
             including topics, application areas, institution types, and membership types. \
             Use the returned IDs with search_members."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {},
            "additionalProperties": false
        }),
        output_schema: Some(metadata_response_schema()),
        annotations: Some(ToolAnnotations::read_only("Get metadata")),
    }
}

pub fn search_members_tool() -> ToolDefinition {
    let id_list = |description: &str| {
        json!({
            "type": "array",
            "items": { "type": "integer" },
            "description": description
        })
    };

    ToolDefinition {
        name: SEARCH_MEMBERS.to_string(),
        description: Some(
            "Search active HiPEAC network members by research interests, location, and \
             institution. Filters combine with AND; values inside one filter combine with OR. \
             Returns member profiles with affiliation, research topics, and profile links. \
             Use get_metadata or the metadata resources to discover valid IDs."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text search in member first name, last name, email, or username"
                },
                "topic_ids": id_list("Research topic IDs"),
                "application_area_ids": id_list("Application area IDs"),
                "countries": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Country codes of the member's institutions (e.g. ['BE', 'ES'])"
                },
                "institution_type_ids": id_list("Institution type IDs"),
                "membership_types": {
                    "type": "array",
                    "items": { "type": "string", "enum": membership_type_keys() },
                    "description": "Membership types"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 0,
                    "default": DEFAULT_SEARCH_LIMIT,
                    "description": format!("Maximum number of members to return (max: {})", MAX_SEARCH_LIMIT)
                }
            }
        }),
        output_schema: Some(member_search_response_schema()),
        annotations: Some(ToolAnnotations::read_only("Search members")),
    }
}

pub fn find_experts_tool() -> ToolDefinition {
    ToolDefinition {
        name: FIND_EXPERTS.to_string(),
        description: Some(
            "Find expert researchers in specific topics or application areas, based on \
             their declared research interests. Useful for finding collaborators or \
             potential project partners. Returns profiles grouped by expertise area."
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "expertise": {
                    "type": "array",
                    "items": { "type": "string" },
                    "minItems": 1,
                    "description": "Research topics or application areas (IDs or names)"
                },
                "country": {
                    "type": "string",
                    "description": "Country code to filter by location"
                },
                "min_members": {
                    "type": "integer",
                    "minimum": 0,
                    "default": 1,
                    "description": format!("Experts to return per topic or area (max: {})", MAX_EXPERTS_PER_AREA)
                }
            },
            "required": ["expertise"]
        }),
        output_schema: None,
        annotations: Some(ToolAnnotations::read_only("Find experts")),
    }
}

fn membership_type_keys() -> Vec<&'static str> {
    MembershipType::ALL.iter().map(|t| t.key()).collect()
}

fn metadata_item_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "integer" },
            "value": { "type": "string" }
        },
        "required": ["id", "value"]
    })
}

fn metadata_response_schema() -> Value {
    let items = json!({ "type": "array", "items": metadata_item_schema() });
    json!({
        "type": "object",
        "properties": {
            "application_areas": items,
            "institution_types": items,
            "topics": items,
            "membership_types": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "key": { "type": "string", "enum": membership_type_keys() },
                        "label": { "type": "string" }
                    },
                    "required": ["key", "label"]
                }
            }
        },
        "required": ["application_areas", "institution_types", "membership_types", "topics"]
    })
}

fn member_search_response_schema() -> Value {
    let items = json!({ "type": "array", "items": metadata_item_schema() });
    json!({
        "type": "object",
        "properties": {
            "total": { "type": "integer", "minimum": 0 },
            "limit": { "type": "integer", "minimum": 0 },
            "members": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "username": { "type": "string" },
                        "first_name": { "type": "string" },
                        "last_name": { "type": "string" },
                        "profile_url": { "type": "string", "format": "uri" },
                        "membership": { "type": "string", "enum": membership_type_keys() },
                        "institutions": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "name": { "type": "string" },
                                    "country": { "type": "string" },
                                    "type": metadata_item_schema()
                                },
                                "required": ["name", "country"]
                            }
                        },
                        "application_areas": items,
                        "topics": items
                    },
                    "required": ["username", "first_name", "last_name", "profile_url"]
                }
            }
        },
        "required": ["total", "limit", "members"]
    })
}
