//! Metadata resources.
//!
//! Markdown documents that let agents discover valid topic, application
//! area, institution type and membership type values before calling tools.

use crate::error::McpError;
use crate::protocol::{ResourceContents, ResourceDefinition};
use hipeac_core::{MetadataItem, MetadataType};
use hipeac_directory::{Directory, catalog::membership_type_items};

const MIME_TYPE: &str = "text/markdown";

/// The metadata documents served as resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataResource {
    ApplicationAreas,
    Topics,
    InstitutionTypes,
    MembershipTypes,
}

impl MetadataResource {
    pub const ALL: [MetadataResource; 4] = [
        MetadataResource::ApplicationAreas,
        MetadataResource::Topics,
        MetadataResource::InstitutionTypes,
        MetadataResource::MembershipTypes,
    ];

    pub fn uri(&self) -> &'static str {
        match self {
            MetadataResource::ApplicationAreas => "hipeac://metadata/application-areas",
            MetadataResource::Topics => "hipeac://metadata/topics",
            MetadataResource::InstitutionTypes => "hipeac://metadata/institution-types",
            MetadataResource::MembershipTypes => "hipeac://metadata/membership-types",
        }
    }

    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.uri() == uri)
    }

    fn name(&self) -> &'static str {
        match self {
            MetadataResource::ApplicationAreas => "application-areas",
            MetadataResource::Topics => "topics",
            MetadataResource::InstitutionTypes => "institution-types",
            MetadataResource::MembershipTypes => "membership-types",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            MetadataResource::ApplicationAreas => {
                "Application domains where HiPEAC research is applied"
            }
            MetadataResource::Topics => {
                "Research topics used in the HiPEAC network for categorizing members"
            }
            MetadataResource::InstitutionTypes => "Types of institutions in the HiPEAC network",
            MetadataResource::MembershipTypes => "Different membership levels in HiPEAC",
        }
    }

    /// Heading and guidance lines.
    fn preamble(&self) -> &'static [&'static str] {
        match self {
            MetadataResource::ApplicationAreas => &[
                "# Application Areas\n",
                "These are the domains where HiPEAC research is applied.\n",
                "When searching for members, use the application area ID.\n",
            ],
            MetadataResource::Topics => &[
                "# Research Topics\n",
                "These topics are used to categorize research interests of members, projects, and publications.\n",
                "When searching for members, use the topic ID.\n",
            ],
            MetadataResource::InstitutionTypes => &[
                "# Institution Types\n",
                "Types of organizations in the HiPEAC network.\n",
                "When filtering members, use the institution type ID.\n",
            ],
            MetadataResource::MembershipTypes => &[
                "# Membership Types\n",
                "Different levels of membership in the HiPEAC network:\n",
            ],
        }
    }

    fn metadata_type(&self) -> Option<MetadataType> {
        match self {
            MetadataResource::ApplicationAreas => Some(MetadataType::ApplicationArea),
            MetadataResource::Topics => Some(MetadataType::Topic),
            MetadataResource::InstitutionTypes => Some(MetadataType::InstitutionType),
            MetadataResource::MembershipTypes => None,
        }
    }

    pub fn definition(&self) -> ResourceDefinition {
        ResourceDefinition {
            uri: self.uri().to_string(),
            name: self.name().to_string(),
            description: Some(self.description().to_string()),
            mime_type: MIME_TYPE.to_string(),
        }
    }

    /// Render the document. Membership types never touch the store.
    pub async fn render(&self, directory: &Directory) -> Result<String, McpError> {
        let bullets: Vec<(String, String)> = match self.metadata_type() {
            Some(metadata_type) => directory
                .catalog()
                .list(metadata_type)
                .await?
                .into_iter()
                .map(|MetadataItem { id, value }| (value, id.to_string()))
                .collect(),
            None => membership_type_items()
                .into_iter()
                .map(|item| (item.label, item.key.key().to_string()))
                .collect(),
        };
        Ok(render_document(self.preamble(), &bullets))
    }

    pub async fn read(&self, directory: &Directory) -> Result<ResourceContents, McpError> {
        Ok(ResourceContents {
            uri: self.uri().to_string(),
            mime_type: MIME_TYPE.to_string(),
            text: self.render(directory).await?,
        })
    }
}

/// Definitions of every resource.
pub fn list_resources() -> Vec<ResourceDefinition> {
    MetadataResource::ALL.iter().map(|r| r.definition()).collect()
}

/// Read a resource by URI.
pub async fn read_resource(directory: &Directory, uri: &str) -> Result<ResourceContents, McpError> {
    let resource = MetadataResource::from_uri(uri).ok_or_else(|| McpError::ResourceNotFound {
        uri: uri.to_string(),
    })?;
    resource.read(directory).await
}

fn render_document(preamble: &[&str], bullets: &[(String, String)]) -> String {
    let mut lines: Vec<String> = preamble.iter().map(|line| line.to_string()).collect();
    lines.extend(
        bullets
            .iter()
            .map(|(value, id)| format!("- **{}** (ID: {})", value, id)),
    );
    lines.join("\n")
}
