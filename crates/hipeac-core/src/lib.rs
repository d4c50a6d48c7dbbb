use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// Configuration types shared across all HiPEAC crates
pub mod config;

pub use config::{
    ConfigError, ContentTypeRef, DirectoryConfig, HipeacConfig, McpConfig, ObservabilityConfig,
    SslMode, Transport, UpstreamConfig,
};

/// Primary key of a member row.
pub type MemberId = i64;

/// Primary key of a metadata row.
pub type MetadataId = i64;

/// Type tag of a metadata row.
///
/// Variants are declared in the lexical order of their storage keys so the
/// derived `Ord` matches the `(type, position, value)` ordering of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataType {
    ApplicationArea,
    InstitutionType,
    Topic,
}

impl MetadataType {
    pub const ALL: [MetadataType; 3] = [
        MetadataType::ApplicationArea,
        MetadataType::InstitutionType,
        MetadataType::Topic,
    ];

    /// Storage key of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataType::ApplicationArea => "application_area",
            MetadataType::InstitutionType => "institution_type",
            MetadataType::Topic => "topic",
        }
    }
}

impl fmt::Display for MetadataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a storage key does not name a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for MetadataType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Legacy rows carry padded type tags.
        match s.trim() {
            "application_area" => Ok(MetadataType::ApplicationArea),
            "institution_type" => Ok(MetadataType::InstitutionType),
            "topic" => Ok(MetadataType::Topic),
            other => Err(UnknownVariant {
                kind: "metadata type",
                value: other.to_string(),
            }),
        }
    }
}

/// Membership level held by a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipType {
    Member,
    AssociatedMember,
    AffiliatedMember,
    AffiliatedPhd,
}

impl MembershipType {
    pub const ALL: [MembershipType; 4] = [
        MembershipType::Member,
        MembershipType::AssociatedMember,
        MembershipType::AffiliatedMember,
        MembershipType::AffiliatedPhd,
    ];

    /// Storage key of this membership type.
    pub fn key(&self) -> &'static str {
        match self {
            MembershipType::Member => "member",
            MembershipType::AssociatedMember => "associated_member",
            MembershipType::AffiliatedMember => "affiliated_member",
            MembershipType::AffiliatedPhd => "affiliated_phd",
        }
    }

    /// Human readable label.
    pub fn label(&self) -> &'static str {
        match self {
            MembershipType::Member => "Full member (from EU)",
            MembershipType::AssociatedMember => "Associated member (non-EU)",
            MembershipType::AffiliatedMember => "Affiliated member",
            MembershipType::AffiliatedPhd => "Affiliated PhD student",
        }
    }
}

impl fmt::Display for MembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MembershipType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MembershipType::ALL
            .into_iter()
            .find(|t| t.key() == s.trim())
            .ok_or_else(|| UnknownVariant {
                kind: "membership type",
                value: s.to_string(),
            })
    }
}

/// A row of the metadata vocabulary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub id: MetadataId,
    #[serde(rename = "type")]
    pub metadata_type: MetadataType,
    pub value: String,
    pub position: i32,
}

impl Metadata {
    pub fn item(&self) -> MetadataItem {
        MetadataItem {
            id: self.id,
            value: self.value.clone(),
        }
    }
}

/// A single metadata item as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataItem {
    pub id: MetadataId,
    pub value: String,
}

/// A network member (user account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// A membership period of a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub id: i64,
    pub member_id: MemberId,
    #[serde(rename = "type")]
    pub membership_type: MembershipType,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl Membership {
    /// A membership without an end date is active.
    pub fn is_active(&self) -> bool {
        self.end_date.is_none()
    }
}

/// An institution a member is affiliated with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    pub id: i64,
    pub name: String,
    /// ISO country code, upper case.
    pub country: String,
    /// Reference to an `institution_type` metadata row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<MetadataId>,
}

/// Member-to-metadata relations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataRelation {
    Topic,
    ApplicationArea,
}

impl MetadataRelation {
    /// Metadata type on the target side of the relation.
    pub fn metadata_type(&self) -> MetadataType {
        match self {
            MetadataRelation::Topic => MetadataType::Topic,
            MetadataRelation::ApplicationArea => MetadataType::ApplicationArea,
        }
    }

    /// Relation targeting the given metadata type, if any.
    pub fn for_type(metadata_type: MetadataType) -> Option<Self> {
        match metadata_type {
            MetadataType::Topic => Some(MetadataRelation::Topic),
            MetadataType::ApplicationArea => Some(MetadataRelation::ApplicationArea),
            MetadataType::InstitutionType => None,
        }
    }
}
