// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Harbor incident vault.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Unique identifier for a stored incident record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an audit trail entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuditId(pub Uuid);

impl AuditId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AuditId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AuditId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque user identifier minted by the external auth collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Categories a report can be filed under.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum IncidentCategory {
    WorkplaceBias,
    PoliceEncounter,
    HousingDiscrimination,
    Education,
    PublicSpace,
    Online,
    Other,
}

impl IncidentCategory {
    /// Human-readable label for display and aggregate output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::WorkplaceBias => "Workplace Bias",
            Self::PoliceEncounter => "Police Encounter",
            Self::HousingDiscrimination => "Housing Discrimination",
            Self::Education => "Education",
            Self::PublicSpace => "Public Space",
            Self::Online => "Online",
            Self::Other => "Other",
        }
    }

    /// The stable kebab-case name used on the wire and in audit context.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkplaceBias => "workplace-bias",
            Self::PoliceEncounter => "police-encounter",
            Self::HousingDiscrimination => "housing-discrimination",
            Self::Education => "education",
            Self::PublicSpace => "public-space",
            Self::Online => "online",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for IncidentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse time-of-day label — authors rarely remember exact times, and a
/// coarse bucket leaks less.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

/// Where the incident took place. City is the finest granularity stored;
/// anonymization drops it before anything reaches an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub state: String,
    pub country: String,
}

/// When the incident took place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentTiming {
    pub date: NaiveDate,
    pub time_of_day: Option<TimeOfDay>,
}

/// Optional self-reported demographics. `keep_private` excludes the whole
/// block from every derived output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demographics {
    #[serde(default)]
    pub race: Vec<String>,
    pub age_range: Option<String>,
    pub gender_identity: Option<String>,
    #[serde(default)]
    pub keep_private: bool,
}

/// Impact of the incident and what follow-up the author wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impact {
    pub description: String,
    pub reported_to: Option<String>,
    pub reported_to_details: Option<String>,
    #[serde(default)]
    pub support_desired: Vec<String>,
}

/// Everything the author can edit. Owner and identity fields are stamped by
/// the store on save and are not part of the draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDraft {
    pub demographics: Option<Demographics>,
    pub categories: Vec<IncidentCategory>,
    pub title: String,
    pub narrative: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub location: Location,
    pub timing: IncidentTiming,
    pub impact: Impact,
    pub contact_email: Option<String>,
    #[serde(default)]
    pub open_to_contact: bool,
}

/// A complete incident record. `id` and `user_id` are immutable once
/// created; everything else may be amended by the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub draft: ReportDraft,
}

impl Record {
    /// Amend the editable fields, preserving id, owner, and creation time.
    pub fn amended(&self, draft: ReportDraft) -> Self {
        Self {
            id: self.id,
            user_id: self.user_id.clone(),
            created_at: self.created_at,
            draft,
        }
    }
}

/// The only on-disk representation of a record's content: AES-256-GCM
/// ciphertext plus the nonce and KDF salt needed to open it. Hex-encoded
/// on the wire so the byte store only ever sees JSON strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    #[serde(with = "hex::serde")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub iv: Vec<u8>,
    #[serde(with = "hex::serde")]
    pub salt: Vec<u8>,
}

/// Length in bytes of a user encryption key (256 bits).
pub const USER_KEY_LEN: usize = 32;

/// Proof that the caller may decrypt one user's blobs. Minted by the
/// external auth collaborator at login, held for the session, discarded at
/// logout. The key is zeroised when the capability is dropped.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Capability {
    #[zeroize(skip)]
    pub user_id: UserId,
    #[serde(with = "hex::serde")]
    pub encryption_key: [u8; USER_KEY_LEN],
}

impl Capability {
    pub fn new(user_id: impl Into<String>, encryption_key: [u8; USER_KEY_LEN]) -> Self {
        Self {
            user_id: UserId(user_id.into()),
            encryption_key,
        }
    }
}

// Manual Debug so the raw key can never end up in a log line.
impl std::fmt::Debug for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capability")
            .field("user_id", &self.user_id)
            .field("encryption_key", &"<redacted>")
            .finish()
    }
}
