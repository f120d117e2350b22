// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Record store — encrypt-then-persist / fetch-then-decrypt orchestration.
//
// Every operation resolves the caller's capability, writes its audit entry
// *before* the durable effect, and keeps the aggregate cache in step with
// the corpus. A failed audit write aborts the operation: there is no path
// to a record's content that leaves no trace.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use harbor_core::config::VaultConfig;
use harbor_core::error::{HarborError, Result};
use harbor_core::store::ByteStore;
use harbor_core::types::{Capability, EncryptedBlob, Record, RecordId, ReportDraft, UserId};

use harbor_analytics::aggregate::{AggregateCache, AggregateSnapshot};
use harbor_analytics::anonymize::anonymize;
use harbor_analytics::insights::{self, InsightsReport};

use crate::audit::{AuditAction, AuditEvent, AuditLog, AuditResource};
use crate::crypto;
use crate::session::CapabilityProvider;

/// Store key prefix for encrypted records.
pub const RECORD_PREFIX: &str = "record/";

/// Store key prefix for per-user draft slots.
pub const DRAFT_PREFIX: &str = "draft/";

/// Plaintext metadata persisted next to the blob. Enough for the ownership
/// pre-check and key scans without touching ciphertext.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecordMeta {
    id: RecordId,
    user_id: UserId,
    created_at: DateTime<Utc>,
}

/// The persisted envelope: metadata plus the encrypted payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    meta: StoredRecordMeta,
    blob: EncryptedBlob,
}

/// Orchestrates encryption, persistence, auditing, and aggregation for one
/// user session's records.
pub struct RecordStore {
    store: Arc<dyn ByteStore>,
    audit: AuditLog,
    cache: AggregateCache,
    session: Arc<dyn CapabilityProvider>,
    config: VaultConfig,
}

impl RecordStore {
    pub fn new(
        store: Arc<dyn ByteStore>,
        session: Arc<dyn CapabilityProvider>,
        config: VaultConfig,
    ) -> Self {
        let audit = AuditLog::new(Arc::clone(&store));
        let cache = AggregateCache::new(Arc::clone(&store));
        Self {
            store,
            audit,
            cache,
            session,
            config,
        }
    }

    /// The audit log, for hosts that surface the trail to the user.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    fn capability(&self) -> Result<Capability> {
        self.session
            .current()?
            .ok_or(HarborError::NotAuthenticated)
    }

    fn record_key(id: RecordId) -> String {
        format!("{RECORD_PREFIX}{id}")
    }

    fn draft_key(user: &UserId) -> String {
        format!("{DRAFT_PREFIX}{user}")
    }

    // -- Record lifecycle ---------------------------------------------------

    /// Encrypt and persist a new record, returning its fresh id.
    #[instrument(skip_all)]
    pub fn save(&self, draft: ReportDraft) -> Result<RecordId> {
        let capability = self.capability()?;

        let record = Record {
            id: RecordId::new(),
            user_id: capability.user_id.clone(),
            created_at: Utc::now(),
            draft,
        };

        let plaintext = serde_json::to_vec(&record)?;
        let blob = crypto::encrypt(
            &plaintext,
            &capability.encryption_key,
            self.config.kdf_iterations,
        )?;

        // Audit before the blob exists: a write that cannot be audited
        // never happens.
        self.audit.append(AuditEvent {
            user_id: capability.user_id.clone(),
            action: AuditAction::Create,
            resource_type: AuditResource::Report,
            resource_id: record.id.to_string(),
            context: Some(json!({
                "categories": record.draft.categories,
                "state": record.draft.location.state,
                "ciphertext_sha256": ciphertext_digest(&blob.ciphertext),
            })),
        })?;

        let stored = StoredRecord {
            meta: StoredRecordMeta {
                id: record.id,
                user_id: record.user_id.clone(),
                created_at: record.created_at,
            },
            blob,
        };
        self.store
            .set(&Self::record_key(record.id), serde_json::to_value(&stored)?)?;

        self.cache
            .incorporate(&capability.user_id, &anonymize(&record))?;

        // A submitted report supersedes whatever draft was in progress.
        self.store.remove(&Self::draft_key(&capability.user_id))?;

        debug!(id = %record.id, "record saved");
        Ok(record.id)
    }

    /// Load and decrypt one record.
    #[instrument(skip_all, fields(id = %id))]
    pub fn fetch(&self, id: RecordId) -> Result<Record> {
        let capability = self.capability()?;
        let stored = self.load_stored(id)?.ok_or(HarborError::NotFound)?;

        if stored.meta.user_id != capability.user_id {
            return Err(HarborError::Unauthorized);
        }

        let record = self.decrypt_record(&stored, &capability)?;

        self.audit.append(AuditEvent {
            user_id: capability.user_id.clone(),
            action: AuditAction::Read,
            resource_type: AuditResource::Report,
            resource_id: id.to_string(),
            context: None,
        })?;

        Ok(record)
    }

    /// Decrypt every record owned by the caller, newest first.
    ///
    /// A record that fails to decrypt is skipped and logged, not fatal to
    /// the listing; the summary audit entry carries both tallies.
    #[instrument(skip_all)]
    pub fn list_all(&self) -> Result<Vec<Record>> {
        let capability = self.capability()?;
        let (mut records, skipped) = self.owned_records(&capability)?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        self.audit.append(AuditEvent {
            user_id: capability.user_id.clone(),
            action: AuditAction::Read,
            resource_type: AuditResource::Report,
            resource_id: "all".into(),
            context: Some(json!({ "returned": records.len(), "skipped": skipped })),
        })?;

        Ok(records)
    }

    /// Amend an existing record's editable fields. Identity and creation
    /// time are preserved; only the owner may amend.
    #[instrument(skip_all, fields(id = %id))]
    pub fn update(&self, id: RecordId, draft: ReportDraft) -> Result<()> {
        let capability = self.capability()?;
        let stored = self.load_stored(id)?.ok_or(HarborError::NotFound)?;

        if stored.meta.user_id != capability.user_id {
            return Err(HarborError::Unauthorized);
        }

        let existing = self.decrypt_record(&stored, &capability)?;
        let amended = existing.amended(draft);

        let plaintext = serde_json::to_vec(&amended)?;
        let blob = crypto::encrypt(
            &plaintext,
            &capability.encryption_key,
            self.config.kdf_iterations,
        )?;

        self.audit.append(AuditEvent {
            user_id: capability.user_id.clone(),
            action: AuditAction::Update,
            resource_type: AuditResource::Report,
            resource_id: id.to_string(),
            context: Some(json!({
                "categories": amended.draft.categories,
                "ciphertext_sha256": ciphertext_digest(&blob.ciphertext),
            })),
        })?;

        let stored = StoredRecord {
            meta: StoredRecordMeta {
                id: amended.id,
                user_id: amended.user_id.clone(),
                created_at: amended.created_at,
            },
            blob,
        };
        self.store
            .set(&Self::record_key(id), serde_json::to_value(&stored)?)?;

        // The old contribution cannot be subtracted from a noised surface,
        // so replay the corpus.
        self.rebuild_cache(&capability)?;
        Ok(())
    }

    /// Remove a record. The audit entry lands before physical removal; a
    /// crash between the two leaves a delete entry for a blob that still
    /// exists, which the single-writer model accepts.
    #[instrument(skip_all, fields(id = %id))]
    pub fn delete(&self, id: RecordId) -> Result<()> {
        let capability = self.capability()?;
        let stored = self.load_stored(id)?.ok_or(HarborError::NotFound)?;

        if stored.meta.user_id != capability.user_id {
            return Err(HarborError::Unauthorized);
        }

        // Same gate as fetch: the caller must actually hold the key.
        self.decrypt_record(&stored, &capability)?;

        self.audit.append(AuditEvent {
            user_id: capability.user_id.clone(),
            action: AuditAction::Delete,
            resource_type: AuditResource::Report,
            resource_id: id.to_string(),
            context: None,
        })?;

        self.store.remove(&Self::record_key(id))?;
        self.rebuild_cache(&capability)?;

        debug!(id = %id, "record deleted");
        Ok(())
    }

    // -- Draft workbench ----------------------------------------------------

    /// Encrypt and stash an in-progress draft in the caller's draft slot.
    /// Drafts are not records: they carry no audit trail.
    pub fn save_draft(&self, draft: &ReportDraft) -> Result<()> {
        let capability = self.capability()?;
        let plaintext = serde_json::to_vec(draft)?;
        let blob = crypto::encrypt(
            &plaintext,
            &capability.encryption_key,
            self.config.kdf_iterations,
        )?;
        self.store.set(
            &Self::draft_key(&capability.user_id),
            serde_json::to_value(&blob)?,
        )
    }

    /// Load the caller's draft, if any. A draft that no longer decrypts is
    /// treated as absent rather than blocking the author.
    pub fn load_draft(&self) -> Result<Option<ReportDraft>> {
        let capability = self.capability()?;
        let Some(value) = self.store.get(&Self::draft_key(&capability.user_id))? else {
            return Ok(None);
        };

        let blob: EncryptedBlob = match serde_json::from_value(value) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "stored draft is malformed; discarding");
                return Ok(None);
            }
        };

        match crypto::decrypt(&blob, &capability.encryption_key, self.config.kdf_iterations)
            .and_then(|plaintext| Ok(serde_json::from_slice::<ReportDraft>(&plaintext)?))
        {
            Ok(draft) => Ok(Some(draft)),
            Err(e) => {
                warn!(error = %e, "draft failed to decrypt; discarding");
                Ok(None)
            }
        }
    }

    pub fn clear_draft(&self) -> Result<()> {
        let capability = self.capability()?;
        self.store.remove(&Self::draft_key(&capability.user_id))
    }

    // -- Export -------------------------------------------------------------

    /// Produce a timestamped JSON document with the caller's profile
    /// metadata and every decrypted record, for direct user download.
    #[instrument(skip_all)]
    pub fn export_all(&self) -> Result<Vec<u8>> {
        let capability = self.capability()?;
        let (records, skipped) = self.owned_records(&capability)?;

        self.audit.append(AuditEvent {
            user_id: capability.user_id.clone(),
            action: AuditAction::Export,
            resource_type: AuditResource::User,
            resource_id: capability.user_id.to_string(),
            context: Some(json!({ "records": records.len(), "skipped": skipped })),
        })?;

        let document = json!({
            "user": { "id": capability.user_id },
            "exported_at": Utc::now().to_rfc3339(),
            "record_count": records.len(),
            "records": records,
        });

        Ok(serde_json::to_vec_pretty(&document)?)
    }

    // -- Analytics surface --------------------------------------------------

    /// The only read path for aggregate data: a freshly noised snapshot of
    /// the caller's corpus. Raw records never leave through here.
    #[instrument(skip_all)]
    pub fn read_aggregate(&self) -> Result<AggregateSnapshot> {
        let capability = self.capability()?;

        self.audit.append(AuditEvent {
            user_id: capability.user_id.clone(),
            action: AuditAction::Read,
            resource_type: AuditResource::Analytics,
            resource_id: "aggregate".into(),
            context: None,
        })?;

        self.cache.read(&capability.user_id)
    }

    /// Trend / temporal / demographic insights over the caller's corpus,
    /// computed from anonymized records only.
    #[instrument(skip_all)]
    pub fn read_insights(&self, now: DateTime<Utc>) -> Result<InsightsReport> {
        let capability = self.capability()?;

        self.audit.append(AuditEvent {
            user_id: capability.user_id.clone(),
            action: AuditAction::Read,
            resource_type: AuditResource::Analytics,
            resource_id: "insights".into(),
            context: None,
        })?;

        let (records, _) = self.owned_records(&capability)?;
        let anonymized: Vec<_> = records.iter().map(anonymize).collect();
        Ok(insights::generate(&anonymized, now))
    }

    /// Throw the aggregate away and replay the caller's corpus into it.
    pub fn rebuild_aggregate(&self) -> Result<()> {
        let capability = self.capability()?;
        self.rebuild_cache(&capability)
    }

    // -- Internals ----------------------------------------------------------

    fn load_stored(&self, id: RecordId) -> Result<Option<StoredRecord>> {
        match self.store.get(&Self::record_key(id))? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Decrypt and verify ownership. A decrypted record whose owner is not
    /// the caller is a hard fault, never silently returned.
    fn decrypt_record(&self, stored: &StoredRecord, capability: &Capability) -> Result<Record> {
        let plaintext = crypto::decrypt(
            &stored.blob,
            &capability.encryption_key,
            self.config.kdf_iterations,
        )?;
        let record: Record =
            serde_json::from_slice(&plaintext).map_err(|_| HarborError::DecryptionFailed)?;

        if record.user_id != capability.user_id {
            return Err(HarborError::Unauthorized);
        }
        Ok(record)
    }

    /// Scan, filter to the caller, decrypt. Failures are skipped, counted,
    /// and logged with a failure flag; they never abort the scan.
    fn owned_records(&self, capability: &Capability) -> Result<(Vec<Record>, u64)> {
        let keys = self.store.list_keys(RECORD_PREFIX)?;
        let mut records = Vec::new();
        let mut skipped = 0u64;

        for key in keys {
            let Some(value) = self.store.get(&key)? else {
                continue;
            };
            let stored: StoredRecord = match serde_json::from_value(value) {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(%key, error = %e, "unreadable record envelope; skipping");
                    continue;
                }
            };
            if stored.meta.user_id != capability.user_id {
                continue;
            }

            match self.decrypt_record(&stored, capability) {
                Ok(record) => records.push(record),
                Err(_) => {
                    skipped += 1;
                    self.audit.append(AuditEvent {
                        user_id: capability.user_id.clone(),
                        action: AuditAction::Read,
                        resource_type: AuditResource::Report,
                        resource_id: stored.meta.id.to_string(),
                        context: Some(json!({ "failed": true })),
                    })?;
                }
            }
        }

        Ok((records, skipped))
    }

    fn rebuild_cache(&self, capability: &Capability) -> Result<()> {
        let (records, _) = self.owned_records(capability)?;
        let anonymized: Vec<_> = records.iter().map(anonymize).collect();
        self.cache
            .rebuild_from(&capability.user_id, anonymized.iter())
    }
}

/// SHA-256 hex digest of the sealed payload, recorded in audit context so
/// an entry can later be matched against the blob it covered.
fn ciphertext_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
