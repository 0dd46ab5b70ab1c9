//! One migration unit: one source entity streamed into one target entity.

use super::error::{AbortedRun, UnitFault};
use super::report::{RecordOutcome, RecordStatus, RunReport};
use crate::catalog::EntityDef;
use crate::error::ConfigError;
use crate::mapping::{transform, Mapping, ResolvedMapping};
use crate::store::{Persisted, SourceQueryable, StoreFault, TargetStore};
use crate::value::ValueBag;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How the unit decides between creating and updating a target entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdentityPolicy {
    /// Always insert a new target entity. Re-running the unit produces
    /// new entities; this matches plain bulk-copy behavior.
    #[default]
    CreateOnly,
    /// Look up an existing target entity by this key field and update it
    /// in place, inserting when no match exists. Makes re-runs
    /// idempotent.
    UpsertBy(String),
}

/// Configuration for a unit run.
#[derive(Debug, Clone)]
pub struct UnitOptions {
    /// Halt at the first per-record failure instead of continuing past
    /// failures.
    pub stop_on_error: bool,
    /// Records fetched per page from the source store. A resource knob
    /// with no effect on observable results.
    pub batch_size: usize,
    /// Create-vs-update decision for transformed records.
    pub identity_policy: IdentityPolicy,
    /// Transform and report without persisting anything.
    pub dry_run: bool,
    /// Add implicit verbatim-copy rules for every field name the source
    /// and target schemas share. Explicit mapping rules always win.
    /// Requires a source that can enumerate its fields.
    pub copy_shared_fields: bool,
}

impl Default for UnitOptions {
    fn default() -> Self {
        Self {
            stop_on_error: true,
            batch_size: 1000,
            identity_policy: IdentityPolicy::CreateOnly,
            dry_run: false,
            copy_shared_fields: false,
        }
    }
}

/// Migrates every record of one source entity into one target entity.
///
/// The mapping and defaults are resolved against the target descriptor
/// when the unit is built; a bad configuration never reaches the run
/// loop.
#[derive(Debug, Clone)]
pub struct MigrationUnit {
    name: String,
    target: EntityDef,
    mapping: ResolvedMapping,
    options: UnitOptions,
}

impl MigrationUnit {
    /// Build a unit, validating mapping and defaults against the target
    /// descriptor and the identity policy's key field.
    pub fn new(
        name: impl Into<String>,
        target: EntityDef,
        mapping: Mapping,
        defaults: ValueBag,
        options: UnitOptions,
    ) -> Result<Self, ConfigError> {
        let resolved = ResolvedMapping::resolve(&target, &mapping, &defaults)?;

        if let IdentityPolicy::UpsertBy(key) = &options.identity_policy {
            if !target.has_field(key) {
                return Err(ConfigError::UnknownIdentityField {
                    entity: target.name.clone(),
                    field: key.clone(),
                });
            }
        }

        Ok(Self {
            name: name.into(),
            target,
            mapping: resolved,
            options,
        })
    }

    /// Unit name, as shown in reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The target entity this unit writes.
    pub fn target(&self) -> &EntityDef {
        &self.target
    }

    /// The unit's run options.
    pub fn options(&self) -> &UnitOptions {
        &self.options
    }

    /// Stream every source record through the mapping and persist the
    /// results.
    ///
    /// Per-record failures are recorded in the report and, with
    /// `stop_on_error`, halt the run; the report is still returned
    /// normally. Source read faults and target connectivity faults are
    /// fatal: the run ends with [`AbortedRun`] carrying the partial
    /// report.
    pub fn run(
        &self,
        source: &mut dyn SourceQueryable,
        store: &mut dyn TargetStore,
    ) -> Result<RunReport, AbortedRun> {
        let started = Instant::now();
        let mut report = RunReport::new(&self.name, source.entity(), &self.target.name);
        report.dry_run = self.options.dry_run;

        debug!(unit = %self.name, source = %report.source_entity, target = %report.target_entity, "unit run starting");

        let total = match source.count() {
            Ok(n) => n,
            Err(fault) => return Err(self.abort(report, started, fault.into())),
        };
        report.total = Some(total);

        let mapping = match self.effective_mapping(source) {
            Ok(m) => m,
            Err(config) => return Err(self.abort(report, started, config.into())),
        };

        let mut offset = 0u64;
        'stream: loop {
            let page = match source.fetch_page(offset, self.options.batch_size) {
                Ok(page) => page,
                Err(fault) => return Err(self.abort(report, started, fault.into())),
            };
            if page.is_empty() {
                break;
            }
            let page_len = page.len();

            for record in page {
                let source_id = record.record_id();
                let failure = match transform(record.as_ref(), &mapping) {
                    Ok(bag) => match self.persist(store, &bag) {
                        Ok(status) => {
                            report.record(RecordOutcome {
                                source_id,
                                status,
                                error: None,
                            });
                            continue;
                        }
                        Err(fault) if fault.is_fatal() => {
                            return Err(self.abort(report, started, fault.into()));
                        }
                        Err(fault) => (source_id, fault.to_string()),
                    },
                    Err(err) => (source_id, err.to_string()),
                };

                let (source_id, detail) = failure;
                warn!(unit = %self.name, record = %source_id, error = %detail, "record failed");
                report.record(RecordOutcome::failed(source_id, detail));

                if self.options.stop_on_error {
                    report.skipped = total.saturating_sub(report.processed());
                    break 'stream;
                }
            }

            offset += page_len as u64;
            if page_len < self.options.batch_size {
                break;
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            unit = %self.name,
            succeeded = report.succeeded(),
            failed = report.failed,
            total = total,
            duration_ms = report.duration_ms,
            "unit run finished"
        );
        Ok(report)
    }

    /// The mapping actually used for this run: validated against the
    /// source schema when introspectable, extended with shared-field
    /// copies when requested.
    fn effective_mapping(
        &self,
        source: &mut dyn SourceQueryable,
    ) -> Result<ResolvedMapping, ConfigError> {
        let source_fields = source.field_names();
        if source_fields.is_empty() {
            return Ok(self.mapping.clone());
        }

        let missing: Vec<String> = self
            .mapping
            .source_field_refs()
            .filter(|name| !source_fields.iter().any(|f| f == name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::UnknownSourceFields {
                source_entity: source.entity().to_string(),
                fields: missing,
            });
        }

        if self.options.copy_shared_fields {
            Ok(self.mapping.with_shared_fields(&source_fields, &self.target))
        } else {
            Ok(self.mapping.clone())
        }
    }

    fn persist(
        &self,
        store: &mut dyn TargetStore,
        bag: &ValueBag,
    ) -> Result<RecordStatus, StoreFault> {
        if self.options.dry_run {
            return Ok(RecordStatus::Created);
        }
        match &self.options.identity_policy {
            IdentityPolicy::CreateOnly => {
                store.insert(&self.target, bag)?;
                Ok(RecordStatus::Created)
            }
            IdentityPolicy::UpsertBy(key) => match store.upsert(&self.target, key, bag)? {
                Persisted::Created => Ok(RecordStatus::Created),
                Persisted::Updated => Ok(RecordStatus::Updated),
            },
        }
    }

    fn abort(&self, mut report: RunReport, started: Instant, fault: UnitFault) -> AbortedRun {
        warn!(unit = %self.name, fault = %fault, "unit run aborted");
        report.abort(fault.to_string());
        report.duration_ms = started.elapsed().as_millis() as u64;
        AbortedRun { report, fault }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, FieldType, ScalarType};
    use crate::mapping::FieldRule;
    use crate::record::Row;
    use crate::store::{MemorySource, MemoryStore};
    use crate::value::Value;

    fn user_entity() -> EntityDef {
        EntityDef::new("User", "id")
            .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
            .with_field(FieldDef::new("username", FieldType::scalar(ScalarType::String)))
            .with_field(FieldDef::new("age", FieldType::scalar(ScalarType::Int64)))
            .with_field(FieldDef::new("is_admin", FieldType::scalar(ScalarType::Bool)))
    }

    fn source_rows() -> Vec<Row> {
        vec![
            Row::new("l-1").with("email", "a@x.com").with("age", 30i64),
            Row::new("l-2").with("email", "b@x.com").with("age", 41i64),
        ]
    }

    fn users_mapping() -> Mapping {
        Mapping::new().copy("username", "email").field(
            "age",
            FieldRule::computed(|r| {
                r.field("age")
                    .and_then(|v| v.as_i64())
                    .map(|age| Value::Int64(age + 1))
                    .ok_or_else(|| "age unreadable".to_string())
            }),
        )
    }

    fn admin_default() -> ValueBag {
        let mut defaults = ValueBag::new();
        defaults.insert("is_admin".into(), Value::Bool(false));
        defaults
    }

    #[test]
    fn test_construction_rejects_unknown_fields() {
        let mapping = Mapping::new().copy("nickname", "email");
        let err = MigrationUnit::new(
            "users",
            user_entity(),
            mapping,
            ValueBag::new(),
            UnitOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFields { .. }));
    }

    #[test]
    fn test_construction_rejects_unknown_identity_key() {
        let options = UnitOptions {
            identity_policy: IdentityPolicy::UpsertBy("nickname".into()),
            ..UnitOptions::default()
        };
        let err = MigrationUnit::new(
            "users",
            user_entity(),
            users_mapping(),
            admin_default(),
            options,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownIdentityField { .. }));
    }

    #[test]
    fn test_run_migrates_every_record() {
        let unit = MigrationUnit::new(
            "users",
            user_entity(),
            users_mapping(),
            admin_default(),
            UnitOptions::default(),
        )
        .unwrap();

        let mut source = MemorySource::new("LegacyUser", source_rows());
        let mut store = MemoryStore::new();
        let report = unit.run(&mut source, &mut store).unwrap();

        assert_eq!(report.processed(), 2);
        assert_eq!(report.created, 2);
        assert!(report.is_clean());
        assert_eq!(report.total, Some(2));

        let rows = store.rows("User");
        assert_eq!(rows[0]["username"], Value::String("a@x.com".into()));
        assert_eq!(rows[0]["age"], Value::Int64(31));
        assert_eq!(rows[0]["is_admin"], Value::Bool(false));
        assert_eq!(rows[1]["age"], Value::Int64(42));
    }

    #[test]
    fn test_dry_run_persists_nothing() {
        let options = UnitOptions {
            dry_run: true,
            ..UnitOptions::default()
        };
        let unit = MigrationUnit::new(
            "users",
            user_entity(),
            users_mapping(),
            admin_default(),
            options,
        )
        .unwrap();

        let mut source = MemorySource::new("LegacyUser", source_rows());
        let mut store = MemoryStore::new();
        let report = unit.run(&mut source, &mut store).unwrap();

        assert_eq!(report.created, 2);
        assert!(report.dry_run);
        assert!(store.is_empty("User"));
    }

    #[test]
    fn test_unknown_source_field_aborts_before_records() {
        let mapping = Mapping::new().copy("username", "login");
        let unit = MigrationUnit::new(
            "users",
            user_entity(),
            mapping,
            admin_default(),
            UnitOptions::default(),
        )
        .unwrap();

        let mut source = MemorySource::new("LegacyUser", source_rows());
        let mut store = MemoryStore::new();
        let aborted = unit.run(&mut source, &mut store).unwrap_err();

        assert_eq!(aborted.report.processed(), 0);
        assert!(aborted.report.aborted.is_some());
        assert!(matches!(
            aborted.fault,
            UnitFault::Config(ConfigError::UnknownSourceFields { .. })
        ));
        assert!(store.is_empty("User"));
    }

    #[test]
    fn test_copy_shared_fields() {
        let source_rows = vec![Row::new("l-1")
            .with("username", "alice")
            .with("age", 30i64)
            .with("password", "secret")];
        let mut defaults = ValueBag::new();
        defaults.insert("is_admin".into(), Value::Bool(true));

        let options = UnitOptions {
            copy_shared_fields: true,
            ..UnitOptions::default()
        };
        let unit = MigrationUnit::new(
            "users",
            user_entity(),
            Mapping::new(),
            defaults,
            options,
        )
        .unwrap();

        let mut source = MemorySource::new("LegacyUser", source_rows);
        let mut store = MemoryStore::new();
        let report = unit.run(&mut source, &mut store).unwrap();

        assert_eq!(report.created, 1);
        let row = &store.rows("User")[0];
        assert_eq!(row["username"], Value::String("alice".into()));
        assert_eq!(row["age"], Value::Int64(30));
        assert_eq!(row["is_admin"], Value::Bool(true));
        assert!(!row.contains_key("password"));
    }

    #[test]
    fn test_stop_on_error_halts_at_first_failure() {
        let rows = vec![
            Row::new("l-1").with("email", "a@x.com").with("age", 30i64),
            Row::new("l-2").with("age", 41i64), // email missing
            Row::new("l-3").with("email", "c@x.com").with("age", 52i64),
        ];
        let unit = MigrationUnit::new(
            "users",
            user_entity(),
            users_mapping(),
            admin_default(),
            UnitOptions::default(),
        )
        .unwrap();

        let mut source = MemorySource::new("LegacyUser", rows);
        let mut store = MemoryStore::new();
        let report = unit.run(&mut source, &mut store).unwrap();

        assert_eq!(report.processed(), 2);
        assert_eq!(report.outcomes[1].status, RecordStatus::Failed);
        assert_eq!(report.skipped, 1);
        assert_eq!(store.len("User"), 1);
    }

    #[test]
    fn test_continue_past_failures() {
        let rows = vec![
            Row::new("l-1").with("email", "a@x.com").with("age", 30i64),
            Row::new("l-2").with("age", 41i64),
            Row::new("l-3").with("email", "c@x.com").with("age", 52i64),
        ];
        let options = UnitOptions {
            stop_on_error: false,
            ..UnitOptions::default()
        };
        let unit = MigrationUnit::new(
            "users",
            user_entity(),
            users_mapping(),
            admin_default(),
            options,
        )
        .unwrap();

        let mut source = MemorySource::new("LegacyUser", rows);
        let mut store = MemoryStore::new();
        let report = unit.run(&mut source, &mut store).unwrap();

        assert_eq!(report.processed(), 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.created, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(store.len("User"), 2);
    }

    #[test]
    fn test_upsert_policy_is_idempotent() {
        let options = UnitOptions {
            identity_policy: IdentityPolicy::UpsertBy("username".into()),
            ..UnitOptions::default()
        };
        let unit = MigrationUnit::new(
            "users",
            user_entity(),
            users_mapping(),
            admin_default(),
            options,
        )
        .unwrap();

        let mut store = MemoryStore::new();
        let first = unit
            .run(&mut MemorySource::new("LegacyUser", source_rows()), &mut store)
            .unwrap();
        let second = unit
            .run(&mut MemorySource::new("LegacyUser", source_rows()), &mut store)
            .unwrap();

        assert_eq!(first.created, 2);
        assert_eq!(second.updated, 2);
        assert_eq!(second.created, 0);
        assert_eq!(store.len("User"), 2);
    }

    #[test]
    fn test_create_only_rerun_duplicates() {
        let unit = MigrationUnit::new(
            "users",
            user_entity(),
            users_mapping(),
            admin_default(),
            UnitOptions::default(),
        )
        .unwrap();

        let mut store = MemoryStore::new();
        unit.run(&mut MemorySource::new("LegacyUser", source_rows()), &mut store)
            .unwrap();
        unit.run(&mut MemorySource::new("LegacyUser", source_rows()), &mut store)
            .unwrap();

        // Create-only re-runs are not idempotent by design.
        assert_eq!(store.len("User"), 4);
    }

    #[test]
    fn test_fatal_store_fault_aborts_with_partial_report() {
        let unit = MigrationUnit::new(
            "users",
            user_entity(),
            users_mapping(),
            admin_default(),
            UnitOptions::default(),
        )
        .unwrap();

        let mut source = MemorySource::new("LegacyUser", source_rows());
        let mut store = MemoryStore::new();
        store.disconnect();

        let aborted = unit.run(&mut source, &mut store).unwrap_err();
        assert!(matches!(aborted.fault, UnitFault::Store(_)));
        assert!(aborted.report.aborted.is_some());
        assert_eq!(aborted.report.processed(), 0);
    }

    #[test]
    fn test_static_value_frozen_across_records() {
        let stamp = Value::Timestamp(1_700_000_000_000_000);
        let mapping = users_mapping().field("id", FieldRule::Static(stamp.clone()));
        // Freezing is per construction: both records see the same value.
        let options = UnitOptions {
            stop_on_error: false,
            ..UnitOptions::default()
        };
        let entity = EntityDef::new("Event", "id")
            .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Timestamp)))
            .with_field(FieldDef::new("username", FieldType::scalar(ScalarType::String)))
            .with_field(FieldDef::new("age", FieldType::scalar(ScalarType::Int64)))
            .with_field(FieldDef::optional(
                "is_admin",
                FieldType::optional_scalar(ScalarType::Bool),
            ));
        let unit =
            MigrationUnit::new("events", entity, mapping, ValueBag::new(), options).unwrap();

        let mut source = MemorySource::new("LegacyUser", source_rows());
        let mut store = MemoryStore::new();
        let report = unit.run(&mut source, &mut store).unwrap();

        // Identical identity values collide, proving the literal was not
        // re-evaluated per record.
        assert_eq!(report.created, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(store.rows("Event")[0]["id"], stamp);
    }
}
