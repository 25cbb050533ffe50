use crate::error::{DatabaseError, DatabaseErrorExt};
use fxhash::FxHashSet;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::types::SurrealValue;

/// A schema step owned by one vertical slice.
#[derive(Debug)]
pub(crate) struct Migration {
    pub slice_key: &'static str,
    pub version: &'static str,
    pub script: &'static str,
}

/// Built-in schema, in dependency order. Each entry is applied once and
/// recorded in the `migration` table under `<slice>:<version>`.
const BUILTIN: &[Migration] = &[
    Migration {
        slice_key: "catalog",
        version: "0001",
        script: "
            DEFINE TABLE IF NOT EXISTS salon SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS salon_slug ON TABLE salon FIELDS slug UNIQUE;
            DEFINE TABLE IF NOT EXISTS service SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS service_salon ON TABLE service FIELDS salon_id;
            DEFINE TABLE IF NOT EXISTS staff SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS staff_salon ON TABLE staff FIELDS salon_id;
            DEFINE TABLE IF NOT EXISTS operating_hours SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS hours_salon_day ON TABLE operating_hours FIELDS salon_id, day UNIQUE;
            DEFINE TABLE IF NOT EXISTS staff_schedule SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS schedule_staff_day ON TABLE staff_schedule FIELDS staff_id, day UNIQUE;
        ",
    },
    Migration {
        slice_key: "booking",
        version: "0001",
        script: "
            DEFINE TABLE IF NOT EXISTS appointment SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS appointment_staff_date ON TABLE appointment FIELDS staff_id, date;
            DEFINE INDEX IF NOT EXISTS appointment_salon_date ON TABLE appointment FIELDS salon_id, date;
            DEFINE INDEX IF NOT EXISTS appointment_customer ON TABLE appointment FIELDS customer_id;
            DEFINE TABLE IF NOT EXISTS appointment_service SCHEMALESS;
            DEFINE INDEX IF NOT EXISTS line_appointment ON TABLE appointment_service FIELDS appointment_id;
        ",
    },
];

#[derive(Debug, Default)]
pub(crate) struct MigrationReport {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, SurrealValue)]
struct AppliedMigration {
    slice_key: String,
    version: String,
}

#[derive(Debug)]
pub(crate) struct MigrationRunner {
    db: Surreal<Any>,
}

impl MigrationRunner {
    #[must_use]
    pub(crate) const fn new(db: Surreal<Any>) -> Self {
        Self { db }
    }

    pub(crate) async fn run(&self) -> Result<MigrationReport, DatabaseError> {
        self.db
            .query("DEFINE TABLE IF NOT EXISTS migration SCHEMALESS;")
            .await
            .context("Preparing migration ledger")?;

        let applied = self.applied_keys().await?;
        let mut report = MigrationReport::default();

        for migration in BUILTIN {
            let key = format!("{}:{}", migration.slice_key, migration.version);
            if applied.contains(&key) {
                report.skipped.push(key);
                continue;
            }
            self.apply(migration).await?;
            report.applied.push(key);
        }

        Ok(report)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), DatabaseError> {
        let query = format!(
            "BEGIN TRANSACTION;
            {}
            CREATE migration CONTENT {{ slice_key: $slice, version: $version }};
            COMMIT TRANSACTION;",
            migration.script,
        );

        self.db
            .query(&query)
            .bind(("slice", migration.slice_key))
            .bind(("version", migration.version))
            .await
            .context(format!(
                "SQL execution failed at {}:{}",
                migration.slice_key, migration.version
            ))?;

        Ok(())
    }

    async fn applied_keys(&self) -> Result<FxHashSet<String>, DatabaseError> {
        let entries = self
            .db
            .query("SELECT slice_key, version FROM migration")
            .await
            .context("Loading applied migrations")?
            .take::<Vec<AppliedMigration>>(0)
            .context("Parsing migration ledger")?;

        Ok(entries
            .into_iter()
            .map(|entry| format!("{}:{}", entry.slice_key, entry.version))
            .collect())
    }
}
