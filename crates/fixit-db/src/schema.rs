//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. Ids are stored as strings
//! and enums as lowercase strings guarded by ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "ticket_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "user_directory",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1: tickets
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
DEFINE TABLE ticket SCHEMAFULL;
DEFINE FIELD building_id ON TABLE ticket TYPE string;
DEFINE FIELD title ON TABLE ticket TYPE string;
DEFINE FIELD description ON TABLE ticket TYPE string;
DEFINE FIELD category ON TABLE ticket TYPE string \
    ASSERT $value IN ['plumbing', 'electrical', 'hvac', 'cleaning', \
    'carpentry', 'appliance', 'painting', 'landscaping', 'security', \
    'other'];
DEFINE FIELD priority ON TABLE ticket TYPE string \
    ASSERT $value IN ['low', 'medium', 'high', 'urgent'];
DEFINE FIELD location ON TABLE ticket TYPE string;
DEFINE FIELD contact_phone ON TABLE ticket TYPE option<string>;
DEFINE FIELD images ON TABLE ticket TYPE array DEFAULT [];
DEFINE FIELD images.* ON TABLE ticket TYPE object;
DEFINE FIELD images.*.url ON TABLE ticket TYPE string;
DEFINE FIELD images.*.public_id ON TABLE ticket TYPE string;
DEFINE FIELD status ON TABLE ticket TYPE string \
    ASSERT $value IN ['open', 'assigned', 'accepted', 'in_progress', \
    'completed'];
DEFINE FIELD created_by ON TABLE ticket TYPE string;
DEFINE FIELD created_by_name ON TABLE ticket TYPE string;
DEFINE FIELD assigned_to ON TABLE ticket TYPE option<string>;
DEFINE FIELD assigned_to_name ON TABLE ticket TYPE option<string>;
DEFINE FIELD assigned_at ON TABLE ticket TYPE option<datetime>;
DEFINE FIELD timeline ON TABLE ticket TYPE array DEFAULT [];
DEFINE FIELD timeline.* ON TABLE ticket TYPE object;
DEFINE FIELD timeline.*.status ON TABLE ticket TYPE string;
DEFINE FIELD timeline.*.occurred_at ON TABLE ticket TYPE datetime;
DEFINE FIELD timeline.*.actor_id ON TABLE ticket TYPE string;
DEFINE FIELD timeline.*.user_name ON TABLE ticket TYPE string;
DEFINE FIELD timeline.*.note ON TABLE ticket TYPE option<string>;
DEFINE FIELD created_at ON TABLE ticket TYPE datetime;
DEFINE FIELD updated_at ON TABLE ticket TYPE datetime;
DEFINE FIELD accepted_at ON TABLE ticket TYPE option<datetime>;
DEFINE FIELD completed_at ON TABLE ticket TYPE option<datetime>;
DEFINE FIELD version ON TABLE ticket TYPE int DEFAULT 1;
DEFINE INDEX idx_ticket_building ON TABLE ticket COLUMNS building_id;
DEFINE INDEX idx_ticket_created_by ON TABLE ticket COLUMNS created_by;
DEFINE INDEX idx_ticket_assigned_to ON TABLE ticket COLUMNS assigned_to;
DEFINE INDEX idx_ticket_status ON TABLE ticket COLUMNS status;
";

// -----------------------------------------------------------------------
// Schema v2: user directory (read-only for the engine)
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
DEFINE TABLE app_user SCHEMAFULL;
DEFINE FIELD display_name ON TABLE app_user TYPE string;
DEFINE FIELD role ON TABLE app_user TYPE string \
    ASSERT $value IN ['admin', 'technician', 'resident'];
DEFINE FIELD building_id ON TABLE app_user TYPE option<string>;
DEFINE FIELD created_at ON TABLE app_user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_app_user_building ON TABLE app_user \
    COLUMNS building_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query(
            "CREATE _migration SET version = $version, \
             name = $name",
        )
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "Failed to record migration v{}: {}",
                migration.version, e,
            ))
        })?;
    }

    Ok(())
}

/// Latest schema version known to this build.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map(|m| m.version).unwrap_or(0)
}
