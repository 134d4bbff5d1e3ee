use diesel::prelude::*;
use diesel::result::QueryResult;
use diesel::sqlite::SqliteConnection;
use serde::Serialize;

/// Runtime policy knobs, persisted as a singleton row.
///
/// `strict_device_existence` selects between the two original control
/// behaviors: `false` upserts state for any IMEI, `true` rejects control
/// requests for devices without a state row. `dedup_commands` turns the
/// default "always re-queue" behavior into skip-if-identical-pending.
#[derive(Debug, Clone, Serialize)]
pub struct ServerSettings {
    pub strict_device_existence: bool,
    pub dedup_commands: bool,
    pub default_ttl_seconds: i64,
    pub sweep_interval_seconds: i64,
}

#[derive(Queryable)]
struct ServerSettingsRow {
    id: i32,
    strict_device_existence: bool,
    dedup_commands: bool,
    default_ttl_seconds: i64,
    sweep_interval_seconds: i64,
}

impl ServerSettings {
    /// Load settings from the DB, falling back to defaults.
    pub fn load(conn: &mut SqliteConnection) -> Self {
        use crate::schema::server_settings::dsl::*;

        let row = server_settings
            .first::<ServerSettingsRow>(conn)
            .optional()
            .unwrap_or(None);

        match row {
            Some(r) => Self {
                strict_device_existence: r.strict_device_existence,
                dedup_commands: r.dedup_commands,
                default_ttl_seconds: r.default_ttl_seconds,
                sweep_interval_seconds: r.sweep_interval_seconds,
            },
            None => Self::default(),
        }
    }

    /// Persist settings (insert the singleton row or update it in place).
    pub fn save(&self, conn: &mut SqliteConnection) -> QueryResult<()> {
        use crate::schema::server_settings::dsl::*;

        let existing = server_settings.first::<ServerSettingsRow>(conn).optional()?;

        if let Some(row) = existing {
            diesel::update(server_settings.filter(id.eq(row.id)))
                .set((
                    strict_device_existence.eq(self.strict_device_existence),
                    dedup_commands.eq(self.dedup_commands),
                    default_ttl_seconds.eq(self.default_ttl_seconds),
                    sweep_interval_seconds.eq(self.sweep_interval_seconds),
                ))
                .execute(conn)?;
        } else {
            diesel::insert_into(server_settings)
                .values((
                    strict_device_existence.eq(self.strict_device_existence),
                    dedup_commands.eq(self.dedup_commands),
                    default_ttl_seconds.eq(self.default_ttl_seconds),
                    sweep_interval_seconds.eq(self.sweep_interval_seconds),
                ))
                .execute(conn)?;
        }

        Ok(())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            strict_device_existence: false,
            dedup_commands: false,
            default_ttl_seconds: 3600,
            sweep_interval_seconds: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel_migrations::MigrationHarness;

    fn test_conn() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").expect("in-memory db");
        conn.run_pending_migrations(crate::MIGRATIONS).expect("migrations");
        conn
    }

    #[test]
    fn load_on_empty_db_yields_defaults() {
        let mut conn = test_conn();
        let settings = ServerSettings::load(&mut conn);
        assert!(!settings.strict_device_existence);
        assert!(!settings.dedup_commands);
        assert_eq!(settings.default_ttl_seconds, 3600);
        assert_eq!(settings.sweep_interval_seconds, 60);
    }

    #[test]
    fn save_then_load_roundtrips() {
        let mut conn = test_conn();
        let settings = ServerSettings {
            strict_device_existence: true,
            dedup_commands: true,
            default_ttl_seconds: 4000,
            sweep_interval_seconds: 30,
        };
        settings.save(&mut conn).expect("save");

        let loaded = ServerSettings::load(&mut conn);
        assert!(loaded.strict_device_existence);
        assert!(loaded.dedup_commands);
        assert_eq!(loaded.default_ttl_seconds, 4000);
        assert_eq!(loaded.sweep_interval_seconds, 30);
    }

    #[test]
    fn save_updates_the_singleton_row() {
        let mut conn = test_conn();
        ServerSettings::default().save(&mut conn).expect("save defaults");

        let mut settings = ServerSettings::load(&mut conn);
        settings.dedup_commands = true;
        settings.save(&mut conn).expect("save update");

        use crate::schema::server_settings::dsl::*;
        let rows: i64 = server_settings.count().get_result(&mut conn).expect("count");
        assert_eq!(rows, 1);
        assert!(ServerSettings::load(&mut conn).dedup_commands);
    }
}
