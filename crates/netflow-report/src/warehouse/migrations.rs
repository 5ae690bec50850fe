use ::duckdb::{Connection, ToSql};

struct Migration {
    version: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: "0001_report_tables",
    sql: r#"
CREATE TABLE IF NOT EXISTS report_sheets (
    sheet_id BIGINT PRIMARY KEY,
    title TEXT NOT NULL UNIQUE,
    row_count BIGINT NOT NULL,
    column_count BIGINT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS report_cells (
    sheet_id BIGINT NOT NULL,
    row_index BIGINT NOT NULL,
    column_index BIGINT NOT NULL,
    text_value TEXT,
    number_value DOUBLE
);

CREATE SEQUENCE IF NOT EXISTS report_format_seq START 1;

CREATE TABLE IF NOT EXISTS report_formats (
    format_seq BIGINT NOT NULL,
    sheet_id BIGINT NOT NULL,
    start_row BIGINT NOT NULL,
    end_row BIGINT NOT NULL,
    start_column BIGINT NOT NULL,
    end_column BIGINT NOT NULL,
    number_format TEXT NOT NULL
);
"#,
}];

pub fn apply_migrations(connection: &Connection) -> Result<(), ::duckdb::Error> {
    connection.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
);
"#,
    )?;

    for migration in MIGRATIONS {
        let params: [&dyn ToSql; 1] = [&migration.version];
        let applied_count: i64 = connection.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version = ?",
            params.as_slice(),
            |row| row.get(0),
        )?;

        if applied_count == 0 {
            connection.execute_batch(migration.sql)?;
            connection.execute(
                "INSERT INTO schema_migrations (version) VALUES (?)",
                params.as_slice(),
            )?;
            tracing::debug!(version = migration.version, "applied warehouse migration");
        }
    }

    Ok(())
}
