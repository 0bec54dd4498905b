use rusqlite::Connection;
use tracing::info;

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), String> {
    info!("Running SQLite migrations");

    create_patient_records_table(conn)?;
    create_patient_records_index(conn)?;

    info!("SQLite migrations completed successfully");
    Ok(())
}

/// Create the patient records table
fn create_patient_records_table(conn: &Connection) -> Result<(), String> {
    info!("Creating patient_records table if not exists");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS patient_records (
            id TEXT PRIMARY KEY,
            full_name TEXT NOT NULL,
            age INTEGER NOT NULL,
            gender TEXT NOT NULL,
            weight REAL NOT NULL,
            height REAL NOT NULL,
            glucose REAL NOT NULL,
            triglycerides REAL NOT NULL,
            hdl REAL NOT NULL,
            hba1c REAL NOT NULL,
            diabetes TEXT NOT NULL,
            bmi REAL NOT NULL,
            tyg_index REAL NOT NULL,
            tg_hdl_ratio REAL NOT NULL,
            risk_level TEXT NOT NULL,
            risk_description TEXT NOT NULL,
            ai_recommendations TEXT,
            created_at TEXT NOT NULL,
            created_by TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| e.to_string())?;

    Ok(())
}

/// Records are always listed newest first
fn create_patient_records_index(conn: &Connection) -> Result<(), String> {
    info!("Creating index on created_at");

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_patient_records_created_at
        ON patient_records (created_at DESC)",
        [],
    )
    .map_err(|e| format!("Failed to create index: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM patient_records", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
