use rusqlite::{params, Row};
use tracing::debug;

use crate::database::DatabasePool;
use crate::models::PatientRecord;
use super::errors::RepositoryError;

const SELECT_COLUMNS: &str = "SELECT id, full_name, age, gender, weight, height, glucose, triglycerides, hdl,
            hba1c, diabetes, bmi, tyg_index, tg_hdl_ratio, risk_level, risk_description,
            ai_recommendations, created_at, created_by
     FROM patient_records";

/// SQLite storage operations for patient records
pub struct DatabaseStorage;

impl DatabaseStorage {
    /// Store a record in the database
    pub async fn insert(pool: &DatabasePool, record: &PatientRecord) -> Result<(), RepositoryError> {
        debug!("Storing patient record in database: id={}", record.id);

        let conn = pool.get()?;
        conn.execute(
            "INSERT INTO patient_records
             (id, full_name, age, gender, weight, height, glucose, triglycerides, hdl,
              hba1c, diabetes, bmi, tyg_index, tg_hdl_ratio, risk_level, risk_description,
              ai_recommendations, created_at, created_by)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
            params![
                record.id,
                record.full_name,
                record.age,
                record.gender,
                record.weight,
                record.height,
                record.glucose,
                record.triglycerides,
                record.hdl,
                record.hba1c,
                record.diabetes,
                record.bmi,
                record.tyg_index,
                record.tg_hdl_ratio,
                record.risk_level,
                record.risk_description,
                record.ai_recommendations,
                record.created_at,
                record.created_by,
            ],
        )?;

        Ok(())
    }

    /// Get all records, newest first
    pub async fn list(pool: &DatabasePool) -> Result<Vec<PatientRecord>, RepositoryError> {
        debug!("Getting all patient records from database");

        let conn = pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY created_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))?;
        let rows = stmt.query_map([], map_row)?;

        let mut result = Vec::new();
        for record in rows {
            result.push(record?);
        }
        Ok(result)
    }

    /// One page of records, newest first, plus the total count
    pub async fn list_paginated(
        pool: &DatabasePool,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<PatientRecord>, usize), RepositoryError> {
        debug!("Getting patient records page: limit={}, offset={}", limit, offset);

        let conn = pool.get()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM patient_records", [], |row| row.get(0))?;

        let mut stmt = conn.prepare(&format!(
            "{} ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2",
            SELECT_COLUMNS
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit, offset], map_row)?;

        let mut page = Vec::new();
        for record in rows {
            page.push(record?);
        }
        Ok((page, total as usize))
    }

    /// Get a record by ID
    pub async fn get_by_id(pool: &DatabasePool, id: &str) -> Result<Option<PatientRecord>, RepositoryError> {
        debug!("Getting patient record by ID from database: id={}", id);

        let conn = pool.get()?;
        let mut stmt = conn.prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))?;

        match stmt.query_row([id], map_row) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(RepositoryError::Sqlite(e)),
        }
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<PatientRecord> {
    Ok(PatientRecord {
        id: row.get(0)?,
        full_name: row.get(1)?,
        age: row.get(2)?,
        gender: row.get(3)?,
        weight: row.get(4)?,
        height: row.get(5)?,
        glucose: row.get(6)?,
        triglycerides: row.get(7)?,
        hdl: row.get(8)?,
        hba1c: row.get(9)?,
        diabetes: row.get(10)?,
        bmi: row.get(11)?,
        tyg_index: row.get(12)?,
        tg_hdl_ratio: row.get(13)?,
        risk_level: row.get(14)?,
        risk_description: row.get(15)?,
        ai_recommendations: row.get(16)?,
        created_at: row.get(17)?,
        created_by: row.get(18)?,
    })
}
