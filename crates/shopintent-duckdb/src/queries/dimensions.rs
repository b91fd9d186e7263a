use anyhow::Result;
use duckdb::Connection;

use shopintent_core::dimension::{Dimension, DimensionRegistries, DimensionRegistry};

use crate::DuckDbBackend;

/// Read all four `dim_*` tables.
///
/// Rows whose id does not fit a dimension code are skipped with a warning.
pub fn load_dimensions_inner(conn: &Connection) -> Result<DimensionRegistries> {
    let mut registries = DimensionRegistries::default();

    for dimension in Dimension::ALL {
        // Table names come from a closed enum, never from input.
        let sql = format!("SELECT id, name FROM {} ORDER BY id", dimension.table_name());
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;

        let registry: &mut DimensionRegistry = registries.get_mut(dimension);
        for row in rows {
            let (id, name) = row?;
            match u16::try_from(id) {
                Ok(code) if code > 0 => {
                    registry.insert(code, name);
                }
                _ => tracing::warn!(dimension = %dimension, id, "Skipping dimension row with invalid id"),
            }
        }
    }

    Ok(registries)
}

/// Insert or rename one dimension entry. Returns the previous name.
pub async fn upsert_dimension_inner(
    db: &DuckDbBackend,
    dimension: Dimension,
    code: u16,
    name: &str,
) -> Result<Option<String>> {
    let mut conn = db.conn.lock().await;
    let tx = conn.transaction()?;

    let table = dimension.table_name();
    let previous: Option<String> = match tx.query_row(
        &format!("SELECT name FROM {table} WHERE id = ?1"),
        duckdb::params![code],
        |row| row.get(0),
    ) {
        Ok(name) => Some(name),
        Err(duckdb::Error::QueryReturnedNoRows) => None,
        Err(e) => return Err(e.into()),
    };
    tx.execute(
        &format!(
            "INSERT INTO {table} (id, name) VALUES (?1, ?2) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name"
        ),
        duckdb::params![code, name],
    )?;
    tx.commit()?;
    drop(conn);

    db.bump_generation();
    tracing::info!(dimension = %dimension, code, entry_name = name, "Dimension entry saved");
    Ok(previous)
}

impl DuckDbBackend {
    pub async fn load_dimensions(&self) -> Result<DimensionRegistries> {
        let conn = self.conn.lock().await;
        load_dimensions_inner(&conn)
    }

    pub async fn upsert_dimension(
        &self,
        dimension: Dimension,
        code: u16,
        name: &str,
    ) -> Result<Option<String>> {
        upsert_dimension_inner(self, dimension, code, name).await
    }
}
