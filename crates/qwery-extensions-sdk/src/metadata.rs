//! Result-set and metadata shapes produced by drivers.
//!
//! [`build_metadata_from_information_schema`] is the shared assembly helper
//! for SQL-backed drivers: they run one `information_schema.columns`-style
//! query (plus optional key queries) and hand the flat rows here instead of
//! duplicating the grouping logic per driver.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One column of a query result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetColumn {
    /// Column name as returned by the source.
    pub name: String,
    /// Name to show in result grids; usually equal to `name`.
    pub display_name: String,
    /// Source-native type identifier, stringified.
    pub original_type: String,
}

/// Execution statistics attached to a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSetStat {
    /// Rows affected by the statement.
    pub rows_affected: u64,
    /// Rows read while producing the result.
    pub rows_read: u64,
    /// Rows written by the statement.
    pub rows_written: u64,
    /// Wall-clock duration in milliseconds, when the driver measured it.
    #[serde(default)]
    pub query_duration_ms: Option<u64>,
}

/// The result of a driver `query` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasourceResultSet {
    /// Result columns, in select order.
    pub columns: Vec<ResultSetColumn>,
    /// Result rows as column-name → value maps.
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
    /// Execution statistics.
    pub stat: ResultSetStat,
}

/// One schema of the connected source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaInfo {
    /// Synthetic id, stable within one metadata snapshot.
    pub id: u32,
    /// Schema name.
    pub name: String,
    /// Owner role, when the source exposes one.
    pub owner: String,
}

/// A primary-key column of a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKeyColumn {
    /// Id of the owning table within the snapshot.
    pub table_id: u32,
    /// Column name.
    pub name: String,
    /// Schema of the owning table.
    pub schema: String,
    /// Name of the owning table.
    pub table_name: String,
}

/// A foreign-key relationship originating from a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    /// Synthetic id, stable within one metadata snapshot.
    pub id: u32,
    /// Constraint name as reported by the source.
    pub constraint_name: String,
    /// Referencing schema.
    pub source_schema: String,
    /// Referencing table.
    pub source_table_name: String,
    /// Referencing column.
    pub source_column_name: String,
    /// Referenced schema.
    pub target_table_schema: String,
    /// Referenced table.
    pub target_table_name: String,
    /// Referenced column.
    pub target_column_name: String,
}

/// One table of the connected source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableInfo {
    /// Synthetic id, stable within one metadata snapshot.
    pub id: u32,
    /// Schema the table belongs to.
    pub schema: String,
    /// Table name.
    pub name: String,
    /// On-disk size in bytes, when known.
    pub bytes: u64,
    /// Human-readable size, when known.
    pub size: String,
    /// Estimated live row count.
    pub live_rows_estimate: u64,
    /// Estimated dead row count.
    pub dead_rows_estimate: u64,
    /// Table comment, when the source carries one.
    pub comment: Option<String>,
    /// Primary-key columns.
    pub primary_keys: Vec<PrimaryKeyColumn>,
    /// Outgoing foreign-key relationships.
    pub relationships: Vec<Relationship>,
}

/// One column of the connected source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// `schema.table.column`, unique within the snapshot.
    pub id: String,
    /// Id of the owning table within the snapshot.
    pub table_id: u32,
    /// Schema of the owning table.
    pub schema: String,
    /// Name of the owning table.
    pub table: String,
    /// Column name.
    pub name: String,
    /// 1-based position within the table.
    pub ordinal_position: u32,
    /// Source-native data type.
    pub data_type: String,
    /// Display format; defaults to the data type.
    pub format: String,
    /// Whether the column admits NULL.
    pub is_nullable: bool,
    /// Whether the column accepts updates.
    pub is_updatable: bool,
    /// Whether a unique constraint covers the column alone.
    pub is_unique: bool,
    /// Default expression, when the source reports one.
    pub default_value: Option<String>,
    /// Column comment, when the source carries one.
    pub comment: Option<String>,
}

/// Structural description of a connected source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasourceMetadata {
    /// Metadata format version.
    pub version: String,
    /// Id of the driver that produced the snapshot.
    pub driver: String,
    /// Schemas, in first-appearance order.
    pub schemas: Vec<SchemaInfo>,
    /// Tables, in first-appearance order.
    pub tables: Vec<TableInfo>,
    /// Columns across all tables, grouped by table.
    pub columns: Vec<ColumnInfo>,
}

/// Metadata format version emitted by [`build_metadata_from_information_schema`].
pub const METADATA_VERSION: &str = "0.0.1";

/// A flat `information_schema.columns`-style row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InformationSchemaRow {
    /// Schema name.
    pub table_schema: String,
    /// Table name.
    pub table_name: String,
    /// Column name.
    pub column_name: String,
    /// Source-native data type.
    pub data_type: String,
    /// 1-based position within the table.
    pub ordinal_position: u32,
    /// `"YES"` or `"NO"`, as `information_schema` reports it.
    pub is_nullable: String,
}

/// A primary-key column row from the source's key introspection query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryKeyRow {
    /// Schema name.
    pub table_schema: String,
    /// Table name.
    pub table_name: String,
    /// Column name.
    pub column_name: String,
}

/// A foreign-key row from the source's constraint introspection query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForeignKeyRow {
    /// Constraint name.
    pub constraint_name: String,
    /// Referencing schema.
    pub source_schema: String,
    /// Referencing table.
    pub source_table_name: String,
    /// Referencing column.
    pub source_column_name: String,
    /// Referenced schema.
    pub target_table_schema: String,
    /// Referenced table.
    pub target_table_name: String,
    /// Referenced column.
    pub target_column_name: String,
}

struct TableAccum {
    id: u32,
    schema: String,
    name: String,
    columns: Vec<ColumnInfo>,
}

/// Build a [`DatasourceMetadata`] snapshot from flat column rows.
///
/// Rows are grouped into tables by `(schema, table)` in first-appearance
/// order; schemas are derived from the tables the same way. `primary_keys`
/// and `foreign_keys` are matched to their tables by schema and table name;
/// pass empty slices when the driver does not introspect keys.
#[must_use]
pub fn build_metadata_from_information_schema(
    driver: &str,
    rows: &[InformationSchemaRow],
    primary_keys: &[PrimaryKeyRow],
    foreign_keys: &[ForeignKeyRow],
) -> DatasourceMetadata {
    let mut table_index: HashMap<(String, String), usize> = HashMap::new();
    let mut accum: Vec<TableAccum> = Vec::new();
    let mut next_table_id: u32 = 1;

    for row in rows {
        let key = (row.table_schema.clone(), row.table_name.clone());
        let idx = match table_index.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = accum.len();
                table_index.insert(key, idx);
                accum.push(TableAccum {
                    id: next_table_id,
                    schema: row.table_schema.clone(),
                    name: row.table_name.clone(),
                    columns: Vec::new(),
                });
                next_table_id = next_table_id.saturating_add(1);
                idx
            },
        };

        let table = &mut accum[idx];
        table.columns.push(ColumnInfo {
            id: format!(
                "{}.{}.{}",
                row.table_schema, row.table_name, row.column_name
            ),
            table_id: table.id,
            schema: row.table_schema.clone(),
            table: row.table_name.clone(),
            name: row.column_name.clone(),
            ordinal_position: row.ordinal_position,
            data_type: row.data_type.clone(),
            format: row.data_type.clone(),
            is_nullable: row.is_nullable == "YES",
            is_updatable: true,
            is_unique: false,
            default_value: None,
            comment: None,
        });
    }

    let mut next_relationship_id: u32 = 1;
    let mut tables = Vec::with_capacity(accum.len());
    let mut columns = Vec::new();
    for table in &accum {
        let table_primary_keys = primary_keys
            .iter()
            .filter(|pk| pk.table_schema == table.schema && pk.table_name == table.name)
            .map(|pk| PrimaryKeyColumn {
                table_id: table.id,
                name: pk.column_name.clone(),
                schema: table.schema.clone(),
                table_name: table.name.clone(),
            })
            .collect();

        let mut relationships = Vec::new();
        for fk in foreign_keys
            .iter()
            .filter(|fk| fk.source_schema == table.schema && fk.source_table_name == table.name)
        {
            relationships.push(Relationship {
                id: next_relationship_id,
                constraint_name: fk.constraint_name.clone(),
                source_schema: fk.source_schema.clone(),
                source_table_name: fk.source_table_name.clone(),
                source_column_name: fk.source_column_name.clone(),
                target_table_schema: fk.target_table_schema.clone(),
                target_table_name: fk.target_table_name.clone(),
                target_column_name: fk.target_column_name.clone(),
            });
            next_relationship_id = next_relationship_id.saturating_add(1);
        }

        tables.push(TableInfo {
            id: table.id,
            schema: table.schema.clone(),
            name: table.name.clone(),
            bytes: 0,
            size: "0".to_string(),
            live_rows_estimate: 0,
            dead_rows_estimate: 0,
            comment: None,
            primary_keys: table_primary_keys,
            relationships,
        });
        columns.extend(table.columns.iter().cloned());
    }

    let mut schemas: Vec<SchemaInfo> = Vec::new();
    let mut next_schema_id: u32 = 1;
    for table in &accum {
        if !schemas.iter().any(|s| s.name == table.schema) {
            schemas.push(SchemaInfo {
                id: next_schema_id,
                name: table.schema.clone(),
                owner: "unknown".to_string(),
            });
            next_schema_id = next_schema_id.saturating_add(1);
        }
    }

    DatasourceMetadata {
        version: METADATA_VERSION.to_string(),
        driver: driver.to_string(),
        schemas,
        tables,
        columns,
    }
}
