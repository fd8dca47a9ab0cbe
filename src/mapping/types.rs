use std::collections::HashMap;

use super::MappingType;
use crate::{
    error::{ScaffoldError, ScaffoldResult},
    schema::Column,
};

/// Resolves catalog types to mapping types. Overrides win over the built-in
/// rules; anything neither knows is an error rather than a guess.
#[derive(Debug, Clone, Default)]
pub struct TypeMap {
    overrides: HashMap<String, MappingType>,
}

impl TypeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, db_type: &str, mapping_type: MappingType) -> Self {
        self.overrides
            .insert(db_type.trim().to_ascii_lowercase(), mapping_type);
        self
    }

    /// Parses a `dbtype=mappingtype` pair as given on the command line.
    pub fn parse_override(pair: &str) -> ScaffoldResult<(String, MappingType)> {
        let (db_type, mapping_type) = pair.split_once('=').ok_or_else(|| {
            ScaffoldError::UnknownMappingType(format!("{pair} (expected dbtype=mappingtype)"))
        })?;
        let db_type = db_type.trim().to_ascii_lowercase();
        if db_type.is_empty() {
            return Err(ScaffoldError::UnknownMappingType(format!(
                "{pair} (database type is empty)"
            )));
        }
        Ok((db_type, mapping_type.parse()?))
    }

    pub fn resolve(&self, table: &str, column: &Column) -> ScaffoldResult<MappingType> {
        let data_type = column.data_type.trim().to_ascii_lowercase();
        if let Some(mapping_type) = self.overrides.get(&data_type) {
            return Ok(*mapping_type);
        }
        builtin(&data_type).ok_or_else(|| ScaffoldError::UnknownColumnType {
            table: table.to_string(),
            column: column.name.clone(),
            data_type: column.data_type.clone(),
        })
    }
}

fn builtin(data_type: &str) -> Option<MappingType> {
    let exact = match data_type {
        "bigint" | "int8" | "bigserial" | "serial8" => MappingType::Bigint,
        "smallint" | "int2" | "tinyint" | "smallserial" | "serial2" => MappingType::Smallint,
        "integer" | "int" | "int4" | "mediumint" | "serial" | "serial4" => MappingType::Integer,
        "boolean" | "bool" => MappingType::Boolean,
        "varchar" | "character varying" | "char" | "character" | "nvarchar" | "nchar"
        | "varchar2" | "bpchar" | "citext" => MappingType::String,
        "text" | "tinytext" | "mediumtext" | "longtext" | "clob" => MappingType::Text,
        "decimal" | "numeric" | "dec" | "money" => MappingType::Decimal,
        "real" | "float" | "double" | "double precision" | "float4" | "float8" => {
            MappingType::Float
        }
        "date" => MappingType::Date,
        "time" | "time without time zone" | "time with time zone" | "timetz" => MappingType::Time,
        "datetime" | "timestamp" | "timestamp without time zone" => MappingType::Datetime,
        "timestamptz" | "timestamp with time zone" => MappingType::Datetimetz,
        "uuid" | "guid" | "uniqueidentifier" => MappingType::Guid,
        "json" | "jsonb" => MappingType::Json,
        "binary" | "varbinary" => MappingType::Binary,
        // SQLite columns declared without a type have BLOB affinity.
        "" | "blob" | "bytea" | "tinyblob" | "mediumblob" | "longblob" => MappingType::Blob,
        _ => return affinity(data_type),
    };
    Some(exact)
}

/// SQLite-style affinity rules for declarations the table above misses,
/// e.g. `unsigned big int` or `varying character`.
fn affinity(data_type: &str) -> Option<MappingType> {
    if data_type.contains("int") {
        Some(MappingType::Integer)
    } else if data_type.contains("char") {
        Some(MappingType::String)
    } else if data_type.contains("clob") || data_type.contains("text") {
        Some(MappingType::Text)
    } else if data_type.contains("real") || data_type.contains("floa") || data_type.contains("doub")
    {
        Some(MappingType::Float)
    } else {
        None
    }
}
