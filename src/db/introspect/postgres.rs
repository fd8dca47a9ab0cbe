use std::collections::BTreeMap;

use sea_orm::{DatabaseConnection, FromQueryResult, Value};
use tracing::debug;

use super::fetch_all;
use crate::{
    error::ScaffoldResult,
    schema::{Backend, Column, ForeignKey, Index, ReferentialAction, Schema, Table},
};

const TABLES_SQL: &str = r#"
SELECT table_name::text AS name
FROM information_schema.tables
WHERE table_schema = $1 AND table_type = 'BASE TABLE'
ORDER BY table_name
"#;

const COLUMNS_SQL: &str = r#"
SELECT
    column_name::text AS name,
    data_type::text AS data_type,
    udt_name::text AS udt_name,
    character_maximum_length::int4 AS length,
    numeric_precision::int4 AS numeric_precision,
    numeric_scale::int4 AS numeric_scale,
    is_nullable::text AS is_nullable,
    column_default::text AS default_value,
    is_identity::text AS is_identity
FROM information_schema.columns
WHERE table_schema = $1 AND table_name = $2
ORDER BY ordinal_position
"#;

const PRIMARY_KEY_SQL: &str = r#"
SELECT kcu.column_name::text AS column_name
FROM information_schema.table_constraints tc
JOIN information_schema.key_column_usage kcu
    ON kcu.constraint_schema = tc.constraint_schema
    AND kcu.constraint_name = tc.constraint_name
    AND kcu.table_name = tc.table_name
WHERE tc.constraint_type = 'PRIMARY KEY'
    AND tc.table_schema = $1
    AND tc.table_name = $2
ORDER BY kcu.ordinal_position
"#;

// Constraint names are only unique per table, so foreign keys are read
// from pg_constraint keyed by the owning relation.
const FOREIGN_KEYS_SQL: &str = r#"
SELECT
    con.conname::text AS constraint_name,
    att.attname::text AS column_name,
    ref_tbl.relname::text AS ref_table,
    ref_att.attname::text AS ref_column,
    (CASE con.confupdtype
        WHEN 'r' THEN 'RESTRICT'
        WHEN 'c' THEN 'CASCADE'
        WHEN 'n' THEN 'SET NULL'
        WHEN 'd' THEN 'SET DEFAULT'
        ELSE 'NO ACTION'
    END)::text AS update_rule,
    (CASE con.confdeltype
        WHEN 'r' THEN 'RESTRICT'
        WHEN 'c' THEN 'CASCADE'
        WHEN 'n' THEN 'SET NULL'
        WHEN 'd' THEN 'SET DEFAULT'
        ELSE 'NO ACTION'
    END)::text AS delete_rule
FROM pg_catalog.pg_constraint con
JOIN pg_catalog.pg_class tbl ON tbl.oid = con.conrelid
JOIN pg_catalog.pg_namespace n ON n.oid = tbl.relnamespace
JOIN pg_catalog.pg_class ref_tbl ON ref_tbl.oid = con.confrelid
JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, ref_attnum, position) ON true
JOIN pg_catalog.pg_attribute att ON att.attrelid = con.conrelid AND att.attnum = k.attnum
JOIN pg_catalog.pg_attribute ref_att ON ref_att.attrelid = con.confrelid AND ref_att.attnum = k.ref_attnum
WHERE con.contype = 'f' AND n.nspname = $1 AND tbl.relname = $2
ORDER BY con.conname, k.position
"#;

const INDEXES_SQL: &str = r#"
SELECT
    i.relname::text AS index_name,
    ix.indisunique AS is_unique,
    a.attname::text AS column_name
FROM pg_catalog.pg_index ix
JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, position) ON true
JOIN pg_catalog.pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
WHERE n.nspname = $1 AND t.relname = $2 AND NOT ix.indisprimary
ORDER BY i.relname, k.position
"#;

#[derive(Debug, Clone, FromQueryResult)]
struct TableNameRow {
    name: String,
}

#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct PgColumnRow {
    pub name: String,
    pub data_type: String,
    pub udt_name: String,
    pub length: Option<i32>,
    pub numeric_precision: Option<i32>,
    pub numeric_scale: Option<i32>,
    pub is_nullable: String,
    pub default_value: Option<String>,
    pub is_identity: String,
}

#[derive(Debug, Clone, FromQueryResult)]
struct PrimaryKeyRow {
    column_name: String,
}

#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct PgForeignKeyRow {
    pub constraint_name: String,
    pub column_name: String,
    pub ref_table: String,
    pub ref_column: String,
    pub update_rule: String,
    pub delete_rule: String,
}

#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct PgIndexRow {
    pub index_name: String,
    pub is_unique: bool,
    pub column_name: String,
}

pub async fn introspect(db: &DatabaseConnection, schema_name: &str) -> ScaffoldResult<Schema> {
    let mut schema = Schema::new(Backend::Postgres);
    let tables: Vec<TableNameRow> =
        fetch_all(db, TABLES_SQL, vec![schema_name.into()]).await?;

    for TableNameRow { name } in tables {
        let params = || -> Vec<Value> { vec![schema_name.into(), name.clone().into()] };
        let columns: Vec<PgColumnRow> = fetch_all(db, COLUMNS_SQL, params()).await?;
        let primary_key: Vec<PrimaryKeyRow> = fetch_all(db, PRIMARY_KEY_SQL, params()).await?;
        let foreign_keys: Vec<PgForeignKeyRow> =
            fetch_all(db, FOREIGN_KEYS_SQL, params()).await?;
        let indexes: Vec<PgIndexRow> = fetch_all(db, INDEXES_SQL, params()).await?;

        debug!(schema = schema_name, table = %name, columns = columns.len(), "introspected table");
        schema.tables.push(Table {
            columns: columns.into_iter().map(build_column).collect(),
            primary_key: primary_key.into_iter().map(|row| row.column_name).collect(),
            foreign_keys: group_foreign_keys(foreign_keys),
            indexes: group_indexes(indexes),
            name,
        });
    }

    Ok(schema)
}

pub(crate) fn build_column(row: PgColumnRow) -> Column {
    let data_type = match row.data_type.as_str() {
        "USER-DEFINED" | "ARRAY" => row.udt_name.to_ascii_lowercase(),
        other => other.to_ascii_lowercase(),
    };
    let is_fixed_point = matches!(data_type.as_str(), "numeric" | "decimal");
    let auto_increment = row.is_identity.eq_ignore_ascii_case("yes")
        || row
            .default_value
            .as_deref()
            .is_some_and(|default| default.starts_with("nextval("));

    Column {
        name: row.name,
        length: row.length.and_then(|len| u32::try_from(len).ok()),
        precision: if is_fixed_point {
            row.numeric_precision.and_then(|p| u32::try_from(p).ok())
        } else {
            None
        },
        scale: if is_fixed_point {
            row.numeric_scale.and_then(|s| u32::try_from(s).ok())
        } else {
            None
        },
        data_type,
        unsigned: false,
        nullable: row.is_nullable.eq_ignore_ascii_case("yes"),
        default: row.default_value,
        auto_increment,
    }
}

pub(crate) fn group_foreign_keys(rows: Vec<PgForeignKeyRow>) -> Vec<ForeignKey> {
    let mut grouped: BTreeMap<String, Vec<PgForeignKeyRow>> = BTreeMap::new();
    for row in rows {
        let group = grouped.entry(row.constraint_name.clone()).or_default();
        // A column takes part in a constraint at most once.
        if group.iter().all(|seen| seen.column_name != row.column_name) {
            group.push(row);
        }
    }

    grouped
        .into_iter()
        .filter_map(|(name, rows)| {
            let first = rows.first()?.clone();
            Some(ForeignKey {
                name: Some(name),
                columns: rows.iter().map(|row| row.column_name.clone()).collect(),
                referenced_table: first.ref_table,
                referenced_columns: rows.iter().map(|row| row.ref_column.clone()).collect(),
                on_delete: ReferentialAction::parse(&first.delete_rule),
                on_update: ReferentialAction::parse(&first.update_rule),
            })
        })
        .collect()
}

pub(crate) fn group_indexes(rows: Vec<PgIndexRow>) -> Vec<Index> {
    let mut out: Vec<Index> = Vec::new();
    for row in rows {
        if let Some(index) = out.last_mut().filter(|index| index.name == row.index_name) {
            index.columns.push(row.column_name);
            continue;
        }
        out.push(Index {
            name: row.index_name,
            columns: vec![row.column_name],
            unique: row.is_unique,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{
        FOREIGN_KEYS_SQL, PgColumnRow, PgForeignKeyRow, PgIndexRow, build_column,
        group_foreign_keys, group_indexes,
    };
    use crate::schema::ReferentialAction;

    fn column_row(name: &str, data_type: &str) -> PgColumnRow {
        PgColumnRow {
            name: name.to_string(),
            data_type: data_type.to_string(),
            udt_name: data_type.to_string(),
            length: None,
            numeric_precision: None,
            numeric_scale: None,
            is_nullable: "NO".to_string(),
            default_value: None,
            is_identity: "NO".to_string(),
        }
    }

    #[test]
    fn serial_default_marks_auto_increment() {
        let column = build_column(PgColumnRow {
            default_value: Some("nextval('blog_post_id_seq'::regclass)".to_string()),
            ..column_row("id", "bigint")
        });
        assert!(column.auto_increment);
        assert!(!column.nullable);
        assert_eq!(column.data_type, "bigint");
    }

    #[test]
    fn identity_column_marks_auto_increment() {
        let column = build_column(PgColumnRow {
            is_identity: "YES".to_string(),
            ..column_row("id", "integer")
        });
        assert!(column.auto_increment);
    }

    #[test]
    fn precision_only_kept_for_fixed_point() {
        let price = build_column(PgColumnRow {
            numeric_precision: Some(10),
            numeric_scale: Some(2),
            ..column_row("price", "numeric")
        });
        assert_eq!(price.precision, Some(10));
        assert_eq!(price.scale, Some(2));

        let count = build_column(PgColumnRow {
            numeric_precision: Some(32),
            numeric_scale: Some(0),
            ..column_row("count", "integer")
        });
        assert_eq!(count.precision, None);
    }

    #[test]
    fn user_defined_types_use_udt_name() {
        let column = build_column(PgColumnRow {
            udt_name: "citext".to_string(),
            is_nullable: "YES".to_string(),
            ..column_row("email", "USER-DEFINED")
        });
        assert_eq!(column.data_type, "citext");
        assert!(column.nullable);
    }

    #[test]
    fn varchar_length_is_kept() {
        let column = build_column(PgColumnRow {
            length: Some(20),
            ..column_row("author", "character varying")
        });
        assert_eq!(column.length, Some(20));
    }

    #[test]
    fn groups_foreign_keys_by_constraint() {
        let row = |constraint: &str, column: &str, table: &str, ref_column: &str| PgForeignKeyRow {
            constraint_name: constraint.to_string(),
            column_name: column.to_string(),
            ref_table: table.to_string(),
            ref_column: ref_column.to_string(),
            update_rule: "NO ACTION".to_string(),
            delete_rule: "SET NULL".to_string(),
        };
        let fks = group_foreign_keys(vec![
            row("blog_post_id", "post_id", "blog_post", "id"),
            row("line_fk", "order_id", "order_line", "order_id"),
            row("line_fk", "line_no", "order_line", "line_no"),
        ]);

        assert_eq!(fks.len(), 2);
        assert_eq!(fks[0].name.as_deref(), Some("blog_post_id"));
        assert_eq!(fks[0].on_delete, ReferentialAction::SetNull);
        assert_eq!(fks[1].columns.len(), 2);
        assert_eq!(fks[1].referenced_columns[1], "line_no");
    }

    #[test]
    fn shared_constraint_names_stay_single_column() {
        assert!(FOREIGN_KEYS_SQL.contains("FROM pg_catalog.pg_constraint con"));
        assert!(FOREIGN_KEYS_SQL.contains("tbl.oid = con.conrelid"));
        assert!(!FOREIGN_KEYS_SQL.contains("referential_constraints"));

        let row = |ref_table: &str| PgForeignKeyRow {
            constraint_name: "fk_post".to_string(),
            column_name: "post_id".to_string(),
            ref_table: ref_table.to_string(),
            ref_column: "id".to_string(),
            update_rule: "NO ACTION".to_string(),
            delete_rule: "CASCADE".to_string(),
        };
        let fks = group_foreign_keys(vec![row("blog_post"), row("blog_post")]);
        assert_eq!(fks.len(), 1);
        assert_eq!(fks[0].columns, ["post_id"]);
        assert_eq!(fks[0].referenced_columns, ["id"]);
        assert_eq!(fks[0].on_delete, ReferentialAction::Cascade);
    }

    #[test]
    fn groups_index_columns_in_order() {
        let indexes = group_indexes(vec![
            PgIndexRow {
                index_name: "idx_a".to_string(),
                is_unique: false,
                column_name: "x".to_string(),
            },
            PgIndexRow {
                index_name: "idx_a".to_string(),
                is_unique: false,
                column_name: "y".to_string(),
            },
            PgIndexRow {
                index_name: "uniq_b".to_string(),
                is_unique: true,
                column_name: "z".to_string(),
            },
        ]);

        assert_eq!(indexes.len(), 2);
        assert_eq!(indexes[0].columns, vec!["x".to_string(), "y".to_string()]);
        assert!(indexes[1].unique);
    }
}
