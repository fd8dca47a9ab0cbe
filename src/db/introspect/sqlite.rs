use std::collections::BTreeMap;

use sea_orm::{DatabaseConnection, FromQueryResult};
use tracing::debug;

use super::{fetch_all, resolve_implicit_references};
use crate::{
    error::ScaffoldResult,
    schema::{Backend, Column, ForeignKey, Index, ReferentialAction, Schema, Table},
};

const TABLES_SQL: &str = "SELECT name, sql FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

const COLUMNS_SQL: &str = "SELECT cid, name, type AS declared_type, \"notnull\" AS not_null, \
     dflt_value AS default_value, pk FROM pragma_table_info(?) ORDER BY cid";

const FOREIGN_KEYS_SQL: &str = "SELECT id, seq, \"table\" AS ref_table, \"from\" AS from_column, \
     \"to\" AS to_column, on_update, on_delete FROM pragma_foreign_key_list(?) ORDER BY id, seq";

const INDEX_LIST_SQL: &str =
    "SELECT name, \"unique\" AS is_unique, origin FROM pragma_index_list(?) ORDER BY name";

const INDEX_INFO_SQL: &str =
    "SELECT seqno, name AS column_name FROM pragma_index_info(?) ORDER BY seqno";

#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct TableNameRow {
    pub name: String,
    /// Original `CREATE TABLE` text.
    pub sql: Option<String>,
}

#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct ColumnInfoRow {
    pub cid: i64,
    pub name: String,
    pub declared_type: String,
    pub not_null: i64,
    pub default_value: Option<String>,
    pub pk: i64,
}

#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct ForeignKeyRow {
    pub id: i64,
    pub seq: i64,
    pub ref_table: String,
    pub from_column: String,
    pub to_column: Option<String>,
    pub on_update: String,
    pub on_delete: String,
}

#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct IndexListRow {
    pub name: String,
    pub is_unique: i64,
    /// `c` for CREATE INDEX, `u` for UNIQUE constraints, `pk` for the primary key.
    pub origin: String,
}

#[derive(Debug, Clone, FromQueryResult)]
pub(crate) struct IndexInfoRow {
    pub seqno: i64,
    /// NULL for expression index terms.
    pub column_name: Option<String>,
}

pub async fn introspect(db: &DatabaseConnection) -> ScaffoldResult<Schema> {
    let mut schema = Schema::new(Backend::Sqlite);
    let tables: Vec<TableNameRow> = fetch_all(db, TABLES_SQL, Vec::new()).await?;

    for table in tables {
        let name = table.name.clone();
        let columns: Vec<ColumnInfoRow> =
            fetch_all(db, COLUMNS_SQL, vec![name.clone().into()]).await?;
        let foreign_keys: Vec<ForeignKeyRow> =
            fetch_all(db, FOREIGN_KEYS_SQL, vec![name.clone().into()]).await?;

        let index_list: Vec<IndexListRow> =
            fetch_all(db, INDEX_LIST_SQL, vec![name.clone().into()]).await?;
        let mut indexes = Vec::with_capacity(index_list.len());
        for index in index_list {
            if index.origin == "pk" {
                continue;
            }
            let info: Vec<IndexInfoRow> =
                fetch_all(db, INDEX_INFO_SQL, vec![index.name.clone().into()]).await?;
            indexes.push((index, info));
        }

        debug!(table = %name, columns = columns.len(), "introspected table");
        schema
            .tables
            .push(build_table(table, columns, foreign_keys, indexes));
    }

    resolve_implicit_references(&mut schema);
    Ok(schema)
}

pub(crate) fn build_table(
    table: TableNameRow,
    mut columns: Vec<ColumnInfoRow>,
    foreign_keys: Vec<ForeignKeyRow>,
    indexes: Vec<(IndexListRow, Vec<IndexInfoRow>)>,
) -> Table {
    columns.sort_by_key(|row| row.cid);

    let mut pk_columns: Vec<&ColumnInfoRow> = columns.iter().filter(|row| row.pk > 0).collect();
    pk_columns.sort_by_key(|row| row.pk);
    let primary_key: Vec<String> = pk_columns.iter().map(|row| row.name.clone()).collect();

    // A lone INTEGER primary key aliases the rowid and is assigned by SQLite.
    let has_rowid = !table.sql.as_deref().is_some_and(is_without_rowid);
    let rowid_alias = match pk_columns.as_slice() {
        [only] => has_rowid && only.declared_type.trim().eq_ignore_ascii_case("integer"),
        _ => false,
    };

    let columns = columns
        .iter()
        .map(|row| {
            let is_pk = row.pk > 0;
            let mut column = Column::new(row.name.clone(), &row.declared_type);
            column.nullable = row.not_null == 0 && !is_pk;
            column.default = row.default_value.clone();
            column.auto_increment = is_pk && rowid_alias;
            column
        })
        .collect();

    Table {
        name: table.name,
        columns,
        primary_key,
        indexes: build_indexes(indexes),
        foreign_keys: group_foreign_keys(foreign_keys),
    }
}

/// Whether the table options after the column list include `WITHOUT ROWID`.
pub(crate) fn is_without_rowid(create_sql: &str) -> bool {
    let Some((_, options)) = create_sql.rsplit_once(')') else {
        return false;
    };
    let words: Vec<String> = options
        .split(|ch: char| ch.is_whitespace() || ch == ',')
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_uppercase)
        .collect();
    words.windows(2).any(|pair| pair[0] == "WITHOUT" && pair[1] == "ROWID")
}

fn build_indexes(indexes: Vec<(IndexListRow, Vec<IndexInfoRow>)>) -> Vec<Index> {
    let mut out = Vec::with_capacity(indexes.len());
    for (index, mut info) in indexes {
        if index.origin == "pk" {
            continue;
        }
        info.sort_by_key(|row| row.seqno);
        let columns: Option<Vec<String>> =
            info.into_iter().map(|row| row.column_name).collect();
        match columns {
            Some(columns) if !columns.is_empty() => out.push(Index {
                name: index.name,
                columns,
                unique: index.is_unique != 0,
            }),
            _ => debug!(index = %index.name, "skipping expression index"),
        }
    }
    out
}

pub(crate) fn group_foreign_keys(rows: Vec<ForeignKeyRow>) -> Vec<ForeignKey> {
    let mut grouped: BTreeMap<i64, Vec<ForeignKeyRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.id).or_default().push(row);
    }

    grouped
        .into_values()
        .filter_map(|mut rows| {
            rows.sort_by_key(|row| row.seq);
            let first = rows.first()?.clone();
            let columns = rows.iter().map(|row| row.from_column.clone()).collect();
            // A missing target column anywhere means the whole key refers to
            // the parent's primary key.
            let referenced_columns = rows
                .iter()
                .map(|row| row.to_column.clone())
                .collect::<Option<Vec<String>>>()
                .unwrap_or_default();
            Some(ForeignKey {
                name: None,
                columns,
                referenced_table: first.ref_table,
                referenced_columns,
                on_delete: ReferentialAction::parse(&first.on_delete),
                on_update: ReferentialAction::parse(&first.on_update),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        ColumnInfoRow, ForeignKeyRow, IndexInfoRow, IndexListRow, TableNameRow, build_table,
        group_foreign_keys, is_without_rowid,
    };
    use crate::schema::ReferentialAction;

    fn column(cid: i64, name: &str, ty: &str, not_null: bool, pk: i64) -> ColumnInfoRow {
        ColumnInfoRow {
            cid,
            name: name.to_string(),
            declared_type: ty.to_string(),
            not_null: i64::from(not_null),
            default_value: None,
            pk,
        }
    }

    fn table(name: &str) -> TableNameRow {
        TableNameRow {
            name: name.to_string(),
            sql: None,
        }
    }

    fn fk_row(id: i64, seq: i64, table: &str, from: &str, to: Option<&str>) -> ForeignKeyRow {
        ForeignKeyRow {
            id,
            seq,
            ref_table: table.to_string(),
            from_column: from.to_string(),
            to_column: to.map(str::to_string),
            on_update: "NO ACTION".to_string(),
            on_delete: "CASCADE".to_string(),
        }
    }

    #[test]
    fn integer_primary_key_is_auto_increment() {
        let table = build_table(
            table("blog_post"),
            vec![
                column(1, "title", "VARCHAR(100)", true, 0),
                column(0, "id", "INTEGER", false, 1),
            ],
            Vec::new(),
            Vec::new(),
        );

        assert_eq!(table.primary_key, vec!["id".to_string()]);
        assert_eq!(table.columns[0].name, "id");
        assert!(table.columns[0].auto_increment);
        assert!(!table.columns[0].nullable);
        assert_eq!(table.columns[1].length, Some(100));
        assert!(!table.columns[1].auto_increment);
    }

    #[test]
    fn composite_primary_key_keeps_declared_order_and_no_auto_increment() {
        let table = build_table(
            table("post_tag"),
            vec![
                column(0, "tag_id", "INTEGER", true, 2),
                column(1, "post_id", "INTEGER", true, 1),
            ],
            Vec::new(),
            Vec::new(),
        );

        assert_eq!(
            table.primary_key,
            vec!["post_id".to_string(), "tag_id".to_string()]
        );
        assert!(table.columns.iter().all(|column| !column.auto_increment));
    }

    #[test]
    fn bigint_primary_key_is_not_a_rowid_alias() {
        let table = build_table(
            table("events"),
            vec![column(0, "id", "BIGINT", true, 1)],
            Vec::new(),
            Vec::new(),
        );
        assert!(!table.columns[0].auto_increment);
    }

    #[test]
    fn without_rowid_tables_have_no_generated_key() {
        let table = build_table(
            TableNameRow {
                name: "counter".to_string(),
                sql: Some(
                    "CREATE TABLE counter (id INTEGER PRIMARY KEY, hits INTEGER) without  rowid"
                        .to_string(),
                ),
            },
            vec![
                column(0, "id", "INTEGER", false, 1),
                column(1, "hits", "INTEGER", false, 0),
            ],
            Vec::new(),
            Vec::new(),
        );
        assert!(!table.columns[0].auto_increment);

        assert!(is_without_rowid("CREATE TABLE t (id INTEGER PRIMARY KEY) STRICT, WITHOUT ROWID"));
        assert!(!is_without_rowid("CREATE TABLE t (note TEXT DEFAULT 'without rowid')"));
        assert!(!is_without_rowid("CREATE TABLE t (id INTEGER PRIMARY KEY)"));
    }

    #[test]
    fn groups_composite_foreign_keys() {
        let fks = group_foreign_keys(vec![
            fk_row(0, 1, "orders", "order_line", Some("line")),
            fk_row(0, 0, "orders", "order_id", Some("id")),
            fk_row(1, 0, "customers", "customer_id", None),
        ]);

        assert_eq!(fks.len(), 2);
        assert_eq!(
            fks[0].columns,
            vec!["order_id".to_string(), "order_line".to_string()]
        );
        assert_eq!(
            fks[0].referenced_columns,
            vec!["id".to_string(), "line".to_string()]
        );
        assert_eq!(fks[0].on_delete, ReferentialAction::Cascade);
        assert_eq!(fks[1].referenced_table, "customers");
        assert!(fks[1].referenced_columns.is_empty());
    }

    #[test]
    fn skips_primary_key_and_expression_indexes() {
        let table = build_table(
            table("users"),
            vec![column(0, "id", "INTEGER", false, 1)],
            Vec::new(),
            vec![
                (
                    IndexListRow {
                        name: "sqlite_autoindex_users_1".to_string(),
                        is_unique: 1,
                        origin: "u".to_string(),
                    },
                    vec![IndexInfoRow {
                        seqno: 0,
                        column_name: Some("email".to_string()),
                    }],
                ),
                (
                    IndexListRow {
                        name: "users_pk".to_string(),
                        is_unique: 1,
                        origin: "pk".to_string(),
                    },
                    vec![IndexInfoRow {
                        seqno: 0,
                        column_name: Some("id".to_string()),
                    }],
                ),
                (
                    IndexListRow {
                        name: "users_lower_email".to_string(),
                        is_unique: 0,
                        origin: "c".to_string(),
                    },
                    vec![IndexInfoRow {
                        seqno: 0,
                        column_name: None,
                    }],
                ),
            ],
        );

        assert_eq!(table.indexes.len(), 1);
        assert!(table.indexes[0].unique);
        assert_eq!(table.indexes[0].columns, vec!["email".to_string()]);
    }
}
