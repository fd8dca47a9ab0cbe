//! Catalog readers for the supported backends.
//!
//! Each backend module issues raw catalog queries through sea-orm and folds
//! the rows into [`crate::schema`] types with plain functions, so the
//! folding can be tested without a live database.

pub mod postgres;
pub mod sqlite;

use sea_orm::{DatabaseConnection, FromQueryResult, Statement, Value};

use crate::{config::defaults, error::ScaffoldResult, schema::Schema};

#[derive(Debug, Clone)]
pub struct IntrospectOptions {
    pub schema: String,
}

impl Default for IntrospectOptions {
    fn default() -> Self {
        Self {
            schema: defaults::DEFAULT_DB_SCHEMA.to_string(),
        }
    }
}

async fn fetch_all<T>(
    db: &DatabaseConnection,
    sql: &str,
    values: Vec<Value>,
) -> ScaffoldResult<Vec<T>>
where
    T: FromQueryResult,
{
    let stmt = Statement::from_sql_and_values(db.get_database_backend(), sql, values);
    Ok(T::find_by_statement(stmt).all(db).await?)
}

/// Fills in referenced columns that the catalog left implicit (SQLite allows
/// `REFERENCES parent` without a column list) with the parent's primary key.
pub(crate) fn resolve_implicit_references(schema: &mut Schema) {
    let primary_keys: Vec<(String, Vec<String>)> = schema
        .tables
        .iter()
        .map(|table| (table.name.clone(), table.primary_key.clone()))
        .collect();

    for table in &mut schema.tables {
        for fk in &mut table.foreign_keys {
            if !fk.referenced_columns.is_empty() {
                continue;
            }
            if let Some((_, pk)) = primary_keys
                .iter()
                .find(|(name, _)| *name == fk.referenced_table)
            {
                fk.referenced_columns = pk.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_implicit_references;
    use crate::schema::{Backend, ForeignKey, ReferentialAction, Schema, Table};

    #[test]
    fn implicit_reference_resolves_to_parent_primary_key() {
        let mut parent = Table::new("blog_post");
        parent.primary_key = vec!["id".to_string()];

        let mut child = Table::new("blog_comment");
        child.foreign_keys.push(ForeignKey {
            name: None,
            columns: vec!["post_id".to_string()],
            referenced_table: "blog_post".to_string(),
            referenced_columns: Vec::new(),
            on_delete: ReferentialAction::Cascade,
            on_update: ReferentialAction::NoAction,
        });

        let mut schema = Schema::new(Backend::Sqlite);
        schema.tables = vec![parent, child];
        resolve_implicit_references(&mut schema);

        let fk = &schema.tables[1].foreign_keys[0];
        assert_eq!(fk.referenced_columns, vec!["id".to_string()]);
    }
}
