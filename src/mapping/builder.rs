use std::collections::HashSet;

use tracing::debug;

use super::{
    FieldMapping, Generator, IndexMapping, JoinColumn, ManyToOne, MappingEntity, MappingType,
    TypeMap,
    naming::{NameAllocator, entity_name, field_name, rust_ident},
};
use crate::{
    error::{ScaffoldError, ScaffoldResult},
    schema::{Column, ForeignKey, Schema, Table},
};

/// Turns introspected tables into mapping entities.
///
/// Only what the catalog states is derived: scalar fields, the identifier,
/// and one owning-side many-to-one per foreign key. Inverse sides,
/// inheritance and cascade semantics are left to the user.
pub struct MappingBuilder<'a> {
    type_map: &'a TypeMap,
    module: Option<String>,
    filters: Vec<String>,
    excludes: HashSet<String>,
}

impl<'a> MappingBuilder<'a> {
    pub fn new(type_map: &'a TypeMap) -> Self {
        Self {
            type_map,
            module: None,
            filters: Vec::new(),
            excludes: HashSet::new(),
        }
    }

    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// `filters` keep entities whose name contains any of the strings;
    /// `excludes` drop tables by exact name.
    pub fn with_filters(mut self, filters: Vec<String>, excludes: Vec<String>) -> Self {
        self.filters = filters;
        self.excludes = excludes.into_iter().collect();
        self
    }

    pub fn build(&self, schema: &Schema) -> ScaffoldResult<Vec<MappingEntity>> {
        let mut names = HashSet::new();
        let mut entities = Vec::new();

        for table in &schema.tables {
            if self.excludes.contains(&table.name) {
                debug!(table = %table.name, "table excluded");
                continue;
            }
            let name = entity_name(&table.name);
            if !self.matches_filters(&name) {
                debug!(table = %table.name, entity = %name, "entity filtered out");
                continue;
            }
            if !names.insert(name.clone()) {
                return Err(ScaffoldError::DuplicateEntity { name });
            }
            entities.push(self.build_entity(table)?);
        }

        Ok(entities)
    }

    fn matches_filters(&self, entity: &str) -> bool {
        self.filters.is_empty() || self.filters.iter().any(|filter| entity.contains(filter.as_str()))
    }

    pub fn build_entity(&self, table: &Table) -> ScaffoldResult<MappingEntity> {
        if table.primary_key.is_empty() {
            return Err(ScaffoldError::MissingPrimaryKey {
                table: table.name.clone(),
            });
        }

        let mut entity = MappingEntity::new(entity_name(&table.name), table.name.clone());
        entity.module = self.module.clone();

        let mut names = NameAllocator::new();
        let mut scalars = Vec::with_capacity(table.columns.len());
        for column in &table.columns {
            let name = names.allocate(&rust_ident(&field_name(&column.name)));
            let field = self.build_field(table, column, name)?;
            scalars.push(field);
        }

        for pk in &table.primary_key {
            let position = scalars
                .iter()
                .position(|field| &field.column == pk)
                .ok_or_else(|| ScaffoldError::MissingPrimaryKey {
                    table: table.name.clone(),
                })?;
            let mut id = scalars.remove(position);
            id.nullable = false;
            entity.identifiers.push(id);
        }
        entity.fields = scalars;
        entity.generator = generator_for(table);
        if !entity.generator.is_none() {
            for id in &mut entity.identifiers {
                id.default = None;
            }
        }

        apply_indexes(table, &mut entity);

        for fk in &table.foreign_keys {
            let association = build_association(table, fk, &mut names);
            entity.associations.push(association);
        }

        debug!(
            table = %table.name,
            entity = %entity.name,
            fields = entity.fields.len(),
            associations = entity.associations.len(),
            generator = entity.generator.strategy(),
            "built mapping entity"
        );
        Ok(entity)
    }

    fn build_field(
        &self,
        table: &Table,
        column: &Column,
        name: String,
    ) -> ScaffoldResult<FieldMapping> {
        let mapping_type = self.type_map.resolve(&table.name, column)?;
        let mut field = FieldMapping::new(name, column.name.clone(), mapping_type);
        if matches!(mapping_type, MappingType::String | MappingType::Binary) {
            field.length = column.length;
        }
        if mapping_type == MappingType::Decimal {
            field.precision = column.precision;
            field.scale = column.scale;
        }
        field.unsigned = column.unsigned && mapping_type.is_integer();
        field.nullable = column.nullable;
        field.default = column
            .default
            .clone()
            .filter(|default| !default.trim().eq_ignore_ascii_case("null"));
        Ok(field)
    }
}

fn generator_for(table: &Table) -> Generator {
    let [pk] = table.primary_key.as_slice() else {
        return Generator::None;
    };
    let Some(column) = table.column(pk) else {
        return Generator::None;
    };
    if let Some(sequence_name) = column.default.as_deref().and_then(sequence_name) {
        return Generator::Sequence { sequence_name };
    }
    if column.auto_increment {
        Generator::Identity
    } else {
        Generator::None
    }
}

/// Extracts `seq` from defaults such as `nextval('seq'::regclass)`.
pub(crate) fn sequence_name(default: &str) -> Option<String> {
    let rest = default.trim().strip_prefix("nextval(")?;
    let start = rest.find('\'')? + 1;
    let len = rest[start..].find('\'')?;
    let name = rest[start..start + len].trim_matches('"');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

fn apply_indexes(table: &Table, entity: &mut MappingEntity) {
    for index in &table.indexes {
        if index.unique && index.columns == table.primary_key {
            continue;
        }
        match index.columns.as_slice() {
            [column] if index.unique => {
                if let Some(field) = entity
                    .identifiers
                    .iter_mut()
                    .chain(entity.fields.iter_mut())
                    .find(|field| &field.column == column)
                {
                    field.unique = true;
                }
            }
            _ => {
                let mapping = IndexMapping {
                    name: index.name.clone(),
                    columns: index.columns.clone(),
                };
                if index.unique {
                    entity.unique_constraints.push(mapping);
                } else {
                    entity.indexes.push(mapping);
                }
            }
        }
    }
}

fn build_association(table: &Table, fk: &ForeignKey, names: &mut NameAllocator) -> ManyToOne {
    let base = match fk.columns.as_slice() {
        [column] => {
            let field = field_name(column);
            match field.strip_suffix("_id") {
                Some(stripped) if !stripped.is_empty() => stripped.to_string(),
                _ => field,
            }
        }
        _ => field_name(&fk.referenced_table),
    };

    let join_columns = fk
        .columns
        .iter()
        .enumerate()
        .map(|(i, column)| JoinColumn {
            name: column.clone(),
            referenced_column_name: fk
                .referenced_columns
                .get(i)
                .cloned()
                .unwrap_or_else(|| "id".to_string()),
            nullable: table.column(column).is_some_and(|col| col.nullable),
            on_delete: fk.on_delete,
            on_update: fk.on_update,
        })
        .collect();

    ManyToOne {
        field: names.allocate(&rust_ident(&base)),
        target_entity: entity_name(&fk.referenced_table),
        join_columns,
    }
}
