use std::collections::HashMap;

use tracing::warn;

use super::template::{ENTITY_TEMPLATE, render_template};
use crate::{
    error::ScaffoldResult,
    mapping::{
        FieldMapping, ManyToOne, MappingEntity, MappingType,
        naming::{escape_rust_string, field_name, rust_ident, to_pascal_case, to_snake_case},
    },
    schema::ReferentialAction,
};

/// Module (and file stem) an entity is generated into.
pub fn module_name(entity: &str) -> String {
    rust_ident(&to_snake_case(entity))
}

pub fn rust_type(field: &FieldMapping) -> String {
    let base = match (field.mapping_type, field.unsigned) {
        (MappingType::Integer, false) => "i32",
        (MappingType::Integer, true) => "u32",
        (MappingType::Smallint, false) => "i16",
        (MappingType::Smallint, true) => "u16",
        (MappingType::Bigint, false) => "i64",
        (MappingType::Bigint, true) => "u64",
        (MappingType::String | MappingType::Text, _) => "String",
        (MappingType::Boolean, _) => "bool",
        (MappingType::Decimal, _) => "Decimal",
        (MappingType::Float, _) => "f64",
        (MappingType::Date, _) => "Date",
        (MappingType::Time, _) => "Time",
        (MappingType::Datetime, _) => "DateTime",
        (MappingType::Datetimetz, _) => "DateTimeWithTimeZone",
        (MappingType::Guid, _) => "Uuid",
        (MappingType::Json, _) => "Json",
        (MappingType::Binary | MappingType::Blob, _) => "Vec<u8>",
    };
    if field.nullable {
        format!("Option<{base}>")
    } else {
        base.to_string()
    }
}

/// Renders one sea-orm entity module. `known` holds every entity loaded
/// alongside this one, keyed by entity name; associations pointing
/// elsewhere are dropped.
pub fn render_entity(
    entity: &MappingEntity,
    known: &HashMap<String, &MappingEntity>,
) -> ScaffoldResult<String> {
    let mut lines = Vec::new();

    for field in entity.all_fields() {
        render_field(entity, field, &mut lines);
    }

    let associations: Vec<&ManyToOne> = entity
        .associations
        .iter()
        .filter(|assoc| {
            let found = known.contains_key(&assoc.target_entity);
            if !found {
                warn!(
                    entity = %entity.name,
                    association = %assoc.field,
                    target = %assoc.target_entity,
                    "association target is not among the converted entities; skipping"
                );
            }
            found
        })
        .collect();
    for assoc in &associations {
        let shares_target = associations
            .iter()
            .filter(|other| other.target_entity == assoc.target_entity)
            .count()
            > 1;
        render_association(entity, assoc, known, shares_target, &mut lines);
    }

    let has_inexact = entity.all_fields().any(|field| {
        matches!(
            field.mapping_type,
            MappingType::Float | MappingType::Decimal | MappingType::Json
        )
    });
    let derives = if has_inexact {
        "Clone, Debug, PartialEq, DeriveEntityModel"
    } else {
        "Clone, Debug, PartialEq, Eq, DeriveEntityModel"
    };

    let mut fields = String::new();
    for line in lines {
        fields.push_str("    ");
        fields.push_str(&line);
        fields.push('\n');
    }

    let vars = HashMap::from([
        ("entity_name", entity.name.clone()),
        ("table_name", escape_rust_string(&entity.table)),
        ("derives", derives.to_string()),
        ("fields", fields),
    ]);
    render_template(ENTITY_TEMPLATE, &vars)
}

fn render_field(entity: &MappingEntity, field: &FieldMapping, lines: &mut Vec<String>) {
    let mut attrs = Vec::new();

    if entity.is_identifier(field) {
        attrs.push("primary_key".to_string());
        let generated = !entity.generator.is_none()
            && entity.identifiers.len() == 1
            && field.mapping_type.is_integer();
        if !generated {
            attrs.push("auto_increment = false".to_string());
        }
    }
    let ident = rust_ident(&field.name);
    if field.column != ident {
        attrs.push(format!(
            "column_name = \"{}\"",
            escape_rust_string(&field.column)
        ));
    }
    if let Some(column_type) = column_type(field) {
        attrs.push(format!("column_type = \"{column_type}\""));
    }
    if field.unique {
        attrs.push("unique".to_string());
    }
    for constraint in &entity.unique_constraints {
        if constraint.columns.contains(&field.column) {
            attrs.push(format!(
                "unique_key = \"{}\"",
                escape_rust_string(&constraint.name)
            ));
        }
    }
    let single_index = entity
        .indexes
        .iter()
        .any(|index| index.columns.len() == 1 && index.columns[0] == field.column);
    if single_index && !field.unique {
        attrs.push("indexed".to_string());
    }
    if let Some(default) = field.default.as_deref().and_then(|d| literal_default(field, d)) {
        attrs.push(format!("default_value = {default}"));
    }

    if !attrs.is_empty() {
        lines.push(format!("#[sea_orm({})]", attrs.join(", ")));
    }
    lines.push(format!("pub {ident}: {},", rust_type(field)));
}

fn column_type(field: &FieldMapping) -> Option<String> {
    match field.mapping_type {
        MappingType::String => field
            .length
            .map(|len| format!("String(StringLen::N({len}))")),
        MappingType::Text => Some("Text".to_string()),
        MappingType::Decimal => match (field.precision, field.scale) {
            (Some(precision), Some(scale)) => Some(format!("Decimal(Some(({precision}, {scale})))")),
            (Some(precision), None) => Some(format!("Decimal(Some(({precision}, 0)))")),
            _ => None,
        },
        _ => None,
    }
}

/// Numeric and boolean literal defaults. Expressions are left to the
/// database.
fn literal_default(field: &FieldMapping, raw: &str) -> Option<String> {
    let value = raw.trim().trim_matches(|ch| ch == '(' || ch == ')');
    let value = value.trim_matches('\'');
    match field.mapping_type {
        MappingType::Boolean => match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "t" => Some("true".to_string()),
            "0" | "false" | "f" => Some("false".to_string()),
            _ => None,
        },
        ty if ty.is_integer() => value.parse::<i64>().ok().map(|n| n.to_string()),
        MappingType::Float => value
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(|n| format!("{n:?}")),
        _ => None,
    }
}

fn render_association(
    entity: &MappingEntity,
    assoc: &ManyToOne,
    known: &HashMap<String, &MappingEntity>,
    shares_target: bool,
    lines: &mut Vec<String>,
) {
    let target = known.get(&assoc.target_entity).copied();
    let self_ref = assoc.target_entity == entity.name;

    let from: Vec<String> = assoc
        .join_columns
        .iter()
        .map(|join| {
            entity
                .field_by_column(&join.name)
                .map(|field| rust_ident(&field.name))
                .unwrap_or_else(|| rust_ident(&field_name(&join.name)))
        })
        .collect();
    let to: Vec<String> = assoc
        .join_columns
        .iter()
        .map(|join| {
            target
                .and_then(|target| target.field_by_column(&join.referenced_column_name))
                .map(|field| rust_ident(&field.name))
                .unwrap_or_else(|| rust_ident(&field_name(&join.referenced_column_name)))
        })
        .collect();

    let mut attrs = vec![if self_ref { "self_ref" } else { "belongs_to" }.to_string()];
    if self_ref || shares_target {
        attrs.push(format!(
            "relation_enum = \"{}\"",
            to_pascal_case(&assoc.field)
        ));
    }
    attrs.push(format!("from = \"{}\"", key_list(&from)));
    attrs.push(format!("to = \"{}\"", key_list(&to)));

    // Join columns of one constraint share the same actions.
    if let Some(join) = assoc.join_columns.first() {
        if let Some(action) = action_name(join.on_delete) {
            attrs.push(format!("on_delete = \"{action}\""));
        }
        if let Some(action) = action_name(join.on_update) {
            attrs.push(format!("on_update = \"{action}\""));
        }
    }

    let target_path = if self_ref {
        "Entity".to_string()
    } else {
        format!("super::{}::Entity", module_name(&assoc.target_entity))
    };
    lines.push(format!("#[sea_orm({})]", attrs.join(", ")));
    lines.push(format!(
        "pub {}: HasOne<{target_path}>,",
        rust_ident(&assoc.field)
    ));
}

fn key_list(keys: &[String]) -> String {
    match keys {
        [single] => single.clone(),
        _ => format!("({})", keys.join(", ")),
    }
}

fn action_name(action: ReferentialAction) -> Option<&'static str> {
    match action {
        ReferentialAction::NoAction => None,
        ReferentialAction::Restrict => Some("Restrict"),
        ReferentialAction::Cascade => Some("Cascade"),
        ReferentialAction::SetNull => Some("SetNull"),
        ReferentialAction::SetDefault => Some("SetDefault"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{module_name, render_entity, rust_type};
    use crate::{
        mapping::{
            FieldMapping, Generator, IndexMapping, JoinColumn, ManyToOne, MappingEntity,
            MappingType,
        },
        schema::ReferentialAction,
    };

    fn blog_post() -> MappingEntity {
        let mut entity = MappingEntity::new("BlogPost", "blog_post");
        entity
            .identifiers
            .push(FieldMapping::new("id", "id", MappingType::Integer));
        entity.generator = Generator::Identity;
        let mut title = FieldMapping::new("title", "title", MappingType::String);
        title.length = Some(100);
        entity.fields.push(title);
        entity
    }

    fn blog_comment() -> MappingEntity {
        let mut entity = MappingEntity::new("BlogComment", "blog_comment");
        entity
            .identifiers
            .push(FieldMapping::new("id", "id", MappingType::Integer));
        entity.generator = Generator::Identity;
        let mut post_id = FieldMapping::new("post_id", "post_id", MappingType::Integer);
        post_id.nullable = true;
        entity.fields.push(post_id);
        entity.indexes.push(IndexMapping {
            name: "idx_post".to_string(),
            columns: vec!["post_id".to_string()],
        });
        entity.associations.push(ManyToOne {
            field: "post".to_string(),
            target_entity: "BlogPost".to_string(),
            join_columns: vec![JoinColumn {
                name: "post_id".to_string(),
                referenced_column_name: "id".to_string(),
                nullable: true,
                on_delete: ReferentialAction::Cascade,
                on_update: ReferentialAction::NoAction,
            }],
        });
        entity
    }

    #[test]
    fn renders_belongs_to_association() {
        let post = blog_post();
        let comment = blog_comment();
        let known = HashMap::from([
            (post.name.clone(), &post),
            (comment.name.clone(), &comment),
        ]);

        let source = render_entity(&comment, &known).expect("render");
        assert!(source.contains("#[sea_orm(table_name = \"blog_comment\")]"));
        assert!(source.contains("#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]"));
        assert!(source.contains("    #[sea_orm(primary_key)]\n    pub id: i32,"));
        assert!(source.contains("    #[sea_orm(indexed)]\n    pub post_id: Option<i32>,"));
        assert!(source.contains(
            "#[sea_orm(belongs_to, from = \"post_id\", to = \"id\", on_delete = \"Cascade\")]"
        ));
        assert!(source.contains("pub post: HasOne<super::blog_post::Entity>,"));
        assert!(source.ends_with("impl ActiveModelBehavior for ActiveModel {}\n"));
    }

    #[test]
    fn target_without_inverse_side() {
        let post = blog_post();
        let known = HashMap::from([(post.name.clone(), &post)]);
        let source = render_entity(&post, &known).expect("render");
        assert!(!source.contains("HasMany"));
        assert!(!source.contains("HasOne"));
        assert!(source.contains("#[sea_orm(column_type = \"String(StringLen::N(100))\")]"));
    }

    #[test]
    fn skips_unknown_targets() {
        let comment = blog_comment();
        let known = HashMap::from([(comment.name.clone(), &comment)]);
        let source = render_entity(&comment, &known).expect("render");
        assert!(!source.contains("HasOne"));
        assert!(source.contains("pub post_id: Option<i32>,"));
    }

    #[test]
    fn self_references_and_shared_targets() {
        let mut person = MappingEntity::new("Person", "person");
        person
            .identifiers
            .push(FieldMapping::new("id", "id", MappingType::Guid));
        person
            .fields
            .push(FieldMapping::new("manager_id", "manager_id", MappingType::Guid));
        person.associations.push(ManyToOne {
            field: "manager".to_string(),
            target_entity: "Person".to_string(),
            join_columns: vec![JoinColumn {
                name: "manager_id".to_string(),
                referenced_column_name: "id".to_string(),
                nullable: false,
                on_delete: ReferentialAction::SetNull,
                on_update: ReferentialAction::NoAction,
            }],
        });
        let known = HashMap::from([(person.name.clone(), &person)]);

        let source = render_entity(&person, &known).expect("render");
        assert!(source.contains("#[sea_orm(primary_key, auto_increment = false)]\n    pub id: Uuid,"));
        assert!(source.contains(
            "#[sea_orm(self_ref, relation_enum = \"Manager\", from = \"manager_id\", to = \"id\", on_delete = \"SetNull\")]"
        ));
        assert!(source.contains("pub manager: HasOne<Entity>,"));
    }

    #[test]
    fn float_fields_drop_eq_and_keep_literal_defaults() {
        let mut entity = MappingEntity::new("Reading", "reading");
        entity
            .identifiers
            .push(FieldMapping::new("id", "id", MappingType::Bigint));
        let mut value = FieldMapping::new("value", "Value", MappingType::Float);
        value.default = Some("0".to_string());
        entity.fields.push(value);
        let mut active = FieldMapping::new("type", "type", MappingType::Boolean);
        active.default = Some("'1'".to_string());
        entity.fields.push(active);
        let known = HashMap::new();

        let source = render_entity(&entity, &known).expect("render");
        assert!(source.contains("#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]"));
        assert!(source.contains("auto_increment = false"));
        assert!(source.contains("#[sea_orm(column_name = \"Value\", default_value = 0.0)]"));
        assert!(source.contains(
            "#[sea_orm(column_name = \"type\", default_value = true)]\n    pub type_: bool,"
        ));
    }

    #[test]
    fn keyword_columns_with_unique_and_indexed() {
        let mut entity = blog_post();
        let mut kind = FieldMapping::new("type", "type", MappingType::String);
        kind.unique = true;
        entity.fields.push(kind);
        entity
            .fields
            .push(FieldMapping::new("match", "match", MappingType::Integer));
        entity.indexes.push(IndexMapping {
            name: "blog_post_match_idx".to_string(),
            columns: vec!["match".to_string()],
        });
        let known = HashMap::new();

        let source = render_entity(&entity, &known).expect("render");
        assert!(source.contains("#[sea_orm(column_name = \"type\", unique)]\n    pub type_: String,"));
        assert!(source.contains("#[sea_orm(column_name = \"match\", indexed)]\n    pub match_: i32,"));
        assert!(!source.contains("r#"));
    }

    #[test]
    fn path_keywords_map_back_to_their_columns() {
        let mut entity = MappingEntity::new("Self_", "self");
        entity
            .identifiers
            .push(FieldMapping::new("self", "self", MappingType::Integer));
        entity.generator = Generator::Identity;
        let mut parent = FieldMapping::new("super", "super", MappingType::Integer);
        parent.nullable = true;
        entity.fields.push(parent);
        entity.associations.push(ManyToOne {
            field: "parent".to_string(),
            target_entity: "Self_".to_string(),
            join_columns: vec![JoinColumn {
                name: "super".to_string(),
                referenced_column_name: "self".to_string(),
                nullable: true,
                on_delete: ReferentialAction::NoAction,
                on_update: ReferentialAction::NoAction,
            }],
        });
        let known = HashMap::from([(entity.name.clone(), &entity)]);

        let source = render_entity(&entity, &known).expect("render");
        assert!(source.contains("#[sea_orm(table_name = \"self\")]"));
        assert!(source.contains("#[sea_orm(primary_key, column_name = \"self\")]\n    pub self_: i32,"));
        assert!(source.contains("#[sea_orm(column_name = \"super\")]\n    pub super_: Option<i32>,"));
        assert!(source.contains("from = \"super_\", to = \"self_\""));
        assert_eq!(module_name("Self_"), "self_");
        assert_eq!(module_name("Crate"), "crate_");
    }

    #[test]
    fn maps_rust_types() {
        let mut field = FieldMapping::new("n", "n", MappingType::Bigint);
        field.unsigned = true;
        assert_eq!(rust_type(&field), "u64");
        field.nullable = true;
        assert_eq!(rust_type(&field), "Option<u64>");
        let blob = FieldMapping::new("b", "b", MappingType::Blob);
        assert_eq!(rust_type(&blob), "Vec<u8>");
        assert_eq!(module_name("BlogComment"), "blog_comment");
    }
}
