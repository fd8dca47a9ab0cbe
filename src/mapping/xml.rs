//! `<entity-mapping>` documents, one entity per file.

use std::{collections::HashMap, path::Path};

use quick_xml::{
    Reader, Writer,
    events::{BytesDecl, BytesEnd, BytesStart, Event},
};

use super::{
    FieldMapping, Generator, IndexMapping, JoinColumn, ManyToOne, MappingEntity, MappingType,
};
use crate::{
    error::{ScaffoldError, ScaffoldResult},
    schema::ReferentialAction,
};

const ROOT: &str = "entity-mapping";

pub fn to_xml(entity: &MappingEntity) -> ScaffoldResult<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 4);
    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write(&mut writer, Event::Start(BytesStart::new(ROOT)))?;

    let mut root = BytesStart::new("entity");
    root.push_attribute(("name", entity.name.as_str()));
    root.push_attribute(("table", entity.table.as_str()));
    if let Some(module) = &entity.module {
        root.push_attribute(("module", module.as_str()));
    }
    write(&mut writer, Event::Start(root))?;

    for id in &entity.identifiers {
        let element = field_element("id", id);
        if entity.generator.is_none() || entity.identifiers.len() != 1 {
            write(&mut writer, Event::Empty(element))?;
            continue;
        }
        write(&mut writer, Event::Start(element))?;
        let mut generator = BytesStart::new("generator");
        generator.push_attribute(("strategy", entity.generator.strategy()));
        if let Generator::Sequence { sequence_name } = &entity.generator {
            generator.push_attribute(("sequence-name", sequence_name.as_str()));
        }
        write(&mut writer, Event::Empty(generator))?;
        write(&mut writer, Event::End(BytesEnd::new("id")))?;
    }

    for field in &entity.fields {
        write(&mut writer, Event::Empty(field_element("field", field)))?;
    }

    for assoc in &entity.associations {
        let mut element = BytesStart::new("many-to-one");
        element.push_attribute(("field", assoc.field.as_str()));
        element.push_attribute(("target-entity", assoc.target_entity.as_str()));
        write(&mut writer, Event::Start(element))?;
        for join in &assoc.join_columns {
            let mut column = BytesStart::new("join-column");
            column.push_attribute(("name", join.name.as_str()));
            column.push_attribute(("referenced-column-name", join.referenced_column_name.as_str()));
            if join.nullable {
                column.push_attribute(("nullable", "true"));
            }
            if join.on_delete != ReferentialAction::NoAction {
                column.push_attribute(("on-delete", join.on_delete.as_sql()));
            }
            if join.on_update != ReferentialAction::NoAction {
                column.push_attribute(("on-update", join.on_update.as_sql()));
            }
            write(&mut writer, Event::Empty(column))?;
        }
        write(&mut writer, Event::End(BytesEnd::new("many-to-one")))?;
    }

    write_indexes(&mut writer, "indexes", "index", &entity.indexes)?;
    write_indexes(
        &mut writer,
        "unique-constraints",
        "unique-constraint",
        &entity.unique_constraints,
    )?;

    write(&mut writer, Event::End(BytesEnd::new("entity")))?;
    write(&mut writer, Event::End(BytesEnd::new(ROOT)))?;

    let mut xml =
        String::from_utf8(writer.into_inner()).map_err(|err| ScaffoldError::Xml(err.to_string()))?;
    xml.push('\n');
    Ok(xml)
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> ScaffoldResult<()> {
    writer
        .write_event(event)
        .map_err(|err| ScaffoldError::Xml(err.to_string()))
}

fn field_element<'a>(tag: &'a str, field: &'a FieldMapping) -> BytesStart<'a> {
    let mut element = BytesStart::new(tag);
    element.push_attribute(("name", field.name.as_str()));
    element.push_attribute(("column", field.column.as_str()));
    element.push_attribute(("type", field.mapping_type.as_str()));
    if let Some(length) = field.length {
        element.push_attribute(("length", length.to_string().as_str()));
    }
    if let Some(precision) = field.precision {
        element.push_attribute(("precision", precision.to_string().as_str()));
    }
    if let Some(scale) = field.scale {
        element.push_attribute(("scale", scale.to_string().as_str()));
    }
    if field.unsigned {
        element.push_attribute(("unsigned", "true"));
    }
    if field.nullable {
        element.push_attribute(("nullable", "true"));
    }
    if field.unique {
        element.push_attribute(("unique", "true"));
    }
    if let Some(default) = &field.default {
        element.push_attribute(("default", default.as_str()));
    }
    element
}

fn write_indexes(
    writer: &mut Writer<Vec<u8>>,
    container: &str,
    tag: &str,
    indexes: &[IndexMapping],
) -> ScaffoldResult<()> {
    if indexes.is_empty() {
        return Ok(());
    }
    write(writer, Event::Start(BytesStart::new(container)))?;
    for index in indexes {
        let mut element = BytesStart::new(tag);
        element.push_attribute(("name", index.name.as_str()));
        element.push_attribute(("columns", index.columns.join(",").as_str()));
        write(writer, Event::Empty(element))?;
    }
    write(writer, Event::End(BytesEnd::new(container)))
}

pub fn from_xml(path: &Path, contents: &str) -> ScaffoldResult<MappingEntity> {
    let mut reader = Reader::from_str(contents);
    let mut state = ReadState::default();

    loop {
        let event = reader
            .read_event()
            .map_err(|err| ScaffoldError::invalid_mapping(path, err.to_string()))?;
        let step = match event {
            Event::Start(element) => state.open(&element, false),
            Event::Empty(element) => state.open(&element, true),
            Event::End(element) => {
                state.close(element.name().as_ref());
                Ok(())
            }
            Event::Text(text) if !text.iter().all(u8::is_ascii_whitespace) => {
                Err("unexpected text content".to_string())
            }
            Event::Eof => break,
            _ => Ok(()),
        };
        step.map_err(|message| ScaffoldError::invalid_mapping(path, message))?;
    }

    let entity = state
        .entity
        .ok_or_else(|| ScaffoldError::invalid_mapping(path, "missing <entity> element"))?;
    entity
        .validate()
        .map_err(|message| ScaffoldError::invalid_mapping(path, message))?;
    Ok(entity)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Indexes,
    UniqueConstraints,
}

#[derive(Default)]
struct ReadState {
    seen_root: bool,
    entity: Option<MappingEntity>,
    in_id: bool,
    in_association: bool,
    section: Option<Section>,
}

impl ReadState {
    fn open(&mut self, element: &BytesStart<'_>, empty: bool) -> Result<(), String> {
        let tag = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        let mut attrs = Attrs::parse(element, &tag)?;

        if !self.seen_root {
            if tag != ROOT {
                return Err(format!("expected <{ROOT}> root element, found <{tag}>"));
            }
            // Namespace declarations are allowed on the root.
            self.seen_root = true;
            return Ok(());
        }

        if tag == "entity" {
            if self.entity.is_some() {
                return Err("only one <entity> is allowed per file".to_string());
            }
            let mut entity = MappingEntity::new(attrs.required("name")?, attrs.required("table")?);
            entity.module = attrs.optional("module");
            attrs.finish()?;
            self.entity = Some(entity);
            return Ok(());
        }

        let in_id = self.in_id;
        let in_association = self.in_association;
        let section = self.section;
        let entity = self
            .entity
            .as_mut()
            .ok_or_else(|| format!("<{tag}> must appear inside <entity>"))?;

        match tag.as_str() {
            "id" => {
                entity.identifiers.push(read_field(&mut attrs)?);
                self.in_id = !empty;
            }
            "generator" if in_id => {
                entity.generator = match attrs.required("strategy")?.to_ascii_uppercase().as_str()
                {
                    "NONE" => Generator::None,
                    "IDENTITY" => Generator::Identity,
                    "SEQUENCE" => Generator::Sequence {
                        sequence_name: attrs.required("sequence-name")?,
                    },
                    other => return Err(format!("unknown generator strategy '{other}'")),
                };
            }
            "field" => entity.fields.push(read_field(&mut attrs)?),
            "many-to-one" => {
                entity.associations.push(ManyToOne {
                    field: attrs.required("field")?,
                    target_entity: attrs.required("target-entity")?,
                    join_columns: Vec::new(),
                });
                self.in_association = !empty;
            }
            "join-column" if in_association => {
                let join = JoinColumn {
                    name: attrs.required("name")?,
                    referenced_column_name: attrs.required("referenced-column-name")?,
                    nullable: attrs.flag("nullable")?,
                    on_delete: attrs
                        .optional("on-delete")
                        .map(|value| ReferentialAction::parse(&value))
                        .unwrap_or_default(),
                    on_update: attrs
                        .optional("on-update")
                        .map(|value| ReferentialAction::parse(&value))
                        .unwrap_or_default(),
                };
                if let Some(assoc) = entity.associations.last_mut() {
                    assoc.join_columns.push(join);
                }
            }
            "indexes" => self.section = (!empty).then_some(Section::Indexes),
            "unique-constraints" => self.section = (!empty).then_some(Section::UniqueConstraints),
            "index" if section == Some(Section::Indexes) => {
                entity.indexes.push(read_index(&mut attrs)?);
            }
            "unique-constraint" if section == Some(Section::UniqueConstraints) => {
                entity.unique_constraints.push(read_index(&mut attrs)?);
            }
            _ => return Err(format!("unexpected element <{tag}>")),
        }
        attrs.finish()
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"id" => self.in_id = false,
            b"many-to-one" => self.in_association = false,
            b"indexes" | b"unique-constraints" => self.section = None,
            _ => {}
        }
    }
}

fn read_field(attrs: &mut Attrs) -> Result<FieldMapping, String> {
    let mapping_type: MappingType = attrs
        .required("type")?
        .parse()
        .map_err(|err: ScaffoldError| err.to_string())?;
    let mut field = FieldMapping::new(attrs.required("name")?, attrs.required("column")?, mapping_type);
    field.length = attrs.number("length")?;
    field.precision = attrs.number("precision")?;
    field.scale = attrs.number("scale")?;
    field.unsigned = attrs.flag("unsigned")?;
    field.nullable = attrs.flag("nullable")?;
    field.unique = attrs.flag("unique")?;
    field.default = attrs.optional("default");
    Ok(field)
}

fn read_index(attrs: &mut Attrs) -> Result<IndexMapping, String> {
    let name = attrs.required("name")?;
    let columns: Vec<String> = attrs
        .required("columns")?
        .split(',')
        .map(str::trim)
        .filter(|column| !column.is_empty())
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(format!("index '{name}' has no columns"));
    }
    Ok(IndexMapping { name, columns })
}

/// Attributes of one element; anything left unconsumed is rejected.
struct Attrs {
    tag: String,
    values: HashMap<String, String>,
}

impl Attrs {
    fn parse(element: &BytesStart<'_>, tag: &str) -> Result<Self, String> {
        let mut values = HashMap::new();
        for attr in element.attributes() {
            let attr = attr.map_err(|err| err.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| err.to_string())?
                .into_owned();
            values.insert(key, value);
        }
        Ok(Self {
            tag: tag.to_string(),
            values,
        })
    }

    fn optional(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    fn required(&mut self, key: &str) -> Result<String, String> {
        self.optional(key)
            .ok_or_else(|| format!("<{}> is missing the '{key}' attribute", self.tag))
    }

    fn flag(&mut self, key: &str) -> Result<bool, String> {
        match self.optional(key).as_deref() {
            None | Some("false") => Ok(false),
            Some("true") => Ok(true),
            Some(other) => Err(format!(
                "<{}> attribute '{key}' must be true or false, got '{other}'",
                self.tag
            )),
        }
    }

    fn number(&mut self, key: &str) -> Result<Option<u32>, String> {
        self.optional(key)
            .map(|value| {
                value.parse().map_err(|_| {
                    format!("<{}> attribute '{key}' must be a number, got '{value}'", self.tag)
                })
            })
            .transpose()
    }

    fn finish(self) -> Result<(), String> {
        let mut unknown: Vec<_> = self.values.into_keys().collect();
        if unknown.is_empty() {
            return Ok(());
        }
        unknown.sort();
        Err(format!(
            "<{}> has unknown attributes: {}",
            self.tag,
            unknown.join(", ")
        ))
    }
}
