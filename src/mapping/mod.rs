//! Intermediate mapping metadata.
//!
//! A [`MappingEntity`] is what import persists and convert consumes. It only
//! carries what a catalog can tell: scalar fields, the identifier and its
//! generation strategy, and owning-side many-to-one associations.

pub mod builder;
pub mod naming;
pub mod store;
pub mod types;
pub mod xml;
pub mod yaml;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{error::ScaffoldError, schema::ReferentialAction};

pub use builder::MappingBuilder;
pub use store::MappingStore;
pub use types::TypeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum MappingFormat {
    Xml,
    #[value(name = "yml", alias = "yaml")]
    Yaml,
}

impl MappingFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            MappingFormat::Xml => "xml",
            MappingFormat::Yaml => "yml",
        }
    }

    /// File suffix including the `.orm` marker, e.g. `orm.xml`.
    pub fn extension(self) -> &'static str {
        match self {
            MappingFormat::Xml => "orm.xml",
            MappingFormat::Yaml => "orm.yml",
        }
    }

    pub fn from_file_name(name: &str) -> Option<Self> {
        if name.ends_with(".orm.xml") {
            Some(MappingFormat::Xml)
        } else if name.ends_with(".orm.yml") || name.ends_with(".orm.yaml") {
            Some(MappingFormat::Yaml)
        } else {
            None
        }
    }
}

impl fmt::Display for MappingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingType {
    Integer,
    Smallint,
    Bigint,
    String,
    Text,
    Boolean,
    Decimal,
    Float,
    Date,
    Time,
    Datetime,
    Datetimetz,
    Guid,
    Json,
    Binary,
    Blob,
}

impl MappingType {
    pub const ALL: [MappingType; 16] = [
        MappingType::Integer,
        MappingType::Smallint,
        MappingType::Bigint,
        MappingType::String,
        MappingType::Text,
        MappingType::Boolean,
        MappingType::Decimal,
        MappingType::Float,
        MappingType::Date,
        MappingType::Time,
        MappingType::Datetime,
        MappingType::Datetimetz,
        MappingType::Guid,
        MappingType::Json,
        MappingType::Binary,
        MappingType::Blob,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MappingType::Integer => "integer",
            MappingType::Smallint => "smallint",
            MappingType::Bigint => "bigint",
            MappingType::String => "string",
            MappingType::Text => "text",
            MappingType::Boolean => "boolean",
            MappingType::Decimal => "decimal",
            MappingType::Float => "float",
            MappingType::Date => "date",
            MappingType::Time => "time",
            MappingType::Datetime => "datetime",
            MappingType::Datetimetz => "datetimetz",
            MappingType::Guid => "guid",
            MappingType::Json => "json",
            MappingType::Binary => "binary",
            MappingType::Blob => "blob",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            MappingType::Integer | MappingType::Smallint | MappingType::Bigint
        )
    }
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingType {
    type Err = ScaffoldError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        MappingType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == normalized)
            .ok_or_else(|| ScaffoldError::UnknownMappingType(value.trim().to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "UPPERCASE")]
pub enum Generator {
    #[default]
    None,
    Identity,
    Sequence { sequence_name: String },
}

impl Generator {
    pub fn is_none(&self) -> bool {
        matches!(self, Generator::None)
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Generator::None => "NONE",
            Generator::Identity => "IDENTITY",
            Generator::Sequence { .. } => "SEQUENCE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldMapping {
    pub name: String,
    pub column: String,
    #[serde(rename = "type")]
    pub mapping_type: MappingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unsigned: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl FieldMapping {
    pub fn new(name: impl Into<String>, column: impl Into<String>, ty: MappingType) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            mapping_type: ty,
            length: None,
            precision: None,
            scale: None,
            unsigned: false,
            nullable: false,
            unique: false,
            default: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinColumn {
    pub name: String,
    pub referenced_column_name: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "is_no_action")]
    pub on_delete: ReferentialAction,
    #[serde(default, skip_serializing_if = "is_no_action")]
    pub on_update: ReferentialAction,
}

/// Owning side of a foreign key. The inverse side is never derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManyToOne {
    pub field: String,
    pub target_entity: String,
    pub join_columns: Vec<JoinColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexMapping {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingEntity {
    pub name: String,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    #[serde(rename = "id")]
    pub identifiers: Vec<FieldMapping>,
    #[serde(default, skip_serializing_if = "Generator::is_none")]
    pub generator: Generator,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldMapping>,
    #[serde(default, rename = "many_to_one", skip_serializing_if = "Vec::is_empty")]
    pub associations: Vec<ManyToOne>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unique_constraints: Vec<IndexMapping>,
}

impl MappingEntity {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            module: None,
            identifiers: Vec::new(),
            generator: Generator::None,
            fields: Vec::new(),
            associations: Vec::new(),
            indexes: Vec::new(),
            unique_constraints: Vec::new(),
        }
    }

    /// Identifiers first, then plain fields.
    pub fn all_fields(&self) -> impl Iterator<Item = &FieldMapping> {
        self.identifiers.iter().chain(self.fields.iter())
    }

    pub fn field_by_column(&self, column: &str) -> Option<&FieldMapping> {
        self.all_fields().find(|field| field.column == column)
    }

    pub fn is_identifier(&self, field: &FieldMapping) -> bool {
        self.identifiers.iter().any(|id| id.name == field.name)
    }

    pub fn file_name(&self, format: MappingFormat) -> String {
        format!("{}.{}", self.name, format.extension())
    }

    /// Structural checks shared by every reader.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("entity name must not be empty".to_string());
        }
        naming::validate_ident(&self.name, "entity name")?;
        if naming::is_keyword(&self.name) {
            return Err(format!("entity name '{}' is a Rust keyword", self.name));
        }
        if self.table.trim().is_empty() {
            return Err(format!("entity '{}' has no table", self.name));
        }
        if self.identifiers.is_empty() {
            return Err(format!("entity '{}' has no identifier", self.name));
        }
        if !self.generator.is_none() && self.identifiers.len() != 1 {
            return Err(format!(
                "entity '{}' uses {} generation with a composite identifier",
                self.name,
                self.generator.strategy()
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for name in self
            .all_fields()
            .map(|field| field.name.as_str())
            .chain(self.associations.iter().map(|assoc| assoc.field.as_str()))
        {
            if !seen.insert(name) {
                return Err(format!(
                    "entity '{}' maps '{}' more than once",
                    self.name, name
                ));
            }
        }

        for assoc in &self.associations {
            if assoc.join_columns.is_empty() {
                return Err(format!(
                    "association '{}' on '{}' has no join columns",
                    assoc.field, self.name
                ));
            }
        }
        Ok(())
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_no_action(value: &ReferentialAction) -> bool {
    *value == ReferentialAction::NoAction
}
