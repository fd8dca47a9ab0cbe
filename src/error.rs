use std::path::PathBuf;

use sea_orm::DbErr;

use crate::mapping::MappingFormat;

#[derive(Debug, thiserror::Error)]
pub enum ScaffoldError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),

    #[error(
        "table '{table}' has no primary key; reverse engineering requires every table to have one"
    )]
    MissingPrimaryKey { table: String },

    #[error(
        "unknown database type '{data_type}' for column {table}.{column}; map it with --map-type {data_type}=<type>"
    )]
    UnknownColumnType {
        table: String,
        column: String,
        data_type: String,
    },

    #[error("unknown mapping type '{0}'")]
    UnknownMappingType(String),

    #[error(
        "{} already contains {existing} mapping files; delete them before importing as {requested}",
        dir.display()
    )]
    ConflictingMappingFormat {
        dir: PathBuf,
        existing: MappingFormat,
        requested: MappingFormat,
    },

    #[error(
        "{} mixes mapping formats ({files}); a module may only use one format, delete the superseded files",
        dir.display()
    )]
    MixedMappingFormats { dir: PathBuf, files: String },

    #[error("no mapping files found in {}", dir.display())]
    NoMappingFiles { dir: PathBuf },

    #[error("entity '{name}' is defined more than once")]
    DuplicateEntity { name: String },

    #[error("invalid mapping in {}: {message}", path.display())]
    InvalidMapping { path: PathBuf, message: String },

    #[error("file already exists (use --force to overwrite): {}", path.display())]
    FileExists { path: PathBuf },

    #[error("{} was modified since it was generated (use --force to overwrite)", path.display())]
    ModifiedFile { path: PathBuf },

    #[error("template error: {0}")]
    Template(String),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("xml error: {0}")]
    Xml(String),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type ScaffoldResult<T> = Result<T, ScaffoldError>;

impl ScaffoldError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_mapping(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidMapping {
            path: path.into(),
            message: message.into(),
        }
    }
}
