use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::mapping::MappingFormat;

#[derive(Parser)]
#[command(author, version, about = "Reverse engineer a database schema into sea-orm entities")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read the database catalog and write one mapping file per table
    Import(ImportArgs),
    /// Generate entity sources from a module's mapping files
    Convert(ConvertArgs),
    /// Print the introspected schema as JSON
    Inspect(InspectArgs),
}

#[derive(Parser, Clone, Debug)]
pub struct ImportArgs {
    /// Module the mapping belongs to (used as the directory name)
    pub module: String,
    /// Mapping file format
    #[arg(long, value_enum, default_value_t = MappingFormat::Xml)]
    pub format: MappingFormat,
    /// Database URL (overrides SCAFFOLD_DATABASE__URL)
    #[arg(long)]
    pub database_url: Option<String>,
    /// Schema to introspect on backends that have one
    #[arg(long)]
    pub schema: Option<String>,
    /// Output directory (defaults to <mapping_dir>/<module>)
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Only import entities whose name contains this string (repeatable)
    #[arg(long = "filter")]
    pub filters: Vec<String>,
    /// Skip this table (repeatable)
    #[arg(long = "exclude")]
    pub excludes: Vec<String>,
    /// Map an unknown database type, e.g. `geometry=text` (repeatable)
    #[arg(long = "map-type", value_name = "DBTYPE=TYPE")]
    pub map_types: Vec<String>,
    /// Overwrite existing mapping files
    #[arg(long)]
    pub force: bool,
    /// Show what would be written without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct ConvertArgs {
    /// Module whose mapping files are converted
    pub module: String,
    /// Mapping directory (defaults to <mapping_dir>/<module>)
    #[arg(long)]
    pub from: Option<PathBuf>,
    /// Destination directory (defaults to <entities_dir>/<module>)
    #[arg(long)]
    pub dest: Option<PathBuf>,
    /// Overwrite generated files even if they were edited
    #[arg(long)]
    pub force: bool,
    /// Show what would be written without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,
    /// Delete the mapping files after a successful conversion
    #[arg(long)]
    pub remove_mapping: bool,
}

#[derive(Parser, Clone, Debug)]
pub struct InspectArgs {
    /// Database URL (overrides SCAFFOLD_DATABASE__URL)
    #[arg(long)]
    pub database_url: Option<String>,
    /// Schema to introspect on backends that have one
    #[arg(long)]
    pub schema: Option<String>,
}
