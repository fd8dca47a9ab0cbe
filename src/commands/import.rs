use std::path::PathBuf;

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use crate::{
    cli::ImportArgs,
    config::AppConfig,
    error::ScaffoldResult,
    mapping::{MappingBuilder, MappingFormat, MappingStore, TypeMap, naming::validate_ident},
    schema::Schema,
};

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub module: String,
    pub format: MappingFormat,
    pub out: PathBuf,
    pub filters: Vec<String>,
    pub excludes: Vec<String>,
    pub type_map: TypeMap,
    pub force: bool,
    pub dry_run: bool,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    /// Entity name and mapping file, in table order.
    pub files: Vec<(String, PathBuf)>,
}

/// Builds mapping entities for `schema` and persists them into the
/// module's mapping directory. Nothing is written unless every target is
/// free (or `force` is set) and every entity renders.
pub fn write_mapping(schema: &Schema, options: &ImportOptions) -> ScaffoldResult<ImportReport> {
    let store = MappingStore::new(&options.out);
    store.ensure_format(options.format)?;

    let entities = MappingBuilder::new(&options.type_map)
        .with_module(options.module.clone())
        .with_filters(options.filters.clone(), options.excludes.clone())
        .build(schema)?;

    let mut rendered = Vec::with_capacity(entities.len());
    for entity in &entities {
        let path = store.check_writable(entity, options.format, options.force)?;
        let contents = MappingStore::render(entity, options.format)?;
        rendered.push((entity, path, contents));
    }

    let mut report = ImportReport::default();
    for (entity, path, contents) in rendered {
        if !options.dry_run {
            store.write_contents(&path, &contents)?;
            debug!(entity = %entity.name, path = %path.display(), "mapping written");
        }
        report.files.push((entity.name.clone(), path));
    }
    Ok(report)
}

pub async fn run(args: ImportArgs, cfg: &AppConfig) -> anyhow::Result<()> {
    validate_ident(&args.module, "module").map_err(|err| anyhow!(err))?;

    let mut type_map = TypeMap::new();
    for pair in &args.map_types {
        let (db_type, mapping_type) = TypeMap::parse_override(pair)?;
        type_map = type_map.with_override(&db_type, mapping_type);
    }

    let schema = super::introspect_database(cfg, args.database_url.as_deref(), args.schema).await?;

    let options = ImportOptions {
        out: args
            .out
            .unwrap_or_else(|| cfg.paths.mapping_dir.join(&args.module)),
        module: args.module,
        format: args.format,
        filters: args.filters,
        excludes: args.excludes,
        type_map,
        force: args.force,
        dry_run: args.dry_run,
    };
    let report = write_mapping(&schema, &options)
        .with_context(|| format!("failed to import mapping into {}", options.out.display()))?;

    for (entity, path) in &report.files {
        if options.dry_run {
            println!("would write {}", path.display());
        } else {
            info!(entity = %entity, path = %path.display(), "mapping written");
        }
    }
    info!(
        module = %options.module,
        format = %options.format,
        entities = report.files.len(),
        dry_run = options.dry_run,
        "import finished"
    );
    Ok(())
}
