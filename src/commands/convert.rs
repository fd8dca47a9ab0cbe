use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use crate::{
    cli::ConvertArgs,
    codegen::{Manifest, module_name, render_entity, update_entities_mod},
    config::AppConfig,
    error::{ScaffoldError, ScaffoldResult},
    mapping::{
        MappingEntity, MappingStore,
        naming::validate_ident,
    },
};

#[derive(Debug, Clone)]
pub struct ConvertOptions {
    pub from: PathBuf,
    pub dest: PathBuf,
    pub force: bool,
    pub dry_run: bool,
    pub remove_mapping: bool,
}

#[derive(Debug, Default)]
pub struct ConvertReport {
    pub files: Vec<PathBuf>,
    pub mod_file: Option<PathBuf>,
    pub removed_mappings: usize,
}

/// Generates one entity file per mapping file. Every target is checked
/// against the manifest before anything is written.
pub fn convert(options: &ConvertOptions) -> ScaffoldResult<ConvertReport> {
    let store = MappingStore::new(&options.from);
    let entities = store.load_all()?;
    let known: HashMap<String, &MappingEntity> = entities
        .iter()
        .map(|entity| (entity.name.clone(), entity))
        .collect();

    let mut manifest = Manifest::load(&options.dest)?;
    let mut rendered = Vec::with_capacity(entities.len());
    for entity in &entities {
        let module = module_name(&entity.name);
        let relative = format!("{module}.rs");
        manifest.check_writable(&options.dest, &relative, options.force)?;
        let source = render_entity(entity, &known)?;
        rendered.push((entity, module, relative, source));
    }

    let mod_path = options.dest.join("mod.rs");
    let mut mod_contents = read_optional(&mod_path)?;
    let mut mod_changed = false;
    for (entity, module, _, _) in &rendered {
        let (updated, changed) = update_entities_mod(&mod_contents, module, &entity.name)?;
        mod_contents = updated;
        mod_changed |= changed;
    }

    let mut report = ConvertReport {
        files: rendered
            .iter()
            .map(|(_, _, relative, _)| options.dest.join(relative))
            .collect(),
        mod_file: mod_changed.then(|| mod_path.clone()),
        removed_mappings: 0,
    };
    if options.dry_run {
        return Ok(report);
    }

    fs::create_dir_all(&options.dest).map_err(|err| ScaffoldError::io(&options.dest, err))?;
    for (entity, _, relative, source) in &rendered {
        let path = options.dest.join(relative);
        fs::write(&path, source).map_err(|err| ScaffoldError::io(&path, err))?;
        manifest.record(relative, &entity.name, &entity.table, source);
        debug!(entity = %entity.name, path = %path.display(), "entity written");
    }
    if mod_changed {
        fs::write(&mod_path, &mod_contents).map_err(|err| ScaffoldError::io(&mod_path, err))?;
    }
    manifest.save(&options.dest)?;

    if options.remove_mapping {
        report.removed_mappings = store.remove_all()?;
    }
    Ok(report)
}

fn read_optional(path: &Path) -> ScaffoldResult<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    fs::read_to_string(path).map_err(|err| ScaffoldError::io(path, err))
}

pub fn run(args: ConvertArgs, cfg: &AppConfig) -> anyhow::Result<()> {
    validate_ident(&args.module, "module").map_err(|err| anyhow!(err))?;

    let options = ConvertOptions {
        from: args
            .from
            .unwrap_or_else(|| cfg.paths.mapping_dir.join(&args.module)),
        dest: args
            .dest
            .unwrap_or_else(|| cfg.paths.entities_dir.join(&args.module)),
        force: args.force,
        dry_run: args.dry_run,
        remove_mapping: args.remove_mapping,
    };
    let report = convert(&options).with_context(|| {
        format!(
            "failed to convert {} into {}",
            options.from.display(),
            options.dest.display()
        )
    })?;

    if options.dry_run {
        for path in report.files.iter().chain(report.mod_file.iter()) {
            println!("would write {}", path.display());
        }
    }
    info!(
        module = %args.module,
        entities = report.files.len(),
        mod_updated = report.mod_file.is_some(),
        removed_mappings = report.removed_mappings,
        dry_run = options.dry_run,
        "convert finished"
    );
    Ok(())
}
