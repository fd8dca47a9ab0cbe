use std::{
    collections::{BTreeSet, HashSet},
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, info};
use walkdir::WalkDir;

use super::{MappingEntity, MappingFormat, xml, yaml};
use crate::error::{ScaffoldError, ScaffoldResult};

/// Mapping files of one module, kept flat in a single directory.
#[derive(Debug, Clone)]
pub struct MappingStore {
    dir: PathBuf,
}

impl MappingStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Mapping files in name order. A missing directory has none.
    pub fn files(&self) -> ScaffoldResult<Vec<(PathBuf, MappingFormat)>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|err| {
                let path = err.path().unwrap_or(self.dir.as_path()).to_path_buf();
                let source = err
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                ScaffoldError::io(path, source)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            if let Some(format) = MappingFormat::from_file_name(&name) {
                files.push((entry.path().to_path_buf(), format));
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn formats(&self) -> ScaffoldResult<BTreeSet<MappingFormat>> {
        Ok(self.files()?.into_iter().map(|(_, format)| format).collect())
    }

    /// Fails when the directory already holds files of another format.
    pub fn ensure_format(&self, requested: MappingFormat) -> ScaffoldResult<()> {
        match self
            .formats()?
            .into_iter()
            .find(|format| *format != requested)
        {
            Some(existing) => Err(ScaffoldError::ConflictingMappingFormat {
                dir: self.dir.clone(),
                existing,
                requested,
            }),
            None => Ok(()),
        }
    }

    pub fn path_for(&self, entity: &MappingEntity, format: MappingFormat) -> PathBuf {
        self.dir.join(entity.file_name(format))
    }

    pub fn render(entity: &MappingEntity, format: MappingFormat) -> ScaffoldResult<String> {
        match format {
            MappingFormat::Xml => xml::to_xml(entity),
            MappingFormat::Yaml => yaml::to_yaml(entity),
        }
    }

    pub fn write(
        &self,
        entity: &MappingEntity,
        format: MappingFormat,
        overwrite: bool,
    ) -> ScaffoldResult<PathBuf> {
        let path = self.check_writable(entity, format, overwrite)?;
        let contents = Self::render(entity, format)?;
        self.write_contents(&path, &contents)?;
        debug!(path = %path.display(), entity = %entity.name, "wrote mapping file");
        Ok(path)
    }

    /// Target path for `entity`, or `FileExists` when it is taken and
    /// `overwrite` is off.
    pub fn check_writable(
        &self,
        entity: &MappingEntity,
        format: MappingFormat,
        overwrite: bool,
    ) -> ScaffoldResult<PathBuf> {
        let path = self.path_for(entity, format);
        if path.exists() && !overwrite {
            return Err(ScaffoldError::FileExists { path });
        }
        Ok(path)
    }

    pub fn write_contents(&self, path: &Path, contents: &str) -> ScaffoldResult<()> {
        fs::create_dir_all(&self.dir).map_err(|err| ScaffoldError::io(&self.dir, err))?;
        fs::write(path, contents).map_err(|err| ScaffoldError::io(path, err))
    }

    pub fn load_all(&self) -> ScaffoldResult<Vec<MappingEntity>> {
        let files = self.files()?;
        if files.is_empty() {
            return Err(ScaffoldError::NoMappingFiles {
                dir: self.dir.clone(),
            });
        }
        let formats: BTreeSet<_> = files.iter().map(|(_, format)| *format).collect();
        if formats.len() > 1 {
            let names = files
                .iter()
                .filter_map(|(path, _)| path.file_name())
                .map(|name| name.to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ScaffoldError::MixedMappingFormats {
                dir: self.dir.clone(),
                files: names,
            });
        }

        let mut seen = HashSet::new();
        let mut entities = Vec::with_capacity(files.len());
        for (path, format) in files {
            let contents = fs::read_to_string(&path).map_err(|err| ScaffoldError::io(&path, err))?;
            let entity = match format {
                MappingFormat::Xml => xml::from_xml(&path, &contents)?,
                MappingFormat::Yaml => yaml::from_yaml(&path, &contents)?,
            };
            if !seen.insert(entity.name.clone()) {
                return Err(ScaffoldError::DuplicateEntity { name: entity.name });
            }
            entities.push(entity);
        }
        Ok(entities)
    }

    /// Deletes every mapping file and returns how many were removed.
    pub fn remove_all(&self) -> ScaffoldResult<usize> {
        let files = self.files()?;
        for (path, _) in &files {
            fs::remove_file(path).map_err(|err| ScaffoldError::io(path, err))?;
        }
        info!(dir = %self.dir.display(), removed = files.len(), "removed mapping files");
        Ok(files.len())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::MappingStore;
    use crate::{
        error::ScaffoldError,
        mapping::{FieldMapping, MappingEntity, MappingFormat, MappingType},
    };

    fn entity(name: &str, table: &str) -> MappingEntity {
        let mut entity = MappingEntity::new(name, table);
        entity
            .identifiers
            .push(FieldMapping::new("id", "id", MappingType::Integer));
        entity
    }

    #[test]
    fn missing_directory_has_no_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MappingStore::new(dir.path().join("nope"));
        assert!(store.files().expect("files").is_empty());
        assert!(matches!(
            store.load_all(),
            Err(ScaffoldError::NoMappingFiles { .. })
        ));
    }

    #[test]
    fn write_refuses_to_overwrite_without_flag() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MappingStore::new(dir.path());
        let post = entity("BlogPost", "blog_post");

        let path = store
            .write(&post, MappingFormat::Xml, false)
            .expect("first write");
        assert!(path.ends_with("BlogPost.orm.xml"));
        assert!(matches!(
            store.write(&post, MappingFormat::Xml, false),
            Err(ScaffoldError::FileExists { .. })
        ));
        store
            .write(&post, MappingFormat::Xml, true)
            .expect("overwrite");
    }

    #[test]
    fn detects_format_conflicts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MappingStore::new(dir.path());
        store
            .write(&entity("BlogPost", "blog_post"), MappingFormat::Yaml, false)
            .expect("write yaml");

        store.ensure_format(MappingFormat::Yaml).expect("same format");
        let err = store
            .ensure_format(MappingFormat::Xml)
            .expect_err("other format should conflict");
        assert!(matches!(
            err,
            ScaffoldError::ConflictingMappingFormat {
                existing: MappingFormat::Yaml,
                requested: MappingFormat::Xml,
                ..
            }
        ));
    }

    #[test]
    fn load_all_rejects_mixed_formats() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MappingStore::new(dir.path());
        store
            .write(&entity("BlogPost", "blog_post"), MappingFormat::Yaml, false)
            .expect("write yaml");
        store
            .write(&entity("BlogComment", "blog_comment"), MappingFormat::Xml, false)
            .expect("write xml");

        let err = store.load_all().expect_err("mixed formats");
        assert!(matches!(err, ScaffoldError::MixedMappingFormats { .. }));
        assert!(err.to_string().contains("BlogPost.orm.yml"));

        assert_eq!(store.remove_all().expect("remove"), 2);
        assert!(store.files().expect("files").is_empty());
    }

    #[test]
    fn load_all_rejects_duplicate_entities() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = MappingStore::new(dir.path());
        store
            .write(&entity("BlogPost", "blog_post"), MappingFormat::Yaml, false)
            .expect("write yaml");
        let copy = fs::read_to_string(dir.path().join("BlogPost.orm.yml")).expect("read");
        fs::write(dir.path().join("Copy.orm.yaml"), copy).expect("write copy");

        let err = store.load_all().expect_err("duplicate entity");
        assert!(matches!(err, ScaffoldError::DuplicateEntity { name } if name == "BlogPost"));
    }

    #[test]
    fn ignores_unrelated_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("README.md"), "notes").expect("write");
        let store = MappingStore::new(dir.path());
        store
            .write(&entity("Tag", "tag"), MappingFormat::Xml, false)
            .expect("write xml");

        let loaded = store.load_all().expect("load");
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].table, "tag");
    }
}
