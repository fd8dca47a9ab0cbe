use std::path::Path;

use super::MappingEntity;
use crate::error::{ScaffoldError, ScaffoldResult};

pub fn to_yaml(entity: &MappingEntity) -> ScaffoldResult<String> {
    Ok(serde_yaml::to_string(entity)?)
}

pub fn from_yaml(path: &Path, contents: &str) -> ScaffoldResult<MappingEntity> {
    let entity: MappingEntity = serde_yaml::from_str(contents)
        .map_err(|err| ScaffoldError::invalid_mapping(path, err.to_string()))?;
    entity
        .validate()
        .map_err(|message| ScaffoldError::invalid_mapping(path, message))?;
    Ok(entity)
}
