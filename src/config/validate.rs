use anyhow::{Result, bail};

use super::AppConfig;

pub fn validate(cfg: &AppConfig) -> Result<()> {
    let mut errors: Vec<String> = Vec::new();

    if cfg.logging.rust_log.trim().is_empty() {
        errors.push("logging.rust_log must not be empty".to_string());
    }

    if let Some(database) = cfg.database.as_ref() {
        if database.url.trim().is_empty() {
            errors.push("database.url must not be empty".to_string());
        }

        if database.max_connections == 0 {
            errors.push("database.max_connections must be > 0".to_string());
        }

        if database.min_idle > database.max_connections {
            errors.push(format!(
                "database.min_idle ({}) must be <= database.max_connections ({})",
                database.min_idle, database.max_connections
            ));
        }

        if database.schema.trim().is_empty() {
            errors.push("database.schema must not be empty".to_string());
        }
    }

    if cfg.paths.mapping_dir.as_os_str().is_empty() {
        errors.push("paths.mapping_dir must not be empty".to_string());
    }

    if cfg.paths.entities_dir.as_os_str().is_empty() {
        errors.push("paths.entities_dir must not be empty".to_string());
    }

    if cfg.paths.mapping_dir == cfg.paths.entities_dir {
        errors.push("paths.mapping_dir and paths.entities_dir must differ".to_string());
    }

    if errors.is_empty() {
        return Ok(());
    }

    bail!("invalid scaffold config:\n- {}", errors.join("\n- "))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::validate;
    use crate::config::{AppConfig, DatabaseConfig};

    #[test]
    fn default_config_is_valid() {
        validate(&AppConfig::default()).expect("defaults should validate");
    }

    #[test]
    fn collects_every_error() {
        let mut cfg = AppConfig::default();
        cfg.database = Some(DatabaseConfig {
            url: " ".to_string(),
            max_connections: 1,
            min_idle: 4,
            schema: "public".to_string(),
        });
        cfg.paths.entities_dir = PathBuf::from("mapping");

        let err = validate(&cfg).expect_err("config should be rejected");
        let message = err.to_string();
        assert!(message.starts_with("invalid scaffold config"));
        assert!(message.contains("database.url must not be empty"));
        assert!(message.contains("database.min_idle (4)"));
        assert!(message.contains("must differ"));
    }
}
