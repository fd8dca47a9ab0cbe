pub const DEFAULT_RUST_LOG: &str = "info,sqlx=warn";
pub const DEFAULT_DB_MAX_CONNECTIONS: i64 = 2;
pub const DEFAULT_DB_MIN_IDLE: i64 = 1;
pub const DEFAULT_DB_SCHEMA: &str = "public";
pub const DEFAULT_MAPPING_DIR: &str = "mapping";
pub const DEFAULT_ENTITIES_DIR: &str = "src/entities";
