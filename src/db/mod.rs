pub mod connection;
pub mod introspect;
pub mod providers;

pub use connection::{Connected, connect};
pub use introspect::IntrospectOptions;
