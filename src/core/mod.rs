pub mod context;
pub mod engine;
pub mod registry;
pub mod resolution;
pub mod source_model;
pub mod validation;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
