//! Field type system: kinds, schema documents and first-sight inference.

mod field;
pub mod infer;

pub use field::*;
pub use infer::{generate_schema_from_data, infer_kind};
