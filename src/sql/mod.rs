//! Safe SQL builder: identifiers validated and quoted, values as parameters.

mod builder;
pub mod filter;
pub mod params;
pub mod sanitize;
pub use builder::*;
pub use filter::*;
pub use params::*;
pub use sanitize::*;
