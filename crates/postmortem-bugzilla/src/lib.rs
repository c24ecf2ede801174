pub mod models;
pub mod query;
pub mod record;

pub use models::*;
pub use query::*;
pub use record::*;
