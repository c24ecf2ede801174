pub mod backend;
pub mod backtrace;
pub mod env;
pub mod error;
pub mod intercept;
pub mod report;
pub mod retention;
pub mod session;
pub mod shutdown;
pub mod sysinfo;
pub mod types;

pub use backend::*;
pub use backtrace::*;
pub use error::*;
pub use intercept::*;
pub use report::*;
pub use retention::*;
pub use session::*;
pub use shutdown::*;
pub use sysinfo::*;
pub use types::*;
