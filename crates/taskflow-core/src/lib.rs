pub mod config;
pub mod error;
pub mod logging;
pub mod result;
pub mod traits;

pub use config::TaskflowConfig;
pub use error::{TaskflowError, VersionConflict};
pub use logging::{Activity, LogEntry, Loggable};
pub use result::TaskflowResult;
pub use traits::Editable;
