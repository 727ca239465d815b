pub mod api;
pub mod config;
pub mod error;
pub mod error_utils;
pub mod policy;
pub mod types;
pub mod window;

pub use api::*;
pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use policy::*;
pub use types::*;
pub use window::*;
