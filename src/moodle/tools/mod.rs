pub mod client;
pub mod cohorts;
pub mod courses;
pub mod env;
pub mod error;
pub mod flatten;
pub mod io;
pub mod model;
pub mod response;

pub use error::{RemoteApiError, Result, ToolError};
