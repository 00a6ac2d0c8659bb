pub mod builtin;
pub mod config;
pub mod error;
pub mod eval;
pub mod expand;
pub mod job;
pub mod parser;
pub mod redirect;
pub mod search;
pub mod session;
pub mod types;

pub use crate::error::{ParseError,ShellError,ShellResult};
pub use crate::eval::{eval,run_pipeline,EvalResult,ExecutionResult};
pub use crate::search::SearchPath;
pub use crate::session::Session;
