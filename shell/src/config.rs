use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::search::SearchPath;

/// Filter directives for diagnostics, e.g. `MYSH_LOG=debug`.
pub const LOG_ENV: &'static str = "MYSH_LOG";
const DEFAULT_LOG: &'static str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
	Interactive,
	Batch(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub mode: Mode,
	pub search_path: SearchPath,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
	#[error("Usage: {program} [batch_file]")]
	Usage { program: String },
}

impl Config {
	/// Reads the process arguments, program name first.
	pub fn from_args<I: IntoIterator<Item = OsString>>(args: I) -> Result<Config, ConfigError> {
		let mut args = args.into_iter();
		let program = args.next()
			.map_or_else(|| "mysh".to_string(), |p| p.to_string_lossy().into_owned());
		let rest: Vec<OsString> = args.collect();
		let mode = match rest.len() {
			0 => Mode::Interactive,
			1 => Mode::Batch(PathBuf::from(&rest[0])),
			_ => { return Err(ConfigError::Usage { program: program }); },
		};
		Ok(Config { mode: mode, search_path: SearchPath::default() })
	}

	pub fn is_interactive(&self) -> bool {
		self.mode == Mode::Interactive
	}
}

/// Installs the stderr log subscriber. Safe to call more than once.
pub fn init_logging() {
	let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG));
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_target(false)
		.try_init();
}
