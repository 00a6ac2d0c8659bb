use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
	#[error("empty stage at position {stage}")]
	EmptyStage { stage: usize },
	#[error("missing command in stage {stage}")]
	MissingCommand { stage: usize },
	#[error("no file specified after '{operator}'")]
	MissingRedirectTarget { operator: &'static str },
}

#[derive(Debug, Error)]
pub enum ShellError {
	#[error("parse error: {0}")]
	Parse(#[from] ParseError),
	#[error("too many arguments in stage {stage} ({count} > {limit})")]
	ArgumentOverflow { stage: usize, count: usize, limit: usize },
	#[error("command not found: {0}")]
	CommandNotFound(String),
	#[error("failed to access '{command}' in directory '{}': {source}", .dir.display())]
	ResolutionIo { dir: PathBuf, command: String, #[source] source: io::Error },
	#[error("{}: {source}", .path.display())]
	Io { path: PathBuf, #[source] source: io::Error },
	#[error("cannot launch stage {stage}: {source}")]
	Launch { stage: usize, #[source] source: nix::Error },
	#[error("exec failed: {0}")]
	Exec(String),
	#[error("{name}: {message}")]
	Builtin { name: &'static str, message: String },
}

impl ShellError {
	pub fn builtin<M: Into<String>>(name: &'static str, message: M) -> ShellError {
		ShellError::Builtin { name: name, message: message.into() }
	}

	/// Status recorded for the line when it fails before any child reports one.
	pub fn status(&self) -> i32 {
		match *self {
			ShellError::CommandNotFound(..) | ShellError::Exec(..) => 127,
			ShellError::Parse(..) | ShellError::ArgumentOverflow { .. } => 2,
			_ => 1,
		}
	}
}

pub type ShellResult<T> = Result<T, ShellError>;
