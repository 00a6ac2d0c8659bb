use std::{fs,io};
use std::path::{Path,PathBuf};

use nix::unistd::{self,AccessFlags};

use crate::error::{ShellError,ShellResult};

pub const DEFAULT_DIRS: [&'static str; 6] = [
	"/usr/local/sbin", "/usr/local/bin", "/usr/sbin", "/usr/bin", "/sbin", "/bin",
];

/// Ordered directory list fixed at startup. The `PATH` environment variable
/// is never consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
	dirs: Vec<PathBuf>,
}

impl Default for SearchPath {
	fn default() -> SearchPath {
		SearchPath::new(DEFAULT_DIRS.iter().map(|d| PathBuf::from(*d)))
	}
}

enum Probe {
	Found,
	Missing,
	Failed(io::Error),
}

fn probe(candidate: &Path) -> Probe {
	match fs::metadata(candidate) {
		Ok(ref meta) if meta.is_file() => match unistd::access(candidate, AccessFlags::X_OK) {
			Ok(()) => Probe::Found,
			Err(_) => Probe::Missing,
		},
		Ok(_) => Probe::Missing,
		Err(ref e) if e.kind() == io::ErrorKind::NotFound => Probe::Missing,
		Err(e) => Probe::Failed(e),
	}
}

impl SearchPath {
	pub fn new<I: IntoIterator<Item = PathBuf>>(dirs: I) -> SearchPath {
		SearchPath { dirs: dirs.into_iter().collect() }
	}

	pub fn dirs(&self) -> &[PathBuf] {
		&self.dirs
	}

	/// Maps `command` to an executable. A directory that cannot be probed is
	/// handed to `report` and the scan moves on to the next one.
	pub fn lookup<F>(&self, command: &str, mut report: F) -> ShellResult<PathBuf>
		where F: FnMut(ShellError)
	{
		if command.contains('/') {
			let path = PathBuf::from(command);
			return match probe(&path) {
				Probe::Found => Ok(path),
				Probe::Missing => Err(ShellError::CommandNotFound(command.to_string())),
				Probe::Failed(e) => Err(ShellError::ResolutionIo {
					dir: path.parent().map_or_else(PathBuf::new, Path::to_path_buf),
					command: command.to_string(),
					source: e,
				}),
			};
		}
		for dir in &self.dirs {
			let candidate = dir.join(command);
			match probe(&candidate) {
				Probe::Found => { return Ok(candidate); },
				Probe::Missing => {},
				Probe::Failed(e) => report(ShellError::ResolutionIo {
					dir: dir.clone(),
					command: command.to_string(),
					source: e,
				}),
			}
		}
		Err(ShellError::CommandNotFound(command.to_string()))
	}
}
