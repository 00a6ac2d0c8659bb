use std::fs::{self,File};
use std::io::{self,Write};
use std::os::fd::{AsRawFd,FromRawFd,OwnedFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path,PathBuf};

use nix::fcntl::{self,FcntlArg};
use nix::unistd;
use tracing::debug;

use crate::error::{ShellError,ShellResult};
use crate::types::{Redirect,RedirectType};

const CREATE_MODE: u32 = 0o600;

fn io_error<E: Into<io::Error>>(path: &Path, e: E) -> ShellError {
	ShellError::Io { path: path.to_path_buf(), source: e.into() }
}

pub fn open_output(path: &Path, append: bool) -> ShellResult<File> {
	let mut oopt = fs::OpenOptions::new();
	oopt.write(true).create(true).mode(CREATE_MODE);
	if append {
		oopt.append(true);
	} else {
		oopt.truncate(true);
	}
	oopt.open(path).map_err(|e| io_error(path, e))
}

/// Opens the file behind a parsed redirection. The descriptor is
/// close-on-exec like every std `File`.
pub fn open(redirect: &Redirect) -> ShellResult<File> {
	match redirect.typ {
		RedirectType::Input => File::open(&redirect.target).map_err(|e| io_error(&redirect.target, e)),
		RedirectType::Output => open_output(&redirect.target, false),
		RedirectType::Append => open_output(&redirect.target, true),
	}
}

/// Points the process's standard output at a file until released. The
/// previous stdout comes back when the handle is dropped, whichever way the
/// holder exits.
#[derive(Debug)]
pub struct StdoutRedirect {
	saved: OwnedFd,
	path: PathBuf,
}

impl StdoutRedirect {
	pub fn acquire(path: &Path, append: bool) -> ShellResult<StdoutRedirect> {
		let file = open_output(path, append)?;
		let _ = io::stdout().flush();
		let saved = fcntl::fcntl(libc::STDOUT_FILENO, FcntlArg::F_DUPFD_CLOEXEC(3))
			.map_err(|e| io_error(path, e))?;
		// SAFETY: `saved` was just returned by fcntl and is owned by no one else.
		let saved = unsafe { OwnedFd::from_raw_fd(saved) };
		unistd::dup2(file.as_raw_fd(), libc::STDOUT_FILENO).map_err(|e| io_error(path, e))?;
		debug!(path = %path.display(), "stdout redirected");
		Ok(StdoutRedirect { saved: saved, path: path.to_path_buf() })
	}

	pub fn release(self) {
		drop(self)
	}
}

impl Drop for StdoutRedirect {
	fn drop(&mut self) {
		let _ = io::stdout().flush();
		if let Err(e) = unistd::dup2(self.saved.as_raw_fd(), libc::STDOUT_FILENO) {
			eprintln!("mysh: failed to restore stdout after '{}': {}", self.path.display(), e);
		}
		debug!(path = %self.path.display(), "stdout restored");
	}
}
