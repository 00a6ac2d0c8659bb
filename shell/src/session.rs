use std::io::{self,BufRead,Write};

use tracing::debug;

use crate::eval;
use crate::search::SearchPath;

const PROMPT: &'static [u8] = b"mysh> ";
const FAILED_PROMPT: &'static [u8] = b"!mysh> ";
const EXIT: &'static str = "exit";

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Flow { Continue, Exit }

/// Controller state carried from one input line to the next.
pub struct Session {
	search_path: SearchPath,
	last_status: i32,
}

impl Session {
	pub fn new(search_path: SearchPath) -> Session {
		Session { search_path: search_path, last_status: 0 }
	}

	pub fn last_status(&self) -> i32 {
		self.last_status
	}

	pub fn prompt(&self) -> &'static [u8] {
		if self.last_status == 0 { PROMPT } else { FAILED_PROMPT }
	}

	/// Evaluates one line. Errors are reported on stderr and never end the
	/// session; only `exit` does.
	pub fn run_line(&mut self, line: &str) -> Flow {
		if line.trim() == EXIT {
			return Flow::Exit;
		}
		match eval::eval(&self.search_path, line) {
			Ok(r) => if let Some(status) = r.status() {
				self.last_status = status;
			},
			Err(e) => {
				eprintln!("mysh: {}", e);
				self.last_status = e.status();
			},
		}
		debug!(status = self.last_status, "line done");
		Flow::Continue
	}

	/// Reads lines until EOF or `exit`. With `interactive` set a prompt is
	/// written before every line.
	pub fn run<R: BufRead>(&mut self, mut input: R, interactive: bool) -> io::Result<()> {
		let mut stdout = io::stdout();
		loop {
			if interactive {
				stdout.write_all(self.prompt())?;
				stdout.flush()?;
			}
			let mut line: Vec<u8> = vec![];
			if input.read_until(b'\n', &mut line)? == 0 {
				return Ok(());
			}
			let line = String::from_utf8_lossy(&line);
			if self.run_line(&line) == Flow::Exit {
				return Ok(());
			}
		}
	}
}
