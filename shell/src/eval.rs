use std::ffi::{CString,NulError};
use std::fs::File;
use std::io::{self,Write};
use std::os::fd::{AsRawFd,OwnedFd,RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use nix::fcntl::OFlag;
use nix::sys::signal::{self,SigHandler,Signal};
use nix::unistd::{self,ForkResult};
use tracing::{debug,warn};

use crate::builtin;
use crate::error::{ShellError,ShellResult};
use crate::expand;
use crate::job::{self,JobBuilder};
use crate::parser;
use crate::redirect;
use crate::search::SearchPath;
use crate::types::{Pipeline,Stage};

/// Outcome of a launched pipeline. `status` comes from the last stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
	pub status: i32,
	pub launched: bool,
	pub stages: Vec<job::State>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalResult {
	Empty,
	Builtin(i32),
	Pipeline(ExecutionResult),
}

impl EvalResult {
	pub fn status(&self) -> Option<i32> {
		match *self {
			EvalResult::Empty => None,
			EvalResult::Builtin(s) => Some(s),
			EvalResult::Pipeline(ref r) => Some(r.status),
		}
	}
}

/// Everything the child needs, prepared before fork so the child branch
/// does no allocation of its own.
struct Exec {
	path: CString,
	argv: Vec<CString>,
	failure: Vec<u8>,
}

impl Exec {
	fn new(stage: &Stage, path: PathBuf) -> ShellResult<Exec> {
		let nul = |_: NulError| ShellError::Exec(format!("{}: argument contains a NUL byte", stage.name()));
		let argv: Result<Vec<CString>, _> = stage.argv.iter().map(|a| CString::new(a.as_bytes())).collect();
		Ok(Exec {
			path: CString::new(path.as_os_str().as_bytes()).map_err(nul)?,
			argv: argv.map_err(nul)?,
			failure: format!("mysh: {}: ", path.display()).into_bytes(),
		})
	}
}

fn child_write(msg: &[u8]) {
	let _ = unistd::write(io::stderr(), msg);
}

fn child_exit(code: i32) -> ! {
	unsafe { libc::_exit(code) }
}

fn child_fail(exec: &Exec, e: nix::Error, code: i32) -> ! {
	child_write(&exec.failure);
	child_write(e.desc().as_bytes());
	child_write(b"\n");
	child_exit(code)
}

/// Child side of fork: restore SIGPIPE, wire stdin/stdout, close every other
/// descriptor the pipeline owns, then exec. Never returns.
fn exec_command(exec: &Exec, stdin: Option<RawFd>, stdout: Option<RawFd>, held: &[RawFd]) -> ! {
	// The runtime ignores SIGPIPE in this process and an ignored disposition
	// survives exec.
	if let Err(e) = unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) } {
		child_fail(exec, e, 1);
	}
	for &(from, to) in &[(stdin, libc::STDIN_FILENO), (stdout, libc::STDOUT_FILENO)] {
		if let Some(fd) = from {
			if let Err(e) = unistd::dup2(fd, to) {
				child_fail(exec, e, 1);
			}
		}
	}
	for &fd in held {
		if fd > libc::STDERR_FILENO {
			let _ = unistd::close(fd);
		}
	}
	match unistd::execv(&exec.path, &exec.argv) {
		Ok(never) => match never {},
		Err(e) => child_fail(exec, e, 127),
	}
}

fn report(e: ShellError) {
	eprintln!("mysh: {}", e);
}

fn spawn_commands(search_path: &SearchPath, pipeline: &Pipeline, job_builder: &mut JobBuilder) -> ShellResult<()> {
	let stages = &pipeline.stages;
	let n = stages.len();

	let mut pipes: Vec<Option<(OwnedFd, OwnedFd)>> = Vec::with_capacity(n - 1);
	for i in 0 .. n - 1 {
		let pipe = unistd::pipe2(OFlag::O_CLOEXEC).map_err(|e| ShellError::Launch { stage: i, source: e })?;
		pipes.push(Some(pipe));
	}

	for (i, stage) in stages.iter().enumerate() {
		let path = search_path.lookup(stage.name(), report)?;
		let exec = Exec::new(stage, path)?;
		let input: Option<File> = match stage.input { Some(ref r) => Some(redirect::open(r)?), None => None };
		let output: Option<File> = match stage.output { Some(ref r) => Some(redirect::open(r)?), None => None };

		let pipe_stdin = if i > 0 { pipes[i - 1].as_ref().map(|p| p.0.as_raw_fd()) } else { None };
		let pipe_stdout = if i + 1 < n { pipes[i].as_ref().map(|p| p.1.as_raw_fd()) } else { None };
		let stdin = input.as_ref().map(|f| f.as_raw_fd()).or(pipe_stdin);
		let stdout = output.as_ref().map(|f| f.as_raw_fd()).or(pipe_stdout);

		let mut held: Vec<RawFd> = pipes.iter()
			.filter_map(|p| p.as_ref())
			.flat_map(|p| vec![p.0.as_raw_fd(), p.1.as_raw_fd()])
			.collect();
		held.extend(input.iter().chain(output.iter()).map(|f| f.as_raw_fd()));

		match job_builder.push_fork().map_err(|e| ShellError::Launch { stage: i, source: e })? {
			ForkResult::Parent { child } => {
				debug!(stage = i, pid = child.as_raw(), command = stage.name(), path = ?exec.path, "spawned");
				if i > 0 {
					pipes[i - 1] = None;
				}
			},
			ForkResult::Child => exec_command(&exec, stdin, stdout, &held),
		}
	}
	Ok(())
}

/// Launches every stage left to right, then reaps them all. On any launch
/// failure the stages already running are killed and reaped before the error
/// is returned.
pub fn run_pipeline(search_path: &SearchPath, pipeline: &Pipeline) -> ShellResult<ExecutionResult> {
	let n = pipeline.stages.len();
	if n == 0 {
		return Ok(ExecutionResult { status: 0, launched: false, stages: vec![] });
	}
	debug!(stages = n, "pipeline building");

	let mut job_builder = JobBuilder::new(n);
	if let Err(e) = spawn_commands(search_path, pipeline, &mut job_builder) {
		warn!(spawned = job_builder.len(), error = %e, "pipeline aborted");
		job_builder.abort();
		return Err(e);
	}
	debug!(stages = n, "pipeline launched");

	let mut job = job_builder.build();
	job.wait();
	let stages = job.states();
	let status = stages.last().map_or(0, |s| s.code());
	debug!(status = status, "pipeline reaped");
	Ok(ExecutionResult { status: status, launched: true, stages: stages })
}

/// Tokenizes, expands and runs one input line. A lone stage naming a builtin
/// runs in this process; everything else goes through `run_pipeline`.
pub fn eval(search_path: &SearchPath, line: &str) -> ShellResult<EvalResult> {
	let pipeline = parser::parse(line)?;
	if pipeline.is_empty() {
		return Ok(EvalResult::Empty);
	}
	let pipeline = expand::expand_pipeline(&pipeline)?;

	if pipeline.stages.len() == 1 {
		let stage = &pipeline.stages[0];
		if let Some((name, func)) = builtin::match_builtin(stage.name()) {
			return builtin::run(stage, name, func).map(EvalResult::Builtin);
		}
	}
	let _ = io::stdout().flush();
	run_pipeline(search_path, &pipeline).map(EvalResult::Pipeline)
}
