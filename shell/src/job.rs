use std::mem;

use nix::errno::Errno;
use nix::sys::signal::{self,Signal};
use nix::sys::wait::{self,WaitStatus};
use nix::unistd::{self,ForkResult,Pid};
use tracing::{debug,warn};

/// Lifecycle of one spawned stage. A stage that has not been forked yet has
/// no `Process` at all.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum State {
	Running,
	Exited(i32),
	Signaled(Signal),
}

impl State {
	pub fn is_terminated(self) -> bool {
		self != State::Running
	}

	/// Shell-style status: the exit code, or 128 + signal number.
	pub fn code(self) -> i32 {
		match self {
			State::Running => 0,
			State::Exited(code) => code,
			State::Signaled(sig) => 128 + sig as i32,
		}
	}
}

trait WaitStatusExt {
	fn state(self) -> Option<State>;
}

impl WaitStatusExt for WaitStatus {
	fn state(self) -> Option<State> {
		match self {
			WaitStatus::Exited(_, code) => Some(State::Exited(code)),
			WaitStatus::Signaled(_, sig, _) => Some(State::Signaled(sig)),
			_ => None,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Process {
	pub pid: Pid,
	pub state: State,
}

impl Process {
	fn reap(&mut self) {
		while !self.state.is_terminated() {
			match wait::waitpid(self.pid, None) {
				Ok(status) => if let Some(state) = status.state() {
					self.state = state;
				},
				Err(Errno::EINTR) => {},
				Err(e) => {
					warn!(pid = self.pid.as_raw(), error = %e, "lost track of child");
					self.state = State::Exited(1);
				},
			}
		}
		debug!(pid = self.pid.as_raw(), status = self.state.code(), "reaped");
	}

	fn terminate(&mut self) {
		if self.state.is_terminated() {
			return;
		}
		match signal::kill(self.pid, Signal::SIGKILL) {
			Ok(()) | Err(Errno::ESRCH) => {},
			Err(e) => warn!(pid = self.pid.as_raw(), error = %e, "kill failed"),
		}
		self.reap();
	}
}

/// Collects children while a pipeline is being launched. Dropping a builder
/// before `build` kills and reaps everything it spawned.
#[derive(Debug)]
pub struct JobBuilder {
	processes: Vec<Process>,
}

impl JobBuilder {
	pub fn new(size_hint: usize) -> JobBuilder {
		JobBuilder { processes: Vec::with_capacity(size_hint) }
	}

	pub fn len(&self) -> usize {
		self.processes.len()
	}

	pub fn push_fork(&mut self) -> nix::Result<ForkResult> {
		// SAFETY: the controller runs no other threads, and the child branch
		// only rewires descriptors before it execs or exits.
		let r = unsafe { unistd::fork() }?;
		if let ForkResult::Parent { child } = r {
			self.processes.push(Process { pid: child, state: State::Running });
		}
		Ok(r)
	}

	pub fn abort(&mut self) {
		if !self.processes.is_empty() {
			warn!(count = self.processes.len(), "terminating partially launched pipeline");
		}
		for pr in &mut self.processes {
			pr.terminate();
		}
		self.processes.clear();
	}

	pub fn build(mut self) -> Job {
		Job { processes: mem::replace(&mut self.processes, vec![]) }
	}
}

impl Drop for JobBuilder {
	fn drop(&mut self) {
		self.abort();
	}
}

/// A fully launched pipeline, in spawn order.
#[derive(Debug)]
pub struct Job {
	processes: Vec<Process>,
}

impl Job {
	/// Blocks until every child has terminated, reaping left to right.
	pub fn wait(&mut self) {
		for pr in &mut self.processes {
			pr.reap();
		}
	}

	pub fn states(&self) -> Vec<State> {
		self.processes.iter().map(|pr| pr.state).collect()
	}
}

impl Drop for Job {
	fn drop(&mut self) {
		self.wait();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn spawn_exit(builder: &mut JobBuilder, code: i32) {
		match builder.push_fork().unwrap() {
			ForkResult::Parent { .. } => {},
			ForkResult::Child => unsafe { libc::_exit(code) },
		}
	}

	#[test]
	fn status_codes() {
		assert_eq!(State::Exited(3).code(), 3);
		assert_eq!(State::Signaled(Signal::SIGKILL).code(), 137);
		assert!(!State::Running.is_terminated());
	}

	#[test]
	fn wait_reaps_in_spawn_order() {
		let mut builder = JobBuilder::new(3);
		spawn_exit(&mut builder, 0);
		spawn_exit(&mut builder, 4);
		spawn_exit(&mut builder, 9);
		let mut job = builder.build();
		job.wait();
		assert_eq!(job.states(), vec![State::Exited(0), State::Exited(4), State::Exited(9)]);
	}

	#[test]
	fn dropped_builder_kills_its_children() {
		let mut builder = JobBuilder::new(1);
		match builder.push_fork().unwrap() {
			ForkResult::Parent { .. } => {},
			ForkResult::Child => loop {
				unsafe { libc::pause(); }
			},
		}
		let pid = builder.processes[0].pid;
		drop(builder);
		assert_eq!(wait::waitpid(pid, None), Err(Errno::ECHILD));
	}
}
