use std::{env,fs,io};
use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;

use crate::error::{ShellError,ShellResult};
use crate::redirect::StdoutRedirect;
use crate::types::{RedirectType,Stage};

pub type Builtin = fn(&[String], &mut dyn Write) -> ShellResult<()>;

fn write_error(name: &'static str, e: io::Error) -> ShellError {
	ShellError::builtin(name, e.to_string())
}

fn home_dir() -> OsString {
	match env::var_os("HOME") {
		Some(ref home) if !home.is_empty() => home.clone(),
		_ => OsString::from("/"),
	}
}

pub fn builtin_cd(args: &[String], _: &mut dyn Write) -> ShellResult<()> {
	if args.len() > 2 {
		return Err(ShellError::builtin("cd", "too many arguments"));
	}
	let target = match args.get(1) {
		None => PathBuf::from(home_dir()),
		Some(path) if path.starts_with('~') => {
			let mut expanded = home_dir();
			expanded.push(&path[1..]);
			PathBuf::from(expanded)
		},
		Some(path) => PathBuf::from(path),
	};
	env::set_current_dir(&target)
		.map_err(|e| ShellError::builtin("cd", format!("{}: {}", target.display(), e)))
}

pub fn builtin_pwd(args: &[String], out: &mut dyn Write) -> ShellResult<()> {
	if args.len() > 1 {
		return Err(ShellError::builtin("pwd", "too many arguments"));
	}
	let cwd = env::current_dir().map_err(|e| write_error("pwd", e))?;
	writeln!(out, "{}", cwd.display()).map_err(|e| write_error("pwd", e))
}

fn echo_word(arg: &str) -> Option<String> {
	if arg.len() > 1 && arg.starts_with('$') {
		env::var_os(&arg[1..]).map(|v| v.to_string_lossy().into_owned())
	} else {
		Some(arg.to_string())
	}
}

pub fn builtin_echo(args: &[String], out: &mut dyn Write) -> ShellResult<()> {
	let words: Vec<String> = args.iter().skip(1).filter_map(|a| echo_word(a)).collect();
	writeln!(out, "{}", words.join(" ")).map_err(|e| write_error("echo", e))
}

pub fn builtin_cat(args: &[String], out: &mut dyn Write) -> ShellResult<()> {
	if args.len() < 2 {
		return Err(ShellError::builtin("cat", "no input file specified"));
	}
	for name in &args[1..] {
		let mut file = fs::File::open(name)
			.map_err(|e| ShellError::builtin("cat", format!("failed to open file '{}': {}", name, e)))?;
		io::copy(&mut file, out).map_err(|e| write_error("cat", e))?;
	}
	Ok(())
}

pub fn builtin_ls(args: &[String], out: &mut dyn Write) -> ShellResult<()> {
	if args.len() > 1 {
		return Err(ShellError::builtin("ls", "ls command does not accept arguments"));
	}
	let mut names: Vec<String> = vec![];
	for entry in fs::read_dir(".").map_err(|e| write_error("ls", e))? {
		let name = entry.map_err(|e| write_error("ls", e))?.file_name().to_string_lossy().into_owned();
		if !name.starts_with('.') {
			names.push(name);
		}
	}
	names.sort();
	for name in names {
		writeln!(out, "{}", name).map_err(|e| write_error("ls", e))?;
	}
	Ok(())
}

pub fn match_builtin(name: &str) -> Option<(&'static str, Builtin)> {
	match name {
		"cd" => Some(("cd", builtin_cd as Builtin)),
		"pwd" => Some(("pwd", builtin_pwd as Builtin)),
		"echo" => Some(("echo", builtin_echo as Builtin)),
		"cat" => Some(("cat", builtin_cat as Builtin)),
		"ls" => Some(("ls", builtin_ls as Builtin)),
		_ => None,
	}
}

/// Runs a builtin in this process. An output redirection holds stdout only
/// for the duration of the call.
pub fn run(stage: &Stage, name: &'static str, builtin: Builtin) -> ShellResult<i32> {
	if stage.input.is_some() {
		return Err(ShellError::builtin(name, "input redirection is not supported"));
	}
	let guard = match stage.output {
		Some(ref r) => Some(StdoutRedirect::acquire(&r.target, r.typ == RedirectType::Append)?),
		None => None,
	};
	let r = {
		let stdout = io::stdout();
		let mut out = stdout.lock();
		let r = builtin(&stage.argv, &mut out);
		let _ = out.flush();
		r
	};
	if let Some(guard) = guard {
		guard.release();
	}
	r.map(|()| 0)
}
