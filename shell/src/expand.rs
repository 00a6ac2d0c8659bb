use std::borrow::Cow;
use std::env;
use std::path::PathBuf;

use glob::{self, MatchOptions};
use nix::unistd::{self, User};

use crate::error::{ShellError, ShellResult};
use crate::types::{Pipeline, Stage};

/// Upper bound on argv length of a single stage, command name included.
pub const MAX_ARGS: usize = 64;

const OPTIONS: MatchOptions = MatchOptions {
	case_sensitive: true,
	require_literal_separator: true,
	require_literal_leading_dot: true,
};

pub fn has_metachar(token: &str) -> bool {
	token.bytes().any(|c| c == b'*' || c == b'?' || c == b'[')
}

fn home_of(user: &str) -> Option<PathBuf> {
	if user.is_empty() {
		if let Some(home) = env::var_os("HOME").filter(|h| !h.is_empty()) {
			return Some(PathBuf::from(home));
		}
		return User::from_uid(unistd::getuid()).ok().and_then(|u| u).map(|u| u.dir);
	}
	User::from_name(user).ok().and_then(|u| u).map(|u| u.dir)
}

/// Rewrites a leading `~` or `~name` of a pattern to that home directory.
/// Unknown users leave the pattern as typed.
fn expand_tilde(pattern: &str) -> Cow<str> {
	if !pattern.starts_with('~') {
		return Cow::Borrowed(pattern);
	}
	let end = pattern.find('/').unwrap_or(pattern.len());
	match home_of(&pattern[1 .. end]) {
		Some(home) => Cow::Owned(format!("{}{}", home.to_string_lossy(), &pattern[end ..])),
		None => Cow::Borrowed(pattern),
	}
}

/// Filesystem matches of `pattern` in sorted order. Empty when nothing
/// matches or the pattern is malformed.
fn matches(pattern: &str) -> Vec<String> {
	match glob::glob_with(pattern, OPTIONS) {
		Ok(paths) => paths
			.filter_map(|p| p.ok())
			.map(|p| p.into_os_string().into_string().unwrap_or_else(|s| s.to_string_lossy().into_owned()))
			.collect(),
		Err(_) => vec![],
	}
}

/// Returns a freshly built argv for `stage`; the input stage is left alone.
pub fn expand_stage(stage: &Stage, index: usize) -> ShellResult<Stage> {
	let mut argv: Vec<String> = Vec::with_capacity(stage.argv.len());
	for token in &stage.argv {
		let found = if has_metachar(token) { matches(&expand_tilde(token)) } else { vec![] };
		if found.is_empty() {
			argv.push(token.clone());
		} else {
			argv.extend(found);
		}
		if argv.len() > MAX_ARGS {
			return Err(ShellError::ArgumentOverflow { stage: index, count: argv.len(), limit: MAX_ARGS });
		}
	}
	Ok(Stage { argv: argv, input: stage.input.clone(), output: stage.output.clone() })
}

pub fn expand_pipeline(pipeline: &Pipeline) -> ShellResult<Pipeline> {
	let stages: ShellResult<Vec<Stage>> = pipeline.stages.iter()
		.enumerate()
		.map(|(i, stage)| expand_stage(stage, i))
		.collect();
	Ok(Pipeline { stages: stages? })
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	fn stage(argv: &[&str]) -> Stage {
		Stage { argv: argv.iter().map(|s| s.to_string()).collect(), ..Stage::default() }
	}

	fn scratch(files: &[&str]) -> TempDir {
		let dir = tempfile::tempdir().unwrap();
		for f in files {
			fs::write(dir.path().join(f), b"").unwrap();
		}
		dir
	}

	#[test]
	fn no_match_passes_through() {
		let s = expand_stage(&stage(&["echo", "x*nomatch*"]), 0).unwrap();
		assert_eq!(s.argv, ["echo", "x*nomatch*"]);
	}

	#[test]
	fn matches_are_spliced_in_place() {
		let dir = scratch(&["b.txt", "a.txt", "c.log", ".hidden.txt"]);
		let pattern = format!("{}/*.txt", dir.path().display());
		let s = expand_stage(&stage(&["wc", "-l", &pattern, "--"]), 0).unwrap();
		let a = format!("{}/a.txt", dir.path().display());
		let b = format!("{}/b.txt", dir.path().display());
		assert_eq!(s.argv, vec!["wc".to_string(), "-l".to_string(), a, b, "--".to_string()]);
	}

	#[test]
	fn question_mark_and_brackets_are_patterns() {
		let dir = scratch(&["f1", "f2", "g1"]);
		let base = dir.path().display();
		let s = expand_stage(&stage(&["ls", &format!("{}/f?", base), &format!("{}/[g]1", base)]), 0).unwrap();
		assert_eq!(s.argv.len(), 4);
		assert!(s.argv[3].ends_with("/g1"));
	}

	#[test]
	fn malformed_pattern_is_literal() {
		let s = expand_stage(&stage(&["echo", "[unclosed"]), 0).unwrap();
		assert_eq!(s.argv, ["echo", "[unclosed"]);
	}

	#[test]
	fn tilde_names_a_home_directory() {
		assert_eq!(expand_tilde("~root/*.c"), "/root/*.c");
		assert_eq!(expand_tilde("~root"), "/root");
		assert_eq!(expand_tilde("~nosuchuser123/*"), "~nosuchuser123/*");
		assert_eq!(expand_tilde("a/~/*"), "a/~/*");
	}

	#[test]
	fn tilde_without_match_stays_literal() {
		let s = expand_stage(&stage(&["ls", "~nosuchuser123/*.c", "~"]), 0).unwrap();
		assert_eq!(s.argv, ["ls", "~nosuchuser123/*.c", "~"]);
	}

	#[test]
	fn overflow_names_the_stage() {
		let names: Vec<String> = (0 .. MAX_ARGS).map(|i| format!("f{:03}", i)).collect();
		let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
		let dir = scratch(&refs);
		let pattern = format!("{}/f*", dir.path().display());
		let p = Pipeline { stages: vec![stage(&["true"]), stage(&["echo", &pattern])] };
		match expand_pipeline(&p) {
			Err(ShellError::ArgumentOverflow { stage, count, limit }) => {
				assert_eq!(stage, 1);
				assert_eq!(count, MAX_ARGS + 1);
				assert_eq!(limit, MAX_ARGS);
			},
			other => panic!("unexpected {:?}", other),
		}
	}

	#[test]
	fn bound_is_inclusive() {
		let mut argv = vec!["echo"];
		argv.extend(std::iter::repeat("x").take(MAX_ARGS - 1));
		assert_eq!(expand_stage(&stage(&argv), 0).unwrap().argv.len(), MAX_ARGS);
	}
}
