use std::path::PathBuf;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output, Append }

impl RedirectType {
	pub fn operator(self) -> &'static str {
		match self {
			RedirectType::Input => "<",
			RedirectType::Output => ">",
			RedirectType::Append => ">>",
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redirect {
	pub target: PathBuf,
	pub typ: RedirectType,
}

/// One command of a pipeline. `argv[0]` is the command name exactly as typed.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Stage {
	pub argv: Vec<String>,
	pub input: Option<Redirect>,
	pub output: Option<Redirect>,
}

impl Stage {
	pub fn name(&self) -> &str {
		self.argv.first().map_or("", |s| s.as_str())
	}
}

/// Stages connected left to right by anonymous pipes. Never empty once parsed.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Pipeline {
	pub stages: Vec<Stage>,
}

impl Pipeline {
	pub fn is_empty(&self) -> bool {
		self.stages.is_empty()
	}
}
