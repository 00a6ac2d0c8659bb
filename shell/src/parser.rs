use crate::error::ParseError;
use crate::types::*;

type ParseResult<T> = Result<T, ParseError>;

/// Cursor over a borrowed line. Parsing never mutates the line; every token
/// handed out is an owned copy, so a parser may be started at any offset and
/// nested parses do not disturb each other.
pub struct Parser<'a> {
	line: &'a str,
	i: usize,
}

impl<'a> Parser<'a> {
	pub fn new(line: &'a str) -> Parser<'a> {
		Parser::with_cursor(line, 0)
	}

	/// Starts at byte offset `i`, moved back to the nearest char boundary.
	pub fn with_cursor(line: &'a str, i: usize) -> Parser<'a> {
		let mut i = i.min(line.len());
		while !line.is_char_boundary(i) {
			i -= 1;
		}
		Parser { line: line, i: i }
	}

	pub fn cursor(&self) -> usize {
		self.i
	}

	fn peek(&self) -> Option<u8> {
		self.line.as_bytes().get(self.i).cloned()
	}

	fn proceed_while<F>(&mut self, f: F) where F: Fn(u8) -> bool {
		while let Some(c) = self.peek() {
			if !f(c) { break; }
			self.i += 1;
		}
	}

	fn is_whitespace(c: u8) -> bool {
		match c {
			b' ' | b'\t' | b'\n' | b'\r' => true,
			_ => false,
		}
	}

	fn is_letter(c: u8) -> bool {
		match c {
			b'>' | b'<' | b'|' => false,
			_ => !Parser::is_whitespace(c),
		}
	}

	fn skip_whitespaces(&mut self) {
		self.proceed_while(Parser::is_whitespace);
	}

	fn read_word(&mut self) -> &'a str {
		let orig = self.i;
		self.proceed_while(Parser::is_letter);
		&self.line[orig .. self.i]
	}

	fn parse_redirect(&mut self, typ: RedirectType) -> ParseResult<Redirect> {
		self.i += if typ == RedirectType::Append { 2 } else { 1 };
		self.skip_whitespaces();
		let target = self.read_word();
		if target.is_empty() {
			return Err(ParseError::MissingRedirectTarget { operator: typ.operator() });
		}
		Ok(Redirect { target: target.into(), typ: typ })
	}

	fn parse_stage(&mut self, index: usize) -> ParseResult<Stage> {
		let mut stage = Stage::default();
		let mut saw_redirect = false;

		loop {
			self.skip_whitespaces();
			let typ = match self.peek() {
				None | Some(b'|') => { break; },
				Some(b'<') => RedirectType::Input,
				Some(b'>') => if self.line.as_bytes().get(self.i + 1) == Some(&b'>') {
					RedirectType::Append
				} else {
					RedirectType::Output
				},
				Some(_) => {
					let word = self.read_word();
					stage.argv.push(word.to_string());
					continue;
				},
			};
			let redirect = self.parse_redirect(typ)?;
			saw_redirect = true;
			if typ == RedirectType::Input {
				stage.input = Some(redirect);
			} else {
				stage.output = Some(redirect);
			}
		}

		if stage.argv.is_empty() {
			return Err(if saw_redirect {
				ParseError::MissingCommand { stage: index }
			} else {
				ParseError::EmptyStage { stage: index }
			});
		}
		Ok(stage)
	}

	pub fn parse_pipeline(&mut self) -> ParseResult<Pipeline> {
		let mut pipeline = Pipeline::default();

		self.skip_whitespaces();
		if self.peek().is_none() {
			return Ok(pipeline);
		}
		loop {
			let stage = self.parse_stage(pipeline.stages.len())?;
			pipeline.stages.push(stage);
			match self.peek() {
				Some(b'|') => { self.i += 1; },
				_ => { break; },
			}
		}
		Ok(pipeline)
	}
}

pub fn parse(line: &str) -> ParseResult<Pipeline> {
	Parser::new(line).parse_pipeline()
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::path::PathBuf;

	fn argv(stage: &Stage) -> Vec<&str> {
		stage.argv.iter().map(|s| s.as_str()).collect()
	}

	#[test]
	fn empty_line_is_noop() {
		assert!(parse("").unwrap().is_empty());
		assert!(parse("   \t\n").unwrap().is_empty());
	}

	#[test]
	fn splits_stages_on_pipes() {
		let p = parse("ls -l /tmp |  grep foo|wc -l\n").unwrap();
		assert_eq!(p.stages.len(), 3);
		assert_eq!(argv(&p.stages[0]), ["ls", "-l", "/tmp"]);
		assert_eq!(argv(&p.stages[1]), ["grep", "foo"]);
		assert_eq!(argv(&p.stages[2]), ["wc", "-l"]);
	}

	#[test]
	fn redirects_are_not_arguments() {
		let p = parse("sort < in.txt -r >> out.txt").unwrap();
		let s = &p.stages[0];
		assert_eq!(argv(s), ["sort", "-r"]);
		assert_eq!(s.input, Some(Redirect { target: PathBuf::from("in.txt"), typ: RedirectType::Input }));
		assert_eq!(s.output, Some(Redirect { target: PathBuf::from("out.txt"), typ: RedirectType::Append }));

		let p = parse("echo a b c >/tmp/f").unwrap();
		assert_eq!(argv(&p.stages[0]), ["echo", "a", "b", "c"]);
		assert_eq!(p.stages[0].output.as_ref().unwrap().typ, RedirectType::Output);
	}

	#[test]
	fn later_redirect_replaces_earlier() {
		let p = parse("cat > a > b").unwrap();
		assert_eq!(p.stages[0].output.as_ref().unwrap().target, PathBuf::from("b"));
	}

	#[test]
	fn glob_operands_of_redirects_stay_literal() {
		let p = parse("cat < *.txt").unwrap();
		assert_eq!(p.stages[0].input.as_ref().unwrap().target, PathBuf::from("*.txt"));
	}

	#[test]
	fn empty_stages_are_rejected() {
		assert_eq!(parse("| ls"), Err(ParseError::EmptyStage { stage: 0 }));
		assert_eq!(parse("ls |"), Err(ParseError::EmptyStage { stage: 1 }));
		assert_eq!(parse("ls | | wc"), Err(ParseError::EmptyStage { stage: 1 }));
		assert_eq!(parse("ls || wc"), Err(ParseError::EmptyStage { stage: 1 }));
	}

	#[test]
	fn redirect_without_operand_is_rejected() {
		assert_eq!(parse("ls >"), Err(ParseError::MissingRedirectTarget { operator: ">" }));
		assert_eq!(parse("ls >> | wc"), Err(ParseError::MissingRedirectTarget { operator: ">>" }));
		assert_eq!(parse("cat < "), Err(ParseError::MissingRedirectTarget { operator: "<" }));
	}

	#[test]
	fn redirect_only_stage_has_no_command() {
		assert_eq!(parse("ls | > out"), Err(ParseError::MissingCommand { stage: 1 }));
	}

	#[test]
	fn parsing_does_not_touch_the_line() {
		let line = String::from("a | b c");
		let first = parse(&line).unwrap();
		let second = parse(&line).unwrap();
		assert_eq!(first, second);
		assert_eq!(line, "a | b c");
	}

	#[test]
	fn parser_starts_at_given_cursor() {
		let line = "ignored words | echo hi";
		let mut parser = Parser::with_cursor(line, line.find('|').unwrap() + 1);
		let p = parser.parse_pipeline().unwrap();
		assert_eq!(p.stages.len(), 1);
		assert_eq!(argv(&p.stages[0]), ["echo", "hi"]);
		assert_eq!(parser.cursor(), line.len());
	}

	#[test]
	fn cursor_inside_a_char_steps_back() {
		let line = "\u{e9}t\u{e9} | echo hi";
		let mut parser = Parser::with_cursor(line, 1);
		assert_eq!(parser.cursor(), 0);
		let p = parser.parse_pipeline().unwrap();
		assert_eq!(p.stages.len(), 2);
		assert_eq!(argv(&p.stages[0]), ["\u{e9}t\u{e9}"]);
		assert_eq!(argv(&p.stages[1]), ["echo", "hi"]);
		assert_eq!(Parser::with_cursor(line, 4).cursor(), 3);
	}
}
