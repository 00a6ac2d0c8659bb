use std::{env,fs,io,process};
use std::io::{BufRead,Write};
use std::path::Path;

use mysh::config::{self,Config,Mode};
use mysh::Session;

fn open_batch(path: &Path) -> io::Result<fs::File> {
	let file = fs::File::open(path)?;
	if file.metadata()?.is_dir() {
		return Err(io::Error::new(io::ErrorKind::InvalidInput, "is a directory"));
	}
	Ok(file)
}

fn main() {
	config::init_logging();

	let config = match Config::from_args(env::args_os()) {
		Ok(c) => c,
		Err(e) => {
			eprintln!("{}", e);
			process::exit(1);
		},
	};

	let stdin = io::stdin();
	let input: Box<dyn BufRead> = match config.mode {
		Mode::Interactive => Box::new(stdin.lock()),
		Mode::Batch(ref path) => match open_batch(path) {
			Ok(f) => Box::new(io::BufReader::new(f)),
			Err(_) => {
				eprintln!("Error: Cannot open file '{}'", path.display());
				process::exit(1);
			},
		},
	};

	let interactive = config.is_interactive();
	let mut stdout = io::stdout();
	if interactive {
		let _ = writeln!(stdout, "Welcome to my shell!");
	}
	let mut session = Session::new(config.search_path);
	if let Err(e) = session.run(input, interactive) {
		eprintln!("mysh: {}", e);
	}
	if interactive {
		let _ = writeln!(stdout, "mysh: exiting");
	}
}
