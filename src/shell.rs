// SPDX-License-Identifier: GPL-2.0

//! Shell state, the built-in registry and the built-in commands.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use log::{info, warn};
use once_cell::sync::Lazy;

use crate::error::Error;
use crate::exec;
use crate::fs::FatVolume;
use crate::history::History;
use crate::parser;

/// Name of the volume image file under the project root
pub const IMAGE_FILE: &str = "mysh_fs.img";
/// Name of the history file under the project root
pub const HISTORY_FILE: &str = ".mysh_history";

/// Commands handled in-process instead of being spawned.
static BUILTINS: Lazy<BTreeSet<&'static str>> = Lazy::new(|| {
	BTreeSet::from([
		"cat", "cd", "exit", "grep", "head", "help", "history", "import", "jobs", "ls",
		"mkdir", "mv", "pwd", "rm", "rmdir", "tail", "touch",
	])
});

pub fn is_builtin(cmd: &str) -> bool {
	BUILTINS.contains(cmd)
}

/// Interactive shell state: the volume, the history and the project root
/// they are persisted under.
pub struct Shell {
	pub(crate) volume: FatVolume,
	pub(crate) history: History,
	pub(crate) root: PathBuf,
}

impl Shell {
	pub fn new(root: PathBuf) -> Self {
		let volume = FatVolume::load_or_create(&root.join(IMAGE_FILE));
		let history = History::load(&root.join(HISTORY_FILE));
		Self {
			volume,
			history,
			root,
		}
	}

	/// Records a submitted line in the history.
	pub fn record(&mut self, line: &str) {
		self.history.add(line);
	}

	/// Parses and executes one input line.
	pub fn run_line(&mut self, line: &str) {
		let stages = parser::parse_pipeline(line);
		exec::execute_pipeline(self, &stages);
	}

	/// Current directory path shown in the prompt.
	pub fn prompt_path(&self) -> String {
		self.volume.cwd_path()
	}

	/// Persists history and volume at clean shutdown.
	pub fn shutdown(&mut self) {
		if let Err(err) = self.history.save(&self.root.join(HISTORY_FILE)) {
			warn!("failed to save history: {}", err);
		}
		self.save_image();
	}

	fn save_image(&self) {
		let path = self.root.join(IMAGE_FILE);
		if let Err(err) = self.volume.save(&path) {
			warn!("failed to save volume image: {}", err);
		}
	}

	/// Dispatches a built-in command, returning its exit status.
	pub(crate) fn do_builtin(&mut self, argv: &[String]) -> i32 {
		let args = &argv[1..];
		match argv[0].as_str() {
			"cd" => self.cmd_cd(args),
			"pwd" => self.cmd_pwd(),
			"ls" => self.cmd_ls(args),
			"cat" => self.cmd_cat(args),
			"grep" => self.cmd_grep(args),
			"mkdir" => self.cmd_mkdir(args),
			"touch" => self.cmd_touch(args),
			"rm" => self.cmd_rm(args),
			"rmdir" => self.cmd_rmdir(args),
			"mv" => self.cmd_mv(args),
			"head" => self.cmd_head(args),
			"tail" => self.cmd_tail(args),
			"history" => self.cmd_history(),
			"jobs" => self.cmd_jobs(),
			"help" => self.cmd_help(),
			"import" => self.cmd_import(args),
			"exit" => self.cmd_exit(),
			_ => 1,
		}
	}

	fn cmd_cd(&mut self, args: &[String]) -> i32 {
		let path = args.first().map(String::as_str).unwrap_or("/");
		match self.volume.cd(path) {
			Ok(()) => 0,
			Err(err) => {
				eprintln!("cd: {}: {}", path, err);
				1
			}
		}
	}

	fn cmd_pwd(&self) -> i32 {
		println!("{}", self.volume.cwd_path());
		0
	}

	fn cmd_ls(&self, args: &[String]) -> i32 {
		let path = args.first().map(String::as_str).unwrap_or("");
		let idx = match self.volume.resolve(path) {
			Some(idx) => idx,
			None => {
				eprintln!("ls: {}: {}", path, Error::NotFound);
				return 1;
			}
		};

		if !self.volume.entry(idx).is_dir() {
			println!("{}", self.volume.entry(idx).name());
			return 0;
		}

		let mut line = String::new();
		for (name, is_dir) in self.volume.list_dir(idx) {
			line.push_str(&name);
			if is_dir {
				line.push('/');
			}
			line.push_str("  ");
		}
		println!("{}", line.trim_end());
		0
	}

	fn cmd_cat(&self, args: &[String]) -> i32 {
		let path = match args.first() {
			Some(path) => path,
			None => {
				eprintln!("cat: missing operand");
				return 1;
			}
		};
		match self.volume.read(path) {
			Ok(data) => {
				let _ = io::stdout().write_all(&data);
				0
			}
			Err(err) => {
				eprintln!("cat: {}: {}", path, err);
				1
			}
		}
	}

	fn cmd_grep(&self, args: &[String]) -> i32 {
		let pattern = match args.first() {
			Some(pattern) => pattern,
			None => {
				eprintln!("grep: usage: grep <pattern> [file]");
				return 1;
			}
		};
		let content = match self.read_text_input(args.get(1).map(String::as_str), "grep") {
			Some(content) => content,
			None => return 1,
		};
		for line in matching_lines(pattern, &content) {
			println!("{}", line);
		}
		0
	}

	/// Content of a volume file, or of the process standard input when no
	/// operand was given. Used by the line-oriented built-ins so they work
	/// both on files and as pipeline consumers.
	fn read_text_input(&self, path: Option<&str>, cmd: &str) -> Option<String> {
		match path {
			Some(path) => match self.volume.read(path) {
				Ok(data) => Some(String::from_utf8_lossy(&data).into_owned()),
				Err(err) => {
					eprintln!("{}: {}: {}", cmd, path, err);
					None
				}
			},
			None => {
				let mut data = Vec::new();
				match io::stdin().lock().read_to_end(&mut data) {
					Ok(_) => Some(String::from_utf8_lossy(&data).into_owned()),
					Err(err) => {
						eprintln!("{}: {}", cmd, err);
						None
					}
				}
			}
		}
	}

	fn cmd_mkdir(&mut self, args: &[String]) -> i32 {
		let path = match args.first() {
			Some(path) => path,
			None => {
				eprintln!("mkdir: missing operand");
				return 1;
			}
		};
		match self.volume.mkdir(path) {
			Ok(()) => 0,
			Err(err) => {
				eprintln!("mkdir: {}: {}", path, err);
				1
			}
		}
	}

	fn cmd_touch(&mut self, args: &[String]) -> i32 {
		let path = match args.first() {
			Some(path) => path,
			None => {
				eprintln!("touch: missing operand");
				return 1;
			}
		};
		match self.volume.touch(path) {
			Ok(()) => 0,
			Err(err) => {
				eprintln!("touch: {}: {}", path, err);
				1
			}
		}
	}

	fn cmd_rm(&mut self, args: &[String]) -> i32 {
		let path = match args.first() {
			Some(path) => path,
			None => {
				eprintln!("rm: missing operand");
				return 1;
			}
		};
		match self.volume.rm(path) {
			Ok(()) => {
				self.save_image();
				0
			}
			Err(err) => {
				eprintln!("rm: cannot remove '{}': {}", path, err);
				1
			}
		}
	}

	fn cmd_rmdir(&mut self, args: &[String]) -> i32 {
		let path = match args.first() {
			Some(path) => path,
			None => {
				eprintln!("rmdir: missing operand");
				return 1;
			}
		};
		match self.volume.rmdir(path) {
			Ok(()) => {
				self.save_image();
				0
			}
			Err(err) => {
				eprintln!("rmdir: failed to remove '{}': {}", path, err);
				1
			}
		}
	}

	fn cmd_mv(&mut self, args: &[String]) -> i32 {
		if args.len() < 2 {
			eprintln!("mv: missing operand");
			eprintln!("Usage: mv SOURCE DEST");
			return 1;
		}
		let (src, dst) = (&args[0], &args[1]);
		match self.volume.rename(src, dst) {
			Ok(()) => {
				self.save_image();
				0
			}
			Err(err) => {
				eprintln!("mv: cannot move '{}' to '{}': {}", src, dst, err);
				1
			}
		}
	}

	fn cmd_head(&self, args: &[String]) -> i32 {
		let (count, path) = parse_line_count(args);
		let content = match self.read_text_input(path, "head") {
			Some(content) => content,
			None => return 1,
		};
		for line in head_lines(&content, count) {
			println!("{}", line);
		}
		0
	}

	fn cmd_tail(&self, args: &[String]) -> i32 {
		let (count, path) = parse_line_count(args);
		let content = match self.read_text_input(path, "tail") {
			Some(content) => content,
			None => return 1,
		};
		for line in tail_lines(&content, count) {
			println!("{}", line);
		}
		0
	}

	fn cmd_history(&self) -> i32 {
		for (idx, cmd) in self.history.iter().enumerate() {
			println!("{:4}  {}", idx + 1, cmd);
		}
		0
	}

	fn cmd_jobs(&self) -> i32 {
		println!("jobs: no background jobs support");
		0
	}

	fn cmd_help(&self) -> i32 {
		println!("{} {}", crate::NAME, crate::VERSION);
		println!("Built-in commands:");
		println!("  cd [dir]              change the current directory");
		println!("  pwd                   print the current directory");
		println!("  ls [path]             list a directory");
		println!("  cat <file>            print a file");
		println!("  grep <pat> [file]     print lines containing a substring");
		println!("  head [-n N] [file]    print the first N lines");
		println!("  tail [-n N] [file]    print the last N lines");
		println!("  mkdir <path>          create a directory");
		println!("  touch <path>          create a file");
		println!("  rm <file>             remove a file");
		println!("  rmdir <dir>           remove an empty directory");
		println!("  mv <src> <dst>        move or rename");
		println!("  import <host> <vfs>   copy a host file into the volume");
		println!("  history               show command history");
		println!("  jobs                  job control placeholder");
		println!("  exit                  save and leave");
		println!("Unknown commands run as host programs; pipelines with");
		println!("'|' and redirections '<', '>', '>>' use volume paths.");
		0
	}

	fn cmd_import(&mut self, args: &[String]) -> i32 {
		if args.len() < 2 {
			eprintln!("import: usage: import <host-path> <vfs-path>");
			return 1;
		}
		let host = resolve_host_path(&self.root, &args[0]);
		let data = match fs::read(&host) {
			Ok(data) => data,
			Err(err) => {
				eprintln!("import: {}: {}", host.display(), err);
				return 1;
			}
		};
		match self.volume.write_path(&args[1], &data, false) {
			Ok(()) => {
				info!("imported {} bytes into {}", data.len(), args[1]);
				0
			}
			Err(err) => {
				eprintln!("import: {}: {}", args[1], err);
				1
			}
		}
	}

	fn cmd_exit(&mut self) -> i32 {
		self.save_image();
		println!("File system saved to {}", IMAGE_FILE);
		if let Err(err) = self.history.save(&self.root.join(HISTORY_FILE)) {
			warn!("failed to save history: {}", err);
		}
		process::exit(0)
	}
}

/// Resolves a host path argument, treating relative paths as rooted at the
/// project root.
fn resolve_host_path(root: &Path, arg: &str) -> PathBuf {
	let path = Path::new(arg);
	if path.is_absolute() {
		path.to_path_buf()
	} else {
		root.join(path)
	}
}

/// Lines of `content` containing `pattern` as a substring.
fn matching_lines<'a>(pattern: &str, content: &'a str) -> Vec<&'a str> {
	content
		.lines()
		.filter(|line| line.contains(pattern))
		.collect()
}

fn head_lines(content: &str, count: usize) -> Vec<&str> {
	content.lines().take(count).collect()
}

fn tail_lines(content: &str, count: usize) -> Vec<&str> {
	let lines: Vec<&str> = content.lines().collect();
	let start = lines.len().saturating_sub(count);
	lines[start..].to_vec()
}

/// Parses the `[-n N] [FILE]` and `-N [FILE]` argument forms shared by
/// head and tail. Without a file operand the command reads standard
/// input. Non-numeric or negative counts clamp to zero lines.
fn parse_line_count(args: &[String]) -> (usize, Option<&str>) {
	match args.len() {
		0 => (10, None),
		1 if is_count_flag(&args[0]) => (count_arg(&args[0][1..]), None),
		1 => (10, Some(args[0].as_str())),
		2 if args[0] == "-n" => (count_arg(&args[1]), None),
		3 if args[0] == "-n" => (count_arg(&args[1]), Some(args[2].as_str())),
		2 if is_count_flag(&args[0]) => (count_arg(&args[0][1..]), Some(args[1].as_str())),
		_ => (10, Some(args[0].as_str())),
	}
}

fn is_count_flag(arg: &str) -> bool {
	arg.len() > 1 && arg.starts_with('-') && arg.as_bytes()[1].is_ascii_digit()
}

fn count_arg(text: &str) -> usize {
	match text.parse::<i64>() {
		Ok(n) if n > 0 => n as usize,
		_ => 0,
	}
}
