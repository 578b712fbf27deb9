// SPDX-License-Identifier: GPL-2.0

//! Shell entry point and the interactive read-eval loop.

use std::io::{self, BufRead, Write};
use std::process;

use mysh::boot;
use mysh::shell::Shell;

fn main() {
	env_logger::init();

	let root = match boot::locate_root() {
		Ok(root) => root,
		Err(_) => {
			eprintln!("{} folder not found.", boot::ROOT_DIR_NAME);
			process::exit(1);
		}
	};

	let mut shell = Shell::new(root);

	println!("Welcome to MyShell! Type 'help' for available commands.");

	let stdin = io::stdin();
	let mut line = String::new();
	loop {
		print!("mysh:{}\n$ ", shell.prompt_path());
		let _ = io::stdout().flush();

		line.clear();
		match stdin.lock().read_line(&mut line) {
			Ok(0) | Err(_) => {
				println!();
				break;
			}
			Ok(_) => {}
		}

		let input = line.trim_end_matches('\n');
		if input.is_empty() {
			continue;
		}

		shell.record(input);
		shell.run_line(input);
	}

	shell.shutdown();
}
