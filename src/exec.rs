// SPDX-License-Identifier: GPL-2.0

//! Pipeline execution: built-ins in-process, externals via fork and exec,
//! with redirections backed by the volume.

use std::io::{self, Write};

use libc::{c_int, STDIN_FILENO, STDOUT_FILENO};
use log::debug;

use crate::parser::Stage;
use crate::shell::{is_builtin, Shell};
use crate::unix;

/// Exit code of a child whose exec failed
const EXIT_NOT_FOUND: c_int = 127;

/// Runs a parsed pipeline, returning the shell-level status.
pub fn execute_pipeline(shell: &mut Shell, stages: &[Stage]) -> i32 {
	match stages.len() {
		0 => 0,
		1 => {
			if is_builtin(&stages[0].argv[0]) {
				builtin_stage(shell, &stages[0])
			} else {
				external_stage(shell, &stages[0])
			}
		}
		_ => pipeline_stages(shell, stages),
	}
}

/// Creates a pipe preloaded with `data` and returns its read end.
fn feed_pipe(data: &[u8]) -> io::Result<c_int> {
	let (read_end, write_end) = unix::pipe()?;
	let written = unix::write_all(write_end, data);
	let _ = unix::close(write_end);
	if let Err(err) = written {
		let _ = unix::close(read_end);
		return Err(err);
	}
	Ok(read_end)
}

/// Reads a volume file and splices it onto standard input. Used in the
/// current process for built-ins and after fork for children.
fn redirect_stdin_from_volume(shell: &Shell, path: &str) -> Option<c_int> {
	let data = match shell.volume.read(path) {
		Ok(data) => data,
		Err(err) => {
			eprintln!("mysh: {}: {}", path, err);
			return None;
		}
	};
	let read_end = match feed_pipe(&data) {
		Ok(fd) => fd,
		Err(err) => {
			eprintln!("mysh: {}: {}", path, err);
			return None;
		}
	};
	let saved = match unix::dup(STDIN_FILENO) {
		Ok(fd) => fd,
		Err(_) => {
			let _ = unix::close(read_end);
			return None;
		}
	};
	if unix::dup2(read_end, STDIN_FILENO).is_err() {
		let _ = unix::close(read_end);
		let _ = unix::close(saved);
		return None;
	}
	let _ = unix::close(read_end);
	Some(saved)
}

/// Swings standard output onto a fresh pipe, returning the pipe's read
/// end and the saved stdout descriptor.
fn capture_stdout() -> io::Result<(c_int, c_int)> {
	let (read_end, write_end) = unix::pipe()?;
	let _ = io::stdout().flush();
	let saved = match unix::dup(STDOUT_FILENO) {
		Ok(fd) => fd,
		Err(err) => {
			let _ = unix::close(read_end);
			let _ = unix::close(write_end);
			return Err(err);
		}
	};
	if let Err(err) = unix::dup2(write_end, STDOUT_FILENO) {
		let _ = unix::close(read_end);
		let _ = unix::close(write_end);
		let _ = unix::close(saved);
		return Err(err);
	}
	let _ = unix::close(write_end);
	Ok((read_end, saved))
}

/// Writes captured output into the volume target, creating it on demand.
fn store_capture(shell: &mut Shell, path: &str, data: &[u8], append: bool) {
	if let Err(err) = shell.volume.write_path(path, data, append) {
		eprintln!("mysh: {}: {}", path, err);
	}
}

/// A single built-in stage runs in-process, with standard input and output
/// temporarily rewired through pipes when redirections ask for it.
fn builtin_stage(shell: &mut Shell, stage: &Stage) -> i32 {
	let mut saved_stdin = None;
	if let Some(ref input) = stage.input_file {
		match redirect_stdin_from_volume(shell, input) {
			Some(saved) => saved_stdin = Some(saved),
			None => return 1,
		}
	}

	let mut capture = None;
	if stage.output_file.is_some() {
		match capture_stdout() {
			Ok(ends) => capture = Some(ends),
			Err(err) => {
				eprintln!("mysh: pipe: {}", err);
				if let Some(saved) = saved_stdin {
					let _ = unix::dup2(saved, STDIN_FILENO);
					let _ = unix::close(saved);
				}
				return 1;
			}
		}
	}

	let status = shell.do_builtin(&stage.argv);

	if let Some((read_end, saved)) = capture {
		let _ = io::stdout().flush();
		let _ = unix::dup2(saved, STDOUT_FILENO);
		let _ = unix::close(saved);
		let data = unix::read_to_end(read_end).unwrap_or_default();
		let _ = unix::close(read_end);
		if let Some(ref output) = stage.output_file {
			store_capture(shell, output, &data, stage.append);
		}
	}

	if let Some(saved) = saved_stdin {
		let _ = unix::dup2(saved, STDIN_FILENO);
		let _ = unix::close(saved);
	}

	status
}

/// A single external stage: fork, redirect in the child, exec, then drain
/// any captured output into the volume.
fn external_stage(shell: &mut Shell, stage: &Stage) -> i32 {
	let capture = if stage.output_file.is_some() {
		match unix::pipe() {
			Ok(ends) => Some(ends),
			Err(err) => {
				eprintln!("mysh: pipe: {}", err);
				return 1;
			}
		}
	} else {
		None
	};

	let _ = io::stdout().flush();
	let _ = io::stderr().flush();

	let pid = match unix::fork() {
		Ok(pid) => pid,
		Err(err) => {
			eprintln!("mysh: fork: {}", err);
			if let Some((read_end, write_end)) = capture {
				let _ = unix::close(read_end);
				let _ = unix::close(write_end);
			}
			return 1;
		}
	};

	if pid == 0 {
		if let Some(ref input) = stage.input_file {
			if redirect_stdin_from_volume(shell, input).is_none() {
				unix::exit_child(1);
			}
		}
		if let Some((read_end, write_end)) = capture {
			let _ = unix::close(read_end);
			if unix::dup2(write_end, STDOUT_FILENO).is_err() {
				unix::exit_child(1);
			}
			let _ = unix::close(write_end);
		}
		let _ = unix::execvp(&stage.argv);
		eprintln!("{}: command not found", stage.argv[0]);
		unix::exit_child(EXIT_NOT_FOUND);
	}

	if let Some((_, write_end)) = capture {
		let _ = unix::close(write_end);
	}

	match unix::waitpid(pid) {
		Ok(status) => debug!("{} exited with status {}", stage.argv[0], status),
		Err(err) => eprintln!("mysh: waitpid: {}", err),
	}

	if let Some((read_end, _)) = capture {
		let data = unix::read_to_end(read_end).unwrap_or_default();
		let _ = unix::close(read_end);
		if let Some(ref output) = stage.output_file {
			store_capture(shell, output, &data, stage.append);
		}
	}

	0
}

/// A pipeline of two or more stages, each in its own child process.
/// Output redirection to the volume is honoured on the last stage only.
fn pipeline_stages(shell: &mut Shell, stages: &[Stage]) -> i32 {
	let last = stages.len() - 1;

	let mut pipes: Vec<(c_int, c_int)> = Vec::with_capacity(last);
	for _ in 0..last {
		match unix::pipe() {
			Ok(ends) => pipes.push(ends),
			Err(err) => {
				eprintln!("mysh: pipe: {}", err);
				close_all(&pipes);
				return 1;
			}
		}
	}

	let capture = if stages[last].output_file.is_some() {
		match unix::pipe() {
			Ok(ends) => Some(ends),
			Err(err) => {
				eprintln!("mysh: pipe: {}", err);
				close_all(&pipes);
				return 1;
			}
		}
	} else {
		None
	};

	let mut pids = Vec::with_capacity(stages.len());
	let mut failed = false;
	for (index, stage) in stages.iter().enumerate() {
		let _ = io::stdout().flush();
		let _ = io::stderr().flush();

		match unix::fork() {
			Ok(0) => child_stage(shell, stage, index, last, &pipes, capture),
			Ok(pid) => pids.push(pid),
			Err(err) => {
				eprintln!("mysh: fork: {}", err);
				failed = true;
				break;
			}
		}
	}

	close_all(&pipes);

	if let Some((read_end, write_end)) = capture {
		let _ = unix::close(write_end);
		let data = unix::read_to_end(read_end).unwrap_or_default();
		let _ = unix::close(read_end);
		if !failed {
			if let Some(ref output) = stages[last].output_file {
				store_capture(shell, output, &data, stages[last].append);
			}
		}
	}

	for pid in pids {
		let _ = unix::waitpid(pid);
	}

	if failed {
		1
	} else {
		0
	}
}

/// Runs one pipeline stage in a forked child; never returns.
fn child_stage(
	shell: &mut Shell,
	stage: &Stage,
	index: usize,
	last: usize,
	pipes: &[(c_int, c_int)],
	capture: Option<(c_int, c_int)>,
) -> ! {
	if index > 0 && unix::dup2(pipes[index - 1].0, STDIN_FILENO).is_err() {
		unix::exit_child(1);
	}
	if index < last {
		if unix::dup2(pipes[index].1, STDOUT_FILENO).is_err() {
			unix::exit_child(1);
		}
	} else if let Some((_, write_end)) = capture {
		if unix::dup2(write_end, STDOUT_FILENO).is_err() {
			unix::exit_child(1);
		}
	}

	// Every descriptor not wired onto stdio must be closed, or readers
	// upstream never see end-of-file.
	close_all(pipes);
	if let Some((read_end, write_end)) = capture {
		let _ = unix::close(read_end);
		let _ = unix::close(write_end);
	}

	if let Some(ref input) = stage.input_file {
		if redirect_stdin_from_volume(shell, input).is_none() {
			unix::exit_child(1);
		}
	}

	if is_builtin(&stage.argv[0]) {
		let _ = shell.do_builtin(&stage.argv);
		let _ = io::stdout().flush();
		unix::exit_child(0);
	}

	let _ = unix::execvp(&stage.argv);
	eprintln!("{}: command not found", stage.argv[0]);
	unix::exit_child(EXIT_NOT_FOUND);
}

fn close_all(pipes: &[(c_int, c_int)]) {
	for &(read_end, write_end) in pipes {
		let _ = unix::close(read_end);
		let _ = unix::close(write_end);
	}
}
