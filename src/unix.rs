// SPDX-License-Identifier: GPL-2.0

//! Thin safe wrappers around the libc calls used by the pipeline executor.

use std::ffi::CString;
use std::io;
use std::ptr;

use libc::{c_char, c_int, pid_t};

pub fn pipe() -> io::Result<(c_int, c_int)> {
	let mut fds = [0 as c_int; 2];
	let res = unsafe { libc::pipe(fds.as_mut_ptr()) };
	if res >= 0 {
		Ok((fds[0], fds[1]))
	} else {
		Err(io::Error::last_os_error())
	}
}

/// Returns 0 in the child and the child's pid in the parent.
pub fn fork() -> io::Result<pid_t> {
	let res = unsafe { libc::fork() };
	if res >= 0 {
		Ok(res)
	} else {
		Err(io::Error::last_os_error())
	}
}

pub fn dup(fd: c_int) -> io::Result<c_int> {
	let res = unsafe { libc::dup(fd) };
	if res >= 0 {
		Ok(res)
	} else {
		Err(io::Error::last_os_error())
	}
}

pub fn dup2(old_fd: c_int, new_fd: c_int) -> io::Result<()> {
	let res = unsafe { libc::dup2(old_fd, new_fd) };
	if res >= 0 {
		Ok(())
	} else {
		Err(io::Error::last_os_error())
	}
}

pub fn close(fd: c_int) -> io::Result<()> {
	let res = unsafe { libc::close(fd) };
	if res >= 0 {
		Ok(())
	} else {
		Err(io::Error::last_os_error())
	}
}

/// Waits for the given child, returning its raw wait status.
pub fn waitpid(pid: pid_t) -> io::Result<c_int> {
	let mut status: c_int = 0;
	let res = unsafe { libc::waitpid(pid, &mut status, 0) };
	if res >= 0 {
		Ok(status)
	} else {
		Err(io::Error::last_os_error())
	}
}

/// Terminates the current process without running destructors or flushing
/// any Rust-side buffers. Only for forked children.
pub fn exit_child(code: c_int) -> ! {
	unsafe { libc::_exit(code) }
}

/// Replaces the process image, resolving `argv[0]` against `PATH`.
/// Only returns on failure.
pub fn execvp(argv: &[String]) -> io::Error {
	let args: Vec<CString> = match argv
		.iter()
		.map(|arg| CString::new(arg.as_str()))
		.collect::<std::result::Result<_, _>>()
	{
		Ok(args) => args,
		Err(_) => return io::Error::from(io::ErrorKind::InvalidInput),
	};
	if args.is_empty() {
		return io::Error::from(io::ErrorKind::InvalidInput);
	}

	let mut ptrs: Vec<*const c_char> = args.iter().map(|arg| arg.as_ptr()).collect();
	ptrs.push(ptr::null());

	unsafe {
		libc::execvp(ptrs[0], ptrs.as_ptr());
	}
	io::Error::last_os_error()
}

/// Writes the whole buffer to a raw descriptor, retrying short writes.
pub fn write_all(fd: c_int, mut data: &[u8]) -> io::Result<()> {
	while !data.is_empty() {
		let res = unsafe { libc::write(fd, data.as_ptr() as *const libc::c_void, data.len()) };
		if res < 0 {
			let err = io::Error::last_os_error();
			if err.kind() == io::ErrorKind::Interrupted {
				continue;
			}
			return Err(err);
		}
		if res == 0 {
			return Err(io::Error::from(io::ErrorKind::WriteZero));
		}
		data = &data[res as usize..];
	}
	Ok(())
}

/// Reads a raw descriptor to end-of-file.
pub fn read_to_end(fd: c_int) -> io::Result<Vec<u8>> {
	let mut out = Vec::new();
	let mut buf = [0u8; 4096];
	loop {
		let res = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
		if res < 0 {
			let err = io::Error::last_os_error();
			if err.kind() == io::ErrorKind::Interrupted {
				continue;
			}
			return Err(err);
		}
		if res == 0 {
			return Ok(out);
		}
		out.extend_from_slice(&buf[..res as usize]);
	}
}
