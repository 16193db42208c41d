//! Filesystem helpers shared by the key provisioner and the CSR builder
//!
//! Files are only ever created with exclusive-create semantics, so an
//! existing file is never truncated, whatever raced us to it.

use std::{
	fs::{self, File, OpenOptions},
	io::{self, Write},
	path::Path,
};

use crate::{
	observer::{Event, Observer},
	Error, IoOp,
};

/// Mode of newly written private keys: owner read/write only
pub const KEY_FILE_MODE: u32 = 0o600;
/// Mode of newly written CSRs: owner read/write, group and others read
pub const CSR_FILE_MODE: u32 = 0o644;
/// Mode of directories created for output files
pub const DIR_MODE: u32 = 0o775;

/// Returns whether anything exists at `path`
///
/// Broken symlinks and paths we cannot stat count as absent.
pub fn file_exists(path: &Path) -> bool {
	path.exists()
}

/// Returns the directory `path` would be created in
///
/// Bare file names resolve to `None`: they live in the working directory,
/// which always exists.
pub fn parent_dir(path: &Path) -> Option<&Path> {
	path.parent().filter(|dir| !dir.as_os_str().is_empty())
}

/// Creates the parent directory of `path` and its ancestors if missing
///
/// A missing directory is an expected condition, reported to `observer`
/// as a warning and fixed. Returns whether a directory was created.
pub fn ensure_parent_dir(path: &Path, observer: &dyn Observer) -> Result<bool, Error> {
	let Some(dir) = parent_dir(path) else {
		return Ok(false);
	};
	if dir.is_dir() {
		return Ok(false);
	}

	observer.warn(&Event::DirectoryMissing(dir));
	create_dir_all(dir).map_err(|e| Error::io(IoOp::CreateDir, dir, e))?;
	observer.info(&Event::DirectoryCreated(dir));
	Ok(true)
}

#[cfg(unix)]
fn create_dir_all(dir: &Path) -> io::Result<()> {
	use std::os::unix::fs::DirBuilderExt;

	fs::DirBuilder::new()
		.recursive(true)
		.mode(DIR_MODE)
		.create(dir)
}

#[cfg(not(unix))]
fn create_dir_all(dir: &Path) -> io::Result<()> {
	fs::create_dir_all(dir)
}

/// Writes `contents` to a file that must not exist yet
///
/// The file ends up with exactly `mode`, whatever the process umask. If
/// the file exists the underlying error has kind
/// [`io::ErrorKind::AlreadyExists`]. When writing fails after the file was
/// created, the partial file is removed again.
pub fn write_new(path: &Path, contents: &[u8], mode: u32) -> io::Result<()> {
	let mut file = create_new(path, mode)?;
	let written = set_mode(&file, mode)
		.and_then(|()| file.write_all(contents))
		.and_then(|()| file.sync_all());
	if let Err(e) = written {
		drop(file);
		let _ = fs::remove_file(path);
		return Err(e);
	}
	Ok(())
}

#[cfg(unix)]
fn create_new(path: &Path, mode: u32) -> io::Result<File> {
	use std::os::unix::fs::OpenOptionsExt;

	OpenOptions::new()
		.create_new(true)
		.write(true)
		.mode(mode)
		.open(path)
}

#[cfg(not(unix))]
fn create_new(path: &Path, _mode: u32) -> io::Result<File> {
	OpenOptions::new().create_new(true).write(true).open(path)
}

// the umask only ever clears bits at creation
#[cfg(unix)]
fn set_mode(file: &File, mode: u32) -> io::Result<()> {
	use std::os::unix::fs::PermissionsExt;

	file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(_file: &File, _mode: u32) -> io::Result<()> {
	Ok(())
}

/// Reads the raw contents of a file
///
/// Only failures to read are errors here; whether the bytes make sense
/// is up to the caller.
pub fn read(path: &Path) -> Result<Vec<u8>, Error> {
	fs::read(path).map_err(|e| Error::io(IoOp::Read, path, e))
}
