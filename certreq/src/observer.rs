//! Side channel reporting what the pipeline is doing
//!
//! The key provisioner and the CSR builder report progress to an
//! [`Observer`] instead of logging directly. Nothing they do depends on
//! the observer: [`NoopObserver`] is as valid as [`TracingObserver`].

use std::{fmt, path::Path};

use crate::Error;

/// Something that happened while provisioning a key or building a CSR
#[derive(Debug, Clone, Copy)]
#[non_exhaustive]
pub enum Event<'a> {
	/// CSR creation started for the output path
	CreatingCsr(&'a Path),
	/// A CSR is already present, creation is refused
	CsrExists(&'a Path),
	/// No key at the path, a new one will be generated
	KeyMissing(&'a Path),
	/// A new key was generated and written
	KeyGenerated(&'a Path),
	/// An existing key was read and parsed
	KeyLoaded(&'a Path),
	/// The directory a file goes into does not exist yet
	DirectoryMissing(&'a Path),
	/// The directory was created along with its ancestors
	DirectoryCreated(&'a Path),
	/// The CSR was written and parsed back
	CsrCreated(&'a Path),
	/// A key generated by this invocation stays on disk without a CSR
	OrphanedKey(&'a Path),
	/// A step failed; the error is returned to the caller right after
	Failed(&'a Error),
}

impl Event<'_> {
	/// Short stable name of the event, usable as a structured log field
	pub fn name(&self) -> &'static str {
		match self {
			Event::CreatingCsr(_) => "creating_csr",
			Event::CsrExists(_) => "csr_exists",
			Event::KeyMissing(_) => "key_missing",
			Event::KeyGenerated(_) => "key_generated",
			Event::KeyLoaded(_) => "key_loaded",
			Event::DirectoryMissing(_) => "directory_missing",
			Event::DirectoryCreated(_) => "directory_created",
			Event::CsrCreated(_) => "csr_created",
			Event::OrphanedKey(_) => "orphaned_key",
			Event::Failed(_) => "failed",
		}
	}
}

impl fmt::Display for Event<'_> {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Event::CreatingCsr(p) => write!(f, "creating csr {}", p.display()),
			Event::CsrExists(p) => write!(f, "csr {} already exists", p.display()),
			Event::KeyMissing(p) => write!(f, "private key {} does not exist", p.display()),
			Event::KeyGenerated(p) => write!(f, "private key {} generated", p.display()),
			Event::KeyLoaded(p) => write!(f, "private key {} loaded", p.display()),
			Event::DirectoryMissing(p) => {
				write!(f, "directory {} does not exist, creating", p.display())
			},
			Event::DirectoryCreated(p) => write!(f, "directory {} created", p.display()),
			Event::CsrCreated(p) => write!(f, "csr {} created", p.display()),
			Event::OrphanedKey(p) => write!(
				f,
				"private key {} was generated but no csr was written for it",
				p.display()
			),
			Event::Failed(e) => write!(f, "{e}"),
		}
	}
}

/// Receives [`Event`]s at three severities
pub trait Observer {
	/// Normal progress
	fn info(&self, event: &Event<'_>);
	/// Something unexpected that the pipeline handles or reports
	fn warn(&self, event: &Event<'_>);
	/// A failure about to be returned
	fn error(&self, event: &Event<'_>);
}

/// Forwards events to the [`tracing`] macros
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
	fn info(&self, event: &Event<'_>) {
		tracing::info!(event = event.name(), "{event}");
	}

	fn warn(&self, event: &Event<'_>) {
		tracing::warn!(event = event.name(), "{event}");
	}

	fn error(&self, event: &Event<'_>) {
		tracing::error!(event = event.name(), "{event}");
	}
}

/// Discards all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl Observer for NoopObserver {
	fn info(&self, _: &Event<'_>) {}
	fn warn(&self, _: &Event<'_>) {}
	fn error(&self, _: &Event<'_>) {}
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn display() {
		let path = Path::new("out/server.csr");
		assert_eq!(
			Event::CsrExists(path).to_string(),
			"csr out/server.csr already exists"
		);
		assert_eq!(
			Event::DirectoryMissing(Path::new("out")).to_string(),
			"directory out does not exist, creating"
		);
		let err = Error::CsrExists(path.into());
		assert_eq!(
			Event::Failed(&err).to_string(),
			"csr already exists at out/server.csr"
		);
	}

	#[test]
	fn names_are_distinct() {
		let path = Path::new("x");
		let err = Error::KeyExists(path.into());
		let events = [
			Event::CreatingCsr(path),
			Event::CsrExists(path),
			Event::KeyMissing(path),
			Event::KeyGenerated(path),
			Event::KeyLoaded(path),
			Event::DirectoryMissing(path),
			Event::DirectoryCreated(path),
			Event::CsrCreated(path),
			Event::OrphanedKey(path),
			Event::Failed(&err),
		];
		let mut names: Vec<_> = events.iter().map(Event::name).collect();
		names.sort_unstable();
		names.dedup();
		assert_eq!(names.len(), events.len());
	}

	#[test]
	fn tracing_observer_without_subscriber() {
		let obs = TracingObserver;
		let path = Path::new("x");
		obs.info(&Event::KeyLoaded(path));
		obs.warn(&Event::KeyMissing(path));
		obs.error(&Event::CsrExists(path));
	}
}
