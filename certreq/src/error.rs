use std::{fmt, io, path::PathBuf};

/// The error type of the certreq crate
///
/// Each variant identifies the step of the pipeline that failed. Use
/// [`Error::kind`] to branch on the broad category.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// A CSR already exists at the output path
	#[error("csr already exists at {}", .0.display())]
	CsrExists(PathBuf),
	/// A key file showed up at the path while a new key was being written
	#[error("private key already exists at {}", .0.display())]
	KeyExists(PathBuf),
	/// The random number generator or the key algorithm failed
	#[error("failed to generate private key")]
	KeyGeneration(ring::error::Unspecified),
	/// Constructing or signing the CSR failed
	#[error("failed to sign certificate signing request: {0}")]
	CsrSigning(#[source] rcgen::Error),
	/// A freshly generated key could not be serialized
	#[error("failed to encode private key: {0}")]
	KeyEncoding(String),
	/// An existing key file could not be understood
	#[error("failed to parse private key {}: {reason}", .path.display())]
	KeyParse {
		/// The key file
		path: PathBuf,
		/// What was wrong with it
		reason: String,
	},
	/// The signed CSR could not be serialized to PEM
	#[error("failed to encode certificate signing request: {0}")]
	CsrEncoding(#[source] rcgen::Error),
	/// The written CSR did not parse back or its signature did not verify
	#[error("failed to parse certificate signing request {}: {reason}", .path.display())]
	CsrParse {
		/// The CSR file
		path: PathBuf,
		/// What was wrong with it
		reason: String,
	},
	/// A filesystem operation failed
	#[error("failed to {op} {}: {source}", .path.display())]
	Io {
		/// What was attempted
		op: IoOp,
		/// The file or directory involved
		path: PathBuf,
		/// The underlying error
		#[source]
		source: io::Error,
	},
}

/// Broad category of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	/// The target already exists where creation was requested
	Conflict,
	/// Key generation or CSR signing failed
	Generation,
	/// Serializing or parsing a key or CSR failed
	Encoding,
	/// The filesystem refused an operation
	Io,
}

/// Filesystem operation carried by [`Error::Io`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoOp {
	/// Reading a file
	Read,
	/// Creating or writing a file
	Write,
	/// Creating a directory and its ancestors
	CreateDir,
	/// Removing a file
	Remove,
}

impl fmt::Display for IoOp {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			IoOp::Read => write!(f, "read"),
			IoOp::Write => write!(f, "write"),
			IoOp::CreateDir => write!(f, "create directory"),
			IoOp::Remove => write!(f, "remove"),
		}
	}
}

impl Error {
	/// Returns the category of this error
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::CsrExists(_) | Error::KeyExists(_) => ErrorKind::Conflict,
			Error::KeyGeneration(_) | Error::CsrSigning(_) => ErrorKind::Generation,
			Error::KeyEncoding(_)
			| Error::KeyParse { .. }
			| Error::CsrEncoding(_)
			| Error::CsrParse { .. } => ErrorKind::Encoding,
			Error::Io { .. } => ErrorKind::Io,
		}
	}

	pub(crate) fn io(op: IoOp, path: impl Into<PathBuf>, source: io::Error) -> Self {
		Error::Io {
			op,
			path: path.into(),
			source,
		}
	}

	pub(crate) fn key_parse(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
		Error::KeyParse {
			path: path.into(),
			reason: reason.to_string(),
		}
	}

	pub(crate) fn csr_parse(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
		Error::CsrParse {
			path: path.into(),
			reason: reason.to_string(),
		}
	}
}
