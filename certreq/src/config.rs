//! Role configuration loaded from YAML
//!
//! ```yaml
//! ca:
//!   intermediate:
//!     organization: Acme
//!     common_name: Acme Intermediate CA
//!     key_file_path: pki/intermediate.key
//!     csr_file_path: pki/intermediate.csr
//!   server: ...
//!   client: ...
//! ```
//!
//! Keys this crate does not use, such as a `root` section, are ignored.

use std::{
	fmt,
	path::{Path, PathBuf},
	str::FromStr,
};

use serde::Deserialize;

/// Subject and file locations of one certificate role
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Certificate {
	/// Subject organization (O)
	pub organization: String,
	/// Subject common name (CN)
	pub common_name: String,
	/// Where the private key is stored or will be generated
	pub key_file_path: PathBuf,
	/// Where the CSR is written
	pub csr_file_path: PathBuf,
}

impl Certificate {
	/// Checks the fields the CSR pipeline relies on
	pub fn validate(&self) -> Result<(), ConfigError> {
		let missing = if self.common_name.trim().is_empty() {
			"common_name"
		} else if self.key_file_path.as_os_str().is_empty() {
			"key_file_path"
		} else if self.csr_file_path.as_os_str().is_empty() {
			"csr_file_path"
		} else {
			return Ok(());
		};
		Err(ConfigError::Invalid(format!("{missing} must not be empty")))
	}
}

/// The three roles a CSR can be created for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
	/// Intermediate certificate authority
	Intermediate,
	/// TLS server
	Server,
	/// TLS client
	Client,
}

impl Role {
	/// All roles, in configuration order
	pub const ALL: [Role; 3] = [Role::Intermediate, Role::Server, Role::Client];

	/// Name used in configuration files and on the command line
	pub fn as_str(&self) -> &'static str {
		match self {
			Role::Intermediate => "intermediate",
			Role::Server => "server",
			Role::Client => "client",
		}
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Role {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Role::ALL
			.into_iter()
			.find(|role| role.as_str() == s)
			.ok_or_else(|| {
				format!("invalid certificate type {s:?}, expected one of: intermediate, server, client")
			})
	}
}

/// The configuration of exactly one role
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleCertificate {
	/// Intermediate CA configuration
	Intermediate(Certificate),
	/// Server configuration
	Server(Certificate),
	/// Client configuration
	Client(Certificate),
}

impl RoleCertificate {
	/// Which role this is
	pub fn role(&self) -> Role {
		match self {
			RoleCertificate::Intermediate(_) => Role::Intermediate,
			RoleCertificate::Server(_) => Role::Server,
			RoleCertificate::Client(_) => Role::Client,
		}
	}

	/// The role's certificate configuration
	pub fn certificate(&self) -> &Certificate {
		match self {
			RoleCertificate::Intermediate(c)
			| RoleCertificate::Server(c)
			| RoleCertificate::Client(c) => c,
		}
	}

	fn certificate_mut(&mut self) -> &mut Certificate {
		match self {
			RoleCertificate::Intermediate(c)
			| RoleCertificate::Server(c)
			| RoleCertificate::Client(c) => c,
		}
	}

	/// Replaces the organization when `org` is present and non-empty
	///
	/// Returns whether the organization was replaced.
	pub fn override_organization(&mut self, org: Option<&str>) -> bool {
		match org {
			Some(org) if !org.is_empty() => {
				self.certificate_mut().organization = org.to_owned();
				true
			},
			_ => false,
		}
	}

	/// Consumes the selection, returning the certificate configuration
	pub fn into_certificate(self) -> Certificate {
		match self {
			RoleCertificate::Intermediate(c)
			| RoleCertificate::Server(c)
			| RoleCertificate::Client(c) => c,
		}
	}
}

/// Configuration file contents
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CaConfig {
	/// Per-role certificate configuration
	pub ca: Roles,
}

/// Certificate configuration of each role
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Roles {
	/// Intermediate CA
	pub intermediate: Certificate,
	/// Server
	pub server: Certificate,
	/// Client
	pub client: Certificate,
}

impl CaConfig {
	/// Parses a YAML document
	pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
		serde_yaml::from_str(yaml).map_err(|source| ConfigError::Parse {
			path: None,
			source,
		})
	}

	/// Reads and parses a YAML file
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
			path: path.to_path_buf(),
			source,
		})?;
		serde_yaml::from_str(&yaml).map_err(|source| ConfigError::Parse {
			path: Some(path.to_path_buf()),
			source,
		})
	}

	/// Picks the configuration of `role`
	pub fn into_role(self, role: Role) -> RoleCertificate {
		match role {
			Role::Intermediate => RoleCertificate::Intermediate(self.ca.intermediate),
			Role::Server => RoleCertificate::Server(self.ca.server),
			Role::Client => RoleCertificate::Client(self.ca.client),
		}
	}
}

/// Errors loading or validating configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// The file could not be read
	#[error("failed to read config {}: {source}", .path.display())]
	Read {
		/// The config file
		path: PathBuf,
		/// The underlying error
		#[source]
		source: std::io::Error,
	},
	/// The YAML is malformed or does not match the expected layout
	#[error("failed to parse config{}: {source}", display_path(.path))]
	Parse {
		/// The config file, if parsed from a file
		path: Option<PathBuf>,
		/// The underlying error
		#[source]
		source: serde_yaml::Error,
	},
	/// A required value is missing
	#[error("invalid certificate config: {0}")]
	Invalid(String),
}

fn display_path(path: &Option<PathBuf>) -> String {
	match path {
		Some(path) => format!(" {}", path.display()),
		None => String::new(),
	}
}
