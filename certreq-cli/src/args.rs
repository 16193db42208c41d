//! Command Line argument parsing
#![allow(missing_docs)]

use std::path::PathBuf;

use bpaf::Bpaf;
use certreq::Role;

#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version)]
/// certreq: create a private key and certificate signing request for a CA role
pub struct Options {
	/// Configuration yaml file describing the intermediate, server and client roles
	#[bpaf(short('y'), long("yaml"), argument("config.yaml"))]
	pub yaml: PathBuf,
	/// Type of the certificate: intermediate, server or client
	#[bpaf(short('t'), long("type"), argument("TYPE"))]
	pub cert_type: Role,
	/// Override the organization field of the selected role
	#[bpaf(short('o'), long("org"), argument("ORG"))]
	pub org: Option<String>,
}
