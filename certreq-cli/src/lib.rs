#![warn(missing_docs)]
//! Command line front-end of [certreq]: loads the role configuration from
//! YAML, applies the organization override and creates the role's key and
//! CSR.

use std::path::Path;

use anyhow::Context;
use certreq::{CaConfig, CertificateRequest, CsrBuilder, Role};
use tracing_subscriber::EnvFilter;

/// A specialized `Result` type.
pub type Result<T> = anyhow::Result<T>;

/// Installs the `tracing` subscriber, honouring `RUST_LOG` and defaulting to `info`
pub fn init_logging() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(false)
		.with_writer(std::io::stderr)
		.init();
}

/// Creates the key and CSR of `role` as configured in the `yaml` file
///
/// A non-empty `org` replaces the role's organization.
pub fn create_csr(yaml: &Path, role: Role, org: Option<&str>) -> Result<CertificateRequest> {
	tracing::info!("start to create {role} csr");

	let cfg = CaConfig::load(yaml)?;
	let mut selected = cfg.into_role(role);
	if selected.override_organization(org) {
		tracing::info!("override organization field by flag");
	}

	let cert = selected.into_certificate();
	cert.validate()
		.with_context(|| format!("invalid {role} section in {}", yaml.display()))?;

	let csr = CsrBuilder::new()
		.create_csr(&cert)
		.with_context(|| format!("failed to create {role} csr"))?;

	tracing::info!("create {role} csr success");
	Ok(csr)
}
