use std::{io, path::Path};

use pem::Pem;
use rcgen::{CertificateParams, DistinguishedName, DnType};
use x509_parser::{certification_request::X509CertificationRequest, prelude::FromDer};

use crate::{
	config::Certificate,
	fs::{self, CSR_FILE_MODE},
	key::{KeyProvisioner, Origin, PrivateKey},
	observer::{Event, Observer, TracingObserver},
	Error, IoOp, CERTIFICATE_REQUEST_TAG, ENCODE_CONFIG,
};

/// A parsed certificate signing request
///
/// Obtained by parsing PEM text; the signature has been verified against
/// the public key the request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
	organization: String,
	common_name: String,
	public_key: Vec<u8>,
	der: Vec<u8>,
}

impl CertificateRequest {
	/// Parses a `CERTIFICATE REQUEST` PEM envelope and verifies its signature
	///
	/// The subject must carry an organization and a common name. The
	/// error is a human readable reason.
	pub fn from_pem(pem_str: &str) -> Result<Self, String> {
		let pem = pem::parse(pem_str).map_err(|e| e.to_string())?;
		if pem.tag() != CERTIFICATE_REQUEST_TAG {
			return Err(format!("unexpected PEM label {:?}", pem.tag()));
		}
		Self::from_der(pem.contents())
	}

	fn from_der(der: &[u8]) -> Result<Self, String> {
		let (_, csr) = X509CertificationRequest::from_der(der).map_err(|e| e.to_string())?;
		csr.verify_signature()
			.map_err(|e| format!("signature does not verify: {e}"))?;

		let info = &csr.certification_request_info;
		let organization = info
			.subject
			.iter_organization()
			.next()
			.ok_or("subject has no organization")?
			.as_str()
			.map_err(|e| e.to_string())?
			.to_owned();
		let common_name = info
			.subject
			.iter_common_name()
			.next()
			.ok_or("subject has no common name")?
			.as_str()
			.map_err(|e| e.to_string())?
			.to_owned();

		Ok(Self {
			organization,
			common_name,
			public_key: info.subject_pki.subject_public_key.data.to_vec(),
			der: der.to_vec(),
		})
	}

	/// Subject organization (O)
	pub fn organization(&self) -> &str {
		&self.organization
	}

	/// Subject common name (CN)
	pub fn common_name(&self) -> &str {
		&self.common_name
	}

	/// The requested public key as an uncompressed SEC1 point
	pub fn public_key_raw(&self) -> &[u8] {
		&self.public_key
	}

	/// The PKCS#10 DER encoding
	pub fn der(&self) -> &[u8] {
		&self.der
	}

	/// The request in a `CERTIFICATE REQUEST` PEM envelope
	pub fn pem(&self) -> String {
		let p = Pem::new(CERTIFICATE_REQUEST_TAG, self.der.clone());
		pem::encode_config(&p, ENCODE_CONFIG)
	}
}

/// Creates CSRs for certificate roles
///
/// Never overwrites a CSR: if one exists at the configured path,
/// [`create_csr`](Self::create_csr) fails with [`Error::CsrExists`]
/// without touching anything.
pub struct CsrBuilder<'a> {
	observer: &'a dyn Observer,
}

impl Default for CsrBuilder<'static> {
	fn default() -> Self {
		Self::new()
	}
}

impl CsrBuilder<'static> {
	/// Builder reporting through [`TracingObserver`]
	pub fn new() -> Self {
		Self {
			observer: &TracingObserver,
		}
	}
}

impl<'a> CsrBuilder<'a> {
	/// Builder reporting to `observer`
	pub fn with_observer(observer: &'a dyn Observer) -> Self {
		Self { observer }
	}

	/// Provisions the key, then signs and writes the CSR described by `cfg`
	///
	/// Returns the request parsed back from the written file. If this
	/// fails after generating a new key, the key stays on disk.
	pub fn create_csr(&self, cfg: &Certificate) -> Result<CertificateRequest, Error> {
		self.observer.info(&Event::CreatingCsr(&cfg.csr_file_path));
		self.try_create(cfg).map_err(|e| {
			self.observer.error(&Event::Failed(&e));
			e
		})
	}

	fn try_create(&self, cfg: &Certificate) -> Result<CertificateRequest, Error> {
		let csr_path = cfg.csr_file_path.as_path();
		if fs::file_exists(csr_path) {
			self.observer.warn(&Event::CsrExists(csr_path));
			return Err(Error::CsrExists(csr_path.into()));
		}

		let (key, origin) =
			KeyProvisioner::with_observer(self.observer).provision(&cfg.key_file_path)?;

		let created = self.sign_and_write(cfg, &key);
		if created.is_err() && origin == Origin::Generated {
			self.observer.warn(&Event::OrphanedKey(&cfg.key_file_path));
		}
		created
	}

	fn sign_and_write(
		&self,
		cfg: &Certificate,
		key: &PrivateKey,
	) -> Result<CertificateRequest, Error> {
		let csr_path = cfg.csr_file_path.as_path();

		let csr = request_params(cfg)
			.serialize_request(key.key_pair())
			.map_err(Error::CsrSigning)?;
		let pem = csr.pem().map_err(Error::CsrEncoding)?;

		let parsed = self.write_checked(csr_path, &pem, key)?;
		self.observer.info(&Event::CsrCreated(csr_path));
		Ok(parsed)
	}

	/// Writes `pem` to a new file at `csr_path` and parses it back
	///
	/// The request must carry the public key of `key`. Otherwise, or if
	/// the file does not parse, it is removed again.
	fn write_checked(
		&self,
		csr_path: &Path,
		pem: &str,
		key: &PrivateKey,
	) -> Result<CertificateRequest, Error> {
		fs::ensure_parent_dir(csr_path, self.observer)?;
		fs::write_new(csr_path, pem.as_bytes(), CSR_FILE_MODE).map_err(|e| {
			if e.kind() == io::ErrorKind::AlreadyExists {
				Error::CsrExists(csr_path.into())
			} else {
				Error::io(IoOp::Write, csr_path, e)
			}
		})?;

		match reparse(csr_path, key) {
			Ok(parsed) => Ok(parsed),
			Err(e) => {
				// leave no unusable CSR behind
				std::fs::remove_file(csr_path)
					.map_err(|source| Error::io(IoOp::Remove, csr_path, source))?;
				Err(e)
			},
		}
	}
}

/// Subject of the request: organization and common name, nothing else
fn request_params(cfg: &Certificate) -> CertificateParams {
	let mut params = CertificateParams::default();
	// override default Common Name
	params.distinguished_name = DistinguishedName::new();
	params
		.distinguished_name
		.push(DnType::OrganizationName, cfg.organization.as_str());
	params
		.distinguished_name
		.push(DnType::CommonName, cfg.common_name.as_str());
	params
}

fn reparse(path: &Path, key: &PrivateKey) -> Result<CertificateRequest, Error> {
	let pem = String::from_utf8(fs::read(path)?).map_err(|e| Error::csr_parse(path, e))?;
	let parsed =
		CertificateRequest::from_pem(&pem).map_err(|reason| Error::csr_parse(path, reason))?;
	if parsed.public_key_raw() != key.public_key_raw() {
		return Err(Error::csr_parse(
			path,
			"public key does not match the private key",
		));
	}
	Ok(parsed)
}

#[cfg(test)]
mod tests {
	use assert_fs::prelude::*;

	use super::*;
	use crate::{observer::recording::RecordingObserver, ErrorKind, NoopObserver};

	fn config(dir: &Path) -> Certificate {
		Certificate {
			organization: "TestOrg".into(),
			common_name: "server.test".into(),
			key_file_path: dir.join("x/server.key"),
			csr_file_path: dir.join("x/server.csr"),
		}
	}

	#[test]
	fn subject_has_only_o_and_cn() {
		let cfg = config(Path::new("/unused"));
		let params = request_params(&cfg);
		let types: Vec<_> = params
			.distinguished_name
			.iter()
			.map(|(ty, _)| ty.clone())
			.collect();
		assert_eq!(types, [DnType::OrganizationName, DnType::CommonName]);
	}

	#[test]
	fn fresh_run_events() -> anyhow::Result<()> {
		let temp = assert_fs::TempDir::new()?;
		let obs = RecordingObserver::default();

		CsrBuilder::with_observer(&obs).create_csr(&config(temp.path()))?;

		assert_eq!(
			obs.names(),
			[
				"creating_csr",
				"key_missing",
				"directory_missing",
				"directory_created",
				"key_generated",
				"key_loaded",
				"csr_created",
			]
		);
		Ok(())
	}

	#[test]
	fn existing_csr_events() -> anyhow::Result<()> {
		let temp = assert_fs::TempDir::new()?;
		let cfg = config(temp.path());
		temp.child("x").create_dir_all()?;
		temp.child("x/server.csr").write_str("existing")?;
		let obs = RecordingObserver::default();

		let err = CsrBuilder::with_observer(&obs).create_csr(&cfg).unwrap_err();

		assert_eq!(err.kind(), ErrorKind::Conflict);
		assert_eq!(obs.names(), ["creating_csr", "csr_exists", "failed"]);
		// no key was provisioned
		assert!(!cfg.key_file_path.exists());
		Ok(())
	}

	#[test]
	fn failed_write_reports_orphaned_key() -> anyhow::Result<()> {
		let temp = assert_fs::TempDir::new()?;
		// a file where the csr directory should be
		temp.child("blocked").write_str("")?;
		let cfg = Certificate {
			csr_file_path: temp.path().join("blocked/server.csr"),
			..config(temp.path())
		};
		let obs = RecordingObserver::default();

		let err = CsrBuilder::with_observer(&obs).create_csr(&cfg).unwrap_err();

		assert!(matches!(err, Error::Io { op: IoOp::CreateDir, .. }));
		assert!(cfg.key_file_path.exists());
		assert!(!cfg.csr_file_path.exists());
		let events = obs.events.borrow();
		assert_eq!(events[events.len() - 2], ("warn", "orphaned_key"));
		assert_eq!(events[events.len() - 1], ("error", "failed"));
		Ok(())
	}

	#[test]
	fn existing_key_failure_is_not_orphaned() -> anyhow::Result<()> {
		let temp = assert_fs::TempDir::new()?;
		temp.child("blocked").write_str("")?;
		let cfg = Certificate {
			csr_file_path: temp.path().join("blocked/server.csr"),
			..config(temp.path())
		};
		KeyProvisioner::with_observer(&NoopObserver).provide_key(&cfg.key_file_path)?;
		let obs = RecordingObserver::default();

		CsrBuilder::with_observer(&obs).create_csr(&cfg).unwrap_err();

		assert!(!obs.names().contains(&"orphaned_key"));
		Ok(())
	}

	#[test]
	fn pem_is_certificate_request() -> anyhow::Result<()> {
		let temp = assert_fs::TempDir::new()?;
		let cfg = config(temp.path());

		let csr = CsrBuilder::with_observer(&NoopObserver).create_csr(&cfg)?;

		let written = std::fs::read_to_string(&cfg.csr_file_path)?;
		assert!(written.starts_with("-----BEGIN CERTIFICATE REQUEST-----"));
		assert_eq!(csr.pem(), written);
		Ok(())
	}

	#[test]
	fn from_pem_rejects_other_labels() {
		let cert = pem::encode(&Pem::new("CERTIFICATE", vec![0x30, 0x00]));
		let err = CertificateRequest::from_pem(&cert).unwrap_err();
		assert_eq!(err, "unexpected PEM label \"CERTIFICATE\"");
	}

	#[test]
	fn from_pem_rejects_tampered_signature() -> anyhow::Result<()> {
		let key = PrivateKey::generate()?;
		let cfg = config(Path::new("/unused"));
		let csr = request_params(&cfg).serialize_request(key.key_pair())?;
		let mut der = csr.der().to_vec();
		// last byte belongs to the signature
		let last = der.len() - 1;
		der[last] ^= 0xff;

		let tampered = pem::encode(&Pem::new(CERTIFICATE_REQUEST_TAG, der));
		assert!(CertificateRequest::from_pem(&tampered).is_err());
		Ok(())
	}

	#[cfg(unix)]
	#[test]
	fn csr_mode() -> anyhow::Result<()> {
		use std::os::unix::fs::PermissionsExt;

		let temp = assert_fs::TempDir::new()?;
		let cfg = config(temp.path());
		CsrBuilder::with_observer(&NoopObserver).create_csr(&cfg)?;

		let mode = std::fs::metadata(&cfg.csr_file_path)?
			.permissions()
			.mode();
		assert_eq!(mode & 0o777, 0o644);
		Ok(())
	}

	#[test]
	fn mismatched_csr_is_removed() -> anyhow::Result<()> {
		let temp = assert_fs::TempDir::new()?;
		let cfg = config(temp.path());
		let signer = PrivateKey::generate()?;
		let other = PrivateKey::generate()?;
		let pem = request_params(&cfg)
			.serialize_request(signer.key_pair())?
			.pem()?;

		let err = CsrBuilder::with_observer(&NoopObserver)
			.write_checked(&cfg.csr_file_path, &pem, &other)
			.unwrap_err();

		assert!(matches!(err, Error::CsrParse { .. }));
		assert_eq!(err.kind(), ErrorKind::Encoding);
		assert!(!cfg.csr_file_path.exists());
		Ok(())
	}

	#[test]
	fn unparseable_csr_is_removed() -> anyhow::Result<()> {
		let temp = assert_fs::TempDir::new()?;
		let cfg = config(temp.path());
		let key = PrivateKey::generate()?;

		let err = CsrBuilder::with_observer(&NoopObserver)
			.write_checked(&cfg.csr_file_path, "not a request", &key)
			.unwrap_err();

		assert!(matches!(err, Error::CsrParse { .. }));
		assert!(!cfg.csr_file_path.exists());
		Ok(())
	}

	#[test]
	fn matching_csr_is_kept() -> anyhow::Result<()> {
		let temp = assert_fs::TempDir::new()?;
		let cfg = config(temp.path());
		let key = PrivateKey::generate()?;
		let pem = request_params(&cfg)
			.serialize_request(key.key_pair())?
			.pem()?;

		let csr = CsrBuilder::with_observer(&NoopObserver).write_checked(
			&cfg.csr_file_path,
			&pem,
			&key,
		)?;

		assert_eq!(csr.public_key_raw(), key.public_key_raw());
		assert_eq!(std::fs::read_to_string(&cfg.csr_file_path)?, pem);
		Ok(())
	}
}
