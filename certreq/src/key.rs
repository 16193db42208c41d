use std::{fmt, io, path::Path};

use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use pem::Pem;
use pki_types::PrivatePkcs8KeyDer;
use ring::{
	rand::SystemRandom,
	signature::{EcdsaKeyPair, ECDSA_P256_SHA256_ASN1_SIGNING},
};

use crate::{
	fs::{self, KEY_FILE_MODE},
	observer::{Event, Observer, TracingObserver},
	Error, IoOp, EC_PRIVATE_KEY_TAG, ENCODE_CONFIG, PKCS8_PRIVATE_KEY_TAG,
};

/// An ECDSA P-256 private key, ready to sign CSRs
///
/// On disk keys are SEC1 `ECPrivateKey` structures in an
/// `EC PRIVATE KEY` PEM envelope.
pub struct PrivateKey {
	key_pair: rcgen::KeyPair,
}

impl fmt::Debug for PrivateKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PrivateKey").finish_non_exhaustive()
	}
}

impl PrivateKey {
	/// Generates a new random key from the system RNG
	pub fn generate() -> Result<Self, Error> {
		let rng = SystemRandom::new();
		let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
			.map_err(Error::KeyGeneration)?;
		Self::from_pkcs8_der(pkcs8.as_ref()).map_err(|e| Error::KeyEncoding(e.to_string()))
	}

	/// Parses a PEM encoded key
	///
	/// Accepts SEC1 (`EC PRIVATE KEY`) and PKCS#8 (`PRIVATE KEY`)
	/// envelopes. The key must be on the P-256 curve. The error is a
	/// human readable reason.
	pub fn from_pem(pem_str: &str) -> Result<Self, String> {
		let pem = pem::parse(pem_str).map_err(|e| e.to_string())?;
		match pem.tag() {
			EC_PRIVATE_KEY_TAG => {
				let secret =
					p256::SecretKey::from_sec1_der(pem.contents()).map_err(|e| e.to_string())?;
				let pkcs8 = secret.to_pkcs8_der().map_err(|e| e.to_string())?;
				Self::from_pkcs8_der(pkcs8.as_bytes()).map_err(|e| e.to_string())
			},
			PKCS8_PRIVATE_KEY_TAG => {
				Self::from_pkcs8_der(pem.contents()).map_err(|e| e.to_string())
			},
			other => Err(format!("unexpected PEM label {other:?}")),
		}
	}

	fn from_pkcs8_der(der: &[u8]) -> Result<Self, rcgen::Error> {
		let key_pair = rcgen::KeyPair::from_pkcs8_der_and_sign_algo(
			&PrivatePkcs8KeyDer::from(der),
			&rcgen::PKCS_ECDSA_P256_SHA256,
		)?;
		Ok(Self { key_pair })
	}

	/// Serializes the key as SEC1 DER inside an `EC PRIVATE KEY` PEM envelope
	pub fn to_sec1_pem(&self) -> Result<String, Error> {
		let secret = p256::SecretKey::from_pkcs8_der(self.key_pair.serialized_der())
			.map_err(|e| Error::KeyEncoding(e.to_string()))?;
		let der = secret
			.to_sec1_der()
			.map_err(|e| Error::KeyEncoding(e.to_string()))?;
		let p = Pem::new(EC_PRIVATE_KEY_TAG, der.to_vec());
		Ok(pem::encode_config(&p, ENCODE_CONFIG))
	}

	/// The public key as an uncompressed SEC1 point
	pub fn public_key_raw(&self) -> &[u8] {
		self.key_pair.public_key_raw()
	}

	pub(crate) fn key_pair(&self) -> &rcgen::KeyPair {
		&self.key_pair
	}
}

/// Where a provisioned key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
	Generated,
	Loaded,
}

/// Makes sure a private key exists at a path and hands it out
///
/// A missing key is generated and written with mode 0600. An existing
/// key file is never modified.
pub struct KeyProvisioner<'a> {
	observer: &'a dyn Observer,
}

impl Default for KeyProvisioner<'static> {
	fn default() -> Self {
		Self::new()
	}
}

impl KeyProvisioner<'static> {
	/// Provisioner reporting through [`TracingObserver`]
	pub fn new() -> Self {
		Self {
			observer: &TracingObserver,
		}
	}
}

impl<'a> KeyProvisioner<'a> {
	/// Provisioner reporting to `observer`
	pub fn with_observer(observer: &'a dyn Observer) -> Self {
		Self { observer }
	}

	/// Loads the key at `path`, generating and persisting one first if
	/// nothing is there
	pub fn provide_key(&self, path: &Path) -> Result<PrivateKey, Error> {
		self.provision(path).map(|(key, _)| key).map_err(|e| {
			self.observer.error(&Event::Failed(&e));
			e
		})
	}

	pub(crate) fn provision(&self, path: &Path) -> Result<(PrivateKey, Origin), Error> {
		if fs::file_exists(path) {
			return Ok((self.load(path)?, Origin::Loaded));
		}

		self.observer.warn(&Event::KeyMissing(path));
		self.generate(path)?;
		// hand out what is on disk, not what is in memory
		Ok((self.load(path)?, Origin::Generated))
	}

	fn generate(&self, path: &Path) -> Result<(), Error> {
		let key = PrivateKey::generate()?;
		let pem = key.to_sec1_pem()?;

		fs::ensure_parent_dir(path, self.observer)?;
		fs::write_new(path, pem.as_bytes(), KEY_FILE_MODE).map_err(|e| {
			if e.kind() == io::ErrorKind::AlreadyExists {
				Error::KeyExists(path.into())
			} else {
				Error::io(IoOp::Write, path, e)
			}
		})?;

		self.observer.info(&Event::KeyGenerated(path));
		Ok(())
	}

	fn load(&self, path: &Path) -> Result<PrivateKey, Error> {
		let pem = String::from_utf8(fs::read(path)?).map_err(|e| Error::key_parse(path, e))?;
		let key = PrivateKey::from_pem(&pem).map_err(|reason| Error::key_parse(path, reason))?;
		self.observer.info(&Event::KeyLoaded(path));
		Ok(key)
	}
}
