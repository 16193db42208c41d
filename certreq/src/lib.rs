/*!
Key provisioning and certificate signing request generation for a private CA

Given the configuration of a certificate role (intermediate CA, server or
client), this crate makes sure an ECDSA P-256 private key exists on disk,
generating one on first use, and writes a PKCS#10 certificate signing
request for it in PEM form.

Both steps refuse to clobber what is already there: an existing key is
loaded and reused, an existing CSR makes the call fail with
[`Error::CsrExists`].

## Example

```no_run
use certreq::{Certificate, CsrBuilder};

# fn main() -> Result<(), certreq::Error> {
let cfg = Certificate {
	organization: "TestOrg".into(),
	common_name: "server.test".into(),
	key_file_path: "/tmp/x/server.key".into(),
	csr_file_path: "/tmp/x/server.csr".into(),
};

let csr = CsrBuilder::new().create_csr(&cfg)?;
assert_eq!(csr.common_name(), "server.test");
# Ok(())
# }
```
*/
#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub use crate::config::{CaConfig, Certificate, ConfigError, Role, RoleCertificate};
pub use crate::csr::{CertificateRequest, CsrBuilder};
pub use crate::error::{Error, ErrorKind, IoOp};
pub use crate::key::{KeyProvisioner, PrivateKey};
pub use crate::observer::{Event, NoopObserver, Observer, TracingObserver};

pub mod config;
mod csr;
mod error;
pub mod fs;
mod key;
pub mod observer;

/// PEM label of SEC1 encoded EC private keys
pub const EC_PRIVATE_KEY_TAG: &str = "EC PRIVATE KEY";
/// PEM label of PKCS#8 encoded private keys
pub const PKCS8_PRIVATE_KEY_TAG: &str = "PRIVATE KEY";
/// PEM label of PKCS#10 certificate signing requests
pub const CERTIFICATE_REQUEST_TAG: &str = "CERTIFICATE REQUEST";

const ENCODE_CONFIG: pem::EncodeConfig = {
	let line_ending = match cfg!(target_family = "windows") {
		true => pem::LineEnding::CRLF,
		false => pem::LineEnding::LF,
	};
	pem::EncodeConfig::new().set_line_ending(line_ending)
};

/// Creates the CSR described by `cfg`, logging through [`tracing`]
///
/// Shorthand for `CsrBuilder::new().create_csr(cfg)`.
pub fn create_csr(cfg: &Certificate) -> Result<CertificateRequest, Error> {
	CsrBuilder::new().create_csr(cfg)
}

/// Loads the key at `path`, generating and persisting one if there is none
///
/// Shorthand for `KeyProvisioner::new().provide_key(path)`.
pub fn provide_key(path: impl AsRef<std::path::Path>) -> Result<PrivateKey, Error> {
	KeyProvisioner::new().provide_key(path.as_ref())
}
