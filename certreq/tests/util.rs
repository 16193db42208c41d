use std::path::Path;

use certreq::Certificate;

pub fn certificate(dir: &Path, name: &str) -> Certificate {
	Certificate {
		organization: "TestOrg".into(),
		common_name: format!("{name}.test"),
		key_file_path: dir.join(format!("x/{name}.key")),
		csr_file_path: dir.join(format!("x/{name}.csr")),
	}
}

pub const CONFIG_YAML: &str = r#"
ca:
  intermediate:
    organization: TestOrg
    common_name: Intermediate CA
    key_file_path: pki/intermediate.key
    csr_file_path: pki/intermediate.csr
  server:
    organization: TestOrg
    common_name: server.test
    key_file_path: pki/server.key
    csr_file_path: pki/server.csr
  client:
    organization: TestOrg
    common_name: client.test
    key_file_path: pki/client.key
    csr_file_path: pki/client.csr
"#;
