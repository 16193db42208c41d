use certreq_cli::{create_csr, init_logging, Result};
mod args;

fn main() -> Result<()> {
	let opts = args::options().run();
	init_logging();

	create_csr(&opts.yaml, opts.cert_type, opts.org.as_deref())?;

	Ok(())
}
