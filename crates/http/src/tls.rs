use rustls_pemfile::private_key;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio_rustls::{rustls, TlsAcceptor};

/// TLS configuration for the server.
#[derive(Clone, Debug)]
pub struct TlsConfig {
    /// Path to TLS certificate.
    pub cert_path: PathBuf,
    /// Path to TLS key.
    pub key_path: PathBuf,
}

impl TlsConfig {
    // Creates a TLS acceptor from server config.
    pub(crate) fn server_config(&self) -> anyhow::Result<TlsAcceptor> {
        let certs = load_certs(&self.cert_path)?;
        anyhow::ensure!(
            !certs.is_empty(),
            "cert file {} contains no certificates",
            self.cert_path.display()
        );
        let private_key = load_key(&self.key_path)?;

        let cfg = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, private_key)
            .map_err(|e| anyhow::anyhow!("{}", e))?;

        Ok(Arc::new(cfg).into())
    }
}

// load_certs parse and return the certs from the provided file
fn load_certs(
    path: impl AsRef<Path>,
) -> io::Result<Vec<rustls_pki_types::CertificateDer<'static>>> {
    rustls_pemfile::certs(&mut io::BufReader::new(open(path, "cert")?)).collect()
}

// parse and return the first private key from the provided file
fn load_key(path: impl AsRef<Path>) -> io::Result<rustls_pki_types::PrivateKeyDer<'static>> {
    private_key(&mut io::BufReader::new(open(path, "private key")?))
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid private key"))
        .transpose()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "private key file contains no private keys",
            )
        })?
}

fn open(path: impl AsRef<Path>, what: &str) -> io::Result<fs::File> {
    fs::File::open(path.as_ref()).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("failed to read {what} file {}: {err}", path.as_ref().display()),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn file_with(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_read_non_existing_cert() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_certs(dir.path().join("non-existing-file.pem")).unwrap_err();
        assert!(
            err.to_string().starts_with("failed to read cert file"),
            "{err}"
        );
    }

    #[test]
    fn test_read_truncated_cert() {
        let file = file_with("-----BEGIN CERTIFICATE-----\nMIIB\n");
        let err = load_certs(file.path()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "section end \"-----END CERTIFICATE-----\" missing"
        );
    }

    #[test]
    fn test_cert_file_without_certs_is_rejected() {
        let cert = file_with("not a pem file\n");
        let key = file_with("not a pem file\n");
        let config = TlsConfig {
            cert_path: cert.path().to_path_buf(),
            key_path: key.path().to_path_buf(),
        };
        let err = config.server_config().err().unwrap();
        assert!(err.to_string().contains("contains no certificates"), "{err}");
    }

    #[test]
    fn test_read_non_existing_private_key() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_key(dir.path().join("non-existing-file.pem")).unwrap_err();
        assert!(
            err.to_string().starts_with("failed to read private key file"),
            "{err}"
        );
    }

    #[test]
    fn test_read_file_without_private_key() {
        let file = file_with("nothing to see here\n");
        let err = load_key(file.path()).unwrap_err();
        assert_eq!(err.to_string(), "private key file contains no private keys");
    }
}
