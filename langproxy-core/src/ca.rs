use crate::error::InterceptError;
use crate::Result;
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair,
    KeyUsagePurpose, PKCS_ECDSA_P256_SHA256,
};
use std::fs;
use std::path::{Path, PathBuf};
use time::{Duration, OffsetDateTime};
use tracing::info;

const CA_COMMON_NAME: &str = "langproxy Root CA";
const CA_ORGANIZATION: &str = "langproxy";

/// Root CA the proxy signs per-host certificates with.
///
/// The certificate must be trusted by the browser for HTTPS interception to
/// work, so it is persisted in `ca_dir` and reused across restarts.
pub struct CertificateAuthority {
    ca_cert: Certificate,
    cert_path: PathBuf,
}

impl CertificateAuthority {
    /// Load the CA from `ca_dir`, generating and saving one on first run.
    pub fn load_or_generate(ca_dir: &Path) -> Result<Self> {
        let cert_path = ca_dir.join("ca.pem");
        let key_path = ca_dir.join("ca.key");

        if cert_path.exists() && key_path.exists() {
            let key_pem = fs::read_to_string(&key_path)?;
            let ca_cert = Self::build(KeyPair::from_pem(&key_pem).map_err(cert_error("parse CA key"))?)?;
            info!("Loaded CA from {}", cert_path.display());
            return Ok(Self { ca_cert, cert_path });
        }

        fs::create_dir_all(ca_dir)?;
        let key_pair = KeyPair::generate(&PKCS_ECDSA_P256_SHA256).map_err(cert_error("generate CA key"))?;
        let ca_cert = Self::build(key_pair)?;

        let cert_pem = ca_cert.serialize_pem().map_err(cert_error("serialize CA cert"))?;
        fs::write(&cert_path, &cert_pem)?;
        fs::write(&key_path, ca_cert.serialize_private_key_pem())?;
        // Browsers and OS keychains import .crt more readily than .pem
        fs::write(cert_path.with_extension("crt"), &cert_pem)?;

        info!(
            "Generated new CA at {}. Trust it in your browser to intercept HTTPS",
            cert_path.display()
        );
        Ok(Self { ca_cert, cert_path })
    }

    /// rcgen cannot parse an existing certificate for signing, so the CA
    /// certificate is rebuilt around the persisted key with fixed parameters.
    fn build(key_pair: KeyPair) -> Result<Certificate> {
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, CA_COMMON_NAME);
        dn.push(DnType::OrganizationName, CA_ORGANIZATION);
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Constrained(0));
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];

        let not_before = OffsetDateTime::now_utc() - Duration::days(1);
        params.not_before = not_before;
        params.not_after = not_before + Duration::days(365 * 10);
        params.key_pair = Some(key_pair);

        Certificate::from_params(params).map_err(cert_error("build CA cert"))
    }

    /// Path of the PEM certificate users need to trust.
    pub fn cert_path(&self) -> &Path {
        &self.cert_path
    }

    pub fn cert_pem(&self) -> Result<String> {
        self.ca_cert
            .serialize_pem()
            .map_err(cert_error("serialize CA cert"))
    }

    /// Root CA certificate in DER format (for use with rustls/hudsucker).
    pub fn cert_der(&self) -> Result<Vec<u8>> {
        self.ca_cert
            .serialize_der()
            .map_err(cert_error("serialize CA cert DER"))
    }

    /// Root CA private key in DER format (for use with rustls/hudsucker).
    pub fn key_der(&self) -> Vec<u8> {
        self.ca_cert.serialize_private_key_der()
    }
}

fn cert_error<E: std::fmt::Display>(what: &'static str) -> impl Fn(E) -> InterceptError {
    move |e| InterceptError::Certificate(format!("Failed to {}: {}", what, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ca_generation_and_reload() {
        let dir = tempdir().unwrap();
        let ca_dir = dir.path().join("certs");

        let ca = CertificateAuthority::load_or_generate(&ca_dir).expect("Failed to create CA");
        assert!(ca_dir.join("ca.pem").exists());
        assert!(ca_dir.join("ca.key").exists());
        assert!(ca_dir.join("ca.crt").exists());
        assert_eq!(ca.cert_path(), ca_dir.join("ca.pem"));
        assert!(ca.cert_pem().unwrap().contains("BEGIN CERTIFICATE"));

        let key_before = fs::read_to_string(ca_dir.join("ca.key")).unwrap();
        let reloaded = CertificateAuthority::load_or_generate(&ca_dir).expect("Failed to load CA");
        assert_eq!(fs::read_to_string(ca_dir.join("ca.key")).unwrap(), key_before);
        assert_eq!(reloaded.key_der(), ca.key_der());
        assert!(!reloaded.cert_der().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_key_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("ca.pem"), "not a cert").unwrap();
        fs::write(dir.path().join("ca.key"), "not a key").unwrap();

        assert!(matches!(
            CertificateAuthority::load_or_generate(dir.path()),
            Err(InterceptError::Certificate(_))
        ));
    }
}
