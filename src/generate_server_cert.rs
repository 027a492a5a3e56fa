//! TLS Server Certificate Generation Module
//!
//! Issues end-entity certificates for servers, signed by the intermediate CA:
//!
//! **Certificate Chain**: Root CA → Intermediate CA → Server Certificate
//!
//! The subject is inherited from the intermediate certificate (country, state,
//! locality, organization, unit, email). Only the common name changes, to the
//! server's fully-qualified name, which is also the single DNS entry of the
//! subject alternative name.
//!
//! # X.509 Extensions
//! - **Basic Constraints**: `CA=false`
//! - **Key Usage**: `digitalSignature`, `keyEncipherment`
//! - **Extended Key Usage**: `serverAuth`
//! - **Subject Alternative Name**: `DNS:<fqdn>`

use anyhow::{anyhow, bail, Result};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, KeyUsage,
    SubjectAlternativeName, SubjectKeyIdentifier,
};
use openssl::x509::{X509Ref, X509Req, X509};

use crate::signing_request::{build_csr, certificate_from_csr, generate_rsa_key};
use crate::subject::Subject;

const RSA_KEY_SIZE_DEFAULT: u32 = 4096;

/// Key, CSR and certificate produced for a server.
pub struct ServerCertificate {
    pub fqdn: String,
    pub private_key: PKey<Private>,
    pub csr: X509Req,
    pub certificate: X509,
}

const MAX_HOSTNAME_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Check that `name` is a DNS hostname: dot-separated labels of ASCII
/// letters, digits and `-`, with no label starting or ending in `-`.
///
/// The name doubles as a file stem under the certificates directory, so
/// anything else (`/`, `..`, empty labels) is refused.
pub fn validate_hostname(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_HOSTNAME_LEN {
        bail!("Invalid hostname {:?}: length must be 1-{}", name, MAX_HOSTNAME_LEN);
    }
    for label in name.split('.') {
        let valid = !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            bail!("Invalid hostname {:?}: bad label {:?}", name, label);
        }
    }
    Ok(())
}

/// Join a server name and a domain into a fully-qualified name.
///
/// The domain's trailing dot is dropped, an empty domain leaves the server
/// name as-is, and a server name already ending in the domain is not
/// extended again. The result must be a valid hostname.
pub fn fully_qualified_name(server: &str, domain: &str) -> Result<String> {
    let server = server.trim().trim_end_matches('.');
    let domain = domain.trim().trim_matches('.');

    if server.is_empty() {
        bail!("Server name must not be empty");
    }
    if server.contains(char::is_whitespace) || domain.contains(char::is_whitespace) {
        bail!("Server name and domain must not contain whitespace");
    }

    let suffix = format!(".{}", domain.to_ascii_lowercase());
    let lowered = server.to_ascii_lowercase();
    let fqdn = if domain.is_empty() || lowered == suffix[1..] || lowered.ends_with(&suffix) {
        server.to_string()
    } else {
        format!("{}.{}", server, domain)
    };
    validate_hostname(&fqdn)?;
    Ok(fqdn)
}

// ================= RSA TLS Server Certificate Builder =================

/// Builder for a server certificate signed by the intermediate CA
///
/// # Examples
/// ```rust,no_run
/// # use openssl::pkey::{PKey, Private};
/// # use openssl::x509::X509;
/// # use pki_deploy::generate_server_cert::RsaServerCertBuilder;
/// # fn example(intermediate_key: PKey<Private>, intermediate_cert: X509) -> anyhow::Result<()> {
/// let server = RsaServerCertBuilder::new(&intermediate_key, &intermediate_cert)
///     .fqdn("web01.example.com".to_string())
///     .validity_days(365)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RsaServerCertBuilder<'a> {
    fqdn: String,
    validity_days: u32,
    key_bits: u32,
    signing_key: &'a PKeyRef<Private>,
    signing_cert: &'a X509Ref,
}

impl<'a> RsaServerCertBuilder<'a> {
    /// Create a new builder
    ///
    /// # Arguments
    /// * `intermediate_ca_key` - Intermediate CA's private key for signing
    /// * `intermediate_ca_cert` - Intermediate CA's certificate (issuer and inherited subject)
    pub fn new(
        intermediate_ca_key: &'a PKeyRef<Private>,
        intermediate_ca_cert: &'a X509Ref,
    ) -> Self {
        Self {
            fqdn: String::new(),
            validity_days: 365,
            key_bits: RSA_KEY_SIZE_DEFAULT,
            signing_key: intermediate_ca_key,
            signing_cert: intermediate_ca_cert,
        }
    }

    /// Set the server's fully-qualified name (becomes the CN and the SAN)
    pub fn fqdn(mut self, fqdn: String) -> Self {
        self.fqdn = fqdn;
        self
    }

    /// Set validity period in days
    pub fn validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    /// Set the RSA modulus size
    pub fn key_bits(mut self, bits: u32) -> Self {
        self.key_bits = bits;
        self
    }

    /// Subject the certificate will carry: the intermediate's, with the CN replaced.
    pub fn server_subject(&self) -> Result<Subject> {
        let inherited = Subject::from_x509_name(self.signing_cert.subject_name())?;
        Ok(inherited.with_common_name(&self.fqdn))
    }

    /// Generate the key, the CSR, and the certificate signed by the intermediate CA
    pub fn build(self) -> Result<ServerCertificate> {
        validate_hostname(&self.fqdn)?;

        let private_key = generate_rsa_key(self.key_bits)?;
        let csr = build_csr(&private_key, &self.server_subject()?)?;

        let mut builder =
            certificate_from_csr(&csr, self.signing_cert.subject_name(), self.validity_days)?;

        // Add Basic Constraints: CA=false (end-entity TLS server certificate)
        let bc = BasicConstraints::new()
            .critical()
            .build()
            .map_err(|e| anyhow!("Failed to build BasicConstraints: {}", e))?;
        builder
            .append_extension(bc)
            .map_err(|e| anyhow!("Failed to add BasicConstraints: {}", e))?;

        let ku = KeyUsage::new()
            .critical()
            .digital_signature() // For TLS handshakes and signatures
            .key_encipherment() // For RSA key exchange in TLS
            .build()
            .map_err(|e| anyhow!("Failed to build KeyUsage: {}", e))?;
        builder
            .append_extension(ku)
            .map_err(|e| anyhow!("Failed to add KeyUsage: {}", e))?;

        let eku = ExtendedKeyUsage::new()
            .server_auth()
            .build()
            .map_err(|e| anyhow!("Failed to build ExtendedKeyUsage: {}", e))?;
        builder
            .append_extension(eku)
            .map_err(|e| anyhow!("Failed to add ExtendedKeyUsage: {}", e))?;

        let san = SubjectAlternativeName::new()
            .dns(&self.fqdn)
            .build(&builder.x509v3_context(Some(self.signing_cert), None))
            .map_err(|e| anyhow!("Failed to build SubjectAlternativeName: {}", e))?;
        builder
            .append_extension(san)
            .map_err(|e| anyhow!("Failed to add SubjectAlternativeName: {}", e))?;

        let ski = SubjectKeyIdentifier::new()
            .build(&builder.x509v3_context(Some(self.signing_cert), None))
            .map_err(|e| anyhow!("Failed to build SubjectKeyIdentifier: {}", e))?;
        builder
            .append_extension(ski)
            .map_err(|e| anyhow!("Failed to add SubjectKeyIdentifier: {}", e))?;

        let aki = AuthorityKeyIdentifier::new()
            .keyid(false)
            .issuer(false)
            .build(&builder.x509v3_context(Some(self.signing_cert), None))
            .map_err(|e| anyhow!("Failed to build AuthorityKeyIdentifier: {}", e))?;
        builder
            .append_extension(aki)
            .map_err(|e| anyhow!("Failed to add AuthorityKeyIdentifier: {}", e))?;

        // Sign with intermediate CA's private key
        builder
            .sign(self.signing_key, MessageDigest::sha256())
            .map_err(|e| anyhow!("Failed to sign certificate: {}", e))?;

        Ok(ServerCertificate {
            fqdn: self.fqdn,
            private_key,
            csr,
            certificate: builder.build(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_intermediate_ca::RsaIntermediateCABuilder;
    use crate::generate_root_ca::RsaRootCABuilder;

    #[test]
    fn test_fqdn_joins_server_and_domain() {
        assert_eq!(fully_qualified_name("web01", "example.com").unwrap(), "web01.example.com");
        assert_eq!(fully_qualified_name(" web01 ", "example.com.").unwrap(), "web01.example.com");
    }

    #[test]
    fn test_fqdn_edge_cases() {
        assert_eq!(fully_qualified_name("web01", "").unwrap(), "web01");
        assert_eq!(
            fully_qualified_name("web01.example.com", "example.com").unwrap(),
            "web01.example.com"
        );
        assert_eq!(
            fully_qualified_name("web01.Example.COM", "example.com").unwrap(),
            "web01.Example.COM"
        );
        // A server whose name only shares a suffix string is still extended.
        assert_eq!(
            fully_qualified_name("myexample.com", "example.com").unwrap(),
            "myexample.com.example.com"
        );
        assert!(fully_qualified_name("", "example.com").is_err());
        assert!(fully_qualified_name("web 01", "example.com").is_err());
    }

    #[test]
    fn test_fqdn_rejects_path_components() {
        for (server, domain) in [
            ("../x", "example.com"),
            ("a/b", "example.com"),
            ("..", "example.com"),
            ("../ca/intermediate", "."),
            ("web01", "../ca"),
            ("web01", "example..com"),
            ("-web01", "example.com"),
        ] {
            assert!(
                fully_qualified_name(server, domain).is_err(),
                "{:?} + {:?} accepted",
                server,
                domain
            );
        }
    }

    #[test]
    fn test_validate_hostname() {
        assert!(validate_hostname("web01").is_ok());
        assert!(validate_hostname("web-01.corp.example.com").is_ok());
        assert!(validate_hostname("").is_err());
        assert!(validate_hostname("web_01").is_err());
        assert!(validate_hostname("web01-.example.com").is_err());
        assert!(validate_hostname(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_server_certificate_inherits_subject() {
        let root_subject = Subject {
            country: "BR".to_string(),
            state: "SP".to_string(),
            locality: "Campinas".to_string(),
            organization: "MenaceLabs".to_string(),
            organizational_unit: "CY".to_string(),
            common_name: "MenaceLabs Root".to_string(),
            email: "pki@menacelabs.test".to_string(),
        };
        let (root_key, root_cert) = RsaRootCABuilder::new()
            .subject(root_subject.clone())
            .key_bits(2048)
            .build()
            .unwrap();
        let intermediate = RsaIntermediateCABuilder::new(&root_key, &root_cert)
            .subject(root_subject.with_common_name("MenaceLabs Intermediate"))
            .key_bits(2048)
            .build()
            .unwrap();

        let server = RsaServerCertBuilder::new(&intermediate.private_key, &intermediate.certificate)
            .fqdn("web01.menacelabs.test".to_string())
            .key_bits(2048)
            .build()
            .unwrap();

        let issued = Subject::from_x509_name(server.certificate.subject_name()).unwrap();
        assert_eq!(issued, root_subject.with_common_name("web01.menacelabs.test"));
        assert_eq!(
            server.certificate.issuer_name().to_der().unwrap(),
            intermediate.certificate.subject_name().to_der().unwrap()
        );

        let sans: Vec<String> = server
            .certificate
            .subject_alt_names()
            .unwrap()
            .iter()
            .filter_map(|n| n.dnsname().map(str::to_string))
            .collect();
        assert_eq!(sans, vec!["web01.menacelabs.test".to_string()]);
    }

    #[test]
    fn test_missing_fqdn_fails() {
        let (root_key, root_cert) = RsaRootCABuilder::new()
            .subject(Subject {
                common_name: "Root".to_string(),
                ..Subject::default()
            })
            .key_bits(2048)
            .build()
            .unwrap();
        assert!(RsaServerCertBuilder::new(&root_key, &root_cert).key_bits(2048).build().is_err());
    }
}
