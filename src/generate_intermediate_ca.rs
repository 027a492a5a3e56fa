//! Intermediate CA Certificate Generation Module
//!
//! The intermediate CA signs server certificates so the root key is only
//! needed once, when the hierarchy is created.
//!
//! # PKI Hierarchy Position
//! ```text
//! Root CA (self-signed)
//!   └── Intermediate CA (signed by Root) ← This module
//!       └── Server Certificate (signed by Intermediate)
//! ```
//!
//! # Certificate Properties
//! - **Signed by**: Root CA, from a CSR over the intermediate's own key
//! - **Key Usage**: keyCertSign, cRLSign, digitalSignature
//! - **Basic Constraints**: CA=true, pathlen=0 (can only sign end-entity certs)
//! - **Default Validity**: 1825 days (5 years)

use anyhow::{anyhow, Result};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, PKeyRef, Private};
use openssl::x509::extension::{
    AuthorityKeyIdentifier, BasicConstraints, KeyUsage, SubjectKeyIdentifier,
};
use openssl::x509::{X509Ref, X509Req, X509};

use crate::signing_request::{build_csr, certificate_from_csr, generate_rsa_key};
use crate::subject::Subject;

const RSA_KEY_SIZE_DEFAULT: u32 = 4096;
const INTERMEDIATE_CA_PATH_LENGTH: u32 = 0; // Can only sign end-entity certs, not other CAs

/// Key, CSR and certificate produced for an intermediate CA.
pub struct IntermediateCA {
    pub private_key: PKey<Private>,
    pub csr: X509Req,
    pub certificate: X509,
}

// ================= RSA Intermediate CA Builder =================

/// Builder for an intermediate CA certificate signed by a root CA
///
/// The issuer name is taken from the root certificate, so the intermediate's
/// issuer always equals the root's subject.
///
/// # Examples
/// ```rust,no_run
/// # use openssl::pkey::{PKey, Private};
/// # use openssl::x509::X509;
/// # use pki_deploy::generate_intermediate_ca::RsaIntermediateCABuilder;
/// # use pki_deploy::subject::Subject;
/// # fn example(root_key: PKey<Private>, root_cert: X509, subject: Subject) -> anyhow::Result<()> {
/// let intermediate = RsaIntermediateCABuilder::new(&root_key, &root_cert)
///     .subject(subject)
///     .validity_days(1825)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RsaIntermediateCABuilder<'a> {
    subject: Subject,
    validity_days: u32,
    key_bits: u32,
    signing_key: &'a PKeyRef<Private>,
    signing_cert: &'a X509Ref,
}

impl<'a> RsaIntermediateCABuilder<'a> {
    /// Create a new RSA intermediate CA builder
    ///
    /// # Arguments
    /// * `ca_key` - Root CA's private key for signing
    /// * `ca_cert` - Root CA's certificate (issuer information)
    pub fn new(ca_key: &'a PKeyRef<Private>, ca_cert: &'a X509Ref) -> Self {
        Self {
            subject: Subject::default(),
            validity_days: 1825, // Default 5 years
            key_bits: RSA_KEY_SIZE_DEFAULT,
            signing_key: ca_key,
            signing_cert: ca_cert,
        }
    }

    /// Set the distinguished name of the intermediate CA
    pub fn subject(mut self, subject: Subject) -> Self {
        self.subject = subject;
        self
    }

    /// Set validity period in days
    ///
    /// Should be shorter than the root CA validity and longer than the
    /// validity of the server certificates it signs.
    pub fn validity_days(mut self, days: u32) -> Self {
        self.validity_days = days;
        self
    }

    /// Set the RSA modulus size
    pub fn key_bits(mut self, bits: u32) -> Self {
        self.key_bits = bits;
        self
    }

    /// Generate the key, the CSR, and the certificate signed by the root CA
    ///
    /// # Certificate Properties
    /// - **Basic Constraints**: CA=true, pathlen=0, critical
    /// - **Key Usage**: keyCertSign, cRLSign, digitalSignature, critical
    /// - **Key Identifiers**: subject key id, authority key id from the root
    /// - **Issuer**: Root CA subject
    pub fn build(self) -> Result<IntermediateCA> {
        let private_key = generate_rsa_key(self.key_bits)?;
        let csr = build_csr(&private_key, &self.subject)?;

        let mut builder =
            certificate_from_csr(&csr, self.signing_cert.subject_name(), self.validity_days)?;

        let mut bc = BasicConstraints::new();
        bc.critical().ca();
        bc.pathlen(INTERMEDIATE_CA_PATH_LENGTH);
        let extension = bc
            .build()
            .map_err(|e| anyhow!("Failed to build BasicConstraints: {}", e))?;
        builder
            .append_extension(extension)
            .map_err(|e| anyhow!("Failed to add BasicConstraints: {}", e))?;

        let mut ku = KeyUsage::new();
        ku.critical();
        ku.key_cert_sign(); // Can sign certificates
        ku.crl_sign(); // Can sign CRLs
        ku.digital_signature();
        let ku_extension = ku
            .build()
            .map_err(|e| anyhow!("Failed to build KeyUsage: {}", e))?;
        builder
            .append_extension(ku_extension)
            .map_err(|e| anyhow!("Failed to add KeyUsage: {}", e))?;

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

        // Sign with root CA's private key
        builder
            .sign(self.signing_key, MessageDigest::sha256())
            .map_err(|e| anyhow!("Failed to sign certificate: {}", e))?;

        Ok(IntermediateCA {
            private_key,
            csr,
            certificate: builder.build(),
        })
    }
}
