//! Root CA Certificate Generation Module
//!
//! Generates the self-signed certificate at the top of the hierarchy.
//!
//! # PKI Hierarchy Position
//! ```text
//! Root CA (self-signed) ← This module
//!   └── Intermediate CA (signed by Root)
//!       └── Server Certificate (signed by Intermediate)
//! ```
//!
//! # Certificate Properties
//! - **Self-signed**: Issuer and subject are the same
//! - **Key Usage**: keyCertSign, cRLSign, digitalSignature
//! - **Basic Constraints**: CA=true, pathlen=1 (can sign intermediate CAs)
//! - **Default Key Size**: RSA 4096-bit
//! - **Default Validity**: 3650 days
//!
//! # Example
//! ```rust,no_run
//! use pki_deploy::generate_root_ca::RsaRootCABuilder;
//! use pki_deploy::subject::Subject;
//! # fn example() -> anyhow::Result<()> {
//!
//! let (root_key, root_cert) = RsaRootCABuilder::new()
//!     .subject(Subject {
//!         country: "US".to_string(),
//!         organization: "Example Corporation".to_string(),
//!         common_name: "Example Root CA".to_string(),
//!         ..Subject::default()
//!     })
//!     .validity_days(3650)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use anyhow::{anyhow, Result};
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::x509::extension::{BasicConstraints, KeyUsage, SubjectKeyIdentifier};
use openssl::x509::X509;

use crate::signing_request::{certificate_skeleton, generate_rsa_key};
use crate::subject::Subject;

const RSA_KEY_SIZE_DEFAULT: u32 = 4096;
const ROOT_CA_PATH_LENGTH: u32 = 1;

// ================= RSA Key and Certificate Builder =================

/// Builder for generating an RSA key pair and self-signed root CA certificate
///
/// The subject is used for both subject and issuer names. Root CAs carry
/// `pathlen=1` so they may sign intermediates, which in turn sign
/// end-entity certificates.
pub struct RsaRootCABuilder {
    subject: Subject,
    validity_days: u32,
    key_bits: u32,
}

impl Default for RsaRootCABuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RsaRootCABuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            subject: Subject::default(),
            validity_days: 3650,
            key_bits: RSA_KEY_SIZE_DEFAULT,
        }
    }

    /// Set the distinguished name of the CA
    pub fn subject(mut self, subject: Subject) -> Self {
        self.subject = subject;
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

    /// Build the RSA key pair and self-signed root CA certificate
    ///
    /// # Certificate Properties
    /// - **Version**: X.509v3
    /// - **Signature Algorithm**: SHA-256 with RSA
    /// - **Basic Constraints**: CA=true, pathlen=1, critical
    /// - **Key Usage**: keyCertSign, cRLSign, digitalSignature, critical
    /// - **Serial Number**: Random 128-bit number
    /// - **Issuer**: Same as subject (self-signed)
    ///
    /// # Errors
    /// Returns error if key generation fails, the subject has no common name,
    /// or any X.509 extension or signing step fails.
    pub fn build(self) -> Result<(PKey<Private>, X509)> {
        let private_key = generate_rsa_key(self.key_bits)?;

        let name = self.subject.to_x509_name()?;
        let mut builder = certificate_skeleton(&name, &name, &private_key, self.validity_days)?;

        let mut bc = BasicConstraints::new();
        bc.critical().ca();
        bc.pathlen(ROOT_CA_PATH_LENGTH);
        let extension = bc
            .build()
            .map_err(|e| anyhow!("Failed to build BasicConstraints: {}", e))?;
        builder
            .append_extension(extension)
            .map_err(|e| anyhow!("Failed to add BasicConstraints: {}", e))?;

        let mut ku = KeyUsage::new();
        ku.critical();
        ku.key_cert_sign();
        ku.crl_sign();
        ku.digital_signature();
        let ku_extension = ku
            .build()
            .map_err(|e| anyhow!("Failed to build KeyUsage: {}", e))?;
        builder
            .append_extension(ku_extension)
            .map_err(|e| anyhow!("Failed to add KeyUsage: {}", e))?;

        let ski = SubjectKeyIdentifier::new()
            .build(&builder.x509v3_context(None, None))
            .map_err(|e| anyhow!("Failed to build SubjectKeyIdentifier: {}", e))?;
        builder
            .append_extension(ski)
            .map_err(|e| anyhow!("Failed to add SubjectKeyIdentifier: {}", e))?;

        builder
            .sign(&private_key, MessageDigest::sha256())
            .map_err(|e| anyhow!("Failed to sign certificate: {}", e))?;
        let x509 = builder.build();
        Ok((private_key, x509))
    }
}
