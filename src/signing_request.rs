//! Key generation, certificate signing requests, and the certificate skeleton
//! shared by every certificate this crate issues.
//!
//! Intermediate and leaf certificates are never built directly from a key:
//! a CSR is created over the new key and subject, its self-signature is
//! checked, and the certificate is derived from the CSR's subject and public
//! key before the issuer signs it.

use anyhow::{anyhow, bail, Result};
use openssl::asn1::{Asn1Integer, Asn1Time};
use openssl::bn::{BigNum, MsbOption};
use openssl::hash::MessageDigest;
use openssl::pkey::{HasPublic, PKey, PKeyRef, Private};
use openssl::rsa::Rsa;
use openssl::x509::{X509Builder, X509NameRef, X509Req, X509ReqRef};

use crate::subject::Subject;

const X509_VERSION_3: i32 = 2; // X509 version 3 is represented by 2
const CSR_VERSION_1: i32 = 0;
const MIN_RSA_KEY_SIZE: u32 = 2048;

/// Generate an RSA private key of the given size.
pub fn generate_rsa_key(bits: u32) -> Result<PKey<Private>> {
    if bits < MIN_RSA_KEY_SIZE {
        bail!(
            "RSA key size {} is below the minimum of {} bits",
            bits,
            MIN_RSA_KEY_SIZE
        );
    }
    let rsa = Rsa::generate(bits).map_err(|e| anyhow!("Failed to generate RSA keypair: {}", e))?;
    PKey::from_rsa(rsa).map_err(|e| anyhow!("Failed to create private key: {}", e))
}

/// Create a CSR for `subject`, signed with `key`.
pub fn build_csr(key: &PKeyRef<Private>, subject: &Subject) -> Result<X509Req> {
    let name = subject.to_x509_name()?;

    let mut builder =
        X509Req::builder().map_err(|e| anyhow!("Failed to create CSR builder: {}", e))?;
    builder
        .set_version(CSR_VERSION_1)
        .map_err(|e| anyhow!("Failed to set CSR version: {}", e))?;
    builder
        .set_subject_name(&name)
        .map_err(|e| anyhow!("Failed to set CSR subject: {}", e))?;
    builder
        .set_pubkey(key)
        .map_err(|e| anyhow!("Failed to set CSR public key: {}", e))?;
    builder
        .sign(key, MessageDigest::sha256())
        .map_err(|e| anyhow!("Failed to sign CSR: {}", e))?;

    Ok(builder.build())
}

/// Random 128-bit serial number.
pub(crate) fn random_serial() -> Result<Asn1Integer> {
    let mut serial = BigNum::new()?;
    serial.rand(128, MsbOption::MAYBE_ZERO, false)?;
    Ok(serial.to_asn1_integer()?)
}

/// Certificate builder populated with version, serial, names, validity and
/// public key. Extensions and the signature are left to the caller.
pub(crate) fn certificate_skeleton<T: HasPublic>(
    subject: &X509NameRef,
    issuer: &X509NameRef,
    public_key: &PKeyRef<T>,
    validity_days: u32,
) -> Result<X509Builder> {
    let mut builder =
        X509Builder::new().map_err(|e| anyhow!("Failed to create X509 builder: {}", e))?;

    builder
        .set_version(X509_VERSION_3)
        .map_err(|e| anyhow!("Failed to set version: {}", e))?;
    let serial = random_serial()?;
    builder
        .set_serial_number(&serial)
        .map_err(|e| anyhow!("Failed to set serial number: {}", e))?;

    builder
        .set_subject_name(subject)
        .map_err(|e| anyhow!("Failed to set subject: {}", e))?;
    builder
        .set_issuer_name(issuer)
        .map_err(|e| anyhow!("Failed to set issuer: {}", e))?;

    let not_before = Asn1Time::days_from_now(0)
        .map_err(|e| anyhow!("Failed to create not_before: {}", e))?;
    builder
        .set_not_before(&not_before)
        .map_err(|e| anyhow!("Failed to set not_before: {}", e))?;

    let not_after = Asn1Time::days_from_now(validity_days)
        .map_err(|e| anyhow!("Failed to create not_after: {}", e))?;
    builder
        .set_not_after(&not_after)
        .map_err(|e| anyhow!("Failed to set not_after: {}", e))?;

    builder
        .set_pubkey(public_key)
        .map_err(|e| anyhow!("Failed to set public key: {}", e))?;

    Ok(builder)
}

/// Check the CSR's self-signature and start a certificate for it under `issuer`.
pub(crate) fn certificate_from_csr(
    csr: &X509ReqRef,
    issuer: &X509NameRef,
    validity_days: u32,
) -> Result<X509Builder> {
    let public_key = csr
        .public_key()
        .map_err(|e| anyhow!("Failed to read CSR public key: {}", e))?;
    let self_signed = csr
        .verify(&public_key)
        .map_err(|e| anyhow!("Failed to verify CSR signature: {}", e))?;
    if !self_signed {
        bail!("CSR signature does not match its public key");
    }

    certificate_skeleton(csr.subject_name(), issuer, &public_key, validity_days)
}
