//! PKI Deploy - Private Certificate Authority Management
//!
//! A small toolkit for running a private two-tier certificate authority and
//! distributing its artifacts to hosts reachable over SSH. Key generation,
//! signing and chain verification run in-process through OpenSSL; file
//! transfer, remote execution and trust-store refresh are delegated to the
//! system's OpenSSH client tools and `update-ca-certificates`.
//!
//! # Overview
//!
//! ```text
//! Root CA (self-signed, pathlen=1)
//!   └── Intermediate CA (signed by Root, pathlen=0)
//!       └── Server Certificate (signed by Intermediate, CA=false, serverAuth)
//! ```
//!
//! The binary exposes eight actions through a numbered menu:
//!
//! 1. Create the root CA and the intermediate CA
//! 2. List CAs in the system trust bundle
//! 3. Deploy the CA bundle and this program to a remote host
//! 4. Install the CA on a remote host by running action 5 there
//! 5. Install the CA into the local trust store
//! 6. Create a server certificate signed by the intermediate CA
//! 7. Deploy a server certificate to a remote host
//! 8. Copy an SSH public key to a remote host
//!
//! # Quick Start
//!
//! ```bash
//! # Interactive menu
//! ./target/release/pki-deploy
//!
//! # Single action, e.g. as run on a remote host by action 4
//! sudo ./pki-deploy 5
//! ```
//!
//! # On-disk Layout
//!
//! ```text
//! ca/ca.key               root private key (PKCS#8, mode 0600)
//! ca/ca.crt               root certificate
//! ca/intermediate.key     intermediate private key
//! ca/intermediate.csr     intermediate signing request
//! ca/intermediate.crt     intermediate certificate
//! ca/ca-bundle.crt        root followed by intermediate
//! certs/<fqdn>.key|csr|crt
//! ```
//!
//! # Using the Library
//!
//! ```no_run
//! use pki_deploy::generate_intermediate_ca::RsaIntermediateCABuilder;
//! use pki_deploy::generate_root_ca::RsaRootCABuilder;
//! use pki_deploy::generate_server_cert::RsaServerCertBuilder;
//! use pki_deploy::subject::Subject;
//! use pki_deploy::verify::verify_against_bundle;
//!
//! fn main() -> anyhow::Result<()> {
//!     let subject = Subject {
//!         organization: "ACME".to_string(),
//!         common_name: "ACME Root CA".to_string(),
//!         ..Subject::default()
//!     };
//!     let (root_key, root_cert) = RsaRootCABuilder::new().subject(subject.clone()).build()?;
//!
//!     let intermediate = RsaIntermediateCABuilder::new(&root_key, &root_cert)
//!         .subject(subject.with_common_name("ACME Intermediate CA"))
//!         .build()?;
//!
//!     let server = RsaServerCertBuilder::new(&intermediate.private_key, &intermediate.certificate)
//!         .fqdn("web01.example.com".to_string())
//!         .build()?;
//!
//!     let bundle = vec![root_cert, intermediate.certificate.clone()];
//!     assert!(verify_against_bundle(&server.certificate, &bundle)?.is_valid());
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`configs`]: TOML configuration with built-in defaults
//! - [`subject`]: distinguished-name fields shared by every certificate
//! - [`signing_request`]: RSA keys, CSRs and the common certificate skeleton
//! - [`generate_root_ca`], [`generate_intermediate_ca`], [`generate_server_cert`]: builders
//!   for each tier of the hierarchy
//! - [`verify`]: chain verification against the CA bundle
//! - [`storage`]: PEM files under the CA and certificate directories
//! - [`trust_store`]: system trust anchors
//! - [`remote`]: the SSH transport seam
//! - [`menu`] and [`commands`]: the interactive front end
//!
//! # Security Considerations
//!
//! Private keys are written unencrypted; on Unix they are created with mode
//! `0600`. The CA directory should live on a host with restricted access.

pub mod commands;
pub mod configs;
pub mod error;
pub mod generate_intermediate_ca;
pub mod generate_root_ca;
pub mod generate_server_cert;
pub mod menu;
pub mod process;
pub mod remote;
pub mod signing_request;
pub mod storage;
pub mod subject;
pub mod trust_store;
pub mod verify;
