use anyhow::{bail, Result};
use std::io::{BufRead, Write};
use tracing::info;

use super::{require_local_file, Session, REMOTE_EXECUTABLE_NAME};
use crate::error::PkiError;
use crate::generate_intermediate_ca::RsaIntermediateCABuilder;
use crate::generate_root_ca::RsaRootCABuilder;
use crate::menu::MenuChoice;
use crate::remote::{remote_join, shell_quote};
use crate::storage::CaPaths;
use crate::trust_store::TrustedCertificate;
use crate::verify::is_issued_by;

/// Create the root CA and the intermediate CA, and write them with the bundle.
///
/// Refuses to run when a root key already exists.
pub fn handle_create_ca<R: BufRead, W: Write>(session: &mut Session<'_, R, W>) -> Result<CaPaths> {
    if session.storage.ca_exists() {
        return Err(PkiError::AlreadyExists(session.storage.ca_paths().ca_key).into());
    }
    let config = session.config;

    let organization = session
        .prompter
        .ask_required("Organization", Some(config.ca.organization.as_str()))?;
    let common_name = session
        .prompter
        .ask_required("CA common name", Some(config.ca.common_name.as_str()))?;

    println!("\n=== Creating CA ===");
    let root_subject = config.ca.subject(&organization, &common_name);
    let (root_key, root_cert) = RsaRootCABuilder::new()
        .subject(root_subject.clone())
        .validity_days(config.ca.validity_days)
        .key_bits(config.ca.key_bits)
        .build()?;
    println!("✓ Root CA generated: {}", root_subject);

    let intermediate_subject =
        root_subject.with_common_name(&config.intermediate.common_name_for(&common_name));
    let intermediate = RsaIntermediateCABuilder::new(&root_key, &root_cert)
        .subject(intermediate_subject.clone())
        .validity_days(config.intermediate.validity_days)
        .key_bits(config.intermediate.key_bits)
        .build()?;
    println!("✓ Intermediate CA generated: {}", intermediate_subject);

    if !is_issued_by(&intermediate.certificate, &root_cert, &root_key)? {
        bail!("Intermediate certificate is not issued by the generated root CA");
    }

    let paths = session.storage.store_hierarchy(
        &root_key,
        &root_cert,
        &intermediate.private_key,
        &intermediate.csr,
        &intermediate.certificate,
    )?;
    println!("✓ CA bundle written to {}", paths.bundle.display());
    Ok(paths)
}

/// Print the subject of every certificate in the system trust bundle.
pub fn handle_list_cas<R: BufRead, W: Write>(
    session: &mut Session<'_, R, W>,
) -> Result<Vec<TrustedCertificate>> {
    let certificates = session.trust_store.list()?;
    println!("\n=== Trusted CAs ===");
    for cert in &certificates {
        println!("{}", cert.subject);
        println!("    SHA256 {}", cert.sha256_fingerprint);
    }
    println!("\n{} certificate(s)", certificates.len());
    Ok(certificates)
}

/// Copy the CA bundle into the remote trust anchors and this program into the
/// remote staging directory.
pub fn handle_deploy_ca<R: BufRead, W: Write>(session: &mut Session<'_, R, W>) -> Result<()> {
    let bundle = session.storage.ca_paths().bundle;
    require_local_file(&bundle)?;
    require_local_file(&session.executable)?;

    let host = session.ask_remote_host()?;
    let config = session.config;
    let remote_anchor = remote_join(
        &config.trust.anchor_dir.display().to_string(),
        &config.trust.anchor_name,
    );
    let remote_executable = remote_join(&config.remote.staging_dir, REMOTE_EXECUTABLE_NAME);

    session.remote.copy_file(&host, &bundle, &remote_anchor)?;
    println!("✓ CA bundle copied to {}:{}", host, remote_anchor);
    session
        .remote
        .copy_file(&host, &session.executable, &remote_executable)?;
    println!("✓ {} copied to {}:{}", REMOTE_EXECUTABLE_NAME, host, remote_executable);
    Ok(())
}

/// Remote command line that installs the deployed bundle.
pub(crate) fn remote_install_command(remote_executable: &str, as_root: bool) -> String {
    let command = format!(
        "{} {}",
        shell_quote(remote_executable),
        MenuChoice::InstallCaLocal.number()
    );
    if as_root {
        command
    } else {
        format!("sudo {}", command)
    }
}

/// Run the deployed program on the remote host with the local-install action.
pub fn handle_install_ca_remote<R: BufRead, W: Write>(
    session: &mut Session<'_, R, W>,
) -> Result<()> {
    let host = session.ask_remote_host()?;
    let remote_executable = remote_join(&session.config.remote.staging_dir, REMOTE_EXECUTABLE_NAME);
    let command = remote_install_command(&remote_executable, host.is_root());

    info!(%host, command = %command, "Installing CA on remote host");
    session.remote.execute(&host, &command)?;
    println!("✓ CA installed on {}", host);
    Ok(())
}

/// Copy the bundle into the local trust anchors and refresh the trust store.
pub fn handle_install_ca_local<R: BufRead, W: Write>(
    session: &mut Session<'_, R, W>,
) -> Result<()> {
    let bundle = session.storage.ca_paths().bundle;
    let anchor = session.trust_store.install(&bundle)?;
    println!("✓ CA installed as {}", anchor.display());
    Ok(())
}
