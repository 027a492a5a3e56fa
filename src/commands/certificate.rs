use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{error, info};

use super::{require_local_file, Session};
use crate::error::PkiError;
use crate::generate_server_cert::{fully_qualified_name, validate_hostname, RsaServerCertBuilder};
use crate::remote::remote_join;
use crate::storage::ServerPaths;
use crate::subject::describe_name;
use crate::verify::{verify_against_bundle, Verification};

/// Issue a server certificate from the intermediate CA and verify it against
/// the CA bundle.
///
/// The key, CSR and certificate are written before verification; a failed
/// verification is reported as [`crate::error::PkiError::VerificationFailed`].
pub fn handle_create_certificate<R: BufRead, W: Write>(
    session: &mut Session<'_, R, W>,
) -> Result<ServerPaths> {
    let config = session.config;

    let server = session.prompter.ask_required("Server name", None)?;
    let domain = session
        .prompter
        .ask("Domain", Some(config.leaf.domain.as_str()))?;
    let fqdn = fully_qualified_name(&server, &domain)?;

    let (intermediate_key, intermediate_cert) = session.storage.load_intermediate()?;
    let bundle = session.storage.load_bundle()?;

    println!("\n=== Creating certificate for {} ===", fqdn);
    let issued = RsaServerCertBuilder::new(&intermediate_key, &intermediate_cert)
        .fqdn(fqdn.clone())
        .validity_days(config.leaf.validity_days)
        .key_bits(config.leaf.key_bits)
        .build()?;

    let paths = session.storage.store_server(
        &fqdn,
        &issued.private_key,
        &issued.csr,
        &issued.certificate,
    )?;
    println!("✓ Key written to {}", paths.key.display());
    println!("✓ Certificate written to {}", paths.cert.display());

    match verify_against_bundle(&issued.certificate, &bundle)? {
        Verification::Valid => {
            info!(fqdn = %fqdn, "Certificate verified against CA bundle");
            println!("✓ {}: OK", paths.cert.display());
        }
        Verification::Invalid { reason, depth } => {
            error!(fqdn = %fqdn, reason = %reason, depth, "Certificate verification failed");
            println!("✗ {}: verification failed at depth {}: {}", paths.cert.display(), depth, reason);
            return Err(PkiError::VerificationFailed {
                subject: describe_name(issued.certificate.subject_name()),
                reason: format!("{} (depth {})", reason, depth),
            }
            .into());
        }
    }
    Ok(paths)
}

/// Copy a previously issued key and certificate into the remote SSL directory.
pub fn handle_deploy_certificate<R: BufRead, W: Write>(
    session: &mut Session<'_, R, W>,
) -> Result<()> {
    let host = session.ask_remote_host()?;
    let fqdn = session
        .prompter
        .ask_required("Server fully-qualified name", Some(host.host.as_str()))?;
    validate_hostname(&fqdn)?;

    let paths = session.storage.server_paths(&fqdn);
    require_local_file(&paths.key)?;
    require_local_file(&paths.cert)?;

    let ssl_dir = &session.config.remote.ssl_dir;
    for local in [&paths.key, &paths.cert] {
        let remote_path = remote_join(ssl_dir, &file_name(local));
        session.remote.copy_file(&host, local, &remote_path)?;
        println!("✓ {} copied to {}:{}", local.display(), host, remote_path);
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::ca::handle_create_ca;
    use crate::commands::fake::{Call, RecordingRemote};
    use crate::commands::test_support::{config, session};
    use crate::storage::{read_certificate, write_bundle};
    use crate::subject::Subject;
    use crate::generate_root_ca::RsaRootCABuilder;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_create_certificate_inherits_intermediate_subject() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let remote = RecordingRemote::default();
        let ca = handle_create_ca(&mut session(&config, &remote, "ACME\nACME Root\n", PathBuf::new()))
            .unwrap();

        let paths =
            handle_create_certificate(&mut session(&config, &remote, "web01\n\n", PathBuf::new()))
                .unwrap();
        assert_eq!(paths.cert, dir.path().join("certs").join("web01.corp.test.crt"));
        assert!(paths.key.is_file());
        assert!(paths.csr.is_file());

        let intermediate = read_certificate(&ca.intermediate_cert).unwrap();
        let leaf = read_certificate(&paths.cert).unwrap();
        let expected = Subject::from_x509_name(intermediate.subject_name())
            .unwrap()
            .with_common_name("web01.corp.test");
        assert_eq!(Subject::from_x509_name(leaf.subject_name()).unwrap(), expected);
    }

    #[test]
    fn test_create_certificate_without_ca_fails() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let remote = RecordingRemote::default();
        let err =
            handle_create_certificate(&mut session(&config, &remote, "web01\n\n", PathBuf::new()))
                .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PkiError>(),
            Some(PkiError::MissingSource(_))
        ));
    }

    #[test]
    fn test_create_certificate_with_foreign_bundle_fails_verification() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let remote = RecordingRemote::default();
        let ca = handle_create_ca(&mut session(&config, &remote, "\n\n", PathBuf::new())).unwrap();

        // Replace the bundle with an unrelated root.
        let (_, foreign) = RsaRootCABuilder::new()
            .subject(Subject {
                common_name: "Unrelated Root".to_string(),
                ..Subject::default()
            })
            .key_bits(2048)
            .build()
            .unwrap();
        write_bundle(&ca.bundle, &[&*foreign]).unwrap();

        let err =
            handle_create_certificate(&mut session(&config, &remote, "web01\n\n", PathBuf::new()))
                .unwrap_err();
        match err.downcast_ref::<PkiError>() {
            Some(PkiError::VerificationFailed { subject, reason }) => {
                assert!(subject.contains("CN=web01.corp.test"));
                assert!(reason.ends_with("(depth 0)"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(crate::error::exit_code_for(&err), 1);
    }

    #[test]
    fn test_deploy_certificate_copies_key_and_cert() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let remote = RecordingRemote::default();
        handle_create_ca(&mut session(&config, &remote, "\n\n", PathBuf::new())).unwrap();
        handle_create_certificate(&mut session(&config, &remote, "web01\n\n", PathBuf::new()))
            .unwrap();

        let input = "web01.corp.test\n\n\n";
        handle_deploy_certificate(&mut session(&config, &remote, input, PathBuf::new())).unwrap();

        let certs = dir.path().join("certs");
        assert_eq!(
            *remote.calls.borrow(),
            vec![
                Call::Copy {
                    host: "root@web01.corp.test".to_string(),
                    local: certs.join("web01.corp.test.key"),
                    remote: "/etc/ssl/private/web01.corp.test.key".to_string(),
                },
                Call::Copy {
                    host: "root@web01.corp.test".to_string(),
                    local: certs.join("web01.corp.test.crt"),
                    remote: "/etc/ssl/private/web01.corp.test.crt".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_deploy_never_created_certificate_fails() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let remote = RecordingRemote::default();

        let input = "web01\n\nweb01.corp.test\n";
        let err = handle_deploy_certificate(&mut session(&config, &remote, input, PathBuf::new()))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PkiError>(),
            Some(PkiError::MissingSource(_))
        ));
        assert!(remote.calls.borrow().is_empty());
    }

    #[test]
    fn test_create_certificate_rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let remote = RecordingRemote::default();
        let ca = handle_create_ca(&mut session(&config, &remote, "\n\n", PathBuf::new())).unwrap();
        let intermediate_before = std::fs::read(&ca.intermediate_cert).unwrap();

        for input in ["../ca/intermediate\n.\n", "../x\n\n", "a/b\n\n", "..\n\n"] {
            assert!(
                handle_create_certificate(&mut session(&config, &remote, input, PathBuf::new()))
                    .is_err(),
                "{:?} accepted",
                input
            );
        }

        assert_eq!(std::fs::read(&ca.intermediate_cert).unwrap(), intermediate_before);
        assert!(!dir.path().join("certs").exists());
        handle_create_certificate(&mut session(&config, &remote, "web01\n\n", PathBuf::new()))
            .unwrap();
    }

    #[test]
    fn test_deploy_certificate_rejects_path_like_names() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let remote = RecordingRemote::default();
        handle_create_ca(&mut session(&config, &remote, "\n\n", PathBuf::new())).unwrap();

        for fqdn in ["../ca/ca", "../x", "a/b", ".."] {
            let input = format!("web01\n\n{}\n", fqdn);
            assert!(
                handle_deploy_certificate(&mut session(&config, &remote, &input, PathBuf::new()))
                    .is_err(),
                "{:?} accepted",
                fqdn
            );
        }
        assert!(remote.calls.borrow().is_empty());
    }
}
