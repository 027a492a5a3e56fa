//! Menu action handlers.
//!
//! Every handler takes a [`Session`], which bundles the configuration, the
//! on-disk storage, the trust store, the remote transport and the prompter.

pub mod access;
pub mod ca;
pub mod certificate;

use anyhow::Result;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use crate::configs::AppConfig;
use crate::error::PkiError;
use crate::menu::{MenuChoice, Prompter};
use crate::remote::{RemoteHost, RemoteShell};
use crate::storage::Storage;
use crate::trust_store::TrustStore;

/// Name the executable is deployed under on remote hosts.
pub const REMOTE_EXECUTABLE_NAME: &str = "pki-deploy";

/// Everything a menu action needs.
pub struct Session<'a, R, W> {
    pub config: &'a AppConfig,
    pub storage: Storage,
    pub trust_store: TrustStore,
    pub remote: &'a dyn RemoteShell,
    pub prompter: Prompter<R, W>,
    /// Local path of this program, copied to remote hosts by the CA deploy action.
    pub executable: PathBuf,
}

impl<'a, R: BufRead, W: Write> Session<'a, R, W> {
    pub fn new(
        config: &'a AppConfig,
        remote: &'a dyn RemoteShell,
        prompter: Prompter<R, W>,
        executable: PathBuf,
    ) -> Self {
        Self {
            config,
            storage: Storage::new(&config.paths),
            trust_store: TrustStore::new(&config.trust),
            remote,
            prompter,
            executable,
        }
    }

    /// Prompt for the remote host and user.
    pub(crate) fn ask_remote_host(&mut self) -> Result<RemoteHost> {
        let host = self.prompter.ask_required("Remote host", None)?;
        let config = self.config;
        let user = self.prompter.ask("Remote user", Some(config.remote.user.as_str()))?;
        RemoteHost::new(&user, &host, config.remote.port)
    }
}

/// Run one menu action.
pub fn dispatch<R: BufRead, W: Write>(
    choice: MenuChoice,
    session: &mut Session<'_, R, W>,
) -> Result<()> {
    match choice {
        MenuChoice::CreateCa => ca::handle_create_ca(session).map(|_| ()),
        MenuChoice::ListCas => ca::handle_list_cas(session).map(|_| ()),
        MenuChoice::DeployCa => ca::handle_deploy_ca(session),
        MenuChoice::InstallCaRemote => ca::handle_install_ca_remote(session),
        MenuChoice::InstallCaLocal => ca::handle_install_ca_local(session),
        MenuChoice::CreateCertificate => certificate::handle_create_certificate(session).map(|_| ()),
        MenuChoice::DeployCertificate => certificate::handle_deploy_certificate(session),
        MenuChoice::CopyPublicKey => access::handle_copy_public_key(session),
    }
}

/// Fail with [`PkiError::MissingSource`] unless `path` is an existing file.
pub(crate) fn require_local_file(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(PkiError::MissingSource(path.to_path_buf()).into());
    }
    Ok(())
}

/// Recording [`RemoteShell`] used by the handler tests.
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Call {
        Copy { host: String, local: PathBuf, remote: String },
        Execute { host: String, command: String },
        InstallKey { host: String, key: PathBuf },
    }

    #[derive(Default)]
    pub struct RecordingRemote {
        pub calls: RefCell<Vec<Call>>,
    }

    impl RemoteShell for RecordingRemote {
        fn copy_file(&self, host: &RemoteHost, local: &Path, remote_path: &str) -> Result<()> {
            self.calls.borrow_mut().push(Call::Copy {
                host: host.destination(),
                local: local.to_path_buf(),
                remote: remote_path.to_string(),
            });
            Ok(())
        }

        fn execute(&self, host: &RemoteHost, command: &str) -> Result<()> {
            self.calls.borrow_mut().push(Call::Execute {
                host: host.destination(),
                command: command.to_string(),
            });
            Ok(())
        }

        fn install_public_key(&self, host: &RemoteHost, public_key: &Path) -> Result<()> {
            self.calls.borrow_mut().push(Call::InstallKey {
                host: host.destination(),
                key: public_key.to_path_buf(),
            });
            Ok(())
        }
    }
}
