//! On-disk key storage
//!
//! Keys live in Web3 secret-storage JSON files laid out per backend:
//! `<dir>/keyring-<backend>/<account>.json`.
//!
//! This is not the `keyring-file/<name>.info` format `injectived keys add`
//! writes. Keys created with `injectived` must be exported
//! (`injectived keys export --unarmored-hex --unsafe`) and either set as
//! `keyring.private_key_hex` or re-encrypted into an Ethereum keystore file.

use super::SigningIdentity;
use crate::error::{SubmitterError, SubmitterResult};

use ethers::signers::LocalWallet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Key storage backend kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyringBackend {
    /// Encrypted with the account passphrase
    File,
    /// Encrypted with an empty passphrase, for local development
    Test,
}

impl KeyringBackend {
    fn dir_name(&self) -> &'static str {
        match self {
            KeyringBackend::File => "keyring-file",
            KeyringBackend::Test => "keyring-test",
        }
    }

    /// Path of the key file for `account` under `dir`
    pub fn key_path(&self, dir: &Path, account: &str) -> PathBuf {
        dir.join(self.dir_name()).join(format!("{}.json", account))
    }
}

impl FromStr for KeyringBackend {
    type Err = SubmitterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(KeyringBackend::File),
            "test" => Ok(KeyringBackend::Test),
            other => Err(SubmitterError::Identity(format!(
                "Unsupported keyring backend: {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for KeyringBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyringBackend::File => write!(f, "file"),
            KeyringBackend::Test => write!(f, "test"),
        }
    }
}

/// Load and unlock `account` from key storage
pub fn resolve_identity(
    keystore_path: &Path,
    backend: &str,
    account: &str,
    passphrase: &str,
) -> SubmitterResult<SigningIdentity> {
    let backend: KeyringBackend = backend.parse()?;
    let key_path = backend.key_path(keystore_path, account);

    if !key_path.is_file() {
        return Err(SubmitterError::Identity(format!(
            "Key {:?} not found in {} keyring at {:?}",
            account, backend, key_path
        )));
    }

    let passphrase = match backend {
        KeyringBackend::File if passphrase.is_empty() => {
            return Err(SubmitterError::Identity(format!(
                "Passphrase required to unlock key {:?}",
                account
            )));
        }
        KeyringBackend::File => passphrase,
        KeyringBackend::Test => "",
    };

    debug!("Decrypting key {:?} from {:?}", account, key_path);
    let wallet = LocalWallet::decrypt_keystore(&key_path, passphrase).map_err(|e| {
        SubmitterError::Identity(format!("Failed to unlock key {:?}: {}", account, e))
    })?;

    let identity = SigningIdentity::from_wallet(account, wallet)?;
    info!("Loaded key {:?} ({})", account, identity.address());
    Ok(identity)
}
