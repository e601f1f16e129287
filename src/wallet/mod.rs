//! Signing identity resolution
//!
//! Keys are secp256k1 with Ethereum-style addressing, as the chain expects
//! for `eth_secp256k1` accounts. The bech32 account address is the 20-byte
//! Ethereum address under the `inj` prefix, and signatures are made over the
//! keccak-256 digest of the sign doc.

mod keyring;

pub use keyring::resolve_identity;

use crate::error::{SubmitterError, SubmitterResult};
use crate::proto::{EthSecp256k1PubKey, ETH_SECP256K1_PUBKEY_TYPE_URL};

use bech32::{Bech32, Hrp};
use cosmos_sdk_proto::Any;
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, H256};
use prost::Message;
use sha3::{Digest, Keccak256};

/// Bech32 prefix for account addresses
pub const ACCOUNT_HRP: &str = "inj";

/// Local signing identity
#[derive(Debug, Clone)]
pub struct SigningIdentity {
    /// Key name in storage, or `"private-key"` for raw keys
    name: String,
    wallet: LocalWallet,
    address: String,
}

impl SigningIdentity {
    pub(crate) fn from_wallet(name: &str, wallet: LocalWallet) -> SubmitterResult<Self> {
        let address = bech32_address(wallet.address())?;
        Ok(Self {
            name: name.to_string(),
            wallet,
            address,
        })
    }

    /// Identity from a raw hex private key, bypassing key storage
    pub fn from_private_key_hex(key: &str) -> SubmitterResult<Self> {
        let wallet = key
            .trim()
            .parse::<LocalWallet>()
            .map_err(|e| SubmitterError::Identity(format!("Invalid private key: {}", e)))?;
        Self::from_wallet("private-key", wallet)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bech32 account address (`inj1...`)
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn eth_address(&self) -> Address {
        self.wallet.address()
    }

    /// Compressed 33-byte SEC1 public key
    pub fn public_key(&self) -> Vec<u8> {
        self.wallet
            .signer()
            .verifying_key()
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    /// Public key packed for a signer info
    pub fn public_key_any(&self) -> Any {
        Any {
            type_url: ETH_SECP256K1_PUBKEY_TYPE_URL.to_string(),
            value: EthSecp256k1PubKey {
                key: self.public_key(),
            }
            .encode_to_vec(),
        }
    }

    /// Sign arbitrary bytes, returning the 64-byte `r || s` signature
    pub fn sign(&self, payload: &[u8]) -> SubmitterResult<Vec<u8>> {
        let digest = H256::from_slice(Keccak256::digest(payload).as_slice());
        let signature = self
            .wallet
            .sign_hash(digest)
            .map_err(|e| SubmitterError::Submission(format!("Failed to sign: {}", e)))?;
        let mut bytes = signature.to_vec();
        bytes.truncate(64);
        Ok(bytes)
    }
}

/// Bech32 account address for an Ethereum-style address
pub fn bech32_address(address: Address) -> SubmitterResult<String> {
    let hrp = Hrp::parse(ACCOUNT_HRP)
        .map_err(|e| SubmitterError::Identity(format!("Invalid address prefix: {}", e)))?;
    bech32::encode::<Bech32>(hrp, address.as_bytes())
        .map_err(|e| SubmitterError::Identity(format!("Failed to encode address: {}", e)))
}

#[cfg(test)]
pub(crate) const TEST_PRIVATE_KEY: &str =
    "0b0956a7c69e926931caf53eddf4f1cb84e1e3165d6f1d861e9bef91ce3cf568";

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Signature;

    #[test]
    fn test_private_key_identity() {
        let identity = SigningIdentity::from_private_key_hex(TEST_PRIVATE_KEY).unwrap();
        assert!(identity.address().starts_with("inj1"));
        assert_eq!(identity.address().len(), 42);
        assert_eq!(identity.public_key().len(), 33);
        assert_eq!(identity.name(), "private-key");

        let with_prefix = SigningIdentity::from_private_key_hex(&format!("0x{}", TEST_PRIVATE_KEY)).unwrap();
        assert_eq!(with_prefix.address(), identity.address());
    }

    #[test]
    fn test_bech32_round_trip_of_eth_address() {
        let identity = SigningIdentity::from_private_key_hex(TEST_PRIVATE_KEY).unwrap();
        let (hrp, data) = bech32::decode(identity.address()).unwrap();
        assert_eq!(hrp.as_str(), ACCOUNT_HRP);
        assert_eq!(data, identity.eth_address().as_bytes());
    }

    #[test]
    fn test_signature_recovers_to_signer() {
        let identity = SigningIdentity::from_private_key_hex(TEST_PRIVATE_KEY).unwrap();
        let payload = b"sign doc bytes";
        let sig = identity.sign(payload).unwrap();
        assert_eq!(sig.len(), 64);

        // recovery id is not part of the chain signature; either parity must recover
        let digest = H256::from_slice(Keccak256::digest(payload).as_slice());
        let recovered = [27u8, 28].iter().any(|v| {
            let mut full = sig.clone();
            full.push(*v);
            Signature::try_from(full.as_slice())
                .and_then(|s| s.recover(digest))
                .map(|addr| addr == identity.eth_address())
                .unwrap_or(false)
        });
        assert!(recovered);
    }

    #[test]
    fn test_invalid_private_key() {
        let err = SigningIdentity::from_private_key_hex("not-a-key").unwrap_err();
        assert!(err.is_fatal());
    }
}
