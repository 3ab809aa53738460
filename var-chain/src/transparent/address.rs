//! Transparent Address types.

use std::{fmt, io};

use ripemd160::{Digest, Ripemd160};
use secp256k1::PublicKey;
use sha2::{Digest as sha2Digest, Sha256};

use crate::{
    parameters::Network,
    serialization::{SerializationError, VarDeserialize, VarSerialize},
};

use super::{pay_to_pubkey_hash, Script};

/// Magic numbers used to identify what networks the Addresses
/// are associated with.
mod magics {
    pub mod p2sh {
        pub const MAINNET: [u8; 1] = [0x3a];
        pub const TESTNET: [u8; 1] = [0x81];
    }

    pub mod p2pkh {
        pub const MAINNET: [u8; 1] = [0x38];
        pub const TESTNET: [u8; 1] = [0x7f];
    }
}

/// Returns the RIPEMD-160 hash of the SHA-256 hash of `data`.
///
/// This is the 20-byte key hash used by pay-to-pubkey-hash scripts,
/// consolidation markers, and stake fee routing.
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let sha = Sha256::digest(data);
    let ripe = Ripemd160::digest(&sha);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&ripe);
    bytes
}

/// Chain addresses.
///
/// A single version byte is prepended to the 20-byte hash to identify
/// the network and address kind. The result is then hashed with sha256d,
/// the first four bytes of the output are appended as a checksum, and
/// the whole is Base58Check encoded.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Address {
    /// P2SH (Pay to Script Hash) addresses
    PayToScriptHash {
        /// Production or test network
        network: Network,
        /// 20 bytes specifying a script hash.
        script_hash: [u8; 20],
    },
    /// P2PKH (Pay to Public Key Hash) addresses
    PayToPublicKeyHash {
        /// Production or test network
        network: Network,
        /// 20 bytes specifying a public key hash, which is a RIPEMD-160
        /// hash of a SHA-256 hash of a compressed ECDSA key encoding.
        pub_key_hash: [u8; 20],
    },
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut debug_struct = f.debug_struct("Address");

        match self {
            Address::PayToScriptHash {
                network,
                script_hash,
            } => debug_struct
                .field("network", network)
                .field("script_hash", &hex::encode(script_hash))
                .finish(),
            Address::PayToPublicKeyHash {
                network,
                pub_key_hash,
            } => debug_struct
                .field("network", network)
                .field("pub_key_hash", &hex::encode(pub_key_hash))
                .finish(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut bytes = io::Cursor::new(Vec::new());
        let _ = self.var_serialize(&mut bytes);

        f.write_str(&bs58::encode(bytes.get_ref()).with_check().into_string())
    }
}

impl std::str::FromStr for Address {
    type Err = SerializationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let result = &bs58::decode(s).with_check(None).into_vec();

        match result {
            Ok(bytes) => Self::var_deserialize(&bytes[..]),
            Err(_) => Err(SerializationError::Parse("address decoding error")),
        }
    }
}

impl VarSerialize for Address {
    fn var_serialize<W: io::Write>(&self, mut writer: W) -> Result<(), io::Error> {
        match self {
            Address::PayToScriptHash {
                network,
                script_hash,
            } => {
                match *network {
                    Network::Mainnet => writer.write_all(&magics::p2sh::MAINNET[..])?,
                    _ => writer.write_all(&magics::p2sh::TESTNET[..])?,
                }
                writer.write_all(script_hash)?
            }
            Address::PayToPublicKeyHash {
                network,
                pub_key_hash,
            } => {
                match *network {
                    Network::Mainnet => writer.write_all(&magics::p2pkh::MAINNET[..])?,
                    _ => writer.write_all(&magics::p2pkh::TESTNET[..])?,
                }
                writer.write_all(pub_key_hash)?
            }
        }
        Ok(())
    }
}

impl VarDeserialize for Address {
    fn var_deserialize<R: io::Read>(mut reader: R) -> Result<Self, SerializationError> {
        let mut version_bytes = [0; 1];
        reader.read_exact(&mut version_bytes)?;

        let mut hash_bytes = [0; 20];
        reader.read_exact(&mut hash_bytes)?;

        match version_bytes {
            magics::p2sh::MAINNET => Ok(Address::PayToScriptHash {
                network: Network::Mainnet,
                script_hash: hash_bytes,
            }),
            magics::p2sh::TESTNET => Ok(Address::PayToScriptHash {
                network: Network::Testnet,
                script_hash: hash_bytes,
            }),
            magics::p2pkh::MAINNET => Ok(Address::PayToPublicKeyHash {
                network: Network::Mainnet,
                pub_key_hash: hash_bytes,
            }),
            magics::p2pkh::TESTNET => Ok(Address::PayToPublicKeyHash {
                network: Network::Testnet,
                pub_key_hash: hash_bytes,
            }),
            _ => Err(SerializationError::Parse("bad address version byte")),
        }
    }
}

impl Address {
    /// Builds the address of the given compressed public key.
    pub fn from_pub_key(network: Network, pub_key: &PublicKey) -> Address {
        Address::PayToPublicKeyHash {
            network,
            pub_key_hash: hash160(&pub_key.serialize()),
        }
    }

    /// The 20-byte hash this address pays to.
    pub fn hash_bytes(&self) -> [u8; 20] {
        match self {
            Address::PayToScriptHash { script_hash, .. } => *script_hash,
            Address::PayToPublicKeyHash { pub_key_hash, .. } => *pub_key_hash,
        }
    }

    /// Builds the standard lock script paying to this address.
    ///
    /// Only pay-to-pubkey-hash addresses have a fixed-shape script.
    pub fn create_script(&self) -> Script {
        match self {
            Address::PayToPublicKeyHash { pub_key_hash, .. } => pay_to_pubkey_hash(*pub_key_hash),
            Address::PayToScriptHash { .. } => {
                // OP_HASH160 push20 <hash> OP_EQUAL
                let mut s = Vec::with_capacity(23);
                s.push(super::OP_HASH160);
                s.push(0x14);
                s.extend_from_slice(&self.hash_bytes());
                s.push(0x87);
                Script(s)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn address_roundtrip() {
        let addr = Address::PayToPublicKeyHash {
            network: Network::Testnet,
            pub_key_hash: [0x42; 20],
        };
        let encoded = addr.to_string();
        let decoded = Address::from_str(&encoded).expect("valid address");
        assert_eq!(addr, decoded);
    }

    #[test]
    fn mainnet_and_testnet_strings_differ() {
        let hash = [0x42; 20];
        let mainnet = Address::PayToPublicKeyHash {
            network: Network::Mainnet,
            pub_key_hash: hash,
        };
        let testnet = Address::PayToPublicKeyHash {
            network: Network::Testnet,
            pub_key_hash: hash,
        };
        assert_ne!(mainnet.to_string(), testnet.to_string());
    }

    #[test]
    fn p2pkh_script_pays_to_hash() {
        let addr = Address::PayToPublicKeyHash {
            network: Network::Mainnet,
            pub_key_hash: [0x07; 20],
        };
        let script = addr.create_script();
        assert_eq!(super::super::p2pkh_hash160(&script), Some([0x07; 20]));
    }
}
