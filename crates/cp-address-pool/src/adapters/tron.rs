//! TRON mainnet address format rule.

use crate::ports::AddressFormat;

const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// TRON mainnet format: 34 characters, 'T' prefix, Base58 alphabet.
///
/// A shape check only; no checksum verification. Addresses reach the
/// pool through provisioning, where a malformed entry is reported, not
/// fatal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TronAddressFormat;

impl AddressFormat for TronAddressFormat {
    fn is_valid(&self, address: &str) -> bool {
        address.len() == 34
            && address.starts_with('T')
            && address.chars().all(|c| BASE58_ALPHABET.contains(c))
    }
}
