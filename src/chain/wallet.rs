//! Signing credential handling

use alloy::signers::local::PrivateKeySigner;

use crate::error::TransferError;

/// Derive a local signer from a hex-encoded private key (with or without 0x prefix)
pub fn parse_credential(private_key: &str) -> Result<PrivateKeySigner, TransferError> {
    let key = private_key.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);

    key.parse::<PrivateKeySigner>()
        .map_err(|e| TransferError::CredentialInvalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Well-known development key (anvil account #0)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_parse_credential_with_and_without_prefix() {
        let with_prefix = tokio_test::assert_ok!(parse_credential(DEV_KEY));
        let without_prefix = tokio_test::assert_ok!(parse_credential(&DEV_KEY[2..]));
        assert_eq!(with_prefix.address(), without_prefix.address());
        assert_eq!(
            with_prefix.address().to_string(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        );
    }

    #[test]
    fn test_parse_credential_rejects_malformed_key() {
        let err = tokio_test::assert_err!(parse_credential("0x1234"));
        assert!(matches!(err, TransferError::CredentialInvalid(_)));
    }
}
