//! Wallet key material and transaction signing
//!
//! The keypair is loaded once at startup and held immutable for the
//! process lifetime. The aggregator returns unsigned transaction blobs in
//! either the versioned or the legacy wire format; the format is detected
//! by inspecting the version marker byte, not by try/catch deserialization.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use solana_sdk::{
    signature::{Keypair, Signer},
    transaction::{Transaction, VersionedTransaction},
};
use tracing::debug;

use crate::types::{ExecutorError, Result};

/// Transaction wire formats the aggregator may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Versioned,
    Legacy,
}

/// Process wallet holding the signing keypair
pub struct Wallet {
    keypair: Keypair,
}

impl Wallet {
    /// Load the wallet from a base58-encoded 64-byte secret key
    pub fn from_base58(secret: &str) -> Result<Self> {
        let bytes = bs58::decode(secret)
            .into_vec()
            .map_err(|e| ExecutorError::Signing(format!("invalid base58 secret: {}", e)))?;

        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| ExecutorError::Signing(format!("invalid keypair bytes: {}", e)))?;

        Ok(Self { keypair })
    }

    pub fn pubkey(&self) -> String {
        self.keypair.pubkey().to_string()
    }

    /// Sign a base64 transaction blob, returning the signed blob
    pub fn sign_transaction_blob(&self, blob: &str) -> Result<String> {
        let bytes = BASE64
            .decode(blob)
            .map_err(|e| ExecutorError::Signing(format!("invalid base64 transaction: {}", e)))?;

        let format = detect_wire_format(&bytes)?;
        debug!("Signing {:?} transaction ({} bytes)", format, bytes.len());

        let signed = match format {
            WireFormat::Versioned => self.sign_versioned(&bytes)?,
            WireFormat::Legacy => self.sign_legacy(&bytes)?,
        };

        Ok(BASE64.encode(signed))
    }

    fn sign_versioned(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let tx: VersionedTransaction = bincode::deserialize(bytes)
            .map_err(|e| ExecutorError::Signing(format!("versioned deserialize: {}", e)))?;

        let signed = VersionedTransaction::try_new(tx.message, &[&self.keypair])
            .map_err(|e| ExecutorError::Signing(format!("versioned sign: {}", e)))?;

        bincode::serialize(&signed)
            .map_err(|e| ExecutorError::Signing(format!("versioned serialize: {}", e)))
    }

    fn sign_legacy(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut tx: Transaction = bincode::deserialize(bytes)
            .map_err(|e| ExecutorError::Signing(format!("legacy deserialize: {}", e)))?;

        let blockhash = tx.message.recent_blockhash;
        tx.try_sign(&[&self.keypair], blockhash)
            .map_err(|e| ExecutorError::Signing(format!("legacy sign: {}", e)))?;

        bincode::serialize(&tx)
            .map_err(|e| ExecutorError::Signing(format!("legacy serialize: {}", e)))
    }
}

/// Detect the wire format from the serialized transaction bytes
///
/// Layout: compact-u16 signature count, 64 bytes per signature, then the
/// message. A versioned message starts with a version marker byte whose
/// high bit is set; a legacy message's first byte (num_required_signatures)
/// never has it set.
pub fn detect_wire_format(bytes: &[u8]) -> Result<WireFormat> {
    let sig_count = *bytes
        .first()
        .ok_or_else(|| ExecutorError::Signing("empty transaction".to_string()))?;

    // Multi-byte compact-u16 would mean 128+ signatures; no real swap
    // transaction looks like that
    if sig_count >= 0x80 {
        return Err(ExecutorError::Signing(format!(
            "implausible signature count byte: {:#x}",
            sig_count
        )));
    }

    let marker_index = 1 + 64 * sig_count as usize;
    let marker = *bytes.get(marker_index).ok_or_else(|| {
        ExecutorError::Signing("transaction truncated before message".to_string())
    })?;

    if marker & 0x80 != 0 {
        Ok(WireFormat::Versioned)
    } else {
        Ok(WireFormat::Legacy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{
        hash::Hash,
        message::{v0, Message, VersionedMessage},
        signature::Signature,
        system_instruction,
    };

    fn test_wallet() -> Wallet {
        Wallet {
            keypair: Keypair::new(),
        }
    }

    fn unsigned_legacy_blob(wallet: &Wallet) -> String {
        let payer = wallet.keypair.pubkey();
        let ix = system_instruction::transfer(&payer, &payer, 1);
        let message = Message::new(&[ix], Some(&payer));
        let tx = Transaction::new_unsigned(message);
        BASE64.encode(bincode::serialize(&tx).unwrap())
    }

    fn unsigned_versioned_blob(wallet: &Wallet) -> String {
        let payer = wallet.keypair.pubkey();
        let ix = system_instruction::transfer(&payer, &payer, 1);
        let message = v0::Message::try_compile(&payer, &[ix], &[], Hash::default()).unwrap();
        let tx = VersionedTransaction {
            signatures: vec![Signature::default()],
            message: VersionedMessage::V0(message),
        };
        BASE64.encode(bincode::serialize(&tx).unwrap())
    }

    #[test]
    fn test_detects_legacy_format() {
        let wallet = test_wallet();
        let bytes = BASE64.decode(unsigned_legacy_blob(&wallet)).unwrap();
        assert_eq!(detect_wire_format(&bytes).unwrap(), WireFormat::Legacy);
    }

    #[test]
    fn test_detects_versioned_format() {
        let wallet = test_wallet();
        let bytes = BASE64.decode(unsigned_versioned_blob(&wallet)).unwrap();
        assert_eq!(detect_wire_format(&bytes).unwrap(), WireFormat::Versioned);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(detect_wire_format(&[]).is_err());
        assert!(detect_wire_format(&[0xff]).is_err());
        assert!(detect_wire_format(&[2, 0, 0]).is_err()); // truncated
    }

    #[test]
    fn test_signs_legacy_transaction() {
        let wallet = test_wallet();
        let signed = wallet
            .sign_transaction_blob(&unsigned_legacy_blob(&wallet))
            .unwrap();

        let tx: Transaction = bincode::deserialize(&BASE64.decode(signed).unwrap()).unwrap();
        assert_ne!(tx.signatures[0], Signature::default());
    }

    #[test]
    fn test_signs_versioned_transaction() {
        let wallet = test_wallet();
        let signed = wallet
            .sign_transaction_blob(&unsigned_versioned_blob(&wallet))
            .unwrap();

        let tx: VersionedTransaction =
            bincode::deserialize(&BASE64.decode(signed).unwrap()).unwrap();
        assert_ne!(tx.signatures[0], Signature::default());
    }

    #[test]
    fn test_invalid_base64_is_signing_error() {
        let wallet = test_wallet();
        let err = wallet.sign_transaction_blob("not-base64!!").unwrap_err();
        assert!(matches!(err, ExecutorError::Signing(_)));
    }

    #[test]
    fn test_wallet_round_trips_base58_secret() {
        let keypair = Keypair::new();
        let secret = bs58::encode(keypair.to_bytes()).into_string();
        let wallet = Wallet::from_base58(&secret).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey().to_string());
    }
}
