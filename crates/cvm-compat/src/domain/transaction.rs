//! # Transactions and CVM OP_RETURN Tags
//!
//! In-memory transaction model plus the CVM tag carried in OP_RETURN
//! outputs. Old nodes see a tagged output as ordinary null data; new nodes
//! read the type byte and route the payload to the CVM.
//!
//! ## Tag Layout
//!
//! ```text
//! OP_RETURN <"CVM1"> <type:1> <data>
//! ```
//!
//! The payload is every push after `OP_RETURN` concatenated, so a single
//! push of `magic ‖ type ‖ data` parses the same as three separate pushes.

use crate::domain::features::FeatureFlag;
use crate::domain::invariants::limits::MAX_OP_RETURN_SIZE;
use crate::domain::script::{ops::OP_RETURN, Script, ScriptBuilder};
use crate::domain::value_objects::Hash;
use crate::errors::{CompatError, ScriptError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Magic prefix of a CVM OP_RETURN payload ("CVM1").
pub const CVM_MAGIC: [u8; 4] = [0x43, 0x56, 0x4d, 0x31];

/// Magic plus type byte.
pub const CVM_TAG_HEADER_SIZE: usize = CVM_MAGIC.len() + 1;

// =============================================================================
// TRANSACTION MODEL
// =============================================================================

/// Reference to a previous output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// Funding transaction id.
    pub txid: Hash,
    /// Output index.
    pub vout: u32,
}

/// Transaction input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    /// Spent output.
    pub prevout: OutPoint,
    /// Unlocking script.
    pub script_sig: Script,
    /// Sequence number.
    pub sequence: u32,
}

impl TxIn {
    /// Input spending `prevout` with an empty script.
    #[must_use]
    pub fn new(prevout: OutPoint) -> Self {
        Self {
            prevout,
            script_sig: Script::new(),
            sequence: u32::MAX,
        }
    }
}

/// Transaction output.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    /// Amount in base units.
    pub value: u64,
    /// Locking script.
    pub script_pubkey: Script,
}

impl TxOut {
    /// Output paying `value` to `script_pubkey`.
    #[must_use]
    pub fn new(value: u64, script_pubkey: Script) -> Self {
        Self {
            value,
            script_pubkey,
        }
    }

    /// Inspects the output for a CVM tag.
    #[must_use]
    pub fn cvm_tag(&self) -> Option<CvmTag> {
        CvmTag::inspect(&self.script_pubkey)
    }
}

/// A transaction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Format version.
    pub version: i32,
    /// Inputs.
    pub inputs: Vec<TxIn>,
    /// Outputs.
    pub outputs: Vec<TxOut>,
    /// Lock time.
    pub lock_time: u32,
}

impl Transaction {
    /// Version-2 transaction with no lock time.
    #[must_use]
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Self {
            version: 2,
            inputs,
            outputs,
            lock_time: 0,
        }
    }

    /// Has at least one input and one output.
    #[must_use]
    pub fn is_structurally_valid(&self) -> bool {
        !self.inputs.is_empty() && !self.outputs.is_empty()
    }
}

// =============================================================================
// CVM OPERATION TYPES
// =============================================================================

/// Type byte following the CVM magic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CvmOpType {
    /// Deploy a CVM contract.
    ContractDeploy = 0x01,
    /// Call a CVM contract.
    ContractCall = 0x02,
    /// Reputation vote.
    ReputationVote = 0x03,
    /// Web-of-trust edge.
    TrustEdge = 0x04,
    /// Bonded reputation vote.
    BondedVote = 0x05,
    /// Open a DAO dispute.
    DaoDispute = 0x06,
    /// Vote on a DAO dispute.
    DaoVote = 0x07,
    /// Deploy EVM bytecode.
    EvmDeploy = 0x08,
    /// Call an EVM contract.
    EvmCall = 0x09,
}

impl CvmOpType {
    /// Decodes a type byte.
    #[must_use]
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::ContractDeploy),
            0x02 => Some(Self::ContractCall),
            0x03 => Some(Self::ReputationVote),
            0x04 => Some(Self::TrustEdge),
            0x05 => Some(Self::BondedVote),
            0x06 => Some(Self::DaoDispute),
            0x07 => Some(Self::DaoVote),
            0x08 => Some(Self::EvmDeploy),
            0x09 => Some(Self::EvmCall),
            _ => None,
        }
    }

    /// Type byte.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// EVM deploy or call.
    #[must_use]
    pub fn is_evm(self) -> bool {
        matches!(self, Self::EvmDeploy | Self::EvmCall)
    }

    /// Feature that must be active before new nodes accept this type.
    #[must_use]
    pub fn required_feature(self) -> FeatureFlag {
        if self.is_evm() {
            FeatureFlag::EvmBytecode
        } else {
            FeatureFlag::CvmBasic
        }
    }

    /// Protocol name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ContractDeploy => "CONTRACT_DEPLOY",
            Self::ContractCall => "CONTRACT_CALL",
            Self::ReputationVote => "REPUTATION_VOTE",
            Self::TrustEdge => "TRUST_EDGE",
            Self::BondedVote => "BONDED_VOTE",
            Self::DaoDispute => "DAO_DISPUTE",
            Self::DaoVote => "DAO_VOTE",
            Self::EvmDeploy => "EVM_DEPLOY",
            Self::EvmCall => "EVM_CALL",
        }
    }
}

impl fmt::Display for CvmOpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// TAG INSPECTION
// =============================================================================

/// What a node can learn from one tagged OP_RETURN output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CvmTag {
    /// Raw type byte, if present.
    pub type_byte: Option<u8>,
    /// Decoded type, if known.
    pub op_type: Option<CvmOpType>,
    /// Data after the type byte.
    pub data: Vec<u8>,
    /// Length of magic + type + data.
    pub payload_len: usize,
    /// Push framing error, if any.
    pub framing_error: Option<ScriptError>,
}

impl CvmTag {
    /// Reads the tag from an output script.
    ///
    /// Returns `None` when the script is not OP_RETURN or the payload does
    /// not start with [`CVM_MAGIC`]. A script whose framing is broken is
    /// still reported as tagged when the magic appears right after the
    /// first push header, so the caller can reject it.
    #[must_use]
    pub fn inspect(script: &Script) -> Option<Self> {
        match script.op_return_payload()? {
            Ok(payload) => {
                if !payload.starts_with(&CVM_MAGIC) {
                    return None;
                }
                let type_byte = payload.get(CVM_MAGIC.len()).copied();
                let data = payload
                    .get(CVM_TAG_HEADER_SIZE..)
                    .map(<[u8]>::to_vec)
                    .unwrap_or_default();
                Some(Self {
                    type_byte,
                    op_type: type_byte.and_then(CvmOpType::from_byte),
                    data,
                    payload_len: payload.len(),
                    framing_error: None,
                })
            }
            Err(err) => {
                let head = &script.as_bytes()[1..];
                let window = &head[..head.len().min(CVM_MAGIC.len() + 5)];
                let tagged = window.windows(CVM_MAGIC.len()).any(|w| w == CVM_MAGIC);
                tagged.then(|| Self {
                    type_byte: None,
                    op_type: None,
                    data: Vec::new(),
                    payload_len: script.len().saturating_sub(1),
                    framing_error: Some(err),
                })
            }
        }
    }

    /// Type known, framing intact and payload within the size limit.
    /// The output value is checked by the caller.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.op_type.is_some() && self.framing_error.is_none() && !self.exceeds_size_limit()
    }

    /// Payload is larger than [`MAX_OP_RETURN_SIZE`].
    #[must_use]
    pub fn exceeds_size_limit(&self) -> bool {
        self.payload_len > MAX_OP_RETURN_SIZE
    }

    /// Why the tag is not well-formed, if it is not.
    #[must_use]
    pub fn issue(&self) -> Option<String> {
        if let Some(err) = self.framing_error {
            return Some(format!("broken push framing: {err}"));
        }
        if self.exceeds_size_limit() {
            return Some(format!(
                "payload of {} bytes exceeds {MAX_OP_RETURN_SIZE}",
                self.payload_len
            ));
        }
        match (self.type_byte, self.op_type) {
            (None, _) => Some("missing operation type".to_string()),
            (Some(byte), None) => Some(format!("unknown operation type 0x{byte:02x}")),
            _ => None,
        }
    }
}

// =============================================================================
// BUILD / PARSE
// =============================================================================

/// Builds `OP_RETURN <magic> <type> <data>` as three pushes.
///
/// # Errors
///
/// [`CompatError::OpReturnTooLarge`] when magic + type + data exceeds
/// [`MAX_OP_RETURN_SIZE`]. The data is never truncated.
pub fn build_cvm_op_return(op_type: CvmOpType, data: &[u8]) -> Result<Script, CompatError> {
    let size = CVM_TAG_HEADER_SIZE + data.len();
    if size > MAX_OP_RETURN_SIZE {
        return Err(CompatError::OpReturnTooLarge {
            size,
            max: MAX_OP_RETURN_SIZE,
        });
    }
    let mut builder = ScriptBuilder::new()
        .push_opcode(OP_RETURN)
        .push_slice(&CVM_MAGIC)
        .push_slice(&[op_type.to_byte()]);
    if !data.is_empty() {
        builder = builder.push_slice(data);
    }
    Ok(builder.build()?)
}

/// Decodes a well-formed tag into its type and data.
#[must_use]
pub fn parse_cvm_op_return(script: &Script) -> Option<(CvmOpType, Vec<u8>)> {
    let tag = CvmTag::inspect(script)?;
    if !tag.is_well_formed() {
        return None;
    }
    tag.op_type.map(|op| (op, tag.data))
}

/// Index of the first tagged output.
#[must_use]
pub fn find_cvm_op_return(tx: &Transaction) -> Option<usize> {
    tx.outputs.iter().position(|out| out.cvm_tag().is_some())
}

/// Checks an OP_RETURN script's payload against [`MAX_OP_RETURN_SIZE`].
/// Scripts that are not OP_RETURN pass.
///
/// # Errors
///
/// [`CompatError::Script`] for broken framing, or
/// [`CompatError::OpReturnTooLarge`].
pub fn check_op_return_size(script: &Script) -> Result<(), CompatError> {
    match script.op_return_payload() {
        None => Ok(()),
        Some(payload) => {
            crate::domain::invariants::check_op_return_payload_size(payload?.len())
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged_output(script: Script) -> TxOut {
        TxOut::new(0, script)
    }

    #[test]
    fn test_build_and_parse() {
        let script = build_cvm_op_return(CvmOpType::ContractCall, &[0xAB; 10]).unwrap();
        assert_eq!(
            parse_cvm_op_return(&script),
            Some((CvmOpType::ContractCall, vec![0xAB; 10]))
        );
        assert_eq!(&script.as_bytes()[..6], &[OP_RETURN, 4, 0x43, 0x56, 0x4d, 0x31]);
    }

    #[test]
    fn test_single_push_encoding_parses() {
        let mut payload = CVM_MAGIC.to_vec();
        payload.push(0x08);
        payload.extend_from_slice(&[0x60, 0x80]);
        let script = ScriptBuilder::new()
            .push_opcode(OP_RETURN)
            .push_slice(&payload)
            .build()
            .unwrap();
        assert_eq!(
            parse_cvm_op_return(&script),
            Some((CvmOpType::EvmDeploy, vec![0x60, 0x80]))
        );
    }

    #[test]
    fn test_build_rejects_oversized_payload() {
        assert!(build_cvm_op_return(CvmOpType::ContractDeploy, &[0; 75]).is_ok());
        let err = build_cvm_op_return(CvmOpType::ContractDeploy, &[0; 76]).unwrap_err();
        assert_eq!(err, CompatError::OpReturnTooLarge { size: 81, max: 80 });
    }

    #[test]
    fn test_unknown_type_is_tagged_but_malformed() {
        let script = ScriptBuilder::new()
            .push_opcode(OP_RETURN)
            .push_slice(&CVM_MAGIC)
            .push_slice(&[0x42])
            .build()
            .unwrap();
        let tag = CvmTag::inspect(&script).unwrap();
        assert!(!tag.is_well_formed());
        assert!(tag.issue().unwrap().contains("unknown operation type"));
        assert!(parse_cvm_op_return(&script).is_none());
    }

    #[test]
    fn test_missing_type_byte() {
        let script = ScriptBuilder::new()
            .push_opcode(OP_RETURN)
            .push_slice(&CVM_MAGIC)
            .build()
            .unwrap();
        let tag = CvmTag::inspect(&script).unwrap();
        assert_eq!(tag.issue().as_deref(), Some("missing operation type"));
    }

    #[test]
    fn test_truncated_tag_is_reported() {
        let mut bytes = vec![OP_RETURN, 10];
        bytes.extend_from_slice(&CVM_MAGIC);
        bytes.push(0x01);
        let tag = CvmTag::inspect(&Script::from_bytes(bytes)).unwrap();
        assert!(tag.framing_error.is_some());
        assert!(!tag.is_well_formed());
    }

    #[test]
    fn test_untagged_outputs() {
        assert!(CvmTag::inspect(&Script::new_p2pkh(&[1; 20])).is_none());
        let plain = ScriptBuilder::new()
            .push_opcode(OP_RETURN)
            .push_slice(b"memo")
            .build()
            .unwrap();
        assert!(CvmTag::inspect(&plain).is_none());
    }

    #[test]
    fn test_find_cvm_op_return() {
        let tx = Transaction::new(
            vec![TxIn::new(OutPoint::default())],
            vec![
                TxOut::new(5_000, Script::new_p2pkh(&[1; 20])),
                tagged_output(build_cvm_op_return(CvmOpType::TrustEdge, &[1]).unwrap()),
            ],
        );
        assert_eq!(find_cvm_op_return(&tx), Some(1));
    }

    #[test]
    fn test_check_op_return_size() {
        let ok = build_cvm_op_return(CvmOpType::DaoVote, &[0; 75]).unwrap();
        assert!(check_op_return_size(&ok).is_ok());
        assert!(check_op_return_size(&Script::new_p2sh(&[0; 20])).is_ok());

        let big = ScriptBuilder::new()
            .push_opcode(OP_RETURN)
            .push_slice(&[0u8; 81])
            .build()
            .unwrap();
        assert!(matches!(
            check_op_return_size(&big),
            Err(CompatError::OpReturnTooLarge { size: 81, .. })
        ));
    }

    #[test]
    fn test_required_features() {
        assert_eq!(CvmOpType::EvmCall.required_feature(), FeatureFlag::EvmBytecode);
        assert_eq!(CvmOpType::BondedVote.required_feature(), FeatureFlag::CvmBasic);
        for byte in 1..=9u8 {
            assert_eq!(CvmOpType::from_byte(byte).unwrap().to_byte(), byte);
        }
        assert!(CvmOpType::from_byte(0).is_none());
        assert!(CvmOpType::from_byte(10).is_none());
    }
}
