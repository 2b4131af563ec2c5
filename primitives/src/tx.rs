//! Signed transactions.
//!
//! A [`Tx`] carries one message, a fee, and one [`StdSignature`] per signer of
//! the message, in the order given by [`Msg::signers`]. Each signature covers
//! the same sign bytes: chain id, every claimed sequence, fee, and message.

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};

use crate::codec::{BinaryDecode, BinaryEncode, Reader, Tagged, TypeRegistry, TypeTag, Writer};
use crate::coin::Coins;
use crate::crypto::{pub_key_of, sign_ed25519};
use crate::error::CodecResult;
use crate::msg::Msg;
use crate::types::{hex_bytes, PubKey, PUB_KEY_LEN, SIGNATURE_LEN};

/// Fee offered by the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StdFee {
    #[serde(default)]
    pub amount: Coins,
    #[serde(default)]
    pub gas: u64,
}

impl StdFee {
    pub fn new(amount: Coins, gas: u64) -> Self {
        Self { amount, gas }
    }

    /// No fee at all.
    pub fn zero() -> Self {
        Self::default()
    }
}

/// One signer's authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    pub pub_key: PubKey,
    #[serde(with = "hex_bytes")]
    pub signature: [u8; SIGNATURE_LEN],
    pub sequence: u64,
}

/// A message plus fee and signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tx {
    pub msg: Msg,
    #[serde(default)]
    pub fee: StdFee,
    #[serde(default)]
    pub signatures: Vec<StdSignature>,
}

impl Tx {
    /// Unsigned transaction; add signatures with [`Tx::sign`].
    pub fn new(msg: Msg, fee: StdFee) -> Self {
        Self {
            msg,
            fee,
            signatures: Vec::new(),
        }
    }

    /// Claimed sequences, in signature order.
    pub fn sequences(&self) -> Vec<u64> {
        self.signatures.iter().map(|s| s.sequence).collect()
    }

    /// Sign for every key in `signers` at the matching sequence and replace
    /// any existing signatures. Keys must be given in `msg.signers()` order.
    pub fn sign(mut self, chain_id: &str, signers: &[(&SigningKey, u64)]) -> Self {
        let sequences: Vec<u64> = signers.iter().map(|(_, seq)| *seq).collect();
        let bytes = sign_bytes(chain_id, &sequences, &self.fee, &self.msg);
        self.signatures = signers
            .iter()
            .map(|(key, sequence)| StdSignature {
                pub_key: pub_key_of(key),
                signature: sign_ed25519(&bytes, key),
                sequence: *sequence,
            })
            .collect();
        self
    }
}

/// Canonical bytes every signer of a transaction signs.
pub fn sign_bytes(chain_id: &str, sequences: &[u64], fee: &StdFee, msg: &Msg) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_string(chain_id);
    w.write_count(sequences.len());
    for seq in sequences {
        w.write_u64(*seq);
    }
    fee.encode(&mut w);
    msg.encode(&mut w);
    w.into_bytes()
}

impl BinaryEncode for StdFee {
    fn encode(&self, w: &mut Writer) {
        self.amount.encode(w);
        w.write_u64(self.gas);
    }
}

impl BinaryDecode for StdFee {
    fn decode(r: &mut Reader<'_>, registry: &TypeRegistry) -> CodecResult<Self> {
        Ok(Self {
            amount: Coins::decode(r, registry)?,
            gas: r.read_u64()?,
        })
    }
}

impl BinaryEncode for StdSignature {
    fn encode(&self, w: &mut Writer) {
        self.pub_key.encode(w);
        w.write_raw(&self.signature);
        w.write_u64(self.sequence);
    }
}

impl BinaryDecode for StdSignature {
    fn decode(r: &mut Reader<'_>, registry: &TypeRegistry) -> CodecResult<Self> {
        Ok(Self {
            pub_key: PubKey::decode(r, registry)?,
            signature: r.read_array::<SIGNATURE_LEN>()?,
            sequence: r.read_u64()?,
        })
    }
}

impl BinaryEncode for Tx {
    fn encode(&self, w: &mut Writer) {
        self.msg.encode(w);
        self.fee.encode(w);
        w.write_count(self.signatures.len());
        for sig in &self.signatures {
            sig.encode(w);
        }
    }
}

impl BinaryDecode for Tx {
    fn decode(r: &mut Reader<'_>, registry: &TypeRegistry) -> CodecResult<Self> {
        let msg = Msg::decode(r, registry)?;
        let fee = StdFee::decode(r, registry)?;
        let count = r.read_count(PUB_KEY_LEN + SIGNATURE_LEN + 8)?;
        let signatures = (0..count)
            .map(|_| StdSignature::decode(r, registry))
            .collect::<CodecResult<Vec<_>>>()?;
        Ok(Self {
            msg,
            fee,
            signatures,
        })
    }
}

impl Tagged for Tx {
    fn type_tags(&self) -> Vec<TypeTag> {
        self.msg.type_tags()
    }
}
