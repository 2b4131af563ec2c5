//! Message kinds carried by transactions.
//!
//! [`Msg`] is a closed tagged union. Each kind has a stable type tag (binary)
//! and type name (JSON), a stateless `validate_basic`, and a signer list whose
//! order fixes the order of signatures in the enclosing transaction.

use serde::{Deserialize, Serialize};

use crate::codec::{
    BinaryDecode, BinaryEncode, Reader, Tagged, TypeFamily, TypeRegistry, TypeTag, Writer,
};
use crate::coin::Coins;
use crate::error::{CodecError, CodecResult};
use crate::types::Address;

pub const SEND_MSG: TypeTag = TypeTag::new(TypeFamily::Msg, 0x01, "bank/send");
pub const IBC_TRANSFER_MSG: TypeTag = TypeTag::new(TypeFamily::Msg, 0x10, "ibc/transfer");
pub const IBC_RECEIVE_MSG: TypeTag = TypeTag::new(TypeFamily::Msg, 0x11, "ibc/receive");

/// Every message kind this build understands.
pub const ALL_MSG_TYPES: [TypeTag; 3] = [SEND_MSG, IBC_TRANSFER_MSG, IBC_RECEIVE_MSG];

/// Stateless validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MsgError {
    #[error("invalid coins: {0}")]
    InvalidCoins(String),

    #[error("invalid ibc packet: {0}")]
    InvalidPacket(String),
}

/// One debited party of a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub address: Address,
    pub coins: Coins,
}

/// One credited party of a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub address: Address,
    pub coins: Coins,
}

impl Input {
    pub fn new(address: Address, coins: Coins) -> Self {
        Self { address, coins }
    }
}

impl Output {
    pub fn new(address: Address, coins: Coins) -> Self {
        Self { address, coins }
    }
}

/// Multi-input, multi-output value transfer on this chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMsg {
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
}

impl SendMsg {
    pub fn new(inputs: Vec<Input>, outputs: Vec<Output>) -> Self {
        Self { inputs, outputs }
    }

    /// Convenience constructor for a single payer and payee.
    pub fn single(from: Address, to: Address, coins: Coins) -> Self {
        Self::new(
            vec![Input::new(from, coins.clone())],
            vec![Output::new(to, coins)],
        )
    }

    pub fn validate_basic(&self) -> Result<(), MsgError> {
        if self.inputs.is_empty() {
            return Err(MsgError::InvalidCoins("send has no inputs".into()));
        }
        if self.outputs.is_empty() {
            return Err(MsgError::InvalidCoins("send has no outputs".into()));
        }
        let mut total_in = Coins::empty();
        for input in &self.inputs {
            check_positive(&input.coins)?;
            total_in = total_in
                .checked_add(&input.coins)
                .ok_or_else(|| MsgError::InvalidCoins("input sum overflows".into()))?;
        }
        let mut total_out = Coins::empty();
        for output in &self.outputs {
            check_positive(&output.coins)?;
            total_out = total_out
                .checked_add(&output.coins)
                .ok_or_else(|| MsgError::InvalidCoins("output sum overflows".into()))?;
        }
        if total_in != total_out {
            return Err(MsgError::InvalidCoins(format!(
                "inputs {} do not match outputs {}",
                total_in, total_out
            )));
        }
        Ok(())
    }

    pub fn signers(&self) -> Vec<Address> {
        self.inputs.iter().map(|i| i.address).collect()
    }
}

/// A value transfer between two chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbcPacket {
    pub src_addr: Address,
    pub dest_addr: Address,
    pub coins: Coins,
    pub src_chain: String,
    pub dest_chain: String,
}

impl IbcPacket {
    pub fn validate_basic(&self) -> Result<(), MsgError> {
        if self.src_chain.is_empty() || self.dest_chain.is_empty() {
            return Err(MsgError::InvalidPacket("empty chain id".into()));
        }
        if self.src_chain == self.dest_chain {
            return Err(MsgError::InvalidPacket(format!(
                "source and destination are both {}",
                self.src_chain
            )));
        }
        check_positive(&self.coins)
    }
}

/// Start a cross-chain transfer from `packet.src_addr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbcTransferMsg {
    pub packet: IbcPacket,
}

/// Relay a packet from another chain, at the given ingress sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbcReceiveMsg {
    pub packet: IbcPacket,
    pub relayer: Address,
    pub sequence: u64,
}

/// Closed set of message kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Msg {
    #[serde(rename = "bank/send")]
    Send(SendMsg),
    #[serde(rename = "ibc/transfer")]
    IbcTransfer(IbcTransferMsg),
    #[serde(rename = "ibc/receive")]
    IbcReceive(IbcReceiveMsg),
}

impl Msg {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Self::Send(_) => SEND_MSG,
            Self::IbcTransfer(_) => IBC_TRANSFER_MSG,
            Self::IbcReceive(_) => IBC_RECEIVE_MSG,
        }
    }

    /// Checks that need no store access.
    pub fn validate_basic(&self) -> Result<(), MsgError> {
        match self {
            Self::Send(msg) => msg.validate_basic(),
            Self::IbcTransfer(msg) => msg.packet.validate_basic(),
            Self::IbcReceive(msg) => msg.packet.validate_basic(),
        }
    }

    /// Addresses that must sign, in signature order.
    pub fn signers(&self) -> Vec<Address> {
        match self {
            Self::Send(msg) => msg.signers(),
            Self::IbcTransfer(msg) => vec![msg.packet.src_addr],
            Self::IbcReceive(msg) => vec![msg.relayer],
        }
    }
}

impl Tagged for Msg {
    fn type_tags(&self) -> Vec<TypeTag> {
        vec![self.type_tag()]
    }
}

fn check_positive(coins: &Coins) -> Result<(), MsgError> {
    if !coins.is_valid() {
        return Err(MsgError::InvalidCoins(format!("{:?} is not canonical", coins)));
    }
    if coins.is_empty() {
        return Err(MsgError::InvalidCoins("no coins".into()));
    }
    Ok(())
}

// ── Binary encoding ──

impl BinaryEncode for IbcPacket {
    fn encode(&self, w: &mut Writer) {
        self.src_addr.encode(w);
        self.dest_addr.encode(w);
        self.coins.encode(w);
        w.write_string(&self.src_chain);
        w.write_string(&self.dest_chain);
    }
}

impl BinaryDecode for IbcPacket {
    fn decode(r: &mut Reader<'_>, registry: &TypeRegistry) -> CodecResult<Self> {
        Ok(Self {
            src_addr: Address::decode(r, registry)?,
            dest_addr: Address::decode(r, registry)?,
            coins: Coins::decode(r, registry)?,
            src_chain: r.read_string()?,
            dest_chain: r.read_string()?,
        })
    }
}

fn encode_parties<'a>(w: &mut Writer, parties: impl ExactSizeIterator<Item = (&'a Address, &'a Coins)>) {
    w.write_count(parties.len());
    for (address, coins) in parties {
        address.encode(w);
        coins.encode(w);
    }
}

fn decode_parties(r: &mut Reader<'_>, registry: &TypeRegistry) -> CodecResult<Vec<(Address, Coins)>> {
    let count = r.read_count(20 + 4)?;
    (0..count)
        .map(|_| Ok((Address::decode(r, registry)?, Coins::decode(r, registry)?)))
        .collect()
}

impl BinaryEncode for Msg {
    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.type_tag().tag);
        match self {
            Self::Send(msg) => {
                encode_parties(w, msg.inputs.iter().map(|i| (&i.address, &i.coins)));
                encode_parties(w, msg.outputs.iter().map(|o| (&o.address, &o.coins)));
            }
            Self::IbcTransfer(msg) => msg.packet.encode(w),
            Self::IbcReceive(msg) => {
                msg.packet.encode(w);
                msg.relayer.encode(w);
                w.write_u64(msg.sequence);
            }
        }
    }
}

impl BinaryDecode for Msg {
    fn decode(r: &mut Reader<'_>, registry: &TypeRegistry) -> CodecResult<Self> {
        let tag = r.read_u8()?;
        registry.require_tag(TypeFamily::Msg, tag)?;
        match tag {
            t if t == SEND_MSG.tag => {
                let inputs = decode_parties(r, registry)?
                    .into_iter()
                    .map(|(address, coins)| Input { address, coins })
                    .collect();
                let outputs = decode_parties(r, registry)?
                    .into_iter()
                    .map(|(address, coins)| Output { address, coins })
                    .collect();
                Ok(Self::Send(SendMsg { inputs, outputs }))
            }
            t if t == IBC_TRANSFER_MSG.tag => Ok(Self::IbcTransfer(IbcTransferMsg {
                packet: IbcPacket::decode(r, registry)?,
            })),
            t if t == IBC_RECEIVE_MSG.tag => Ok(Self::IbcReceive(IbcReceiveMsg {
                packet: IbcPacket::decode(r, registry)?,
                relayer: Address::decode(r, registry)?,
                sequence: r.read_u64()?,
            })),
            // Registered under a tag this build has no decoder for.
            other => Err(CodecError::malformed("msg", format!("no decoder for tag 0x{:02x}", other))),
        }
    }
}
