//! Cross-chain packet queues.
//!
//! Outgoing packets are appended to a per-destination egress queue that a
//! relayer reads; incoming packets are accepted strictly in order using a
//! per-source ingress sequence. Store layout inside the IBC partition:
//!
//! - `egress/<dest>/<index>`: encoded packet
//! - `egress/<dest>`: queue length (u64, 8 bytes LE)
//! - `ingress/<src>`: next acceptable receive sequence (u64, 8 bytes LE)

use keel_primitives::codec::{decode_u64, encode_u64};
use keel_primitives::{Account, Codec, IbcPacket, IbcReceiveMsg, IbcTransferMsg};
use tracing::debug;

use crate::bank::CoinKeeper;
use crate::context::Context;
use crate::error::{InvariantViolation, TxError};
use crate::store::{KVReader, KVStore, StoreKey};

fn egress_key(dest_chain: &str, index: u64) -> Vec<u8> {
    format!("egress/{}/{}", dest_chain, index).into_bytes()
}

fn egress_length_key(dest_chain: &str) -> Vec<u8> {
    format!("egress/{}", dest_chain).into_bytes()
}

fn ingress_key(src_chain: &str) -> Vec<u8> {
    format!("ingress/{}", src_chain).into_bytes()
}

/// Egress queues and ingress counters in one store partition.
#[derive(Debug, Clone)]
pub struct IbcMapper {
    key: StoreKey,
    codec: Codec,
}

impl IbcMapper {
    pub fn new(key: StoreKey) -> Self {
        Self {
            key,
            codec: Codec::new(),
        }
    }

    fn read_counter(&self, ctx: &mut Context<'_>, key: &[u8]) -> Result<Option<u64>, TxError> {
        match ctx.kv_store(&self.key).get(key) {
            None => Ok(None),
            Some(bytes) => decode_u64(&bytes)
                .map(Some)
                .map_err(|err| InvariantViolation::corrupt("ibc counter", key, err).into()),
        }
    }

    /// Append `packet` to the egress queue of its destination chain.
    pub fn post_packet(&self, ctx: &mut Context<'_>, packet: &IbcPacket) -> Result<u64, TxError> {
        let index = self.get_egress_length(ctx, &packet.dest_chain)?;
        let mut store = ctx.kv_store(&self.key);
        store.set(
            &egress_key(&packet.dest_chain, index),
            &self.codec.encode_binary(packet),
        );
        store.set(&egress_length_key(&packet.dest_chain), &encode_u64(index + 1));
        Ok(index)
    }

    /// Number of packets ever posted to `dest_chain`.
    pub fn get_egress_length(&self, ctx: &mut Context<'_>, dest_chain: &str) -> Result<u64, TxError> {
        Ok(self
            .read_counter(ctx, &egress_length_key(dest_chain))?
            .unwrap_or(0))
    }

    pub fn get_egress_packet(
        &self,
        ctx: &mut Context<'_>,
        dest_chain: &str,
        index: u64,
    ) -> Result<Option<IbcPacket>, TxError> {
        let key = egress_key(dest_chain, index);
        let Some(bytes) = ctx.kv_store(&self.key).get(&key) else {
            return Ok(None);
        };
        self.codec
            .decode_binary::<IbcPacket>(&bytes)
            .map(Some)
            .map_err(|err| InvariantViolation::corrupt("ibc packet", &key, err).into())
    }

    /// Next acceptable sequence from `src_chain`. The counter is created
    /// at zero on first access.
    pub fn get_ingress_sequence(&self, ctx: &mut Context<'_>, src_chain: &str) -> Result<u64, TxError> {
        let key = ingress_key(src_chain);
        match self.read_counter(ctx, &key)? {
            Some(seq) => Ok(seq),
            None => {
                ctx.kv_store(&self.key).set(&key, &encode_u64(0));
                Ok(0)
            }
        }
    }

    pub fn set_ingress_sequence(&self, ctx: &mut Context<'_>, src_chain: &str, sequence: u64) {
        ctx.kv_store(&self.key)
            .set(&ingress_key(src_chain), &encode_u64(sequence));
    }
}

/// Debit the sender, then queue the packet for relay.
pub fn handle_transfer<A: Account>(
    ctx: &mut Context<'_>,
    keeper: &CoinKeeper<'_, A>,
    ibc: &IbcMapper,
    msg: &IbcTransferMsg,
) -> Result<(), TxError> {
    let packet = &msg.packet;
    keeper.subtract_coins(ctx, packet.src_addr, &packet.coins)?;
    let index = ibc.post_packet(ctx, packet)?;
    debug!(
        mode = ctx.mode().as_str(),
        height = ctx.height(),
        dest_chain = %packet.dest_chain,
        index,
        "posted ibc packet"
    );
    Ok(())
}

/// Credit a relayed packet if it is the next one expected from its source.
pub fn handle_receive<A: Account>(
    ctx: &mut Context<'_>,
    keeper: &CoinKeeper<'_, A>,
    ibc: &IbcMapper,
    msg: &IbcReceiveMsg,
) -> Result<(), TxError> {
    let packet = &msg.packet;
    let expected = ibc.get_ingress_sequence(ctx, &packet.src_chain)?;
    if msg.sequence != expected {
        return Err(TxError::InvalidIbcPacket(format!(
            "packet from {} has sequence {}, expected {}",
            packet.src_chain, msg.sequence, expected
        )));
    }
    keeper.add_coins(ctx, packet.dest_addr, &packet.coins)?;
    ibc.set_ingress_sequence(ctx, &packet.src_chain, expected + 1);
    debug!(
        mode = ctx.mode().as_str(),
        height = ctx.height(),
        src_chain = %packet.src_chain,
        sequence = expected,
        "received ibc packet"
    );
    Ok(())
}
