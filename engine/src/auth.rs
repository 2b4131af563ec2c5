//! Signer authentication and replay protection.
//!
//! For each signer of the message, paired with the signature at the same
//! position: the account must exist, the supplied key must be (or become) the
//! account's bound key, the claimed sequence must equal the stored one, and
//! the signature must verify over the transaction's sign bytes. The sequence
//! is then advanced and the account written back.

use keel_primitives::crypto::verify_ed25519;
use keel_primitives::{sign_bytes, Account, Address, Tx};

use crate::account_mapper::SealedAccountMapper;
use crate::context::Context;
use crate::error::TxError;

/// Authenticate every signer of `tx` and advance their sequences.
///
/// `signers` must be `tx.msg.signers()` with the signature count already
/// checked against it. Returns the updated signer accounts in order.
pub fn authenticate<A: Account>(
    ctx: &mut Context<'_>,
    accounts: &SealedAccountMapper<A>,
    tx: &Tx,
    signers: &[Address],
) -> Result<Vec<A>, TxError> {
    let bytes = sign_bytes(ctx.chain_id(), &tx.sequences(), &tx.fee, &tx.msg);
    let mut authenticated = Vec::with_capacity(signers.len());

    for (address, sig) in signers.iter().zip(&tx.signatures) {
        let mut acc = accounts
            .get_account(ctx, *address)?
            .ok_or(TxError::UnknownAddress(*address))?;

        match acc.pub_key().copied() {
            Some(bound) if bound != sig.pub_key => {
                return Err(TxError::InvalidSignature(format!(
                    "key does not match the one bound to {}",
                    address
                )));
            }
            Some(_) => {}
            None => {
                if sig.pub_key.address() != *address {
                    return Err(TxError::InvalidSignature(format!(
                        "key derives {}, not {}",
                        sig.pub_key.address(),
                        address
                    )));
                }
                acc.set_pub_key(sig.pub_key)
                    .map_err(|err| TxError::InvalidSignature(err.to_string()))?;
            }
        }

        if sig.sequence != acc.sequence() {
            return Err(TxError::InvalidSequence {
                address: *address,
                expected: acc.sequence(),
                got: sig.sequence,
            });
        }

        if !verify_ed25519(&bytes, &sig.signature, &sig.pub_key) {
            return Err(TxError::Unauthorized(format!("bad signature from {}", address)));
        }

        acc.increment_sequence()
            .map_err(|err| TxError::Unauthorized(err.to_string()))?;
        accounts.set_account(ctx, &acc);
        authenticated.push(acc);
    }

    Ok(authenticated)
}
