//! Deterministic binary and JSON encoding with a closed type registry.
//!
//! Binary encoding format:
//! - Fixed-size integers are little-endian (`u64` is always 8 bytes)
//! - Variable-length fields (`Vec<u8>`, `String`) are length-prefixed (u32 LE)
//! - Repeated fields are count-prefixed (u32 LE) then concatenated
//! - Optional fields: 1-byte flag (0=None, 1=Some) then the value if Some
//! - Polymorphic values (accounts, messages): 1-byte type tag then the body
//!
//! Every polymorphic type tag that may appear in input must be registered in
//! the [`Codec`]'s [`TypeRegistry`] first. Decoding an unregistered tag fails;
//! the codec never falls back to a guess. The registry is only mutable through
//! `&mut Codec`, so a codec shared by reference is frozen.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::coin::{Coin, Coins};
use crate::error::{CodecError, CodecResult};
use crate::types::{Address, PubKey, ADDRESS_LEN, PUB_KEY_LEN};

/// Cursor over input bytes.
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn read_bytes(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if n > self.remaining() {
            return Err(CodecError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> CodecResult<u64> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_bool(&mut self) -> CodecResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => Err(CodecError::malformed("bool", format!("byte {}", b))),
        }
    }

    pub fn read_var_bytes(&mut self) -> CodecResult<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }

    pub fn read_string(&mut self) -> CodecResult<String> {
        String::from_utf8(self.read_var_bytes()?)
            .map_err(|_| CodecError::malformed("string", "invalid UTF-8"))
    }

    /// Read a count prefix, rejecting counts that cannot possibly fit in the
    /// remaining input (each element occupies at least `min_elem` bytes).
    pub fn read_count(&mut self, min_elem: usize) -> CodecResult<usize> {
        let count = self.read_u32()? as usize;
        if count.saturating_mul(min_elem.max(1)) > self.remaining() {
            return Err(CodecError::UnexpectedEof);
        }
        Ok(count)
    }

    /// Fail if any input is left over.
    pub fn finish(self) -> CodecResult<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

/// Output buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_bool(&mut self, v: bool) {
        self.buf.push(u8::from(v));
    }

    pub fn write_raw(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn write_var_bytes(&mut self, data: &[u8]) {
        self.write_u32(data.len() as u32);
        self.buf.extend_from_slice(data);
    }

    pub fn write_string(&mut self, s: &str) {
        self.write_var_bytes(s.as_bytes());
    }

    pub fn write_count(&mut self, n: usize) {
        self.write_u32(n as u32);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Types with a deterministic binary encoding.
pub trait BinaryEncode {
    fn encode(&self, w: &mut Writer);
}

/// Types decodable from the binary encoding.
///
/// Polymorphic types consult `registry` before interpreting a type tag.
pub trait BinaryDecode: Sized {
    fn decode(r: &mut Reader<'_>, registry: &TypeRegistry) -> CodecResult<Self>;
}

/// Polymorphic families that carry a type tag in their encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeFamily {
    Account,
    Msg,
}

impl TypeFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Msg => "msg",
        }
    }
}

/// Stable identity of one concrete kind within a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeTag {
    pub family: TypeFamily,
    pub tag: u8,
    pub name: &'static str,
}

impl TypeTag {
    pub const fn new(family: TypeFamily, tag: u8, name: &'static str) -> Self {
        Self { family, tag, name }
    }
}

/// Values whose decoded form names registered kinds, checked after JSON
/// decoding.
pub trait Tagged {
    fn type_tags(&self) -> Vec<TypeTag>;
}

/// Registration failure; always a construction-time misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("{family} tag 0x{tag:02x} already registered as {existing:?}")]
    DuplicateTag {
        family: &'static str,
        tag: u8,
        existing: &'static str,
    },
    #[error("{family} name {name:?} already registered")]
    DuplicateName { family: &'static str, name: &'static str },
}

/// Closed table of registered (family, tag) → name entries.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    entries: BTreeMap<(TypeFamily, u8), &'static str>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&mut self, tag: TypeTag) -> Result<(), RegistryError> {
        if let Some(&existing) = self.entries.get(&(tag.family, tag.tag)) {
            return Err(RegistryError::DuplicateTag {
                family: tag.family.as_str(),
                tag: tag.tag,
                existing,
            });
        }
        if self.name_to_tag(tag.family, tag.name).is_some() {
            return Err(RegistryError::DuplicateName {
                family: tag.family.as_str(),
                name: tag.name,
            });
        }
        self.entries.insert((tag.family, tag.tag), tag.name);
        Ok(())
    }

    fn name_to_tag(&self, family: TypeFamily, name: &str) -> Option<u8> {
        self.entries
            .iter()
            .find(|((fam, _), n)| *fam == family && **n == name)
            .map(|((_, tag), _)| *tag)
    }

    pub fn contains(&self, tag: &TypeTag) -> bool {
        self.entries.get(&(tag.family, tag.tag)) == Some(&tag.name)
    }

    /// Look up a tag read from binary input.
    pub fn require_tag(&self, family: TypeFamily, tag: u8) -> CodecResult<&'static str> {
        self.entries
            .get(&(family, tag))
            .copied()
            .ok_or(CodecError::UnregisteredTag {
                family: family.as_str(),
                tag,
            })
    }

    /// Check a kind named in JSON input.
    pub fn require_name(&self, family: TypeFamily, name: &str) -> CodecResult<u8> {
        self.name_to_tag(family, name)
            .ok_or_else(|| CodecError::UnregisteredName {
                family: family.as_str(),
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Binary/JSON codec bound to a type registry.
#[derive(Debug, Clone, Default)]
pub struct Codec {
    registry: TypeRegistry,
}

impl Codec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one concrete kind.
    pub fn register(&mut self, tag: TypeTag) -> Result<(), RegistryError> {
        self.registry.register(tag)
    }

    /// Register several kinds, stopping at the first conflict.
    pub fn register_all(&mut self, tags: &[TypeTag]) -> Result<(), RegistryError> {
        tags.iter().try_for_each(|tag| self.register(*tag))
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn encode_binary<T: BinaryEncode + ?Sized>(&self, value: &T) -> Vec<u8> {
        let mut w = Writer::new();
        value.encode(&mut w);
        w.into_bytes()
    }

    /// Decode a complete value; trailing bytes are an error.
    pub fn decode_binary<T: BinaryDecode>(&self, data: &[u8]) -> CodecResult<T> {
        let mut r = Reader::new(data);
        let value = T::decode(&mut r, &self.registry)?;
        r.finish()?;
        Ok(value)
    }

    pub fn encode_json<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Decode JSON and verify every polymorphic kind it names is registered.
    pub fn decode_json<T: DeserializeOwned + Tagged>(&self, data: &[u8]) -> CodecResult<T> {
        let value: T = serde_json::from_slice(data)?;
        for tag in value.type_tags() {
            if !self.registry.contains(&tag) {
                self.registry.require_name(tag.family, tag.name)?;
                return Err(CodecError::UnregisteredTag {
                    family: tag.family.as_str(),
                    tag: tag.tag,
                });
            }
        }
        Ok(value)
    }
}

/// Encode a counter as 8 little-endian bytes.
pub fn encode_u64(v: u64) -> [u8; 8] {
    v.to_le_bytes()
}

/// Decode a counter; anything but exactly 8 bytes is malformed.
pub fn decode_u64(bytes: &[u8]) -> CodecResult<u64> {
    let arr: [u8; 8] = bytes
        .try_into()
        .map_err(|_| CodecError::malformed("u64", format!("{} bytes", bytes.len())))?;
    Ok(u64::from_le_bytes(arr))
}

// ── Encodings for shared leaf types ──

impl BinaryEncode for u64 {
    fn encode(&self, w: &mut Writer) {
        w.write_u64(*self);
    }
}

impl BinaryDecode for u64 {
    fn decode(r: &mut Reader<'_>, _: &TypeRegistry) -> CodecResult<Self> {
        r.read_u64()
    }
}

impl BinaryEncode for Address {
    fn encode(&self, w: &mut Writer) {
        w.write_raw(&self.0);
    }
}

impl BinaryDecode for Address {
    fn decode(r: &mut Reader<'_>, _: &TypeRegistry) -> CodecResult<Self> {
        Ok(Address(r.read_array::<ADDRESS_LEN>()?))
    }
}

impl BinaryEncode for PubKey {
    fn encode(&self, w: &mut Writer) {
        w.write_raw(&self.0);
    }
}

impl BinaryDecode for PubKey {
    fn decode(r: &mut Reader<'_>, _: &TypeRegistry) -> CodecResult<Self> {
        Ok(PubKey(r.read_array::<PUB_KEY_LEN>()?))
    }
}

impl BinaryEncode for Coins {
    fn encode(&self, w: &mut Writer) {
        w.write_count(self.len());
        for coin in self.iter() {
            w.write_string(&coin.denom);
            w.write_u64(coin.amount);
        }
    }
}

impl BinaryDecode for Coins {
    fn decode(r: &mut Reader<'_>, _: &TypeRegistry) -> CodecResult<Self> {
        let count = r.read_count(4 + 8)?;
        let mut coins = Vec::with_capacity(count);
        for _ in 0..count {
            let denom = r.read_string()?;
            let amount = r.read_u64()?;
            coins.push(Coin { denom, amount });
        }
        Ok(Coins::from_vec(coins))
    }
}

impl<T: BinaryEncode> BinaryEncode for Option<T> {
    fn encode(&self, w: &mut Writer) {
        match self {
            None => w.write_u8(0),
            Some(v) => {
                w.write_u8(1);
                v.encode(w);
            }
        }
    }
}

impl<T: BinaryDecode> BinaryDecode for Option<T> {
    fn decode(r: &mut Reader<'_>, registry: &TypeRegistry) -> CodecResult<Self> {
        match r.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(T::decode(r, registry)?)),
            flag => Err(CodecError::malformed("option flag", format!("byte {}", flag))),
        }
    }
}
