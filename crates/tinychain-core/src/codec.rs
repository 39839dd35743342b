//! Canonical serialization and length-prefixed framing.
//!
//! Every entity that crosses the wire or hits disk is encoded as a JSON-like
//! textual tree tagged with a `_type` field naming the entity. Object fields
//! are emitted in lexicographic key order, which `serde_json`'s default `Map`
//! (a `BTreeMap` unless the `preserve_order` feature is enabled — it isn't,
//! here) gives us without any extra bookkeeping. Determinism matters: ids,
//! block headers, and the spend-signing message are all computed over these
//! bytes, so two equal values must always serialize to the same bytes.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// A type that can be tagged and hashed/signed/framed through the canonical codec.
pub trait Canonical: Serialize {
    const TYPE_TAG: &'static str;
}

/// Serialize `value` to its canonical, `_type`-tagged, key-sorted byte form.
pub fn to_canonical_bytes<T: Canonical>(value: &T) -> Vec<u8> {
    let mut json = serde_json::to_value(value).expect("canonical types always serialize");
    tag(&mut json, T::TYPE_TAG);
    serde_json::to_vec(&json).expect("serde_json::Value always serializes")
}

/// Serialize `value` to the canonical `_type`-tagged [`Value`] tree, without
/// flattening to bytes. Useful when a caller needs to embed one canonical
/// entity inside another (e.g. a list of blocks inside `InvMsg`).
pub fn to_canonical_value<T: Canonical>(value: &T) -> Value {
    let mut json = serde_json::to_value(value).expect("canonical types always serialize");
    tag(&mut json, T::TYPE_TAG);
    json
}

fn tag(json: &mut Value, type_tag: &'static str) {
    if let Value::Object(map) = json {
        map.insert("_type".to_string(), Value::String(type_tag.to_string()));
    }
}

/// Deserialize canonical bytes back into `T`. The `_type` tag is not checked
/// against `T::TYPE_TAG` here — callers that need tag-based dispatch among
/// several candidate types (the P2P message set) read `_type` themselves
/// before picking which `T` to deserialize into; see `tinychain-network`.
pub fn from_canonical_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Read the `_type` tag of a canonical JSON value, if present.
pub fn type_tag_of(value: &Value) -> Option<&str> {
    value.get("_type").and_then(Value::as_str)
}

/// Prefix `payload` with its big-endian `u32` length, as used for every wire
/// message and for the on-disk chain blob.
pub fn frame(payload: &[u8]) -> Vec<u8> {
    let len = payload.len() as u32;
    let mut framed = Vec::with_capacity(4 + payload.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(payload);
    framed
}

/// Split one length-prefixed frame off the front of `buf`, returning the
/// payload and the number of bytes consumed. Returns `None` if `buf` does not
/// yet contain a complete frame (the caller should read more bytes and retry).
pub fn try_split_frame(buf: &[u8]) -> Option<(&[u8], usize)> {
    if buf.len() < 4 {
        return None;
    }
    let len = u32::from_be_bytes(buf[0..4].try_into().unwrap()) as usize;
    if buf.len() < 4 + len {
        return None;
    }
    Some((&buf[4..4 + len], 4 + len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Hash256, OutPoint};

    #[test]
    fn canonical_bytes_include_type_tag() {
        let op = OutPoint { txid: Hash256::ZERO, txout_idx: 1 };
        let bytes = to_canonical_bytes(&op);
        let v: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(v.get("_type").unwrap().as_str().unwrap(), "OutPoint");
    }

    #[test]
    fn canonical_bytes_sort_object_keys() {
        let op = OutPoint { txid: Hash256::ZERO, txout_idx: 1 };
        let bytes = to_canonical_bytes(&op);
        let s = String::from_utf8(bytes).unwrap();
        let type_pos = s.find("\"_type\"").unwrap();
        let txid_pos = s.find("\"txid\"").unwrap();
        let idx_pos = s.find("\"txout_idx\"").unwrap();
        assert!(type_pos < txid_pos);
        assert!(txid_pos < idx_pos);
    }

    #[test]
    fn canonical_bytes_deterministic() {
        let op = OutPoint { txid: Hash256::ZERO, txout_idx: 1 };
        assert_eq!(to_canonical_bytes(&op), to_canonical_bytes(&op));
    }

    #[test]
    fn round_trip_through_canonical_bytes() {
        let op = OutPoint { txid: Hash256::ZERO, txout_idx: 7 };
        let bytes = to_canonical_bytes(&op);
        let back: OutPoint = from_canonical_bytes(&bytes).unwrap();
        assert_eq!(back, op);
    }

    #[test]
    fn frame_prefixes_big_endian_length() {
        let framed = frame(b"abc");
        assert_eq!(&framed[0..4], &[0, 0, 0, 3]);
        assert_eq!(&framed[4..], b"abc");
    }

    #[test]
    fn try_split_frame_needs_full_payload() {
        let framed = frame(b"hello world");
        assert!(try_split_frame(&framed[..4]).is_none());
        assert!(try_split_frame(&framed[..8]).is_none());
        let (payload, consumed) = try_split_frame(&framed).unwrap();
        assert_eq!(payload, b"hello world");
        assert_eq!(consumed, framed.len());
    }

    #[test]
    fn try_split_frame_leaves_remainder_for_next_message() {
        let mut buf = frame(b"first");
        buf.extend_from_slice(&frame(b"second"));
        let (first, consumed) = try_split_frame(&buf).unwrap();
        assert_eq!(first, b"first");
        let rest = &buf[consumed..];
        let (second, _) = try_split_frame(rest).unwrap();
        assert_eq!(second, b"second");
    }

    proptest::proptest! {
        #[test]
        fn outpoint_round_trips_through_canonical_bytes(
            txid_bytes in proptest::array::uniform32(proptest::prelude::any::<u8>()),
            txout_idx in proptest::prelude::any::<u32>(),
        ) {
            let op = OutPoint { txid: Hash256::from_bytes(txid_bytes), txout_idx };
            let bytes = to_canonical_bytes(&op);
            let back: OutPoint = from_canonical_bytes(&bytes).unwrap();
            proptest::prop_assert_eq!(back, op);
        }

        #[test]
        fn frame_round_trips_through_try_split_frame(payload in proptest::collection::vec(proptest::prelude::any::<u8>(), 0..256)) {
            let framed = frame(&payload);
            let (parsed, consumed) = try_split_frame(&framed).unwrap();
            proptest::prop_assert_eq!(parsed, payload.as_slice());
            proptest::prop_assert_eq!(consumed, framed.len());
        }
    }
}
