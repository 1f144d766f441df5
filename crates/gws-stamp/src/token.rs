//! Opaque persisted form of a [`ChangeStamp`].
//!
//! Layout: `[1 byte version][bincode payload]`. Callers store the bytes
//! verbatim and never interpret them.

use crate::error::{StampError, StampResult};
use crate::stamp::ChangeStamp;

/// Current token format version.
pub const TOKEN_VERSION: u8 = 1;

/// Encode a stamp into an opaque token.
pub fn encode(stamp: &ChangeStamp) -> StampResult<Vec<u8>> {
    let payload = bincode::serialize(stamp).map_err(|e| StampError::Encode(e.to_string()))?;
    let mut buf = Vec::with_capacity(1 + payload.len());
    buf.push(TOKEN_VERSION);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decode a token produced by [`encode`].
pub fn decode(data: &[u8]) -> StampResult<ChangeStamp> {
    let (version, payload) = data
        .split_first()
        .ok_or_else(|| StampError::Decode("empty token".into()))?;
    if *version != TOKEN_VERSION {
        return Err(StampError::Decode(format!("unsupported version {version}")));
    }
    bincode::deserialize(payload).map_err(|e| StampError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use gws_types::BackendId;
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn token_starts_with_version() {
        let stamp = ChangeStamp::uids(3, 9, [BackendId(1), BackendId(8)]);
        let token = encode(&stamp).unwrap();
        assert_eq!(token[0], TOKEN_VERSION);
        assert_eq!(decode(&token).unwrap(), stamp);
    }

    #[test]
    fn modseq_kind_survives() {
        let stamp = ChangeStamp::modseq(3, 9, 120, [BackendId(2)]);
        let back = decode(&encode(&stamp).unwrap()).unwrap();
        assert_eq!(back.highest_modseq(), Some(120));
        assert_eq!(back.kind(), "modseq");
    }

    #[test]
    fn empty_token_rejected() {
        assert!(matches!(decode(&[]), Err(StampError::Decode(_))));
    }

    #[test]
    fn unknown_version_rejected() {
        let mut token = encode(&ChangeStamp::uids(1, 1, [])).unwrap();
        token[0] = 9;
        assert!(matches!(decode(&token), Err(StampError::Decode(_))));
    }

    #[test]
    fn truncated_token_rejected() {
        let token = encode(&ChangeStamp::uids(1, 4, [BackendId(1), BackendId(2)])).unwrap();
        assert!(matches!(decode(&token[..token.len() - 3]), Err(StampError::Decode(_))));
    }

    proptest! {
        #[test]
        fn decoded_stamp_compares_like_original(
            gen in 0u64..10,
            next in 0u64..1000,
            ids in proptest::collection::vec(0u64..500, 0..50),
            other_ids in proptest::collection::vec(0u64..500, 0..50),
        ) {
            let original = ChangeStamp::uids(gen, next, ids.into_iter().map(BackendId));
            let decoded = decode(&encode(&original).unwrap()).unwrap();
            prop_assert_eq!(decoded.get_changes(&original).unwrap(), None);

            let third = ChangeStamp::uids(gen, next + 1, other_ids.into_iter().map(BackendId));
            prop_assert_eq!(
                decoded.get_changes(&third).unwrap(),
                original.get_changes(&third).unwrap()
            );
        }
    }
}
