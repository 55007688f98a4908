//! JSON encoding of the explore ledger.

use fog_map_geography_models::Coordinate;
use fog_map_ledger::LedgerSnapshot;
use serde::{Serialize, Serializer};

use crate::StoreError;

struct SnapshotPoints<'a>(&'a LedgerSnapshot);

impl Serialize for SnapshotPoints<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

/// Serializes `points` as a JSON array of `{latitude, longitude}` objects.
///
/// # Errors
///
/// * If serialization fails
pub fn encode_ledger(points: &[Coordinate]) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(points)?)
}

/// Serializes a ledger snapshot in the same format as [`encode_ledger`],
/// walking its chunks without copying them into one buffer.
///
/// # Errors
///
/// * If serialization fails
pub fn encode_snapshot(snapshot: &LedgerSnapshot) -> Result<Vec<u8>, StoreError> {
    Ok(serde_json::to_vec(&SnapshotPoints(snapshot))?)
}

/// Parses bytes written by [`encode_ledger`].
///
/// # Errors
///
/// * If `bytes` is not a JSON array of coordinates
pub fn decode_ledger(bytes: &[u8]) -> Result<Vec<Coordinate>, StoreError> {
    Ok(serde_json::from_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_as_array_of_records() {
        let bytes = encode_ledger(&[Coordinate::new(1.5, -2.25)]).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"[{"latitude":1.5,"longitude":-2.25}]"#
        );
    }

    #[test]
    fn snapshot_encoding_matches_flat_encoding() {
        use fog_map_ledger::{CHUNK_LEN, VisitLedgers};
        use fog_map_ledger_models::VisitMode;

        let points: Vec<Coordinate> = (0..CHUNK_LEN + 7)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let lat = i as f64 * 0.001;
                Coordinate::new(lat, -73.5)
            })
            .collect();
        let ledgers = VisitLedgers::default();
        ledgers.hydrate(VisitMode::Explore, &points);

        let bytes = encode_snapshot(&ledgers.snapshot(VisitMode::Explore)).unwrap();
        assert_eq!(bytes, encode_ledger(&points).unwrap());
        assert_eq!(decode_ledger(&bytes).unwrap(), points);
    }

    #[test]
    fn decodes_empty_array() {
        assert!(decode_ledger(b"[]").unwrap().is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(decode_ledger(b"not json"), Err(StoreError::Json(_))));
        assert!(decode_ledger(&[0xff, 0xfe]).is_err());
    }
}
