//! Encoded shard item lists
//!
//! Assignments are persisted as comma-separated index strings, e.g. "0,1,7".

/// Encode shard indices into the persisted list format
pub fn encode(items: &[u32]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode a persisted item list; malformed entries are dropped
pub fn decode(encoded: &str) -> Vec<u32> {
    encoded
        .split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        assert_eq!(encode(&[0, 1, 7]), "0,1,7");
        assert_eq!(decode("0,1,7"), vec![0, 1, 7]);
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn test_decode_tolerates_garbage() {
        assert_eq!(decode(""), Vec::<u32>::new());
        assert_eq!(decode("3, 4 ,x,5"), vec![3, 4, 5]);
    }
}
