//! Command-name hashing.
//!
//! Lookup in the command table compares hashes only, so the hash must be
//! deterministic over the bare command name and must never yield zero:
//! zero is reserved as the empty-slot sentinel.

/// Compute the dispatch hash of a command name.
///
/// This is a djb2-style fold over the name's bytes. It is computed over the
/// bare name only, never over a full input line, so `CWMODE` hashes the same
/// whether it arrived as `AT+CWMODE?` or `AT+CWMODE=1`.
pub fn command_hash(name: &str) -> u32 {
    let mut hash: u32 = 5381;
    for &byte in name.as_bytes() {
        hash = hash.wrapping_mul(33) ^ u32::from(byte);
    }
    // Zero stays reserved for an unoccupied entry.
    if hash == 0 {
        1
    } else {
        hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(command_hash("CWMODE"), command_hash("CWMODE"));
    }

    #[test]
    fn test_hash_never_zero() {
        for name in ["", "RST", "GMR", "CMD", "CWJAP", "CIPSEND", "CIPRECVDATA"] {
            assert_ne!(command_hash(name), 0, "hash of {:?} must not be zero", name);
        }
    }

    #[test]
    fn test_hash_ignores_nothing() {
        // The name with trailing characters is a different hash; callers must
        // strip arguments before hashing.
        assert_ne!(command_hash("CWMODE"), command_hash("CWMODE?"));
        assert_ne!(command_hash("CWMODE"), command_hash("CWMODE=1"));
    }

    #[test]
    fn test_known_vocabulary_collision_free() {
        let names = [
            "RST", "GMR", "CMD", "CWMODE", "CWSTATE", "CWJAP", "CWRECONNCFG",
            "CWLAP", "CWQAP", "CWSAP", "CWLIF", "CWQIF", "CWDHCP", "CWHOSTNAME",
            "CIPSERVER", "CIPSTATE", "CIPRECVLEN", "CIPRECVDATA", "CIPSEND",
        ];
        for (i, a) in names.iter().enumerate() {
            for b in &names[i + 1..] {
                assert_ne!(command_hash(a), command_hash(b), "{} collides with {}", a, b);
            }
        }
    }
}
