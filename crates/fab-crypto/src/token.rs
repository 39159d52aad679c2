use fab_types::SessionToken;
use rand::rngs::OsRng;
use rand::RngCore;

/// Number of random bytes behind every session token.
pub const TOKEN_BYTES: usize = 32;

/// Generate a fresh session token from the OS RNG.
///
/// 256 bits of entropy, hex-encoded to 64 characters. Collisions are not
/// checked for; at this size they do not happen in practice.
pub fn generate_token() -> SessionToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    SessionToken::new(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tokens_are_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.as_str().len(), TOKEN_BYTES * 2);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_do_not_repeat() {
        let tokens: HashSet<_> = (0..1000).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
