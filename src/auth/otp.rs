use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::AppError;

/// Generates a numeric one-time code of exactly `digits` characters, left-padded
/// with zeros, drawn uniformly from the operating system's entropy source.
pub fn generate_code(digits: u32) -> Result<String, AppError> {
    if !(1..=18).contains(&digits) {
        return Err(AppError::validation(
            "digits",
            format!("cannot generate a {}-digit code", digits),
        ));
    }

    let bound = 10u64.pow(digits);
    // Largest multiple of `bound`; draws at or above it are rejected to avoid modulo bias.
    let zone = u64::MAX - (u64::MAX % bound);

    let value = loop {
        let mut bytes = [0u8; 8];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AppError::RandomSource(e.to_string()))?;
        let candidate = u64::from_le_bytes(bytes);
        if candidate < zone {
            break candidate % bound;
        }
    };

    Ok(format!("{:0width$}", value, width = digits as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_has_requested_length() {
        for digits in [4, 6] {
            for _ in 0..200 {
                let code = generate_code(digits).unwrap();
                assert_eq!(code.len(), digits as usize);
                assert!(code.chars().all(|c| c.is_ascii_digit()), "bad code {}", code);
            }
        }
    }

    #[test]
    fn test_codes_vary() {
        let codes: std::collections::HashSet<String> =
            (0..50).map(|_| generate_code(6).unwrap()).collect();
        assert!(codes.len() > 1);
    }

    #[test]
    fn test_rejects_unsupported_lengths() {
        assert!(generate_code(0).is_err());
        assert!(generate_code(19).is_err());
    }
}
