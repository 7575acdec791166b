//! SGP41 VOC/NOx sensor command parameters and response frames.

use crate::sensirion::{push_word, read_words, ParseError};

/// Default relative humidity compensation ticks (50 % RH).
pub const DEFAULT_HUMIDITY_TICKS: u16 = 0x8000;

/// Default temperature compensation ticks (25 °C).
pub const DEFAULT_TEMPERATURE_TICKS: u16 = 0x6666;

/// Self-test response word when all checks pass.
pub const SELF_TEST_OK: u16 = 0xD400;

/// Build the humidity/temperature compensation parameter block appended to
/// the conditioning and raw-signal commands.
///
/// # Arguments
/// * `humidity_ticks` - Relative humidity compensation ticks.
/// * `temperature_ticks` - Temperature compensation ticks.
///
/// # Returns
/// * `[u8; 6]` - Two CRC-protected words, humidity first.
pub fn compensation_params(humidity_ticks: u16, temperature_ticks: u16) -> [u8; 6] {
    let mut buffer = Vec::with_capacity(6);
    push_word(&mut buffer, humidity_ticks);
    push_word(&mut buffer, temperature_ticks);

    let mut params = [0u8; 6];
    params.copy_from_slice(&buffer);
    params
}

/// Parse the raw-signal response: SRAW_VOC then SRAW_NOX.
///
/// # Arguments
/// * `buffer` - The 6-byte response buffer.
///
/// # Returns
/// * `Result<(u16, u16), ParseError>` - Raw VOC and NOx signals or an error.
pub fn parse_raw_signals(buffer: &[u8]) -> Result<(u16, u16), ParseError> {
    let [voc, nox] = read_words::<2>(buffer)?;
    Ok((voc, nox))
}

/// Parse a single-word response (conditioning SRAW_VOC or self-test result).
///
/// # Arguments
/// * `buffer` - The 3-byte response buffer.
///
/// # Returns
/// * `Result<u16, ParseError>` - The decoded word or an error.
pub fn parse_word(buffer: &[u8]) -> Result<u16, ParseError> {
    let [word] = read_words::<1>(buffer)?;
    Ok(word)
}

/// Tests.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensirion::crc8_sensirion;

    #[test]
    fn compensation_params_default_ticks() {
        let params = compensation_params(DEFAULT_HUMIDITY_TICKS, DEFAULT_TEMPERATURE_TICKS);

        assert_eq!(params[0..2], [0x80, 0x00]);
        assert_eq!(params[2], crc8_sensirion(&[0x80, 0x00]));
        assert_eq!(params[3..5], [0x66, 0x66]);
        assert_eq!(params[5], crc8_sensirion(&[0x66, 0x66]));
    }

    #[test]
    fn parse_raw_signals_ok() {
        let params = compensation_params(30000, 15000);
        assert_eq!(parse_raw_signals(&params), Ok((30000, 15000)));
    }

    #[test]
    fn parse_raw_signals_rejects_bad_crc() {
        let mut params = compensation_params(30000, 15000);
        params[2] ^= 0x01;

        assert_eq!(
            parse_raw_signals(&params),
            Err(ParseError::CrcMismatch { chunk_index: 0 })
        );
    }

    #[test]
    fn parse_word_self_test() {
        let bytes = SELF_TEST_OK.to_be_bytes();
        let buffer = [bytes[0], bytes[1], crc8_sensirion(&bytes)];

        assert_eq!(parse_word(&buffer), Ok(SELF_TEST_OK));
    }
}
