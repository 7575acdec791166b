//! Minimal UBX protocol framing for the MAX-M10S GNSS module.
//!
//! Only what the shield needs: building a checksummed frame and the
//! UBX-RXM-PMREQ request that sends the module to backup state.

/// First sync byte.
pub const SYNC1: u8 = 0xB5;

/// Second sync byte.
pub const SYNC2: u8 = 0x62;

/// RXM message class.
pub const CLASS_RXM: u8 = 0x02;

/// RXM-PMREQ message id.
pub const ID_RXM_PMREQ: u8 = 0x41;

/// PMREQ flag: enter backup state.
const PMREQ_FLAG_BACKUP: u32 = 0x0000_0002;

/// Compute the 8-bit Fletcher checksum over class, id, length and payload.
///
/// # Arguments
/// * `bytes` - The frame bytes between the sync pair and the checksum.
///
/// # Returns
/// * `(u8, u8)` - The CK_A and CK_B checksum bytes.
pub fn checksum(bytes: &[u8]) -> (u8, u8) {
    let mut ck_a: u8 = 0;
    let mut ck_b: u8 = 0;

    for &byte in bytes {
        ck_a = ck_a.wrapping_add(byte);
        ck_b = ck_b.wrapping_add(ck_a);
    }

    (ck_a, ck_b)
}

/// Build a complete UBX frame.
///
/// # Arguments
/// * `class` - The message class.
/// * `id` - The message id.
/// * `payload` - The message payload.
///
/// # Returns
/// * `Vec<u8>` - The framed message including sync bytes and checksum.
pub fn frame(class: u8, id: u8, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + payload.len());
    body.push(class);
    body.push(id);
    body.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    body.extend_from_slice(payload);

    let (ck_a, ck_b) = checksum(&body);

    let mut message = Vec::with_capacity(body.len() + 4);
    message.push(SYNC1);
    message.push(SYNC2);
    message.extend_from_slice(&body);
    message.push(ck_a);
    message.push(ck_b);
    message
}

/// Build the UBX-RXM-PMREQ frame that puts the receiver into backup state
/// indefinitely (duration 0, no wakeup sources).
pub fn pmreq_backup() -> Vec<u8> {
    let mut payload = [0u8; 16];

    // Version 0, three reserved bytes, duration, flags, wakeup sources.
    payload[8..12].copy_from_slice(&PMREQ_FLAG_BACKUP.to_le_bytes());

    frame(CLASS_RXM, ID_RXM_PMREQ, &payload)
}

/// Tests.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_known_vector() {
        // CK_A: 02+41+02+00+AA+BB = AA, CK_B: 43+45+45+EF+AA = 66 (mod 256).
        assert_eq!(
            checksum(&[0x02, 0x41, 0x02, 0x00, 0xAA, 0xBB]),
            (0xAA, 0x66)
        );
    }

    #[test]
    fn frame_layout() {
        let message = frame(0x02, 0x41, &[0xAA, 0xBB]);

        assert_eq!(&message[..2], &[SYNC1, SYNC2]);
        assert_eq!(&message[2..4], &[0x02, 0x41]);
        assert_eq!(&message[4..6], &[0x02, 0x00]);
        assert_eq!(&message[6..8], &[0xAA, 0xBB]);
        assert_eq!(&message[8..], &[0xAA, 0x66]);
    }

    #[test]
    fn pmreq_backup_sets_the_backup_flag() {
        let message = pmreq_backup();

        // Sync(2) + class/id(2) + len(2) + payload(16) + checksum(2).
        assert_eq!(message.len(), 24);
        assert_eq!(message[2], CLASS_RXM);
        assert_eq!(message[3], ID_RXM_PMREQ);

        // Payload bytes 8..12 hold the flags word.
        assert_eq!(&message[14..18], &[0x02, 0x00, 0x00, 0x00]);

        let (ck_a, ck_b) = checksum(&message[2..22]);
        assert_eq!(&message[22..], &[ck_a, ck_b]);
    }
}
