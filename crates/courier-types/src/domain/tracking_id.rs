use chrono::Utc;
use uuid::Uuid;

pub const TRACKING_PREFIX: &str = "PRCL";

/// Generates `PRCL-<YYYYMMDD>-<6 upper-case hex chars>`.
pub fn generate_tracking_id() -> String {
    let date = Utc::now().format("%Y%m%d");
    let random = Uuid::new_v4();
    let bytes = &random.as_bytes()[..3];
    format!(
        "{TRACKING_PREFIX}-{date}-{:02X}{:02X}{:02X}",
        bytes[0], bytes[1], bytes[2]
    )
}

pub fn is_valid_tracking_id(id: &str) -> bool {
    let mut parts = id.split('-');
    let (Some(prefix), Some(date), Some(random), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    prefix == TRACKING_PREFIX
        && date.len() == 8
        && date.bytes().all(|b| b.is_ascii_digit())
        && random.len() == 6
        && random
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}
