use base64::Engine;
use base64::alphabet::Alphabet;
use base64::engine::GeneralPurpose;
use base64::engine::general_purpose::NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::NotifyKind;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of the HMAC tag kept in a token.
pub const TOKEN_BYTES: usize = 10;

// Standard base64 with '+' -> '_' and '/' -> '-'.
const TOKEN_ALPHABET: Alphabet =
    match Alphabet::new("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-") {
        Ok(alphabet) => alphabet,
        Err(_) => panic!("invalid unsubscribe token alphabet"),
    };

const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(&TOKEN_ALPHABET, NO_PAD);

fn token_mac(secret: &[u8], member_id: i64, email: &str, kind: NotifyKind, item_id: i64) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length");
    let message = format!("{} {} {} {}", member_id, email, kind.token_type(), item_id);
    mac.update(message.as_bytes());
    mac
}

/// Deterministic token authorizing preference changes for one member and target.
pub fn create_unsubscribe_token(
    secret: &[u8],
    member_id: i64,
    email: &str,
    kind: NotifyKind,
    item_id: i64,
) -> String {
    let tag = token_mac(secret, member_id, email, kind, item_id)
        .finalize()
        .into_bytes();
    TOKEN_ENGINE.encode(&tag[..TOKEN_BYTES])
}

/// Constant-time check of a presented token. Malformed tokens are simply invalid.
pub fn verify_unsubscribe_token(
    secret: &[u8],
    member_id: i64,
    email: &str,
    kind: NotifyKind,
    item_id: i64,
    token: &str,
) -> bool {
    let Ok(presented) = TOKEN_ENGINE.decode(token) else {
        return false;
    };
    if presented.len() != TOKEN_BYTES {
        return false;
    }
    token_mac(secret, member_id, email, kind, item_id)
        .verify_truncated_left(&presented)
        .is_ok()
}

/// One-click link that turns off emails for the target (mode -2).
pub fn unsubscribe_url(
    board_url: &str,
    secret: &[u8],
    member_id: i64,
    email: &str,
    kind: NotifyKind,
    item_id: i64,
) -> String {
    let token = create_unsubscribe_token(secret, member_id, email, kind, item_id);
    let mut url = format!(
        "{}?action={};u={};token={};mode=-2",
        board_url,
        kind.action(),
        member_id,
        token
    );
    if let Some(param) = kind.item_param() {
        url.push_str(&format!(";{}={}", param, item_id));
    }
    url
}
