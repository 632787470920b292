use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 digest over `body`. Used both to check inbound provider
/// signatures and to sign outbound merchant notifications.
pub fn sign(body: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(body);

    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a provider signature against the raw request bytes. The body must
/// be the unparsed bytes as received on the wire; re-serializing the parsed
/// JSON would not round-trip key order or whitespace.
pub fn verify(body: &[u8], signature: &str, secret: &str) -> bool {
    let expected = sign(body, secret);
    let presented = signature.trim().to_ascii_lowercase();

    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "wh_secret_0123456789";

    #[test]
    fn accepts_matching_signature() {
        let body = br#"{"status":"paid","externalRef":"deposit_abc"}"#;
        let signature = sign(body, SECRET);

        assert!(verify(body, &signature, SECRET));
    }

    #[test]
    fn accepts_uppercase_hex_digest() {
        let body = br#"{"status":"approved"}"#;
        let signature = sign(body, SECRET).to_ascii_uppercase();

        assert!(verify(body, &signature, SECRET));
    }

    #[test]
    fn rejects_flipped_body_byte() {
        let body = br#"{"status":"paid","amount":500.00}"#.to_vec();
        let signature = sign(&body, SECRET);

        for i in 0..body.len() {
            let mut tampered = body.clone();
            tampered[i] ^= 0x01;
            assert!(
                !verify(&tampered, &signature, SECRET),
                "byte {} flip went undetected",
                i
            );
        }
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = br#"{"status":"paid"}"#;
        let signature = sign(body, "another-secret");

        assert!(!verify(body, &signature, SECRET));
    }

    #[test]
    fn rejects_truncated_and_empty_signatures() {
        let body = br#"{"status":"paid"}"#;
        let signature = sign(body, SECRET);

        assert!(!verify(body, &signature[..signature.len() - 2], SECRET));
        assert!(!verify(body, "", SECRET));
        assert!(!verify(body, "not-hex-at-all", SECRET));
    }
}
