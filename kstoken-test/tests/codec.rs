use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use jiff::Timestamp;
use kstoken::{FixedClock, KeyPair, KsError, Nonce, RequestBody, SignedToken, TokenCodec, Version};
use kstoken_test::{NonceRng, Reason};
use rand::rand_core::TryRngCore;

const BODY: &[u8] = br#"{"query":"..."}"#;

fn codec() -> (TokenCodec<Arc<FixedClock>>, Arc<FixedClock>) {
    let clock = Arc::new(FixedClock::new(
        Timestamp::from_second(1_700_000_000).unwrap(),
    ));
    let codec = TokenCodec::new(KeyPair::new("k1", "s3cr3t").unwrap())
        .with_clock(Arc::clone(&clock))
        .with_ttl(Duration::from_secs(3 * 3600));
    (codec, clock)
}

#[test]
fn known_token() {
    let (codec, _) = codec();
    let token = codec
        .issue_with_rng(
            BODY,
            codec.ttl(),
            NonceRng::new(Nonce::from_bytes([0x0a, 0x1b, 0x2c, 0x3d, 0x4e, 0x5f])),
        )
        .unwrap();

    assert_eq!(
        token.to_string(),
        "ks01:k1.eyJpYXQiOjE3MDAwMTA4MDAsIm5vbmNlIjoiMGExYjJjM2Q0ZTVmIn0=.AzupADcVPQR9XNnfftN+eZRX8WwmvQy0o+xc/tztrN4="
    );
    assert!(matches!(
        codec.verify(&token.to_string(), br#"{"query":"..."} "#),
        Err(KsError::SignatureMismatch)
    ));
}

#[test]
fn any_changed_body_byte_is_rejected() {
    let (codec, _) = codec();
    let token = codec.issue(BODY).unwrap().to_string();

    for i in 0..BODY.len() {
        let mut body = BODY.to_vec();
        body[i] ^= 0x01;
        assert!(
            matches!(codec.verify(&token, &body), Err(KsError::SignatureMismatch)),
            "byte {i}"
        );
    }

    let mut longer = BODY.to_vec();
    longer.push(b'\n');
    assert!(codec.verify(&token, &longer).is_err());
    assert!(codec.verify(&token, &BODY[..BODY.len() - 1]).is_err());
}

#[test]
fn any_changed_token_byte_is_rejected() {
    use Reason::*;

    let (codec, _) = codec();
    let token = codec.issue(BODY).unwrap().to_string();
    let payload_start = token.find('.').unwrap() + 1;
    let signature_start = token.rfind('.').unwrap() + 1;

    for i in 0..token.len() {
        let mut tampered = token.clone().into_bytes();
        tampered[i] = if tampered[i] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();

        let err = codec.verify(&tampered, BODY).unwrap_err();
        let reason = Reason::of(&err);
        let expected: &[Reason] = if i < payload_start {
            // header, or the separator after it
            &[VersionMismatch, KeyMismatch, Malformed]
        } else if i < signature_start {
            &[Malformed, Expired, SignatureMismatch]
        } else {
            &[Malformed, SignatureMismatch]
        };
        assert!(
            reason.is_some_and(|r| expected.contains(&r)),
            "byte {i}: {err:?}"
        );
    }
}

#[test]
fn json_key_order_is_significant() {
    let (codec, _) = codec();
    let a = br#"{"query":"q","variables":{"a":1,"b":2}}"#;
    let b = br#"{"query":"q","variables":{"b":2,"a":1}}"#;

    let token = codec.issue(a).unwrap().to_string();
    codec.verify(&token, a).unwrap();
    assert!(matches!(
        codec.verify(&token, b),
        Err(KsError::SignatureMismatch)
    ));
}

#[test]
fn graphql_body_can_be_rebuilt_by_the_verifier() {
    let (codec, _) = codec();
    let variables = serde_json::json!({ "first": 10, "after": "cursor" });

    let request = codec.request(RequestBody::graphql("query { items }", &variables).unwrap());
    let header = request.authorization().unwrap();

    let rebuilt = RequestBody::graphql("query { items }", &variables).unwrap();
    codec.verify(&header, rebuilt.as_bytes()).unwrap();
}

#[test]
fn expiry_boundary() {
    let (codec, clock) = codec();
    let token = codec
        .issue_with_ttl(BODY, Duration::from_secs(60))
        .unwrap()
        .to_string();
    let deadline = codec.verify(&token, BODY).unwrap().payload.expires_at;
    assert_eq!(deadline, 1_700_000_060);

    clock.set(Timestamp::from_second(deadline - 1).unwrap());
    codec.verify(&token, BODY).unwrap();

    clock.set(Timestamp::from_second(deadline).unwrap());
    assert!(matches!(codec.verify(&token, BODY), Err(KsError::Expired)));
}

#[test]
fn expiry_is_checked_before_the_signature() {
    let (codec, clock) = codec();
    let token = codec.issue(BODY).unwrap().to_string();
    clock.advance(Duration::from_secs(4 * 3600));
    assert!(matches!(
        codec.verify(&token, b"some other body"),
        Err(KsError::Expired)
    ));
}

#[test]
fn keys_are_isolated() {
    let (k1, clock) = codec();
    let k2 = TokenCodec::new(KeyPair::new("k2", "s3cr3t").unwrap()).with_clock(Arc::clone(&clock));
    let other_secret =
        TokenCodec::new(KeyPair::new("k1", "other").unwrap()).with_clock(Arc::clone(&clock));

    let token = k1.issue(BODY).unwrap().to_string();
    assert!(matches!(k2.verify(&token, BODY), Err(KsError::KeyMismatch)));
    assert!(matches!(
        other_secret.verify(&token, BODY),
        Err(KsError::SignatureMismatch)
    ));
}

#[test]
fn versions_are_isolated() {
    let (ks01, clock) = codec();
    let ks02 = TokenCodec::new(
        KeyPair::new("k1", "s3cr3t")
            .unwrap()
            .with_version("ks02".parse::<Version>().unwrap()),
    )
    .with_clock(clock);

    let token = ks01.issue(BODY).unwrap().to_string();
    assert!(matches!(
        ks02.verify(&token, BODY),
        Err(KsError::VersionMismatch)
    ));
}

#[test]
fn nonces_are_fresh() {
    let (codec, _) = codec();
    let mut nonces = HashSet::new();
    let mut tokens = HashSet::new();
    for _ in 0..64 {
        let token = codec.issue(BODY).unwrap();
        let verified = codec.verify(&token.to_string(), BODY).unwrap();
        nonces.insert(*verified.payload.nonce.as_bytes());
        tokens.insert(token.to_string());
    }
    assert_eq!(nonces.len(), 64);
    assert_eq!(tokens.len(), 64);
}

#[test]
fn bearer_header_is_accepted() {
    let (codec, _) = codec();
    let token = codec.issue(BODY).unwrap();
    codec.verify(&token.authorization(), BODY).unwrap();
    codec
        .verify(&format!("  Bearer {token}  "), BODY)
        .unwrap();

    let parsed: SignedToken = token.authorization().parse().unwrap();
    assert_eq!(parsed, token);
}

#[test]
fn failing_random_source() {
    let (codec, _) = codec();
    let mut rng = NonceRng::new(Nonce::from_bytes([7; 6]));
    rng.try_fill_bytes(&mut [0; 6]).unwrap();

    assert!(matches!(
        codec.issue_with_rng(BODY, codec.ttl(), rng),
        Err(KsError::CryptoError)
    ));
}

#[test]
fn free_functions_use_the_system_clock() {
    let key = KeyPair::new("k1", "s3cr3t").unwrap();

    let token = kstoken::issue(&key, BODY, Duration::from_secs(60)).unwrap();
    let verified = kstoken::verify(&key, &token.to_string(), BODY).unwrap();
    assert!(verified.payload.expires_at > Timestamp::now().as_second());

    let expired = kstoken::issue(&key, BODY, Duration::ZERO).unwrap();
    assert!(matches!(
        kstoken::verify(&key, &expired.to_string(), BODY),
        Err(KsError::Expired)
    ));
}

#[test]
fn verification_is_thread_safe() {
    let (codec, _) = codec();
    let token = codec.issue(BODY).unwrap().to_string();

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..32 {
                    codec.verify(&token, BODY).unwrap();
                    codec.issue(BODY).unwrap();
                }
            });
        }
    });
}
