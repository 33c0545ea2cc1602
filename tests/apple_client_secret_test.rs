// Integration test for the Apple client assertion: structure, claims, and
// a real ES256 signature check against the signing key
use base64::{engine::general_purpose, Engine as _};
use doorman::providers::AppleProvider;
use doorman::testing::constants::{TEST_APPLE_KEY_ID, TEST_APPLE_TEAM_ID, TEST_EC_PRIVATE_KEY};
use doorman::testing::TestFixtures;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::DecodePrivateKey;
use serde_json::Value;

fn decode_segment(segment: &str) -> Value {
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(segment)
        .expect("segment should be base64url");
    serde_json::from_slice(&bytes).expect("segment should be JSON")
}

#[test]
fn test_client_secret_structure_and_claims() {
    let provider = AppleProvider::new(TestFixtures::apple_settings_offline()).unwrap();
    let secret = provider.client_secret("com.example.doorman.web").unwrap();

    let parts: Vec<&str> = secret.split('.').collect();
    assert_eq!(parts.len(), 3);

    let header = decode_segment(parts[0]);
    assert_eq!(header["alg"], "ES256");
    assert_eq!(header["kid"], TEST_APPLE_KEY_ID);
    assert_eq!(header["typ"], "JWT");

    let claims = decode_segment(parts[1]);
    assert_eq!(claims["iss"], TEST_APPLE_TEAM_ID);
    assert_eq!(claims["sub"], "com.example.doorman.web");
    assert_eq!(claims["aud"], "https://appleid.apple.com");

    // Apple caps client secrets at six months
    let iat = claims["iat"].as_i64().unwrap();
    let exp = claims["exp"].as_i64().unwrap();
    assert_eq!(exp - iat, 180 * 24 * 60 * 60);

    let now = chrono::Utc::now().timestamp();
    assert!((now - iat).abs() < 60, "iat should be the current time");
}

#[test]
fn test_client_secret_signature_verifies() {
    let provider = AppleProvider::new(TestFixtures::apple_settings_offline()).unwrap();
    let secret = provider.client_secret("com.example.doorman").unwrap();

    let (message, signature_b64) = secret.rsplit_once('.').unwrap();
    let signature_bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .unwrap();
    let signature = Signature::from_slice(&signature_bytes).unwrap();

    let signing_key = SigningKey::from_pkcs8_pem(TEST_EC_PRIVATE_KEY).unwrap();
    let verifying_key = VerifyingKey::from(&signing_key);
    verifying_key
        .verify(message.as_bytes(), &signature)
        .expect("signature should verify against the configured key");
}

#[test]
fn test_client_secret_subject_tracks_client_id() {
    let provider = AppleProvider::new(TestFixtures::apple_settings_offline()).unwrap();

    let web = provider.client_secret("com.example.doorman.web").unwrap();
    let native = provider.client_secret("com.example.doorman").unwrap();

    let web_claims = decode_segment(web.split('.').nth(1).unwrap());
    let native_claims = decode_segment(native.split('.').nth(1).unwrap());
    assert_eq!(web_claims["sub"], "com.example.doorman.web");
    assert_eq!(native_claims["sub"], "com.example.doorman");
}
