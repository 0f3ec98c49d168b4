//! Token maker tests, run against both strategies

use std::sync::Arc;

use chrono::Duration;
use simple_bank::token::{new_maker, JwtMaker, Maker, PasetoMaker, TokenError, TokenKind};

mod common;

use common::TEST_SECRET;

fn makers() -> Vec<(&'static str, Arc<dyn Maker>)> {
    vec![
        ("jwt", new_maker(TokenKind::Jwt, TEST_SECRET).unwrap()),
        ("paseto", new_maker(TokenKind::Paseto, TEST_SECRET).unwrap()),
    ]
}

#[test]
fn test_round_trip() {
    for (name, maker) in makers() {
        let token = maker.create_token("alice", Duration::minutes(1)).unwrap();
        assert!(!token.is_empty());

        let payload = maker.verify_token(&token).unwrap();
        assert_eq!(payload.username, "alice", "{}", name);
        assert!(!payload.id.is_nil());

        let lifetime = payload.expired_at - payload.issued_at;
        assert!(
            (lifetime - Duration::minutes(1)).num_milliseconds().abs() <= 1_000,
            "{}: lifetime {:?}",
            name,
            lifetime
        );
        let age = chrono::Utc::now() - payload.issued_at;
        assert!(age.num_seconds() <= 1, "{}", name);
    }
}

#[test]
fn test_expired_token() {
    for (name, maker) in makers() {
        let token = maker.create_token("alice", -Duration::minutes(1)).unwrap();
        assert_eq!(
            maker.verify_token(&token),
            Err(TokenError::ExpiredToken),
            "{}",
            name
        );
    }
}

#[test]
fn test_tampering_any_byte_invalidates() {
    for (name, maker) in makers() {
        let token = maker.create_token("alice", Duration::minutes(1)).unwrap();

        for i in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] ^= 0x01;
            let tampered = String::from_utf8(bytes).unwrap();

            assert_eq!(
                maker.verify_token(&tampered),
                Err(TokenError::InvalidToken),
                "{}: flipping byte {} was not detected",
                name,
                i
            );
        }
    }
}

#[test]
fn test_unrepresentable_lifetime_is_an_error() {
    for (name, maker) in makers() {
        assert_eq!(
            maker.create_token("alice", Duration::max_value()),
            Err(TokenError::DurationOutOfRange),
            "{}",
            name
        );
    }
}

#[test]
fn test_garbage_is_invalid() {
    for (name, maker) in makers() {
        for garbage in ["", "abc", "a.b.c", "v2.local.", "v2.local.!!!"] {
            assert_eq!(
                maker.verify_token(garbage),
                Err(TokenError::InvalidToken),
                "{}: {:?}",
                name,
                garbage
            );
        }
    }
}

#[test]
fn test_key_gate() {
    assert_eq!(
        JwtMaker::new("short").err(),
        Some(TokenError::KeyTooShort { min: 32, actual: 5 })
    );
    assert_eq!(
        PasetoMaker::new("short").err(),
        Some(TokenError::KeyTooShort { min: 32, actual: 5 })
    );

    // Exactly 32 bytes is enough
    assert!(JwtMaker::new(TEST_SECRET).is_ok());
    assert!(PasetoMaker::new(TEST_SECRET).is_ok());
}

#[test]
fn test_tokens_do_not_cross_strategies() {
    let jwt = JwtMaker::new(TEST_SECRET).unwrap();
    let paseto = PasetoMaker::new(TEST_SECRET).unwrap();

    let jwt_token = jwt.create_token("alice", Duration::minutes(1)).unwrap();
    let paseto_token = paseto.create_token("alice", Duration::minutes(1)).unwrap();

    assert_eq!(paseto.verify_token(&jwt_token), Err(TokenError::InvalidToken));
    assert_eq!(jwt.verify_token(&paseto_token), Err(TokenError::InvalidToken));
}

#[test]
fn test_other_secret_rejected() {
    let issuer = PasetoMaker::new(TEST_SECRET).unwrap();
    let verifier = PasetoMaker::new("a different secret of 32+ bytes!!").unwrap();

    let token = issuer.create_token("alice", Duration::minutes(1)).unwrap();
    assert_eq!(verifier.verify_token(&token), Err(TokenError::InvalidToken));
}

#[test]
fn test_tokens_are_url_safe() {
    for (name, maker) in makers() {
        let token = maker.create_token("alice", Duration::minutes(1)).unwrap();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')),
            "{}: {}",
            name,
            token
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_makers_are_shareable_across_tasks() {
    for (_, maker) in makers() {
        let mut handles = Vec::new();
        for i in 0..16 {
            let maker = maker.clone();
            handles.push(tokio::spawn(async move {
                let username = format!("user{}", i);
                let token = maker.create_token(&username, Duration::minutes(1)).unwrap();
                assert_eq!(maker.verify_token(&token).unwrap().username, username);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }
}
