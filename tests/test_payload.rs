// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors

use bankipc::Payload;

#[test]
fn default_is_empty() {
    let p = Payload::new();
    assert!(p.is_empty());
    assert_eq!(p.len(), 0);
    assert_eq!(p, Payload::default());
}

#[test]
fn terminated_appends_nul() {
    let p = Payload::terminated("Hello");
    assert_eq!(p.len(), 6);
    assert_eq!(p.as_bytes()[..5], *b"Hello");
    assert_eq!(p.as_bytes()[5], 0);
    assert_eq!(p.text(), Some("Hello"));
}

#[test]
fn from_str_is_terminated() {
    assert_eq!(Payload::from("abc"), Payload::terminated("abc"));
}

#[test]
fn text_without_terminator() {
    let p = Payload::from_slice(b"no nul");
    assert_eq!(p.text(), Some("no nul"));
}

#[test]
fn text_rejects_invalid_utf8() {
    let p = Payload::from(vec![0xFF, 0xFE, 0x00]);
    assert_eq!(p.text(), None);
}

#[test]
fn filled() {
    let p = Payload::filled(b'X', 1000);
    assert_eq!(p.len(), 1000);
    assert!(p.as_bytes().iter().all(|&b| b == b'X'));
}

#[test]
fn into_vec_round_trip() {
    let v = vec![1u8, 2, 3];
    let p = Payload::from(v.clone());
    assert_eq!(p.as_ref(), v.as_slice());
    assert_eq!(p.into_vec(), v);
}

#[test]
fn debug_shows_length_only() {
    let p = Payload::filled(0, 42);
    assert_eq!(format!("{p:?}"), "Payload { len: 42 }");
}
