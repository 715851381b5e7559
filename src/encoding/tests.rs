/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use super::*;

fn utf16(s: &str, big_endian: bool) -> Vec<u8> {
    s.encode_utf16()
        .flat_map(|u| if big_endian { u.to_be_bytes() } else { u.to_le_bytes() })
        .collect()
}

fn utf32(s: &str, big_endian: bool) -> Vec<u8> {
    s.chars()
        .flat_map(|c| {
            if big_endian {
                (c as u32).to_be_bytes()
            } else {
                (c as u32).to_le_bytes()
            }
        })
        .collect()
}

fn open(bytes: Vec<u8>, label: Option<&str>) -> Result<(OpenedStream, String)> {
    let mut opened = open_stream(Box::new(Cursor::new(bytes)), label, false)?;
    let mut rest = String::new();
    loop {
        match opened.decoder.next_char() {
            Ok(Some(c)) => rest.push(c),
            Ok(None) => break,
            Err(_) => panic!("decoding failed"),
        }
    }
    Ok((opened, rest))
}

#[test]
fn detect_boms() {
    assert_eq!(
        detect(&[0x00, 0x00, 0xfe, 0xff]),
        Detected { encoding: Encoding::Utf32Be, bom_len: 4 }
    );
    assert_eq!(
        detect(&[0xff, 0xfe, 0x00, 0x00]),
        Detected { encoding: Encoding::Utf32Le, bom_len: 4 }
    );
    assert_eq!(
        detect(&[0xfe, 0xff, 0x00, b'<']),
        Detected { encoding: Encoding::Utf16Be, bom_len: 2 }
    );
    assert_eq!(
        detect(&[0xff, 0xfe, b'<', 0x00]),
        Detected { encoding: Encoding::Utf16Le, bom_len: 2 }
    );
    assert_eq!(
        detect(&[0xef, 0xbb, 0xbf, b'<']),
        Detected { encoding: Encoding::Utf8, bom_len: 3 }
    );
}

#[test]
fn detect_patterns() {
    assert_eq!(detect(&[0, 0, 0, b'<']).encoding, Encoding::Utf32Be);
    assert_eq!(detect(&[b'<', 0, 0, 0]).encoding, Encoding::Utf32Le);
    assert_eq!(detect(&[0, b'<', 0, b'?']).encoding, Encoding::Utf16Be);
    assert_eq!(detect(&[b'<', 0, b'?', 0]).encoding, Encoding::Utf16Le);
    assert_eq!(detect(b"<?xm").encoding, Encoding::Utf8);
    assert_eq!(detect(b"<a").encoding, Encoding::Utf8);
    assert_eq!(detect(b"").encoding, Encoding::Utf8);
}

#[test]
fn labels() {
    assert_eq!(parse_label("utf-8"), Some(Label::Exact(Encoding::Utf8)));
    assert_eq!(parse_label("UTF-16"), Some(Label::AnyUtf16));
    assert_eq!(parse_label("ucs-4"), Some(Label::AnyUtf32));
    assert_eq!(parse_label("UTF-16LE"), Some(Label::Exact(Encoding::Utf16Le)));
    assert_eq!(
        parse_label("ISO-8859-2"),
        Some(Label::Exact(Encoding::Other(encoding_rs::ISO_8859_2)))
    );
    assert_eq!(parse_label("no-such-thing"), None);
}

#[test]
fn reconciliation() {
    let utf8 = Detected { encoding: Encoding::Utf8, bom_len: 0 };
    let utf8_bom = Detected { encoding: Encoding::Utf8, bom_len: 3 };
    let utf16le = Detected { encoding: Encoding::Utf16Le, bom_len: 2 };
    let utf32be = Detected { encoding: Encoding::Utf32Be, bom_len: 0 };

    assert_eq!(reconcile(utf8, None), Ok(Encoding::Utf8));
    assert_eq!(reconcile(utf8, Some("UTF-8")), Ok(Encoding::Utf8));
    assert_eq!(
        reconcile(utf8, Some("windows-1252")),
        Ok(Encoding::Other(encoding_rs::WINDOWS_1252))
    );
    assert_eq!(reconcile(utf16le, Some("UTF-16")), Ok(Encoding::Utf16Le));
    assert_eq!(
        reconcile(utf16le, Some("UTF-16BE")),
        Err(description::ENCODING_WIDTH_MISMATCH)
    );
    assert_eq!(
        reconcile(utf32be, Some("UTF-8")),
        Err(description::ENCODING_WIDTH_MISMATCH)
    );
    assert_eq!(
        reconcile(utf8_bom, Some("ISO-8859-1")),
        Err(description::ENCODING_WIDTH_MISMATCH)
    );
    assert_eq!(reconcile(utf8, Some("klingon")), Err(description::ENCODING_UNKNOWN));
}

#[test]
fn declaration_is_consumed() {
    let (opened, rest) = open(b"<?xml version='1.0'?><a/>".to_vec(), None).unwrap();
    assert_eq!(rest, "<a/>");
    assert_eq!(opened.encoding, Encoding::Utf8);
    assert_eq!(opened.declaration_text, "<?xml version='1.0'?>");
    assert_eq!(opened.declaration.unwrap().version.as_deref(), Some("1.0"));

    let (opened, rest) = open(b"<?xml-stylesheet href='a'?><a/>".to_vec(), None).unwrap();
    assert!(opened.declaration.is_none());
    assert_eq!(rest, "<?xml-stylesheet href='a'?><a/>");
}

#[test]
fn declared_single_byte_encoding() {
    let mut bytes = b"<?xml version='1.0' encoding='ISO-8859-9'?><a>".to_vec();
    bytes.push(0xfd);
    bytes.extend_from_slice(b"</a>");
    let (opened, rest) = open(bytes, None).unwrap();
    assert_eq!(opened.encoding.name(), "windows-1254");
    assert_eq!(rest, "<a>ı</a>");
}

#[test]
fn wide_encodings() {
    let doc = "<?xml version='1.0' encoding='UTF-16'?><a>ş</a>";
    let mut bytes = vec![0xfe, 0xff];
    bytes.extend(utf16(doc, true));
    let (opened, rest) = open(bytes, None).unwrap();
    assert_eq!(opened.encoding, Encoding::Utf16Be);
    assert_eq!(rest, "<a>ş</a>");

    let (opened, rest) = open(utf16("<a/>", false), None).unwrap();
    assert_eq!(opened.encoding, Encoding::Utf16Le);
    assert_eq!(rest, "<a/>");

    let (opened, rest) = open(utf32("<a>𝄞</a>", false), None).unwrap();
    assert_eq!(opened.encoding, Encoding::Utf32Le);
    assert_eq!(rest, "<a>𝄞</a>");
}

#[test]
fn width_mismatch() {
    let bytes = utf32("<?xml version='1.0' encoding='UTF-8'?><a/>", true);
    let err = open(bytes, None).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::UnsupportedEncoding);
    assert_eq!(err.message(), description::ENCODING_WIDTH_MISMATCH);
}

#[test]
fn bad_declaration_position() {
    let err = open(b"<?xml version='1.0'\n  standalone='perhaps'?><a/>".to_vec(), None)
        .err()
        .unwrap();
    assert_eq!(err.kind(), ErrorKind::MalformedXmlDeclaration);
    assert_eq!(err.position(), Position::at(2, 15));

    let err = open(b"<?xml version='1.0'".to_vec(), None).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEndOfInput);
}

#[test]
fn override_label() {
    let mut bytes = b"<?xml version='1.0' encoding='UTF-8'?><a>".to_vec();
    bytes.push(0xe7);
    bytes.extend_from_slice(b"</a>");
    let (opened, rest) = open(bytes, Some("ISO-8859-1")).unwrap();
    assert_eq!(opened.encoding.name(), "windows-1252");
    assert_eq!(rest, "<a>ç</a>");

    let err = open(b"<a/>".to_vec(), Some("nonsense")).err().unwrap();
    assert_eq!(err.kind(), ErrorKind::UnsupportedEncoding);
}
