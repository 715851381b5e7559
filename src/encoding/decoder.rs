/*
** This file is a part of Iksxml (streaming XML parser with DTD support)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Iksxml is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

use std::io::{self, Read};

use encoding_rs::{Decoder, DecoderResult};

use super::Encoding;

const READ_BUFFER_SIZE: usize = 8 * 1024;

const TEXT_BUFFER_SIZE: usize = 4 * 1024;

#[derive(Debug)]
pub(crate) enum DecodeError {
    Io(io::Error),
    Malformed,
    Truncated,
}

impl From<io::Error> for DecodeError {
    fn from(err: io::Error) -> Self {
        DecodeError::Io(err)
    }
}

enum Method {
    Generic {
        decoder: Decoder,
        text: Box<str>,
        text_pos: usize,
        text_len: usize,
        finished: bool,
        /// Error found after some text was already decoded.
        failed: Option<bool>,
    },
    Utf32 {
        big_endian: bool,
    },
}

/// Turns a byte stream into Unicode scalars.
///
/// Everything except UTF-32 goes through an `encoding_rs` decoder, which
/// also takes care of code points split between two reads. UTF-32 is not
/// part of the encoding standard `encoding_rs` implements, so it is
/// assembled here from four byte units.
pub(crate) struct ScalarDecoder {
    inner: Box<dyn Read>,
    method: Method,
    buf: Box<[u8]>,
    pos: usize,
    cap: usize,
    eof: bool,
}

impl ScalarDecoder {
    pub(crate) fn new(inner: Box<dyn Read>, encoding: Encoding) -> Self {
        let method = match encoding {
            Encoding::Utf32Be => Method::Utf32 { big_endian: true },
            Encoding::Utf32Le => Method::Utf32 { big_endian: false },
            _ => Method::Generic {
                decoder: encoding
                    .standard()
                    .unwrap_or(encoding_rs::UTF_8)
                    .new_decoder_without_bom_handling(),
                text: "\0".repeat(TEXT_BUFFER_SIZE).into_boxed_str(),
                text_pos: 0,
                text_len: 0,
                finished: false,
                failed: None,
            },
        };
        ScalarDecoder {
            inner,
            method,
            buf: vec![0; READ_BUFFER_SIZE].into_boxed_slice(),
            pos: 0,
            cap: 0,
            eof: false,
        }
    }

    fn fill_buf(&mut self) -> io::Result<()> {
        if self.pos < self.cap || self.eof {
            return Ok(());
        }
        loop {
            match self.inner.read(&mut self.buf) {
                Ok(0) => {
                    self.eof = true;
                    self.pos = 0;
                    self.cap = 0;
                    return Ok(());
                }
                Ok(n) => {
                    self.pos = 0;
                    self.cap = n;
                    return Ok(());
                }
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    pub(crate) fn next_char(&mut self) -> Result<Option<char>, DecodeError> {
        match self.method {
            Method::Utf32 { big_endian } => self.next_utf32(big_endian),
            Method::Generic { .. } => self.next_generic(),
        }
    }

    fn next_utf32(&mut self, big_endian: bool) -> Result<Option<char>, DecodeError> {
        let mut unit = [0u8; 4];
        let mut have = 0;
        while have < 4 {
            self.fill_buf()?;
            if self.eof {
                if have == 0 {
                    return Ok(None);
                }
                return Err(DecodeError::Truncated);
            }
            let n = (4 - have).min(self.cap - self.pos);
            unit[have..have + n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            have += n;
        }
        let value = if big_endian {
            u32::from_be_bytes(unit)
        } else {
            u32::from_le_bytes(unit)
        };
        match char::from_u32(value) {
            Some(c) => Ok(Some(c)),
            None => Err(DecodeError::Malformed),
        }
    }

    fn next_generic(&mut self) -> Result<Option<char>, DecodeError> {
        loop {
            if let Method::Generic {
                text,
                text_pos,
                text_len,
                ..
            } = &mut self.method
            {
                if let Some(c) = text[*text_pos..*text_len].chars().next() {
                    *text_pos += c.len_utf8();
                    return Ok(Some(c));
                }
            }
            if !self.decode_more()? {
                return Ok(None);
            }
        }
    }

    // Ok(false) means the input is fully decoded.
    fn decode_more(&mut self) -> Result<bool, DecodeError> {
        loop {
            self.fill_buf()?;
            let Method::Generic {
                decoder,
                text,
                text_pos,
                text_len,
                finished,
                failed,
            } = &mut self.method
            else {
                return Ok(false);
            };
            if let Some(truncated) = failed.take() {
                return Err(if truncated {
                    DecodeError::Truncated
                } else {
                    DecodeError::Malformed
                });
            }
            if *finished {
                return Ok(false);
            }
            let src: &[u8] = if self.eof {
                &[]
            } else {
                &self.buf[self.pos..self.cap]
            };
            let (result, bytes_read, bytes_written) =
                decoder.decode_to_str_without_replacement(src, text, self.eof);
            self.pos += bytes_read;
            *text_pos = 0;
            *text_len = bytes_written;
            match result {
                DecoderResult::Malformed(_, _) => {
                    if bytes_written > 0 {
                        *failed = Some(self.eof);
                        return Ok(true);
                    }
                    return Err(if self.eof {
                        DecodeError::Truncated
                    } else {
                        DecodeError::Malformed
                    });
                }
                DecoderResult::InputEmpty => {
                    if self.eof {
                        *finished = true;
                    }
                }
                DecoderResult::OutputFull => (),
            }
            if bytes_written > 0 {
                return Ok(true);
            }
            if *finished {
                return Ok(false);
            }
        }
    }
}
