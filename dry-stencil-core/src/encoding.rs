// MIT License
//
// Copyright (c) 2024 Jerome Johnson
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Text encodings recognised by the processor
//!
//! The encoding of a stream is inferred once, from a byte-order mark at the very
//! start of the first buffer. Streams without a mark are treated as UTF-8. Every
//! configured token is re-materialized in the detected encoding so matching can
//! happen on raw bytes.

use std::fmt::Display;

/// Encoding of a processed stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Encoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
}

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF32_LE_BOM: &[u8] = &[0xFF, 0xFE, 0x00, 0x00];
const UTF32_BE_BOM: &[u8] = &[0x00, 0x00, 0xFE, 0xFF];

impl Encoding {
    /// Sniffs a byte-order mark, returning the encoding and the length of the mark
    pub fn detect(buffer: &[u8]) -> (Self, usize) {
        // UTF-32 LE must be tested before UTF-16 LE, its mark starts the same way
        let candidates = [
            (UTF32_LE_BOM, Self::Utf32Le),
            (UTF32_BE_BOM, Self::Utf32Be),
            (UTF8_BOM, Self::Utf8),
            (UTF16_LE_BOM, Self::Utf16Le),
            (UTF16_BE_BOM, Self::Utf16Be),
        ];
        candidates
            .into_iter()
            .find(|(bom, _)| buffer.starts_with(bom))
            .map(|(bom, encoding)| (encoding, bom.len()))
            .unwrap_or((Self::Utf8, 0))
    }

    /// Encodes text without a byte-order mark
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            Self::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            Self::Utf32Le => text.chars().flat_map(|c| (c as u32).to_le_bytes()).collect(),
            Self::Utf32Be => text.chars().flat_map(|c| (c as u32).to_be_bytes()).collect(),
        }
    }

    /// Decodes bytes, replacing invalid sequences with U+FFFD
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Utf16Le | Self::Utf16Be => {
                let units: Vec<u16> = bytes
                    .chunks(2)
                    .map(|pair| match (self, pair) {
                        (Self::Utf16Le, [lo, hi]) => u16::from_le_bytes([*lo, *hi]),
                        (_, [hi, lo]) => u16::from_be_bytes([*hi, *lo]),
                        _ => 0xFFFD,
                    })
                    .collect();
                String::from_utf16_lossy(&units)
            }
            Self::Utf32Le | Self::Utf32Be => bytes
                .chunks(4)
                .map(|quad| {
                    let code = match (self, <[u8; 4]>::try_from(quad)) {
                        (Self::Utf32Le, Ok(quad)) => u32::from_le_bytes(quad),
                        (_, Ok(quad)) => u32::from_be_bytes(quad),
                        (_, Err(_)) => 0xFFFD,
                    };
                    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
                })
                .collect(),
        }
    }

    /// Size in bytes of one code unit
    pub fn unit_width(self) -> usize {
        match self {
            Self::Utf8 => 1,
            Self::Utf16Le | Self::Utf16Be => 2,
            Self::Utf32Le | Self::Utf32Be => 4,
        }
    }

    /// Reads the code unit at the start of `bytes`
    pub fn code_unit(self, bytes: &[u8]) -> Option<u32> {
        match (self, bytes) {
            (Self::Utf8, [b, ..]) => Some(u32::from(*b)),
            (Self::Utf16Le, [lo, hi, ..]) => Some(u32::from(u16::from_le_bytes([*lo, *hi]))),
            (Self::Utf16Be, [hi, lo, ..]) => Some(u32::from(u16::from_be_bytes([*hi, *lo]))),
            (Self::Utf32Le, [a, b, c, d, ..]) => Some(u32::from_le_bytes([*a, *b, *c, *d])),
            (Self::Utf32Be, [a, b, c, d, ..]) => Some(u32::from_be_bytes([*a, *b, *c, *d])),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
            Self::Utf32Le => "utf-32le",
            Self::Utf32Be => "utf-32be",
        }
    }
}

impl Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
