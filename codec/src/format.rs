//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//


//! Field delimiting and escaping
//!
//! A payload is the list of fields joined by the delimiter byte. Literal
//! occurrences of the two reserved bytes are escaped so that every field
//! survives a round trip:
//!
//! ```text
//! literal delimiter  ->  delimiter escape      "#"  -> "#`"
//! literal escape     ->  escape escape         "`"  -> "``"
//! ```
//!
//! When decoding, a delimiter followed by an odd run of escape bytes is a
//! literal delimiter, an even run is a field boundary. Any other run of escape
//! bytes must have even length.

use crate::{CodecError, CodecResult, FrameFormatErrorKind};

/// Default field delimiter
pub const DEFAULT_DELIMITER: u8 = b'#';
/// Default escape marker
pub const DEFAULT_ESCAPE: u8 = b'`';

/// Delimiter and escape bytes used to join fields into a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldFormat {
    delimiter: u8,
    escape: u8,
}

impl Default for FieldFormat {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            escape: DEFAULT_ESCAPE,
        }
    }
}

impl FieldFormat {
    /// Create a format with custom reserved bytes.
    ///
    /// Both bytes must be distinct, non-NUL ASCII so that escaping never
    /// splits a multi-byte UTF-8 sequence.
    pub fn new(delimiter: u8, escape: u8) -> CodecResult<Self> {
        if !delimiter.is_ascii() || !escape.is_ascii() {
            return Err(CodecError::InvalidFormat(
                "delimiter and escape must be ASCII".to_string(),
            ));
        }
        if delimiter == 0 || escape == 0 {
            return Err(CodecError::InvalidFormat(
                "delimiter and escape must not be NUL".to_string(),
            ));
        }
        if delimiter == escape {
            return Err(CodecError::InvalidFormat(format!(
                "delimiter and escape are both {:?}",
                delimiter as char
            )));
        }
        Ok(Self { delimiter, escape })
    }

    /// Field delimiter byte
    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Escape marker byte
    pub fn escape(&self) -> u8 {
        self.escape
    }

    /// Join and escape fields into a payload.
    ///
    /// The payload length is not checked here; see [`crate::encode`].
    pub fn encode_payload<S: AsRef<str>>(&self, fields: &[S]) -> CodecResult<Vec<u8>> {
        if fields.is_empty() {
            return Err(CodecError::EmptyFrame);
        }

        let estimate = fields.iter().map(|f| f.as_ref().len() + 1).sum();
        let mut payload = Vec::with_capacity(estimate);

        for (index, field) in fields.iter().enumerate() {
            if index > 0 {
                payload.push(self.delimiter);
            }
            for &byte in field.as_ref().as_bytes() {
                if byte == self.delimiter {
                    payload.push(self.delimiter);
                    payload.push(self.escape);
                } else if byte == self.escape {
                    payload.push(self.escape);
                    payload.push(self.escape);
                } else {
                    payload.push(byte);
                }
            }
        }

        Ok(payload)
    }

    /// Split and unescape a payload into fields.
    pub fn decode_payload(&self, payload: &[u8]) -> CodecResult<Vec<String>> {
        if let Err(e) = std::str::from_utf8(payload) {
            return Err(FrameFormatErrorKind::InvalidUtf8 {
                valid_up_to: e.valid_up_to(),
            }
            .into());
        }

        let mut fields = Vec::new();
        let mut current = Vec::with_capacity(payload.len());
        let mut index = 0;

        while index < payload.len() {
            let byte = payload[index];
            if byte == self.delimiter {
                let run = self.escape_run(payload, index + 1);
                if run % 2 == 1 {
                    current.push(self.delimiter);
                } else {
                    fields.push(into_field(std::mem::take(&mut current))?);
                }
                current.extend(std::iter::repeat_n(self.escape, run / 2));
                index += 1 + run;
            } else if byte == self.escape {
                let run = self.escape_run(payload, index);
                if run % 2 == 1 {
                    return Err(FrameFormatErrorKind::DanglingEscape { offset: index }.into());
                }
                current.extend(std::iter::repeat_n(self.escape, run / 2));
                index += run;
            } else {
                current.push(byte);
                index += 1;
            }
        }
        fields.push(into_field(current)?);

        Ok(fields)
    }

    fn escape_run(&self, payload: &[u8], start: usize) -> usize {
        payload[start.min(payload.len())..]
            .iter()
            .take_while(|&&b| b == self.escape)
            .count()
    }
}

fn into_field(bytes: Vec<u8>) -> CodecResult<String> {
    String::from_utf8(bytes).map_err(|e| {
        FrameFormatErrorKind::InvalidUtf8 {
            valid_up_to: e.utf8_error().valid_up_to(),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(fields: &[&str]) -> Vec<String> {
        let format = FieldFormat::default();
        let payload = format.encode_payload(fields).unwrap();
        format.decode_payload(&payload).unwrap()
    }

    #[test]
    fn test_plain_fields() {
        let payload = FieldFormat::default()
            .encode_payload(&["ECHO", "hello", "world"])
            .unwrap();
        assert_eq!(payload, b"ECHO#hello#world");
    }

    #[test]
    fn test_delimiter_escaped_on_wire() {
        let payload = FieldFormat::default()
            .encode_payload(&["SAY", "a#b"])
            .unwrap();
        assert_eq!(payload, b"SAY#a#`b");
    }

    #[test]
    fn test_reserved_bytes_survive() {
        let cases: &[&[&str]] = &[
            &["a", "`b"],
            &["a#", "b"],
            &["#`"],
            &["``", "#", "##", "`#`"],
            &["", ""],
            &[""],
            &["x`", "`"],
        ];
        for fields in cases {
            assert_eq!(roundtrip(fields), fields.to_vec(), "fields {:?}", fields);
        }
    }

    #[test]
    fn test_unicode_fields() {
        assert_eq!(roundtrip(&["GRÜSS", "日本語#テキスト"]), vec!["GRÜSS", "日本語#テキスト"]);
    }

    #[test]
    fn test_empty_field_list_rejected() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            FieldFormat::default().encode_payload(&empty),
            Err(CodecError::EmptyFrame)
        ));
    }

    #[test]
    fn test_dangling_escape() {
        let err = FieldFormat::default().decode_payload(b"CMD#a`b").unwrap_err();
        assert!(matches!(
            err,
            CodecError::FrameFormat(FrameFormatErrorKind::DanglingEscape { offset: 5 })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let err = FieldFormat::default()
            .decode_payload(&[b'A', 0xFF, b'B'])
            .unwrap_err();
        assert!(matches!(
            err,
            CodecError::FrameFormat(FrameFormatErrorKind::InvalidUtf8 { valid_up_to: 1 })
        ));
    }

    #[test]
    fn test_custom_format() {
        let format = FieldFormat::new(b'|', b'\\').unwrap();
        let payload = format.encode_payload(&["A", "b|c"]).unwrap();
        assert_eq!(payload, b"A|b|\\c");
        assert_eq!(format.decode_payload(&payload).unwrap(), vec!["A", "b|c"]);
    }

    #[test]
    fn test_invalid_formats() {
        assert!(FieldFormat::new(b'#', b'#').is_err());
        assert!(FieldFormat::new(0, b'`').is_err());
        assert!(FieldFormat::new(0xC3, b'`').is_err());
    }
}
