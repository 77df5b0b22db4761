// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Text encodings for serialized log lines.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use encoding_rs::Encoding;

use crate::Error;

/// The character encoding log lines are written in.
///
/// Labels are resolved per the WHATWG Encoding Standard, so `utf-8`, `utf8`, `latin1`,
/// `iso-8859-1`, `windows-1252`, `shift_jis` and friends are all understood. Note that `ascii`
/// is an alias of `windows-1252` there.
///
/// Encodings that cannot be produced as output (the UTF-16 family and `replacement`) are
/// rejected when parsed.
///
/// # Examples
///
/// ```
/// use std::str::FromStr;
///
/// use rotalog::TextEncoding;
///
/// let latin1 = TextEncoding::from_str("iso-8859-1").unwrap();
/// assert_eq!(latin1.encode("café").unwrap().as_ref(), b"caf\xe9");
/// ```
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl TextEncoding {
    /// UTF-8, the default encoding.
    pub const UTF_8: TextEncoding = TextEncoding(encoding_rs::UTF_8);

    /// The canonical name of this encoding.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Encodes `text`, failing if any character cannot be represented.
    ///
    /// For UTF-8 this never copies.
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>, Error> {
        let (bytes, _, unmappable) = self.0.encode(text);
        if unmappable {
            let c = text
                .chars()
                .find(|c| {
                    let mut buf = [0; 4];
                    self.0.encode(c.encode_utf8(&mut buf)).2
                })
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            return Err(
                Error::encoding(format!("character {c:?} cannot be encoded"))
                    .with_context("encoding", self.name()),
            );
        }
        Ok(bytes)
    }

    /// Decodes `bytes` back into text, failing on malformed input.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>, Error> {
        self.0
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(|| {
                Error::encoding("malformed byte sequence").with_context("encoding", self.name())
            })
    }
}

impl Default for TextEncoding {
    fn default() -> Self {
        TextEncoding::UTF_8
    }
}

impl fmt::Debug for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TextEncoding").field(&self.name()).finish()
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let encoding = Encoding::for_label(s.trim().as_bytes())
            .ok_or_else(|| Error::config(format!("unknown encoding: {s:?}")))?;
        // UTF-16 and `replacement` encode as UTF-8; refuse rather than write the wrong charset
        if encoding.output_encoding() != encoding {
            return Err(Error::config(format!(
                "encoding {} cannot be used for output",
                encoding.name()
            )));
        }
        Ok(TextEncoding(encoding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_parse_labels() {
        assert_eq!(TextEncoding::from_str("utf-8").unwrap(), TextEncoding::UTF_8);
        assert_eq!(TextEncoding::from_str(" UTF8 ").unwrap(), TextEncoding::UTF_8);
        assert_eq!(
            TextEncoding::from_str("latin1").unwrap().name(),
            "windows-1252"
        );
        assert_eq!(
            TextEncoding::from_str("iso-8859-3").unwrap().name(),
            "ISO-8859-3"
        );

        let err = TextEncoding::from_str("klingon").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        let err = TextEncoding::from_str("utf-16le").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_encode_is_strict() {
        let latin1 = TextEncoding::from_str("iso-8859-1").unwrap();
        let err = latin1.encode("price: 5€ ✓").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        assert!(err.message().contains('✓'), "{err}");
    }

    #[test]
    fn test_encode_and_decode_back() {
        let sjis = TextEncoding::from_str("shift_jis").unwrap();
        let bytes = sjis.encode("ログ").unwrap();
        assert_ne!(bytes.as_ref(), "ログ".as_bytes());
        assert_eq!(sjis.decode(&bytes).unwrap(), "ログ");

        assert!(TextEncoding::UTF_8.decode(b"\xff\xfe").is_err());
    }
}
