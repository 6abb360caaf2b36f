//! Entry name transcoding between UTF-8 and GBK.
//!
//! Zip archives produced on Chinese Windows systems commonly store entry
//! names as raw GBK bytes without setting the UTF-8 flag. [`Encoding`] maps
//! names into that representation when compressing and back out of it when
//! extracting. Unrepresentable characters are errors, never replaced.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Character set used for entry names inside the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    Gbk,
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Gbk => "GBK",
        }
    }

    /// Convert a name to the bytes stored in the archive.
    pub fn encode(&self, name: &str) -> Result<Vec<u8>> {
        match self {
            Encoding::Utf8 => Ok(name.as_bytes().to_vec()),
            Encoding::Gbk => {
                let (bytes, _, had_errors) = encoding_rs::GBK.encode(name);
                if had_errors {
                    return Err(self.failure(name.to_string()));
                }
                Ok(bytes.into_owned())
            }
        }
    }

    /// Convert stored name bytes to the bytes of the on-disk name.
    ///
    /// UTF-8 passes the bytes through untouched, valid or not. GBK yields
    /// UTF-8 and fails on malformed sequences.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        match self {
            Encoding::Utf8 => Ok(Cow::Borrowed(bytes)),
            Encoding::Gbk => encoding_rs::GBK
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|name| Cow::Owned(name.into_owned().into_bytes()))
                .ok_or_else(|| self.failure(String::from_utf8_lossy(bytes).into_owned())),
        }
    }

    /// Decoded name for display; bytes that are not UTF-8 are replaced.
    pub fn display_name(&self, bytes: &[u8]) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.decode(bytes)?).into_owned())
    }

    fn failure(&self, name: String) -> Error {
        Error::Transcoding {
            name,
            encoding: *self,
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "UTF-8" => Ok(Encoding::Utf8),
            "GBK" => Ok(Encoding::Gbk),
            _ => Err(Error::UnsupportedEncoding(s.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("UTF-8", Encoding::Utf8)]
    #[case("utf-8", Encoding::Utf8)]
    #[case("GBK", Encoding::Gbk)]
    #[case("gbk", Encoding::Gbk)]
    #[case("Gbk", Encoding::Gbk)]
    fn parses_supported_charsets(#[case] input: &str, #[case] expected: Encoding) {
        assert_eq!(input.parse::<Encoding>().unwrap(), expected);
    }

    #[rstest]
    #[case("latin1")]
    #[case("utf8")]
    #[case("GB18030")]
    #[case("")]
    fn rejects_other_charsets(#[case] input: &str) {
        let err = input.parse::<Encoding>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedEncoding(ref s) if s == input));
    }

    #[test]
    fn utf8_is_identity() {
        let name = "目录/文件.txt";
        assert_eq!(Encoding::Utf8.encode(name).unwrap(), name.as_bytes());
        assert_eq!(*Encoding::Utf8.decode(name.as_bytes()).unwrap(), *name.as_bytes());
    }

    #[test]
    fn gbk_encodes_known_bytes() {
        assert_eq!(
            Encoding::Gbk.encode("你好").unwrap(),
            vec![0xc4, 0xe3, 0xba, 0xc3]
        );
        assert_eq!(Encoding::Gbk.display_name(b"\xc4\xe3\xba\xc3").unwrap(), "你好");
    }

    #[test]
    fn gbk_leaves_ascii_alone() {
        assert_eq!(Encoding::Gbk.encode("proj/a.txt").unwrap(), b"proj/a.txt");
    }

    #[rstest]
    #[case("文件.txt")]
    #[case("中文目录/子目录/说明.md")]
    #[case("plain.txt")]
    fn gbk_round_trips(#[case] name: &str) {
        let encoded = Encoding::Gbk.encode(name).unwrap();
        assert_eq!(Encoding::Gbk.display_name(&encoded).unwrap(), name);
    }

    #[test]
    fn gbk_rejects_unmappable_characters() {
        let err = Encoding::Gbk.encode("smile-😀.txt").unwrap_err();
        assert!(matches!(err, Error::Transcoding { encoding: Encoding::Gbk, .. }));
    }

    #[test]
    fn gbk_rejects_truncated_sequence() {
        assert!(Encoding::Gbk.decode(b"abc\xc4").is_err());
    }

    #[test]
    fn utf8_passes_invalid_bytes_through() {
        let raw = b"\xc4\xe3\xba\xc3.txt";
        assert!(matches!(Encoding::Utf8.decode(raw).unwrap(), Cow::Borrowed(b) if b == raw));
        let shown = Encoding::Utf8.display_name(raw).unwrap();
        assert!(shown.starts_with('\u{fffd}') && shown.ends_with(".txt"));
    }
}
