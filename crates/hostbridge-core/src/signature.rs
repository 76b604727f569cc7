//! Signature descriptors: `Ret|P0|P1...` with kind spellings as components.

use std::fmt;

use crate::error::SignatureError;
use crate::types::VOID_KIND;

/// Parsed form of an export's signature descriptor.
///
/// Kind spellings are kept as opaque text; mapping them to host type codes is
/// the binder's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    ret: String,
    params: Vec<String>,
}

impl Signature {
    pub const SEPARATOR: char = '|';

    /// Build a descriptor from spellings; `ret` is `"void"` for no return value.
    pub fn from_parts(ret: &str, params: &[&str]) -> Self {
        Self {
            ret: ret.trim().to_string(),
            params: params.iter().map(|p| p.trim().to_string()).collect(),
        }
    }

    pub fn parse(text: &str) -> Result<Self, SignatureError> {
        if text.trim().is_empty() {
            return Err(SignatureError::Empty);
        }
        let mut parts = text.split(Self::SEPARATOR).map(str::trim);
        let ret = parts.next().unwrap_or_default();
        if ret.is_empty() {
            return Err(SignatureError::EmptyKind {
                signature: text.to_string(),
                index: 0,
            });
        }

        let mut params = Vec::new();
        for (offset, part) in parts.enumerate() {
            let index = offset + 1;
            if part.is_empty() {
                return Err(SignatureError::EmptyKind {
                    signature: text.to_string(),
                    index,
                });
            }
            if part == VOID_KIND {
                return Err(SignatureError::VoidParameter {
                    signature: text.to_string(),
                    index,
                });
            }
            params.push(part.to_string());
        }

        Ok(Self {
            ret: ret.to_string(),
            params,
        })
    }

    pub fn ret(&self) -> &str {
        &self.ret
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn is_void(&self) -> bool {
        self.ret == VOID_KIND
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ret)?;
        for param in &self.params {
            write!(f, "{}{}", Self::SEPARATOR, param)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Signature {
    type Err = SignatureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signature::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_with_params() {
        let sig = Signature::parse("KInt|KStringPtr|KInt").unwrap();
        assert_eq!(sig.ret(), "KInt");
        assert_eq!(sig.params(), &["KStringPtr".to_string(), "KInt".to_string()]);
        assert_eq!(sig.arity(), 2);
        assert!(!sig.is_void());
    }

    #[test]
    fn parse_void_no_params() {
        let sig = Signature::parse("void").unwrap();
        assert!(sig.is_void());
        assert_eq!(sig.arity(), 0);
    }

    #[test]
    fn display_matches_input() {
        let text = "KNativePointer|KByteArray|KInt";
        assert_eq!(Signature::parse(text).unwrap().to_string(), text);
        assert_eq!(
            Signature::from_parts("void", &["KInt", "KFloat"]).to_string(),
            "void|KInt|KFloat"
        );
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(Signature::parse(""), Err(SignatureError::Empty));
        assert!(matches!(
            Signature::parse("|KInt"),
            Err(SignatureError::EmptyKind { index: 0, .. })
        ));
        assert!(matches!(
            Signature::parse("KInt||KInt"),
            Err(SignatureError::EmptyKind { index: 1, .. })
        ));
        assert!(matches!(
            Signature::parse("KInt|void"),
            Err(SignatureError::VoidParameter { index: 1, .. })
        ));
    }
}
