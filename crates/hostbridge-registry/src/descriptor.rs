//! Mapping from kind spellings to host method descriptors.

use hostbridge_core::Signature;
use hostbridge_core::types::VOID_KIND;

use crate::error::BindError;

/// How a host spells method descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorStyle {
    /// `(params)ret`, `java/lang` object types.
    Jni,
    /// `params:ret`, `std/core` object types.
    Ets,
    /// Same shape as [`DescriptorStyle::Ets`].
    Ani,
}

impl DescriptorStyle {
    fn string_code(self) -> &'static str {
        match self {
            DescriptorStyle::Jni => "Ljava/lang/String;",
            DescriptorStyle::Ets | DescriptorStyle::Ani => "Lstd/core/String;",
        }
    }

    fn object_code(self) -> &'static str {
        match self {
            DescriptorStyle::Jni => "Ljava/lang/Object;",
            DescriptorStyle::Ets | DescriptorStyle::Ani => "Lstd/core/Object;",
        }
    }

    /// Host type code for a kind spelling.
    pub fn kind_code(self, kind: &str) -> Option<&'static str> {
        let code = match kind {
            VOID_KIND => "V",
            "KBoolean" => "Z",
            "KByte" => "B",
            "KInt" | "KUInt" => "I",
            "KLong" | "KULong" => "J",
            "KFloat" => "F",
            "KDouble" | "KInteropNumber" => "D",
            "KNativePointer" | "KSerializerBuffer" | "KVMObjectHandle" => "J",
            "KStringPtr" => self.string_code(),
            "KLength" => self.object_code(),
            "KByteArray" | "KInteropBuffer" | "KInteropReturnBuffer" => "[B",
            "KIntArray" => "[I",
            "KFloatArray" => "[F",
            _ => return None,
        };
        Some(code)
    }

    /// Host descriptor for a parsed signature.
    pub fn method_descriptor(self, signature: &Signature) -> Result<String, BindError> {
        let code = |kind: &str| {
            self.kind_code(kind)
                .ok_or_else(|| BindError::unknown_kind(kind, signature.to_string()))
        };
        let ret = code(signature.ret())?;
        let mut params = String::new();
        for param in signature.params() {
            params.push_str(code(param)?);
        }
        Ok(match self {
            DescriptorStyle::Jni => format!("({params}){ret}"),
            DescriptorStyle::Ets | DescriptorStyle::Ani => format!("{params}:{ret}"),
        })
    }

    /// Descriptor of `int callCallbackFromNative(int kind, byte[] args, int length)`.
    pub fn dispatcher_descriptor(self) -> &'static str {
        match self {
            DescriptorStyle::Jni => "(I[BI)I",
            DescriptorStyle::Ets | DescriptorStyle::Ani => "I[BI:I",
        }
    }
}
