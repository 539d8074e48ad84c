use std::fmt;

/// COM 风格的 32 位返回码
///
/// 非负即成功。失败码的具体数值因平台而异：
/// Windows 使用系统 `winerror.h` 的值，Linux/macOS 使用 SDK 自带 COM 垫片的值。
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HResult(pub i32);

// 以 u32 书写，再按位转换，与头文件保持一致
const fn code(value: u32) -> HResult {
    HResult(value as i32)
}

impl HResult {
    pub const S_OK: HResult = HResult(0);
    pub const S_FALSE: HResult = HResult(1);
    pub const E_UNEXPECTED: HResult = code(0x8000_FFFF);
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        impl HResult {
            pub const E_NOTIMPL: HResult = code(0x8000_4001);
            pub const E_NOINTERFACE: HResult = code(0x8000_4002);
            pub const E_POINTER: HResult = code(0x8000_4003);
            pub const E_ABORT: HResult = code(0x8000_4004);
            pub const E_FAIL: HResult = code(0x8000_4005);
            pub const E_ACCESSDENIED: HResult = code(0x8007_0005);
            pub const E_HANDLE: HResult = code(0x8007_0006);
            pub const E_OUTOFMEMORY: HResult = code(0x8007_000E);
            pub const E_INVALIDARG: HResult = code(0x8007_0057);
        }
    } else {
        impl HResult {
            pub const E_NOTIMPL: HResult = code(0x8000_0001);
            pub const E_OUTOFMEMORY: HResult = code(0x8000_0002);
            pub const E_INVALIDARG: HResult = code(0x8000_0003);
            pub const E_NOINTERFACE: HResult = code(0x8000_0004);
            pub const E_POINTER: HResult = code(0x8000_0005);
            pub const E_HANDLE: HResult = code(0x8000_0006);
            pub const E_ABORT: HResult = code(0x8000_0007);
            pub const E_FAIL: HResult = code(0x8000_0008);
            pub const E_ACCESSDENIED: HResult = code(0x8000_0009);
        }
    }
}

impl HResult {
    pub const fn is_success(self) -> bool {
        self.0 >= 0
    }

    pub const fn is_failure(self) -> bool {
        self.0 < 0
    }

    /// The bit pattern as printed in SDK documentation.
    pub const fn as_u32(self) -> u32 {
        self.0 as u32
    }

    /// Symbolic name for well-known codes.
    pub fn name(self) -> Option<&'static str> {
        let known = [
            (Self::S_OK, "S_OK"),
            (Self::S_FALSE, "S_FALSE"),
            (Self::E_UNEXPECTED, "E_UNEXPECTED"),
            (Self::E_NOTIMPL, "E_NOTIMPL"),
            (Self::E_OUTOFMEMORY, "E_OUTOFMEMORY"),
            (Self::E_INVALIDARG, "E_INVALIDARG"),
            (Self::E_NOINTERFACE, "E_NOINTERFACE"),
            (Self::E_POINTER, "E_POINTER"),
            (Self::E_HANDLE, "E_HANDLE"),
            (Self::E_ABORT, "E_ABORT"),
            (Self::E_FAIL, "E_FAIL"),
            (Self::E_ACCESSDENIED, "E_ACCESSDENIED"),
        ];
        known
            .iter()
            .find(|(hr, _)| *hr == self)
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.as_u32())?;
        if let Some(name) = self.name() {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

impl fmt::Debug for HResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HResult({self})")
    }
}

impl From<i32> for HResult {
    fn from(value: i32) -> Self {
        HResult(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_sign_based() {
        assert!(HResult::S_OK.is_success());
        assert!(HResult::S_FALSE.is_success());
        assert!(HResult::E_FAIL.is_failure());
        assert!(HResult::E_UNEXPECTED.is_failure());
    }

    #[test]
    fn display_is_zero_padded_hex() {
        assert_eq!(HResult::S_OK.to_string(), "0x00000000 (S_OK)");
        assert_eq!(HResult(0x42).to_string(), "0x00000042");
        assert_eq!(HResult::E_UNEXPECTED.to_string(), "0x8000ffff (E_UNEXPECTED)");
    }

    #[cfg(not(windows))]
    #[test]
    fn unix_shim_values() {
        assert_eq!(HResult::E_NOINTERFACE.as_u32(), 0x8000_0004);
        assert_eq!(HResult::E_FAIL.to_string(), "0x80000008 (E_FAIL)");
    }
}
