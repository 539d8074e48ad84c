use std::fmt;

/// 128 位接口标识 (IID / CLSID)
///
/// 内部统一保存为 `u128`，与 SDK 头文件中的书写顺序一致
/// (例如 `CDBF631C-BC76-45FA-B44D-C55059BC6101`)。
/// 传给驱动时再按平台转换为 [`RawGuid`]。
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Guid(u128);

impl Guid {
    pub const fn from_u128(value: u128) -> Self {
        Self(value)
    }

    pub const fn to_u128(self) -> u128 {
        self.0
    }

    /// Converts into the in-memory layout the SDK expects for this platform.
    pub const fn to_raw(self) -> RawGuid {
        RawGuid::from_u128(self.0)
    }

    pub const fn from_raw(raw: RawGuid) -> Self {
        Self(raw.to_u128())
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:04X}-{:012X}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xFFFF_FFFF_FFFF
        )
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({self})")
    }
}

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        /// Windows `GUID` 结构体 (小端字段)
        #[repr(C)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct RawGuid {
            pub data1: u32,
            pub data2: u16,
            pub data3: u16,
            pub data4: [u8; 8],
        }

        impl RawGuid {
            pub const fn from_u128(v: u128) -> Self {
                Self {
                    data1: (v >> 96) as u32,
                    data2: (v >> 80) as u16,
                    data3: (v >> 64) as u16,
                    data4: (v as u64).to_be_bytes(),
                }
            }

            pub const fn to_u128(self) -> u128 {
                ((self.data1 as u128) << 96)
                    | ((self.data2 as u128) << 80)
                    | ((self.data3 as u128) << 64)
                    | (u64::from_be_bytes(self.data4) as u128)
            }
        }

        /// `REFIID` 在 Windows 上是 `const IID&`，即指针
        pub type RefIid = *const RawGuid;

        /// # Safety
        /// `iid` must be null or point to a valid GUID.
        pub unsafe fn guid_from_ref_iid(iid: RefIid) -> Option<Guid> {
            iid.as_ref().map(|raw| Guid::from_raw(*raw))
        }
    } else {
        /// Linux `REFIID` / macOS `CFUUIDBytes`：按书写顺序排列的 16 字节
        #[repr(C)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct RawGuid {
            pub bytes: [u8; 16],
        }

        impl RawGuid {
            pub const fn from_u128(v: u128) -> Self {
                Self { bytes: v.to_be_bytes() }
            }

            pub const fn to_u128(self) -> u128 {
                u128::from_be_bytes(self.bytes)
            }
        }

        /// `REFIID` 在 Linux/macOS 上按值传递
        pub type RefIid = RawGuid;

        /// # Safety
        /// Always safe on this platform; kept `unsafe` to match the Windows signature.
        pub unsafe fn guid_from_ref_iid(iid: RefIid) -> Option<Guid> {
            Some(Guid::from_raw(iid))
        }
    }
}

pub const IID_IUNKNOWN: Guid = Guid::from_u128(0x00000000_0000_0000_C000_000000000046);

pub const IID_IDECKLINK: Guid = Guid::from_u128(0xC418FBDD_0587_48ED_8FE5_640F0A14AF91);

pub const IID_IDECKLINK_DISCOVERY: Guid = Guid::from_u128(0xCDBF631C_BC76_45FA_B44D_C55059BC6101);

pub const IID_IDECKLINK_DEVICE_NOTIFICATION_CALLBACK: Guid =
    Guid::from_u128(0x4997053B_0ADF_4CC8_AC70_7A50C4BE728F);

/// COM class of the discovery service (Windows only, used with `CoCreateInstance`).
pub const CLSID_CDECKLINK_DISCOVERY: Guid =
    Guid::from_u128(0x22FBFC33_8D07_495C_A5BF_DAB5EA9B82DB);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_registry_format() {
        assert_eq!(
            IID_IDECKLINK_DISCOVERY.to_string(),
            "CDBF631C-BC76-45FA-B44D-C55059BC6101"
        );
        assert_eq!(IID_IUNKNOWN.to_string(), "00000000-0000-0000-C000-000000000046");
    }

    #[test]
    fn raw_layout_survives_conversion() {
        let raw = IID_IDECKLINK_DEVICE_NOTIFICATION_CALLBACK.to_raw();
        assert_eq!(Guid::from_raw(raw), IID_IDECKLINK_DEVICE_NOTIFICATION_CALLBACK);
    }

    #[cfg(not(windows))]
    #[test]
    fn unix_layout_matches_sdk_header_bytes() {
        // DeckLinkAPI.h: {0xCD,0xBF,0x63,0x1C,0xBC,0x76,0x45,0xFA,0xB4,0x4D,0xC5,0x50,0x59,0xBC,0x61,0x01}
        assert_eq!(
            IID_IDECKLINK_DISCOVERY.to_raw().bytes,
            [
                0xCD, 0xBF, 0x63, 0x1C, 0xBC, 0x76, 0x45, 0xFA, 0xB4, 0x4D, 0xC5, 0x50, 0x59,
                0xBC, 0x61, 0x01
            ]
        );
    }

    #[cfg(windows)]
    #[test]
    fn windows_layout_splits_fields() {
        let raw = IID_IDECKLINK_DISCOVERY.to_raw();
        assert_eq!(raw.data1, 0xCDBF631C);
        assert_eq!(raw.data2, 0xBC76);
        assert_eq!(raw.data3, 0x45FA);
        assert_eq!(raw.data4, [0xB4, 0x4D, 0xC5, 0x50, 0x59, 0xBC, 0x61, 0x01]);
    }

    #[test]
    fn ref_iid_reads_back() {
        let raw = IID_IDECKLINK.to_raw();
        #[cfg(windows)]
        let iid: RefIid = &raw;
        #[cfg(not(windows))]
        let iid: RefIid = raw;
        assert_eq!(unsafe { guid_from_ref_iid(iid) }, Some(IID_IDECKLINK));
    }
}
