//! SDK 字符串的平台差异
//!
//! `IDeckLink::GetModelName` 等方法返回的字符串由调用方负责释放：
//! - Linux: `const char*`，用 `free()` 释放
//! - macOS: `CFStringRef`，用 `CFRelease()` 释放
//! - Windows: `BSTR`，用 `SysFreeString()` 释放

cfg_if::cfg_if! {
    if #[cfg(windows)] {
        pub type RawSdkString = *const u16;

        #[link(name = "oleaut32")]
        extern "system" {
            fn SysAllocStringLen(psz: *const u16, len: u32) -> *const u16;
            fn SysStringLen(bstr: *const u16) -> u32;
            fn SysFreeString(bstr: *const u16);
        }

        /// Converts an SDK-owned string to a `String` and frees it.
        ///
        /// # Safety
        /// `raw` must be null or a `BSTR` whose ownership is transferred to us.
        pub unsafe fn take(raw: RawSdkString) -> Option<String> {
            if raw.is_null() {
                return None;
            }
            let len = SysStringLen(raw) as usize;
            let value = String::from_utf16_lossy(std::slice::from_raw_parts(raw, len));
            SysFreeString(raw);
            Some(value)
        }

        /// Allocates a string the way the SDK does, for in-process providers.
        pub fn alloc(value: &str) -> RawSdkString {
            let wide: Vec<u16> = value.encode_utf16().collect();
            unsafe { SysAllocStringLen(wide.as_ptr(), wide.len() as u32) }
        }
    } else if #[cfg(target_os = "macos")] {
        use std::ffi::c_void;

        pub type RawSdkString = *const c_void;

        const K_CF_STRING_ENCODING_UTF8: u32 = 0x0800_0100;

        #[link(name = "CoreFoundation", kind = "framework")]
        extern "C" {
            fn CFStringGetLength(s: *const c_void) -> isize;
            fn CFStringGetMaximumSizeForEncoding(length: isize, encoding: u32) -> isize;
            fn CFStringGetCString(
                s: *const c_void,
                buf: *mut libc::c_char,
                size: isize,
                encoding: u32,
            ) -> u8;
            fn CFStringCreateWithBytes(
                alloc: *const c_void,
                bytes: *const u8,
                len: isize,
                encoding: u32,
                external: u8,
            ) -> *const c_void;
            fn CFRelease(cf: *const c_void);
        }

        /// Converts an SDK-owned `CFStringRef` to a `String` and releases it.
        ///
        /// # Safety
        /// `raw` must be null or a `CFStringRef` whose ownership is transferred to us.
        pub unsafe fn take(raw: RawSdkString) -> Option<String> {
            if raw.is_null() {
                return None;
            }
            let len = CFStringGetLength(raw);
            let cap = CFStringGetMaximumSizeForEncoding(len, K_CF_STRING_ENCODING_UTF8) + 1;
            let mut buf = vec![0 as libc::c_char; cap.max(1) as usize];
            let ok = CFStringGetCString(raw, buf.as_mut_ptr(), cap, K_CF_STRING_ENCODING_UTF8);
            let value = if ok != 0 {
                Some(std::ffi::CStr::from_ptr(buf.as_ptr()).to_string_lossy().into_owned())
            } else {
                None
            };
            CFRelease(raw);
            value
        }

        pub fn alloc(value: &str) -> RawSdkString {
            unsafe {
                CFStringCreateWithBytes(
                    std::ptr::null(),
                    value.as_ptr(),
                    value.len() as isize,
                    K_CF_STRING_ENCODING_UTF8,
                    0,
                )
            }
        }
    } else {
        use std::ffi::{CStr, CString};
        use libc::c_char;

        pub type RawSdkString = *const c_char;

        /// Converts an SDK-owned C string to a `String` and frees it.
        ///
        /// # Safety
        /// `raw` must be null or a `malloc`-allocated, NUL-terminated string
        /// whose ownership is transferred to us.
        pub unsafe fn take(raw: RawSdkString) -> Option<String> {
            if raw.is_null() {
                return None;
            }
            let value = CStr::from_ptr(raw).to_string_lossy().into_owned();
            libc::free(raw as *mut libc::c_void);
            Some(value)
        }

        /// Allocates with `malloc` so that [`take`] can free it. Interior NULs are dropped.
        pub fn alloc(value: &str) -> RawSdkString {
            let bytes: Vec<u8> = value.bytes().filter(|b| *b != 0).collect();
            match CString::new(bytes) {
                Ok(c) => unsafe { libc::strdup(c.as_ptr()) as RawSdkString },
                Err(_) => std::ptr::null(),
            }
        }
    }
}
