use std::cell::Cell;
use std::thread::{self, ThreadId};

use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_MULTITHREADED};

use dlnotify_core::error::{DeckLinkError, Result};
use dlnotify_core::HResult;

// CoInitializeEx / CoUninitialize 作用于调用线程，因此计数也按线程记录
thread_local! {
    static APARTMENT_REFCNT: Cell<usize> = const { Cell::new(0) };
    // 宿主已用其他并发模型初始化过 COM 时，我们不负责 CoUninitialize
    static OWNED: Cell<bool> = const { Cell::new(false) };
}

/// Initializes COM on the calling thread, with reference counting.
///
/// Several discovery instances created on one thread share the same
/// initialization; COM is only torn down when the last [`ComApartment`] of
/// that thread is dropped.
pub fn initialize_com() -> Result<()> {
    if APARTMENT_REFCNT.get() == 0 {
        // DeckLink 的回调来自驱动自己的线程，控制台程序没有消息循环，因此使用 MTA
        let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
        if hr == RPC_E_CHANGED_MODE {
            tracing::debug!("COM already initialized with a different concurrency model");
            OWNED.set(false);
        } else {
            hr.ok()
                .map_err(|e| DeckLinkError::com("CoInitializeEx", HResult(e.code().0)))?;
            OWNED.set(true);
        }
    }
    APARTMENT_REFCNT.set(APARTMENT_REFCNT.get() + 1);
    Ok(())
}

/// Drops one reference taken by [`initialize_com`] on the calling thread.
pub fn shutdown_com() {
    match APARTMENT_REFCNT.get() {
        0 => tracing::warn!("shutdown_com without a matching initialize_com on this thread"),
        1 => {
            APARTMENT_REFCNT.set(0);
            if OWNED.replace(false) {
                unsafe { CoUninitialize() };
            }
        }
        n => APARTMENT_REFCNT.set(n - 1),
    }
}

/// Number of live apartment references on the calling thread.
pub fn apartment_refs() -> usize {
    APARTMENT_REFCNT.get()
}

/// Keeps COM initialized on the creating thread while alive.
///
/// May be moved to and dropped on another thread, but COM can only be
/// uninitialized by the thread that initialized it: such a drop leaves the
/// creating thread's reference in place and logs a warning.
#[derive(Debug)]
pub struct ComApartment {
    thread: ThreadId,
}

impl ComApartment {
    pub fn enter() -> Result<Self> {
        initialize_com()?;
        Ok(Self {
            thread: thread::current().id(),
        })
    }

    pub fn thread(&self) -> ThreadId {
        self.thread
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if thread::current().id() == self.thread {
            shutdown_com();
        } else {
            tracing::warn!(
                owner = ?self.thread,
                "COM apartment dropped on another thread; COM stays initialized on its creator"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_apartments_share_one_initialization() -> anyhow::Result<()> {
        let before = apartment_refs();
        let outer = ComApartment::enter()?;
        let inner = ComApartment::enter()?;
        assert_eq!(apartment_refs(), before + 2);

        drop(inner);
        assert_eq!(apartment_refs(), before + 1);
        drop(outer);
        assert_eq!(apartment_refs(), before);
        Ok(())
    }

    #[test]
    fn foreign_thread_drop_leaves_creator_count_alone() -> anyhow::Result<()> {
        let apartment = ComApartment::enter()?;
        let creator = apartment.thread();
        let refs = apartment_refs();

        let other = std::thread::spawn(move || {
            let before = apartment_refs();
            drop(apartment);
            // 其他线程的计数不受影响
            apartment_refs() == before
        })
        .join()
        .map_err(|_| anyhow::anyhow!("drop thread panicked"))?;

        assert!(other);
        assert_eq!(thread::current().id(), creator);
        assert_eq!(apartment_refs(), refs);
        shutdown_com();
        Ok(())
    }
}
