use std::mem::ManuallyDrop;

use crate::runtime::memory_error::MemoryError;

// =============================================================================
// Executable memory lifecycle
//
// A region moves through exactly two protection states: Writable while the
// compiled bytes are copied in (CodeRegion), then Executable for its whole
// callable life (ExecutableCode). It is never both at once, and it is never
// called while writable.
// =============================================================================

/// Owner of the page-granularity allocation parameters. Callers construct
/// one and pass it where code needs to be loaded; nothing here is a process
/// global beyond the OS memory map itself.
pub struct JitAllocator {
    page_size: usize,
}

impl JitAllocator {
    pub fn new() -> Self {
        JitAllocator {
            page_size: query_page_size(),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Map a fresh region, copy `code` into it, and flip it executable.
    ///
    /// The returned handle is the only way to call the code. The bytes must
    /// be the body of an `extern "C" fn() -> i64`, which is what the
    /// compiler produces.
    pub fn load(&self, code: &[u8]) -> Result<ExecutableCode, MemoryError> {
        if code.is_empty() {
            return Err(MemoryError::new("refusing to map an empty code buffer"));
        }

        let len = round_up(code.len(), self.page_size);
        let mut region = CodeRegion::map(len)?;
        region.fill(code);
        region.into_executable()
    }
}

impl Default for JitAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// A freshly mapped read+write region being filled with code. Unmaps itself
/// if it never makes the transition to executable.
struct CodeRegion {
    ptr: *mut u8,
    len: usize,
}

impl CodeRegion {
    fn map(len: usize) -> Result<Self, MemoryError> {
        let ptr = map_writable(len)?;
        Ok(CodeRegion { ptr, len })
    }

    fn fill(&mut self, code: &[u8]) {
        debug_assert!(code.len() <= self.len);
        unsafe {
            std::ptr::copy_nonoverlapping(code.as_ptr(), self.ptr, code.len());
        }
    }

    /// Single protection change from read+write to read+execute. On failure
    /// the region is unmapped by the normal drop path.
    fn into_executable(self) -> Result<ExecutableCode, MemoryError> {
        protect_executable(self.ptr, self.len)?;

        let region = ManuallyDrop::new(self);
        Ok(ExecutableCode {
            ptr: region.ptr,
            len: region.len,
        })
    }
}

impl Drop for CodeRegion {
    fn drop(&mut self) {
        unmap(self.ptr, self.len);
    }
}

/// A compiled expression in executable memory. The region is immutable and
/// stateless between calls, so `invoke` can run any number of times and
/// always computes the same value.
#[derive(Debug)]
pub struct ExecutableCode {
    ptr: *mut u8,
    len: usize,
}

impl ExecutableCode {
    pub fn invoke(&self) -> i64 {
        type Entry = unsafe extern "C" fn() -> i64;
        let entry = unsafe { std::mem::transmute::<*mut u8, Entry>(self.ptr) };
        unsafe { entry() }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for ExecutableCode {
    fn drop(&mut self) {
        // Leave no executable mapping behind: revert the protection first,
        // then release the region.
        protect_writable(self.ptr, self.len);
        unmap(self.ptr, self.len);
    }
}

fn round_up(len: usize, page: usize) -> usize {
    len.div_ceil(page) * page
}

// =============================================================================
// OS boundary - every raw call lives below this line
// =============================================================================

#[cfg(unix)]
fn query_page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 { size as usize } else { 4096 }
}

#[cfg(unix)]
fn map_writable(len: usize) -> Result<*mut u8, MemoryError> {
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_ANON | libc::MAP_PRIVATE,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(MemoryError::os("mmap failed"));
    }
    Ok(ptr as *mut u8)
}

#[cfg(unix)]
fn protect_executable(ptr: *mut u8, len: usize) -> Result<(), MemoryError> {
    let rc = unsafe { libc::mprotect(ptr as *mut _, len, libc::PROT_READ | libc::PROT_EXEC) };
    if rc != 0 {
        return Err(MemoryError::os("mprotect(rx) failed"));
    }
    Ok(())
}

#[cfg(unix)]
fn protect_writable(ptr: *mut u8, len: usize) {
    // Best effort on teardown; the munmap right after reclaims it anyway.
    unsafe {
        libc::mprotect(ptr as *mut _, len, libc::PROT_READ | libc::PROT_WRITE);
    }
}

#[cfg(unix)]
fn unmap(ptr: *mut u8, len: usize) {
    if !ptr.is_null() {
        unsafe {
            libc::munmap(ptr as *mut _, len);
        }
    }
}

#[cfg(not(unix))]
fn query_page_size() -> usize {
    4096
}

#[cfg(not(unix))]
fn map_writable(_len: usize) -> Result<*mut u8, MemoryError> {
    Err(MemoryError::new(
        "executable memory is not supported on this platform",
    ))
}

#[cfg(not(unix))]
fn protect_executable(_ptr: *mut u8, _len: usize) -> Result<(), MemoryError> {
    Err(MemoryError::new(
        "executable memory is not supported on this platform",
    ))
}

#[cfg(not(unix))]
fn protect_writable(_ptr: *mut u8, _len: usize) {}

#[cfg(not(unix))]
fn unmap(_ptr: *mut u8, _len: usize) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_positive() {
        assert!(JitAllocator::new().page_size() > 0);
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(1, 4096), 4096);
        assert_eq!(round_up(4096, 4096), 4096);
        assert_eq!(round_up(4097, 4096), 8192);
    }

    #[test]
    fn test_empty_code_rejected() {
        let err = JitAllocator::new().load(&[]).unwrap_err();
        assert!(err.message.contains("empty"));
    }

    #[cfg(all(target_arch = "x86_64", unix))]
    mod native {
        use super::super::*;

        /// movabs rax, <imm>; ret
        fn return_constant(value: i64) -> Vec<u8> {
            let mut code = vec![0x48, 0xB8];
            code.extend_from_slice(&value.to_le_bytes());
            code.push(0xC3);
            code
        }

        #[test]
        fn test_load_and_invoke() {
            let alloc = JitAllocator::new();
            let handle = alloc.load(&return_constant(7)).unwrap();
            assert_eq!(handle.invoke(), 7);
        }

        #[test]
        fn test_invoke_is_idempotent() {
            let alloc = JitAllocator::new();
            let handle = alloc.load(&return_constant(-3)).unwrap();
            for _ in 0..10 {
                assert_eq!(handle.invoke(), -3);
            }
        }

        #[test]
        fn test_region_rounded_to_page() {
            let alloc = JitAllocator::new();
            let handle = alloc.load(&return_constant(1)).unwrap();
            assert_eq!(handle.len() % alloc.page_size(), 0);
            assert!(!handle.is_empty());
        }

        #[test]
        fn test_many_load_release_cycles() {
            let alloc = JitAllocator::new();
            for i in 0..200 {
                let handle = alloc.load(&return_constant(i)).unwrap();
                assert_eq!(handle.invoke(), i);
                // handle drops here, releasing the region
            }
        }
    }
}
