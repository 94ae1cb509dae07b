//! Panics must not unwind across the C boundary. Every exported function
//! runs its body inside one of these guards.

/// Runs an FFI body returning [`Aec3Error`](crate::types::Aec3Error),
/// mapping a panic to `Aec3Error::Internal`.
macro_rules! ffi_guard {
    ($($body:tt)*) => {{
        use std::panic;
        use std::panic::AssertUnwindSafe;

        match panic::catch_unwind(AssertUnwindSafe(move || { $($body)* })) {
            Ok(result) => result,
            Err(_) => $crate::types::Aec3Error::Internal,
        }
    }};
}

/// Runs an FFI body returning a pointer, mapping a panic to null.
macro_rules! ffi_guard_ptr {
    ($($body:tt)*) => {{
        use std::panic;
        use std::panic::AssertUnwindSafe;
        use std::ptr;

        match panic::catch_unwind(AssertUnwindSafe(move || { $($body)* })) {
            Ok(result) => result,
            Err(_) => ptr::null_mut(),
        }
    }};
}

pub(crate) use ffi_guard;
pub(crate) use ffi_guard_ptr;

#[cfg(test)]
mod tests {
    use crate::types::Aec3Error;

    #[test]
    fn ffi_guard_passes_result_through() {
        let result: Aec3Error = ffi_guard! { Aec3Error::BadFrameSize };
        assert_eq!(result, Aec3Error::BadFrameSize);
    }

    #[test]
    fn ffi_guard_maps_panic_to_internal() {
        let result: Aec3Error = ffi_guard! {
            panic!("boom");
        };
        assert_eq!(result, Aec3Error::Internal);
    }

    #[test]
    fn ffi_guard_ptr_maps_panic_to_null() {
        let ptr: *mut u8 = ffi_guard_ptr! {
            panic!("boom");
        };
        assert!(ptr.is_null());
    }
}
