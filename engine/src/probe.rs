//! Two-call enumeration and component support probing.

use tether_types::{ComponentType, EngineError, ResultCode, SpaceHandle};

use crate::runtime::SpatialRuntime;

/// Size-then-fill rounds attempted before giving up on a list that keeps growing.
pub const ENUMERATION_ATTEMPTS: usize = 2;

/// Run the two-call idiom against `call`.
///
/// `call` receives an output slice whose length is the capacity; an empty slice
/// asks for the required count. The count returned by the filling call is
/// authoritative when it fits the buffer. If the list grew between the two
/// calls the round is repeated once; a second disagreement is
/// [`EngineError::EnumerationUnstable`].
pub fn enumerate_two_call<T, F>(mut call: F) -> Result<Vec<T>, EngineError>
where
    T: Clone + Default,
    F: FnMut(&mut [T]) -> Result<u32, ResultCode>,
{
    for attempt in 1..=ENUMERATION_ATTEMPTS {
        let mut empty: Vec<T> = Vec::new();
        let required = call(empty.as_mut_slice())? as usize;
        if required == 0 {
            return Ok(Vec::new());
        }

        let mut buffer = vec![T::default(); required];
        match call(&mut buffer) {
            Ok(written) if written as usize <= required => {
                buffer.truncate(written as usize);
                return Ok(buffer);
            }
            Ok(written) => {
                tracing::debug!(attempt, required, written, "Enumeration grew between calls");
            }
            Err(ResultCode::SizeInsufficient) => {
                tracing::debug!(attempt, required, "Enumeration buffer insufficient");
            }
            Err(code) => return Err(code.into()),
        }
    }
    Err(EngineError::EnumerationUnstable)
}

/// Asks a space which components it supports.
#[derive(Debug, Clone, Copy, Default)]
pub struct CapabilityProbe;

impl CapabilityProbe {
    pub fn supported_components<R: SpatialRuntime + ?Sized>(
        runtime: &mut R,
        space: SpaceHandle,
    ) -> Result<Vec<ComponentType>, EngineError> {
        enumerate_two_call(|out| runtime.enumerate_supported_components(space, out))
    }

    /// `false` on any enumeration failure; the failure is logged.
    pub fn supports<R: SpatialRuntime + ?Sized>(
        runtime: &mut R,
        space: SpaceHandle,
        component: ComponentType,
    ) -> bool {
        match Self::supported_components(runtime, space) {
            Ok(components) => components.contains(&component),
            Err(e) => {
                tracing::error!(handle = %space, error = %e, "Failed to enumerate supported components");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Native-style enumerator over a list that may change between calls.
    struct Source {
        lists: Vec<Vec<u32>>,
        calls: usize,
    }

    impl Source {
        fn new(lists: Vec<Vec<u32>>) -> Self {
            Self { lists, calls: 0 }
        }

        fn call(&mut self, out: &mut [u32]) -> Result<u32, ResultCode> {
            let idx = self.calls.min(self.lists.len() - 1);
            self.calls += 1;
            let current = &self.lists[idx];
            if out.is_empty() {
                return Ok(current.len() as u32);
            }
            if out.len() < current.len() {
                return Err(ResultCode::SizeInsufficient);
            }
            out[..current.len()].copy_from_slice(current);
            Ok(current.len() as u32)
        }
    }

    #[test]
    fn returns_exactly_reported_count() {
        let mut source = Source::new(vec![vec![4, 5, 6]]);
        let items = enumerate_two_call(|out| source.call(out)).unwrap();
        assert_eq!(items, vec![4, 5, 6]);
        assert_eq!(source.calls, 2);
    }

    #[test]
    fn zero_count_skips_second_call() {
        let mut source = Source::new(vec![vec![]]);
        let items: Vec<u32> = enumerate_two_call(|out| source.call(out)).unwrap();
        assert!(items.is_empty());
        assert_eq!(source.calls, 1);
    }

    #[test]
    fn shrinking_list_uses_second_count() {
        // Size call sees three, fill call sees one.
        let mut source = Source::new(vec![vec![1, 2, 3], vec![9]]);
        let items = enumerate_two_call(|out| source.call(out)).unwrap();
        assert_eq!(items, vec![9]);
    }

    #[test]
    fn growth_once_is_retried() {
        let mut source = Source::new(vec![vec![1], vec![1, 2], vec![1, 2], vec![1, 2]]);
        let items = enumerate_two_call(|out| source.call(out)).unwrap();
        assert_eq!(items, vec![1, 2]);
        assert_eq!(source.calls, 4);
    }

    #[test]
    fn persistent_growth_is_unstable() {
        let mut source = Source::new(vec![vec![1], vec![1, 2], vec![1, 2], vec![1, 2, 3]]);
        let err = enumerate_two_call(|out| source.call(out)).unwrap_err();
        assert_eq!(err, EngineError::EnumerationUnstable);
    }

    #[test]
    fn count_beyond_capacity_is_retried() {
        // A runtime that over-reports on the fill call instead of erroring.
        let mut calls = 0;
        let err = enumerate_two_call(|out: &mut [u32]| {
            calls += 1;
            if out.is_empty() { Ok(1) } else { Ok(out.len() as u32 + 1) }
        })
        .unwrap_err();
        assert_eq!(err, EngineError::EnumerationUnstable);
        assert_eq!(calls, 4);
    }

    #[test]
    fn native_error_propagates() {
        let err =
            enumerate_two_call(|_: &mut [u32]| Err(ResultCode::HandleInvalid)).unwrap_err();
        assert_eq!(err, EngineError::Runtime(ResultCode::HandleInvalid));
    }
}
