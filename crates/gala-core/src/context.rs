//! # Target Context
//!
//! The debug target that session-level calls resolve against.
//!
//! The engine can debug several targets at once, and a pretty printer may
//! evaluate expressions or look up types while it renders a value. Those
//! nested calls must resolve against the target that produced the value, not
//! whatever the user last selected. Entry points therefore enter the value's
//! target with an RAII guard, which restores the caller's target when it is
//! dropped, including on early `?` returns and unwinding.
//!
//! ## Example
//!
//! ```rust
//! use gala_core::context::{current_target, TargetContext};
//! use gala_core::testing::MockTarget;
//!
//! let target = MockTarget::new();
//! assert!(current_target().is_err());
//! {
//!     let _guard = TargetContext::enter(target.as_target());
//!     assert_eq!(current_target().unwrap().id(), target.id());
//! }
//! assert!(current_target().is_err());
//! ```

use std::cell::RefCell;

use crate::error::{GalaError, GalaResult};
use crate::host::TargetRef;

thread_local! {
    static CURRENT_TARGET: RefCell<Option<TargetRef>> = const { RefCell::new(None) };
}

/// Entry point for scoped target selection.
pub struct TargetContext;

impl TargetContext
{
    /// Make `target` current until the returned guard is dropped.
    #[must_use = "the target is only current while the guard is alive"]
    pub fn enter(target: TargetRef) -> TargetContextGuard
    {
        let previous = CURRENT_TARGET.with(|slot| slot.borrow_mut().replace(target));
        TargetContextGuard { previous, active: true }
    }
}

/// RAII guard that restores the previously current target when dropped.
///
/// Guards nest: each one remembers exactly what it displaced.
pub struct TargetContextGuard
{
    previous: Option<TargetRef>,
    active: bool,
}

impl TargetContextGuard
{
    /// Restore the previous target before the guard goes out of scope.
    ///
    /// After calling this method, dropping the guard is a no-op.
    pub fn restore(mut self)
    {
        self.restore_previous();
    }

    fn restore_previous(&mut self)
    {
        if self.active {
            let previous = self.previous.take();
            CURRENT_TARGET.with(|slot| *slot.borrow_mut() = previous);
            self.active = false;
        }
    }
}

impl Drop for TargetContextGuard
{
    fn drop(&mut self)
    {
        self.restore_previous();
    }
}

/// The target entered most recently on this thread.
///
/// ## Errors
///
/// - `NoTarget`: no [`TargetContext`] is active
pub fn current_target() -> GalaResult<TargetRef>
{
    CURRENT_TARGET.with(|slot| slot.borrow().clone()).ok_or(GalaError::NoTarget)
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::testing::MockTarget;

    #[test]
    fn test_nested_guards_restore_in_order()
    {
        let outer = MockTarget::new();
        let inner = MockTarget::new();

        let outer_guard = TargetContext::enter(outer.as_target());
        {
            let _inner_guard = TargetContext::enter(inner.as_target());
            assert_eq!(current_target().unwrap().id(), inner.id());
        }
        assert_eq!(current_target().unwrap().id(), outer.id());
        drop(outer_guard);
        assert!(matches!(current_target(), Err(GalaError::NoTarget)));
    }

    #[test]
    fn test_restore_on_error_path()
    {
        fn failing(target: TargetRef) -> GalaResult<()>
        {
            let _guard = TargetContext::enter(target);
            Err(GalaError::Lookup("boom".into()))
        }

        let target = MockTarget::new();
        assert!(failing(target.as_target()).is_err());
        assert!(current_target().is_err());
    }

    #[test]
    fn test_explicit_restore()
    {
        let target = MockTarget::new();
        let guard = TargetContext::enter(target.as_target());
        guard.restore();
        assert!(current_target().is_err());
    }
}
