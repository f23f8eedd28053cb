//! Propagation Context
//!
//! The propagation context records which bindings are currently writing on
//! this thread. A binding enters the context before it writes to one of its
//! endpoints; if that write makes the other endpoint notify the same binding
//! again, the binding finds itself already on the stack and stays quiet.
//!
//! # Implementation
//!
//! We use a thread-local stack. Entering pushes the binding's ID and returns
//! a guard; dropping the guard pops it. Keeping the stack per thread means a
//! binding propagating on one thread never suppresses an unrelated write
//! arriving from another.

use std::cell::RefCell;

use smallvec::SmallVec;

use super::binding::BindingId;

thread_local! {
    static PROPAGATION_STACK: RefCell<SmallVec<[BindingId; 8]>> = RefCell::new(SmallVec::new());
}

/// Guard that pops the binding when dropped.
///
/// This keeps the stack intact even if a subscriber panics mid-propagation.
pub struct PropagationContext {
    binding: BindingId,
}

impl PropagationContext {
    /// Enter the context for `binding`.
    ///
    /// Returns `None` if the binding is already propagating on this thread.
    pub fn enter(binding: BindingId) -> Option<Self> {
        PROPAGATION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&binding) {
                return None;
            }
            stack.push(binding);
            Some(Self { binding })
        })
    }

    /// Whether `binding` is propagating on this thread.
    pub fn is_active(binding: BindingId) -> bool {
        PROPAGATION_STACK.with(|stack| stack.borrow().contains(&binding))
    }

    /// Number of bindings propagating on this thread.
    pub fn depth() -> usize {
        PROPAGATION_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for PropagationContext {
    fn drop(&mut self) {
        PROPAGATION_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Guards are scoped, so they must unwind in order.
            debug_assert_eq!(
                popped,
                Some(self.binding),
                "PropagationContext mismatch: expected {:?}, got {:?}",
                self.binding,
                popped
            );
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tracks_binding() {
        let id = BindingId::new();

        assert!(!PropagationContext::is_active(id));

        {
            let _ctx = PropagationContext::enter(id).expect("first entry");
            assert!(PropagationContext::is_active(id));

            // Re-entry is refused while active
            assert!(PropagationContext::enter(id).is_none());
        }

        assert!(!PropagationContext::is_active(id));
        assert!(PropagationContext::enter(id).is_some());
    }

    #[test]
    fn nested_contexts() {
        let id1 = BindingId::new();
        let id2 = BindingId::new();

        {
            let _ctx1 = PropagationContext::enter(id1).expect("outer");
            assert_eq!(PropagationContext::depth(), 1);

            {
                let _ctx2 = PropagationContext::enter(id2).expect("inner");
                assert_eq!(PropagationContext::depth(), 2);
                assert!(PropagationContext::is_active(id1));
                assert!(PropagationContext::is_active(id2));
            }

            assert!(!PropagationContext::is_active(id2));
            assert!(PropagationContext::is_active(id1));
        }

        assert_eq!(PropagationContext::depth(), 0);
    }

    #[test]
    fn contexts_are_per_thread() {
        let id = BindingId::new();
        let _ctx = PropagationContext::enter(id).expect("main thread");

        let other = std::thread::spawn(move || PropagationContext::enter(id).is_some())
            .join()
            .unwrap();
        assert!(other);
    }
}
