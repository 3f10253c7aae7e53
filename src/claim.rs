use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::node::Action;
use crate::verify;

/// Explicit comparison spec for `it_checks`.
///
/// Each constructor binds its operand producers into the assertion the node
/// will run, so the producers are evaluated at execution time against the
/// then-current fixture state and mismatches report expected vs. actual.
pub struct Claim {
    assertion: Rc<RefCell<dyn FnMut()>>,
}

impl Claim {
    fn from_assertion(assertion: impl FnMut() + 'static) -> Self {
        Self {
            assertion: Rc::new(RefCell::new(assertion)),
        }
    }

    /// Plain truthiness of a predicate.
    pub fn that(mut predicate: impl FnMut() -> bool + 'static) -> Self {
        Self::from_assertion(move || verify::that(predicate(), "predicate returned false"))
    }

    /// Equality of two produced values; a mismatch reports the right side as
    /// expected and the left side as actual.
    pub fn eq<T, L, R>(mut left: L, mut right: R) -> Self
    where
        T: PartialEq + fmt::Debug,
        L: FnMut() -> T + 'static,
        R: FnMut() -> T + 'static,
    {
        Self::from_assertion(move || verify::equal(left(), right()))
    }

    /// Inequality of two produced values.
    pub fn ne<T, L, R>(mut left: L, mut right: R) -> Self
    where
        T: PartialEq + fmt::Debug,
        L: FnMut() -> T + 'static,
        R: FnMut() -> T + 'static,
    {
        Self::from_assertion(move || verify::not_equal(left(), right()))
    }

    /// Expects the produced option to be empty.
    pub fn is_none<T, F>(mut value: F) -> Self
    where
        T: fmt::Debug + 'static,
        F: FnMut() -> Option<T> + 'static,
    {
        Self::from_assertion(move || verify::is_none(&value()))
    }

    /// Expects the produced option to hold a value.
    pub fn is_some<T, F>(mut value: F) -> Self
    where
        T: 'static,
        F: FnMut() -> Option<T> + 'static,
    {
        Self::from_assertion(move || verify::is_some(&value()))
    }

    pub(crate) fn into_action(self) -> Action {
        Action::Run(self.assertion)
    }
}

impl fmt::Debug for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Claim")
    }
}
