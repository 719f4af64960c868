//! Open/closed state guard shared by `Database` and `Statement`.
//!
//! State-sensitive operations call `require_open` as their first step so
//! that a closed resource always fails with the same invalid-state error,
//! naming the resource, before any engine handle is touched.

use crate::error::{Error, Result};

#[derive(Debug)]
pub(crate) struct Openable {
    name: &'static str,
    open: bool,
}

impl Openable {
    pub(crate) fn new(name: &'static str, open: bool) -> Self {
        Self { name, open }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.open
    }

    /// Fails with an invalid-state error carrying the owner's name when the
    /// resource is closed.
    pub(crate) fn require_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::NotOpen {
                resource: self.name,
            })
        }
    }

    /// The inverse guard, used by `Database::connect` to reject reopening.
    pub(crate) fn require_closed(&self) -> Result<()> {
        if self.open {
            Err(Error::AlreadyOpen {
                resource: self.name,
            })
        } else {
            Ok(())
        }
    }

    pub(crate) fn set_open(&mut self, open: bool) {
        self.open = open;
    }
}
