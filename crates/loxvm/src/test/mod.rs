mod test_classes;
mod test_closures;
mod test_errors;
mod test_limits;
mod test_strings;
mod test_values;

use crate::config::VmOptions;
use crate::vm::{PrintSink, Vm};
use std::cell::RefCell;
use std::rc::Rc;

/// A `Vm` wired to an in-memory buffer, plus a handle to read back everything
/// `print` wrote to it so far.
pub(crate) struct Captured {
    pub vm: Vm,
    buf: Rc<RefCell<Vec<u8>>>,
}

impl Captured {
    pub fn new() -> Self {
        Self::with_options(VmOptions::default())
    }

    pub fn with_options(options: VmOptions) -> Self {
        let buf = Rc::new(RefCell::new(Vec::new()));
        let vm = Vm::with_output(options, PrintSink::Buffer(buf.clone()));
        Self { vm, buf }
    }

    pub fn output(&self) -> String {
        String::from_utf8(self.buf.borrow().clone()).expect("printed bytes are valid utf8")
    }
}
