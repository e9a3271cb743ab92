//! Tunable limits for a [`crate::Vm`].
//!
//! None of these are magic numbers baked into the interpreter loop; every limit the
//! spec calls out (value-stack depth, call-frame depth, GC growth factor) is a field
//! here so embedders can raise or lower them without patching the VM.

/// Construction-time limits and toggles for a [`crate::Vm`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VmOptions {
    /// Number of call frames, each of which may push up to 256 value-stack slots.
    pub frame_capacity: usize,
    /// Slots per frame; `frame_capacity * slots_per_frame` bounds the value stack.
    pub slots_per_frame: usize,
    /// Heap size (bytes) at which the very first GC cycle may trigger.
    pub initial_gc_threshold: usize,
    /// Multiplier applied to `bytes_allocated` to pick the next GC threshold.
    pub gc_heap_grow_factor: usize,
    /// Run a full GC cycle before every allocation. Exercises collector correctness
    /// at the cost of throughput; wired to the `stress_gc` Cargo feature by default
    /// but also settable directly for embedders that want it without recompiling.
    pub stress_gc: bool,
}

impl VmOptions {
    /// Total value-stack capacity implied by `frame_capacity * slots_per_frame`.
    pub fn stack_capacity(&self) -> usize {
        self.frame_capacity * self.slots_per_frame
    }
}

impl Default for VmOptions {
    fn default() -> Self {
        Self {
            frame_capacity: 64,
            slots_per_frame: 256,
            initial_gc_threshold: 1024 * 1024,
            gc_heap_grow_factor: 2,
            stress_gc: cfg!(feature = "stress_gc"),
        }
    }
}
