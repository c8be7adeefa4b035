//! VM configuration

use serde::Deserialize;

/// Tunables for a VM instance
///
/// Every field has a default, so a partial table deserializes fine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Most call frames a single fiber may hold
    pub max_call_depth: usize,
    /// Most heap objects before the VM reports `OutOfMemory`
    pub max_heap_objects: usize,
    /// Value stack slots reserved up front for each new fiber
    pub initial_stack_capacity: usize,
    /// Emit a trace event on every fiber switch
    pub trace_fibers: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 1024,
            max_heap_objects: 16 * 1024 * 1024,
            initial_stack_capacity: 64,
            trace_fibers: false,
        }
    }
}

impl VmConfig {
    /// Set the call depth limit
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Set the heap object limit
    pub fn with_max_heap_objects(mut self, objects: usize) -> Self {
        self.max_heap_objects = objects;
        self
    }
}
