//! Resource requests attached to expressions and projections.

use serde::{Deserialize, Serialize};

/// Resources needed to evaluate an expression or projection.
///
/// Every field is optional; an absent field places no constraint on the
/// execution slot. The default request is the identity of [`max_resources`].
///
/// [`max_resources`]: ResourceRequest::max_resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequest {
    /// Number of CPUs.
    pub num_cpus: Option<f64>,
    /// Number of GPUs.
    pub num_gpus: Option<f64>,
    /// Memory in bytes.
    pub memory_bytes: Option<usize>,
}

impl ResourceRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the CPU request.
    #[must_use]
    pub fn with_num_cpus(mut self, num_cpus: f64) -> Self {
        self.num_cpus = Some(num_cpus);
        self
    }

    /// Set the GPU request.
    #[must_use]
    pub fn with_num_gpus(mut self, num_gpus: f64) -> Self {
        self.num_gpus = Some(num_gpus);
        self
    }

    /// Set the memory request.
    #[must_use]
    pub fn with_memory_bytes(mut self, memory_bytes: usize) -> Self {
        self.memory_bytes = Some(memory_bytes);
        self
    }

    /// Whether this request places no constraint at all.
    pub fn is_empty(&self) -> bool {
        self.num_cpus.is_none() && self.num_gpus.is_none() && self.memory_bytes.is_none()
    }

    /// Element-wise maximum of two requests.
    #[must_use]
    pub fn max(&self, other: &Self) -> Self {
        Self {
            num_cpus: max_opt(self.num_cpus, other.num_cpus, f64::max),
            num_gpus: max_opt(self.num_gpus, other.num_gpus, f64::max),
            memory_bytes: max_opt(self.memory_bytes, other.memory_bytes, usize::max),
        }
    }

    /// Element-wise maximum over any number of requests.
    pub fn max_resources<'a, I>(requests: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        requests
            .into_iter()
            .fold(Self::default(), |acc, req| acc.max(req))
    }
}

fn max_opt<T: Copy>(a: Option<T>, b: Option<T>, f: impl Fn(T, T) -> T) -> Option<T> {
    match (a, b) {
        (Some(a), Some(b)) => Some(f(a, b)),
        (a, None) => a,
        (None, b) => b,
    }
}
