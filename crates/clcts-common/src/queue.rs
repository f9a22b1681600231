//! Command-queue property flags.

use serde::{Deserialize, Serialize};

pub const CL_QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE: u64 = 1 << 0;
pub const CL_QUEUE_PROFILING_ENABLE: u64 = 1 << 1;

/// Properties requested for the command queue a test runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct QueueProperties {
    pub profiling: bool,
    pub out_of_order: bool,
}

impl QueueProperties {
    pub const fn bits(self) -> u64 {
        let mut bits = 0;
        if self.profiling {
            bits |= CL_QUEUE_PROFILING_ENABLE;
        }
        if self.out_of_order {
            bits |= CL_QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE;
        }
        bits
    }

    pub const fn from_bits(bits: u64) -> Self {
        Self {
            profiling: bits & CL_QUEUE_PROFILING_ENABLE != 0,
            out_of_order: bits & CL_QUEUE_OUT_OF_ORDER_EXEC_MODE_ENABLE != 0,
        }
    }

    /// True when every property requested here is present in `supported`.
    pub const fn is_subset_of(self, supported: u64) -> bool {
        self.bits() & !supported == 0
    }
}
