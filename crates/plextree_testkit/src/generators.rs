//! Property-based test generators using proptest.
//!
//! Operations draw keys from deliberately small ranges so that random
//! sequences exercise duplicate keys, unique-index conflicts, and
//! modify-induced resorts rather than degenerate all-distinct workloads.

use proptest::prelude::*;

/// One step of a randomized multi-index workload.
#[derive(Debug, Clone)]
pub enum SetOperation {
    /// Insert an order with this ID and fee.
    Insert {
        /// Candidate unique key.
        id: u64,
        /// Candidate non-unique key.
        fee: i64,
    },
    /// Erase by unique ID.
    EraseId {
        /// Key to erase.
        id: u64,
    },
    /// Erase every order with this fee.
    EraseFee {
        /// Non-unique key to erase.
        fee: i64,
    },
    /// Modify the fee of the order with this ID.
    ModifyFee {
        /// Unique key of the order to edit.
        id: u64,
        /// New fee value.
        fee: i64,
    },
    /// Point lookup by unique ID.
    Find {
        /// Key to look up.
        id: u64,
    },
}

/// Strategy for a single operation.
pub fn operation_strategy() -> impl Strategy<Value = SetOperation> {
    let id = 0u64..48;
    let fee = -8i64..8;
    prop_oneof![
        4 => (id.clone(), fee.clone()).prop_map(|(id, fee)| SetOperation::Insert { id, fee }),
        2 => id.clone().prop_map(|id| SetOperation::EraseId { id }),
        1 => fee.clone().prop_map(|fee| SetOperation::EraseFee { fee }),
        2 => (id.clone(), fee).prop_map(|(id, fee)| SetOperation::ModifyFee { id, fee }),
        1 => id.prop_map(|id| SetOperation::Find { id }),
    ]
}

/// Strategy for a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<SetOperation>> {
    prop::collection::vec(operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn operations_stay_in_key_range(op in operation_strategy()) {
            match op {
                SetOperation::Insert { id, fee } | SetOperation::ModifyFee { id, fee } => {
                    prop_assert!(id < 48);
                    prop_assert!((-8..8).contains(&fee));
                }
                SetOperation::EraseId { id } | SetOperation::Find { id } => prop_assert!(id < 48),
                SetOperation::EraseFee { fee } => prop_assert!((-8..8).contains(&fee)),
            }
        }

        #[test]
        fn sequences_respect_length_bounds(ops in operation_sequence_strategy(5, 20)) {
            prop_assert!(ops.len() >= 5 && ops.len() < 20);
        }
    }
}
