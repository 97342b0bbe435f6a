//! Test fixtures: a realistic element type and prebuilt index sets.

use plextree_core::{IndexHandle, MultiIndexSet};

/// A trading-order element used across the test suites.
///
/// Gives each index policy something to bite on: a unique numeric key, a
/// non-unique string key, and a non-unique numeric key that tests mutate
/// through `modify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Unique order ID.
    pub id: u64,
    /// Owning account name (non-unique).
    pub account: String,
    /// Fee in base units (non-unique, frequently modified).
    pub fee: i64,
}

/// Builds an [`Order`].
#[must_use]
pub fn order(id: u64, account: &str, fee: i64) -> Order {
    Order {
        id,
        account: account.to_string(),
        fee,
    }
}

/// A three-index order book: unique by ID, non-unique by account and fee.
pub struct OrderBook {
    /// The set under test.
    pub set: MultiIndexSet<Order>,
    /// Unique index on [`Order::id`].
    pub by_id: IndexHandle<Order, u64>,
    /// Non-unique index on [`Order::account`].
    pub by_account: IndexHandle<Order, String>,
    /// Non-unique index on [`Order::fee`].
    pub by_fee: IndexHandle<Order, i64>,
}

/// Builds an empty three-index order book.
#[must_use]
pub fn order_book() -> OrderBook {
    let mut builder = MultiIndexSet::builder();
    let by_id = builder
        .ordered_unique("id", |o: &Order| o.id)
        .expect("fresh builder");
    let by_account = builder
        .ordered_non_unique("account", |o: &Order| o.account.clone())
        .expect("fresh builder");
    let by_fee = builder
        .ordered_non_unique("fee", |o: &Order| o.fee)
        .expect("fresh builder");
    OrderBook {
        set: builder.build().expect("at least one index declared"),
        by_id,
        by_account,
        by_fee,
    }
}
