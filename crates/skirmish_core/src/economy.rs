//! Credits and passive income.
//!
//! Credits are whole numbers. Both factions earn a fixed grant per fixed
//! interval; there is no harvesting.

use serde::{Deserialize, Serialize};

use crate::math::{fixed_serde, Fixed};

/// A faction's credit balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Treasury {
    /// Current credits.
    pub credits: i32,
}

impl Treasury {
    /// Create a treasury with a starting balance.
    #[must_use]
    pub const fn new(credits: i32) -> Self {
        Self { credits }
    }

    /// Add credits.
    pub fn deposit(&mut self, amount: i32) {
        self.credits = self.credits.saturating_add(amount);
    }

    /// Spend credits if available.
    ///
    /// Returns true if the transaction succeeded.
    pub fn spend(&mut self, amount: i32) -> bool {
        if self.credits >= amount {
            self.credits -= amount;
            true
        } else {
            false
        }
    }

    /// Check if a cost can be paid.
    #[must_use]
    pub const fn can_afford(&self, cost: i32) -> bool {
        self.credits >= cost
    }
}

/// Grants a fixed amount every interval.
///
/// Overshoot carries into the next interval, so income does not drift with
/// the tick length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeTimer {
    /// Time accumulated toward the next grant.
    #[serde(with = "fixed_serde")]
    pub elapsed: Fixed,
    /// Seconds between grants.
    #[serde(with = "fixed_serde")]
    pub interval: Fixed,
    /// Credits per grant.
    pub amount: i32,
}

impl IncomeTimer {
    /// Create a timer that starts empty.
    #[must_use]
    pub const fn new(interval: Fixed, amount: i32) -> Self {
        Self {
            elapsed: Fixed::ZERO,
            interval,
            amount,
        }
    }

    /// Advance by `dt` and pay out into `treasury`. Returns credits granted.
    pub fn advance(&mut self, dt: Fixed, treasury: &mut Treasury) -> i32 {
        self.elapsed += dt;
        if self.interval <= Fixed::ZERO || self.elapsed < self.interval {
            return 0;
        }
        self.elapsed -= self.interval;
        treasury.deposit(self.amount);
        self.amount
    }
}
