//! Curve traits: what a piecewise curve stores at its nodes.
//!
//! A trait fixes the node-0 value, how each node is seeded, the interval
//! searched for it, and how a stored value converts into a discount factor.

use ql_core::{DiscountFactor, Real, Time};

/// Seed rate used for the first node.
const AVERAGE_RATE: Real = 0.05;

/// Largest absolute rate the bootstrap searches.
const MAX_RATE: Real = 1.0;

/// Node semantics of a piecewise curve.
///
/// `data` and `times` always hold the full node set; entries after `i` are
/// placeholders.  Node 0 sits at `t = 0`.
pub trait CurveTraits: std::fmt::Debug {
    /// Short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Value stored at node 0 before the bootstrap starts.
    fn initial_value(&self) -> Real;

    /// Starting point for the solve of node `i` (`i >= 1`).
    fn guess(&self, i: usize, data: &[Real], times: &[Time]) -> Real;

    /// Lower end of the search interval for node `i`.
    fn min_value_after(&self, i: usize, data: &[Real], times: &[Time]) -> Real;

    /// Upper end of the search interval for node `i`.
    fn max_value_after(&self, i: usize, data: &[Real], times: &[Time]) -> Real;

    /// Store a trial (or solved) value for node `i`.
    fn update_guess(&self, data: &mut [Real], value: Real, i: usize) {
        data[i] = value;
    }

    /// Convert a (possibly interpolated) value at time `t` to a discount
    /// factor.
    fn discount(&self, value: Real, t: Time) -> DiscountFactor;
}

/// Nodes are discount factors; node 0 is 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discount;

impl CurveTraits for Discount {
    fn name(&self) -> &'static str {
        "discount"
    }

    fn initial_value(&self) -> Real {
        1.0
    }

    fn guess(&self, i: usize, data: &[Real], times: &[Time]) -> Real {
        if i == 1 {
            (-AVERAGE_RATE * times[1]).exp()
        } else {
            data[i - 1]
        }
    }

    fn min_value_after(&self, i: usize, data: &[Real], times: &[Time]) -> Real {
        data[i - 1] * (-MAX_RATE * (times[i] - times[i - 1])).exp()
    }

    fn max_value_after(&self, i: usize, data: &[Real], times: &[Time]) -> Real {
        data[i - 1] * (MAX_RATE * (times[i] - times[i - 1])).exp()
    }

    fn discount(&self, value: Real, _t: Time) -> DiscountFactor {
        value
    }
}

/// Nodes are continuously-compounded zero rates; node 0 tracks node 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroYield;

impl CurveTraits for ZeroYield {
    fn name(&self) -> &'static str {
        "zero yield"
    }

    fn initial_value(&self) -> Real {
        AVERAGE_RATE
    }

    fn guess(&self, i: usize, data: &[Real], _times: &[Time]) -> Real {
        if i == 1 {
            AVERAGE_RATE
        } else {
            data[i - 1]
        }
    }

    fn min_value_after(&self, _i: usize, _data: &[Real], _times: &[Time]) -> Real {
        -MAX_RATE
    }

    fn max_value_after(&self, _i: usize, _data: &[Real], _times: &[Time]) -> Real {
        MAX_RATE
    }

    fn update_guess(&self, data: &mut [Real], value: Real, i: usize) {
        data[i] = value;
        if i == 1 {
            // the rate at t = 0 is not observable; extend the first segment flat
            data[0] = value;
        }
    }

    fn discount(&self, value: Real, t: Time) -> DiscountFactor {
        (-value * t).exp()
    }
}
