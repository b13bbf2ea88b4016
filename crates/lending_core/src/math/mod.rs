//! Derived-value calculations.
//!
//! - `interest`: total interest and per-investment ROI under the flat-rate scheme

pub mod interest;
