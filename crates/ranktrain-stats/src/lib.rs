//! Statistical utilities shared by the ranktrain crates.
//!
//! This crate provides two small tools:
//!
//! - **Descriptive statistics**: count, max, mean and standard deviation of a set of values,
//!   used to summarize restart results and tree depths in the training logs.
//! - **Sum of squares**: a streaming accumulator of count, sum and squared sum, used by the
//!   random forest split search to compute variance reduction without a second pass.
//!
//! # Modules
//!
//! - [`descriptive`]: Descriptive statistics for summarizing datasets
//! - [`moments`]: Streaming first and second moments
//!
//! # Examples
//!
//! ## Computing descriptive statistics
//!
//! ```
//! use ranktrain_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! ```
//!
//! ## Accumulating a sum of squared deviations
//!
//! ```
//! use ranktrain_stats::moments::SumOfSquares;
//!
//! let acc: SumOfSquares = [1.0, 2.0, 3.0].into_iter().collect();
//! assert_eq!(acc.mean(), Some(2.0));
//! assert!((acc.squared_error() - 2.0).abs() < 1e-12);
//! ```

pub mod descriptive;
pub mod moments;
