//! Entity models and fixture graphs for fixture-upper tests and benchmarks.
//!
//! Provides the blog schema (`Author`, `Article`, `Draft`, `CoWrite`), the
//! relation-shape schema (`A` to `E`) and a seeded generator that fills a
//! registry with a random, acyclic fixture graph.
//!
//! # Example
//!
//! ```rust
//! use test_models::{blog_registry, Populator, Scale};
//!
//! let registry = blog_registry(1);
//! let counts = Populator::new(42, Scale::Small).populate(&registry).unwrap();
//! assert!(counts.total() > 0);
//! ```

pub mod fake;
pub mod models;
pub mod populate;

pub use models::{blog_model, blog_namespace, blog_registry, shapes_model, BLOG_TYPES};
pub use populate::{Population, Populator, Scale};
