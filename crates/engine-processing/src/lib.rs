pub mod driver;
pub mod enricher;
pub mod fetch;
pub mod merger;
pub mod producer;

#[cfg(test)]
mod test_support;

pub use driver::{RunCounters, run_direct, run_via_genre, run_via_person};
pub use enricher::Enricher;
pub use merger::Merger;
pub use producer::Producer;
