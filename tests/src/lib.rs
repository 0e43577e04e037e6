//! # Tournament Platform Test Suite
//!
//! Unified test crate for behaviour that spans subsystems.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── bus_flows.rs            # publish → subscriber → standings + cache
//! │   ├── http_flows.rs           # routes, auth, rate limiting, error bodies
//! │   └── replay_equivalence.rs   # incremental updates == full recompute
//! └── benches/
//!     └── platform_benchmarks.rs  # hot paths: fold, rank, admit, resolve tags
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p tm-tests
//! cargo test -p tm-tests integration::http_flows
//! cargo bench -p tm-tests
//! ```

pub mod integration;
