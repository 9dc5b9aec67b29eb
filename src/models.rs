//! Public Twine models.
//!
//! Models are the primary public interface of this crate.
//!
//! # Model structure
//!
//! Each domain module owns a core API that does the computation, and
//! [`twine_core::Model`] implementations are thin adapters that delegate to
//! it. The internal engine modules are not part of the public API; only the
//! types needed to call the core API are re-exported.

pub mod cosmology;
