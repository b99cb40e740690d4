//! Declarative configuration and resource-composition engine for the
//! Datalab product operators.
//!
//! The reconciliation loops feed a product specification into this crate and
//! get back two kinds of artifacts:
//!
//! - rendered configuration file texts, keyed by logical file name
//!   ([`confgen`], [`products`]),
//! - the volume, volume-mount and environment wiring the product containers
//!   need to receive configuration, secrets and storage ([`mounts`]).
//!
//! Everything in here is a pure, synchronous transformation over values
//! constructed fresh per rendering pass. No cluster I/O happens in this
//! crate; turning the outputs into Kubernetes objects is the job of the
//! surrounding operators.

pub mod confgen;
pub mod mounts;
pub mod products;
pub mod profiles;
pub mod quantity;

// External re-exports
pub use k8s_openapi;
