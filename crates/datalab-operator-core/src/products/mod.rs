//! Product facades.
//!
//! Thin assembly code per product: each facade takes the product's
//! specification and populates [`confgen`](crate::confgen) schemas and
//! [`mounts`](crate::mounts) contributions. All rendering rules live in the
//! engines; the facades only decide which sections, fields and mounts a
//! product has.

pub mod package_manager;
pub mod workbench;
