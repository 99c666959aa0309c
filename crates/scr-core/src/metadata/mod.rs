//! # SCR Core Component Metadata
//!
//! Declarative descriptions of components as contributed by modules.
//!
//! - **[`component`]**: [`ComponentMetadata`], the descriptor of one component
//!   (name, implementation, references, provided capabilities, hooks).
//! - **[`reference`]**: [`ReferenceMetadata`] together with its
//!   [`Cardinality`] and [`ReferencePolicy`].
//! - **[`error`]**: [`ValidationError`](error::ValidationError).
//!
//! Metadata is mutable only while it is being built. Validation consumes the
//! builder and hands back an `Arc<ComponentMetadata>` shared by the registry
//! and the component holder for the rest of the component's life.
pub mod component;
pub mod error;
pub mod reference;

pub use component::ComponentMetadata;
pub use error::ValidationError;
pub use reference::{Cardinality, ReferenceMetadata, ReferencePolicy};
