//! Query construction: join specifications and statement building.

pub mod builder;
pub mod join;

pub use builder::{
    build_create_if_absent, build_insert_head, build_select, validate_bare_identifier,
    validate_identifier, Query, SelectSource,
};
pub use join::JoinSpec;
