//! Helpers for object paths and property maps.

pub(crate) mod paths;
pub(crate) mod props;
