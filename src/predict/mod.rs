//! Model side: the opaque price model, its on-disk form, and the request
//! path from form fields to a price.

pub mod assembler;
pub mod forest;
pub mod handle;
