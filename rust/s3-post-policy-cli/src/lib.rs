//! Support code for the `gen-policy` binary.
//!
//! [`cli`] parses the command line and [`form`] turns an upload request into
//! the signed fields of a browser upload form.

pub mod cli;
pub mod form;
