#![warn(clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub use crate::{
    blorb::{Document, ResourceId, Substitution},
    config::Config,
    dump::{dump_listing, read_listing, Listing},
    errors::{CodecError, CompressionError, Error, FormatError},
    recompress::{Backend, Recompressor},
    transcode::{transcode, transcode_file},
};

pub mod blocks;
pub mod blorb;
pub mod build;
mod config;
mod dump;
mod errors;
pub mod extract;
pub mod index;
mod recompress;
pub mod resource;
pub mod substitute;
mod transcode;
