pub mod apal;
pub mod pict;
