// Page geometry: grid lookup and occupancy → page arithmetic.
// Everything here is pure and synchronous.

pub mod grid;
pub mod pages;
