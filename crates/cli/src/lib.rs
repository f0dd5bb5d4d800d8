//! Plumbing shared by Kestrel command-line front ends.

pub mod config;
