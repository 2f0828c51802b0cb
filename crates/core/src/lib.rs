#![deny(warnings)]

pub mod analyze;
pub mod broll;
pub mod classify;
pub mod config;
pub mod disappearance;
pub mod frames;
pub mod grouping;
pub mod media;
pub mod remote;
pub mod roles;
pub mod talking_head;
pub mod timecode;
pub mod util;
