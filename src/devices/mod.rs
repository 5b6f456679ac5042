// MIT License - Copyright (c) 2026 Peter Wright

//! Decoders and models for the things a central unit reports on: sections
//! and peripheral devices.

pub mod device;
pub mod section;
