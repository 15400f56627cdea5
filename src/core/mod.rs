// src/core/mod.rs

pub mod bundle;
pub mod compiler;
pub mod config;
/// Process environment resolved at startup.
pub mod environment;
/// Discovery and loading of verb units.
pub mod finder;
/// Step template expansion.
pub mod interpolator;
/// Java command lines.
pub mod java;
pub mod namespace;
pub mod packager;
pub mod runner;
pub mod utility;
pub mod verbspace;
