//! # Built-in Verbs
//!
//! Verbs shipped inside the binary. `builtin` holds the `help` and `package`
//! verbs synthesized for every verbspace; the other modules are native units
//! that register into one command's verbspace, listed in [`NATIVE_UNITS`].

use crate::core::finder::NativeUnit;

/// `help` and `package`.
pub mod builtin;
/// The `config` verb of `volt`.
pub mod config;

/// Every native unit, in load order.
static NATIVE_UNITS: &[NativeUnit] = &[NativeUnit {
    command: "volt",
    origin: "builtin:volt/config",
    register: config::register,
}];

/// Every native unit, in load order.
pub fn native_units() -> &'static [NativeUnit] {
    NATIVE_UNITS
}
