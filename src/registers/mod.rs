//! Register definitions for the AX5043 radio
//! Generated from the AX5043 programming manual register tables

pub mod fifo;
pub mod modem;
pub mod synth;
pub mod system;

pub use fifo::*;
pub use modem::*;
pub use synth::*;
pub use system::*;
