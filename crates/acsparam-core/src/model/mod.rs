// ── Domain model ──
//
// The device parameter tree as the ACS reports it.

pub mod device;

pub use device::{DEVICE_ID_KEY, Device, Parameter, ParameterValue};
