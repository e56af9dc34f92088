/// Image pipeline module
///
/// This module handles:
/// - Validating and loading picked images (capture.rs)
/// - Applying edit actions to pixels (transform.rs)
/// - Decoding/encoding payloads (encode.rs)

pub mod capture;
pub mod encode;
pub mod transform;
