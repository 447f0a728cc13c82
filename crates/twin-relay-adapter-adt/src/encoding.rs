//! Twin-id path encoding.
//!
//! Twin ids travel as URL path segments of the store API. They are
//! percent-encoded, and the path must match the stored id exactly once
//! decoded (ids are case-sensitive).

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters that must be percent-encoded in a twin-id path segment.
const TWIN_ID_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\');

/// Percent-encode a twin id for use as a URL path segment.
///
/// # Examples
///
/// ```
/// use twin_relay_adapter_adt::encode_twin_id;
///
/// assert_eq!(encode_twin_id("GenericSensor04"), "GenericSensor04");
/// assert_eq!(encode_twin_id("plant a/line 1"), "plant%20a%2Fline%201");
/// ```
#[must_use]
pub fn encode_twin_id(twin_id: &str) -> String {
    utf8_percent_encode(twin_id, TWIN_ID_ESCAPE).to_string()
}
