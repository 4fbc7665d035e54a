//! Dotted-decimal IPv4 <-> 32-bit integer key conversion

use std::net::Ipv4Addr;

use crate::geo::error::{GeoError, GeoResult};

/// Convert a dotted-decimal IPv4 string into its big-endian integer key.
///
/// Empty input yields `0`. Each octet is reduced modulo 256 before it is
/// weighted, so `"1.2.3.260"` and `"1.2.3.4"` map to the same key.
pub fn parse_ipv4(input: &str) -> GeoResult<u32> {
    if input.is_empty() {
        return Ok(0);
    }

    let octets: Vec<&str> = input.split('.').collect();
    if octets.len() != 4 {
        return Err(GeoError::MalformedAddress {
            input: input.to_string(),
            reason: format!("expected 4 octets, found {}", octets.len()),
        });
    }

    let mut key: u32 = 0;
    for (index, octet) in octets.iter().enumerate().rev() {
        let value = octet
            .parse::<u64>()
            .map_err(|e| GeoError::MalformedAddress {
                input: input.to_string(),
                reason: format!("octet {} '{}': {}", index, octet, e),
            })?;
        let weight = 256u32.pow(3 - index as u32);
        key += (value % 256) as u32 * weight;
    }

    Ok(key)
}

/// Render an integer key back into dotted-decimal notation.
pub fn format_ipv4(key: u32) -> String {
    Ipv4Addr::from(key).to_string()
}
