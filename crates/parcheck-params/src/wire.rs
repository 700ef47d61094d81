//! Big-endian primitives shared by the color encodings and the channel frames.

use crate::{AlgebraError, AlgebraResult};

#[inline]
pub fn put_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

#[inline]
pub fn put_i32(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

#[inline]
pub fn put_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Split `N` bytes off the front of `buf`.
fn take<const N: usize>(buf: &mut &[u8], what: &str) -> AlgebraResult<[u8; N]> {
    if buf.len() < N {
        return Err(AlgebraError::Decode(format!(
            "truncated {what}: need {N} bytes, have {}",
            buf.len()
        )));
    }
    let (head, rest) = buf.split_at(N);
    *buf = rest;
    let mut out = [0u8; N];
    out.copy_from_slice(head);
    Ok(out)
}

pub fn get_u8(buf: &mut &[u8]) -> AlgebraResult<u8> {
    Ok(take::<1>(buf, "u8")?[0])
}

pub fn get_i32(buf: &mut &[u8]) -> AlgebraResult<i32> {
    Ok(i32::from_be_bytes(take::<4>(buf, "i32")?))
}

pub fn get_u64(buf: &mut &[u8]) -> AlgebraResult<u64> {
    Ok(u64::from_be_bytes(take::<8>(buf, "u64")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitives_advance_cursor() {
        let mut buf = Vec::new();
        put_i32(&mut buf, -7);
        put_u64(&mut buf, 0xdead_beef);
        put_u8(&mut buf, 3);

        let mut cursor = buf.as_slice();
        assert_eq!(get_i32(&mut cursor).unwrap(), -7);
        assert_eq!(get_u64(&mut cursor).unwrap(), 0xdead_beef);
        assert_eq!(get_u8(&mut cursor).unwrap(), 3);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_truncated_input() {
        let mut cursor: &[u8] = &[0, 1];
        assert!(matches!(get_i32(&mut cursor), Err(AlgebraError::Decode(_))));
    }
}
