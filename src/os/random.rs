use crate::err::*;

/// Fill `buf` with bytes from the kernel's cryptographically secure source
///
/// Blocks until the entropy pool is initialised.  Short fills (large requests interrupted by a
/// signal) are continued until the whole buffer is written, so a successful return never leaves
/// part of the buffer untouched.
pub fn fill_random(buf: &mut [u8]) -> Result<(), ErrorKind> {
    let mut rest = buf;
    while !rest.is_empty() {
        match unsafe { crate::syscall::getrandom(rest, 0) } {
            Ok(n) => {
                let filled = core::mem::take(&mut rest);
                rest = filled.get_mut(n..).unwrap_or_default();
            }
            Err(Errno::EINTR) => continue,
            // Only possible with bad flags or a bad pointer, neither of which this function can
            // produce.
            Err(Errno::EINVAL) | Err(Errno::EFAULT) => {
                unreachable!("getrandom rejected its arguments")
            }
            Err(_) => return Err(ErrorKind::Unexpected),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_random_lengths() {
        for len in [0usize, 1, 4095, 4096, 4097] {
            let mut buf = std::vec![0u8; len];
            match fill_random(&mut buf) {
                Ok(()) => {}
                Err(e) => assert_eq!(e, ErrorKind::Unexpected),
            }
        }
    }

    #[test]
    fn test_fill_random_touches_whole_buffer() {
        // The odds of 64 random bytes at the tail all coming back zero are negligible.
        let mut buf = [0u8; 4097];
        fill_random(&mut buf).unwrap();
        assert!(buf[4033..].iter().any(|&b| b != 0));
        assert!(buf[..64].iter().any(|&b| b != 0));
    }
}
