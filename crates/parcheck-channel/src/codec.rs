//! Binary frame carrying one payload across a byte boundary.
//!
//! ```text
//! frame := count:i32 entry{count}
//! entry := state:i32 colors
//! ```
//!
//! Integers are big-endian; `colors` is whatever the solver's
//! [`Solver::put_colors`] writes.

use crate::{ChannelError, ChannelResult};
use parcheck_map::State;
use parcheck_params::wire::{get_i32, put_i32};
use parcheck_params::Solver;

const HEADER_BYTES: usize = 4;

/// Encoded size of a frame holding `entries`.
pub fn frame_size<S: Solver>(solver: &S, entries: &[(State, S::Params)]) -> usize {
    HEADER_BYTES
        + entries
            .iter()
            .map(|(_, p)| 4 + solver.byte_size(p))
            .sum::<usize>()
}

/// Encode `entries` into a fresh frame.
pub fn encode_frame<S: Solver>(solver: &S, entries: &[(State, S::Params)]) -> ChannelResult<Vec<u8>> {
    let count = i32::try_from(entries.len())
        .map_err(|_| ChannelError::Frame(format!("{} entries do not fit a frame", entries.len())))?;
    let mut buf = Vec::with_capacity(frame_size(solver, entries));
    put_i32(&mut buf, count);
    for (state, colors) in entries {
        let wire_state = i32::try_from(*state).map_err(|_| ChannelError::StateTooLarge { state: *state })?;
        put_i32(&mut buf, wire_state);
        solver.put_colors(&mut buf, colors);
    }
    Ok(buf)
}

/// Decode a whole frame. Trailing bytes are an error.
pub fn decode_frame<S: Solver>(solver: &S, frame: &[u8]) -> ChannelResult<Vec<(State, S::Params)>> {
    let mut buf = frame;
    let count = get_i32(&mut buf)?;
    let count = usize::try_from(count).map_err(|_| ChannelError::Frame(format!("negative entry count {count}")))?;
    // Every entry takes at least its state header.
    if count > buf.len() / 4 {
        return Err(ChannelError::Frame(format!(
            "{count} entries cannot fit in {} bytes",
            buf.len()
        )));
    }
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let state = get_i32(&mut buf)?;
        let state = usize::try_from(state).map_err(|_| ChannelError::Frame(format!("negative state {state}")))?;
        let colors = solver.get_colors(&mut buf)?;
        entries.push((state, colors));
    }
    if !buf.is_empty() {
        return Err(ChannelError::Frame(format!("{} trailing bytes", buf.len())));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcheck_params::{BoolSolver, ExplicitSolver};

    #[test]
    fn test_frame_layout() {
        let solver = BoolSolver::new();
        let frame = encode_frame(&solver, &[(1, true), (258, false)]).unwrap();
        assert_eq!(frame, vec![0, 0, 0, 2, 0, 0, 0, 1, 1, 0, 0, 1, 2, 0]);
        assert_eq!(frame.len(), frame_size(&solver, &[(1, true), (258, false)]));
        assert_eq!(decode_frame(&solver, &frame).unwrap(), vec![(1, true), (258, false)]);
    }

    #[test]
    fn test_empty_frame() {
        let solver = ExplicitSolver::new(3);
        let frame = encode_frame(&solver, &[]).unwrap();
        assert_eq!(frame, vec![0, 0, 0, 0]);
        assert!(decode_frame(&solver, &frame).unwrap().is_empty());
    }

    #[test]
    fn test_explicit_colors_round_trip() {
        let solver = ExplicitSolver::new(70);
        let entries = vec![(0, solver.colors(&[0, 69])), (5, solver.range(3..40))];
        let frame = encode_frame(&solver, &entries).unwrap();
        let back = decode_frame(&solver, &frame).unwrap();
        assert_eq!(back.len(), 2);
        for ((s1, p1), (s2, p2)) in entries.iter().zip(&back) {
            assert_eq!(s1, s2);
            assert!(solver.equal(p1, p2));
        }
    }

    #[test]
    fn test_state_too_large() {
        let solver = BoolSolver::new();
        let huge = i32::MAX as usize + 1;
        assert!(matches!(
            encode_frame(&solver, &[(huge, true)]),
            Err(ChannelError::StateTooLarge { state }) if state == huge
        ));
    }

    #[test]
    fn test_malformed_frames() {
        let solver = BoolSolver::new();
        // Truncated header.
        assert!(matches!(decode_frame(&solver, &[0, 0]), Err(ChannelError::Algebra(_))));
        // Negative count.
        assert!(matches!(
            decode_frame(&solver, &[0xff, 0xff, 0xff, 0xff]),
            Err(ChannelError::Frame(_))
        ));
        // Count larger than the body.
        assert!(matches!(decode_frame(&solver, &[0, 0, 0, 9, 0]), Err(ChannelError::Frame(_))));
        // Negative state.
        assert!(matches!(
            decode_frame(&solver, &[0, 0, 0, 1, 0xff, 0, 0, 0, 1]),
            Err(ChannelError::Frame(_))
        ));
        // Trailing bytes.
        assert!(matches!(
            decode_frame(&solver, &[0, 0, 0, 1, 0, 0, 0, 0, 1, 7]),
            Err(ChannelError::Frame(_))
        ));
        // Invalid colors.
        assert!(matches!(
            decode_frame(&solver, &[0, 0, 0, 1, 0, 0, 0, 0, 2]),
            Err(ChannelError::Algebra(_))
        ));
    }
}
