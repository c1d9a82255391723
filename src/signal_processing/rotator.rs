use crate::error::CorrectFailure;

/// Half swap: moves the buffer center to index 0.
///
/// Every forward transform is preceded by this so the phase reference sits at
/// sample zero.
pub fn rotate<T>(buffer: &mut [T]) {
    let half = buffer.len() / 2;
    buffer.rotate_left(half);
}

/// Rotate right so the crest at `crest_offset` lands on `len / 2`.
///
/// A crest already on the center is left alone. A crest right of the center
/// cannot be moved there without wrapping the pulse head, so the buffer is
/// left untouched and an error returned.
pub fn symmetrize<T>(buffer: &mut [T], crest_offset: usize) -> Result<(), CorrectFailure> {
    let center = buffer.len() / 2;
    if crest_offset > center {
        return Err(CorrectFailure::Symmetrize {
            crest_offset,
            center,
        });
    }
    buffer.rotate_right(center - crest_offset);
    Ok(())
}
