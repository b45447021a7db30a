//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Apply polynomial coefficients to a value.
///
/// Coefficients are in ascending order, `coeffs[i]` multiplies `value^i`.
pub fn poly_val<T>(value: T, coeffs: &[T]) -> T
where
    T: Float
{
    // Horner's scheme from the highest order term down
    coeffs
        .iter()
        .rev()
        .fold(T::zero(), |acc, c| acc * value + *c)
}

/// Evaluate the first derivative of a polynomial with ascending order coefficients.
pub fn poly_deriv_val<T>(value: T, coeffs: &[T]) -> T
where
    T: Float
{
    let mut res = T::zero();

    for (i, c) in coeffs.iter().enumerate().skip(1).rev() {
        let order = T::from(i).unwrap_or_else(T::nan);
        res = res * value + order * *c;
    }

    res
}

/// Return `num` evenly spaced values over the closed interval `[start, stop]`.
///
/// A single value request returns the middle of the interval.
pub fn linspace<T>(start: T, stop: T, num: usize) -> Vec<T>
where
    T: Float
{
    match num {
        0 => Vec::new(),
        1 => vec![(start + stop) / (T::one() + T::one())],
        _ => {
            let last = T::from(num - 1).unwrap_or_else(T::nan);
            (0..num)
                .map(|i| {
                    let i_t = T::from(i).unwrap_or_else(T::nan);
                    lin_map((T::zero(), last), (start, stop), i_t)
                })
                .collect()
        }
    }
}
