/// Linearly interpolates from `init_val` at step `start` to `final_val` at
/// step `finish`, clamping outside that range. When `start >= finish` the
/// value jumps from `init_val` to `final_val` right after `start`.
pub fn linear_interpolation(
    init_val: f64,
    final_val: f64,
    start: f64,
    finish: f64,
    current: f64,
) -> f64 {
    if current <= start {
        init_val
    } else if current >= finish {
        final_val
    } else {
        // Here start < current < finish, so the span is positive.
        (final_val - init_val) * (current - start) / (finish - start) + init_val
    }
}

/// Step-indexed KL weight schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KlAnneal {
    pub init_val: f64,
    pub final_val: f64,
    pub start: u64,
    pub finish: u64,
}

impl KlAnneal {
    /// Ramps from 0 to 1 over `[0, 2 * bias]`, crossing 0.5 at step `bias`.
    pub fn centered(bias: u64) -> Self {
        KlAnneal {
            init_val: 0.0,
            final_val: 1.0,
            start: 0,
            finish: bias.saturating_mul(2),
        }
    }

    pub fn weight(&self, step: u64) -> f64 {
        linear_interpolation(
            self.init_val,
            self.final_val,
            self.start as f64,
            self.finish as f64,
            step as f64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_at_boundaries() {
        assert_eq!(linear_interpolation(0.1, 0.9, 10.0, 20.0, 10.0), 0.1);
        assert_eq!(linear_interpolation(0.1, 0.9, 10.0, 20.0, 20.0), 0.9);
        assert_eq!(linear_interpolation(0.1, 0.9, 10.0, 20.0, -5.0), 0.1);
        assert_eq!(linear_interpolation(0.1, 0.9, 10.0, 20.0, 1e9), 0.9);
    }

    #[test]
    fn test_midpoint() {
        assert_eq!(linear_interpolation(0.0, 1.0, 0.0, 10.0, 5.0), 0.5);
        assert_eq!(linear_interpolation(2.0, 4.0, 100.0, 200.0, 125.0), 2.5);
    }

    #[test]
    fn test_monotonic_in_current_step() {
        let mut prev = f64::NEG_INFINITY;
        for step in 0..=300 {
            let v = linear_interpolation(0.25, 3.0, 50.0, 250.0, step as f64);
            assert!(v >= prev, "step {step}: {v} < {prev}");
            prev = v;
        }
    }

    #[test]
    fn test_decreasing_schedule() {
        assert_eq!(linear_interpolation(1.0, 0.0, 0.0, 4.0, 1.0), 0.75);
    }

    #[test]
    fn test_equal_steps_jump() {
        assert_eq!(linear_interpolation(0.0, 1.0, 7.0, 7.0, 6.0), 0.0);
        assert_eq!(linear_interpolation(0.0, 1.0, 7.0, 7.0, 7.0), 0.0);
        let v = linear_interpolation(0.0, 1.0, 7.0, 7.0, 7.5);
        assert_eq!(v, 1.0);
        assert!(v.is_finite());
    }

    #[test]
    fn test_centered_kl_anneal() {
        let anneal = KlAnneal::centered(3500);
        assert_eq!(anneal.weight(0), 0.0);
        assert_eq!(anneal.weight(3500), 0.5);
        assert_eq!(anneal.weight(7000), 1.0);
        assert_eq!(anneal.weight(u64::MAX), 1.0);
    }

    #[test]
    fn test_zero_bias_is_immediate() {
        let anneal = KlAnneal::centered(0);
        assert_eq!(anneal.weight(0), 0.0);
        assert_eq!(anneal.weight(1), 1.0);
    }
}
