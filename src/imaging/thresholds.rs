// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The geometric threshold schedule that bounds masking and cleaning in each
//! minor cycle.

use serde::{Deserialize, Serialize};

/// The per-run constants controlling how mask and clean thresholds decay with
/// the minor-cycle index.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdSchedule {
    /// The mask-threshold decay constant ("c0").
    pub mask_decay: f64,

    /// The ratio between the mask threshold and the clean-noise threshold
    /// ("c1").
    pub mask_to_clean_ratio: f64,
}

impl ThresholdSchedule {
    /// The threshold used to generate the clean mask for minor cycle `cycle`:
    /// `image_max / (c0 * (1 + cycle))`. Strictly decreasing in `cycle` and
    /// positive whenever `image_max` is.
    pub fn mask_threshold(self, image_max: f64, cycle: usize) -> f64 {
        image_max / (self.mask_decay * (1 + cycle) as f64)
    }

    /// The clean-noise threshold for minor cycle `cycle`: the mask threshold
    /// divided by `c1`.
    pub fn clean_noise_threshold(self, image_max: f64, cycle: usize) -> f64 {
        self.mask_threshold(image_max, cycle) / self.mask_to_clean_ratio
    }

    /// The cutoff actually handed to the deconvolution routine. Cleaning never
    /// goes below `noise_floor`, no matter what the geometric schedule
    /// suggests.
    pub fn clean_cutoff(self, image_max: f64, cycle: usize, noise_floor: f64) -> f64 {
        self.clean_noise_threshold(image_max, cycle).max(noise_floor)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn mask_threshold_decreases_with_cycle_and_stays_positive() {
        let schedule = ThresholdSchedule {
            mask_decay: 1.5,
            mask_to_clean_ratio: 3.0,
        };
        let image_max = 2.3;
        let mut last = f64::INFINITY;
        for cycle in 0..20 {
            let t = schedule.mask_threshold(image_max, cycle);
            assert!(t > 0.0, "cycle {cycle} produced non-positive threshold {t}");
            assert!(t < last, "cycle {cycle} did not decrease: {t} >= {last}");
            last = t;
        }
    }

    #[test]
    fn clean_noise_threshold_is_mask_threshold_over_ratio() {
        let schedule = ThresholdSchedule {
            mask_decay: 2.0,
            mask_to_clean_ratio: 4.0,
        };
        for cycle in 0..10 {
            let mask = schedule.mask_threshold(1.7, cycle);
            let clean = schedule.clean_noise_threshold(1.7, cycle);
            assert_abs_diff_eq!(clean, mask / 4.0);
            // With a ratio > 1, cleaning always goes deeper than masking.
            assert!(clean < mask);
        }
    }

    #[test]
    fn known_values() {
        let schedule = ThresholdSchedule {
            mask_decay: 1.0,
            mask_to_clean_ratio: 2.0,
        };
        assert_abs_diff_eq!(schedule.mask_threshold(1.0, 0), 1.0);
        assert_abs_diff_eq!(schedule.clean_noise_threshold(1.0, 0), 0.5);
        assert_abs_diff_eq!(schedule.mask_threshold(1.0, 1), 0.5);
        assert_abs_diff_eq!(schedule.clean_noise_threshold(1.0, 1), 0.25);
    }

    #[test]
    fn cutoff_never_below_noise_floor() {
        let schedule = ThresholdSchedule {
            mask_decay: 1.0,
            mask_to_clean_ratio: 10.0,
        };
        let floor = 0.05;
        for cycle in 0..50 {
            for image_max in [1e-3, 0.1, 1.0, 100.0] {
                let cutoff = schedule.clean_cutoff(image_max, cycle, floor);
                assert!(cutoff >= floor);
            }
        }
        // Deep cycles on a faint image clamp exactly at the floor.
        assert_abs_diff_eq!(schedule.clean_cutoff(1e-3, 49, floor), floor);
    }
}
