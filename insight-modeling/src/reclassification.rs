//! Net reclassification improvement (NRI) and integrated discrimination
//! improvement (IDI) between two risk models on the same subjects.
//!
//! Category-free (continuous) NRI: only the direction of each subject's risk
//! change counts. Subjects with a non-finite prediction on either side are
//! left out. If either outcome class is empty both measures are 0.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reclassification {
    pub nri: f64,
    pub idi: f64,
}

#[derive(Default)]
struct ClassTally {
    n: usize,
    up: usize,
    down: usize,
    diff_sum: f64,
}

impl ClassTally {
    fn add(&mut self, old: f64, new: f64) {
        self.n += 1;
        if new > old {
            self.up += 1;
        } else if new < old {
            self.down += 1;
        }
        self.diff_sum += new - old;
    }

    fn mean_diff(&self) -> f64 {
        self.diff_sum / self.n as f64
    }
}

/// Compare `p_new` against `p_old` given observed outcomes `y_true` (1 = event).
///
/// Sequences are walked up to the shortest length.
pub fn calculate(y_true: &[u8], p_old: &[f64], p_new: &[f64]) -> Reclassification {
    let mut events = ClassTally::default();
    let mut non_events = ClassTally::default();

    for ((&y, &old), &new) in y_true.iter().zip(p_old).zip(p_new) {
        if !old.is_finite() || !new.is_finite() {
            continue;
        }
        if y == 1 {
            events.add(old, new);
        } else {
            non_events.add(old, new);
        }
    }

    if events.n == 0 || non_events.n == 0 {
        return Reclassification::default();
    }

    let nri_event = (events.up as f64 - events.down as f64) / events.n as f64;
    let nri_non_event = (non_events.down as f64 - non_events.up as f64) / non_events.n as f64;

    Reclassification {
        nri: nri_event + nri_non_event,
        idi: events.mean_diff() - non_events.mean_diff(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_both_classes_improve() {
        // Event risk rises, non-event risk falls: perfect reclassification
        let r = calculate(&[1, 0], &[0.2, 0.8], &[0.8, 0.2]);
        assert!(close(r.nri, 2.0));
        assert!(close(r.idi, 1.2));
    }

    #[test]
    fn test_gain_on_events_cancelled_by_loss_on_non_events() {
        let r = calculate(&[1, 0], &[0.2, 0.2], &[0.8, 0.8]);
        assert!(close(r.nri, 0.0));
        assert!(close(r.idi, 0.0));
    }

    #[test]
    fn test_empty_event_class_is_zero() {
        let r = calculate(&[0, 0], &[0.1, 0.4], &[0.3, 0.2]);
        assert_eq!(r, Reclassification { nri: 0.0, idi: 0.0 });
    }

    #[test]
    fn test_non_finite_predictions_are_left_out() {
        let r = calculate(
            &[1, 1, 0, 0],
            &[0.2, f64::NAN, 0.8, 0.5],
            &[0.8, 0.4, 0.2, f64::INFINITY],
        );
        assert!(close(r.nri, 2.0));
        assert!(close(r.idi, 1.2));
    }

    #[test]
    fn test_all_non_finite_is_zero() {
        let r = calculate(&[1, 0], &[f64::NAN, 0.3], &[0.5, f64::NAN]);
        assert_eq!(r, Reclassification::default());
    }

    #[test]
    fn test_empty_input_is_zero() {
        assert_eq!(calculate(&[], &[], &[]), Reclassification::default());
    }

    #[test]
    fn test_ties_count_as_neither() {
        let r = calculate(&[1, 1, 0, 0], &[0.5, 0.5, 0.5, 0.5], &[0.5, 0.7, 0.5, 0.3]);
        // events: 1 up of 2, non-events: 1 down of 2
        assert!(close(r.nri, 1.0));
        assert!(close(r.idi, 0.1 - (-0.1)));
    }
}
