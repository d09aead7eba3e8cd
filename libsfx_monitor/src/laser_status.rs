use super::event::EventCodeSet;

/// Reports the optical pump laser state for a frame from its event codes.
///
/// The laser is considered on only when every configured laser-on code is
/// present in the frame's event-code set. With no codes configured the laser
/// is reported as always off. This is auxiliary bookkeeping for tagging
/// frames, not a correctness-critical path, so it never fails: anything that
/// cannot be classified is reported as off.
#[derive(Debug, Clone, Default)]
pub struct LaserStatusClassifier {
    laser_on_event_codes: Option<Vec<u32>>,
}

impl LaserStatusClassifier {
    pub fn new(laser_on_event_codes: Option<Vec<u32>>) -> Self {
        Self {
            laser_on_event_codes,
        }
    }

    /// True iff all configured laser-on codes are present in the event.
    pub fn is_on(&self, event_codes: &EventCodeSet) -> bool {
        match &self.laser_on_event_codes {
            Some(codes) if !codes.is_empty() => {
                codes.iter().all(|code| event_codes.contains(code))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_set(codes: &[u32]) -> EventCodeSet {
        codes.iter().copied().collect()
    }

    #[test]
    fn test_all_codes_present() {
        let classifier = LaserStatusClassifier::new(Some(vec![1, 2]));
        assert!(classifier.is_on(&code_set(&[1, 2, 3])));
    }

    #[test]
    fn test_missing_code_is_off() {
        let classifier = LaserStatusClassifier::new(Some(vec![1, 2]));
        assert!(!classifier.is_on(&code_set(&[1])));
        assert!(!classifier.is_on(&code_set(&[])));
    }

    #[test]
    fn test_unconfigured_is_always_off() {
        let classifier = LaserStatusClassifier::new(None);
        assert!(!classifier.is_on(&code_set(&[1, 2, 3])));
        assert!(!classifier.is_on(&code_set(&[])));
    }

    #[test]
    fn test_empty_configuration_is_always_off() {
        let classifier = LaserStatusClassifier::new(Some(Vec::new()));
        assert!(!classifier.is_on(&code_set(&[1, 2, 3])));
    }
}
