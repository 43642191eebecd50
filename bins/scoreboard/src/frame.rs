/// One scoreboard update. `chk` binds `score` and `inning` together so a
/// reader can tell when it copied fields from two different updates.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Frame {
    pub score: i32,
    pub inning: i32,
    pub chk: i32,
    pub stamp_us: u64,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new(0, 1, 0)
    }
}

impl Frame {
    pub fn new(score: i32, inning: i32, stamp_us: u64) -> Self {
        Self {
            score,
            inning,
            chk: checksum(score, inning),
            stamp_us,
        }
    }

    /// The frame the board should show at wall time `t_ms`.
    pub fn at(t_ms: u64, stamp_us: u64) -> Self {
        Self::new(umpire_call(t_ms), inning_at(t_ms), stamp_us)
    }

    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.chk == checksum(self.score, self.inning)
    }

    /// Milliseconds since the frame was stamped; zero if the stamp is ahead.
    #[inline]
    pub fn age_ms(&self, now_us: u64) -> u64 {
        now_us.saturating_sub(self.stamp_us) / 1_000
    }
}

/// Runs called by the umpire, a pure function of wall time.
#[inline]
pub fn umpire_call(t_ms: u64) -> i32 {
    ((t_ms / 200) % 10) as i32
}

/// Innings cycle 1..=9, two seconds each.
#[inline]
pub fn inning_at(t_ms: u64) -> i32 {
    ((t_ms / 2_000) % 9) as i32 + 1
}

#[inline]
pub fn checksum(score: i32, inning: i32) -> i32 {
    (score * 31 + inning * 7) & 1023
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_matches_reference_values() {
        assert_eq!(checksum(0, 1), 7);
        assert_eq!(checksum(9, 9), (9 * 31 + 63) & 1023);
        assert_eq!(checksum(40, 1), (1240 + 7) & 1023);
    }

    #[test]
    fn call_and_inning_follow_wall_time() {
        assert_eq!(umpire_call(0), 0);
        assert_eq!(umpire_call(199), 0);
        assert_eq!(umpire_call(200), 1);
        assert_eq!(umpire_call(1_999), 9);
        assert_eq!(umpire_call(2_000), 0);

        assert_eq!(inning_at(0), 1);
        assert_eq!(inning_at(2_000), 2);
        assert_eq!(inning_at(17_999), 9);
        assert_eq!(inning_at(18_000), 1);
    }

    #[test]
    fn mixed_fields_fail_the_check() {
        let old = Frame::at(1_000, 1);
        let new = Frame::at(1_200, 2);
        assert!(old.is_consistent());
        assert!(new.is_consistent());

        // Checksum and inning from the new update, score from the old one.
        let torn = Frame {
            score: old.score,
            ..new
        };
        assert!(!torn.is_consistent());
    }

    #[test]
    fn age_saturates_for_future_stamps() {
        let f = Frame::new(1, 1, 5_000);
        assert_eq!(f.age_ms(12_500), 7);
        assert_eq!(f.age_ms(1_000), 0);
    }
}
