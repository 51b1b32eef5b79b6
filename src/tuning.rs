use crate::config::Precision;

/// Divisor of the rounding bias added before the final right shift in
/// shift-scaled mode. The value was determined experimentally against real
/// hardware; do not change it without a frequency counter on the bench.
const ROUNDING_BIAS_DIVISOR: u32 = 16;

const PPB_SCALE: i64 = 1_000_000_000;

/// Calibration offsets the tuner refuses to adopt.
///
/// A rejected offset leaves the previous calibration in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
  /// The corrected clock collapsed to zero (offset at or beyond +10^9 ppb,
  /// or a clock too small to survive the scaling).
  ClockUnderflow,
  /// The corrected clock no longer fits in 32 bits (large negative offset on
  /// a clock already near the top of the range).
  ClockOverflow,
}

/// Frequency-to-tuning-word arithmetic for the DDS core.
///
/// Owns the calibrated reference clock and a cached reciprocal of it, so a
/// frequency change costs one widening multiply and a shift instead of a
/// full-width division. [`Tuner::set_calibration`] drops the cache; the next
/// word computation rebuilds it from the corrected clock.
#[derive(Debug, Clone)]
pub struct Tuner {
  nominal_hz: u32,
  effective_hz: u32,
  precision: Precision,
  reciprocal: Option<Reciprocal>,
}

impl Tuner {
  /// Create a tuner for the given reference oscillator.
  ///
  /// `reference_hz` is the DDS core clock, after the on-chip multiplier if it
  /// is enabled. Panics if it is zero.
  pub const fn new(reference_hz: u32, precision: Precision) -> Self {
    assert!(reference_hz > 0, "reference clock must be non-zero");
    Self { nominal_hz: reference_hz, effective_hz: reference_hz, precision, reciprocal: None }
  }

  /// Fold a measured frequency error into the reference clock.
  ///
  /// `ppb` is the output error in parts per billion, positive when the
  /// measured frequency is high and negative when it is low. The corrected
  /// clock becomes `nominal * (10^9 - ppb) / 10^9` and is returned.
  ///
  /// Every accepted call drops the cached reciprocal, including `ppb = 0`;
  /// the next word computation re-derives it from the corrected clock.
  pub fn set_calibration(&mut self, ppb: i32) -> Result<u32, CalibrationError> {
    let scale = PPB_SCALE - i64::from(ppb);
    if scale <= 0 {
      return Err(CalibrationError::ClockUnderflow);
    }
    // Both factors are below 2^32, so the product stays inside u64.
    let corrected = u64::from(self.nominal_hz) * scale as u64 / PPB_SCALE as u64;
    if corrected == 0 {
      return Err(CalibrationError::ClockUnderflow);
    }
    if corrected > u64::from(u32::MAX) {
      return Err(CalibrationError::ClockOverflow);
    }
    self.effective_hz = corrected as u32;
    self.reciprocal = None;
    Ok(self.effective_hz)
  }

  /// Tuning word for the requested output frequency.
  ///
  /// The reciprocal is derived on the first call after construction or after
  /// a calibration change and reused on every later call. `freq_hz` must stay
  /// below the effective clock; past it the 32-bit word wraps (debug builds
  /// assert).
  pub fn tuning_word(&mut self, freq_hz: u32) -> u32 {
    let clock = self.effective_hz;
    let precision = self.precision;
    self.reciprocal.get_or_insert_with(|| Reciprocal::new(clock, precision)).word(freq_hz)
  }

  /// Reference clock with the current calibration applied.
  pub const fn effective_clock(&self) -> u32 {
    self.effective_hz
  }

  /// Reference clock as configured, before calibration.
  pub const fn nominal_clock(&self) -> u32 {
    self.nominal_hz
  }
}

/// Cached fixed-point reciprocal of the effective clock.
///
/// Value and shift travel in one variant so a calibration change can never
/// pair a fresh reciprocal with a stale shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reciprocal {
  /// `(2^(32+shift) - 1) / clock` with `shift` the index of the clock's most
  /// significant bit. Normalizing per clock keeps the top bit of the 32-bit
  /// reciprocal set for every clock magnitude, so evaluation needs only a
  /// 32x32->64 widening multiply.
  ShiftScaled { reciprocal: u32, shift: u8 },
  /// `(2^64 - 1) / clock`, evaluated with a 64x32->128 multiply.
  Maximum { reciprocal: u64 },
}

impl Reciprocal {
  fn new(clock_hz: u32, precision: Precision) -> Self {
    debug_assert!(clock_hz > 0);
    match precision {
      Precision::ShiftScaled => {
        let shift = (31 - clock_hz.leading_zeros()) as u8;
        // The -1 keeps the quotient inside 32 bits when the clock is an
        // exact power of two; for every other clock it changes nothing.
        let reciprocal = (((1u64 << (32 + shift)) - 1) / u64::from(clock_hz)) as u32;
        Self::ShiftScaled { reciprocal, shift }
      }
      Precision::Maximum => Self::Maximum { reciprocal: u64::MAX / u64::from(clock_hz) },
    }
  }

  fn word(&self, freq_hz: u32) -> u32 {
    // Frequency 0 holds the output at a zero crossing; the bias term alone
    // would otherwise round the word up to 1.
    if freq_hz == 0 {
      return 0;
    }
    match *self {
      Self::ShiftScaled { reciprocal, shift } => {
        let bias = u64::from(reciprocal / ROUNDING_BIAS_DIVISOR);
        let word = (u64::from(freq_hz) * u64::from(reciprocal) + bias) >> shift;
        debug_assert!(word >> 32 == 0, "target frequency beyond the effective clock");
        word as u32
      }
      Self::Maximum { reciprocal } => {
        let word = (u128::from(freq_hz) * u128::from(reciprocal) + (1 << 31)) >> 32;
        debug_assert!(word >> 32 == 0, "target frequency beyond the effective clock");
        word as u32
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const REF_180MHZ: u32 = 180_000_000;

  // Frequencies spread over the usable range at 180 MHz, up to the Nyquist
  // half of the clock.
  const SWEEP: [u32; 9] = [1, 7, 440, 10_000, 1_000_000, 10_000_000, 44_100_000, 89_999_999, 90_000_000];

  fn recovered_hz(word: u32, clock: u32) -> u32 {
    ((u64::from(word) * u64::from(clock)) >> 32) as u32
  }

  // Distance between `word * clock` and the exact ratio `freq * 2^32`, i.e.
  // the word error scaled by the clock.
  fn residual(word: u32, clock: u32, freq: u32) -> u64 {
    (u64::from(word) * u64::from(clock)).abs_diff(u64::from(freq) << 32)
  }

  #[test]
  fn shift_normalizes_every_clock_magnitude() {
    let clocks = [1, 2, 3, 1_000, 32_768, 1_000_000, 30_000_000, 125_000_000, REF_180MHZ, 200_000_000, u32::MAX];
    for clock in clocks {
      match Reciprocal::new(clock, Precision::ShiftScaled) {
        Reciprocal::ShiftScaled { reciprocal, shift } => {
          let normalized = u64::from(clock) << (32 - shift);
          assert!(normalized >= 1 << 32, "clock {clock} under-normalized");
          assert!(normalized < 1 << 33, "clock {clock} over-normalized");
          // Normalization keeps the reciprocal's top bit set.
          assert!(reciprocal >= 1 << 31, "clock {clock} wastes reciprocal bits");
        }
        Reciprocal::Maximum { .. } => unreachable!(),
      }
    }
  }

  #[test]
  fn reciprocal_long_division_at_180mhz() {
    // 2^59 / 180e6 = 3_202_559_735 rem 3_423_488, msb of the clock at bit 27.
    assert_eq!(
      Reciprocal::new(REF_180MHZ, Precision::ShiftScaled),
      Reciprocal::ShiftScaled { reciprocal: 3_202_559_735, shift: 27 }
    );
    // (2^64 - 1) / 180e6 = 102_481_911_520.
    assert_eq!(Reciprocal::new(REF_180MHZ, Precision::Maximum), Reciprocal::Maximum { reciprocal: 102_481_911_520 });
  }

  #[test]
  fn power_of_two_clock_saturates_reciprocal() {
    let clock = 1 << 27;
    // 2^59 / 2^27 = 2^32 would wrap; the -1 in the dividend caps it at the
    // all-ones value one step below.
    let r = Reciprocal::new(clock, Precision::ShiftScaled);
    assert_eq!(r, Reciprocal::ShiftScaled { reciprocal: u32::MAX, shift: 27 });

    // Half the clock still lands on the accumulator midpoint, one bias count
    // high in shifted mode and exactly in maximum mode.
    assert_eq!(r.word(clock / 2), 2_147_483_649);
    assert_eq!(Reciprocal::new(clock, Precision::Maximum).word(clock / 2), 2_147_483_648);
  }

  #[test]
  fn zero_frequency_is_dc() {
    for precision in [Precision::ShiftScaled, Precision::Maximum] {
      let mut t = Tuner::new(REF_180MHZ, precision);
      assert_eq!(t.tuning_word(0), 0);
      t.set_calibration(-42).expect("small offset must be accepted");
      assert_eq!(t.tuning_word(0), 0);
    }
  }

  #[test]
  fn one_hertz_word_at_180mhz() {
    // Exact ratio 2^32 / 180e6 = 23.86. The shifted mode adds the bias
    // (3_202_559_735 / 16) >> 27 = 1.49 words before truncating, the maximum
    // mode rounds half-up on the raw product.
    let mut shifted = Tuner::new(REF_180MHZ, Precision::ShiftScaled);
    assert_eq!(shifted.tuning_word(1), 25);
    let mut maximum = Tuner::new(REF_180MHZ, Precision::Maximum);
    assert_eq!(maximum.tuning_word(1), 24);
  }

  #[test]
  fn half_clock_lands_on_accumulator_midpoint() {
    let mut shifted = Tuner::new(REF_180MHZ, Precision::ShiftScaled);
    assert_eq!(shifted.tuning_word(90_000_000), 2_147_483_649);
    let mut maximum = Tuner::new(REF_180MHZ, Precision::Maximum);
    assert_eq!(maximum.tuning_word(90_000_000), 1 << 31);
  }

  #[test]
  fn words_recover_target_frequency() {
    for precision in [Precision::ShiftScaled, Precision::Maximum] {
      let mut t = Tuner::new(REF_180MHZ, precision);
      for freq in SWEEP {
        let word = t.tuning_word(freq);
        let err = recovered_hz(word, REF_180MHZ).abs_diff(freq);
        // 5 parts in 10^7, with a floor of two counts at the 1 Hz end.
        let allowed = (freq / 2_000_000).max(2);
        assert!(err <= allowed, "freq {freq}: err {err} > {allowed}");
      }
    }
  }

  #[test]
  fn maximum_precision_tracks_the_ratio_closer() {
    let mut shifted = Tuner::new(REF_180MHZ, Precision::ShiftScaled);
    let mut maximum = Tuner::new(REF_180MHZ, Precision::Maximum);

    let mut shifted_sum = 0u64;
    let mut maximum_sum = 0u64;
    for freq in SWEEP {
      let s = residual(shifted.tuning_word(freq), REF_180MHZ, freq);
      let m = residual(maximum.tuning_word(freq), REF_180MHZ, freq);
      // Per-word: the 64-bit reciprocal stays within one accumulator step of
      // the exact ratio, the shifted one within two.
      assert!(m <= u64::from(REF_180MHZ), "freq {freq}: maximum residual {m}");
      assert!(s <= 2 * u64::from(REF_180MHZ), "freq {freq}: shifted residual {s}");
      shifted_sum += s;
      maximum_sum += m;
    }
    assert!(maximum_sum < shifted_sum);
  }

  #[test]
  fn calibration_scales_clock_by_ppb() {
    let mut t = Tuner::new(REF_180MHZ, Precision::ShiftScaled);

    // 1000 ppb of 180 MHz is exactly 180 Hz.
    assert_eq!(t.set_calibration(1_000), Ok(179_999_820));
    assert_eq!(t.effective_clock(), 179_999_820);
    assert_eq!(t.set_calibration(-1_000), Ok(180_000_180));

    // Pure function of (nominal, ppb): repeating an offset changes nothing.
    assert_eq!(t.set_calibration(-1_000), Ok(180_000_180));
    assert_eq!(t.nominal_clock(), REF_180MHZ);
  }

  #[test]
  fn calibration_zero_restores_nominal_words() {
    let mut calibrated = Tuner::new(REF_180MHZ, Precision::ShiftScaled);
    calibrated.set_calibration(5_000).expect("offset must be accepted");
    calibrated.set_calibration(0).expect("zero offset must be accepted");
    assert_eq!(calibrated.effective_clock(), REF_180MHZ);

    let mut fresh = Tuner::new(REF_180MHZ, Precision::ShiftScaled);
    for freq in SWEEP {
      assert_eq!(calibrated.tuning_word(freq), fresh.tuning_word(freq));
    }
  }

  #[test]
  fn calibration_reshapes_words_without_explicit_refresh() {
    let mut t = Tuner::new(REF_180MHZ, Precision::ShiftScaled);
    let nominal_word = t.tuning_word(10_000_000);
    assert_eq!(nominal_word, 238_609_295);

    // +1000 ppm shrinks the modeled clock, so the same target needs a larger
    // word; the stale reciprocal must not leak into this computation.
    t.set_calibration(1_000_000).expect("offset must be accepted");
    assert_eq!(t.effective_clock(), 179_820_000);
    assert!(t.tuning_word(10_000_000) > nominal_word);
  }

  #[test]
  fn reciprocal_is_cached_until_calibration_changes() {
    let mut t = Tuner::new(REF_180MHZ, Precision::ShiftScaled);
    assert!(t.reciprocal.is_none());

    let first = t.tuning_word(10_000_000);
    let cached = t.reciprocal;
    assert!(cached.is_some());

    // A second request reuses the derivation, bit for bit.
    assert_eq!(t.tuning_word(10_000_000), first);
    assert_eq!(t.reciprocal, cached);

    t.set_calibration(250).expect("offset must be accepted");
    assert!(t.reciprocal.is_none());
  }

  #[test]
  fn out_of_range_offsets_are_rejected() {
    let mut t = Tuner::new(REF_180MHZ, Precision::ShiftScaled);
    assert_eq!(t.set_calibration(1_000_000_000), Err(CalibrationError::ClockUnderflow));
    assert_eq!(t.set_calibration(i32::MAX), Err(CalibrationError::ClockUnderflow));

    let mut slow = Tuner::new(1, Precision::ShiftScaled);
    assert_eq!(slow.set_calibration(999_999_999), Err(CalibrationError::ClockUnderflow));

    let mut fast = Tuner::new(u32::MAX, Precision::ShiftScaled);
    assert_eq!(fast.set_calibration(-1_000_000_000), Err(CalibrationError::ClockOverflow));
  }

  #[test]
  fn rejected_offset_leaves_tuner_untouched() {
    let mut t = Tuner::new(REF_180MHZ, Precision::ShiftScaled);
    let word = t.tuning_word(10_000_000);
    let cached = t.reciprocal;

    assert!(t.set_calibration(i32::MAX).is_err());
    assert_eq!(t.effective_clock(), REF_180MHZ);
    assert_eq!(t.reciprocal, cached);
    assert_eq!(t.tuning_word(10_000_000), word);
  }

  #[test]
  #[should_panic] // division by a zero clock is unrepresentable
  fn zero_reference_clock_panics() {
    let _ = Tuner::new(0, Precision::ShiftScaled);
  }
}
