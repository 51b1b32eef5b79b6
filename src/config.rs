/// Reciprocal arithmetic width used by the tuning-word encoder.
///
/// One crate-wide choice made at construction, not a per-call option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Precision {
  /// 32-bit reciprocal, left-normalized per clock so its top bit is always
  /// set. Evaluation needs only a 32x32->64 widening multiply, which keeps
  /// frequency changes cheap on 32-bit targets.
  ShiftScaled,
  /// 64-bit reciprocal. Strictly closer to the exact ratio, at the cost of a
  /// 64x32->128 multiply per frequency change; pick it only where wide
  /// arithmetic is cheap.
  Maximum,
}

impl Default for Precision {
  fn default() -> Self {
    Self::ShiftScaled
  }
}

/// The fifth byte of the program word (W32..W39).
///
/// Static device configuration shifted in after the tuning word. The
/// reference-clock multiplier bit must agree with [`Config::reference_hz`]:
/// with the multiplier enabled the core clock is six times the oscillator.
#[derive(Debug, Clone, Copy)]
#[packbits::pack(u8)]
pub struct ControlByte {
  /// Enable the on-chip 6x reference-clock multiplier (W32).
  pub refclk_multiplier: bool,
  /// Power down the DAC and comparator while keeping the register file alive
  /// (W34). W33 stays zero, as required for normal operation.
  #[skip(1)]
  pub power_down: bool,
  /// Phase offset of the output in steps of 11.25 degrees (W35..W39).
  #[bits(5)]
  pub phase: u8,
}

impl ControlByte {
  /// Panics if `phase` does not fit the five phase bits.
  pub const fn new(refclk_multiplier: bool, power_down: bool, phase: u8) -> Self {
    assert!(phase < 32, "phase offset is a 5-bit field");
    Self { refclk_multiplier, power_down, phase }
  }
}

impl Default for ControlByte {
  fn default() -> Self {
    Self::new(true, false, 0)
  }
}

/// Static driver configuration.
///
/// The defaults match the common 30 MHz-oscillator module with the 6x
/// multiplier enabled, giving a 180 MHz core clock.
///
/// # Example
/// ```no_run
/// use ad9851::{Config, ControlByte, Precision};
///
/// // 125 MHz oscillator wired straight to the core, fundamental phase.
/// let config = Config::default()
///   .with_reference_clock(125_000_000)
///   .with_control(ControlByte::new(false, false, 0))
///   .with_precision(Precision::Maximum);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Config {
  /// DDS core clock in Hz, after the multiplier if it is enabled.
  pub reference_hz: u32,
  pub precision: Precision,
  pub control: ControlByte,
}

impl Config {
  /// Panics if `reference_hz` is zero.
  pub const fn new(reference_hz: u32, precision: Precision, control: ControlByte) -> Self {
    assert!(reference_hz > 0, "reference clock must be non-zero");
    Self { reference_hz, precision, control }
  }

  pub const fn with_reference_clock(mut self, reference_hz: u32) -> Self {
    assert!(reference_hz > 0, "reference clock must be non-zero");
    self.reference_hz = reference_hz;
    self
  }

  pub const fn with_precision(mut self, precision: Precision) -> Self {
    self.precision = precision;
    self
  }

  pub const fn with_control(mut self, control: ControlByte) -> Self {
    self.control = control;
    self
  }
}

impl Default for Config {
  fn default() -> Self {
    Self::new(180_000_000, Precision::ShiftScaled, ControlByte::default())
  }
}
