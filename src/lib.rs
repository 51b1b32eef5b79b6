#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Async, `no_std` driver for the Analog Devices AD9851 DDS frequency
//! synthesizer.
//!
//! The AD9851 steps a 32-bit phase accumulator once per reference-clock cycle
//! and feeds the top of the accumulator into a DAC, so the output frequency is
//! `word / 2^32 * clock`. This crate owns the serial-load protocol and the
//! tuning-word arithmetic:
//!
//! - Frequency to 32-bit word conversion through a cached, per-clock
//!   normalized reciprocal instead of a full division on every change
//! - Parts-per-billion calibration folded into the effective reference clock
//! - 40-bit program-word framing, shifted out least-significant byte first
//!   and committed with an FQ_UD pulse, over `embedded-hal` /
//!   `embedded-hal-async` 1.0 traits
//! - A reset sequence that enters serial-load mode and parks the output at a
//!   defined frequency
//!
//! Wiring: W_CLK to SCK, D7 to MOSI, FQ_UD and RESET to push-pull outputs.
//! Configure the bus for SPI mode 0, least-significant-bit-first transfers,
//! at most 2 MHz.
//!
//! ```no_run
//! use ad9851::{Ad9851, Config};
//! use embedded_hal::digital::OutputPin;
//! use embedded_hal_async::spi::SpiBus;
//!
//! async fn example<SPI, FQ, RST, E>(spi: SPI, fq_ud: FQ, reset: RST) -> Result<(), ad9851::Error<E>>
//! where
//!   SPI: SpiBus<Error = E>,
//!   FQ: OutputPin,
//!   RST: OutputPin,
//! {
//!   let mut dds = Ad9851::new(spi, fq_ud, reset, Config::default());
//!   dds.initialize().await?;
//!   dds.set_calibration(-1200)?;
//!   dds.set_frequency(10_000_000).await?;
//!   Ok(())
//! }
//! ```
mod config;
mod tuning;
mod wire;

use embedded_hal::digital::OutputPin;
use embedded_hal_async::spi::SpiBus;

pub use config::*;
pub use tuning::{CalibrationError, Tuner};

/// Errors that can occur while driving the synthesizer.
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
  /// SPI bus transaction failed with the underlying driver error.
  Spi(E),
  /// A control line (FQ_UD or RESET) could not be switched.
  Pin,
  /// The requested calibration offset was rejected.
  Calibration(CalibrationError),
}

/// Driver for one AD9851 on a dedicated SPI bus.
///
/// Owns the bus plus the FQ_UD and RESET lines. Create an instance with
/// [`Ad9851::new`], then call [`Ad9851::initialize`] once before the first
/// frequency; the device powers up in an undefined load mode until then.
///
/// Every operation takes `&mut self`, which keeps the cached reciprocal and
/// its shift in step with the calibration. Sharing one device between tasks
/// needs an external mutex around the whole driver.
pub struct Ad9851<SPI, FQ, RST> {
  spi: SPI,
  fq_ud: FQ,
  reset: RST,
  config: Config,
  tuner: Tuner,
}

impl<SPI, E, FQ, RST> Ad9851<SPI, FQ, RST>
where
  SPI: SpiBus<Error = E>,
  FQ: OutputPin,
  RST: OutputPin,
{
  /// Create a new driver instance with the provided peripherals and
  /// configuration.
  ///
  /// No bus traffic happens here; call [`Ad9851::initialize`] to reset the
  /// device into serial-load mode.
  pub fn new(spi: SPI, fq_ud: FQ, reset: RST, config: Config) -> Self {
    let tuner = Tuner::new(config.reference_hz, config.precision);
    Self { spi, fq_ud, reset, config, tuner }
  }

  /// Reset the device and bring it into serial-load mode.
  ///
  /// Pulses RESET, produces W_CLK edges by clocking one throwaway byte, and
  /// latches with FQ_UD; on parts strapped for serial operation that arms the
  /// serial-load state machine. The output is then parked at 1 Hz under a
  /// fresh zero calibration so the chip never runs with an undefined
  /// frequency.
  pub async fn initialize(&mut self) -> Result<(), Error<E>> {
    self.pulse_reset()?;

    // W_CLK belongs to the SPI peripheral, so a dummy byte stands in for the
    // single manual clock pulse of the enable sequence.
    self.spi.write(&[0]).await.map_err(Error::Spi)?;
    self.spi.flush().await.map_err(Error::Spi)?;
    self.pulse_update()?;

    self.set_calibration(0)?;
    self.set_frequency(1).await?;
    Ok(())
  }

  /// Fold a measured output error into the reference clock.
  ///
  /// `ppb` is positive when the measured output frequency is high, negative
  /// when it is low. Returns the corrected clock. Nothing is transmitted
  /// here: the device keeps producing its current frequency, computed from
  /// the old calibration, until the next [`Ad9851::set_frequency`].
  pub fn set_calibration(&mut self, ppb: i32) -> Result<u32, Error<E>> {
    self.tuner.set_calibration(ppb).map_err(Error::Calibration)
  }

  /// Program the output frequency, returning the word that was sent.
  pub async fn set_frequency(&mut self, freq_hz: u32) -> Result<u32, Error<E>> {
    let word = self.tuner.tuning_word(freq_hz);
    self.send_tuning_word(word).await?;
    Ok(word)
  }

  /// Tuning word for `freq_hz` without touching the bus.
  ///
  /// Useful for building word tables off the critical path; replay them later
  /// with [`Ad9851::send_tuning_word`].
  pub fn tuning_word(&mut self, freq_hz: u32) -> u32 {
    self.tuner.tuning_word(freq_hz)
  }

  /// Reference clock with the current calibration applied.
  pub fn effective_clock(&self) -> u32 {
    self.tuner.effective_clock()
  }

  /// Configuration the driver was created with.
  pub fn config(&self) -> &Config {
    &self.config
  }

  /// Release the bus and the control pins.
  pub fn release(self) -> (SPI, FQ, RST) {
    (self.spi, self.fq_ud, self.reset)
  }
}
