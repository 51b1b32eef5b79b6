//! Calibration against a frequency counter, plus precomputed word replay.
#![allow(unused)]
use ad9851::{Ad9851, Config, Precision};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::spi::SpiBus;

#[allow(dead_code)]
async fn main_async<SPI, FQ, RST, E>(spi: SPI, fq_ud: FQ, reset: RST) -> Result<(), ad9851::Error<E>>
where
  SPI: SpiBus<Error = E>,
  FQ: OutputPin,
  RST: OutputPin,
{
  let config = Config::default().with_precision(Precision::Maximum);
  let mut dds = Ad9851::new(spi, fq_ud, reset, config);
  dds.initialize().await?;

  // The counter read 10_000_000.9 Hz against a 10 MHz target: 90 ppb high.
  // Calibration alone changes nothing on the wire, so re-set the frequency.
  dds.set_calibration(90)?;
  dds.set_frequency(10_000_000).await?;

  // Words for a small sweep, computed up front; replaying them later costs
  // one bus transfer each.
  let mut steps = [0u32; 8];
  for (i, word) in steps.iter_mut().enumerate() {
    *word = dds.tuning_word(7_000_000 + 250_000 * i as u32);
  }
  for word in steps {
    dds.send_tuning_word(word).await?;
  }
  Ok(())
}

fn main() {}
