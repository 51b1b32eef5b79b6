//! Minimal bring-up and first frequency.
#![allow(unused)]
use ad9851::{Ad9851, Config};
use embedded_hal::digital::OutputPin;
use embedded_hal_async::spi::SpiBus;

#[allow(dead_code)]
async fn main_async<SPI, FQ, RST, E>(spi: SPI, fq_ud: FQ, reset: RST) -> Result<(), ad9851::Error<E>>
where
  SPI: SpiBus<Error = E>,
  FQ: OutputPin,
  RST: OutputPin,
{
  // 30 MHz oscillator module with the on-chip 6x multiplier enabled by the
  // default control byte. The bus must run mode 0, LSB first, at 2 MHz.
  let mut dds = Ad9851::new(spi, fq_ud, reset, Config::default());
  dds.initialize().await?;
  dds.set_frequency(10_000_000).await?;
  Ok(())
}

fn main() {}
