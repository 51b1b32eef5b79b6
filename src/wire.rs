use embedded_hal::digital::OutputPin;
use embedded_hal_async::spi::SpiBus;

use crate::{Ad9851, ControlByte, Error};

/// The 40-bit program word as shifted into the device: four tuning-word
/// bytes least-significant first, then the control byte.
#[derive(Debug, Clone, Copy)]
#[packbits::pack(bytes = 5)]
pub(crate) struct ProgramWord {
  pub tuning: u32,
  #[bits(8)]
  pub control: ControlByte,
}

impl ProgramWord {
  pub(crate) fn frame(self) -> [u8; 5] {
    match self.try_into() {
      Ok(bytes) => bytes,
      // 40 declared bits in five bytes; packing cannot fail
      Err(_) => unreachable!(),
    }
  }
}

impl<SPI, E, FQ, RST> Ad9851<SPI, FQ, RST>
where
  SPI: SpiBus<Error = E>,
  FQ: OutputPin,
  RST: OutputPin,
{
  /// Shift a raw tuning word into the device and latch it.
  ///
  /// Words computed ahead of time with [`Ad9851::tuning_word`] can be
  /// replayed here without touching the tuner state.
  pub async fn send_tuning_word(&mut self, word: u32) -> Result<(), Error<E>> {
    let frame = ProgramWord { tuning: word, control: self.config.control }.frame();
    self.spi.write(&frame).await.map_err(Error::Spi)?;
    // Drain the bus before latching; FQ_UD commits whatever has been shifted
    // in at that instant.
    self.spi.flush().await.map_err(Error::Spi)?;
    self.pulse_update()
  }

  /// Rising then falling edge on FQ_UD, moving the 40-bit shift register
  /// into the DDS core.
  pub(crate) fn pulse_update(&mut self) -> Result<(), Error<E>> {
    self.fq_ud.set_high().map_err(|_| Error::Pin)?;
    self.fq_ud.set_low().map_err(|_| Error::Pin)
  }

  /// Rising then falling edge on RESET. The datasheet minimum high time is
  /// five reference cycles.
  pub(crate) fn pulse_reset(&mut self) -> Result<(), Error<E>> {
    self.reset.set_high().map_err(|_| Error::Pin)?;
    self.reset.set_low().map_err(|_| Error::Pin)
  }
}
