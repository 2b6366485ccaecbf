use std::time::Duration;

use getset::{Getters, MutGetters};
use resotune_core::link::Link;
use resotune_driver::{
    device::Device,
    error::DriverError,
    option::DeviceOption,
    role::{Coprocessor, Dut},
};

#[cfg(feature = "serial")]
use resotune_link_serial::{SerialLink, SerialLinkBuilder};

/// Ratio of the dividers in front of the DUT rail inputs of the low-speed ADC.
const RAIL_DIVIDER: f32 = 1.5;
/// Low-speed ADC channel of the DUT 3.3 V rail.
const ADC_LS_TX_3V3: usize = 2;
/// Low-speed ADC channel of the DUT 5 V rail.
const ADC_LS_TX_5V: usize = 3;

/// Ports and options of a serial [`Fixture`].
#[cfg(feature = "serial")]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FixtureConfig {
    /// Port of the coprocessor.
    pub coprocessor: SerialLinkBuilder,
    /// Port of the DUT.
    pub dut: SerialLinkBuilder,
    /// Option shared by both devices.
    pub device: DeviceOption,
}

#[cfg(feature = "serial")]
impl Default for FixtureConfig {
    fn default() -> Self {
        use resotune_driver::role::Role;

        Self {
            coprocessor: SerialLink::builder(Coprocessor::DEFAULT_PORT, Coprocessor::DEFAULT_BAUD),
            dut: SerialLink::builder(Dut::DEFAULT_PORT, Dut::DEFAULT_BAUD),
            device: DeviceOption::default(),
        }
    }
}

/// The connection session of the test fixture.
///
/// Owns the coprocessor and the DUT for as long as the session lasts. Both are closed when
/// the fixture is closed or dropped.
#[derive(Getters, MutGetters)]
pub struct Fixture<LC: Link, LD: Link> {
    /// The fixture coprocessor.
    #[getset(get = "pub", get_mut = "pub")]
    pub(crate) coprocessor: Device<LC, Coprocessor>,
    /// The device under test.
    #[getset(get = "pub", get_mut = "pub")]
    pub(crate) dut: Device<LD, Dut>,
    dut_uid: Option<String>,
}

#[cfg(feature = "serial")]
impl Fixture<SerialLink, SerialLink> {
    /// Opens both serial ports of `config` and wraps them in a fixture.
    pub fn connect(config: FixtureConfig) -> Result<Self, DriverError> {
        let coprocessor = Device::open(config.coprocessor.open()?, config.device)?;
        let dut = Device::open(config.dut.open()?, config.device)?;
        Ok(Self::new(coprocessor, dut))
    }
}

impl<LC: Link, LD: Link> Fixture<LC, LD> {
    /// Creates a fixture from two opened devices.
    #[must_use]
    pub fn new(coprocessor: Device<LC, Coprocessor>, dut: Device<LD, Dut>) -> Self {
        Self {
            coprocessor,
            dut,
            dut_uid: None,
        }
    }

    /// Identifier read by the last successful [`read_dut_uid`](Self::read_dut_uid).
    #[must_use]
    pub fn dut_uid(&self) -> Option<&str> {
        self.dut_uid.as_deref()
    }

    /// Measures the DUT 5 V rail.
    pub fn measure_tx_5v(&mut self) -> Result<f32, DriverError> {
        self.rail(ADC_LS_TX_5V)
    }

    /// Measures the DUT 3.3 V rail.
    pub fn measure_tx_3v3(&mut self) -> Result<f32, DriverError> {
        self.rail(ADC_LS_TX_3V3)
    }

    fn rail(&mut self, channel: usize) -> Result<f32, DriverError> {
        let adc = self.coprocessor.measure_adc_ls()?;
        adc.get(channel)
            .map(|v| v * RAIL_DIVIDER)
            .ok_or(DriverError::MalformedBuffer {
                len: adc.len() * std::mem::size_of::<f32>(),
                elem: std::mem::size_of::<f32>(),
            })
    }

    /// Reads the identifier the DUT prints after boot and remembers it.
    ///
    /// A previously read identifier is kept if the DUT prints none within `window`.
    pub fn read_dut_uid(&mut self, window: Duration) -> Result<Option<&str>, DriverError> {
        if let Some(uid) = self.dut.read_uid(window)? {
            tracing::info!("DUT UID: {}", uid);
            self.dut_uid = Some(uid);
        }
        Ok(self.dut_uid())
    }

    /// Closes both devices.
    ///
    /// The DUT is closed even if closing the coprocessor fails; the first error is returned.
    pub fn close(self) -> Result<(), DriverError> {
        let Self {
            coprocessor, dut, ..
        } = self;
        let r = coprocessor.close();
        r.and(dut.close())
    }
}
