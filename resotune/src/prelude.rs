pub use crate::{
    error::TuneError,
    fixture::Fixture,
    tuner::{
        AuxLimits, AuxReadings, Band, BaselineResult, CaptureOption, Report, SweepPoint,
        TapConfig, TapResult, Tuner, TunerOption, TunerState,
    },
};

#[cfg(feature = "serial")]
pub use crate::fixture::FixtureConfig;
#[cfg(feature = "serial")]
pub use resotune_link_serial::SerialLink;

pub use resotune_core::{
    link::{Link, LinkError},
    sleep::{Sleeper, StdSleeper},
    spectrum::PeakEstimate,
};
pub use resotune_driver::prelude::*;
