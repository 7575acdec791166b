//! Motion sensor sensitivity tables and conversions (ISM330DHCX IMU and
//! LIS2DUXS12 accelerometer).

/// ISM330DHCX accelerometer full-scale setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccelFullScale {
    Fs2g,
    Fs4g,
    Fs8g,
    Fs16g,
}

/// ISM330DHCX gyroscope full-scale setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GyroFullScale {
    Fs125Dps,
    Fs250Dps,
    Fs500Dps,
    Fs1000Dps,
    Fs2000Dps,
    Fs4000Dps,
}

/// Accelerometer sensitivity in mg per LSB.
pub fn accel_sensitivity_mg(full_scale: AccelFullScale) -> f64 {
    match full_scale {
        AccelFullScale::Fs2g => 0.061,
        AccelFullScale::Fs4g => 0.122,
        AccelFullScale::Fs8g => 0.244,
        AccelFullScale::Fs16g => 0.488,
    }
}

/// Gyroscope sensitivity in mdps per LSB.
pub fn gyro_sensitivity_mdps(full_scale: GyroFullScale) -> f64 {
    match full_scale {
        GyroFullScale::Fs125Dps => 4.375,
        GyroFullScale::Fs250Dps => 8.75,
        GyroFullScale::Fs500Dps => 17.5,
        GyroFullScale::Fs1000Dps => 35.0,
        GyroFullScale::Fs2000Dps => 70.0,
        GyroFullScale::Fs4000Dps => 140.0,
    }
}

/// Convert a raw three-axis sample with the given sensitivity.
pub fn convert_axes(raw: [i16; 3], sensitivity: f64) -> [f64; 3] {
    [
        raw[0] as f64 * sensitivity,
        raw[1] as f64 * sensitivity,
        raw[2] as f64 * sensitivity,
    ]
}

/// LIS2DUXS12 acceleration in mg at ±2 g full scale.
pub fn lis2duxs12_accel_mg(raw: i16) -> f64 {
    raw as f64 * 0.061
}

/// LIS2DUXS12 die temperature in °C (355.5 LSB/°C around 25 °C).
pub fn lis2duxs12_temperature_c(raw: i16) -> f64 {
    raw as f64 / 355.5 + 25.0
}

/// Tests.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accel_sensitivity_doubles_per_scale() {
        assert_eq!(accel_sensitivity_mg(AccelFullScale::Fs2g), 0.061);
        assert_eq!(accel_sensitivity_mg(AccelFullScale::Fs16g), 0.488);
    }

    #[test]
    fn gyro_sensitivity_table() {
        assert_eq!(gyro_sensitivity_mdps(GyroFullScale::Fs125Dps), 4.375);
        assert_eq!(gyro_sensitivity_mdps(GyroFullScale::Fs2000Dps), 70.0);
    }

    #[test]
    fn convert_axes_applies_sensitivity_per_axis() {
        let converted = convert_axes([1000, -1000, 0], 0.061);
        assert!((converted[0] - 61.0).abs() < 1e-9);
        assert!((converted[1] + 61.0).abs() < 1e-9);
        assert_eq!(converted[2], 0.0);
    }

    #[test]
    fn lis2duxs12_temperature_offset() {
        assert_eq!(lis2duxs12_temperature_c(0), 25.0);
        assert!((lis2duxs12_temperature_c(3555) - 35.0).abs() < 1e-9);
    }
}
