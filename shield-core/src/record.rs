//! The per-cycle output record and its CSV encoding.

/// CSV header line, matching the record field order exactly.
pub const CSV_HEADER: &str = "Timestamp,\
SCD41_CO2,\
SCD41_Temperature,\
SCD41_Humidity,\
SGP41_VOC,\
SGP41_NOX,\
ILPS28QSW_Pressure,\
ILPS28QSW_Temperature,\
BME688_Temperature,\
BME688_Pressure,\
BME688_Humidity,\
BME688_Gas_Resistance,\
BH1730FVC_Visible,\
BH1730FVC_IR,\
BH1730FVC_Lux,\
AS7331_Temperature,\
AS7331_UVA,\
AS7331_UVB,\
AS7331_UVC";

/// One complete set of sensor readings, produced once per acquisition cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorRecord {
    /// Milliseconds since boot.
    pub timestamp_ms: u32,

    /// CO2 concentration in ppm.
    pub scd41_co2: u16,

    /// CO2 sensor temperature in °C.
    pub scd41_temperature: f64,

    /// CO2 sensor relative humidity in %.
    pub scd41_humidity: f64,

    /// Raw VOC signal ticks.
    pub sgp41_voc: u16,

    /// Raw NOx signal ticks.
    pub sgp41_nox: u16,

    /// Barometric pressure in hPa.
    pub ilps28qsw_pressure: f64,

    /// Pressure sensor temperature in °C.
    pub ilps28qsw_temperature: f64,

    /// Environmental temperature in °C.
    pub bme688_temperature: f64,

    /// Environmental pressure in kPa.
    pub bme688_pressure: f64,

    /// Environmental relative humidity in %.
    pub bme688_humidity: f64,

    /// Gas resistance in ohm.
    pub bme688_gas_resistance: f64,

    /// Visible light counts.
    pub bh1730_visible: u16,

    /// Infrared light counts.
    pub bh1730_ir: u16,

    /// Illuminance in lux.
    pub bh1730_lux: u32,

    /// UV sensor temperature in °C.
    pub as7331_temperature: f64,

    /// UVA channel counts.
    pub as7331_uva: u16,

    /// UVB channel counts.
    pub as7331_uvb: u16,

    /// UVC channel counts.
    pub as7331_uvc: u16,
}

impl SensorRecord {
    /// Encode the record as one CSV line (no trailing newline). Integers are
    /// printed bare, floats with six decimal places.
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{:.6},{:.6},{},{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{},{},{},{:.6},{},{},{}",
            self.timestamp_ms,
            self.scd41_co2,
            self.scd41_temperature,
            self.scd41_humidity,
            self.sgp41_voc,
            self.sgp41_nox,
            self.ilps28qsw_pressure,
            self.ilps28qsw_temperature,
            self.bme688_temperature,
            self.bme688_pressure,
            self.bme688_humidity,
            self.bme688_gas_resistance,
            self.bh1730_visible,
            self.bh1730_ir,
            self.bh1730_lux,
            self.as7331_temperature,
            self.as7331_uva,
            self.as7331_uvb,
            self.as7331_uvc,
        )
    }
}

/// Tests.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::as7331;

    #[test]
    fn header_field_order() {
        assert_eq!(CSV_HEADER.split(',').count(), 19);
        assert!(CSV_HEADER.starts_with("Timestamp,SCD41_CO2,"));
        assert!(CSV_HEADER.ends_with(",AS7331_UVC"));
    }

    #[test]
    fn reference_record_encodes_exactly() {
        let record = SensorRecord {
            timestamp_ms: 12345,
            scd41_co2: 800,
            scd41_temperature: 22.50,
            scd41_humidity: 45.00,
            sgp41_voc: 30000,
            sgp41_nox: 15000,
            ilps28qsw_pressure: 1013.25,
            ilps28qsw_temperature: 23.10,
            bme688_temperature: 22.80,
            bme688_pressure: 101.325,
            bme688_humidity: 44.00,
            bme688_gas_resistance: 50000.0,
            bh1730_visible: 120,
            bh1730_ir: 40,
            bh1730_lux: 95,
            as7331_temperature: as7331::temperature_c(1800),
            as7331_uva: 100,
            as7331_uvb: 50,
            as7331_uvc: 10,
        };

        assert_eq!(
            record.to_csv_line(),
            "12345,800,22.500000,45.000000,30000,15000,1013.250000,23.100000,\
             22.800000,101.325000,44.000000,50000.000000,120,40,95,23.100000,\
             100,50,10"
        );
    }

    #[test]
    fn default_record_is_all_zero() {
        let line = SensorRecord::default().to_csv_line();
        assert!(line.starts_with("0,0,0.000000,"));
        assert_eq!(line.split(',').count(), 19);
    }
}
