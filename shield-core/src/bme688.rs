//! BME688 environmental sensor calibration and compensation.
//!
//! The raw ADC words only become engineering units through the per-device
//! calibration coefficients burnt into the chip. The floating point
//! compensation below follows the Bosch datasheet; gas resistance uses the
//! high-range formula of the BME688 variant.

/// Per-device calibration coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Calibration {
    pub par_t1: u16,
    pub par_t2: i16,
    pub par_t3: i8,

    pub par_p1: u16,
    pub par_p2: i16,
    pub par_p3: i8,
    pub par_p4: i16,
    pub par_p5: i16,
    pub par_p6: i8,
    pub par_p7: i8,
    pub par_p8: i16,
    pub par_p9: i16,
    pub par_p10: u8,

    pub par_h1: u16,
    pub par_h2: u16,
    pub par_h3: i8,
    pub par_h4: i8,
    pub par_h5: i8,
    pub par_h6: u8,
    pub par_h7: i8,

    pub par_gh1: i8,
    pub par_gh2: i16,
    pub par_gh3: i8,

    pub res_heat_range: u8,
    pub res_heat_val: i8,
}

/// One raw measurement field as read from the data registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawField {
    /// 20-bit temperature ADC value.
    pub adc_temperature: u32,

    /// 20-bit pressure ADC value.
    pub adc_pressure: u32,

    /// 16-bit humidity ADC value.
    pub adc_humidity: u16,

    /// 10-bit gas resistance ADC value.
    pub adc_gas: u16,

    /// Gas ADC range selector.
    pub gas_range: u8,

    /// Gas measurement valid and heater stable.
    pub gas_valid: bool,
}

/// Compensated measurement in engineering units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// Temperature in degrees Celsius.
    pub temperature_c: f64,

    /// Pressure in Pascal.
    pub pressure_pa: f64,

    /// Relative humidity in percent.
    pub humidity_percent: f64,

    /// Gas resistance in ohm.
    pub gas_resistance_ohm: f64,
}

impl Calibration {
    /// Unpack the coefficients from the three calibration register blocks
    /// (0x8A.., 0xE1.. and 0x00..), laid out as in the Bosch reference
    /// driver.
    ///
    /// # Arguments
    /// * `coeff1` - 23 bytes read from 0x8A.
    /// * `coeff2` - 14 bytes read from 0xE1.
    /// * `coeff3` - 5 bytes read from 0x00.
    ///
    /// # Returns
    /// * `Calibration` - The unpacked coefficients.
    pub fn from_registers(coeff1: &[u8; 23], coeff2: &[u8; 14], coeff3: &[u8; 5]) -> Self {
        Self {
            par_t1: u16::from_le_bytes([coeff2[8], coeff2[9]]),
            par_t2: i16::from_le_bytes([coeff1[0], coeff1[1]]),
            par_t3: coeff1[2] as i8,

            par_p1: u16::from_le_bytes([coeff1[4], coeff1[5]]),
            par_p2: i16::from_le_bytes([coeff1[6], coeff1[7]]),
            par_p3: coeff1[8] as i8,
            par_p4: i16::from_le_bytes([coeff1[10], coeff1[11]]),
            par_p5: i16::from_le_bytes([coeff1[12], coeff1[13]]),
            par_p6: coeff1[15] as i8,
            par_p7: coeff1[14] as i8,
            par_p8: i16::from_le_bytes([coeff1[18], coeff1[19]]),
            par_p9: i16::from_le_bytes([coeff1[20], coeff1[21]]),
            par_p10: coeff1[22],

            par_h1: ((coeff2[2] as u16) << 4) | (coeff2[1] as u16 & 0x0F),
            par_h2: ((coeff2[0] as u16) << 4) | (coeff2[1] as u16 >> 4),
            par_h3: coeff2[3] as i8,
            par_h4: coeff2[4] as i8,
            par_h5: coeff2[5] as i8,
            par_h6: coeff2[6],
            par_h7: coeff2[7] as i8,

            par_gh1: coeff2[12] as i8,
            par_gh2: i16::from_le_bytes([coeff2[10], coeff2[11]]),
            par_gh3: coeff2[13] as i8,

            res_heat_range: (coeff3[2] & 0x30) >> 4,
            res_heat_val: coeff3[0] as i8,
        }
    }

    /// Compensate one raw field into engineering units.
    ///
    /// # Arguments
    /// * `raw` - The raw ADC field.
    ///
    /// # Returns
    /// * `Measurement` - Temperature, pressure, humidity and gas resistance.
    pub fn compensate(&self, raw: &RawField) -> Measurement {
        let (t_fine, temperature_c) = self.compensate_temperature(raw.adc_temperature);

        Measurement {
            temperature_c,
            pressure_pa: self.compensate_pressure(raw.adc_pressure, t_fine),
            humidity_percent: self.compensate_humidity(raw.adc_humidity, temperature_c),
            gas_resistance_ohm: gas_resistance_ohm(raw.adc_gas, raw.gas_range),
        }
    }

    fn compensate_temperature(&self, adc: u32) -> (f64, f64) {
        let adc = adc as f64;

        let var1 = (adc / 16384.0 - self.par_t1 as f64 / 1024.0) * self.par_t2 as f64;
        let var2 = (adc / 131072.0 - self.par_t1 as f64 / 8192.0)
            * (adc / 131072.0 - self.par_t1 as f64 / 8192.0)
            * self.par_t3 as f64
            * 16.0;

        let t_fine = var1 + var2;
        (t_fine, t_fine / 5120.0)
    }

    fn compensate_pressure(&self, adc: u32, t_fine: f64) -> f64 {
        let var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * (self.par_p6 as f64 / 131072.0);
        var2 += var1 * self.par_p5 as f64 * 2.0;
        var2 = var2 / 4.0 + self.par_p4 as f64 * 65536.0;

        let var1 = (self.par_p3 as f64 * var1 * var1 / 16384.0 + self.par_p2 as f64 * var1)
            / 524288.0;
        let var1 = (1.0 + var1 / 32768.0) * self.par_p1 as f64;

        if var1 == 0.0 {
            return 0.0;
        }

        let mut pressure = 1048576.0 - adc as f64;
        pressure = (pressure - var2 / 4096.0) * 6250.0 / var1;

        let var1 = self.par_p9 as f64 * pressure * pressure / 2147483648.0;
        let var2 = pressure * (self.par_p8 as f64 / 32768.0);
        let var3 = (pressure / 256.0) * (pressure / 256.0) * (pressure / 256.0)
            * (self.par_p10 as f64 / 131072.0);

        pressure + (var1 + var2 + var3 + self.par_p7 as f64 * 128.0) / 16.0
    }

    fn compensate_humidity(&self, adc: u16, temperature_c: f64) -> f64 {
        let var1 = adc as f64
            - (self.par_h1 as f64 * 16.0 + self.par_h3 as f64 / 2.0 * temperature_c);
        let var2 = var1
            * (self.par_h2 as f64 / 262144.0
                * (1.0
                    + self.par_h4 as f64 / 16384.0 * temperature_c
                    + self.par_h5 as f64 / 1048576.0 * temperature_c * temperature_c));
        let var3 = self.par_h6 as f64 / 16384.0;
        let var4 = self.par_h7 as f64 / 2097152.0;

        let humidity = var2 + (var3 + var4 * temperature_c) * var2 * var2;
        humidity.clamp(0.0, 100.0)
    }

    /// Compute the heater set-point register value for a target plate
    /// temperature at the given ambient temperature.
    ///
    /// # Arguments
    /// * `ambient_c` - The ambient temperature in degrees Celsius.
    /// * `target_c` - The target heater temperature in degrees Celsius.
    ///
    /// # Returns
    /// * `u8` - The res_heat register value.
    pub fn heater_set_point(&self, ambient_c: f64, target_c: f64) -> u8 {
        let var1 = self.par_gh1 as f64 / 16.0 + 49.0;
        let var2 = self.par_gh2 as f64 / 32768.0 * 0.0005 + 0.00235;
        let var3 = self.par_gh3 as f64 / 1024.0;
        let var4 = var1 * (1.0 + var2 * target_c);
        let var5 = var4 + var3 * ambient_c;

        (3.4 * (var5 * (4.0 / (4.0 + self.res_heat_range as f64))
            * (1.0 / (1.0 + self.res_heat_val as f64 * 0.002))
            - 25.0)) as u8
    }
}

/// Gas resistance in ohm from the raw gas ADC value and range (high-range
/// variant formula).
///
/// # Arguments
/// * `adc_gas` - The 10-bit gas ADC value.
/// * `gas_range` - The gas range selector.
///
/// # Returns
/// * `f64` - The gas resistance in ohm.
pub fn gas_resistance_ohm(adc_gas: u16, gas_range: u8) -> f64 {
    let var1 = (262144u32 >> gas_range) as f64;
    let var2 = (adc_gas as f64 - 512.0) * 3.0 + 4096.0;

    1000000.0 * var1 / var2
}

/// Tests.
#[cfg(test)]
mod tests {
    use super::*;

    /// Coefficient blocks where only the patched bytes are non-zero.
    fn blocks() -> ([u8; 23], [u8; 14], [u8; 5]) {
        ([0u8; 23], [0u8; 14], [0u8; 5])
    }

    #[test]
    fn from_registers_unpacks_split_humidity_words() {
        let (mut coeff1, mut coeff2, mut coeff3) = blocks();

        // par_t2 = 0x1400 = 5120, par_t1 = 0x6660
        coeff1[0] = 0x00;
        coeff1[1] = 0x14;
        coeff2[8] = 0x60;
        coeff2[9] = 0x66;

        // par_h1 low nibble shares coeff2[1] with par_h2 high nibble.
        coeff2[0] = 0xAB;
        coeff2[1] = 0xC5;
        coeff2[2] = 0xDE;
        coeff3[2] = 0x20;

        let calib = Calibration::from_registers(&coeff1, &coeff2, &coeff3);
        assert_eq!(calib.par_t2, 5120);
        assert_eq!(calib.par_t1, 0x6660);
        assert_eq!(calib.par_h1, (0xDE << 4) | 0x05);
        assert_eq!(calib.par_h2, (0xAB << 4) | 0x0C);
        assert_eq!(calib.res_heat_range, 2);
    }

    /// With par_t1 = 0 and par_t3 = 0 the temperature reduces to
    /// `adc / 16384 * par_t2 / 5120`.
    #[test]
    fn temperature_reduced_coefficients() {
        let calib = Calibration {
            par_t2: 5120,
            ..Default::default()
        };

        let (t_fine, temperature) = calib.compensate_temperature(16384);
        assert_eq!(t_fine, 5120.0);
        assert_eq!(temperature, 1.0);
    }

    /// With all pressure terms but par_p1 zeroed the formula reduces to
    /// `(1048576 - adc) * 6250 / par_p1`.
    #[test]
    fn pressure_reduced_coefficients() {
        let calib = Calibration {
            par_t2: 5120,
            par_p1: 6250,
            ..Default::default()
        };

        let raw = RawField {
            adc_temperature: 16384,
            adc_pressure: 948576,
            ..Default::default()
        };

        let measurement = calib.compensate(&raw);
        assert!((measurement.pressure_pa - 100000.0).abs() < 1e-6);
    }

    #[test]
    fn pressure_zero_gain_does_not_divide_by_zero() {
        let calib = Calibration::default();
        let measurement = calib.compensate(&RawField::default());
        assert_eq!(measurement.pressure_pa, 0.0);
    }

    /// With h1/h3..h7 zeroed humidity reduces to `adc * par_h2 / 262144`.
    #[test]
    fn humidity_reduced_coefficients() {
        let calib = Calibration {
            par_h2: 2048,
            ..Default::default()
        };

        let humidity = calib.compensate_humidity(6400, 1.0);
        assert_eq!(humidity, 50.0);
    }

    #[test]
    fn humidity_is_clamped() {
        let calib = Calibration {
            par_h2: 4095,
            ..Default::default()
        };

        assert_eq!(calib.compensate_humidity(65535, 25.0), 100.0);
        assert_eq!(calib.compensate_humidity(0, 25.0), 0.0);
    }

    #[test]
    fn gas_resistance_midpoint() {
        // adc = 512 cancels the offset term: 1e6 * 262144 / 4096.
        assert_eq!(gas_resistance_ohm(512, 0), 64000000.0);

        // Each range step halves var1.
        assert_eq!(gas_resistance_ohm(512, 1), 32000000.0);
    }

    #[test]
    fn heater_set_point_zero_coefficients() {
        let calib = Calibration::default();

        // var1 = 49, var2 = 0.00235, var4 = var5 = 49 * 1.705 = 83.545,
        // res_heat = 3.4 * (83.545 - 25) = 199.05 -> 199.
        assert_eq!(calib.heater_set_point(25.0, 300.0), 199);
    }
}
