//! Ship performance model: speed loss in waves and course-keeping envelope.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Lowest speed ratio the regression is allowed to return.
const MIN_VELOCITY_RATIO: f64 = 1e-3;

/// Vessel characteristics. Every field is optional; each one gates the
/// behavior that depends on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipPerformanceInfo {
    /// Combined wave height in meters above which conditions are unsafe.
    #[serde(default)]
    pub danger_height_m: Option<f64>,
    /// Engine power, kW.
    #[serde(default)]
    pub engine_power_kw: Option<f64>,
    /// Displacement, tons.
    #[serde(default)]
    pub displacement_t: Option<f64>,
    #[serde(default)]
    pub length_m: Option<f64>,
    /// Block coefficient of the hull.
    #[serde(default)]
    pub fullness: Option<f64>,
    /// Calm-water speed in m/s.
    #[serde(default)]
    pub speed_mps: Option<f64>,
    #[serde(default)]
    pub draft_m: Option<f64>,
}

impl ShipPerformanceInfo {
    pub fn with_speed(speed_mps: f64) -> Self {
        Self {
            speed_mps: Some(speed_mps),
            ..Self::default()
        }
    }

    /// Nominal speed, required by every caller.
    pub fn nominal_speed(&self) -> Result<f64> {
        match self.speed_mps {
            Some(speed) if speed.is_finite() && speed > 0.0 => Ok(speed),
            Some(speed) => Err(Error::InvalidInput(format!(
                "nominal speed must be positive, got {speed}"
            ))),
            None => Err(Error::MissingField("speed")),
        }
    }
}

/// Speed ratio v/v_sw from the empirical regression.
///
/// # Arguments
/// * `engine_power` - kW
/// * `displacement` - tons
/// * `length` - meters
/// * `fullness` - block coefficient
/// * `wave_height` - combined wave height, meters
pub fn calculate_velocity_ratio(
    engine_power: f64,
    displacement: f64,
    length: f64,
    fullness: f64,
    wave_height: f64,
) -> f64 {
    let power_ratio = engine_power / displacement;
    let relative_wave = 10.0 * wave_height / length;

    let gamma1 = power_ratio.powf(-1.14) - 2.0;
    let gamma2 = (fullness / (1.143 - 1.425 * power_ratio)).powf(4.7);
    let gamma3 = 1.25 * (-1.48 * relative_wave).exp();
    let gamma = gamma1 * gamma2 * gamma3;

    let ratio = (-gamma * relative_wave.powi(2)).exp();
    if !ratio.is_finite() {
        return 1.0;
    }
    ratio.clamp(MIN_VELOCITY_RATIO, 1.0)
}

/// Expected speed in m/s for the given combined wave height.
///
/// Falls back to the nominal speed when any model input is unset.
pub fn get_speed(info: &ShipPerformanceInfo, wave_height: f64) -> Result<f64> {
    let nominal = info.nominal_speed()?;
    let (Some(_), Some(power), Some(displacement), Some(length), Some(fullness), Some(_)) = (
        info.danger_height_m,
        info.engine_power_kw,
        info.displacement_t,
        info.length_m,
        info.fullness,
        info.draft_m,
    ) else {
        return Ok(nominal);
    };
    let ratio = calculate_velocity_ratio(power, displacement, length, fullness, wave_height);
    Ok(ratio * nominal)
}

/// Half-width of the steering cone in radians.
///
/// Grows linearly with `speed / nominal_speed`, `degrees_per_unit` degrees at
/// nominal speed, capped at π.
pub fn calculate_steering_angle(speed: f64, nominal_speed: f64, degrees_per_unit: f64) -> f64 {
    let relative = if nominal_speed > 0.0 {
        speed / nominal_speed
    } else {
        1.0
    };
    (degrees_per_unit * relative)
        .to_radians()
        .clamp(0.0, std::f64::consts::PI)
}

/// Time needed to cover `distance_m` at `speed_mps`, rounded to milliseconds.
///
/// Fails when the result does not fit a [`Duration`].
pub fn travel_duration(distance_m: f64, speed_mps: f64) -> Result<Duration> {
    let millis = (distance_m / speed_mps * 1000.0).round();
    // `i64::MAX as f64` is 2^63, one past the largest i64.
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return Err(travel_out_of_range(distance_m, speed_mps));
    }
    Duration::try_milliseconds(millis as i64)
        .ok_or_else(|| travel_out_of_range(distance_m, speed_mps))
}

/// `start` plus the time to cover `distance_m` at `speed_mps`.
pub fn arrival_after(
    start: DateTime<Utc>,
    distance_m: f64,
    speed_mps: f64,
) -> Result<DateTime<Utc>> {
    let duration = travel_duration(distance_m, speed_mps)?;
    start.checked_add_signed(duration).ok_or_else(|| {
        Error::InvalidInput(format!(
            "arrival time {start} + {duration} is out of range"
        ))
    })
}

fn travel_out_of_range(distance_m: f64, speed_mps: f64) -> Error {
    Error::InvalidInput(format!(
        "travel time for {distance_m} m at {speed_mps} m/s is out of range"
    ))
}

pub fn knots_to_mps(knots: f64) -> f64 {
    knots * 0.514444
}

pub fn feet_to_meters(feet: f64) -> f64 {
    feet * 0.3048
}
