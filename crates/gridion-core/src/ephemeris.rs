// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of GridION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! Sunrise/sunset lookup table for the site.
//!
//! Generated once at startup from the site coordinates; the day-ahead
//! planner uses it to report the expected solar window of the delivery
//! day.

use chrono::Datelike;

const DAYS_IN_YEAR: usize = 366;

/// Per-day sunrise and sunset times in local decimal hours
#[derive(Debug, Clone)]
pub struct SunlightTable {
    sunrise: [f64; DAYS_IN_YEAR],
    sunset: [f64; DAYS_IN_YEAR],
}

impl SunlightTable {
    /// Generate the table for a site.
    ///
    /// Uses the solar declination approximation and the hour-angle
    /// formula; the hour-angle cosine is clamped so polar day/night
    /// degenerate to an all-day or zero-length window instead of NaN.
    pub fn generate(latitude_deg: f64, longitude_deg: f64, timezone_offset_hours: f64) -> Self {
        let mut sunrise = [0.0; DAYS_IN_YEAR];
        let mut sunset = [0.0; DAYS_IN_YEAR];

        let solar_noon = 12.0 - (longitude_deg / 15.0) - timezone_offset_hours;

        for day in 0..DAYS_IN_YEAR {
            let declination_deg =
                -23.44 * ((2.0 * std::f64::consts::PI / 365.0) * (day as f64 + 10.0)).cos();

            let cos_hour_angle =
                -latitude_deg.to_radians().tan() * declination_deg.to_radians().tan();
            let hour_angle_deg = cos_hour_angle.clamp(-1.0, 1.0).acos().to_degrees();

            sunrise[day] = solar_noon - hour_angle_deg / 15.0;
            sunset[day] = solar_noon + hour_angle_deg / 15.0;
        }

        Self { sunrise, sunset }
    }

    /// Sunrise and sunset for a zero-based day of year, in decimal hours
    pub fn sunlight_hours(&self, day_of_year: usize) -> (f64, f64) {
        let day = day_of_year.min(DAYS_IN_YEAR - 1);
        (self.sunrise[day], self.sunset[day])
    }

    /// Sunrise and sunset for a calendar date
    pub fn for_date(&self, date: chrono::NaiveDate) -> (f64, f64) {
        self.sunlight_hours(date.ordinal0() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equator_has_near_twelve_hour_days() {
        let table = SunlightTable::generate(0.0, 0.0, 0.0);
        for day in [0, 90, 180, 270] {
            let (sunrise, sunset) = table.sunlight_hours(day);
            let daylight = sunset - sunrise;
            assert!(
                (daylight - 12.0).abs() < 0.5,
                "day {day}: {daylight} h of daylight at the equator"
            );
        }
    }

    #[test]
    fn test_northern_summer_longer_than_winter() {
        let table = SunlightTable::generate(50.0, 14.4, 1.0);
        let (rise_jun, set_jun) = table.sunlight_hours(172); // ~June 21
        let (rise_dec, set_dec) = table.sunlight_hours(355); // ~December 21
        assert!((set_jun - rise_jun) > (set_dec - rise_dec) + 6.0);
    }

    #[test]
    fn test_polar_night_is_finite() {
        let table = SunlightTable::generate(78.0, 15.0, 1.0);
        let (sunrise, sunset) = table.sunlight_hours(355);
        assert!(sunrise.is_finite());
        assert!(sunset.is_finite());
        // Midwinter above the arctic circle: zero-length window
        assert!((sunset - sunrise).abs() < 1e-9);
    }

    #[test]
    fn test_for_date_uses_day_of_year() {
        let table = SunlightTable::generate(50.0, 14.4, 1.0);
        let date = chrono::NaiveDate::from_ymd_opt(2025, 6, 21).unwrap();
        let by_date = table.for_date(date);
        let by_day = table.sunlight_hours(date.ordinal0() as usize);
        assert_eq!(by_date, by_day);
    }
}
