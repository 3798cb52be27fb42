use crate::compare_floats::min_of_2;
use crate::core::units::{daily_means, daily_totals, HOURS_PER_DAY};
use fsum::FSum;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, warn};

/// Remove space heat demand from days whose mean ambient temperature reaches the
/// heating limit, spreading the removed energy evenly over the remaining hours with demand.
///
/// Arguments:
/// * `temperature` - hourly ambient temperature, in degrees C
/// * `heating_limit_temperature` - daily mean temperature at or above which there is no
///                                 space heating, in degrees C
/// * `demand` - hourly heat demand, same length as `temperature`, in kWh
///
/// The series is processed in 24 hour blocks from its start. A trailing block shorter than
/// a day is treated like any other day, using the mean of the hours it has.
///
/// The total of the returned series equals the total of `demand`. Hours that had no demand
/// to begin with, and hours on warm days, receive none of the redistributed energy.
pub fn adjust_heat_demand(
    temperature: &[f64],
    heating_limit_temperature: f64,
    demand: &[f64],
) -> Result<Vec<f64>, HeatDemandError> {
    if temperature.len() != demand.len() {
        return Err(HeatDemandError::MismatchedSeriesLengths {
            temperature: temperature.len(),
            demand: demand.len(),
        });
    }

    let steps_per_day = HOURS_PER_DAY as usize;
    let trailing_hours = demand.len() % steps_per_day;
    if trailing_hours != 0 {
        warn!(
            trailing_hours,
            "heat demand series does not cover whole days; the last block is treated as a short day"
        );
    }

    let mut adjusted = demand.to_vec();
    let mut warm_day_totals = vec![];

    for (day_idx, (mean_temperature, day_demand)) in daily_means(temperature)
        .into_iter()
        .zip_eq(daily_totals(demand))
        .enumerate()
    {
        if mean_temperature >= heating_limit_temperature {
            let start = day_idx * steps_per_day;
            let end = min_of_2(start + steps_per_day, adjusted.len());
            adjusted[start..end].fill(0.);
            warm_day_totals.push(day_demand);
        }
    }
    let warm_days = warm_day_totals.len();
    let excess = FSum::with_all(warm_day_totals.iter()).value();

    if excess == 0. {
        debug!(warm_days, "no heat demand to redistribute");
        return Ok(adjusted);
    }

    let active_hours = adjusted.iter().filter(|demand| **demand != 0.).count();
    if active_hours == 0 {
        return Err(HeatDemandError::NoActiveHours {
            excess,
            heating_limit_temperature,
        });
    }

    let hourly_excess = excess / active_hours as f64;
    for hour_demand in adjusted.iter_mut().filter(|demand| **demand != 0.) {
        *hour_demand += hourly_excess;
    }
    debug!(
        warm_days,
        excess, active_hours, hourly_excess, "redistributed heat demand of warm days"
    );

    Ok(adjusted)
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum HeatDemandError {
    #[error("Temperature series has {temperature} values but heat demand series has {demand}")]
    MismatchedSeriesLengths { temperature: usize, demand: usize },
    #[error("Heat demand of {excess} kWh from days at or above {heating_limit_temperature}ºC cannot be redistributed, as no hours with heat demand remain")]
    NoActiveHours {
        excess: f64,
        heating_limit_temperature: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64;
    use rstest::*;

    fn year_of_hours() -> usize {
        (HOURS_PER_DAY * crate::core::units::DAYS_PER_YEAR) as usize
    }

    /// Hourly temperatures following a seasonal swing plus a daily swing, with noise.
    fn random_temperatures(rng: &mut Pcg64, hours: usize) -> Vec<f64> {
        (0..hours)
            .map(|hour| {
                let day = (hour / HOURS_PER_DAY as usize) as f64;
                let seasonal = 10. - 12. * (2. * std::f64::consts::PI * day / 365.).cos();
                let daily =
                    4. * (2. * std::f64::consts::PI * (hour % 24) as f64 / 24.).sin();
                seasonal + daily + rng.random_range(-3.0..3.0)
            })
            .collect()
    }

    /// Hourly demand with a share of hours without any demand.
    fn random_demand(rng: &mut Pcg64, hours: usize) -> Vec<f64> {
        (0..hours)
            .map(|_| {
                if rng.random_bool(0.2) {
                    0.
                } else {
                    rng.random_range(0.0..5.0)
                }
            })
            .collect()
    }

    #[fixture]
    fn rng() -> Pcg64 {
        Pcg64::seed_from_u64(20)
    }

    #[rstest]
    fn should_judge_warm_days_by_daily_mean() {
        let demand = vec![10.; 24];
        let mut temperature = vec![20.; 12];
        temperature.extend(vec![5.; 12]);

        // half the hours are warm but the daily mean of 12.5 stays below the limit
        let adjusted = adjust_heat_demand(&temperature, 15., &demand).unwrap();
        assert_eq!(adjusted, demand);

        // the same pattern over two days, one warm and one cold
        let demand = vec![10.; 48];
        let mut temperature = vec![20.; 24];
        temperature.extend(vec![5.; 24]);

        let adjusted = adjust_heat_demand(&temperature, 15., &demand).unwrap();

        assert_eq!(adjusted[..24], vec![0.; 24][..]);
        assert_eq!(adjusted[24..], vec![20.; 24][..]);
        assert_relative_eq!(adjusted.iter().sum::<f64>(), 480.);
    }

    #[rstest]
    fn should_fail_when_the_only_day_reaches_the_limit() {
        // warm hours only count through the daily mean, here 12.5
        let demand = [10., 10., 10., 10.].repeat(6);
        let mut temperature = vec![20.; 12];
        temperature.extend(vec![5.; 12]);

        let result = adjust_heat_demand(&temperature, 12., &demand);

        assert_eq!(
            result,
            Err(HeatDemandError::NoActiveHours {
                excess: 240.,
                heating_limit_temperature: 12.
            })
        );
    }

    #[rstest]
    fn should_total_excess_of_warm_days_exactly() {
        let mut demand = vec![0.; 72];
        demand[0] = 1e16;
        demand[24] = 1.;
        demand[48] = 1.;
        let temperature = vec![20.; 72];

        assert_eq!(
            adjust_heat_demand(&temperature, 15., &demand),
            Err(HeatDemandError::NoActiveHours {
                excess: 1e16 + 2.,
                heating_limit_temperature: 15.
            })
        );
    }

    #[rstest]
    fn should_treat_daily_mean_equal_to_limit_as_warm() {
        let demand = vec![2.; 48];
        let mut temperature = vec![15.; 24];
        temperature.extend(vec![14.9; 24]);

        let adjusted = adjust_heat_demand(&temperature, 15., &demand).unwrap();

        assert_eq!(adjusted[..24], vec![0.; 24][..]);
        assert_eq!(adjusted[24..], vec![4.; 24][..]);
    }

    #[rstest]
    fn should_not_add_excess_to_hours_without_demand() {
        let mut demand = vec![0.; 24];
        demand.extend(vec![1.; 12]);
        demand.extend(vec![0.; 12]);
        let mut temperature = vec![20.; 24];
        temperature.extend(vec![0.; 24]);
        // warm day contributes 6 kWh
        demand[3] = 6.;

        let adjusted = adjust_heat_demand(&temperature, 15., &demand).unwrap();

        assert_eq!(adjusted[..24], vec![0.; 24][..]);
        assert_eq!(adjusted[24..36], vec![1.5; 12][..]);
        assert_eq!(adjusted[36..], vec![0.; 12][..]);
    }

    #[rstest]
    fn should_leave_demand_unchanged_when_no_day_is_warm() {
        let demand = vec![0., 1., 2., 3.].repeat(12);
        let temperature = vec![-5.; 48];

        let adjusted = adjust_heat_demand(&temperature, 15., &demand).unwrap();

        assert_eq!(adjusted, demand);
    }

    #[rstest]
    fn should_leave_all_zero_demand_unchanged() {
        let demand = vec![0.; 48];
        let temperature = vec![25.; 48];

        assert_eq!(adjust_heat_demand(&temperature, 15., &demand), Ok(demand));
    }

    #[rstest]
    fn should_fail_when_every_day_is_warm() {
        let demand = vec![1.; 48];
        let temperature = vec![25.; 48];

        let result = adjust_heat_demand(&temperature, 15., &demand);

        assert!(matches!(result, Err(HeatDemandError::NoActiveHours { .. })));
    }

    #[rstest]
    fn should_fail_for_mismatched_lengths() {
        assert_eq!(
            adjust_heat_demand(&[1.; 24], 15., &[1.; 23]),
            Err(HeatDemandError::MismatchedSeriesLengths {
                temperature: 24,
                demand: 23
            })
        );
    }

    #[rstest]
    fn should_treat_trailing_partial_day_as_short_day() {
        let mut demand = vec![1.; 24];
        demand.extend(vec![3.; 6]);
        let mut temperature = vec![0.; 24];
        temperature.extend(vec![30.; 6]);

        let adjusted = adjust_heat_demand(&temperature, 15., &demand).unwrap();

        assert_eq!(adjusted.len(), 30);
        assert_eq!(adjusted[24..], vec![0.; 6][..]);
        // 18 kWh from the short day over 24 active hours
        assert_eq!(adjusted[..24], vec![1.75; 24][..]);
    }

    #[rstest]
    #[case(5.)]
    #[case(12.)]
    #[case(15.5)]
    #[case(22.)]
    fn should_conserve_energy_over_a_year(mut rng: Pcg64, #[case] heating_limit_temperature: f64) {
        let hours = year_of_hours();
        let temperature = random_temperatures(&mut rng, hours);
        let demand = random_demand(&mut rng, hours);

        let adjusted = adjust_heat_demand(&temperature, heating_limit_temperature, &demand).unwrap();

        let total_before = demand.iter().sum::<f64>();
        let total_after = adjusted.iter().sum::<f64>();
        assert_relative_eq!(total_after, total_before, max_relative = 1e-9);
    }

    #[rstest]
    #[case(5.)]
    #[case(15.5)]
    fn should_zero_every_warm_day_and_keep_demand_non_negative(
        mut rng: Pcg64,
        #[case] heating_limit_temperature: f64,
    ) {
        let hours = year_of_hours();
        let temperature = random_temperatures(&mut rng, hours);
        let demand = random_demand(&mut rng, hours);

        let adjusted = adjust_heat_demand(&temperature, heating_limit_temperature, &demand).unwrap();

        for (day_idx, mean_temperature) in daily_means(&temperature).into_iter().enumerate() {
            let day = &adjusted[day_idx * 24..(day_idx + 1) * 24];
            if mean_temperature >= heating_limit_temperature {
                assert!(day.iter().all(|demand| *demand == 0.), "day {day_idx} not zeroed");
            }
        }
        assert!(adjusted.iter().all(|demand| *demand >= 0.));
    }

    #[rstest]
    fn should_not_modify_input(mut rng: Pcg64) {
        let temperature = random_temperatures(&mut rng, 24 * 10);
        let demand = random_demand(&mut rng, 24 * 10);
        let snapshot = demand.clone();

        let _ = adjust_heat_demand(&temperature, 10., &demand).unwrap();

        assert_eq!(demand, snapshot);
    }
}
