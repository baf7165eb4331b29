use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::Sender;
use tokio::time::sleep;

use crate::config::CONFIG;
use crate::influx::{DataPoint, FieldValue};

pub mod client;
pub mod energy;
pub mod parser;
pub mod structs;

use client::{FetchError, RemoClient};
use energy::{calculate_energy_difference, DeltaState, EnergyError};
use parser::ParseError;
use structs::EchonetLiteValue;

const MEASUREMENT: &str = "EchonetLite";

/// Anything that can end a poll cycle early. The loop itself never exits on
/// these, the next cycle starts after the configured delay.
#[derive(Error, Debug)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Energy(#[from] EnergyError),
    #[error("Sink channel closed")]
    SinkClosed,
}

/// Build the six raw data points of one poll. The unit code travels as a
/// string field, everything else as numbers.
pub fn raw_points(value: &EchonetLiteValue, timestamp: i64) -> Vec<DataPoint> {
    return vec![
        DataPoint::new(MEASUREMENT, "Coefficient",
            FieldValue::Integer(value.coefficient), Vec::new(), timestamp),
        DataPoint::new(MEASUREMENT, "CumulativeElectricEnergyEffectiveDigits",
            FieldValue::Integer(value.effective_digits), Vec::new(), timestamp),
        DataPoint::new(MEASUREMENT, "NormalDirectionCumulativeElectricEnergy",
            FieldValue::Float(value.normal_direction_cumulative_energy), Vec::new(), timestamp),
        DataPoint::new(MEASUREMENT, "CumulativeElectricEnergyUnit",
            FieldValue::Text(value.cumulative_energy_unit.clone()), Vec::new(), timestamp),
        DataPoint::new(MEASUREMENT, "ReverseDirectionCumulativeElectricEnergy",
            FieldValue::Float(value.reverse_direction_cumulative_energy), Vec::new(), timestamp),
        DataPoint::new(MEASUREMENT, "MeasuredInstantaneous",
            FieldValue::Float(value.measured_instantaneous), Vec::new(), timestamp),
    ];
}

pub struct RemoManager {
    sender: Sender<DataPoint>,
    client: RemoClient,
    state: DeltaState,
    interval: Duration,
}

impl RemoManager {
    pub fn new(sender: Sender<DataPoint>) -> Result<Self, FetchError> {
        let conf = CONFIG.remo.clone();
        let client = RemoClient::new(&conf.api_url, &conf.access_token)?;

        return Ok(RemoManager {
            sender,
            client,
            state: DeltaState::new(),
            interval: Duration::from_secs(conf.interval),
        });
    }

    pub async fn start_thread(&mut self) {
        info!("Starting Nature Remo polling, one cycle every {:?}", self.interval);

        loop {
            let now = Utc::now();

            match self.run_cycle(now).await {
                Ok(_) => {},
                Err(CycleError::Fetch(e)) => {
                    warn!("Failed to get api result: {e}");
                },
                Err(CycleError::Parse(e @ ParseError::NumericParseFailed(_, _))) => {
                    error!("An error occurred while processing: {e}");
                },
                Err(CycleError::Parse(e)) => {
                    warn!("Failed to deserialize smart meter: {e}");
                },
                Err(e) => {
                    error!("An error occurred while processing: {e}");
                },
            }

            sleep(self.interval).await;
        }
    }

    async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<(), CycleError> {
        let body = self.client.get_appliances().await?;
        let meter = parser::smart_meter_from_response(&body)?;
        let value = parser::extract_values(&meter.echonetlite_properties)?;

        /* All raw fields go out every cycle regardless of the hourly gate */
        let timestamp = now.timestamp();
        for point in raw_points(&value, timestamp) {
            self.send(point).await?;
        }

        if !self.state.is_seeded() {
            debug!("First sample observed, seeding the energy baseline");
            self.state.seed(now, value.normal_direction_cumulative_energy);
            return Ok(());
        }

        if self.state.delta_due(now) {
            let difference = calculate_energy_difference(
                value.normal_direction_cumulative_energy,
                self.state.previous_energy(),
                value.effective_digits,
                value.coefficient,
                &value.cumulative_energy_unit,
            )?;

            self.send(DataPoint::new(
                MEASUREMENT,
                "EnergyDifference",
                FieldValue::Float(difference),
                Vec::new(),
                timestamp,
            )).await?;

            self.state.commit(now, value.normal_direction_cumulative_energy);
            info!("Energy difference of {difference} kWh sent");
        }

        return Ok(());
    }

    async fn send(&self, point: DataPoint) -> Result<(), CycleError> {
        return self.sender.send(point).await.map_err(|_| CycleError::SinkClosed);
    }
}
