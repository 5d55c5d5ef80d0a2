use super::engine::{EstimateInputs, estimate_with_adjustments, validate_inputs};
use super::schedule::TaxYearTable;
use super::types::ConversionPoint;

const MAX_SWEEP_POINTS: usize = 2_000;

#[derive(Debug, Clone, Copy)]
pub struct ConversionSweepConfig {
    pub max_conversion: f64,
    pub step: f64,
}

impl Default for ConversionSweepConfig {
    fn default() -> Self {
        Self {
            max_conversion: 100_000.0,
            step: 5_000.0,
        }
    }
}

pub fn sweep_roth_conversions(
    inputs: &EstimateInputs,
    config: ConversionSweepConfig,
    table: &TaxYearTable,
) -> Result<Vec<ConversionPoint>, String> {
    validate_inputs(inputs)?;
    table.validate()?;
    validate_config(config)?;

    let steps = (config.max_conversion / config.step + 1e-9).floor() as usize;
    if steps >= MAX_SWEEP_POINTS {
        return Err(format!(
            "conversion sweep is limited to {MAX_SWEEP_POINTS} points; raise the step size"
        ));
    }

    let mut curve = Vec::with_capacity(steps + 1);
    for index in 0..=steps {
        let conversion = index as f64 * config.step;
        let mut step_inputs = *inputs;
        step_inputs.income.roth_conversions = conversion;
        let federal = estimate_with_adjustments(&step_inputs, table);
        curve.push(ConversionPoint {
            conversion,
            total_tax: federal.total_tax,
        });
    }
    Ok(curve)
}

fn validate_config(config: ConversionSweepConfig) -> Result<(), String> {
    if !config.max_conversion.is_finite() || config.max_conversion < 0.0 {
        return Err("max_conversion must be >= 0".to_string());
    }
    if !config.step.is_finite() || config.step <= 0.0 {
        return Err("conversion step must be > 0".to_string());
    }
    Ok(())
}
