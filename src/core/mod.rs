mod engine;
mod schedule;
mod simulate;
mod types;

pub use engine::{
    CapitalGainsOutcome, EstimateInputs, EstimateOutcome, OrdinaryTaxOutcome,
    apply_ordinary_loss_offset, apply_pso_exclusion, capital_gains_stack, estimate_federal,
    estimate_state, estimate_with_adjustments, ordinary_tax, resolve_deduction, run_estimate,
    taxable_social_security, validate_inputs,
};
pub use schedule::{
    BracketSchedule, BracketSegment, DeductionConstants, StateConstants, TaxYearTable,
};
pub use simulate::{ConversionSweepConfig, sweep_roth_conversions};
pub use types::{
    BreakdownLine, CarryoverPath, ConversionPoint, FederalResult, FilerAges, IncomeSnapshot,
    StateResult,
};
