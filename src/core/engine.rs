use super::schedule::{BracketSchedule, DeductionConstants, TaxYearTable};
use super::types::{
    BreakdownLine, CarryoverPath, FederalResult, FilerAges, IncomeSnapshot, StateResult,
};

const SENIOR_AGE: u32 = 65;
const MFJ_FILER_COUNT: f64 = 2.0;
const STATE_LOSS_DEDUCTION_CAP: f64 = 3_000.0;

#[derive(Debug, Clone, Copy)]
pub struct EstimateInputs {
    pub income: IncomeSnapshot,
    pub ages: FilerAges,
    pub capital_loss_carryover: f64,
    pub pso_eligible: bool,
    pub resident_tax_credit: f64,
    pub carryover_path: CarryoverPath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EstimateOutcome {
    pub federal: FederalResult,
    pub state: StateResult,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrdinaryTaxOutcome {
    pub total: f64,
    pub breakdown: Vec<BreakdownLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapitalGainsOutcome {
    pub total: f64,
    pub breakdown: Vec<BreakdownLine>,
    pub remaining_loss: f64,
}

pub fn validate_inputs(inputs: &EstimateInputs) -> Result<(), String> {
    inputs.income.validate()?;
    if !inputs.capital_loss_carryover.is_finite() || inputs.capital_loss_carryover < 0.0 {
        return Err("Capital Loss Carryover must be >= 0".to_string());
    }
    if !inputs.resident_tax_credit.is_finite() || inputs.resident_tax_credit < 0.0 {
        return Err("Resident Tax Credit must be >= 0".to_string());
    }
    Ok(())
}

pub fn resolve_deduction(
    ages: FilerAges,
    snapshot: &IncomeSnapshot,
    constants: &DeductionConstants,
) -> f64 {
    let qualifying = [ages.filer_one, ages.filer_two]
        .iter()
        .filter(|&&age| age >= SENIOR_AGE)
        .count() as f64;
    constants.base + qualifying * senior_bonus(snapshot.total(), constants)
}

// Single linear ramp; the zero floor ends the phase-out, not phase_end.
fn senior_bonus(magi: f64, constants: &DeductionConstants) -> f64 {
    if magi <= constants.senior_bonus_phase_start {
        return constants.senior_bonus;
    }
    let reduction = (magi - constants.senior_bonus_phase_start) * constants.senior_bonus_phase_rate;
    (constants.senior_bonus - reduction).max(0.0)
}

pub fn taxable_social_security(
    ordinary_income: f64,
    benefit: f64,
    qualified_dividends: f64,
    capital_gains: f64,
    table: &TaxYearTable,
) -> f64 {
    let provisional = ordinary_income + 0.5 * benefit + qualified_dividends + capital_gains;
    let ceiling = 0.85 * benefit;
    let taxable = if provisional <= table.provisional_income_base {
        0.0
    } else if provisional <= table.provisional_income_upper {
        0.5 * (provisional - table.provisional_income_base)
    } else {
        ceiling
    };
    taxable.min(ceiling)
}

pub fn ordinary_tax(taxable_income: f64, schedule: &BracketSchedule) -> OrdinaryTaxOutcome {
    let taxable = taxable_income.max(0.0);
    let mut total = 0.0;
    let mut breakdown = Vec::new();
    for segment in schedule.segments() {
        if taxable <= segment.lower {
            break;
        }
        let amount = (taxable.min(segment.upper) - segment.lower) * segment.rate;
        total += amount;
        breakdown.push(BreakdownLine {
            label: segment.label(),
            amount: round_to_cents(amount),
        });
    }
    OrdinaryTaxOutcome {
        total: round_to_cents(total),
        breakdown,
    }
}

pub fn capital_gains_stack(
    qualified_dividends: f64,
    capital_gains: f64,
    loss_carryover: f64,
    taxable_income: f64,
    schedule: &BracketSchedule,
) -> CapitalGainsOutcome {
    let offset = capital_gains.min(loss_carryover).max(0.0);
    let adjusted_gains = (capital_gains - offset).max(0.0);
    let remaining_loss = (loss_carryover - offset).max(0.0);

    // Preferential income fills the space immediately above ordinary taxable income.
    let floor = taxable_income.max(0.0);
    let mut base = adjusted_gains + qualified_dividends;
    let mut total = 0.0;
    let mut breakdown = Vec::new();
    for segment in schedule.segments() {
        if base <= 0.0 {
            break;
        }
        let start = segment.lower.max(floor);
        if segment.upper <= start {
            continue;
        }
        let taxed = base.min(segment.upper - start);
        let amount = taxed * segment.rate;
        total += amount;
        base -= taxed;
        breakdown.push(BreakdownLine {
            label: segment.label(),
            amount: round_to_cents(amount),
        });
    }
    CapitalGainsOutcome {
        total: round_to_cents(total),
        breakdown,
        remaining_loss,
    }
}

pub fn apply_pso_exclusion(snapshot: IncomeSnapshot, cap: f64) -> IncomeSnapshot {
    let mut adjusted = snapshot;
    let from_pension = adjusted.pension.min(cap).max(0.0);
    adjusted.pension -= from_pension;
    let from_annuity = adjusted.annuity.min(cap - from_pension).max(0.0);
    adjusted.annuity -= from_annuity;
    adjusted
}

pub fn apply_ordinary_loss_offset(
    snapshot: IncomeSnapshot,
    loss_carryover: f64,
    cap: f64,
) -> (IncomeSnapshot, f64) {
    let mut adjusted = snapshot;
    let mut remaining = loss_carryover.min(cap).max(0.0);
    let mut consumed = 0.0;
    for balance in [
        &mut adjusted.interest,
        &mut adjusted.pension,
        &mut adjusted.annuity,
    ] {
        if remaining <= 0.0 {
            break;
        }
        let used = balance.min(remaining);
        *balance -= used;
        remaining -= used;
        consumed += used;
    }
    (adjusted, consumed)
}

pub fn estimate_federal(
    snapshot: &IncomeSnapshot,
    ages: FilerAges,
    loss_carryover: f64,
    table: &TaxYearTable,
) -> FederalResult {
    let deduction = resolve_deduction(ages, snapshot, &table.deduction);
    let ordinary_income = snapshot.ordinary_income();
    let taxed_social_security = taxable_social_security(
        ordinary_income,
        snapshot.social_security,
        snapshot.qualified_dividends,
        snapshot.capital_gains,
        table,
    );
    let taxable_income = (ordinary_income + taxed_social_security - deduction).max(0.0);
    let ordinary = ordinary_tax(taxable_income, &table.ordinary);
    let gains = capital_gains_stack(
        snapshot.qualified_dividends,
        snapshot.capital_gains,
        loss_carryover,
        taxable_income,
        &table.capital_gains,
    );

    let total_income = snapshot.total();
    let total_tax = round_to_cents(ordinary.total + gains.total);
    let effective_rate = if total_income > 0.0 {
        total_tax / total_income
    } else {
        0.0
    };

    FederalResult {
        total_income: round_to_cents(total_income),
        deduction: round_to_cents(deduction),
        taxable_income: round_to_cents(taxable_income),
        ordinary_tax: ordinary.total,
        capital_gains_tax: gains.total,
        total_tax,
        effective_rate,
        bracket_breakdown: ordinary.breakdown,
        capital_gains_breakdown: gains.breakdown,
        taxed_retirement: round_to_cents(snapshot.retirement_income()),
        taxed_social_security: round_to_cents(taxed_social_security),
        loss_carryover_remaining: round_to_cents(gains.remaining_loss),
    }
}

pub fn estimate_with_adjustments(inputs: &EstimateInputs, table: &TaxYearTable) -> FederalResult {
    let mut working = inputs.income;
    if inputs.pso_eligible {
        working = apply_pso_exclusion(working, table.pso_exclusion_cap);
    }

    match inputs.carryover_path {
        CarryoverPath::Gains => {
            estimate_federal(&working, inputs.ages, inputs.capital_loss_carryover, table)
        }
        CarryoverPath::OrdinaryIncome => {
            let (adjusted, consumed) = apply_ordinary_loss_offset(
                working,
                inputs.capital_loss_carryover,
                table.ordinary_loss_offset_cap,
            );
            // The gains calculator saw no carryover on this path; remaining
            // reflects the ordinary-income offset alone.
            let mut federal = estimate_federal(&adjusted, inputs.ages, 0.0, table);
            federal.loss_carryover_remaining =
                round_to_cents((inputs.capital_loss_carryover - consumed).max(0.0));
            federal
        }
    }
}

pub fn estimate_state(
    federal: &FederalResult,
    resident_tax_credit: f64,
    table: &TaxYearTable,
) -> StateResult {
    let retirement_subtraction = federal.taxed_retirement + federal.taxed_social_security;
    let loss_subtraction = federal
        .loss_carryover_remaining
        .min(STATE_LOSS_DEDUCTION_CAP);
    let taxable_income = (federal.taxable_income
        - retirement_subtraction
        - MFJ_FILER_COUNT * table.state.per_filer_exemption
        - loss_subtraction)
        .max(0.0);
    let credit = resident_tax_credit.min(table.state.resident_credit_cap);
    let tax_due = (taxable_income * table.state.flat_rate - credit).max(0.0);
    StateResult {
        taxable_income: round_to_cents(taxable_income),
        tax_due: round_to_cents(tax_due),
    }
}

pub fn run_estimate(
    inputs: &EstimateInputs,
    table: &TaxYearTable,
) -> Result<EstimateOutcome, String> {
    validate_inputs(inputs)?;
    table.validate()?;

    let federal = estimate_with_adjustments(inputs, table);
    let state = estimate_state(&federal, inputs.resident_tax_credit, table);
    Ok(EstimateOutcome { federal, state })
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
