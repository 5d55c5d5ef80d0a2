use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IncomeSnapshot {
    pub ira_withdrawals: f64,
    pub roth_conversions: f64,
    pub pension: f64,
    pub tsp: f64,
    pub annuity: f64,
    pub interest: f64,
    pub ordinary_dividends: f64,
    pub qualified_dividends: f64,
    pub capital_gains: f64,
    pub social_security: f64,
}

impl IncomeSnapshot {
    pub fn categories(&self) -> [(&'static str, f64); 10] {
        [
            ("IRA Withdrawals", self.ira_withdrawals),
            ("Roth Conversions", self.roth_conversions),
            ("Pension", self.pension),
            ("TSP", self.tsp),
            ("Annuity", self.annuity),
            ("Interest", self.interest),
            ("Ordinary Dividends", self.ordinary_dividends),
            ("Qualified Dividends", self.qualified_dividends),
            ("Capital Gains", self.capital_gains),
            ("Social Security", self.social_security),
        ]
    }

    pub fn total(&self) -> f64 {
        self.categories().iter().map(|&(_, value)| value).sum()
    }

    pub fn ordinary_income(&self) -> f64 {
        self.ira_withdrawals
            + self.roth_conversions
            + self.pension
            + self.tsp
            + self.annuity
            + self.interest
            + self.ordinary_dividends
    }

    pub fn retirement_income(&self) -> f64 {
        self.ira_withdrawals + self.roth_conversions + self.pension + self.tsp + self.annuity
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in self.categories() {
            if !value.is_finite() {
                return Err(format!("{name} must be a finite amount"));
            }
            if value < 0.0 {
                return Err(format!("{name} must be >= 0"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilerAges {
    pub filer_one: u32,
    pub filer_two: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CarryoverPath {
    Gains,
    OrdinaryIncome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakdownLine {
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederalResult {
    pub total_income: f64,
    pub deduction: f64,
    pub taxable_income: f64,
    pub ordinary_tax: f64,
    pub capital_gains_tax: f64,
    pub total_tax: f64,
    pub effective_rate: f64,
    pub bracket_breakdown: Vec<BreakdownLine>,
    pub capital_gains_breakdown: Vec<BreakdownLine>,
    pub taxed_retirement: f64,
    pub taxed_social_security: f64,
    pub loss_carryover_remaining: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateResult {
    pub taxable_income: f64,
    pub tax_due: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionPoint {
    pub conversion: f64,
    pub total_tax: f64,
}
