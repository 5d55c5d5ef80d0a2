#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BracketSegment {
    pub lower: f64,
    pub upper: f64,
    pub rate: f64,
}

impl BracketSegment {
    pub fn label(&self) -> String {
        let pct = self.rate * 100.0;
        if (pct - pct.round()).abs() < 1e-9 {
            format!("{:.0}%", pct)
        } else {
            format!("{:.2}%", pct)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BracketSchedule {
    segments: Vec<BracketSegment>,
}

impl BracketSchedule {
    pub fn new(segments: Vec<BracketSegment>) -> Result<Self, String> {
        if segments.is_empty() {
            return Err("bracket schedule must contain at least one segment".to_string());
        }
        if segments[0].lower != 0.0 {
            return Err("bracket schedule must start at a lower bound of 0".to_string());
        }
        for (idx, segment) in segments.iter().enumerate() {
            if !segment.lower.is_finite() {
                return Err(format!("bracket segment {idx} lower bound must be finite"));
            }
            if segment.upper <= segment.lower {
                return Err(format!(
                    "bracket segment {idx} upper bound must exceed its lower bound"
                ));
            }
            if !(0.0..=1.0).contains(&segment.rate) {
                return Err(format!("bracket segment {idx} rate must be between 0 and 1"));
            }
            if idx > 0 {
                let prev = segments[idx - 1];
                if segment.lower != prev.upper {
                    return Err(format!(
                        "bracket segment {idx} must start where segment {} ends",
                        idx - 1
                    ));
                }
                if segment.rate < prev.rate {
                    return Err(format!("bracket segment {idx} rate must not decrease"));
                }
            }
        }
        if segments[segments.len() - 1].upper != f64::INFINITY {
            return Err("final bracket segment upper bound must be infinite".to_string());
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[BracketSegment] {
        &self.segments
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeductionConstants {
    pub base: f64,
    pub senior_bonus: f64,
    pub senior_bonus_phase_start: f64,
    pub senior_bonus_phase_end: f64,
    pub senior_bonus_phase_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateConstants {
    pub flat_rate: f64,
    pub per_filer_exemption: f64,
    pub resident_credit_cap: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxYearTable {
    pub year: u16,
    pub ordinary: BracketSchedule,
    pub capital_gains: BracketSchedule,
    pub deduction: DeductionConstants,
    pub provisional_income_base: f64,
    pub provisional_income_upper: f64,
    pub pso_exclusion_cap: f64,
    pub ordinary_loss_offset_cap: f64,
    pub state: StateConstants,
}

impl TaxYearTable {
    pub fn for_year(year: u16) -> Result<Self, String> {
        match year {
            2025 => Ok(Self::mfj_2025()),
            _ => Err(format!("tax year {year} is not supported")),
        }
    }

    pub fn mfj_2025() -> Self {
        Self {
            year: 2025,
            ordinary: BracketSchedule {
                segments: vec![
                    seg(0.0, 23_850.0, 0.10),
                    seg(23_850.0, 96_950.0, 0.12),
                    seg(96_950.0, 206_700.0, 0.22),
                    seg(206_700.0, 394_600.0, 0.24),
                    seg(394_600.0, 501_050.0, 0.32),
                    seg(501_050.0, 751_600.0, 0.35),
                    seg(751_600.0, f64::INFINITY, 0.37),
                ],
            },
            capital_gains: BracketSchedule {
                segments: vec![
                    seg(0.0, 96_700.0, 0.0),
                    seg(96_700.0, 600_050.0, 0.15),
                    seg(600_050.0, f64::INFINITY, 0.20),
                ],
            },
            deduction: DeductionConstants {
                base: 31_500.0,
                senior_bonus: 6_000.0,
                senior_bonus_phase_start: 150_000.0,
                senior_bonus_phase_end: 250_000.0,
                senior_bonus_phase_rate: 0.06,
            },
            provisional_income_base: 32_000.0,
            provisional_income_upper: 44_000.0,
            pso_exclusion_cap: 3_000.0,
            ordinary_loss_offset_cap: 3_000.0,
            state: StateConstants {
                flat_rate: 0.0495,
                per_filer_exemption: 2_775.0,
                resident_credit_cap: 300.0,
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.deduction.base.is_finite() || self.deduction.base < 0.0 {
            return Err("base deduction must be >= 0".to_string());
        }
        if !self.deduction.senior_bonus.is_finite() || self.deduction.senior_bonus < 0.0 {
            return Err("senior bonus deduction must be >= 0".to_string());
        }
        if self.deduction.senior_bonus_phase_end < self.deduction.senior_bonus_phase_start {
            return Err("senior bonus phase end must be >= phase start".to_string());
        }
        if !self.deduction.senior_bonus_phase_rate.is_finite()
            || self.deduction.senior_bonus_phase_rate < 0.0
        {
            return Err("senior bonus phase rate must be >= 0".to_string());
        }
        if self.provisional_income_upper < self.provisional_income_base {
            return Err("provisional income upper threshold must be >= base threshold".to_string());
        }
        if self.pso_exclusion_cap < 0.0 {
            return Err("PSO exclusion cap must be >= 0".to_string());
        }
        if self.ordinary_loss_offset_cap < 0.0 {
            return Err("ordinary loss offset cap must be >= 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.state.flat_rate) {
            return Err("state flat rate must be between 0 and 1".to_string());
        }
        if self.state.per_filer_exemption < 0.0 {
            return Err("state per-filer exemption must be >= 0".to_string());
        }
        if self.state.resident_credit_cap < 0.0 {
            return Err("state resident credit cap must be >= 0".to_string());
        }
        Ok(())
    }
}

fn seg(lower: f64, upper: f64, rate: f64) -> BracketSegment {
    BracketSegment { lower, upper, rate }
}
