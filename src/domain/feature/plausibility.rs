//! Non-blocking sanity checks on clinical input values

use super::ReconciledInput;

/// Warnings for implausible values in one row; never rejects input
pub fn plausibility_warnings(input: &ReconciledInput, row: usize) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some(chol) = input.value(row, "chol") {
        if chol > 600.0 {
            warnings.push(format!("chol {} looks extremely high (> 600 mg/dl)", chol));
        }
    }

    if let Some(trtbps) = input.value(row, "trtbps") {
        if !(70.0..=250.0).contains(&trtbps) {
            warnings.push(format!("trtbps {} is outside the plausible range 70-250", trtbps));
        }
    }

    if let Some(thalachh) = input.value(row, "thalachh") {
        if !(50.0..=230.0).contains(&thalachh) {
            warnings.push(format!(
                "thalachh {} is outside the usual range 50-230",
                thalachh
            ));
        }
    }

    if let Some(oldpeak) = input.value(row, "oldpeak") {
        if !(0.0..=10.0).contains(&oldpeak) {
            warnings.push(format!("oldpeak {} is outside the range 0-10", oldpeak));
        }
    }

    warnings
}
