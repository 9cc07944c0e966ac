//! Chain verification.

use anyhow::bail;
use chainlog_ledger::{ChainVerificationResult, Ledger};

use crate::theme::Theme;

/// Verify one chain, or every chain when `app` is `None`.
///
/// Fails when any chain has issues.
pub(crate) fn verify_chains(ledger: &Ledger, app: Option<&str>) -> anyhow::Result<()> {
    let results = match app {
        Some(app) => vec![(app.to_owned(), ledger.verify_chain(app)?)],
        None => ledger.verify_all()?,
    };

    if results.is_empty() {
        println!("{}", Theme::info("No chains to verify"));
        return Ok(());
    }

    let invalid: Vec<&(String, ChainVerificationResult)> =
        results.iter().filter(|(_, r)| !r.valid).collect();
    for (app, result) in &results {
        if result.valid {
            println!(
                "{}",
                Theme::success(&format!(
                    "{app}: {} block(s), {} operation(s), no issues",
                    result.blocks_verified, result.operations_verified
                ))
            );
        }
    }
    for (app, result) in &invalid {
        println!(
            "{}",
            Theme::error(&format!("{app} has {} issue(s):", result.issues.len()))
        );
        for issue in &result.issues {
            println!("  - {issue}");
        }
    }

    if invalid.is_empty() {
        Ok(())
    } else {
        println!(
            "{}",
            Theme::warning(&format!(
                "{}/{} chains valid",
                results.len().saturating_sub(invalid.len()),
                results.len()
            ))
        );
        bail!("{} chain(s) failed verification", invalid.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainlog_core::NodeId;
    use chainlog_ledger::{Action, NewOperation};

    #[test]
    fn test_verify_valid_chains() {
        let ledger = Ledger::in_memory();
        for app in ["shop", "billing"] {
            ledger
                .operations()
                .append_new(NewOperation::new(
                    app,
                    format!("{app}:record"),
                    Action::Insert,
                    NodeId::new(),
                ))
                .unwrap();
            ledger.mine(app).unwrap();
        }

        verify_chains(&ledger, None).unwrap();
        verify_chains(&ledger, Some("shop")).unwrap();
    }

    #[test]
    fn test_verify_empty_ledger() {
        verify_chains(&Ledger::in_memory(), None).unwrap();
    }
}
