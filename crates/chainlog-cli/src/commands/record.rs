//! Capturing operations by hand and listing pending ones.

use anyhow::{Context, bail};
use chainlog_core::NodeId;
use chainlog_ledger::{Action, FieldValues, Ledger, NewOperation, ScalarValue};
use colored::Colorize;

use crate::theme::Theme;

/// Parse `--values` JSON into capturable field values.
///
/// The input must be an object whose members are integers that fit `i64`,
/// finite floats or strings.
pub(crate) fn parse_values(json: &str) -> anyhow::Result<FieldValues> {
    let parsed: serde_json::Value = serde_json::from_str(json).context("--values is not JSON")?;
    let serde_json::Value::Object(members) = parsed else {
        bail!("--values must be a JSON object");
    };

    members
        .into_iter()
        .map(|(field, value)| {
            let scalar = match &value {
                serde_json::Value::Number(n) if n.is_f64() => {
                    n.as_f64().and_then(ScalarValue::float)
                },
                // Integers beyond i64 are rejected rather than rounded.
                serde_json::Value::Number(n) => n.as_i64().map(ScalarValue::Integer),
                serde_json::Value::String(s) => Some(ScalarValue::Text(s.clone())),
                _ => None,
            };
            scalar
                .map(|s| (field.clone(), s))
                .with_context(|| format!("field '{field}': {value} is not an integer, float or string"))
        })
        .collect()
}

/// Append one operation to the log.
pub(crate) fn record_operation(
    ledger: &Ledger,
    app: &str,
    model: &str,
    action: Action,
    target: NodeId,
    values: Option<&str>,
) -> anyhow::Result<()> {
    let values = values.map(parse_values).transpose()?.unwrap_or_default();
    let op = ledger
        .operations()
        .append_new(NewOperation::new(app, model, action, target).with_values(values))?;

    println!(
        "{}",
        Theme::success(&format!(
            "Recorded {} {} on {} (sequence {})",
            op.action,
            op.model,
            op.target_node_id.to_base62(),
            op.sequence
        ))
    );
    println!("{}", Theme::kv("operation", &op.id().to_base62()));
    Ok(())
}

/// List operations waiting for the next mint.
pub(crate) fn list_pending(ledger: &Ledger, app: &str) -> anyhow::Result<()> {
    let pending = ledger.operations().pending_for(app)?;
    if pending.is_empty() {
        println!("{}", Theme::info(&format!("No pending operations for {app}")));
        return Ok(());
    }

    println!("\n{}", Theme::header(&format!("Pending operations: {app}")));
    println!(
        "{:>6} {:<19} {:<6} {:<20} {}",
        "SEQ".dimmed(),
        "CREATED".dimmed(),
        "ACTION".dimmed(),
        "MODEL".dimmed(),
        "TARGET".dimmed()
    );
    println!("{}", Theme::separator());
    for op in &pending {
        println!(
            "{:>6} {} {} {:<20} {}",
            op.sequence,
            Theme::timestamp(&op.created_at()),
            Theme::action(op.action),
            op.model,
            Theme::short_id(&op.target_node_id.to_base62())
        );
    }
    println!("\n{} pending", pending.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_values() {
        let values = parse_values(r#"{"total": 9.99, "qty": 3, "note": "gift"}"#).unwrap();
        assert_eq!(values.get("total"), Some(&ScalarValue::Float(9.99)));
        assert_eq!(values.get("qty"), Some(&ScalarValue::Integer(3)));
        assert_eq!(values.get("note"), Some(&ScalarValue::Text("gift".into())));
    }

    #[test]
    fn test_parse_values_rejects_non_scalars() {
        assert!(parse_values(r#"{"paid": true}"#).is_err());
        assert!(parse_values(r#"{"tags": ["a"]}"#).is_err());
        assert!(parse_values(r#"{"gone": null}"#).is_err());
        assert!(parse_values("[1, 2]").is_err());
        assert!(parse_values("{").is_err());
    }

    #[test]
    fn test_parse_values_rejects_integers_beyond_i64() {
        let err = parse_values(r#"{"big": 18446744073709551615}"#).unwrap_err();
        assert!(err.to_string().contains("big"));

        let values = parse_values(r#"{"max": 9223372036854775807, "exp": 1e3}"#).unwrap();
        assert_eq!(values.get("max"), Some(&ScalarValue::Integer(i64::MAX)));
        assert_eq!(values.get("exp"), Some(&ScalarValue::Float(1000.0)));
    }

    #[test]
    fn test_record_then_pending() {
        let ledger = Ledger::in_memory();
        let target = NodeId::from_u128(1);
        record_operation(
            &ledger,
            "shop",
            "shop:order",
            Action::Insert,
            target,
            Some(r#"{"total": 9.99}"#),
        )
        .unwrap();

        let pending = ledger.operations().pending_for("shop").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].target_node_id, target);
        list_pending(&ledger, "shop").unwrap();
    }

    #[test]
    fn test_delete_with_values_refused() {
        let ledger = Ledger::in_memory();
        let result = record_operation(
            &ledger,
            "shop",
            "shop:order",
            Action::Delete,
            NodeId::new(),
            Some(r#"{"total": 1}"#),
        );
        assert!(result.is_err());
        assert_eq!(ledger.operations().count_pending("shop").unwrap(), 0);
    }
}
