//! Minting pending operations into a block.

use chainlog_ledger::Ledger;

use crate::theme::Theme;

/// Mint the pending operations of `app` into the next block.
pub(crate) fn mine_block(ledger: &Ledger, app: &str) -> anyhow::Result<()> {
    let block = ledger.mine(app)?;
    let hash = block
        .content_hash
        .map_or_else(|| "-".to_owned(), |h| h.to_string());

    println!(
        "{}",
        Theme::success(&format!(
            "Minted block {} at height {} with {} operation(s)",
            block.id().to_base62(),
            block.height,
            block.data.len()
        ))
    );
    println!("{}", Theme::kv("hash", &hash));
    if let Some(parent) = block.parent_id {
        println!("{}", Theme::kv("parent", &parent.to_base62()));
    } else {
        println!("{}", Theme::kv("parent", "none (genesis)"));
    }
    Ok(())
}
