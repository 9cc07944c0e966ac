//! Read-only views of chains and blocks.

use anyhow::Context;
use chainlog_core::BlockId;
use chainlog_ledger::{Block, Ledger};
use colored::Colorize;

use crate::theme::Theme;

/// List every chain.
pub(crate) fn list_chains(ledger: &Ledger) -> anyhow::Result<()> {
    let chains = ledger.list_chains()?;
    if chains.is_empty() {
        println!("{}", Theme::info("No chains yet"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Chains"));
    println!(
        "{:<20} {:>7} {:<10} {}",
        "APP".dimmed(),
        "BLOCKS".dimmed(),
        "HEAD".dimmed(),
        "PENDING".dimmed()
    );
    println!("{}", Theme::separator());
    for chain in &chains {
        let head = chain
            .head_block_id
            .map_or_else(|| "-".to_owned(), |id| Theme::short_id(&id.to_base62()));
        let pending = ledger.operations().count_pending(&chain.app_name)?;
        println!(
            "{:<20} {:>7} {:<10} {}",
            chain.app_name, chain.block_count, head, pending
        );
    }
    println!();
    Ok(())
}

/// List the blocks of a chain, genesis first.
pub(crate) fn list_blocks(ledger: &Ledger, app: &str) -> anyhow::Result<()> {
    let blocks = ledger.blocks(app)?;
    if blocks.is_empty() {
        println!("{}", Theme::info(&format!("No blocks for {app}")));
        return Ok(());
    }

    println!("\n{}", Theme::header(&format!("Blocks: {app}")));
    println!(
        "{:>6} {:<10} {:<19} {:>4} {}",
        "HEIGHT".dimmed(),
        "BLOCK".dimmed(),
        "MINTED".dimmed(),
        "OPS".dimmed(),
        "HASH".dimmed()
    );
    println!("{}", Theme::separator());
    for block in &blocks {
        let minted = block
            .minted_at
            .as_ref()
            .map_or_else(|| "-".to_owned(), Theme::timestamp);
        let hash = block
            .content_hash
            .map_or_else(|| "-".to_owned(), |h| h.to_string());
        println!(
            "{:>6} {:<10} {} {:>4} {}",
            block.height,
            Theme::short_id(&block.id().to_base62()),
            minted,
            block.data.len(),
            hash.dimmed()
        );
    }
    println!();
    Ok(())
}

/// Show one block with its operations.
pub(crate) fn show_block(ledger: &Ledger, id: BlockId, json: bool) -> anyhow::Result<()> {
    let block = ledger
        .get_block(&id)?
        .with_context(|| format!("block {} not found", id.to_base62()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&block)?);
        return Ok(());
    }

    print_block(&block);
    Ok(())
}

fn print_block(block: &Block) {
    println!("\n{}", Theme::header(&format!("Block {}", block.id().to_base62())));
    println!("{}", Theme::kv("uuid", &block.id().0.to_string()));
    println!("{}", Theme::kv("app", &block.app_name));
    println!("{}", Theme::kv("height", &block.height.to_string()));
    println!(
        "{}",
        Theme::kv(
            "parent",
            &block
                .parent_id
                .map_or_else(|| "none (genesis)".to_owned(), |p| p.to_base62())
        )
    );
    if let Some(hash) = block.content_hash {
        println!("{}", Theme::kv("hash", &hash.to_string()));
    }
    if let Some(minted) = &block.minted_at {
        println!("{}", Theme::kv("minted", &Theme::timestamp(minted)));
    }

    println!("\n{}", Theme::header("Operations"));
    if block.data.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for record in &block.data {
        println!(
            "  {:>6} {} {} {}",
            record.sequence,
            Theme::action(record.action),
            record.model,
            Theme::short_id(&record.target_node_id.to_base62())
        );
        for (field, value) in &record.values {
            println!("         {} = {value}", field.dimmed());
        }
    }
    println!();
}
