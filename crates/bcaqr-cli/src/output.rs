//! Console rendering for command results.

use bcaqr_core::Transaction;

const RULE: &str = "============================================";

/// Render a day's transactions as a numbered list with a total.
pub fn render_transactions(date: &str, transactions: &[Transaction]) -> String {
    let mut out = format!("\nTransactions for {}:\n{}\n", date, RULE);

    if transactions.is_empty() {
        out.push_str("No transactions found\n");
        return out;
    }

    for (i, tx) in transactions.iter().enumerate() {
        out.push_str(&format!("\n#{}\n", i + 1));
        out.push_str(&format!("  From:   {}\n", tx.from));
        out.push_str(&format!("  Amount: Rp {}\n", tx.amount));
        out.push_str(&format!("  Time:   {}\n", tx.time));
        if let Some(ref rrn) = tx.rrn {
            out.push_str(&format!("  RRN:    {}\n", rrn));
        }
    }

    out.push_str(&format!("\n{}\n", RULE));
    out.push_str(&format!("Total: {} transactions\n", transactions.len()));
    out
}

/// Format a remaining duration as `Xh Ym`.
pub fn format_remaining(remaining: chrono::Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}
