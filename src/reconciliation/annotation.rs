//! The memo annotation grammar tying ledger splits to bank transactions.
//!
//! A matched or created split records its origin as plain memo text:
//! `TXID: <id>; TXNAME: <description>;`. This is the only durable correlation
//! between a downloaded record and a ledger split, so the format must stay
//! byte-compatible with memos written by earlier runs. Values run from the
//! tag to the next `;` or the end of the string.

const TXID_TAG: &str = "TXID: ";
const TXNAME_TAG: &str = "TXNAME: ";

/// Render the annotation pair for a record.
pub fn format(txid: &str, txname: &str) -> String {
    format!("TXID: {txid}; TXNAME: {txname};")
}

/// Append the annotation to an existing memo, keeping prior content.
pub fn append(memo: &str, txid: &str, txname: &str) -> String {
    if memo.is_empty() {
        format(txid, txname)
    } else {
        let mut out = String::with_capacity(memo.len() + 2);
        out.push_str(memo);
        out.push_str("; ");
        out.push_str(&format(txid, txname));
        out
    }
}

/// Extract the `TXID:` value from a memo, if present and non-empty.
pub fn parse_txid(memo: &str) -> Option<&str> {
    parse_tag(memo, TXID_TAG)
}

/// Extract the `TXNAME:` value from a memo, if present and non-empty.
pub fn parse_txname(memo: &str) -> Option<&str> {
    parse_tag(memo, TXNAME_TAG)
}

fn parse_tag<'a>(memo: &'a str, tag: &str) -> Option<&'a str> {
    let start = memo.find(tag)? + tag.len();
    let rest = &memo[start..];
    let value = match rest.find(';') {
        Some(end) => &rest[..end],
        None => rest,
    };
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
