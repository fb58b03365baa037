use serde::{Deserialize, Serialize};

/// First token of the header row printed by `tart list`.
pub const DEFAULT_HEADER_TOKEN: &str = "Source";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VmRecord {
    pub name: String,
    pub status: String,
    pub source: String,
}

/// Parse the tabular output of the VM binary's `list` command.
///
/// Rows look like `<source> <name> ... <status>`. The header row (first token equal to
/// `header_token`), blank lines and rows with fewer than three fields are skipped.
pub fn parse_listing(raw: &str, header_token: &str) -> Vec<VmRecord> {
    raw.lines()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.first() == Some(&header_token) {
                return None;
            }
            match fields.as_slice() {
                [source, name, .., status] => Some(VmRecord {
                    name: (*name).to_string(),
                    status: (*status).to_string(),
                    source: (*source).to_string(),
                }),
                _ => {
                    if !fields.is_empty() {
                        tracing::debug!(%line, "skipping malformed listing row");
                    }
                    None
                }
            }
        })
        .collect()
}
