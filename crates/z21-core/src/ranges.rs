//! Port-range compression for display.

/// Compress zero-based port indices into a 1-based range string, e.g.
/// `[0, 1, 2, 5, 6, 9]` → `"1-3,6-7,10"`.
///
/// Input is sorted and deduplicated here rather than trusting the caller
/// to supply ascending indices; discovery appends ports in arrival order
/// and nothing upstream guarantees that order survives.
pub fn format_port_ranges(indices: &[u8]) -> String {
    let mut sorted: Vec<u8> = indices.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let Some((&first, rest)) = sorted.split_first() else {
        return String::new();
    };

    let mut parts = Vec::new();
    let mut start = first;
    let mut prev = first;

    for &next in rest {
        if next == prev + 1 {
            prev = next;
            continue;
        }
        parts.push(format_run(start, prev));
        start = next;
        prev = next;
    }
    parts.push(format_run(start, prev));
    parts.join(",")
}

/// Render one closed run, shifted to 1-based indices.
fn format_run(start: u8, end: u8) -> String {
    let (start, end) = (u16::from(start) + 1, u16::from(end) + 1);
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}
