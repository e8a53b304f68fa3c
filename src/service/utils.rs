const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;

/// Human-readable size, matching the device firmware's formatting:
/// two decimals above a kilobyte, raw byte count below.
pub fn format_size(size: u64) -> String {
    if size >= MIB {
        format!("{:.2} MB", size as f64 / MIB as f64)
    } else if size >= KIB {
        format!("{:.2} KB", size as f64 / KIB as f64)
    } else {
        format!("{size} B")
    }
}

/// Space usage summary line for the status area.
pub fn space_summary(used: u64, total: u64) -> String {
    let available = total.saturating_sub(used);
    format!(
        "FileSystem uses {} of {} ({} available)",
        format_size(used),
        format_size(total),
        format_size(available)
    )
}
