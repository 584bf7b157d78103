/// Text block showing the latest value of every channel
use crate::settings::ChannelNames;

const NAME_WIDTH: usize = 8;
const ENTRY_WIDTH: usize = 30;

/// Lay out `name: value` entries over `line_count` lines
///
/// Each line holds `ceil(n / line_count)` entries; names are right-aligned
/// and every entry is padded to a fixed column width.
pub fn format_value_lines(names: &ChannelNames, latest: &[Option<f64>], line_count: usize) -> Vec<String> {
    let n = latest.len();
    if line_count == 0 {
        return Vec::new();
    }
    let per_line = n.div_ceil(line_count).max(1);

    (0..line_count)
        .map(|line| {
            (0..per_line)
                .map(|j| line * per_line + j)
                .filter(|&idx| idx < n)
                .map(|idx| {
                    let name = names.get(idx).map(str::to_string).unwrap_or_else(|| idx.to_string());
                    let value = latest[idx].map(format_value).unwrap_or_else(|| "-".to_string());
                    let entry = format!("{:>width$}:  {}", name, value, width = NAME_WIDTH);
                    format!("{:<width$}", entry, width = ENTRY_WIDTH)
                })
                .collect::<String>()
        })
        .collect()
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
