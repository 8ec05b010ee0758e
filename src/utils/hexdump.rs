use std::cmp;
use std::fmt::Write;

/// Renders `data` in canonical hex display (`hexdump -C` style).
///
/// Every line shows the address (`base + offset into data`), sixteen space-separated two-column
/// hexadecimal bytes, then the same bytes as printable ASCII with control characters replaced
/// by dots.
pub(crate) fn format_hexdump(data: &[u8], base: usize) -> String {
    let mut out = String::new();
    let mut address = 0;

    while address < data.len() {
        let end = cmp::min(address + 16, data.len());
        format_line(&mut out, &data[address..end], address + base);
        address += 16;
    }

    out
}

/// Renders up to `radius` bytes on each side of `pos`.
pub(crate) fn hexdump_around(data: &[u8], pos: usize, radius: usize) -> String {
    let start = pos.saturating_sub(radius).min(data.len());
    let end = cmp::min(pos.saturating_add(radius), data.len());
    format_hexdump(&data[start..end], start)
}

fn format_line(out: &mut String, line: &[u8], address: usize) {
    let _ = write!(out, "\n{:08x}:", address);

    for b in line {
        let _ = write!(out, " {:02x}", b);
    }

    // align the ASCII column
    for _ in line.len()..16 {
        out.push_str("   ");
    }

    out.push_str("  |");
    for &c in line {
        match (c as char).is_ascii_graphic() || c == b' ' {
            true => out.push(c as char),
            false => out.push('.'),
        }
    }
    out.push('|');
}
