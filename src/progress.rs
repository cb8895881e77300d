/// Extracts the completion fraction from a yt-dlp `[download]  42.3% of ...` line
pub fn parse_progress_from_line(line: &str) -> Option<f32> {
    let rest = line.trim_start().strip_prefix("[download]")?.trim_start();
    let (number, _) = rest.split_once('%')?;
    let value = number.trim().parse::<f32>().ok()?;
    Some((value / 100.0).clamp(0.0, 1.0))
}
