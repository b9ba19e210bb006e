/// Percentage shown after finishing the item at `index` of a `total`-item playlist.
///
/// Always measured against the whole playlist, so a resumed run picks up
/// where the bar left off. Truncates, and never exceeds 100.
pub fn percent_after(index: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    let done = (index + 1).min(total);
    (done * 100 / total) as u8
}
